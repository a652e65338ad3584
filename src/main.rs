use std::path::PathBuf;
use std::process;
use std::time::Instant;

use clap::{Parser, ValueEnum};
use ndarray::Array2;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde_json::json;
use tracing::{error, info};
use tracing_subscriber::FmtSubscriber;

use clusterlib::{
    generate_blobs, generate_points, info_theoretic_partition_with, partition_with, qt_clust,
    CentroidSeparation, ClusterError, CrossInformationPotential, DataLoader, DataMatrix,
    EmptyClusterPolicy, Euclidean, HillClimbConfig, InitStrategy, KMeansConfig, Linkage,
    Population, Result as ClusterResult, Snapshot,
};

#[derive(Parser, Debug)]
#[command(name = "clusterlib")]
#[command(about = "k-means, QT-Clust and hill-climbing clustering driver", long_about = None)]
struct Args {
    /// Clustering strategy
    #[arg(short, long, value_enum, default_value_t = Algorithm::Kmeans)]
    algorithm: Algorithm,

    /// Number of clusters (kmeans, hillclimb)
    #[arg(short, long, default_value_t = 3)]
    k: usize,

    /// Diameter threshold (qt)
    #[arg(short, long, default_value_t = 1.0)]
    threshold: f64,

    /// Stop k-means once at most this many points change cluster
    #[arg(long, default_value_t = 0)]
    min_delta: usize,

    /// Iteration cap (k-means rounds or hill-climbing sweeps per pass)
    #[arg(short, long, default_value_t = 100)]
    iterations: usize,

    /// k-means initialisation method
    #[arg(long, value_parser = parse_init_strategy, default_value = "sample")]
    init: InitStrategy,

    /// What k-means does with a cluster that loses all members
    #[arg(long, value_parser = parse_empty_policy, default_value = "fail")]
    empty_cluster: EmptyClusterPolicy,

    /// Group growth criterion for hill-climbing
    #[arg(long, value_parser = parse_linkage, default_value = "single")]
    linkage: Linkage,

    /// Hill-climbing objective
    #[arg(long, value_enum, default_value_t = ObjectiveKind::Separation)]
    objective: ObjectiveKind,

    /// Kernel width for the cross-information-potential objective
    #[arg(long, default_value_t = 1.0)]
    bandwidth: f64,

    /// RNG seed
    #[arg(long, default_value_t = 42u64)]
    seed: u64,

    /// Input dataset (CSV with a header row)
    #[arg(long)]
    input: Option<PathBuf>,

    /// Number of points per blob (or in total with --blobs 0) when generating
    #[arg(short = 'n', long, default_value_t = 100)]
    points: usize,

    /// Dimensionality of generated points
    #[arg(short, long, default_value_t = 2)]
    dim: usize,

    /// Number of Gaussian blobs to generate; 0 generates uniform noise
    #[arg(long, default_value_t = 3)]
    blobs: usize,

    /// Standard deviation of generated blobs
    #[arg(long, default_value_t = 1.0)]
    spread: f64,

    /// Output file for the run summary (JSON)
    #[arg(short, long, default_value = "clusterlib_result.json")]
    output: PathBuf,

    /// Verbosity: set RUST_LOG style level (info, debug, warn)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum Algorithm {
    Kmeans,
    Qt,
    Hillclimb,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum ObjectiveKind {
    Separation,
    CrossInformation,
}

fn main() {
    let args = Args::parse();
    if let Err(err) = init_logging(&args.log_level) {
        eprintln!("failed to initialise logging: {err}");
    }

    if let Err(err) = run(args) {
        error!(error = %err, "clustering run failed");
        process::exit(1);
    }
}

fn init_logging(level: &str) -> Result<(), String> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(match level {
            "trace" => tracing::Level::TRACE,
            "debug" => tracing::Level::DEBUG,
            "warn" => tracing::Level::WARN,
            "error" => tracing::Level::ERROR,
            _ => tracing::Level::INFO,
        })
        .finish();
    tracing::subscriber::set_global_default(subscriber).map_err(|err| err.to_string())
}

fn run(args: Args) -> ClusterResult<()> {
    let mut rng = ChaCha8Rng::seed_from_u64(args.seed);
    let data = load_data(&args, &mut rng)?;
    let mut population = Population::from_matrix(&data)?;
    info!(
        algorithm = ?args.algorithm,
        points = population.len(),
        dim = population.dim(),
        seed = args.seed,
        "starting clustering run"
    );

    let mut progress = |snapshot: &Snapshot<'_>| {
        info!(
            engine = ?snapshot.engine,
            iteration = snapshot.iteration,
            delta = ?snapshot.delta,
            objective = ?snapshot.objective,
            "iteration complete"
        );
    };

    let start = Instant::now();
    let report = match args.algorithm {
        Algorithm::Kmeans => {
            let config = KMeansConfig {
                k: args.k,
                max_iter: args.iterations,
                min_delta: args.min_delta,
                init: args.init,
                empty_cluster: args.empty_cluster,
            };
            let run = partition_with(&mut population, &config, Euclidean, &mut rng, &mut progress)?;
            let centroids: Vec<Vec<f64>> = run
                .model
                .centroids()
                .outer_iter()
                .map(|row| row.to_vec())
                .collect();
            json!({
                "config": config,
                "outcome": run.outcome,
                "centroids": centroids,
            })
        }
        Algorithm::Qt => {
            let mut clusters = Vec::new();
            for cluster in qt_clust(args.threshold, &mut population)? {
                info!(
                    cluster = clusters.len(),
                    size = cluster.len(),
                    diameter = cluster.diameter(),
                    "qt cluster"
                );
                clusters.push(json!({
                    "size": cluster.len(),
                    "diameter": cluster.diameter(),
                    "prototype": cluster.prototype().value(),
                    "centroid": cluster.centroid(),
                    "members": cluster.origins(),
                }));
            }
            json!({
                "threshold": args.threshold,
                "clusters": clusters,
            })
        }
        Algorithm::Hillclimb => {
            let config = HillClimbConfig {
                k: args.k,
                max_sweeps: args.iterations,
                linkage: args.linkage,
            };
            let outcome = match args.objective {
                ObjectiveKind::Separation => info_theoretic_partition_with(
                    &mut population,
                    &config,
                    &CentroidSeparation,
                    &Euclidean,
                    &mut rng,
                    &mut progress,
                )?,
                ObjectiveKind::CrossInformation => info_theoretic_partition_with(
                    &mut population,
                    &config,
                    &CrossInformationPotential {
                        bandwidth: args.bandwidth,
                    },
                    &Euclidean,
                    &mut rng,
                    &mut progress,
                )?,
            };
            json!({
                "config": config,
                "outcome": outcome,
            })
        }
    };
    let elapsed = start.elapsed();
    info!(took_seconds = elapsed.as_secs_f64(), "clustering run finished");

    let dump = json!({
        "algorithm": format!("{:?}", args.algorithm).to_lowercase(),
        "seed": args.seed,
        "rows": data.nrows(),
        "dim": data.ncols(),
        "elapsed_seconds": elapsed.as_secs_f64(),
        "data_source": match args.input.as_ref() {
            Some(path) => json!({ "type": "file", "path": path.display().to_string() }),
            None => json!({
                "type": "synthetic",
                "points": args.points,
                "blobs": args.blobs,
                "spread": args.spread,
            }),
        },
        "labels": population.labels(),
        "report": report,
    });

    std::fs::write(&args.output, serde_json::to_string_pretty(&dump)?)?;
    info!(path = ?args.output, "wrote clustering summary");
    Ok(())
}

fn load_data(args: &Args, rng: &mut ChaCha8Rng) -> ClusterResult<DataMatrix> {
    if let Some(path) = args.input.as_deref() {
        info!(path = ?path, "loading input data");
        return DataLoader::load_csv(path);
    }
    if args.blobs == 0 {
        info!(points = args.points, dim = args.dim, "generating uniform data");
        return Ok(generate_points(args.points, args.dim, rng));
    }
    let centres: DataMatrix = Array2::from_shape_fn((args.blobs, args.dim), |_| {
        rng.gen_range(-10.0..10.0) * args.spread.max(1.0)
    });
    info!(
        blobs = args.blobs,
        per_blob = args.points,
        dim = args.dim,
        spread = args.spread,
        "generating gaussian blobs"
    );
    generate_blobs(args.points, &centres, args.spread, rng)
}

fn parse_init_strategy(raw: &str) -> Result<InitStrategy, String> {
    raw.parse().map_err(|err: ClusterError| err.to_string())
}

fn parse_empty_policy(raw: &str) -> Result<EmptyClusterPolicy, String> {
    raw.parse().map_err(|err: ClusterError| err.to_string())
}

fn parse_linkage(raw: &str) -> Result<Linkage, String> {
    raw.parse().map_err(|err: ClusterError| err.to_string())
}
