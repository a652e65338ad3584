use clusterlib::{
    generate_blobs, info_theoretic_partition, partition, qt_clust, HillClimbConfig,
    InitStrategy, KMeansConfig, Population,
};
use criterion::{criterion_group, criterion_main, Criterion};
use ndarray::array;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

fn bench_clustering(c: &mut Criterion) {
    let mut rng = ChaCha8Rng::seed_from_u64(42);
    let centres = array![[0.0, 0.0], [8.0, 0.0], [0.0, 8.0], [8.0, 8.0]];
    let points = generate_blobs(50, &centres, 1.0, &mut rng).expect("blob generation");
    let population = Population::from_matrix(&points).expect("non-empty population");

    let config = KMeansConfig {
        k: 4,
        max_iter: 100,
        init: InitStrategy::KMeansPlusPlus,
        ..KMeansConfig::default()
    };
    c.bench_function("kmeans_200_2d", |b| {
        b.iter(|| {
            let mut rng = ChaCha8Rng::seed_from_u64(42);
            let mut population = population.clone();
            let _run = partition(&mut population, &config, &mut rng).expect("kmeans bench run");
        });
    });

    c.bench_function("qt_clust_200_2d", |b| {
        b.iter(|| {
            let mut population = population.clone();
            let clusters = qt_clust(3.0, &mut population)
                .expect("qt bench run")
                .count();
            assert!(clusters > 0);
        });
    });

    let small = Population::from_matrix(
        &generate_blobs(10, &centres, 1.0, &mut rng).expect("blob generation"),
    )
    .expect("non-empty population");
    c.bench_function("hillclimb_40_2d", |b| {
        b.iter(|| {
            let mut rng = ChaCha8Rng::seed_from_u64(42);
            let mut population = small.clone();
            let _outcome =
                info_theoretic_partition(&mut population, &HillClimbConfig::with_k(4), &mut rng)
                    .expect("hill-climbing bench run");
        });
    });
}

criterion_group!(benches, bench_clustering);
criterion_main!(benches);
