use criterion::*;
use mih_buckets::*;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

const TOTAL: usize = 1 << 20;

fn space() -> Vec<u64> {
    let mut rng = SmallRng::from_seed([5; 16]);
    rng.sample_iter(&rand::distributions::Standard)
        .take(TOTAL)
        .collect()
}

fn bench_build(c: &mut Criterion) {
    c.bench(
        "build",
        ParameterizedBenchmark::new(
            "counting_sort_2^20",
            |bencher: &mut Bencher, &blocks: &usize| {
                let space = space();
                let perm = BlockPermutation::new(64, blocks, 1).unwrap();
                let config = SubIndexConfig::new(3).strategy(BuildStrategy::CountingSort);
                bencher.iter(|| SubIndex::build(perm.clone(), config, &space).unwrap());
            },
            vec![4, 8, 16],
        )
        .with_function(
            "comparison_sort_2^20",
            |bencher: &mut Bencher, &blocks: &usize| {
                let space = space();
                let perm = BlockPermutation::new(64, blocks, 1).unwrap();
                let config = SubIndexConfig::new(3).strategy(BuildStrategy::ComparisonSort);
                bencher.iter(|| SubIndex::build(perm.clone(), config, &space).unwrap());
            },
        )
        .throughput(|_| Throughput::Elements(TOTAL as u32)),
    );
}

fn config() -> Criterion {
    Criterion::default().sample_size(10).nresamples(5)
}

criterion_group! {
    name = benches;
    config = config();
    targets = bench_build
}
