use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use miic_core::{
    AdjacencyMatrix, DiscreteDataset, Penalty, PluginEstimator, SearchConfig, search_and_score,
};

const ROWS: usize = 500;
const WIDTHS: [usize; 3] = [4, 6, 8];

/// Ternary variables where each column copies one of the earlier columns
/// with 20% noise, so the true structure is a random tree.
fn generate_dataset(width: usize, seed: u64) -> DiscreteDataset {
    let mut rng = StdRng::seed_from_u64(seed);
    let sources: Vec<usize> = (0..width)
        .map(|col| if col == 0 { 0 } else { rng.gen_range(0..col) })
        .collect();

    let mut rows = Vec::with_capacity(ROWS);
    for _ in 0..ROWS {
        let mut values: Vec<u8> = Vec::with_capacity(width);
        for (col, &source) in sources.iter().enumerate() {
            let value = if col == 0 || rng.gen_bool(0.2) {
                rng.gen_range(0..3)
            } else {
                values[source]
            };
            values.push(value);
        }
        rows.push(values.iter().map(ToString::to_string).collect());
    }

    let header = (0..width).map(|i| format!("V{i}")).collect();
    DiscreteDataset::from_records(header, &rows).expect("generated dataset is rectangular")
}

fn bench_full_run(c: &mut Criterion) {
    let mut group = c.benchmark_group("engine.run");

    for width in WIDTHS {
        let data = generate_dataset(width, 0x5EED_u64 + width as u64);
        let seed = AdjacencyMatrix::complete(data.labels().to_vec()).expect("labels");
        let estimator = PluginEstimator::new(data, Penalty::Mdl);

        group.throughput(Throughput::Elements(seed.edge_count() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(width), &seed, |b, seed| {
            b.iter(|| {
                let outcome =
                    search_and_score(seed, &estimator, &[], SearchConfig::default()).expect("run");
                black_box(outcome.adjacency.edge_count())
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_full_run);
criterion_main!(benches);
