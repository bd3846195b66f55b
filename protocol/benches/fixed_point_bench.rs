// Fixed-point arithmetic benchmarks for Retriever.
//
// Covers checked addition, the widening mul_div at small and near-maximal
// magnitudes, oracle-style rescaling, and decimal parsing.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use retriever_protocol::math::{mul_div, rescale, Amount};

fn bench_checked_add(c: &mut Criterion) {
    let a = Amount::from_whole(5_000);
    let b = Amount::from_whole(500);

    c.bench_function("amount/checked_add", |bench| {
        bench.iter(|| black_box(a).checked_add(black_box(b)));
    });
}

fn bench_mul_div(c: &mut Criterion) {
    let mut group = c.benchmark_group("amount/mul_div");

    let cases = [
        ("small", Amount::from_whole(500), Amount::from_whole(5_000), Amount::from_whole(5_500)),
        (
            "billion",
            Amount::from_whole(1_000_000_000),
            Amount::from_whole(1_000_000_000),
            Amount::from_whole(3),
        ),
        ("max", Amount::MAX, Amount::MAX, Amount::MAX),
    ];
    for (label, a, b, d) in cases {
        group.bench_with_input(BenchmarkId::from_parameter(label), &(a, b, d), |bench, &(a, b, d)| {
            bench.iter(|| mul_div(black_box(a), black_box(b), black_box(d)));
        });
    }

    group.finish();
}

fn bench_rescale(c: &mut Criterion) {
    let answer = Amount::from_units(120_000_000_000);

    c.bench_function("amount/rescale_8_to_18", |bench| {
        bench.iter(|| rescale(black_box(answer), 8, 18));
    });
}

fn bench_parse(c: &mut Criterion) {
    c.bench_function("amount/parse_decimal", |bench| {
        bench.iter(|| black_box("1234567.891011121314151617").parse::<Amount>());
    });
}

criterion_group!(benches, bench_checked_add, bench_mul_div, bench_rescale, bench_parse);
criterion_main!(benches);
