use brisk::pipeline::compile;
use criterion::{criterion_group, criterion_main, Criterion};
use std::hint::black_box;

static INPUT: &str = include_str!("../../samples/loops.bk");

fn pipeline(input: &str) {
    let asm = compile("loops.bk", input).unwrap();
    _ = black_box(asm);
}

fn criterion_benchmark(c: &mut Criterion) {
    c.bench_function("pipeline", |b| b.iter(|| pipeline(black_box(INPUT))));
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
