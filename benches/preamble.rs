//! Benchmarks for preamble extraction and display rendering.

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use marksync::preamble::{combine, extract, render, strip_leaked};

const DOC: &str = "---\ntitle: Quarterly plan\ndate: 2024-03-01\ntags: [planning, q2, team]\nowner:\n  name: Sam\n  email: sam@example.com\nsteps:\n  - draft\n  - review\n---\n# Quarterly plan\n\nSome body text.\n";

fn bench_extract(c: &mut Criterion) {
    c.bench_function("extract", |b| b.iter(|| extract(black_box(DOC))));
}

fn bench_combine(c: &mut Criterion) {
    let extracted = extract(DOC);
    c.bench_function("combine", |b| {
        b.iter(|| combine(black_box(extracted.raw_block()), black_box(&extracted.body)))
    });
}

fn bench_render(c: &mut Criterion) {
    let extracted = extract(DOC);
    let Some(preamble) = extracted.preamble else {
        return;
    };
    c.bench_function("render", |b| b.iter(|| render(black_box(preamble.fields()))));
}

fn bench_strip_leaked(c: &mut Criterion) {
    let doubled = format!("{DOC}{DOC}");
    c.bench_function("strip_leaked", |b| b.iter(|| strip_leaked(black_box(&doubled))));
}

criterion_group!(benches, bench_extract, bench_combine, bench_render, bench_strip_leaked);
criterion_main!(benches);
