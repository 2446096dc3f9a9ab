//! Benchmarks for the spritesass pipeline.

use std::fs;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use tempfile::tempdir;

use spritesass::sprite::{pack, Layout};
use spritesass::{tokenize, BuildHost, Options};

/// A stylesheet of `rules` small rule blocks with a few declarations.
fn stylesheet(rules: usize) -> String {
    let mut source = String::from("$base: 4px;\n$accent: #c0ffee;\n");
    for i in 0..rules {
        source.push_str(&format!(
            ".item-{i} {{\n  // spacing\n  margin: #{{$base * {i}}};\n  color: $accent;\n  background: url(\"img/{i}.png\");\n}}\n"
        ));
    }
    source
}

// -- Tokenizing --

fn bench_tokenize(c: &mut Criterion) {
    let mut group = c.benchmark_group("tokenize");

    let small = stylesheet(10);
    let large = stylesheet(1000);

    group.bench_function("tokenize_small", |b| b.iter(|| tokenize(black_box(&small)).unwrap()));
    group.bench_function("tokenize_large", |b| b.iter(|| tokenize(black_box(&large)).unwrap()));

    group.finish();
}

// -- Import expansion --

fn bench_preprocess(c: &mut Criterion) {
    let mut group = c.benchmark_group("preprocess");

    let dir = tempdir().unwrap();
    let mut main = String::new();
    for i in 0..20 {
        fs::write(dir.path().join(format!("_part{i}.scss")), stylesheet(25)).unwrap();
        main.push_str(&format!("@import \"part{i}\";\n"));
    }
    main.push_str(&stylesheet(50));
    let input = dir.path().join("main.scss");
    fs::write(&input, &main).unwrap();

    // Warm cache: every partial after the first run is a cache hit.
    let host = BuildHost::new(Options::default());
    group.bench_function("preprocess_20_partials", |b| {
        b.iter(|| host.preprocess_file(black_box(&input)).unwrap())
    });

    let passthrough = stylesheet(500);
    group.bench_function("preprocess_passthrough", |b| {
        b.iter(|| host.preprocess(black_box(&passthrough), dir.path()).unwrap())
    });

    group.finish();
}

// -- Layout --

fn bench_packing(c: &mut Criterion) {
    let mut group = c.benchmark_group("packing");

    let sizes: Vec<(u32, u32)> = (0..500).map(|i| (16 + i % 48, 8 + i % 96)).collect();

    group.bench_function("pack_vertical_500", |b| {
        b.iter(|| pack(black_box(&sizes), Layout::Vertical))
    });
    group.bench_function("pack_horizontal_500", |b| {
        b.iter(|| pack(black_box(&sizes), Layout::Horizontal))
    });

    group.finish();
}

criterion_group!(benches, bench_tokenize, bench_preprocess, bench_packing);
criterion_main!(benches);
