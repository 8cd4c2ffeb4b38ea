//! Filter construction and matcher benchmarks using criterion.

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};

use trgm_regex::{build_trigram_query, extract_trigrams, DefaultCharHost, FilterConfig, TrigramIndex};

fn bench_build_literal(c: &mut Criterion) {
    let config = FilterConfig::default();
    c.bench_function("build_literal", |b| {
        b.iter(|| build_trigram_query(black_box("error: connection refused"), &config).unwrap());
    });
}

fn bench_build_alternation(c: &mut Criterion) {
    let config = FilterConfig::default();
    c.bench_function("build_alternation", |b| {
        b.iter(|| {
            build_trigram_query(black_box("(open|close|read|write)_file\\([a-z]+\\)"), &config)
                .unwrap()
        });
    });
}

fn bench_matches_1k_docs(c: &mut Criterion) {
    let config = FilterConfig::default();
    let mut query = build_trigram_query("fn (main|init)\\(\\)", &config).unwrap();
    let host = DefaultCharHost::default();
    let docs: Vec<_> = (0..1000)
        .map(|i| {
            let text = if i % 10 == 0 {
                format!("pub fn main() {{ run({i}) }}")
            } else {
                format!("let value_{i} = compute({i});")
            };
            extract_trigrams(&host, &text)
        })
        .collect();

    c.bench_function("matches_1k_docs", |b| {
        b.iter(|| docs.iter().filter(|d| query.matches_trigrams(d)).count());
    });
}

fn bench_search_10k_docs(c: &mut Criterion) {
    let mut index = TrigramIndex::new();
    for i in 0..10_000 {
        index
            .add_document(&format!("request {i} from host-{} status {}", i % 97, i % 5))
            .unwrap();
    }
    let config = FilterConfig::default();

    c.bench_function("search_10k_docs", |b| {
        b.iter(|| index.search(black_box("host-42 status [34]"), &config).unwrap());
    });
}

criterion_group!(
    benches,
    bench_build_literal,
    bench_build_alternation,
    bench_matches_1k_docs,
    bench_search_10k_docs,
);
criterion_main!(benches);
