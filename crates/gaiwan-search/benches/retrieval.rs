use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use gaiwan_core::{EngineConfig, Post};
use gaiwan_search::{Corpus, RetrievalEngine, RetrievalMode};
use rand::{Rng, SeedableRng, rngs::StdRng};

const SIZES: &[usize] = &[200, 1_000, 5_000];
const SEED: u64 = 0x6A1_3A7;

const VOCABULARY: &[&str] = &[
    "ferry", "harbour", "tide", "storm", "gull", "lantern", "rope", "anchor", "sail", "keel",
    "mast", "chart", "buoy", "reef", "current", "squall", "dock", "pier", "wake", "hull",
    "what", "why", "how", "today", "tomorrow", "north", "south", "east", "west", "calm",
];

/// Synthetic corpus: one in three posts replies to an earlier one, one in
/// ten quotes, authors drawn from a pool of `n / 8`.
fn generate_corpus(n: usize, seed: u64) -> Vec<Post> {
    let mut rng = StdRng::seed_from_u64(seed);
    let authors = (n / 8).max(2);
    (0..n)
        .map(|i| {
            let words: Vec<&str> = (0..rng.gen_range(3..14))
                .map(|_| VOCABULARY[rng.gen_range(0..VOCABULARY.len())])
                .collect();
            let mut text = words.join(" ");
            if rng.gen_bool(0.2) {
                text.push('?');
            }
            let author = format!("user{}", rng.gen_range(0..authors));
            let mut post = Post::original(format!("p{i}"), author, text);
            if i > 0 && rng.gen_bool(0.33) {
                post = post.with_reply_to(format!("p{}", rng.gen_range(0..i)));
            }
            if i > 0 && rng.gen_bool(0.1) {
                post = post.with_quoted(format!("p{}", rng.gen_range(0..i)));
            }
            post
        })
        .collect()
}

fn fitted(n: usize) -> RetrievalEngine {
    let mut engine = RetrievalEngine::new(EngineConfig::default()).expect("default config is valid");
    engine
        .fit(Corpus::new(generate_corpus(n, SEED)))
        .expect("generated ids are unique");
    engine
}

fn bench_fit(c: &mut Criterion) {
    let mut group = c.benchmark_group("engine.fit");
    group.sample_size(10);

    for &n in SIZES {
        let posts = generate_corpus(n, SEED);
        group.throughput(Throughput::Elements(n as u64));
        group.bench_with_input(BenchmarkId::from_parameter(n), &posts, |b, posts| {
            b.iter(|| {
                let mut engine =
                    RetrievalEngine::new(EngineConfig::default()).expect("default config is valid");
                let summary = engine
                    .fit(Corpus::new(posts.clone()))
                    .expect("generated ids are unique");
                black_box(summary.combined_edges)
            });
        });
    }

    group.finish();
}

fn bench_retrieve(c: &mut Criterion) {
    let mut group = c.benchmark_group("engine.retrieve");

    for &n in SIZES {
        let engine = fitted(n);
        let queries: Vec<String> = (0..32).map(|i| format!("p{}", (i * 37) % n)).collect();
        group.throughput(Throughput::Elements(queries.len() as u64));

        for mode in [RetrievalMode::Exploratory, RetrievalMode::Declarative] {
            group.bench_with_input(BenchmarkId::new(mode.to_string(), n), &queries, |b, queries| {
                b.iter(|| {
                    for query in queries {
                        let results = engine
                            .retrieve(query, 10, Some(mode))
                            .expect("engine is fitted");
                        black_box(results.len());
                    }
                });
            });
        }
    }

    group.finish();
}

criterion_group!(benches, bench_fit, bench_retrieve);
criterion_main!(benches);
