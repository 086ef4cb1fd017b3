//! ActionKB Matching Benchmarks
//!
//! Hot paths of a lookup:
//! - Fallback embedding of a phrase
//! - Query canonicalization through the synonym table
//! - Atomic-action lookup over a populated collection

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use tokio::runtime::Runtime;

use actionkb_common::AtomicAction;
use actionkb_engine::{
    ActionFilters, HashEmbedding, KbConfig, KnowledgeBase, MatchingEngine, SynonymTable,
};

const VERBS: &[&str] = &["click", "open", "close", "verify", "scroll", "select", "wait"];
const NOUNS: &[&str] = &["play", "menu", "search", "profile", "settings", "episode", "banner"];

fn bench_fallback_embedding(c: &mut Criterion) {
    let embedder = HashEmbedding::default();
    let mut group = c.benchmark_group("embedding");

    for phrase in ["tap play", "click the play button on the player screen"] {
        group.bench_with_input(BenchmarkId::new("hash", phrase.len()), phrase, |b, phrase| {
            b.iter(|| embedder.embed(black_box(phrase)))
        });
    }
    group.finish();
}

fn bench_canonicalize(c: &mut Criterion) {
    let synonyms = SynonymTable::default();
    c.bench_function("canonicalize", |b| {
        b.iter(|| synonyms.canonicalize(black_box("tap play then press skip and confirm")))
    });
}

fn populated_engine(rt: &Runtime, size: usize) -> MatchingEngine {
    rt.block_on(async {
        let config = KbConfig::default();
        let kb = KnowledgeBase::in_memory(&config).await.expect("knowledge base");
        for i in 0..size {
            let verb = VERBS[i % VERBS.len()];
            let noun = NOUNS[(i / VERBS.len()) % NOUNS.len()];
            let action = AtomicAction::new(
                format!("a{}", i),
                format!("{}_{}_button_{}", verb, noun, i),
                format!("{}{}Button{}", verb, noun, i),
                "BenchScreen",
            )
            .with_keywords([verb, noun, "button"]);
            kb.add_atomic_action(&action).await.expect("add action");
        }
        MatchingEngine::new(Arc::new(kb), config.matching)
    })
}

fn bench_find_atomic_action(c: &mut Criterion) {
    let rt = Runtime::new().expect("tokio runtime");
    let mut group = c.benchmark_group("find_atomic_action");

    for size in [100usize, 1000] {
        let engine = populated_engine(&rt, size);
        group.bench_with_input(BenchmarkId::new("actions", size), &engine, |b, engine| {
            b.iter(|| {
                rt.block_on(engine.find_atomic_action(
                    black_box("tap play button"),
                    &ActionFilters::none(),
                    None,
                ))
            })
        });
    }
    group.finish();
}

criterion_group!(
    matching,
    bench_fallback_embedding,
    bench_canonicalize,
    bench_find_atomic_action,
);

criterion_main!(matching);
