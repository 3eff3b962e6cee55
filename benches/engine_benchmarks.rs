//! Benchmarks for engine performance.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use sirocco::board::Board;
use sirocco::eval::Evaluator;
use sirocco::search::{self, SearchParams, SearchSettings};
use sirocco::syzygy::Tablebases;
use sirocco::tt::TranspositionTable;

const KIWIPETE: &str = "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1";

fn bench_perft(c: &mut Criterion) {
    let mut group = c.benchmark_group("perft");

    let mut board = Board::new();
    for depth in 1..=4 {
        group.bench_with_input(BenchmarkId::new("startpos", depth), &depth, |b, &depth| {
            b.iter(|| board.perft(black_box(depth)))
        });
    }

    let mut kiwipete = Board::from_fen(KIWIPETE);
    for depth in 1..=3 {
        group.bench_with_input(BenchmarkId::new("kiwipete", depth), &depth, |b, &depth| {
            b.iter(|| kiwipete.perft(black_box(depth)))
        });
    }

    group.finish();
}

fn bench_movegen(c: &mut Criterion) {
    let mut group = c.benchmark_group("movegen");

    let mut startpos = Board::new();
    group.bench_function("startpos", |b| {
        b.iter(|| black_box(startpos.generate_legal()))
    });

    let mut kiwipete = Board::from_fen(KIWIPETE);
    group.bench_function("kiwipete", |b| {
        b.iter(|| black_box(kiwipete.generate_legal()))
    });

    group.finish();
}

fn bench_eval(c: &mut Criterion) {
    let mut group = c.benchmark_group("eval");

    let evaluator = Evaluator::classical();
    let startpos = Board::new();
    group.bench_function("classical_startpos", |b| {
        b.iter(|| black_box(evaluator.evaluate(&startpos)))
    });

    let kiwipete = Board::from_fen(KIWIPETE);
    group.bench_function("classical_kiwipete", |b| {
        b.iter(|| black_box(evaluator.evaluate(&kiwipete)))
    });

    group.finish();
}

fn bench_search(c: &mut Criterion) {
    let mut group = c.benchmark_group("search");
    group.sample_size(10);

    for depth in [3u32, 4, 5] {
        group.bench_with_input(BenchmarkId::new("startpos", depth), &depth, |b, &depth| {
            b.iter(|| {
                let mut board = Board::new();
                let mut evaluator = Evaluator::classical();
                let tt = TranspositionTable::new(16);
                let tb = Tablebases::disabled();
                let params = SearchParams::default();
                let stop = Arc::new(AtomicBool::new(false));
                search::search(
                    &mut board,
                    &mut evaluator,
                    &tt,
                    &tb,
                    &params,
                    &SearchSettings::depth(depth),
                    &stop,
                    None,
                )
            })
        });
    }

    for depth in [3u32, 4] {
        group.bench_with_input(BenchmarkId::new("kiwipete", depth), &depth, |b, &depth| {
            b.iter(|| {
                let mut board = Board::from_fen(KIWIPETE);
                let mut evaluator = Evaluator::classical();
                let tt = TranspositionTable::new(16);
                let tb = Tablebases::disabled();
                let params = SearchParams::default();
                let stop = Arc::new(AtomicBool::new(false));
                search::search(
                    &mut board,
                    &mut evaluator,
                    &tt,
                    &tb,
                    &params,
                    &SearchSettings::depth(depth),
                    &stop,
                    None,
                )
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_perft, bench_movegen, bench_eval, bench_search);
criterion_main!(benches);
