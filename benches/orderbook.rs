//! Benchmarks for order book operations.
//!
//! Run with: `cargo bench`

use booksync::book::OrderBook;
use booksync::types::messages::Snapshot;
use booksync::types::{Level, Side};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rust_decimal::Decimal;

fn populated_book(levels: u32) -> OrderBook {
    let mut book = OrderBook::new("BENCH");
    for i in 0..levels {
        book.store(
            Side::Bid,
            Decimal::from(10_000 - i),
            Decimal::from(100 + i),
        );
        book.store(
            Side::Ask,
            Decimal::from(10_001 + i),
            Decimal::from(100 + i),
        );
    }
    book
}

fn bench_store(c: &mut Criterion) {
    let mut group = c.benchmark_group("orderbook_store");

    for size in [10u32, 100, 1000].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            let mut book = populated_book(size);
            let price = Decimal::from(9_950);
            let amount = Decimal::from(42);

            b.iter(|| {
                book.store(black_box(Side::Bid), black_box(price), black_box(amount));
            });
        });
    }

    group.finish();
}

fn bench_best_bid(c: &mut Criterion) {
    let mut group = c.benchmark_group("orderbook_best_bid");

    for size in [10u32, 100, 1000].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            let book = populated_book(size);

            b.iter(|| {
                black_box(book.best_bid());
            });
        });
    }

    group.finish();
}

fn bench_limit(c: &mut Criterion) {
    let book = populated_book(1000);

    c.bench_function("orderbook_limit_20", |b| {
        b.iter(|| {
            black_box(book.limit(Some(20)));
        });
    });
}

fn bench_reset(c: &mut Criterion) {
    let snapshot = Snapshot {
        seq: 1,
        bids: (0..200)
            .map(|i| Level::new(Decimal::from(10_000 - i), Decimal::from(100)))
            .collect(),
        asks: (0..200)
            .map(|i| Level::new(Decimal::from(10_001 + i), Decimal::from(100)))
            .collect(),
        timestamp: None,
    };

    c.bench_function("orderbook_reset_200", |b| {
        let mut book = OrderBook::new("BENCH");
        b.iter(|| {
            book.reset(black_box(&snapshot));
        });
    });
}

criterion_group!(benches, bench_store, bench_best_bid, bench_limit, bench_reset);
criterion_main!(benches);
