//! Criterion benchmarks for the rebalancing calculator.
//!
//! Benchmarks:
//! 1. Valuation of portfolios of increasing size
//! 2. Full simulate (valuation → recommendation → summary)
//! 3. Alert evaluation over a watchlist

use chrono::Utc;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use folio_core::domain::{
    evaluate_alerts, Holding, Portfolio, PriceMap, Ticker, UserRecommendation, WatchItem,
    Watchlist,
};
use folio_core::rebalance::{simulate, value_portfolio, YieldAssumption};

// ── Helpers ──────────────────────────────────────────────────────────

fn ticker(i: usize) -> Ticker {
    Ticker::parse(&format!("T{i:04}")).unwrap()
}

fn make_book(n: usize) -> (Portfolio, PriceMap) {
    let target = 100.0 / n as f64;
    let mut portfolio = Portfolio::new();
    let mut prices = PriceMap::new();
    for i in 0..n {
        let rec = match i % 7 {
            0 => UserRecommendation::Sell,
            1 => UserRecommendation::Hold,
            _ => UserRecommendation::Buy,
        };
        let price = 20.0 + (i as f64 * 0.37).sin().abs() * 200.0;
        let mut holding = Holding::new(ticker(i), 1.0 + (i % 50) as f64, target)
            .with_recommendation(rec)
            .with_average_cost(price * 0.8);
        if i % 5 == 0 {
            holding = holding.with_price_ceiling(price * 0.9);
        }
        portfolio.upsert(holding);
        prices.insert(ticker(i), price);
    }
    (portfolio, prices)
}

// ── Benchmarks ───────────────────────────────────────────────────────

fn bench_valuation(c: &mut Criterion) {
    let mut group = c.benchmark_group("valuation");
    for n in [10, 100, 1_000] {
        let (portfolio, prices) = make_book(n);
        let yields = YieldAssumption::default();
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, _| {
            b.iter(|| value_portfolio(black_box(&portfolio), black_box(&prices), &yields))
        });
    }
    group.finish();
}

fn bench_simulate(c: &mut Criterion) {
    let mut group = c.benchmark_group("simulate");
    for n in [10, 100, 1_000] {
        let (portfolio, prices) = make_book(n);
        let yields = YieldAssumption::default();
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, _| {
            b.iter(|| {
                simulate(
                    black_box(&portfolio),
                    black_box(&prices),
                    black_box(25_000.0),
                    &yields,
                )
            })
        });
    }
    group.finish();
}

fn bench_alerts(c: &mut Criterion) {
    let (_, prices) = make_book(500);
    let mut watchlist = Watchlist::new();
    for i in 0..500 {
        let target = 50.0 + (i % 100) as f64;
        if let Ok(item) = WatchItem::new(ticker(i), target, None, Utc::now()) {
            watchlist.upsert(item);
        }
    }
    c.bench_function("evaluate_alerts/500", |b| {
        b.iter(|| evaluate_alerts(black_box(&watchlist), black_box(&prices)))
    });
}

criterion_group!(benches, bench_valuation, bench_simulate, bench_alerts);
criterion_main!(benches);
