//! Performance benchmarks for the surveillance engine

// Benchmarks are not production code - unwrap/expect are acceptable here
#![allow(clippy::unwrap_used, clippy::expect_used)]

use common::{Alert, ContextKey, MarketSegment, Trade, TradeType, Ts};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use engine::context::ContextStore;
use engine::memory::TradePool;
use engine::{
    DetectorError, Engine, EngineConfig, HistoricalContext, PatternConfig, PatternDetector,
};
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

fn sample_trade(id: u64, secs: u64) -> Trade {
    Trade {
        trade_id: format!("T{id}"),
        instrument_symbol: "RELIANCE".into(),
        account_id: "ACC1".into(),
        client_id: "CL1".into(),
        order_id: format!("O{id}"),
        trader_id: "TR1".into(),
        trade_type: TradeType::Buy,
        segment: MarketSegment::Equity,
        quantity: 100,
        price: 2500.0,
        value: 250_000.0,
        exchange: "NSE".into(),
        timestamp: Ts::from_secs(secs),
        brokerage: None,
        taxes: None,
        is_own_account: None,
    }
}

fn bench_trade_pool(c: &mut Criterion) {
    let mut group = c.benchmark_group("trade_pool");

    group.bench_function("allocate_deallocate", |b| {
        let pool = TradePool::new(1024);
        let mut id = 0u64;
        b.iter(|| {
            id += 1;
            let slot = pool.allocate(sample_trade(id, 100)).expect("slot");
            black_box(pool.get(&slot));
            pool.deallocate(slot);
        });
    });

    group.finish();
}

fn bench_context_update(c: &mut Criterion) {
    let mut group = c.benchmark_group("context_store");

    group.bench_function("update_single_key", |b| {
        let store = ContextStore::new(Duration::from_secs(300), 1_000_000);
        let key = ContextKey::new("RELIANCE", "ACC1");
        let mut secs = 1_000u64;
        b.iter(|| {
            secs += 1;
            let trade = sample_trade(secs, secs);
            black_box(store.update(&key, &trade));
        });
    });

    group.finish();
}

struct NullDetector;

impl PatternDetector for NullDetector {
    fn name(&self) -> &str {
        "null_detector"
    }

    fn detect(
        &self,
        _trade: &Trade,
        _context: &HistoricalContext,
    ) -> Result<Option<Alert>, DetectorError> {
        Ok(None)
    }

    fn update_config(&self, _config: &PatternConfig) {}
}

fn bench_submit_path(c: &mut Criterion) {
    let mut group = c.benchmark_group("submit");

    group.bench_function("end_to_end_null_detector", |b| {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(
            br#"{
                "patterns": {
                    "pump_dump": { "enabled": false },
                    "layering": { "enabled": false },
                    "wash_trading": { "enabled": false },
                    "insider_trading": { "enabled": false },
                    "front_running": { "enabled": false }
                }
            }"#,
        )
        .expect("write config");

        let config = EngineConfig {
            num_threads: 2,
            queue_size: 1 << 16,
            pool_size: 1 << 16,
            // Identical event times never age out, so bound the window by
            // the eviction cap instead.
            context_max_trades: 4096,
            ..EngineConfig::default()
        };
        let engine = Engine::new(config);
        assert!(engine.initialize(file.path()));
        engine.register_detector("null_detector", Arc::new(NullDetector));
        assert!(engine.start());

        let now = Ts::now().as_nanos() / 1_000_000_000;
        let mut id = 0u64;
        b.iter(|| {
            id += 1;
            // Overload shows up as a fast rejection, which is itself the
            // contract under test.
            black_box(engine.submit(sample_trade(id, now - 1)));
        });

        engine.stop();
    });

    group.finish();
}

criterion_group!(benches, bench_trade_pool, bench_context_update, bench_submit_path);
criterion_main!(benches);
