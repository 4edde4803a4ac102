//! Unit tests for engine components

mod memory_tests {
    use common::{MarketSegment, Trade, TradeType, Ts};
    use engine::memory::TradePool;
    use rstest::rstest;
    use std::sync::Arc;

    fn trade(id: &str) -> Trade {
        Trade {
            trade_id: id.into(),
            instrument_symbol: "INFY".into(),
            account_id: "ACC1".into(),
            client_id: "CL1".into(),
            order_id: "O1".into(),
            trader_id: "TR1".into(),
            trade_type: TradeType::Buy,
            segment: MarketSegment::Equity,
            quantity: 10,
            price: 100.0,
            value: 1000.0,
            exchange: "NSE".into(),
            timestamp: Ts::from_secs(1),
            brokerage: None,
            taxes: None,
            is_own_account: None,
        }
    }

    #[rstest]
    #[case(2)] // Tiny pool
    #[case(16)] // Small pool
    #[case(256)] // Medium pool
    fn test_pool_fill_drain_reuse(#[case] capacity: usize) {
        let pool = TradePool::new(capacity);

        // Fill to the brim.
        let mut slots = Vec::new();
        for i in 0..capacity {
            slots.push(pool.allocate(trade(&format!("T{i}"))).expect("slot"));
        }
        assert!(pool.is_exhausted());
        assert!(pool.allocate(trade("overflow")).is_err());

        // Return one, get one.
        pool.deallocate(slots.pop().expect("held slot"));
        let reused = pool.allocate(trade("reused")).expect("slot after free");
        assert_eq!(pool.get(&reused).trade_id, "reused");
        slots.push(reused);

        for slot in slots {
            pool.deallocate(slot);
        }
        assert_eq!(pool.allocated(), 0);
    }

    #[rstest]
    #[case(4, 2)] // More threads than slots
    #[case(64, 4)] // Comfortable pool
    fn test_pool_contention(#[case] capacity: usize, #[case] threads: usize) {
        let pool = Arc::new(TradePool::new(capacity));

        let handles: Vec<_> = (0..threads)
            .map(|w| {
                let pool = Arc::clone(&pool);
                std::thread::spawn(move || {
                    let mut acquired = 0u32;
                    for i in 0..2000 {
                        if let Ok(slot) = pool.allocate(trade(&format!("T{w}-{i}"))) {
                            acquired += 1;
                            pool.deallocate(slot);
                        }
                    }
                    acquired
                })
            })
            .collect();

        let total: u32 = handles
            .into_iter()
            .map(|h| h.join().expect("worker"))
            .sum();
        assert!(total > 0);
        assert_eq!(pool.allocated(), 0);
    }
}

mod queue_tests {
    use common::{MarketSegment, Trade, TradeType, Ts};
    use engine::memory::TradePool;
    use engine::queue::IngressQueue;
    use rstest::rstest;

    fn trade(id: &str) -> Trade {
        Trade {
            trade_id: id.into(),
            instrument_symbol: "TCS".into(),
            account_id: "ACC1".into(),
            client_id: "CL1".into(),
            order_id: "O1".into(),
            trader_id: "TR1".into(),
            trade_type: TradeType::Buy,
            segment: MarketSegment::Equity,
            quantity: 10,
            price: 100.0,
            value: 1000.0,
            exchange: "NSE".into(),
            timestamp: Ts::from_secs(1),
            brokerage: None,
            taxes: None,
            is_own_account: None,
        }
    }

    #[rstest]
    #[case(1)]
    #[case(4)]
    #[case(64)]
    fn test_queue_capacity_respected(#[case] capacity: usize) {
        let pool = TradePool::new(capacity + 1);
        let queue = IngressQueue::new(capacity);

        for i in 0..capacity {
            let slot = pool.allocate(trade(&format!("T{i}"))).expect("slot");
            assert!(queue.try_push(slot).is_ok());
        }
        assert_eq!(queue.size_hint(), capacity);

        let slot = pool.allocate(trade("extra")).expect("slot");
        let bounced = queue.try_push(slot).expect_err("full queue");
        pool.deallocate(bounced);

        while let Some(slot) = queue.try_pop() {
            pool.deallocate(slot);
        }
        assert_eq!(pool.allocated(), 0);
    }
}

mod context_tests {
    use common::{ContextKey, MarketSegment, Trade, TradeType, Ts};
    use engine::context::ContextStore;
    use rstest::rstest;
    use std::time::Duration;

    fn trade(id: &str, secs: u64) -> Trade {
        Trade {
            trade_id: id.into(),
            instrument_symbol: "INST1".into(),
            account_id: "ACC1".into(),
            client_id: "CL1".into(),
            order_id: format!("O-{id}"),
            trader_id: "TR1".into(),
            trade_type: TradeType::Buy,
            segment: MarketSegment::Equity,
            quantity: 100,
            price: 50.0,
            value: 5000.0,
            exchange: "NSE".into(),
            timestamp: Ts::from_secs(secs),
            brokerage: None,
            taxes: None,
            is_own_account: None,
        }
    }

    #[rstest]
    #[case(60, vec![0, 30, 90], 2)] // t=0 pruned when t=90 arrives
    #[case(300, vec![0, 30, 90], 3)] // Wide window retains everything
    #[case(0, vec![0, 30, 90], 1)] // Zero lookback keeps only the trigger
    fn test_window_retention(
        #[case] lookback_secs: u64,
        #[case] stamps: Vec<u64>,
        #[case] expected: usize,
    ) {
        let store = ContextStore::new(Duration::from_secs(lookback_secs), 100_000);
        let key = ContextKey::new("INST1", "ACC1");

        let mut last = None;
        for (i, secs) in stamps.iter().enumerate() {
            last = Some(store.update(&key, &trade(&format!("T{i}"), *secs)));
        }
        let ctx = last.expect("snapshot");
        assert_eq!(ctx.recent_trades.len(), expected);
    }

    #[rstest]
    #[case(2, 10)] // Aggressive cap
    #[case(8, 10)] // Cap larger than any single window
    fn test_retained_cap_holds(#[case] cap: usize, #[case] keys: usize) {
        let store = ContextStore::new(Duration::from_secs(300), cap);

        for i in 0..keys {
            let key = ContextKey::new(format!("INST{i}"), format!("ACC{i}"));
            let mut t = trade(&format!("T{i}"), 100 + i as u64);
            t.instrument_symbol = format!("INST{i}");
            t.account_id = format!("ACC{i}");
            store.update(&key, &t);
        }

        assert!(store.retained() <= cap);
    }
}

mod registry_tests {
    use common::{Alert, Trade};
    use engine::registry::DetectorRegistry;
    use engine::{DetectorError, HistoricalContext, PatternConfig, PatternDetector};
    use rstest::rstest;
    use std::sync::Arc;

    struct NamedDetector(String);

    impl PatternDetector for NamedDetector {
        fn name(&self) -> &str {
            &self.0
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

    #[rstest]
    #[case(3, 0)] // Nothing disabled
    #[case(3, 2)] // Some disabled
    #[case(4, 4)] // Everything disabled
    fn test_snapshot_reflects_toggles(#[case] total: usize, #[case] disabled: usize) {
        let registry = DetectorRegistry::new();
        for i in 0..total {
            let name = format!("pattern_{i}");
            registry.register(&name, Arc::new(NamedDetector(name.clone())));
        }
        for i in 0..disabled {
            assert!(registry.set_enabled(&format!("pattern_{i}"), false));
        }

        let mut buf = Vec::new();
        registry.snapshot_enabled_into(&mut buf);
        assert_eq!(buf.len(), total - disabled);
    }

    #[rstest]
    fn test_scratch_buffer_reuse_clears_previous_pass() {
        let registry = DetectorRegistry::new();
        registry.register("a", Arc::new(NamedDetector("a".into())));
        registry.register("b", Arc::new(NamedDetector("b".into())));

        let mut buf = Vec::new();
        registry.snapshot_enabled_into(&mut buf);
        assert_eq!(buf.len(), 2);

        registry.set_enabled("a", false);
        registry.snapshot_enabled_into(&mut buf);
        assert_eq!(buf.len(), 1);
        assert_eq!(buf[0].name(), "b");
    }
}
