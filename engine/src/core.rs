//! Surveillance engine: lifecycle, ingress and the worker pool
//!
//! The engine owns every subcomponent outright (no cycles, detectors never
//! reference the engine back). Trades enter through [`Engine::submit`],
//! travel pool slot → ingress queue → worker, fan out across the enabled
//! detectors, and any alerts leave through the single dispatcher thread.

use crate::config::{self, EngineConfig};
use crate::context::{ContextStore, QuoteSnapshot};
use crate::detector::{PatternConfig, PatternDetector};
use crate::dispatch::{self, AlertSink, SinkSlot};
use crate::memory::{Slot, TradePool};
use crate::patterns::{
    FrontRunningDetector, InsiderTradingDetector, LayeringDetector, PumpDumpDetector,
    WashTradingDetector,
};
use crate::queue::IngressQueue;
use crate::registry::{DetectorEntry, DetectorRegistry};
use crate::stats::{EngineCounters, ProcessingStats};
use common::{Alert, ContextKey, Trade, Ts};
use crossbeam::channel::{self, Sender};
use parking_lot::{Mutex, RwLock};
use rustc_hash::FxHashMap;
use std::path::Path;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;
use tracing::{debug, error, info, warn};

const STATE_CREATED: u8 = 0;
const STATE_INITIALIZED: u8 = 1;
const STATE_RUNNING: u8 = 2;
const STATE_STOPPING: u8 = 3;
const STATE_STOPPED: u8 = 4;

/// Engine lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// Constructed, not yet initialized
    Created,
    /// Detectors registered, configuration loaded
    Initialized,
    /// Workers and dispatcher running
    Running,
    /// Stop requested, draining
    Stopping,
    /// Fully drained and joined
    Stopped,
}

impl EngineState {
    fn from_u8(value: u8) -> Self {
        match value {
            STATE_CREATED => Self::Created,
            STATE_INITIALIZED => Self::Initialized,
            STATE_RUNNING => Self::Running,
            STATE_STOPPING => Self::Stopping,
            _ => Self::Stopped,
        }
    }
}

struct EngineShared {
    config: EngineConfig,
    state: AtomicU8,
    pool: TradePool,
    ingress: IngressQueue,
    contexts: ContextStore,
    registry: DetectorRegistry,
    counters: EngineCounters,
    sink: SinkSlot,
    epoch: Instant,
    reset_elapsed_ns: AtomicU64,
}

/// Real-time trade-surveillance engine
pub struct Engine {
    shared: Arc<EngineShared>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    dispatcher: Mutex<Option<JoinHandle<()>>>,
    alert_tx: Mutex<Option<Sender<Alert>>>,
}

impl Engine {
    /// Construct an engine with pre-sized pool, queues and context store
    pub fn new(config: EngineConfig) -> Self {
        let shared = EngineShared {
            pool: TradePool::new(config.pool_size),
            ingress: IngressQueue::new(config.queue_size),
            contexts: ContextStore::new(config.lookback_window, config.context_max_trades),
            registry: DetectorRegistry::new(),
            counters: EngineCounters::new(),
            sink: RwLock::new(None),
            state: AtomicU8::new(STATE_CREATED),
            epoch: Instant::now(),
            reset_elapsed_ns: AtomicU64::new(0),
            config,
        };
        info!(
            workers = shared.config.num_threads,
            queue_size = shared.config.queue_size,
            pool_size = shared.config.pool_size,
            "surveillance engine created"
        );
        Self {
            shared: Arc::new(shared),
            workers: Mutex::new(Vec::new()),
            dispatcher: Mutex::new(None),
            alert_tx: Mutex::new(None),
        }
    }

    /// Current lifecycle state
    pub fn state(&self) -> EngineState {
        EngineState::from_u8(self.shared.state.load(Ordering::Acquire))
    }

    /// Register the built-in detectors and load `patterns.<name>` configs
    /// from the JSON file at `config_path`. Returns false (without a state
    /// change) on a malformed file or when called out of order.
    pub fn initialize(&self, config_path: impl AsRef<Path>) -> bool {
        let state = self.shared.state.load(Ordering::Acquire);
        if state != STATE_CREATED {
            warn!(state = ?EngineState::from_u8(state), "initialize called out of order");
            return false;
        }

        let configs = match config::load_pattern_configs(config_path) {
            Ok(configs) => configs,
            Err(e) => {
                error!(error = %e, "failed to load configuration");
                return false;
            }
        };

        self.register_builtin_detectors();

        for (name, pattern_config) in &configs {
            if self.shared.registry.get(name).is_some() {
                self.shared.registry.update_config(name, pattern_config);
                if let Some(enabled) = pattern_config.enabled() {
                    self.shared.registry.set_enabled(name, enabled);
                }
            } else {
                warn!(pattern = %name, "config entry for unregistered pattern");
            }
        }

        self.shared.state.store(STATE_INITIALIZED, Ordering::Release);
        info!(
            patterns = self.shared.registry.len(),
            "surveillance engine initialized"
        );
        true
    }

    /// Spawn the worker pool and the alert dispatcher
    pub fn start(&self) -> bool {
        if self
            .shared
            .state
            .compare_exchange(
                STATE_INITIALIZED,
                STATE_RUNNING,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_err()
        {
            warn!("start called when engine is not initialized");
            return false;
        }

        let (tx, rx) = channel::bounded::<Alert>(self.shared.config.alert_queue_size);

        let dispatcher_shared = Arc::clone(&self.shared);
        let dispatcher = thread::Builder::new()
            .name("alert-dispatcher".into())
            .spawn(move || {
                dispatch::dispatcher_loop(
                    &rx,
                    &dispatcher_shared.sink,
                    &dispatcher_shared.counters,
                )
            });
        match dispatcher {
            Ok(handle) => *self.dispatcher.lock() = Some(handle),
            Err(e) => {
                error!(error = %e, "failed to spawn alert dispatcher");
                self.abort_start(tx);
                return false;
            }
        }

        let mut workers = Vec::with_capacity(self.shared.config.num_threads);
        for i in 0..self.shared.config.num_threads {
            let shared = Arc::clone(&self.shared);
            let worker_tx = tx.clone();
            let spawned = thread::Builder::new()
                .name(format!("surveillance-worker-{i}"))
                .spawn(move || worker_loop(&shared, &worker_tx));
            match spawned {
                Ok(handle) => workers.push(handle),
                Err(e) => {
                    error!(error = %e, "failed to spawn surveillance worker");
                    *self.workers.lock() = workers;
                    self.abort_start(tx);
                    return false;
                }
            }
        }
        *self.workers.lock() = workers;
        *self.alert_tx.lock() = Some(tx);

        info!(
            workers = self.shared.config.num_threads,
            "surveillance engine started"
        );
        true
    }

    /// Validate and enqueue one trade. Returns false when the engine is not
    /// running, validation fails, or pool/queue resources are exhausted;
    /// every drop is observable through a counter.
    pub fn submit(&self, trade: Trade) -> bool {
        let shared = &self.shared;
        if shared.state.load(Ordering::Acquire) != STATE_RUNNING {
            return false;
        }
        shared.counters.trades_submitted.fetch_add(1, Ordering::Relaxed);

        if !trade.is_valid() || trade.timestamp > Ts::now() {
            shared
                .counters
                .validation_rejects
                .fetch_add(1, Ordering::Relaxed);
            warn!(trade_id = %trade.trade_id, "rejecting invalid trade");
            return false;
        }

        match shared.pool.allocate(trade) {
            Ok(slot) => match shared.ingress.try_push(slot) {
                Ok(()) => true,
                Err(slot) => {
                    warn!(
                        trade_id = %shared.pool.get(&slot).trade_id,
                        "ingress queue full, dropping trade"
                    );
                    shared.pool.deallocate(slot);
                    shared.counters.submit_drops.fetch_add(1, Ordering::Relaxed);
                    false
                }
            },
            Err(trade) => {
                shared.counters.submit_drops.fetch_add(1, Ordering::Relaxed);
                error!(trade_id = %trade.trade_id, "memory pool exhausted, dropping trade");
                false
            }
        }
    }

    /// Submit a batch, returning how many trades were accepted
    pub fn submit_batch(&self, trades: Vec<Trade>) -> usize {
        trades
            .into_iter()
            .map(|trade| self.submit(trade))
            .filter(|accepted| *accepted)
            .count()
    }

    /// Drain the ingress queue, join the workers, drain the alert queue,
    /// join the dispatcher. Idempotent; a no-op unless the engine is
    /// running. Safe to call from `Drop`.
    pub fn stop(&self) {
        if self
            .shared
            .state
            .compare_exchange(
                STATE_RUNNING,
                STATE_STOPPING,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_err()
        {
            return;
        }
        info!("stopping surveillance engine");

        self.shutdown_threads();
        self.shared.state.store(STATE_STOPPED, Ordering::Release);

        let stats = self.get_statistics();
        info!(
            trades = stats.trades_processed,
            alerts = stats.alerts_generated,
            throughput_tps = stats.throughput_trades_per_second,
            "surveillance engine stopped"
        );
    }

    /// Register a custom detector. Same-name registration replaces the
    /// previous entry.
    pub fn register_detector(&self, name: &str, detector: Arc<dyn PatternDetector>) {
        self.shared.registry.register(name, detector);
    }

    /// Enable or disable one pattern without evicting it
    pub fn toggle_pattern(&self, name: &str, enabled: bool) {
        self.shared.registry.set_enabled(name, enabled);
    }

    /// Push new parameters to one pattern
    pub fn update_pattern_config(&self, name: &str, config: &PatternConfig) {
        self.shared.registry.update_config(name, config);
    }

    /// Install the alert sink; takes effect for subsequent alerts even
    /// while running.
    pub fn set_alert_sink<S: AlertSink + 'static>(&self, sink: S) {
        *self.shared.sink.write() = Some(Arc::new(sink));
        info!("alert sink installed");
    }

    /// Feed the latest quote snapshot for a context key
    pub fn update_quote(&self, key: &ContextKey, quote: QuoteSnapshot) {
        self.shared.contexts.update_quote(key, quote);
    }

    /// Override the lookback window for one context key
    pub fn configure_context(&self, key: &ContextKey, lookback: std::time::Duration) {
        self.shared.contexts.configure(key, lookback);
    }

    /// Point-in-time statistics snapshot; readable without locks
    pub fn get_statistics(&self) -> ProcessingStats {
        let shared = &self.shared;
        let counters = &shared.counters;

        let trades_processed = counters.trades_processed.load(Ordering::Relaxed);
        let total_ns = counters.total_processing_time_ns.load(Ordering::Relaxed);
        let elapsed_ns = (shared.epoch.elapsed().as_nanos() as u64)
            .saturating_sub(shared.reset_elapsed_ns.load(Ordering::Relaxed));
        let elapsed_secs = elapsed_ns as f64 / 1e9;

        let mut pattern_alerts_count = FxHashMap::default();
        let mut pattern_processing_time_ns = FxHashMap::default();
        let mut pattern_errors = FxHashMap::default();
        for entry in shared.registry.entries() {
            pattern_alerts_count.insert(entry.name().to_owned(), entry.alerts_count());
            pattern_processing_time_ns.insert(entry.name().to_owned(), entry.processing_time_ns());
            pattern_errors.insert(entry.name().to_owned(), entry.error_count());
        }

        ProcessingStats {
            trades_submitted: counters.trades_submitted.load(Ordering::Relaxed),
            trades_processed,
            alerts_generated: counters.alerts_generated.load(Ordering::Relaxed),
            validation_rejects: counters.validation_rejects.load(Ordering::Relaxed),
            submit_drops: counters.submit_drops.load(Ordering::Relaxed),
            alert_drops: counters.alert_drops.load(Ordering::Relaxed),
            sink_errors: counters.sink_errors.load(Ordering::Relaxed),
            avg_processing_time_ns: total_ns / trades_processed.max(1),
            peak_processing_time_ns: counters.peak_processing_time_ns.load(Ordering::Relaxed),
            throughput_trades_per_second: if elapsed_secs > 0.0 {
                trades_processed as f64 / elapsed_secs
            } else {
                0.0
            },
            queue_size: shared.ingress.size_hint(),
            pattern_alerts_count,
            pattern_processing_time_ns,
            pattern_errors,
            snapshot_at: Ts::now(),
        }
    }

    /// Zero all counters and restart the throughput clock
    pub fn reset_statistics(&self) {
        self.shared.counters.reset();
        for entry in self.shared.registry.entries() {
            entry.reset_counters();
        }
        self.shared
            .reset_elapsed_ns
            .store(self.shared.epoch.elapsed().as_nanos() as u64, Ordering::Relaxed);
    }

    /// Slots currently handed out by the trade pool
    pub fn pool_in_use(&self) -> usize {
        self.shared.pool.allocated()
    }

    fn register_builtin_detectors(&self) {
        let registry = &self.shared.registry;
        registry.register("pump_dump", Arc::new(PumpDumpDetector::new()));
        registry.register("layering", Arc::new(LayeringDetector::new()));
        registry.register("wash_trading", Arc::new(WashTradingDetector::new()));
        registry.register("insider_trading", Arc::new(InsiderTradingDetector::new()));
        registry.register("front_running", Arc::new(FrontRunningDetector::new()));
    }

    /// Roll back a partially-started engine after a spawn failure
    fn abort_start(&self, tx: Sender<Alert>) {
        self.shared.state.store(STATE_STOPPING, Ordering::Release);
        drop(tx);
        self.shutdown_threads();
        self.shared.state.store(STATE_STOPPED, Ordering::Release);
    }

    fn shutdown_threads(&self) {
        let workers: Vec<_> = self.workers.lock().drain(..).collect();
        for handle in workers {
            if handle.join().is_err() {
                error!("surveillance worker panicked during shutdown");
            }
        }

        // Dropping the last sender lets the dispatcher drain and exit.
        drop(self.alert_tx.lock().take());

        if let Some(handle) = self.dispatcher.lock().take() {
            if handle.join().is_err() {
                error!("alert dispatcher panicked during shutdown");
            }
        }
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.stop();
    }
}

fn worker_loop(shared: &Arc<EngineShared>, alert_tx: &Sender<Alert>) {
    debug!("surveillance worker started");
    let mut scratch: Vec<Arc<DetectorEntry>> = Vec::with_capacity(8);
    loop {
        match shared.ingress.try_pop() {
            Some(slot) => process_trade(shared, alert_tx, slot, &mut scratch),
            None => {
                // Once a stop is requested, an empty queue means drained.
                if shared.state.load(Ordering::Acquire) != STATE_RUNNING {
                    break;
                }
                thread::yield_now();
            }
        }
    }
    debug!("surveillance worker finished");
}

fn process_trade(
    shared: &EngineShared,
    alert_tx: &Sender<Alert>,
    slot: Slot,
    scratch: &mut Vec<Arc<DetectorEntry>>,
) {
    let started = Instant::now();

    let trade = shared.pool.get(&slot);
    if trade.is_valid() {
        let key = ContextKey::from_trade(trade);
        let context = shared.contexts.update(&key, trade);
        shared.registry.snapshot_enabled_into(scratch);

        for entry in scratch.iter() {
            let detect_started = Instant::now();
            match entry.detector().detect(trade, &context) {
                Ok(Some(alert)) => {
                    entry.record_alert();
                    shared
                        .counters
                        .alerts_generated
                        .fetch_add(1, Ordering::Relaxed);
                    info!(
                        pattern = entry.name(),
                        trade_id = %trade.trade_id,
                        title = %alert.title,
                        "alert generated"
                    );
                    if alert_tx
                        .send_timeout(alert, shared.config.alert_enqueue_timeout)
                        .is_err()
                    {
                        shared.counters.alert_drops.fetch_add(1, Ordering::Relaxed);
                        warn!(
                            pattern = entry.name(),
                            "alert queue saturated, dropping alert"
                        );
                    }
                }
                Ok(None) => {}
                Err(e) => {
                    entry.record_error();
                    error!(
                        pattern = entry.name(),
                        error = %e,
                        "pattern detector failed"
                    );
                }
            }
            entry.record_time(detect_started.elapsed().as_nanos() as u64);
        }
        scratch.clear();
    } else {
        // Submit already validated; anything invalid here is a defect
        // upstream, not a reason to stall the worker.
        warn!(trade_id = %trade.trade_id, "invalid trade reached a worker, discarding");
    }

    shared
        .counters
        .record_processing(started.elapsed().as_nanos() as u64);
    shared.pool.deallocate(slot);
    shared
        .counters
        .trades_processed
        .fetch_add(1, Ordering::Relaxed);
}
