//! Built-in pattern detectors
//!
//! Registered at `initialize` under the names `pump_dump`, `layering`,
//! `wash_trading`, `insider_trading` and `front_running`. Each holds its
//! thresholds behind a lock that `update_config` swaps atomically, so an
//! in-flight `detect` sees the old or the new parameters, never a blend.

mod front_running;
mod insider_trading;
mod layering;
mod pump_dump;
mod wash_trading;

pub use front_running::{FrontRunningConfig, FrontRunningDetector};
pub use insider_trading::{InsiderTradingConfig, InsiderTradingDetector};
pub use layering::{LayeringConfig, LayeringDetector};
pub use pump_dump::{PumpDumpConfig, PumpDumpDetector};
pub use wash_trading::{WashTradingConfig, WashTradingDetector};
