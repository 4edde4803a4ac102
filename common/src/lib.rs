//! Common types for the Sentinel trade-surveillance platform

#![deny(warnings)]
#![deny(clippy::all)]
#![deny(dead_code)]
#![deny(unused)]
#![deny(missing_docs)]
#![forbid(unsafe_code)]

pub mod alert;
pub mod trade;
pub mod types;

pub use alert::*;
pub use trade::*;
pub use types::*;
