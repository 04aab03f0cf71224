//! SLP Payout: claim guild rewards and split them between scholar, academy and fee.
//!
//! Pipeline: config → claim (retryable) → plan → operator review → execute.

pub mod api;
pub mod blockchain;
pub mod config;
pub mod logging;
pub mod payout;
pub mod presenter;
