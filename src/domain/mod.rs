//! Core domain types and logic.

pub mod backtest;
pub mod config_validation;
pub mod error;
pub mod indicator;
pub mod ledger;
pub mod metrics;
pub mod ohlcv;
pub mod portfolio;
pub mod report;
pub mod signal;
pub mod strategies;
pub mod strategy;
