//! Core domain types and logic.

pub mod ohlcv;
pub mod indicator;
pub mod indicator_spec;
pub mod signal;
pub mod sizing;
pub mod playbook;
pub mod registry;
pub mod universe;
pub mod watchlist;
pub mod journal;
pub mod position;
pub mod portfolio;
pub mod execution;
pub mod symbol_data;
pub mod backtest;
pub mod metrics;
pub mod config_validation;
pub mod error;
