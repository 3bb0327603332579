//! Concrete adapter implementations for ports.

pub mod csv_adapter;
pub mod file_config_adapter;
pub mod journal_csv_adapter;
pub mod markdown_report;
pub mod signal_csv_adapter;
#[cfg(feature = "yahoo")]
pub mod yahoo_adapter;
