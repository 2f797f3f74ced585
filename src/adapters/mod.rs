//! Concrete adapter implementations for ports.

pub mod csv_adapter;
pub mod csv_export_adapter;
pub mod file_config_adapter;
pub mod memory_ledger;
#[cfg(feature = "sqlite")]
pub mod sqlite_adapter;
pub mod text_report_adapter;
