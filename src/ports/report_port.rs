//! Report output port trait.

use std::path::{Path, PathBuf};

use crate::domain::error::SignaltraderError;
use crate::domain::report::BacktestReport;

/// Port for writing backtest reports.
pub trait ReportPort {
    /// Write the report's artifacts under `output_dir`, returning the paths
    /// that were created.
    fn write(
        &self,
        report: &BacktestReport,
        output_dir: &Path,
    ) -> Result<Vec<PathBuf>, SignaltraderError>;
}
