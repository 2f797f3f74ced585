//! Plain-text report adapter implementing ReportPort.

use std::fs;
use std::path::{Path, PathBuf};

use crate::domain::error::SignaltraderError;
use crate::domain::report::BacktestReport;
use crate::ports::report_port::ReportPort;

#[derive(Debug, Default)]
pub struct TextReportAdapter;

impl TextReportAdapter {
    pub fn new() -> Self {
        Self
    }
}

impl ReportPort for TextReportAdapter {
    fn write(
        &self,
        report: &BacktestReport,
        output_dir: &Path,
    ) -> Result<Vec<PathBuf>, SignaltraderError> {
        fs::create_dir_all(output_dir)?;
        let path = output_dir.join(format!("{}_report.txt", report.strategy_id));
        fs::write(&path, report.render_text())?;
        Ok(vec![path])
    }
}
