//! CSV export adapter implementing ReportPort.
//!
//! Writes two files per report:
//! - `<strategy>_daily_ledger.csv`: one row per snapshot with trade markers,
//!   period return and cumulative return (both in percent).
//! - `<strategy>_trade_analysis.csv`: one row per completed round trip.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use tracing::info;

use crate::domain::error::SignaltraderError;
use crate::domain::ledger::TradeRecord;
use crate::domain::report::BacktestReport;
use crate::ports::report_port::ReportPort;

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Default)]
pub struct CsvExportAdapter;

impl CsvExportAdapter {
    pub fn new() -> Self {
        Self
    }

    pub fn daily_ledger_path(output_dir: &Path, strategy_id: &str) -> PathBuf {
        output_dir.join(format!("{}_daily_ledger.csv", strategy_id))
    }

    pub fn trade_analysis_path(output_dir: &Path, strategy_id: &str) -> PathBuf {
        output_dir.join(format!("{}_trade_analysis.csv", strategy_id))
    }
}

fn csv_err(path: &Path, e: impl std::fmt::Display) -> SignaltraderError {
    SignaltraderError::Io(std::io::Error::other(format!(
        "failed to write {}: {}",
        path.display(),
        e
    )))
}

fn optional_number(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn write_daily_ledger(report: &BacktestReport, path: &Path) -> Result<(), SignaltraderError> {
    // Last trade of the day wins the marker.
    let trades_by_date: HashMap<NaiveDate, &TradeRecord> =
        report.trades.iter().map(|t| (t.timestamp, t)).collect();

    let mut wtr = csv::Writer::from_path(path).map_err(|e| csv_err(path, e))?;
    wtr.write_record([
        "date",
        "cash",
        "holdings_value",
        "total_value",
        "shares_held",
        "price",
        "trade_type",
        "trade_price",
        "trade_shares",
        "daily_return",
        "cumulative_return",
    ])
    .map_err(|e| csv_err(path, e))?;

    let first_value = report.snapshots.first().map(|s| s.total_value);
    let mut prev_value: Option<f64> = None;

    for snapshot in &report.snapshots {
        let trade = trades_by_date.get(&snapshot.timestamp);
        let daily_return = prev_value
            .filter(|p| *p > 0.0)
            .map(|p| (snapshot.total_value - p) / p * 100.0);
        let cumulative_return = first_value
            .filter(|f| *f > 0.0)
            .map(|f| (snapshot.total_value / f - 1.0) * 100.0);

        wtr.write_record([
            snapshot.timestamp.format(DATE_FORMAT).to_string(),
            snapshot.cash.to_string(),
            snapshot.holdings_value.to_string(),
            snapshot.total_value.to_string(),
            snapshot.shares_held.to_string(),
            snapshot.price.to_string(),
            trade.map(|t| t.trade_type.as_str().to_string()).unwrap_or_default(),
            optional_number(trade.map(|t| t.price)),
            optional_number(trade.map(|t| t.shares)),
            optional_number(daily_return),
            optional_number(cumulative_return),
        ])
        .map_err(|e| csv_err(path, e))?;

        prev_value = Some(snapshot.total_value);
    }

    wtr.flush()?;
    Ok(())
}

fn write_trade_analysis(report: &BacktestReport, path: &Path) -> Result<(), SignaltraderError> {
    let mut wtr = csv::Writer::from_path(path).map_err(|e| csv_err(path, e))?;
    wtr.write_record([
        "Trade_Number",
        "Entry_Date",
        "Entry_Price",
        "Exit_Date",
        "Exit_Price",
        "Shares",
        "Profit_Loss_Dollar",
        "Profit_Loss_Percent",
        "Trade_Duration_Days",
        "Trade_Type",
    ])
    .map_err(|e| csv_err(path, e))?;

    for trade in report.completed_trades() {
        wtr.write_record([
            trade.trade_number.to_string(),
            trade.entry_date.format(DATE_FORMAT).to_string(),
            trade.entry_price.to_string(),
            trade.exit_date.format(DATE_FORMAT).to_string(),
            trade.exit_price.to_string(),
            trade.shares.to_string(),
            trade.pnl.to_string(),
            trade.pnl_pct.to_string(),
            trade.duration_days.to_string(),
            if trade.is_win() { "Win" } else { "Loss" }.to_string(),
        ])
        .map_err(|e| csv_err(path, e))?;
    }

    wtr.flush()?;
    Ok(())
}

impl ReportPort for CsvExportAdapter {
    fn write(
        &self,
        report: &BacktestReport,
        output_dir: &Path,
    ) -> Result<Vec<PathBuf>, SignaltraderError> {
        fs::create_dir_all(output_dir)?;

        let daily = Self::daily_ledger_path(output_dir, &report.strategy_id);
        write_daily_ledger(report, &daily)?;

        let analysis = Self::trade_analysis_path(output_dir, &report.strategy_id);
        write_trade_analysis(report, &analysis)?;

        info!(
            daily = %daily.display(),
            trades = %analysis.display(),
            "exported backtest CSVs"
        );
        Ok(vec![daily, analysis])
    }
}
