//! CSV file data adapter: price history and precomputed signal series.
//!
//! Columns are located by header name (case-insensitive), so extra columns
//! and any column order are accepted. Empty cells read as NaN.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;

use crate::domain::error::SignaltraderError;
use crate::domain::ohlcv::PriceBar;
use crate::domain::signal::{SignalSeries, PRICE_COLUMN, SIGNAL_COLUMN};
use crate::ports::data_port::PriceDataPort;

const DATE_COLUMNS: [&str; 2] = ["date", "timestamp"];

pub struct CsvPriceAdapter {
    path: PathBuf,
}

impl CsvPriceAdapter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

fn data_load(path: &Path, reason: impl Into<String>) -> SignaltraderError {
    SignaltraderError::DataLoad {
        path: path.display().to_string(),
        reason: reason.into(),
    }
}

/// Accepts `YYYY-MM-DD`, optionally followed by a time part.
fn parse_date(path: &Path, text: &str) -> Result<NaiveDate, SignaltraderError> {
    let trimmed = text.trim();
    let day = trimmed.get(..10).unwrap_or(trimmed);
    NaiveDate::parse_from_str(day, "%Y-%m-%d")
        .map_err(|e| data_load(path, format!("invalid date '{}': {}", trimmed, e)))
}

fn parse_number(path: &Path, column: &str, text: &str) -> Result<f64, SignaltraderError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Ok(f64::NAN);
    }
    trimmed
        .parse::<f64>()
        .map_err(|e| data_load(path, format!("invalid {} value '{}': {}", column, trimmed, e)))
}

struct CsvTable {
    headers: Vec<String>,
    rows: Vec<csv::StringRecord>,
}

impl CsvTable {
    fn read(path: &Path) -> Result<Self, SignaltraderError> {
        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(path)
            .map_err(|e| data_load(path, e.to_string()))?;

        let headers = rdr
            .headers()
            .map_err(|e| data_load(path, format!("CSV header error: {}", e)))?
            .iter()
            .map(|h| h.to_lowercase())
            .collect();

        let mut rows = Vec::new();
        for result in rdr.records() {
            rows.push(result.map_err(|e| data_load(path, format!("CSV parse error: {}", e)))?);
        }

        Ok(Self { headers, rows })
    }

    fn column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    fn date_column(&self, path: &Path) -> Result<usize, SignaltraderError> {
        DATE_COLUMNS
            .iter()
            .find_map(|name| self.column(name))
            .ok_or_else(|| data_load(path, "missing date column"))
    }
}

impl PriceDataPort for CsvPriceAdapter {
    fn load_bars(&self) -> Result<Vec<PriceBar>, SignaltraderError> {
        let path = self.path.as_path();
        let table = CsvTable::read(path)?;

        let date_idx = table.date_column(path)?;
        let close_idx = table
            .column("close")
            .or_else(|| table.column("adj close"))
            .or_else(|| table.column(PRICE_COLUMN))
            .ok_or_else(|| data_load(path, "missing close column"))?;
        let open_idx = table.column("open");
        let high_idx = table.column("high");
        let low_idx = table.column("low");
        let volume_idx = table.column("volume");

        let mut bars = Vec::with_capacity(table.rows.len());
        for record in &table.rows {
            let field = |idx: usize| record.get(idx).unwrap_or("");
            let optional = |idx: Option<usize>, name: &str, fallback: f64| match idx {
                Some(i) => parse_number(path, name, field(i)),
                None => Ok(fallback),
            };

            let date = parse_date(path, field(date_idx))?;
            let close = parse_number(path, "close", field(close_idx))?;
            let volume = optional(volume_idx, "volume", 0.0)?;

            bars.push(PriceBar {
                date,
                open: optional(open_idx, "open", close)?,
                high: optional(high_idx, "high", close)?,
                low: optional(low_idx, "low", close)?,
                close,
                volume: if volume.is_finite() { volume as i64 } else { 0 },
            });
        }

        bars.sort_by_key(|b| b.date);
        Ok(bars)
    }
}

/// Load a precomputed signal series. `price` and `signal` columns are
/// required; every other numeric column is kept as an indicator.
pub fn load_signal_series(path: impl AsRef<Path>) -> Result<SignalSeries, SignaltraderError> {
    let path = path.as_ref();
    let table = CsvTable::read(path)?;
    let date_idx = table.date_column(path)?;

    let missing: Vec<&str> = [PRICE_COLUMN, SIGNAL_COLUMN]
        .into_iter()
        .filter(|c| table.column(c).is_none())
        .collect();
    if !missing.is_empty() {
        return Err(SignaltraderError::invalid_input(format!(
            "{}: missing required columns: {}",
            path.display(),
            missing.join(", ")
        )));
    }

    let mut timestamps = Vec::with_capacity(table.rows.len());
    let mut columns: BTreeMap<String, Vec<f64>> = table
        .headers
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != date_idx)
        .map(|(_, name)| (name.clone(), Vec::with_capacity(table.rows.len())))
        .collect();

    for record in &table.rows {
        timestamps.push(parse_date(path, record.get(date_idx).unwrap_or(""))?);
        for (i, name) in table.headers.iter().enumerate() {
            if i == date_idx {
                continue;
            }
            let value = parse_number(path, name, record.get(i).unwrap_or(""))?;
            if let Some(column) = columns.get_mut(name) {
                column.push(value);
            }
        }
    }

    SignalSeries::from_columns(timestamps, columns)
}
