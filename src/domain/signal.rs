//! Signal series: the per-period input to the simulation engine.

use chrono::NaiveDate;
use std::collections::BTreeMap;

use super::error::SignaltraderError;

pub const PRICE_COLUMN: &str = "price";
pub const SIGNAL_COLUMN: &str = "signal";

/// Indicator field read by the default exit policy.
pub const MIDDLE_BAND: &str = "middle_band";
pub const UPPER_BAND: &str = "upper_band";
pub const LOWER_BAND: &str = "lower_band";
pub const SHORT_MA: &str = "short_ma";
pub const LONG_MA: &str = "long_ma";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Signal {
    #[default]
    None,
    Buy,
}

impl Signal {
    /// `1.0` is a buy; everything else, NaN included, is no action.
    pub fn from_value(value: f64) -> Self {
        if value == 1.0 { Signal::Buy } else { Signal::None }
    }

    pub fn as_value(self) -> f64 {
        match self {
            Signal::None => 0.0,
            Signal::Buy => 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SignalRecord {
    pub timestamp: NaiveDate,
    pub price: f64,
    pub signal: Signal,
    pub indicators: BTreeMap<String, f64>,
}

impl SignalRecord {
    pub fn new(timestamp: NaiveDate, price: f64, signal: Signal) -> Self {
        SignalRecord {
            timestamp,
            price,
            signal,
            indicators: BTreeMap::new(),
        }
    }

    pub fn with_indicator(mut self, name: &str, value: f64) -> Self {
        self.indicators.insert(name.to_string(), value);
        self
    }

    /// Indicator value, `None` when absent or NaN.
    pub fn indicator(&self, name: &str) -> Option<f64> {
        self.indicators.get(name).copied().filter(|v| !v.is_nan())
    }
}

/// Records ordered strictly ascending by timestamp.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SignalSeries {
    records: Vec<SignalRecord>,
}

impl SignalSeries {
    pub fn new(records: Vec<SignalRecord>) -> Result<Self, SignaltraderError> {
        if let Some(pair) = records
            .windows(2)
            .find(|w| w[1].timestamp <= w[0].timestamp)
        {
            return Err(SignaltraderError::invalid_input(format!(
                "timestamps must be strictly ascending: {} followed by {}",
                pair[0].timestamp, pair[1].timestamp
            )));
        }
        Ok(Self { records })
    }

    /// Build a series column-wise. `price` and `signal` are required; every
    /// other column becomes an indicator.
    pub fn from_columns(
        timestamps: Vec<NaiveDate>,
        mut columns: BTreeMap<String, Vec<f64>>,
    ) -> Result<Self, SignaltraderError> {
        let missing: Vec<&str> = [PRICE_COLUMN, SIGNAL_COLUMN]
            .into_iter()
            .filter(|c| !columns.contains_key(*c))
            .collect();
        if !missing.is_empty() {
            return Err(SignaltraderError::invalid_input(format!(
                "missing required columns: {}",
                missing.join(", ")
            )));
        }

        if let Some((name, col)) = columns.iter().find(|(_, c)| c.len() != timestamps.len()) {
            return Err(SignaltraderError::invalid_input(format!(
                "column '{}' has {} values, expected {}",
                name,
                col.len(),
                timestamps.len()
            )));
        }

        let prices = columns.remove(PRICE_COLUMN).unwrap_or_default();
        let signals = columns.remove(SIGNAL_COLUMN).unwrap_or_default();

        let records = timestamps
            .into_iter()
            .enumerate()
            .map(|(i, timestamp)| SignalRecord {
                timestamp,
                price: prices[i],
                signal: Signal::from_value(signals[i]),
                indicators: columns
                    .iter()
                    .map(|(name, col)| (name.clone(), col[i]))
                    .collect(),
            })
            .collect();

        Self::new(records)
    }

    pub fn records(&self) -> &[SignalRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of records carrying a usable (finite) price.
    pub fn priced_len(&self) -> usize {
        self.records.iter().filter(|r| r.price.is_finite()).count()
    }

    pub fn buy_signal_count(&self) -> usize {
        self.records
            .iter()
            .filter(|r| r.signal == Signal::Buy)
            .count()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.records.first().map(|r| r.timestamp)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.records.last().map(|r| r.timestamp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    #[test]
    fn signal_from_value() {
        assert_eq!(Signal::from_value(1.0), Signal::Buy);
        assert_eq!(Signal::from_value(0.0), Signal::None);
        assert_eq!(Signal::from_value(-1.0), Signal::None);
        assert_eq!(Signal::from_value(f64::NAN), Signal::None);
    }

    #[test]
    fn indicator_lookup_filters_nan() {
        let record = SignalRecord::new(date(1), 10.0, Signal::None)
            .with_indicator(MIDDLE_BAND, f64::NAN)
            .with_indicator(LONG_MA, 9.5);
        assert_eq!(record.indicator(MIDDLE_BAND), None);
        assert_eq!(record.indicator(LONG_MA), Some(9.5));
        assert_eq!(record.indicator("missing"), None);
    }

    #[test]
    fn new_rejects_duplicate_timestamps() {
        let records = vec![
            SignalRecord::new(date(1), 10.0, Signal::None),
            SignalRecord::new(date(1), 11.0, Signal::None),
        ];
        let err = SignalSeries::new(records).unwrap_err();
        assert!(matches!(err, SignaltraderError::InvalidInput { .. }));
    }

    #[test]
    fn new_rejects_descending_timestamps() {
        let records = vec![
            SignalRecord::new(date(2), 10.0, Signal::None),
            SignalRecord::new(date(1), 11.0, Signal::None),
        ];
        assert!(SignalSeries::new(records).is_err());
    }

    #[test]
    fn from_columns_builds_records() {
        let mut columns = BTreeMap::new();
        columns.insert(PRICE_COLUMN.to_string(), vec![10.0, 11.0]);
        columns.insert(SIGNAL_COLUMN.to_string(), vec![0.0, 1.0]);
        columns.insert(MIDDLE_BAND.to_string(), vec![f64::NAN, 10.5]);

        let series = SignalSeries::from_columns(vec![date(1), date(2)], columns).unwrap();

        assert_eq!(series.len(), 2);
        let second = &series.records()[1];
        assert_eq!(second.price, 11.0);
        assert_eq!(second.signal, Signal::Buy);
        assert_eq!(second.indicator(MIDDLE_BAND), Some(10.5));
        assert!(!second.indicators.contains_key(PRICE_COLUMN));
        assert_eq!(series.buy_signal_count(), 1);
    }

    #[test]
    fn from_columns_requires_price_and_signal() {
        let mut columns = BTreeMap::new();
        columns.insert(PRICE_COLUMN.to_string(), vec![10.0]);

        match SignalSeries::from_columns(vec![date(1)], columns) {
            Err(SignaltraderError::InvalidInput { reason }) => {
                assert!(reason.contains("signal"));
                assert!(!reason.contains("price"));
            }
            other => panic!("expected InvalidInput, got {:?}", other),
        }
    }

    #[test]
    fn from_columns_rejects_length_mismatch() {
        let mut columns = BTreeMap::new();
        columns.insert(PRICE_COLUMN.to_string(), vec![10.0, 11.0]);
        columns.insert(SIGNAL_COLUMN.to_string(), vec![0.0]);

        assert!(SignalSeries::from_columns(vec![date(1), date(2)], columns).is_err());
    }

    #[test]
    fn priced_len_ignores_non_finite() {
        let series = SignalSeries::new(vec![
            SignalRecord::new(date(1), 10.0, Signal::None),
            SignalRecord::new(date(2), f64::NAN, Signal::Buy),
            SignalRecord::new(date(3), 12.0, Signal::None),
            SignalRecord::new(date(4), f64::INFINITY, Signal::Buy),
            SignalRecord::new(date(5), f64::NEG_INFINITY, Signal::None),
        ])
        .unwrap();
        assert_eq!(series.priced_len(), 2);
        assert_eq!(series.first_date(), Some(date(1)));
        assert_eq!(series.last_date(), Some(date(5)));
    }
}
