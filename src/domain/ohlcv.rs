//! Daily OHLCV price bar.

use chrono::NaiveDate;

#[derive(Debug, Clone, PartialEq)]
pub struct PriceBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: i64,
}

/// Closing prices in bar order.
pub fn closes(bars: &[PriceBar]) -> Vec<f64> {
    bars.iter().map(|b| b.close).collect()
}

/// Dates in bar order.
pub fn dates(bars: &[PriceBar]) -> Vec<NaiveDate> {
    bars.iter().map(|b| b.date).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_bars() -> Vec<PriceBar> {
        (1..=3)
            .map(|d| PriceBar {
                date: NaiveDate::from_ymd_opt(2024, 1, d).unwrap(),
                open: 100.0,
                high: 110.0,
                low: 90.0,
                close: 100.0 + d as f64,
                volume: 50_000,
            })
            .collect()
    }

    #[test]
    fn closes_in_order() {
        assert_eq!(closes(&sample_bars()), vec![101.0, 102.0, 103.0]);
    }

    #[test]
    fn dates_in_order() {
        let d = dates(&sample_bars());
        assert_eq!(d.len(), 3);
        assert_eq!(d[0], NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        assert_eq!(d[2], NaiveDate::from_ymd_opt(2024, 1, 3).unwrap());
    }
}
