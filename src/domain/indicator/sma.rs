//! Simple Moving Average indicator.
//!
//! SMA(n)[i] = (P[i-n+1] + ... + P[i]) / n
//! Warmup: first (n-1) positions are NaN.

use crate::domain::indicator::{rolling, IndicatorSeries, IndicatorType};

pub fn calculate_sma(prices: &[f64], period: usize) -> IndicatorSeries {
    let values = rolling(prices, period, |window| {
        window.iter().sum::<f64>() / period as f64
    });

    IndicatorSeries {
        indicator_type: IndicatorType::Sma(period),
        values,
    }
}
