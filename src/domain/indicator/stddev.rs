//! Rolling Standard Deviation indicator.
//!
//! Sample standard deviation over n prices (divides by n-1).
//! STDDEV(n)[i] = sqrt(sum((P[i-j] - SMA(n)[i])^2 for j in 0..n-1) / (n-1))
//! Warmup: first (n-1) positions are NaN. A period of 1 is undefined and is NaN
//! everywhere.

use crate::domain::indicator::{rolling, IndicatorSeries, IndicatorType};

/// Sample standard deviation of `values`; `None` with fewer than two values.
pub fn sample_stddev(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values
        .iter()
        .map(|v| {
            let diff = v - mean;
            diff * diff
        })
        .sum::<f64>()
        / (n - 1.0);
    Some(variance.sqrt())
}

pub fn calculate_stddev(prices: &[f64], period: usize) -> IndicatorSeries {
    let values = rolling(prices, period, |window| {
        sample_stddev(window).unwrap_or(f64::NAN)
    });

    IndicatorSeries {
        indicator_type: IndicatorType::Stddev(period),
        values,
    }
}
