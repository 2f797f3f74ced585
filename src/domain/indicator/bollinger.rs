//! Bollinger Bands indicator.
//!
//! Bollinger Bands consist of:
//! - Middle: Simple Moving Average (SMA) over n periods
//! - Upper: Middle + (multiplier × StdDev)
//! - Lower: Middle - (multiplier × StdDev)
//!
//! Where StdDev is the sample standard deviation (divides by n-1), matching
//! the usual rolling-window statistics of data-frame libraries.
//!
//! Default parameters: period=20, multiplier=2.0
//! Warmup: first (period-1) positions are NaN.

use crate::domain::indicator::sma::calculate_sma;
use crate::domain::indicator::stddev::calculate_stddev;
use crate::domain::indicator::IndicatorType;

#[derive(Debug, Clone)]
pub struct BollingerBands {
    pub indicator_type: IndicatorType,
    pub upper: Vec<f64>,
    pub middle: Vec<f64>,
    pub lower: Vec<f64>,
}

pub fn calculate_bollinger(prices: &[f64], period: usize, stddev_mult_x100: u32) -> BollingerBands {
    let mult = stddev_mult_x100 as f64 / 100.0;
    let middle = calculate_sma(prices, period).values;
    let stddev = calculate_stddev(prices, period).values;

    let upper = middle
        .iter()
        .zip(&stddev)
        .map(|(m, s)| m + mult * s)
        .collect();
    let lower = middle
        .iter()
        .zip(&stddev)
        .map(|(m, s)| m - mult * s)
        .collect();

    BollingerBands {
        indicator_type: IndicatorType::Bollinger {
            period,
            stddev_mult_x100,
        },
        upper,
        middle,
        lower,
    }
}
