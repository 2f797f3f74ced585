//! Technical indicators computed over closing prices.
//!
//! Every indicator is a pure transform from a price column to an equally long
//! value column. For the rolling indicators, warm-up positions (not enough
//! history yet) hold `f64::NAN`, and so does any window that contains a NaN
//! price.

pub mod bollinger;
pub mod ema;
pub mod sma;
pub mod stddev;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IndicatorType {
    Sma(usize),
    Ema(usize),
    Stddev(usize),
    Bollinger {
        period: usize,
        stddev_mult_x100: u32,
    },
}

/// A single-valued indicator column aligned with its input prices.
#[derive(Debug, Clone)]
pub struct IndicatorSeries {
    pub indicator_type: IndicatorType,
    pub values: Vec<f64>,
}

/// Apply `f` to every full trailing window of `period` prices.
///
/// Positions before the first full window, and windows containing NaN, yield NaN.
pub(crate) fn rolling<F>(prices: &[f64], period: usize, f: F) -> Vec<f64>
where
    F: Fn(&[f64]) -> f64,
{
    if period == 0 {
        return vec![f64::NAN; prices.len()];
    }

    (0..prices.len())
        .map(|i| {
            if i + 1 < period {
                return f64::NAN;
            }
            let window = &prices[i + 1 - period..=i];
            if window.iter().any(|p| p.is_nan()) {
                f64::NAN
            } else {
                f(window)
            }
        })
        .collect()
}
