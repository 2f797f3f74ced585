//! Moving average crossover strategy.
//!
//! Both averages are exponential (span = window) and defined from the first
//! bar, so a trend already under way signals on its first day.
//!
//! Entry: the short average crosses from at-or-below to above the long one.
//! Exit: the short average falls back below the long one.

use std::collections::BTreeMap;

use crate::domain::error::SignaltraderError;
use crate::domain::indicator::ema::calculate_ema;
use crate::domain::ohlcv::{closes, dates, PriceBar};
use crate::domain::signal::{SignalSeries, LONG_MA, PRICE_COLUMN, SHORT_MA, SIGNAL_COLUMN};
use crate::domain::strategy::{ExitPolicy, MovingAverageCrossExit, Strategy};

#[derive(Debug, Clone, PartialEq)]
pub struct MaCrossoverParams {
    pub short_window: usize,
    pub long_window: usize,
}

impl Default for MaCrossoverParams {
    fn default() -> Self {
        MaCrossoverParams {
            short_window: 50,
            long_window: 200,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct MaCrossoverStrategy {
    pub params: MaCrossoverParams,
}

impl MaCrossoverStrategy {
    pub fn new(params: MaCrossoverParams) -> Self {
        Self { params }
    }
}

impl Strategy for MaCrossoverStrategy {
    fn id(&self) -> &str {
        "ma_crossover"
    }

    fn name(&self) -> &str {
        "Moving Average Crossover"
    }

    fn description(&self) -> &str {
        "Entry on MA crossover, exit on reverse crossover"
    }

    fn generate_signals(&self, bars: &[PriceBar]) -> Result<SignalSeries, SignaltraderError> {
        let prices = closes(bars);
        let short = calculate_ema(&prices, self.params.short_window).values;
        let long = calculate_ema(&prices, self.params.long_window).values;

        let diff: Vec<f64> = short.iter().zip(&long).map(|(s, l)| s - l).collect();
        let signal: Vec<f64> = (0..diff.len())
            .map(|i| {
                let crossed = i > 0 && diff[i] > 0.0 && diff[i - 1] <= 0.0;
                if crossed { 1.0 } else { 0.0 }
            })
            .collect();

        let mut columns = BTreeMap::new();
        columns.insert(PRICE_COLUMN.to_string(), prices);
        columns.insert(SIGNAL_COLUMN.to_string(), signal);
        columns.insert(SHORT_MA.to_string(), short);
        columns.insert(LONG_MA.to_string(), long);

        SignalSeries::from_columns(dates(bars), columns)
    }

    fn exit_policy(&self) -> Box<dyn ExitPolicy> {
        Box::new(MovingAverageCrossExit)
    }
}
