//! Bollinger Bands mean-reversion strategy.
//!
//! Entry: price closes back above the lower band after closing below it the
//! previous period, while trading above the long-term trend average.
//! Exit: price reaches the middle band.

use std::collections::BTreeMap;

use crate::domain::error::SignaltraderError;
use crate::domain::indicator::bollinger::calculate_bollinger;
use crate::domain::indicator::sma::calculate_sma;
use crate::domain::ohlcv::{closes, dates, PriceBar};
use crate::domain::signal::{
    SignalSeries, LONG_MA, LOWER_BAND, MIDDLE_BAND, PRICE_COLUMN, SIGNAL_COLUMN, UPPER_BAND,
};
use crate::domain::strategy::{ExitPolicy, MiddleBandExit, Strategy};

#[derive(Debug, Clone, PartialEq)]
pub struct BollingerParams {
    pub window: usize,
    pub stddev_mult_x100: u32,
    pub trend_window: usize,
}

impl Default for BollingerParams {
    fn default() -> Self {
        BollingerParams {
            window: 20,
            stddev_mult_x100: 200,
            trend_window: 200,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct BollingerBandsStrategy {
    pub params: BollingerParams,
}

impl BollingerBandsStrategy {
    pub fn new(params: BollingerParams) -> Self {
        Self { params }
    }
}

impl Strategy for BollingerBandsStrategy {
    fn id(&self) -> &str {
        "bollinger_bands"
    }

    fn name(&self) -> &str {
        "Bollinger Bands"
    }

    fn description(&self) -> &str {
        "Entry on lower band bounce, exit on middle band cross"
    }

    fn generate_signals(&self, bars: &[PriceBar]) -> Result<SignalSeries, SignaltraderError> {
        let prices = closes(bars);
        let bands = calculate_bollinger(&prices, self.params.window, self.params.stddev_mult_x100);
        let trend = calculate_sma(&prices, self.params.trend_window).values;

        // NaN comparisons are false, so warm-up periods never signal.
        let signal: Vec<f64> = (0..prices.len())
            .map(|i| {
                let bounced = i > 0
                    && prices[i - 1] < bands.lower[i - 1]
                    && prices[i] > bands.lower[i]
                    && prices[i] > trend[i];
                if bounced { 1.0 } else { 0.0 }
            })
            .collect();

        let mut columns = BTreeMap::new();
        columns.insert(PRICE_COLUMN.to_string(), prices);
        columns.insert(SIGNAL_COLUMN.to_string(), signal);
        columns.insert(MIDDLE_BAND.to_string(), bands.middle);
        columns.insert(UPPER_BAND.to_string(), bands.upper);
        columns.insert(LOWER_BAND.to_string(), bands.lower);
        columns.insert(LONG_MA.to_string(), trend);

        SignalSeries::from_columns(dates(bars), columns)
    }

    fn exit_policy(&self) -> Box<dyn ExitPolicy> {
        Box::new(MiddleBandExit)
    }
}
