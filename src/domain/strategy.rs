//! Strategy and exit-policy traits.
//!
//! A strategy turns price history into a [`SignalSeries`] and picks the exit
//! policy the simulation engine consults while a position is open.

use crate::domain::error::SignaltraderError;
use crate::domain::ohlcv::PriceBar;
use crate::domain::signal::{SignalRecord, SignalSeries, LONG_MA, MIDDLE_BAND, SHORT_MA};

/// Decides, once per period while holding, whether to liquidate.
pub trait ExitPolicy {
    fn should_exit(&self, current_price: f64, entry_price: f64, record: &SignalRecord) -> bool;
}

/// Exit once price reaches the middle Bollinger band.
///
/// No exit when the record has no usable `middle_band` value.
#[derive(Debug, Clone, Copy, Default)]
pub struct MiddleBandExit;

impl ExitPolicy for MiddleBandExit {
    fn should_exit(&self, current_price: f64, _entry_price: f64, record: &SignalRecord) -> bool {
        record
            .indicator(MIDDLE_BAND)
            .is_some_and(|middle| current_price >= middle)
    }
}

/// Exit once the short moving average drops below the long one.
#[derive(Debug, Clone, Copy, Default)]
pub struct MovingAverageCrossExit;

impl ExitPolicy for MovingAverageCrossExit {
    fn should_exit(&self, _current_price: f64, _entry_price: f64, record: &SignalRecord) -> bool {
        match (record.indicator(SHORT_MA), record.indicator(LONG_MA)) {
            (Some(short), Some(long)) => short < long,
            _ => false,
        }
    }
}

pub trait Strategy {
    /// Catalog key, e.g. `bollinger_bands`.
    fn id(&self) -> &str;

    fn name(&self) -> &str;

    fn description(&self) -> &str;

    fn generate_signals(&self, bars: &[PriceBar]) -> Result<SignalSeries, SignaltraderError>;

    fn exit_policy(&self) -> Box<dyn ExitPolicy> {
        Box::new(MiddleBandExit)
    }
}
