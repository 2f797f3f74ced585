//! Price history access port.

use crate::domain::error::SignaltraderError;
use crate::domain::ohlcv::PriceBar;

pub trait PriceDataPort {
    /// Bars in ascending date order.
    fn load_bars(&self) -> Result<Vec<PriceBar>, SignaltraderError>;
}
