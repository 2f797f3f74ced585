//! Built-in strategies and lookup by catalog key.

pub mod bollinger_bands;
pub mod ma_crossover;

use crate::domain::error::SignaltraderError;
use crate::domain::strategy::Strategy;

use bollinger_bands::{BollingerBandsStrategy, BollingerParams};
use ma_crossover::{MaCrossoverParams, MaCrossoverStrategy};

pub struct StrategyCatalog {
    strategies: Vec<Box<dyn Strategy>>,
}

impl StrategyCatalog {
    pub fn new(bollinger: BollingerParams, ma_crossover: MaCrossoverParams) -> Self {
        StrategyCatalog {
            strategies: vec![
                Box::new(BollingerBandsStrategy::new(bollinger)),
                Box::new(MaCrossoverStrategy::new(ma_crossover)),
            ],
        }
    }

    pub fn ids(&self) -> Vec<String> {
        self.strategies.iter().map(|s| s.id().to_string()).collect()
    }

    pub fn get(&self, id: &str) -> Result<&dyn Strategy, SignaltraderError> {
        self.strategies
            .iter()
            .find(|s| s.id() == id)
            .map(|s| s.as_ref())
            .ok_or_else(|| SignaltraderError::UnknownStrategy {
                name: id.to_string(),
                available: self.ids(),
            })
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn Strategy> {
        self.strategies.iter().map(|s| s.as_ref())
    }
}

impl Default for StrategyCatalog {
    fn default() -> Self {
        Self::new(BollingerParams::default(), MaCrossoverParams::default())
    }
}
