//! Trade and snapshot records written to the ledger store.

use chrono::NaiveDate;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TradeType {
    Buy,
    Sell,
}

impl TradeType {
    pub fn as_str(self) -> &'static str {
        match self {
            TradeType::Buy => "BUY",
            TradeType::Sell => "SELL",
        }
    }
}

impl fmt::Display for TradeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TradeType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "BUY" => Ok(TradeType::Buy),
            "SELL" => Ok(TradeType::Sell),
            other => Err(format!("unknown trade type '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TradeRecord {
    pub timestamp: NaiveDate,
    pub trade_type: TradeType,
    pub price: f64,
    pub shares: f64,
    /// Negative for buys, positive for sells.
    pub cash_change: f64,
    pub portfolio_value_after: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotRecord {
    pub timestamp: NaiveDate,
    pub cash: f64,
    pub holdings_value: f64,
    pub total_value: f64,
    pub shares_held: f64,
    pub price: f64,
}

impl SnapshotRecord {
    /// Mark `shares_held` to market at `price`.
    pub fn mark(timestamp: NaiveDate, cash: f64, shares_held: f64, price: f64) -> Self {
        let holdings_value = shares_held * price;
        SnapshotRecord {
            timestamp,
            cash,
            holdings_value,
            total_value: cash + holdings_value,
            shares_held,
            price,
        }
    }
}
