//! Single-asset cash/position state.
//!
//! All-in/all-out: a buy converts every unit of cash into shares, a sell
//! converts every share back into cash. At most one position is open.

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fill {
    pub price: f64,
    pub shares: f64,
    pub cash_change: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PortfolioState {
    pub cash: f64,
    pub position_shares: f64,
    pub entry_price: f64,
}

impl PortfolioState {
    pub fn new(initial_capital: f64) -> Self {
        PortfolioState {
            cash: initial_capital,
            position_shares: 0.0,
            entry_price: 0.0,
        }
    }

    pub fn is_holding(&self) -> bool {
        self.position_shares > 0.0
    }

    pub fn holdings_value(&self, price: f64) -> f64 {
        self.position_shares * price
    }

    pub fn total_value(&self, price: f64) -> f64 {
        self.cash + self.holdings_value(price)
    }

    /// Invest all cash at `price`. No fill when flat on cash or already holding.
    pub fn buy_all(&mut self, price: f64) -> Option<Fill> {
        if self.is_holding() || self.cash <= 0.0 || !price.is_finite() || price <= 0.0 {
            return None;
        }

        let shares = self.cash / price;
        let cash_spent = shares * price;

        self.position_shares = shares;
        self.cash = 0.0;
        self.entry_price = price;

        Some(Fill {
            price,
            shares,
            cash_change: -cash_spent,
        })
    }

    /// Liquidate the whole position at `price`. No fill when flat.
    pub fn sell_all(&mut self, price: f64) -> Option<Fill> {
        if !self.is_holding() || !price.is_finite() {
            return None;
        }

        let shares = self.position_shares;
        let cash_received = shares * price;

        self.cash += cash_received;
        self.position_shares = 0.0;

        Some(Fill {
            price,
            shares,
            cash_change: cash_received,
        })
    }
}
