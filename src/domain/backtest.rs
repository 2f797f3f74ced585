//! Simulation engine: one pass over a signal series, all-in/all-out.
//!
//! Each processed period first checks the exit policy (when holding) and only
//! otherwise acts on a buy signal, so a period never both exits and re-enters.
//! Every processed period ends with a snapshot upserted into the ledger.

use tracing::{debug, info, trace};

use super::error::SignaltraderError;
use super::ledger::{SnapshotRecord, TradeRecord, TradeType};
use super::portfolio::{Fill, PortfolioState};
use super::signal::{Signal, SignalSeries};
use super::strategy::{ExitPolicy, MiddleBandExit, Strategy};
use crate::ports::ledger_port::LedgerPort;

pub const DEFAULT_INITIAL_CAPITAL: f64 = 100_000.0;
pub const DEFAULT_RISK_FREE_RATE: f64 = 0.02;

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestConfig {
    pub initial_capital: f64,
    /// Annual, as a fraction.
    pub risk_free_rate: f64,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        BacktestConfig {
            initial_capital: DEFAULT_INITIAL_CAPITAL,
            risk_free_rate: DEFAULT_RISK_FREE_RATE,
        }
    }
}

/// Outcome of one simulation run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub initial_capital: f64,
    pub final_value: f64,
    pub total_return_pct: f64,
    /// Buys plus sells.
    pub total_trades: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,
    /// Wins over completed round trips, in percent.
    pub win_rate_pct: f64,
    pub profit_loss: f64,
    pub final_cash: f64,
    pub final_shares: f64,
    pub position_open: bool,
    pub periods_processed: usize,
    pub periods_skipped: usize,
}

#[derive(Debug, Default)]
struct RunTally {
    buys: usize,
    sells: usize,
    wins: usize,
    losses: usize,
    processed: usize,
    skipped: usize,
    last_value: Option<f64>,
}

pub struct SimulationEngine {
    exit_policy: Box<dyn ExitPolicy>,
}

impl Default for SimulationEngine {
    fn default() -> Self {
        Self::new(Box::new(MiddleBandExit))
    }
}

impl SimulationEngine {
    pub fn new(exit_policy: Box<dyn ExitPolicy>) -> Self {
        Self { exit_policy }
    }

    pub fn for_strategy(strategy: &dyn Strategy) -> Self {
        Self::new(strategy.exit_policy())
    }

    /// Simulate `series` from `initial_capital`, replacing whatever the ledger
    /// held before. Validation happens before the ledger is touched.
    pub fn run(
        &self,
        series: &SignalSeries,
        initial_capital: f64,
        ledger: &dyn LedgerPort,
    ) -> Result<RunSummary, SignaltraderError> {
        if !initial_capital.is_finite() || initial_capital <= 0.0 {
            return Err(SignaltraderError::invalid_input(format!(
                "initial capital must be a positive amount, got {}",
                initial_capital
            )));
        }
        if series.priced_len() == 0 {
            return Err(SignaltraderError::invalid_input(
                "signal series has no priced records",
            ));
        }

        info!(
            records = series.len(),
            initial_capital, "starting simulation"
        );

        ledger.clear()?;

        let mut state = PortfolioState::new(initial_capital);
        let mut tally = RunTally::default();

        // The first record only seeds the series; it is never traded.
        for record in series.records().iter().skip(1) {
            let price = record.price;
            if !price.is_finite() {
                tally.skipped += 1;
                trace!(date = %record.timestamp, price, "skipping period without usable price");
                continue;
            }

            if state.is_holding() {
                let entry_price = state.entry_price;
                if self.exit_policy.should_exit(price, entry_price, record) {
                    if let Some(fill) = state.sell_all(price) {
                        tally.sells += 1;
                        if price > entry_price {
                            tally.wins += 1;
                        } else {
                            tally.losses += 1;
                        }
                        self.record_fill(ledger, &state, record.timestamp, TradeType::Sell, fill)?;
                    }
                }
            } else if record.signal == Signal::Buy {
                if let Some(fill) = state.buy_all(price) {
                    tally.buys += 1;
                    self.record_fill(ledger, &state, record.timestamp, TradeType::Buy, fill)?;
                }
            }

            let snapshot =
                SnapshotRecord::mark(record.timestamp, state.cash, state.position_shares, price);
            tally.last_value = Some(snapshot.total_value);
            ledger.upsert_snapshot(&snapshot)?;
            tally.processed += 1;
        }

        let summary = summarize(initial_capital, &state, &tally);
        info!(
            final_value = summary.final_value,
            total_return_pct = summary.total_return_pct,
            trades = summary.total_trades,
            skipped = summary.periods_skipped,
            "simulation finished"
        );
        Ok(summary)
    }

    fn record_fill(
        &self,
        ledger: &dyn LedgerPort,
        state: &PortfolioState,
        timestamp: chrono::NaiveDate,
        trade_type: TradeType,
        fill: Fill,
    ) -> Result<(), SignaltraderError> {
        debug!(
            date = %timestamp,
            side = trade_type.as_str(),
            price = fill.price,
            shares = fill.shares,
            "trade executed"
        );
        ledger.append_trade(&TradeRecord {
            timestamp,
            trade_type,
            price: fill.price,
            shares: fill.shares,
            cash_change: fill.cash_change,
            portfolio_value_after: state.total_value(fill.price),
        })
    }
}

fn summarize(initial_capital: f64, state: &PortfolioState, tally: &RunTally) -> RunSummary {
    let final_value = tally.last_value.unwrap_or(initial_capital);
    let round_trips = tally.wins + tally.losses;
    let win_rate_pct = if round_trips > 0 {
        tally.wins as f64 / round_trips as f64 * 100.0
    } else {
        0.0
    };

    RunSummary {
        initial_capital,
        final_value,
        total_return_pct: (final_value - initial_capital) / initial_capital * 100.0,
        total_trades: tally.buys + tally.sells,
        winning_trades: tally.wins,
        losing_trades: tally.losses,
        win_rate_pct,
        profit_loss: final_value - initial_capital,
        final_cash: state.cash,
        final_shares: state.position_shares,
        position_open: state.is_holding(),
        periods_processed: tally.processed,
        periods_skipped: tally.skipped,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory_ledger::MemoryLedger;
    use crate::domain::signal::{SignalRecord, MIDDLE_BAND};
    use chrono::NaiveDate;

    fn date(offset: i64) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + chrono::Duration::days(offset)
    }

    /// (price, signal, middle band)
    fn make_series(rows: &[(f64, f64, f64)]) -> SignalSeries {
        let records = rows
            .iter()
            .enumerate()
            .map(|(i, &(price, signal, middle))| {
                SignalRecord::new(date(i as i64), price, Signal::from_value(signal))
                    .with_indicator(MIDDLE_BAND, middle)
            })
            .collect();
        SignalSeries::new(records).unwrap()
    }

    #[test]
    fn default_config() {
        let c = BacktestConfig::default();
        assert!((c.initial_capital - 100_000.0).abs() < f64::EPSILON);
        assert!((c.risk_free_rate - 0.02).abs() < f64::EPSILON);
    }

    #[test]
    fn single_round_trip() {
        let series = make_series(&[
            (10.0, 0.0, 12.0),
            (10.0, 1.0, 12.0),
            (11.0, 0.0, 12.0),
            (13.0, 0.0, 12.0),
        ]);
        let ledger = MemoryLedger::new();
        let summary = SimulationEngine::default()
            .run(&series, 1_000.0, &ledger)
            .unwrap();

        let trades = ledger.list_trades().unwrap();
        assert_eq!(trades.len(), 2);
        assert_eq!(trades[0].trade_type, TradeType::Buy);
        assert_eq!(trades[0].timestamp, date(1));
        assert!((trades[0].shares - 100.0).abs() < 1e-9);
        assert!((trades[0].cash_change + 1_000.0).abs() < 1e-9);
        assert_eq!(trades[1].trade_type, TradeType::Sell);
        assert_eq!(trades[1].timestamp, date(3));
        assert!((trades[1].cash_change - 1_300.0).abs() < 1e-9);

        let snapshots = ledger.list_snapshots().unwrap();
        assert_eq!(snapshots.len(), 3);
        assert!((snapshots[0].total_value - 1_000.0).abs() < 1e-9);
        assert!((snapshots[1].total_value - 1_100.0).abs() < 1e-9);
        assert!((snapshots[2].total_value - 1_300.0).abs() < 1e-9);
        assert_eq!(snapshots[2].shares_held, 0.0);

        assert!((summary.final_value - 1_300.0).abs() < 1e-9);
        assert!((summary.total_return_pct - 30.0).abs() < 1e-9);
        assert_eq!(summary.total_trades, 2);
        assert_eq!(summary.winning_trades, 1);
        assert_eq!(summary.losing_trades, 0);
        assert!((summary.win_rate_pct - 100.0).abs() < 1e-9);
        assert!(!summary.position_open);
        assert_eq!(summary.periods_processed, 3);
    }

    #[test]
    fn no_signals_keeps_cash() {
        let series = make_series(&[(10.0, 0.0, 10.0), (11.0, 0.0, 10.0), (9.0, 0.0, 10.0)]);
        let ledger = MemoryLedger::new();
        let summary = SimulationEngine::default()
            .run(&series, 5_000.0, &ledger)
            .unwrap();

        assert!(ledger.list_trades().unwrap().is_empty());
        let snapshots = ledger.list_snapshots().unwrap();
        assert_eq!(snapshots.len(), 2);
        assert!(snapshots.iter().all(|s| s.total_value == 5_000.0));
        assert_eq!(summary.final_value, 5_000.0);
        assert_eq!(summary.total_return_pct, 0.0);
        assert_eq!(summary.win_rate_pct, 0.0);
    }

    #[test]
    fn first_record_is_never_traded() {
        let series = make_series(&[(10.0, 1.0, 20.0), (10.0, 0.0, 20.0)]);
        let ledger = MemoryLedger::new();
        SimulationEngine::default()
            .run(&series, 1_000.0, &ledger)
            .unwrap();
        assert!(ledger.list_trades().unwrap().is_empty());
        assert_eq!(ledger.list_snapshots().unwrap().len(), 1);
    }

    #[test]
    fn nan_price_period_is_skipped() {
        let series = make_series(&[
            (10.0, 0.0, 12.0),
            (f64::NAN, 1.0, 12.0),
            (10.0, 0.0, 12.0),
        ]);
        let ledger = MemoryLedger::new();
        let summary = SimulationEngine::default()
            .run(&series, 1_000.0, &ledger)
            .unwrap();

        assert!(ledger.list_trades().unwrap().is_empty());
        let snapshots = ledger.list_snapshots().unwrap();
        assert_eq!(snapshots.len(), 1);
        assert_eq!(snapshots[0].timestamp, date(2));
        assert_eq!(summary.periods_skipped, 1);
        assert_eq!(summary.periods_processed, 1);
    }

    #[test]
    fn infinite_price_period_is_skipped() {
        let series = make_series(&[
            (10.0, 0.0, 12.0),
            (f64::INFINITY, 1.0, 12.0),
            (f64::NEG_INFINITY, 0.0, 12.0),
            (10.0, 1.0, 12.0),
        ]);
        let ledger = MemoryLedger::new();
        let summary = SimulationEngine::default()
            .run(&series, 1_000.0, &ledger)
            .unwrap();

        let trades = ledger.list_trades().unwrap();
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].timestamp, date(3));
        assert_eq!(trades[0].price, 10.0);
        assert_eq!(trades[0].shares, 100.0);

        let snapshots = ledger.list_snapshots().unwrap();
        assert_eq!(snapshots.len(), 1);
        assert_eq!(snapshots[0].total_value, 1_000.0);
        assert_eq!(summary.periods_skipped, 2);
        assert_eq!(summary.final_value, 1_000.0);
    }

    #[test]
    fn exit_is_checked_before_entry() {
        // Day 2 both meets the exit and carries a buy signal: exit only.
        let series = make_series(&[
            (10.0, 0.0, 12.0),
            (10.0, 1.0, 12.0),
            (12.0, 1.0, 12.0),
            (12.0, 0.0, 13.0),
        ]);
        let ledger = MemoryLedger::new();
        let summary = SimulationEngine::default()
            .run(&series, 1_000.0, &ledger)
            .unwrap();

        let trades = ledger.list_trades().unwrap();
        assert_eq!(trades.len(), 2);
        assert_eq!(trades[1].trade_type, TradeType::Sell);
        assert_eq!(trades[1].timestamp, date(2));
        assert!(!summary.position_open);
    }

    #[test]
    fn buy_while_holding_is_ignored() {
        let series = make_series(&[
            (10.0, 0.0, 20.0),
            (10.0, 1.0, 20.0),
            (11.0, 1.0, 20.0),
            (12.0, 1.0, 20.0),
        ]);
        let ledger = MemoryLedger::new();
        let summary = SimulationEngine::default()
            .run(&series, 1_000.0, &ledger)
            .unwrap();

        assert_eq!(ledger.list_trades().unwrap().len(), 1);
        assert!(summary.position_open);
        assert!((summary.final_shares - 100.0).abs() < 1e-9);
        assert!((summary.final_value - 1_200.0).abs() < 1e-9);
        assert_eq!(summary.total_trades, 1);
        assert_eq!(summary.win_rate_pct, 0.0);
    }

    #[test]
    fn losing_exit_counts_as_loss() {
        let series = make_series(&[
            (10.0, 0.0, 8.0),
            (10.0, 1.0, 12.0),
            (9.0, 0.0, 8.0),
        ]);
        let ledger = MemoryLedger::new();
        let summary = SimulationEngine::default()
            .run(&series, 1_000.0, &ledger)
            .unwrap();

        assert_eq!(summary.losing_trades, 1);
        assert_eq!(summary.winning_trades, 0);
        assert!((summary.final_value - 900.0).abs() < 1e-9);
        assert!((summary.profit_loss + 100.0).abs() < 1e-9);
    }

    #[test]
    fn missing_middle_band_never_exits() {
        let series = make_series(&[
            (10.0, 0.0, f64::NAN),
            (10.0, 1.0, f64::NAN),
            (50.0, 0.0, f64::NAN),
        ]);
        let ledger = MemoryLedger::new();
        let summary = SimulationEngine::default()
            .run(&series, 1_000.0, &ledger)
            .unwrap();
        assert!(summary.position_open);
    }

    #[test]
    fn rerun_replaces_previous_history() {
        let series = make_series(&[(10.0, 0.0, 12.0), (10.0, 1.0, 12.0), (13.0, 0.0, 12.0)]);
        let ledger = MemoryLedger::new();
        let engine = SimulationEngine::default();

        engine.run(&series, 1_000.0, &ledger).unwrap();
        engine.run(&series, 1_000.0, &ledger).unwrap();

        assert_eq!(ledger.list_trades().unwrap().len(), 2);
        assert_eq!(ledger.list_snapshots().unwrap().len(), 2);
    }

    #[test]
    fn rejects_non_positive_capital_before_clearing() {
        let series = make_series(&[(10.0, 0.0, 12.0), (10.0, 1.0, 12.0), (13.0, 0.0, 12.0)]);
        let ledger = MemoryLedger::new();
        let engine = SimulationEngine::default();
        engine.run(&series, 1_000.0, &ledger).unwrap();

        for capital in [0.0, -5.0, f64::NAN, f64::INFINITY] {
            let err = engine.run(&series, capital, &ledger).unwrap_err();
            assert!(matches!(err, SignaltraderError::InvalidInput { .. }));
        }
        assert_eq!(ledger.list_trades().unwrap().len(), 2);
    }

    #[test]
    fn rejects_series_without_prices() {
        let ledger = MemoryLedger::new();
        let empty = SignalSeries::default();
        let err = SimulationEngine::default()
            .run(&empty, 1_000.0, &ledger)
            .unwrap_err();
        assert!(matches!(err, SignaltraderError::InvalidInput { .. }));

        let unpriced = make_series(&[(f64::NAN, 0.0, 1.0), (f64::NAN, 1.0, 1.0)]);
        assert!(SimulationEngine::default()
            .run(&unpriced, 1_000.0, &ledger)
            .is_err());
    }

    #[test]
    fn single_record_run_has_no_snapshots() {
        let series = make_series(&[(10.0, 1.0, 12.0)]);
        let ledger = MemoryLedger::new();
        let summary = SimulationEngine::default()
            .run(&series, 1_000.0, &ledger)
            .unwrap();
        assert!(ledger.list_snapshots().unwrap().is_empty());
        assert_eq!(summary.final_value, 1_000.0);
        assert_eq!(summary.periods_processed, 0);
    }

    struct FailingLedger;

    impl LedgerPort for FailingLedger {
        fn append_trade(&self, _: &TradeRecord) -> Result<(), SignaltraderError> {
            Err(SignaltraderError::StoreWrite {
                reason: "disk full".into(),
            })
        }
        fn upsert_snapshot(&self, _: &SnapshotRecord) -> Result<(), SignaltraderError> {
            Ok(())
        }
        fn clear(&self) -> Result<(), SignaltraderError> {
            Ok(())
        }
        fn list_trades(&self) -> Result<Vec<TradeRecord>, SignaltraderError> {
            Ok(Vec::new())
        }
        fn list_snapshots(&self) -> Result<Vec<SnapshotRecord>, SignaltraderError> {
            Ok(Vec::new())
        }
        fn record_metrics(
            &self,
            _: &crate::domain::metrics::MetricsResult,
            _: chrono::DateTime<chrono::Utc>,
        ) -> Result<(), SignaltraderError> {
            Ok(())
        }
        fn list_metrics(
            &self,
        ) -> Result<Vec<crate::domain::metrics::MetricsRecord>, SignaltraderError> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn store_write_failure_aborts_run() {
        let series = make_series(&[(10.0, 0.0, 12.0), (10.0, 1.0, 12.0)]);
        let err = SimulationEngine::default()
            .run(&series, 1_000.0, &FailingLedger)
            .unwrap_err();
        assert!(matches!(err, SignaltraderError::StoreWrite { .. }));
    }
}
