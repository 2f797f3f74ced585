//! Performance metrics derived from a run's recorded snapshots and trades.
//!
//! Everything here is a pure function of the ledger contents: the same
//! history always yields the same [`MetricsResult`]. Percentages are expressed
//! in percent (`12.5` means 12.5%). Degenerate inputs produce 0, or +infinity
//! where noted, never an error.

use chrono::{DateTime, NaiveDate, Utc};
use tracing::debug;

use super::error::SignaltraderError;
use super::indicator::stddev::sample_stddev;
use super::ledger::{SnapshotRecord, TradeRecord, TradeType};
use crate::ports::ledger_port::LedgerPort;

pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

#[derive(Debug, Clone, PartialEq)]
pub struct BasicMetrics {
    pub initial_value: f64,
    pub final_value: f64,
    pub total_return: f64,
    pub annualized_return: f64,
    pub period_count: usize,
    pub avg_period_return: f64,
    pub period_volatility: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RiskMetrics {
    pub annualized_volatility: f64,
    pub sharpe_ratio: f64,
    pub sortino_ratio: f64,
    pub downside_deviation: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TradeMetrics {
    pub total_trades: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,
    pub win_rate: f64,
    pub avg_win: f64,
    pub avg_loss: f64,
    pub profit_factor: f64,
    pub largest_win: f64,
    pub largest_loss: f64,
    pub total_pnl: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DrawdownMetrics {
    pub max_drawdown: f64,
    pub current_drawdown: f64,
    pub avg_drawdown: f64,
    /// Longest run of consecutive periods below a previous peak.
    pub max_drawdown_duration: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MetricsResult {
    pub basic: BasicMetrics,
    pub risk: RiskMetrics,
    pub trades: TradeMetrics,
    pub drawdown: DrawdownMetrics,
}

/// A buy matched with the sell that closed it.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletedTrade {
    pub trade_number: usize,
    pub entry_date: NaiveDate,
    pub entry_price: f64,
    pub exit_date: NaiveDate,
    pub exit_price: f64,
    pub shares: f64,
    pub pnl: f64,
    pub pnl_pct: f64,
    pub duration_days: i64,
}

impl CompletedTrade {
    pub fn is_win(&self) -> bool {
        self.pnl > 0.0
    }
}

/// Persisted summary of one analysis.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricsRecord {
    pub recorded_at: DateTime<Utc>,
    pub initial_capital: f64,
    pub final_value: f64,
    pub total_return: f64,
    pub total_trades: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,
    pub win_rate: f64,
    pub max_drawdown: f64,
    pub sharpe_ratio: f64,
}

impl MetricsRecord {
    pub fn from_result(metrics: &MetricsResult, recorded_at: DateTime<Utc>) -> Self {
        MetricsRecord {
            recorded_at,
            initial_capital: metrics.basic.initial_value,
            final_value: metrics.basic.final_value,
            total_return: metrics.basic.total_return,
            total_trades: metrics.trades.total_trades,
            winning_trades: metrics.trades.winning_trades,
            losing_trades: metrics.trades.losing_trades,
            win_rate: metrics.trades.win_rate,
            max_drawdown: metrics.drawdown.max_drawdown,
            sharpe_ratio: metrics.risk.sharpe_ratio,
        }
    }
}

/// Compute every metric set from the full recorded history.
///
/// `risk_free_rate` is annual, as a fraction (`0.02` for 2%).
pub fn analyze(
    snapshots: &[SnapshotRecord],
    trades: &[TradeRecord],
    risk_free_rate: f64,
) -> Result<MetricsResult, SignaltraderError> {
    if snapshots.is_empty() {
        return Err(SignaltraderError::NoData {
            reason: "no portfolio snapshots recorded; run a backtest first".into(),
        });
    }

    let mut ordered: Vec<&SnapshotRecord> = snapshots.iter().collect();
    ordered.sort_by_key(|s| s.timestamp);
    let values: Vec<f64> = ordered.iter().map(|s| s.total_value).collect();

    let returns = period_returns(&values);
    let basic = compute_basic(&values, &returns);
    let risk = compute_risk(&returns, basic.annualized_return, risk_free_rate);
    let trades = compute_trade_metrics(&pair_trades(trades));
    let drawdown = compute_drawdown(&values);

    Ok(MetricsResult {
        basic,
        risk,
        trades,
        drawdown,
    })
}

/// Analysis over whatever a ledger currently holds.
pub struct MetricsAnalyzer<'a> {
    ledger: &'a dyn LedgerPort,
    risk_free_rate: f64,
}

impl<'a> MetricsAnalyzer<'a> {
    pub fn new(ledger: &'a dyn LedgerPort, risk_free_rate: f64) -> Self {
        Self {
            ledger,
            risk_free_rate,
        }
    }

    pub fn analyze(&self) -> Result<MetricsResult, SignaltraderError> {
        let snapshots = self.ledger.list_snapshots()?;
        let trades = self.ledger.list_trades()?;
        analyze(&snapshots, &trades, self.risk_free_rate)
    }

    /// Analyze, then persist the summary stamped with the current time.
    pub fn analyze_and_record(&self) -> Result<MetricsResult, SignaltraderError> {
        let metrics = self.analyze()?;
        self.ledger.record_metrics(&metrics, Utc::now())?;
        debug!(
            total_return = metrics.basic.total_return,
            sharpe = metrics.risk.sharpe_ratio,
            "metrics recorded"
        );
        Ok(metrics)
    }
}

/// Fractional change between consecutive values; one element shorter than
/// the input. A non-positive previous value yields 0.
pub fn period_returns(values: &[f64]) -> Vec<f64> {
    values
        .windows(2)
        .map(|w| {
            let prev = w[0];
            let curr = w[1];
            if prev > 0.0 { (curr - prev) / prev } else { 0.0 }
        })
        .collect()
}

/// Percent decline from the running peak at each period; always <= 0.
pub fn drawdown_series(values: &[f64]) -> Vec<f64> {
    let mut peak = f64::NEG_INFINITY;
    values
        .iter()
        .map(|&value| {
            peak = peak.max(value);
            if peak > 0.0 {
                ((value - peak) / peak * 100.0).min(0.0)
            } else {
                0.0
            }
        })
        .collect()
}

/// Pair each sell with the most recent unmatched buy strictly before it.
///
/// Sells with no such buy are ignored, as is a buy that is never closed.
pub fn pair_trades(trades: &[TradeRecord]) -> Vec<CompletedTrade> {
    let mut ordered: Vec<&TradeRecord> = trades.iter().collect();
    ordered.sort_by_key(|t| t.timestamp);

    let mut pending_buy: Option<&TradeRecord> = None;
    let mut completed = Vec::new();

    for trade in ordered {
        match trade.trade_type {
            TradeType::Buy => pending_buy = Some(trade),
            TradeType::Sell => {
                let Some(buy) = pending_buy.filter(|b| b.timestamp < trade.timestamp) else {
                    continue;
                };
                pending_buy = None;

                let pnl = (trade.price - buy.price) * trade.shares;
                let pnl_pct = if buy.price > 0.0 {
                    (trade.price - buy.price) / buy.price * 100.0
                } else {
                    0.0
                };

                completed.push(CompletedTrade {
                    trade_number: completed.len() + 1,
                    entry_date: buy.timestamp,
                    entry_price: buy.price,
                    exit_date: trade.timestamp,
                    exit_price: trade.price,
                    shares: trade.shares,
                    pnl,
                    pnl_pct,
                    duration_days: (trade.timestamp - buy.timestamp).num_days(),
                });
            }
        }
    }

    completed
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

fn compute_basic(values: &[f64], returns: &[f64]) -> BasicMetrics {
    let initial_value = values.first().copied().unwrap_or(0.0);
    let final_value = values.last().copied().unwrap_or(initial_value);
    let period_count = values.len();

    let total_return = if initial_value > 0.0 {
        (final_value - initial_value) / initial_value * 100.0
    } else {
        0.0
    };

    let annualized_return = if period_count > 1 && initial_value > 0.0 {
        let growth = final_value / initial_value;
        (growth.powf(TRADING_DAYS_PER_YEAR / period_count as f64) - 1.0) * 100.0
    } else {
        0.0
    };

    BasicMetrics {
        initial_value,
        final_value,
        total_return,
        annualized_return,
        period_count,
        avg_period_return: mean(returns) * 100.0,
        period_volatility: sample_stddev(returns).unwrap_or(0.0) * 100.0,
    }
}

fn compute_risk(returns: &[f64], annualized_return: f64, risk_free_rate: f64) -> RiskMetrics {
    if returns.len() < 2 {
        return RiskMetrics {
            annualized_volatility: 0.0,
            sharpe_ratio: 0.0,
            sortino_ratio: 0.0,
            downside_deviation: 0.0,
        };
    }

    let annualize = TRADING_DAYS_PER_YEAR.sqrt() * 100.0;
    let annualized_volatility = sample_stddev(returns).unwrap_or(0.0) * annualize;
    let excess_return = annualized_return - risk_free_rate * 100.0;

    let sharpe_ratio = if annualized_volatility > 0.0 {
        excess_return / annualized_volatility
    } else {
        0.0
    };

    let negative: Vec<f64> = returns.iter().copied().filter(|r| *r < 0.0).collect();
    let (sortino_ratio, downside_deviation) = if negative.is_empty() {
        let sortino = if excess_return > 0.0 { f64::INFINITY } else { 0.0 };
        (sortino, 0.0)
    } else {
        // A single negative observation has no sample deviation.
        let downside = sample_stddev(&negative).unwrap_or(0.0) * annualize;
        let sortino = if downside > 0.0 {
            excess_return / downside
        } else {
            0.0
        };
        (sortino, downside)
    };

    RiskMetrics {
        annualized_volatility,
        sharpe_ratio,
        sortino_ratio,
        downside_deviation,
    }
}

fn compute_trade_metrics(completed: &[CompletedTrade]) -> TradeMetrics {
    let wins: Vec<f64> = completed.iter().map(|t| t.pnl).filter(|p| *p > 0.0).collect();
    let losses: Vec<f64> = completed.iter().map(|t| t.pnl).filter(|p| *p < 0.0).collect();

    let total_trades = completed.len();
    let win_rate = if total_trades > 0 {
        wins.len() as f64 / total_trades as f64 * 100.0
    } else {
        0.0
    };

    let sum_wins: f64 = wins.iter().sum();
    let sum_losses: f64 = losses.iter().sum();

    let profit_factor = if sum_losses != 0.0 {
        (sum_wins / sum_losses).abs()
    } else if !wins.is_empty() {
        f64::INFINITY
    } else {
        0.0
    };

    TradeMetrics {
        total_trades,
        winning_trades: wins.len(),
        losing_trades: losses.len(),
        win_rate,
        avg_win: mean(&wins),
        avg_loss: mean(&losses).abs(),
        profit_factor,
        largest_win: wins.iter().copied().fold(0.0, f64::max),
        largest_loss: losses.iter().copied().fold(0.0, f64::min).abs(),
        total_pnl: completed.iter().map(|t| t.pnl).sum(),
    }
}

fn compute_drawdown(values: &[f64]) -> DrawdownMetrics {
    let series = drawdown_series(values);

    let max_drawdown = series.iter().copied().fold(0.0, f64::min).abs();
    let current_drawdown = series.last().copied().unwrap_or(0.0).abs();

    let negative: Vec<f64> = series.iter().copied().filter(|d| *d < 0.0).collect();
    let avg_drawdown = mean(&negative).abs();

    let mut max_drawdown_duration = 0usize;
    let mut current_run = 0usize;
    for dd in &series {
        if *dd < 0.0 {
            current_run += 1;
            max_drawdown_duration = max_drawdown_duration.max(current_run);
        } else {
            current_run = 0;
        }
    }

    DrawdownMetrics {
        max_drawdown,
        current_drawdown,
        avg_drawdown,
        max_drawdown_duration,
    }
}
