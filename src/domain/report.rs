//! Report content: everything a consumer needs to present one backtest, plus
//! plain-text rendering of the performance report and the comparison table.

use std::fmt::Write;

use super::backtest::RunSummary;
use super::ledger::{SnapshotRecord, TradeRecord};
use super::metrics::{pair_trades, CompletedTrade, MetricsResult};

const RULE_WIDTH: usize = 60;

#[derive(Debug, Clone)]
pub struct BacktestReport {
    pub strategy_id: String,
    pub strategy_name: String,
    pub summary: RunSummary,
    pub metrics: MetricsResult,
    pub snapshots: Vec<SnapshotRecord>,
    pub trades: Vec<TradeRecord>,
}

impl BacktestReport {
    pub fn completed_trades(&self) -> Vec<CompletedTrade> {
        pair_trades(&self.trades)
    }

    pub fn render_text(&self) -> String {
        render_performance(&self.strategy_name, &self.metrics, Some(&self.summary))
    }
}

/// One row of a multi-strategy comparison; `metrics` is `None` when the run
/// failed.
#[derive(Debug, Clone)]
pub struct ComparisonRow {
    pub strategy_name: String,
    pub metrics: Option<MetricsResult>,
}

/// `1234567.891` -> `$1,234,567.89`
pub fn format_money(value: f64) -> String {
    if !value.is_finite() {
        return format!("${}", value);
    }
    let sign = if value < 0.0 { "-" } else { "" };
    let cents = (value.abs() * 100.0).round() as u64;
    let whole = (cents / 100).to_string();

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    format!("{}${}.{:02}", sign, grouped, cents % 100)
}

fn format_ratio(value: f64, precision: usize) -> String {
    if value.is_infinite() {
        if value > 0.0 { "inf".into() } else { "-inf".into() }
    } else {
        format!("{:.*}", precision, value)
    }
}

/// Render the performance report. Without a run summary (re-analysis of a
/// stored ledger) the run-only lines are omitted.
pub fn render_performance(
    strategy_name: &str,
    m: &MetricsResult,
    summary: Option<&RunSummary>,
) -> String {
    let mut out = String::new();
    let rule = "=".repeat(RULE_WIDTH);

    // fmt::Write into a String cannot fail.
    let _ = writeln!(out, "{}", rule);
    let _ = writeln!(out, "BACKTEST PERFORMANCE REPORT: {}", strategy_name);
    let _ = writeln!(out, "{}", rule);

    let _ = writeln!(out, "\nBASIC PERFORMANCE");
    let initial = summary.map_or(m.basic.initial_value, |s| s.initial_capital);
    let _ = writeln!(out, "Initial Capital:       {}", format_money(initial));
    let _ = writeln!(out, "Final Portfolio:       {}", format_money(m.basic.final_value));
    let _ = writeln!(out, "Total Return:          {:.2}%", m.basic.total_return);
    let _ = writeln!(out, "Annualized Return:     {:.2}%", m.basic.annualized_return);
    let _ = writeln!(
        out,
        "Profit/Loss:           {}",
        format_money(m.basic.final_value - initial)
    );
    let _ = writeln!(out, "Trading Periods:       {}", m.basic.period_count);
    if let Some(s) = summary.filter(|s| s.periods_skipped > 0) {
        let _ = writeln!(out, "Skipped Periods:       {}", s.periods_skipped);
    }

    let _ = writeln!(out, "\nRISK METRICS");
    let _ = writeln!(out, "Annualized Volatility: {:.2}%", m.risk.annualized_volatility);
    let _ = writeln!(out, "Sharpe Ratio:          {}", format_ratio(m.risk.sharpe_ratio, 3));
    let _ = writeln!(out, "Sortino Ratio:         {}", format_ratio(m.risk.sortino_ratio, 3));
    let _ = writeln!(out, "Downside Deviation:    {:.2}%", m.risk.downside_deviation);

    let _ = writeln!(out, "\nTRADE ANALYSIS");
    if let Some(s) = summary {
        let _ = writeln!(out, "Executed Trades:       {}", s.total_trades);
    }
    let _ = writeln!(out, "Completed Trades:      {}", m.trades.total_trades);
    let _ = writeln!(out, "Winning Trades:        {}", m.trades.winning_trades);
    let _ = writeln!(out, "Losing Trades:         {}", m.trades.losing_trades);
    let _ = writeln!(out, "Win Rate:              {:.1}%", m.trades.win_rate);
    let _ = writeln!(out, "Average Win:           {}", format_money(m.trades.avg_win));
    let _ = writeln!(out, "Average Loss:          {}", format_money(m.trades.avg_loss));
    let _ = writeln!(out, "Largest Win:           {}", format_money(m.trades.largest_win));
    let _ = writeln!(out, "Largest Loss:          {}", format_money(m.trades.largest_loss));
    let _ = writeln!(out, "Profit Factor:         {}", format_ratio(m.trades.profit_factor, 2));
    if let Some(s) = summary.filter(|s| s.position_open) {
        let _ = writeln!(out, "Open Position:         {:.4} shares", s.final_shares);
    }

    let _ = writeln!(out, "\nDRAWDOWN");
    let _ = writeln!(out, "Max Drawdown:          {:.2}%", m.drawdown.max_drawdown);
    let _ = writeln!(out, "Current Drawdown:      {:.2}%", m.drawdown.current_drawdown);
    let _ = writeln!(out, "Average Drawdown:      {:.2}%", m.drawdown.avg_drawdown);
    let _ = writeln!(
        out,
        "Longest Drawdown:      {} periods",
        m.drawdown.max_drawdown_duration
    );
    let _ = writeln!(out, "{}", rule);

    out
}

pub fn render_comparison(rows: &[ComparisonRow]) -> String {
    let mut out = String::new();
    let rule = "=".repeat(RULE_WIDTH + 20);

    let _ = writeln!(out, "{}", rule);
    let _ = writeln!(out, "COMPARISON SUMMARY");
    let _ = writeln!(out, "{}", rule);
    let _ = writeln!(
        out,
        "{:<25} {:>10} {:>8} {:>9} {:>7}",
        "Strategy", "Return", "Sharpe", "Max DD", "Trades"
    );
    let _ = writeln!(out, "{}", "-".repeat(RULE_WIDTH + 20));

    for row in rows {
        match &row.metrics {
            Some(m) => {
                let _ = writeln!(
                    out,
                    "{:<25} {:>9.2}% {:>8} {:>8.2}% {:>7}",
                    row.strategy_name,
                    m.basic.total_return,
                    format_ratio(m.risk.sharpe_ratio, 3),
                    m.drawdown.max_drawdown,
                    m.trades.total_trades
                );
            }
            None => {
                let _ = writeln!(out, "{:<25} {:>10}", row.strategy_name, "FAILED");
            }
        }
    }
    let _ = writeln!(out, "{}", rule);

    out
}
