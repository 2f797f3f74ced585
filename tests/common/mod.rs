#![allow(dead_code)]

use chrono::NaiveDate;
use signaltrader::domain::ledger::{SnapshotRecord, TradeRecord, TradeType};
pub use signaltrader::domain::ohlcv::PriceBar;
use signaltrader::domain::signal::{Signal, SignalRecord, SignalSeries, MIDDLE_BAND};
use std::io::Write;

pub fn date(offset: i64) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + chrono::Duration::days(offset)
}

pub fn make_bar(offset: i64, close: f64) -> PriceBar {
    PriceBar {
        date: date(offset),
        open: close,
        high: close,
        low: close,
        close,
        volume: 1_000,
    }
}

pub fn make_bars(closes: &[f64]) -> Vec<PriceBar> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| make_bar(i as i64, close))
        .collect()
}

/// `amplitude`-wide oscillation around `base` with a 20-day period.
pub fn wave_prices(days: usize, base: f64, amplitude: f64) -> Vec<f64> {
    (0..days)
        .map(|i| base + amplitude * (i as f64 * std::f64::consts::TAU / 20.0).sin())
        .collect()
}

/// One record per price, one day apart. `buys` holds the indices carrying a
/// buy signal; `middle` is attached as the middle band when given.
pub fn series(prices: &[f64], buys: &[usize], middle: Option<&[f64]>) -> SignalSeries {
    let records = prices
        .iter()
        .enumerate()
        .map(|(i, &price)| {
            let signal = if buys.contains(&i) { Signal::Buy } else { Signal::None };
            let record = SignalRecord::new(date(i as i64), price, signal);
            match middle {
                Some(bands) => record.with_indicator(MIDDLE_BAND, bands[i]),
                None => record,
            }
        })
        .collect();
    SignalSeries::new(records).unwrap()
}

pub fn prices_csv(closes: &[f64]) -> String {
    let mut out = String::from("Date,Open,High,Low,Close,Volume\n");
    for (i, close) in closes.iter().enumerate() {
        out.push_str(&format!(
            "{},{:.4},{:.4},{:.4},{:.4},1000\n",
            date(i as i64),
            close,
            close,
            close,
            close
        ));
    }
    out
}

pub fn write_temp_file(content: &str, suffix: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

/// Assert the ledger invariants every run must satisfy.
pub fn assert_ledger_invariants(snapshots: &[SnapshotRecord], trades: &[TradeRecord]) {
    for snap in snapshots {
        assert_eq!(
            snap.total_value,
            snap.cash + snap.shares_held * snap.price,
            "conservation broken on {}",
            snap.timestamp
        );
    }

    for pair in snapshots.windows(2) {
        assert!(pair[0].timestamp < pair[1].timestamp, "snapshots out of order");
    }
    for pair in trades.windows(2) {
        assert!(pair[0].timestamp <= pair[1].timestamp, "trades out of order");
    }

    for (i, trade) in trades.iter().enumerate() {
        let expected = if i % 2 == 0 { TradeType::Buy } else { TradeType::Sell };
        assert_eq!(trade.trade_type, expected, "trade {} breaks alternation", i);

        let snap = snapshots
            .iter()
            .find(|s| s.timestamp == trade.timestamp)
            .expect("every trade has a snapshot on its date");
        match trade.trade_type {
            TradeType::Buy => assert_eq!(snap.cash, 0.0),
            TradeType::Sell => assert_eq!(snap.shares_held, 0.0),
        }
    }
}
