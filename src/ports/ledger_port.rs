//! Ledger store port: append/query access to a run's trades and snapshots.
//!
//! Each implementation instance is one run namespace. Implementations own
//! their retry policy; callers propagate errors as-is.

use chrono::{DateTime, Utc};

use crate::domain::error::SignaltraderError;
use crate::domain::ledger::{SnapshotRecord, TradeRecord};
use crate::domain::metrics::{MetricsRecord, MetricsResult};

pub trait LedgerPort {
    fn append_trade(&self, trade: &TradeRecord) -> Result<(), SignaltraderError>;

    /// Insert, or replace the snapshot with the same timestamp.
    fn upsert_snapshot(&self, snapshot: &SnapshotRecord) -> Result<(), SignaltraderError>;

    /// Remove all trades, snapshots and recorded metrics.
    fn clear(&self) -> Result<(), SignaltraderError>;

    /// Trades by timestamp; insertion order breaks ties.
    fn list_trades(&self) -> Result<Vec<TradeRecord>, SignaltraderError>;

    fn list_snapshots(&self) -> Result<Vec<SnapshotRecord>, SignaltraderError>;

    fn record_metrics(
        &self,
        metrics: &MetricsResult,
        recorded_at: DateTime<Utc>,
    ) -> Result<(), SignaltraderError>;

    /// Recorded summaries, oldest first.
    fn list_metrics(&self) -> Result<Vec<MetricsRecord>, SignaltraderError>;
}
