//! In-process ledger store.
//!
//! Holds one run's history behind `RefCell`s; suitable for tests and for
//! runs whose results do not need to outlive the process.

use std::cell::RefCell;
use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};

use crate::domain::error::SignaltraderError;
use crate::domain::ledger::{SnapshotRecord, TradeRecord};
use crate::domain::metrics::{MetricsRecord, MetricsResult};
use crate::ports::ledger_port::LedgerPort;

#[derive(Debug, Default)]
pub struct MemoryLedger {
    trades: RefCell<Vec<TradeRecord>>,
    snapshots: RefCell<BTreeMap<NaiveDate, SnapshotRecord>>,
    metrics: RefCell<Vec<MetricsRecord>>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LedgerPort for MemoryLedger {
    fn append_trade(&self, trade: &TradeRecord) -> Result<(), SignaltraderError> {
        self.trades.borrow_mut().push(trade.clone());
        Ok(())
    }

    fn upsert_snapshot(&self, snapshot: &SnapshotRecord) -> Result<(), SignaltraderError> {
        self.snapshots
            .borrow_mut()
            .insert(snapshot.timestamp, snapshot.clone());
        Ok(())
    }

    fn clear(&self) -> Result<(), SignaltraderError> {
        self.trades.borrow_mut().clear();
        self.snapshots.borrow_mut().clear();
        self.metrics.borrow_mut().clear();
        Ok(())
    }

    fn list_trades(&self) -> Result<Vec<TradeRecord>, SignaltraderError> {
        let mut trades = self.trades.borrow().clone();
        // Stable sort keeps insertion order for equal timestamps.
        trades.sort_by_key(|t| t.timestamp);
        Ok(trades)
    }

    fn list_snapshots(&self) -> Result<Vec<SnapshotRecord>, SignaltraderError> {
        Ok(self.snapshots.borrow().values().cloned().collect())
    }

    fn record_metrics(
        &self,
        metrics: &MetricsResult,
        recorded_at: DateTime<Utc>,
    ) -> Result<(), SignaltraderError> {
        self.metrics
            .borrow_mut()
            .push(MetricsRecord::from_result(metrics, recorded_at));
        Ok(())
    }

    fn list_metrics(&self) -> Result<Vec<MetricsRecord>, SignaltraderError> {
        Ok(self.metrics.borrow().clone())
    }
}
