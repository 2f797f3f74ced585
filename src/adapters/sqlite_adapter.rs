//! SQLite ledger store.
//!
//! One database file holds one run: `trades`, `portfolio_history` and
//! `performance_metrics`. Dates are stored as `YYYY-MM-DD` text.

use chrono::{DateTime, NaiveDate, Utc};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::params;
use std::path::Path;

use crate::domain::error::SignaltraderError;
use crate::domain::ledger::{SnapshotRecord, TradeRecord, TradeType};
use crate::domain::metrics::{MetricsRecord, MetricsResult};
use crate::ports::config_port::ConfigPort;
use crate::ports::ledger_port::LedgerPort;

const DATE_FORMAT: &str = "%Y-%m-%d";
const DEFAULT_POOL_SIZE: u32 = 4;

pub struct SqliteLedger {
    pool: Pool<SqliteConnectionManager>,
}

fn read_err(e: impl std::fmt::Display) -> SignaltraderError {
    SignaltraderError::StoreRead {
        reason: e.to_string(),
    }
}

fn write_err(e: impl std::fmt::Display) -> SignaltraderError {
    SignaltraderError::StoreWrite {
        reason: e.to_string(),
    }
}

fn parse_date(column: usize, text: String) -> rusqlite::Result<NaiveDate> {
    NaiveDate::parse_from_str(&text, DATE_FORMAT).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(
            column,
            rusqlite::types::Type::Text,
            Box::new(e),
        )
    })
}

impl SqliteLedger {
    /// Open the ledger at `path` with `[sqlite] pool_size` connections and
    /// make sure its schema exists.
    pub fn open_configured(
        path: impl AsRef<Path>,
        config: &dyn ConfigPort,
    ) -> Result<Self, SignaltraderError> {
        let pool_size = config.get_int("sqlite", "pool_size", DEFAULT_POOL_SIZE as i64) as u32;
        let ledger = Self::open(path, pool_size)?;
        ledger.initialize_schema()?;
        Ok(ledger)
    }

    pub fn open(path: impl AsRef<Path>, pool_size: u32) -> Result<Self, SignaltraderError> {
        let manager = SqliteConnectionManager::file(path.as_ref());
        let pool = Pool::builder()
            .max_size(pool_size.max(1))
            .build(manager)
            .map_err(|e: r2d2::Error| SignaltraderError::StoreWrite {
                reason: format!("cannot open {}: {}", path.as_ref().display(), e),
            })?;

        Ok(Self { pool })
    }

    pub fn in_memory() -> Result<Self, SignaltraderError> {
        let manager = SqliteConnectionManager::memory();
        let pool = Pool::builder()
            .max_size(1)
            .build(manager)
            .map_err(|e: r2d2::Error| SignaltraderError::StoreWrite {
                reason: e.to_string(),
            })?;

        Ok(Self { pool })
    }

    pub fn initialize_schema(&self) -> Result<(), SignaltraderError> {
        let conn = self.pool.get().map_err(write_err)?;

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS trades (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                trade_date TEXT NOT NULL,
                trade_type TEXT NOT NULL,
                price REAL NOT NULL,
                shares REAL NOT NULL,
                cash_change REAL NOT NULL,
                portfolio_value REAL NOT NULL
            );
            CREATE TABLE IF NOT EXISTS portfolio_history (
                date TEXT PRIMARY KEY,
                cash REAL NOT NULL,
                holdings_value REAL NOT NULL,
                total_value REAL NOT NULL,
                shares_held REAL NOT NULL,
                price REAL NOT NULL
            );
            CREATE TABLE IF NOT EXISTS performance_metrics (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                backtest_date TEXT NOT NULL,
                initial_capital REAL NOT NULL,
                final_portfolio_value REAL NOT NULL,
                total_return REAL NOT NULL,
                total_trades INTEGER NOT NULL,
                winning_trades INTEGER NOT NULL,
                losing_trades INTEGER NOT NULL,
                win_rate REAL NOT NULL,
                max_drawdown REAL NOT NULL,
                sharpe_ratio REAL NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_trades_date ON trades(trade_date);",
        )
        .map_err(|e: rusqlite::Error| SignaltraderError::StoreWrite {
            reason: e.to_string(),
        })?;

        Ok(())
    }

    fn conn_for_write(
        &self,
    ) -> Result<PooledConnection<SqliteConnectionManager>, SignaltraderError> {
        self.pool.get().map_err(write_err)
    }

    fn conn_for_read(&self) -> Result<PooledConnection<SqliteConnectionManager>, SignaltraderError> {
        self.pool.get().map_err(read_err)
    }
}

impl LedgerPort for SqliteLedger {
    fn append_trade(&self, trade: &TradeRecord) -> Result<(), SignaltraderError> {
        let conn = self.conn_for_write()?;
        conn.execute(
            "INSERT INTO trades (trade_date, trade_type, price, shares, cash_change, portfolio_value)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                trade.timestamp.format(DATE_FORMAT).to_string(),
                trade.trade_type.as_str(),
                trade.price,
                trade.shares,
                trade.cash_change,
                trade.portfolio_value_after
            ],
        )
        .map_err(write_err)?;
        Ok(())
    }

    fn upsert_snapshot(&self, snapshot: &SnapshotRecord) -> Result<(), SignaltraderError> {
        let conn = self.conn_for_write()?;
        conn.execute(
            "INSERT OR REPLACE INTO portfolio_history
                 (date, cash, holdings_value, total_value, shares_held, price)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                snapshot.timestamp.format(DATE_FORMAT).to_string(),
                snapshot.cash,
                snapshot.holdings_value,
                snapshot.total_value,
                snapshot.shares_held,
                snapshot.price
            ],
        )
        .map_err(write_err)?;
        Ok(())
    }

    fn clear(&self) -> Result<(), SignaltraderError> {
        let mut conn = self.conn_for_write()?;
        let tx = conn.transaction().map_err(write_err)?;
        tx.execute_batch(
            "DELETE FROM trades;
             DELETE FROM portfolio_history;
             DELETE FROM performance_metrics;",
        )
        .map_err(write_err)?;
        tx.commit().map_err(write_err)?;
        Ok(())
    }

    fn list_trades(&self) -> Result<Vec<TradeRecord>, SignaltraderError> {
        let conn = self.conn_for_read()?;
        let mut stmt = conn
            .prepare(
                "SELECT trade_date, trade_type, price, shares, cash_change, portfolio_value
                 FROM trades
                 ORDER BY trade_date ASC, id ASC",
            )
            .map_err(read_err)?;

        let rows = stmt
            .query_map([], |row| {
                let trade_type: String = row.get(1)?;
                let trade_type = trade_type.parse::<TradeType>().map_err(|e| {
                    rusqlite::Error::FromSqlConversionFailure(
                        1,
                        rusqlite::types::Type::Text,
                        e.into(),
                    )
                })?;
                Ok(TradeRecord {
                    timestamp: parse_date(0, row.get(0)?)?,
                    trade_type,
                    price: row.get(2)?,
                    shares: row.get(3)?,
                    cash_change: row.get(4)?,
                    portfolio_value_after: row.get(5)?,
                })
            })
            .map_err(read_err)?;

        let mut trades = Vec::new();
        for row in rows {
            trades.push(row.map_err(read_err)?);
        }
        Ok(trades)
    }

    fn list_snapshots(&self) -> Result<Vec<SnapshotRecord>, SignaltraderError> {
        let conn = self.conn_for_read()?;
        let mut stmt = conn
            .prepare(
                "SELECT date, cash, holdings_value, total_value, shares_held, price
                 FROM portfolio_history
                 ORDER BY date ASC",
            )
            .map_err(read_err)?;

        let rows = stmt
            .query_map([], |row| {
                Ok(SnapshotRecord {
                    timestamp: parse_date(0, row.get(0)?)?,
                    cash: row.get(1)?,
                    holdings_value: row.get(2)?,
                    total_value: row.get(3)?,
                    shares_held: row.get(4)?,
                    price: row.get(5)?,
                })
            })
            .map_err(read_err)?;

        let mut snapshots = Vec::new();
        for row in rows {
            snapshots.push(row.map_err(read_err)?);
        }
        Ok(snapshots)
    }

    fn record_metrics(
        &self,
        metrics: &MetricsResult,
        recorded_at: DateTime<Utc>,
    ) -> Result<(), SignaltraderError> {
        let record = MetricsRecord::from_result(metrics, recorded_at);
        let conn = self.conn_for_write()?;
        conn.execute(
            "INSERT INTO performance_metrics
                 (backtest_date, initial_capital, final_portfolio_value, total_return,
                  total_trades, winning_trades, losing_trades, win_rate, max_drawdown, sharpe_ratio)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                record.recorded_at.to_rfc3339(),
                record.initial_capital,
                record.final_value,
                record.total_return,
                record.total_trades as i64,
                record.winning_trades as i64,
                record.losing_trades as i64,
                record.win_rate,
                record.max_drawdown,
                record.sharpe_ratio
            ],
        )
        .map_err(write_err)?;
        Ok(())
    }

    fn list_metrics(&self) -> Result<Vec<MetricsRecord>, SignaltraderError> {
        let conn = self.conn_for_read()?;
        let mut stmt = conn
            .prepare(
                "SELECT backtest_date, initial_capital, final_portfolio_value, total_return,
                        total_trades, winning_trades, losing_trades, win_rate, max_drawdown,
                        sharpe_ratio
                 FROM performance_metrics
                 ORDER BY id ASC",
            )
            .map_err(read_err)?;

        let rows = stmt
            .query_map([], |row| {
                let recorded_at: String = row.get(0)?;
                let recorded_at = DateTime::parse_from_rfc3339(&recorded_at)
                    .map_err(|e| {
                        rusqlite::Error::FromSqlConversionFailure(
                            0,
                            rusqlite::types::Type::Text,
                            Box::new(e),
                        )
                    })?
                    .with_timezone(&Utc);
                let total_trades: i64 = row.get(4)?;
                let winning_trades: i64 = row.get(5)?;
                let losing_trades: i64 = row.get(6)?;
                Ok(MetricsRecord {
                    recorded_at,
                    initial_capital: row.get(1)?,
                    final_value: row.get(2)?,
                    total_return: row.get(3)?,
                    total_trades: total_trades as usize,
                    winning_trades: winning_trades as usize,
                    losing_trades: losing_trades as usize,
                    win_rate: row.get(7)?,
                    max_drawdown: row.get(8)?,
                    sharpe_ratio: row.get(9)?,
                })
            })
            .map_err(read_err)?;

        let mut records = Vec::new();
        for row in rows {
            records.push(row.map_err(read_err)?);
        }
        Ok(records)
    }
}
