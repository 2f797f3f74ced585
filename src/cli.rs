//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::adapters::csv_adapter::{load_signal_series, CsvPriceAdapter};
use crate::adapters::csv_export_adapter::CsvExportAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::memory_ledger::MemoryLedger;
use crate::adapters::text_report_adapter::TextReportAdapter;
use crate::domain::backtest::{
    BacktestConfig, SimulationEngine, DEFAULT_INITIAL_CAPITAL, DEFAULT_RISK_FREE_RATE,
};
use crate::domain::config_validation::{validate_backtest_config, validate_strategy_config};
use crate::domain::error::SignaltraderError;
use crate::domain::metrics::MetricsAnalyzer;
use crate::domain::report::{format_money, render_comparison, BacktestReport, ComparisonRow};
use crate::domain::signal::SignalSeries;
use crate::domain::strategies::bollinger_bands::BollingerParams;
use crate::domain::strategies::ma_crossover::MaCrossoverParams;
use crate::domain::strategies::StrategyCatalog;
use crate::domain::strategy::Strategy;
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::PriceDataPort;
use crate::ports::ledger_port::LedgerPort;
use crate::ports::report_port::ReportPort;

#[derive(Parser, Debug)]
#[command(name = "signaltrader", about = "Single-asset signal backtester")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run one strategy and record its ledger
    Backtest {
        #[arg(short, long)]
        strategy: String,
        #[arg(long)]
        capital: Option<f64>,
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Price history CSV (overrides [data] prices)
        #[arg(short, long)]
        prices: Option<PathBuf>,
        /// Precomputed signal CSV; skips signal generation
        #[arg(long, conflicts_with = "prices")]
        signals: Option<PathBuf>,
        /// Ledger database (defaults to <strategy>_results.db)
        #[arg(long)]
        db: Option<PathBuf>,
        /// Directory for CSV exports and the text report
        #[arg(short, long)]
        export: Option<PathBuf>,
        #[arg(long)]
        risk_free_rate: Option<f64>,
    },
    /// Run every strategy over the same prices and compare
    Compare {
        #[arg(long)]
        capital: Option<f64>,
        #[arg(short, long)]
        config: Option<PathBuf>,
        #[arg(short, long)]
        prices: Option<PathBuf>,
        #[arg(long)]
        risk_free_rate: Option<f64>,
    },
    /// Analyze a previously recorded ledger
    Analyze {
        #[arg(long)]
        db: PathBuf,
        #[arg(short, long)]
        config: Option<PathBuf>,
        #[arg(long)]
        risk_free_rate: Option<f64>,
    },
    /// List available strategies
    ListStrategies {
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Backtest {
            strategy,
            capital,
            config,
            prices,
            signals,
            db,
            export,
            risk_free_rate,
        } => run_backtest(BacktestArgs {
            strategy,
            capital,
            config,
            prices,
            signals,
            db,
            export,
            risk_free_rate,
        }),
        Command::Compare {
            capital,
            config,
            prices,
            risk_free_rate,
        } => run_compare(capital, config.as_ref(), prices.as_ref(), risk_free_rate),
        Command::Analyze {
            db,
            config,
            risk_free_rate,
        } => run_analyze(&db, config.as_ref(), risk_free_rate),
        Command::ListStrategies { config } => run_list_strategies(config.as_ref()),
    }
}

struct BacktestArgs {
    strategy: String,
    capital: Option<f64>,
    config: Option<PathBuf>,
    prices: Option<PathBuf>,
    signals: Option<PathBuf>,
    db: Option<PathBuf>,
    export: Option<PathBuf>,
    risk_free_rate: Option<f64>,
}

fn fail(e: SignaltraderError) -> ExitCode {
    eprintln!("error: {e}");
    (&e).into()
}

/// Load the INI file, or an empty configuration when none is given.
pub fn load_config(path: Option<&PathBuf>) -> Result<FileConfigAdapter, ExitCode> {
    let Some(path) = path else {
        return Ok(FileConfigAdapter::empty());
    };
    eprintln!("Loading config from {}", path.display());
    FileConfigAdapter::from_file(path).map_err(fail)
}

fn load_validated_config(path: Option<&PathBuf>) -> Result<FileConfigAdapter, ExitCode> {
    let adapter = load_config(path)?;
    validate_backtest_config(&adapter).map_err(fail)?;
    validate_strategy_config(&adapter).map_err(fail)?;
    Ok(adapter)
}

/// Config values with command-line overrides applied.
pub fn build_backtest_config(
    adapter: &dyn ConfigPort,
    capital_override: Option<f64>,
    risk_free_override: Option<f64>,
) -> Result<BacktestConfig, SignaltraderError> {
    let initial_capital = capital_override.unwrap_or_else(|| {
        adapter.get_double("backtest", "initial_capital", DEFAULT_INITIAL_CAPITAL)
    });
    if !initial_capital.is_finite() || initial_capital <= 0.0 {
        return Err(SignaltraderError::invalid_input(format!(
            "capital must be positive, got {}",
            initial_capital
        )));
    }

    let risk_free_rate = risk_free_override.unwrap_or_else(|| {
        adapter.get_double("backtest", "risk_free_rate", DEFAULT_RISK_FREE_RATE)
    });
    if !(0.0..1.0).contains(&risk_free_rate) {
        return Err(SignaltraderError::invalid_input(format!(
            "risk-free rate must be in [0, 1), got {}",
            risk_free_rate
        )));
    }

    Ok(BacktestConfig {
        initial_capital,
        risk_free_rate,
    })
}

pub fn build_catalog(adapter: &dyn ConfigPort) -> StrategyCatalog {
    let bollinger_defaults = BollingerParams::default();
    let ma_defaults = MaCrossoverParams::default();

    let num_std = adapter.get_double(
        "bollinger",
        "num_std",
        bollinger_defaults.stddev_mult_x100 as f64 / 100.0,
    );

    let bollinger = BollingerParams {
        window: adapter.get_int("bollinger", "window", bollinger_defaults.window as i64) as usize,
        stddev_mult_x100: (num_std * 100.0).round() as u32,
        trend_window: adapter.get_int(
            "bollinger",
            "trend_window",
            bollinger_defaults.trend_window as i64,
        ) as usize,
    };
    let ma_crossover = MaCrossoverParams {
        short_window: adapter.get_int("ma_crossover", "short_window", ma_defaults.short_window as i64)
            as usize,
        long_window: adapter.get_int("ma_crossover", "long_window", ma_defaults.long_window as i64)
            as usize,
    };

    StrategyCatalog::new(bollinger, ma_crossover)
}

pub fn resolve_prices_path(
    prices_override: Option<&PathBuf>,
    config: &dyn ConfigPort,
) -> Result<PathBuf, SignaltraderError> {
    match prices_override {
        Some(path) => Ok(path.clone()),
        None => config
            .get_path("data", "prices")
            .ok_or_else(|| SignaltraderError::ConfigMissing {
                section: "data".into(),
                key: "prices".into(),
            }),
    }
}

pub fn resolve_db_path(
    db_override: Option<&PathBuf>,
    config: &dyn ConfigPort,
    strategy_id: &str,
) -> PathBuf {
    db_override
        .cloned()
        .or_else(|| config.get_path("sqlite", "path"))
        .unwrap_or_else(|| PathBuf::from(format!("{}_results.db", strategy_id)))
}

fn generate_series(
    strategy: &dyn Strategy,
    prices_path: &Path,
) -> Result<SignalSeries, SignaltraderError> {
    let bars = CsvPriceAdapter::new(prices_path).load_bars()?;
    if bars.is_empty() {
        return Err(SignaltraderError::NoData {
            reason: format!("no price rows in {}", prices_path.display()),
        });
    }
    strategy.generate_signals(&bars)
}

/// Simulate `series`, analyze the resulting ledger and record the metrics.
pub fn execute_backtest(
    strategy: &dyn Strategy,
    series: &SignalSeries,
    bt_config: &BacktestConfig,
    ledger: &dyn LedgerPort,
) -> Result<BacktestReport, SignaltraderError> {
    let engine = SimulationEngine::for_strategy(strategy);
    let summary = engine.run(series, bt_config.initial_capital, ledger)?;
    let metrics = MetricsAnalyzer::new(ledger, bt_config.risk_free_rate).analyze_and_record()?;

    Ok(BacktestReport {
        strategy_id: strategy.id().to_string(),
        strategy_name: strategy.name().to_string(),
        summary,
        metrics,
        snapshots: ledger.list_snapshots()?,
        trades: ledger.list_trades()?,
    })
}

#[cfg(feature = "sqlite")]
fn open_ledger(path: &Path, config: &dyn ConfigPort) -> Result<Box<dyn LedgerPort>, SignaltraderError> {
    use crate::adapters::sqlite_adapter::SqliteLedger;

    Ok(Box::new(SqliteLedger::open_configured(path, config)?))
}

#[cfg(not(feature = "sqlite"))]
fn open_ledger(path: &Path, _config: &dyn ConfigPort) -> Result<Box<dyn LedgerPort>, SignaltraderError> {
    eprintln!(
        "warning: sqlite feature disabled; {} will not be written",
        path.display()
    );
    Ok(Box::new(MemoryLedger::new()))
}

fn run_backtest(args: BacktestArgs) -> ExitCode {
    // Stage 1: Load and validate config
    let adapter = match load_validated_config(args.config.as_ref()) {
        Ok(a) => a,
        Err(code) => return code,
    };

    let bt_config = match build_backtest_config(&adapter, args.capital, args.risk_free_rate) {
        Ok(c) => c,
        Err(e) => return fail(e),
    };

    // Stage 2: Resolve strategy
    let catalog = build_catalog(&adapter);
    let strategy = match catalog.get(&args.strategy) {
        Ok(s) => s,
        Err(e) => return fail(e),
    };
    eprintln!("Strategy: {} ({})", strategy.name(), strategy.description());

    // Stage 3: Build the signal series
    let series = match &args.signals {
        Some(path) => {
            eprintln!("Loading signals from {}", path.display());
            load_signal_series(path)
        }
        None => resolve_prices_path(args.prices.as_ref(), &adapter).and_then(|path| {
            eprintln!("Loading prices from {}", path.display());
            generate_series(strategy, &path)
        }),
    };
    let series = match series {
        Ok(s) => s,
        Err(e) => return fail(e),
    };

    if let (Some(first), Some(last)) = (series.first_date(), series.last_date()) {
        eprintln!("  Data period: {} to {}", first, last);
    }
    eprintln!("  Data points: {}", series.len());
    eprintln!("  Buy signals: {}", series.buy_signal_count());
    if series.buy_signal_count() == 0 {
        eprintln!("warning: no buy signals generated; check strategy parameters");
    }

    // Stage 4: Simulate and analyze
    let db_path = resolve_db_path(args.db.as_ref(), &adapter, strategy.id());
    let ledger = match open_ledger(&db_path, &adapter) {
        Ok(l) => l,
        Err(e) => return fail(e),
    };

    eprintln!(
        "Running backtest with {} initial capital...",
        format_money(bt_config.initial_capital)
    );
    let report = match execute_backtest(strategy, &series, &bt_config, ledger.as_ref()) {
        Ok(r) => r,
        Err(e) => return fail(e),
    };

    print!("{}", report.render_text());

    // Stage 5: Exports
    let export_dir = args
        .export
        .or_else(|| adapter.get_path("report", "output_dir"));
    if let Some(dir) = export_dir {
        let csv_export = CsvExportAdapter::new();
        let text_report = TextReportAdapter::new();
        let writers: [&dyn ReportPort; 2] = [&csv_export, &text_report];
        for writer in writers {
            match writer.write(&report, &dir) {
                Ok(paths) => {
                    for path in paths {
                        eprintln!("Exported: {}", path.display());
                    }
                }
                Err(e) => return fail(e),
            }
        }
    }

    eprintln!("\nLedger: {}", db_path.display());
    ExitCode::SUCCESS
}

fn run_compare(
    capital: Option<f64>,
    config_path: Option<&PathBuf>,
    prices: Option<&PathBuf>,
    risk_free_rate: Option<f64>,
) -> ExitCode {
    let adapter = match load_validated_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };
    let bt_config = match build_backtest_config(&adapter, capital, risk_free_rate) {
        Ok(c) => c,
        Err(e) => return fail(e),
    };
    let prices_path = match resolve_prices_path(prices, &adapter) {
        Ok(p) => p,
        Err(e) => return fail(e),
    };

    let catalog = build_catalog(&adapter);
    let mut rows = Vec::new();

    for strategy in catalog.iter() {
        eprintln!("--- Running {} ---", strategy.name());
        let ledger = MemoryLedger::new();
        let outcome = generate_series(strategy, &prices_path)
            .and_then(|series| execute_backtest(strategy, &series, &bt_config, &ledger));

        let metrics = match outcome {
            Ok(report) => Some(report.metrics),
            Err(e) => {
                eprintln!("  failed: {e}");
                None
            }
        };
        rows.push(ComparisonRow {
            strategy_name: strategy.name().to_string(),
            metrics,
        });
    }

    print!("{}", render_comparison(&rows));

    if rows.iter().all(|r| r.metrics.is_none()) {
        return ExitCode::from(5);
    }
    ExitCode::SUCCESS
}

#[cfg(feature = "sqlite")]
fn run_analyze(
    db_path: &Path,
    config_path: Option<&PathBuf>,
    risk_free_rate: Option<f64>,
) -> ExitCode {
    use crate::adapters::sqlite_adapter::SqliteLedger;
    use crate::domain::report::render_performance;

    let adapter = match load_validated_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };
    let bt_config = match build_backtest_config(&adapter, None, risk_free_rate) {
        Ok(c) => c,
        Err(e) => return fail(e),
    };

    if !db_path.exists() {
        return fail(SignaltraderError::NoData {
            reason: format!("ledger database {} does not exist", db_path.display()),
        });
    }

    let ledger = match SqliteLedger::open(db_path, 1).and_then(|l| {
        l.initialize_schema()?;
        Ok(l)
    }) {
        Ok(l) => l,
        Err(e) => return fail(e),
    };

    let metrics = match MetricsAnalyzer::new(&ledger, bt_config.risk_free_rate).analyze_and_record()
    {
        Ok(m) => m,
        Err(e) => return fail(e),
    };

    print!(
        "{}",
        render_performance(&db_path.display().to_string(), &metrics, None)
    );

    match ledger.list_metrics() {
        Ok(history) => {
            eprintln!("\n{} recorded analyses:", history.len());
            for record in &history {
                eprintln!(
                    "  {}  return {:.2}%  sharpe {:.3}  max dd {:.2}%  trades {}",
                    record.recorded_at.format("%Y-%m-%d %H:%M:%S"),
                    record.total_return,
                    record.sharpe_ratio,
                    record.max_drawdown,
                    record.total_trades
                );
            }
            ExitCode::SUCCESS
        }
        Err(e) => fail(e),
    }
}

#[cfg(not(feature = "sqlite"))]
fn run_analyze(
    _db_path: &Path,
    _config_path: Option<&PathBuf>,
    _risk_free_rate: Option<f64>,
) -> ExitCode {
    eprintln!("error: sqlite feature is required for analyze");
    ExitCode::from(1)
}

fn run_list_strategies(config_path: Option<&PathBuf>) -> ExitCode {
    let adapter = match load_validated_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    let catalog = build_catalog(&adapter);
    println!("Available strategies:");
    for (i, strategy) in catalog.iter().enumerate() {
        println!("\n{}. {}", i + 1, strategy.name());
        println!("   Key:         {}", strategy.id());
        println!("   Description: {}", strategy.description());
        println!(
            "   Usage:       signaltrader backtest --strategy {} --prices <csv>",
            strategy.id()
        );
    }
    ExitCode::SUCCESS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backtest_config_uses_defaults() {
        let c = build_backtest_config(&FileConfigAdapter::empty(), None, None).unwrap();
        assert_eq!(c, BacktestConfig::default());
    }

    #[test]
    fn backtest_config_overrides_win() {
        let adapter = FileConfigAdapter::from_string(
            "[backtest]\ninitial_capital = 5000\nrisk_free_rate = 0.01\n",
        )
        .unwrap();
        let c = build_backtest_config(&adapter, None, None).unwrap();
        assert_eq!(c.initial_capital, 5000.0);
        assert_eq!(c.risk_free_rate, 0.01);

        let c = build_backtest_config(&adapter, Some(2500.0), Some(0.0)).unwrap();
        assert_eq!(c.initial_capital, 2500.0);
        assert_eq!(c.risk_free_rate, 0.0);
    }

    #[test]
    fn backtest_config_rejects_bad_overrides() {
        let adapter = FileConfigAdapter::empty();
        assert!(matches!(
            build_backtest_config(&adapter, Some(0.0), None),
            Err(SignaltraderError::InvalidInput { .. })
        ));
        assert!(matches!(
            build_backtest_config(&adapter, None, Some(1.5)),
            Err(SignaltraderError::InvalidInput { .. })
        ));
    }

    #[test]
    fn catalog_reads_strategy_sections() {
        let adapter = FileConfigAdapter::from_string(
            "[bollinger]\nwindow = 10\nnum_std = 1.5\n[ma_crossover]\nshort_window = 5\n",
        )
        .unwrap();
        let catalog = build_catalog(&adapter);
        assert_eq!(catalog.ids(), vec!["bollinger_bands", "ma_crossover"]);
        assert!(catalog.get("bollinger_bands").is_ok());
    }

    #[test]
    fn db_path_resolution() {
        let empty = FileConfigAdapter::empty();
        assert_eq!(
            resolve_db_path(None, &empty, "ma_crossover"),
            PathBuf::from("ma_crossover_results.db")
        );

        let configured = FileConfigAdapter::from_string("[sqlite]\npath = runs/ledger.db\n").unwrap();
        assert_eq!(
            resolve_db_path(None, &configured, "ma_crossover"),
            PathBuf::from("runs/ledger.db")
        );

        let explicit = PathBuf::from("x.db");
        assert_eq!(resolve_db_path(Some(&explicit), &configured, "ma_crossover"), explicit);
    }

    #[test]
    fn prices_path_required() {
        let result = resolve_prices_path(None, &FileConfigAdapter::empty());
        assert!(matches!(result, Err(SignaltraderError::ConfigMissing { .. })));
    }

    #[test]
    fn cli_parses_backtest() {
        let cli = Cli::try_parse_from([
            "signaltrader",
            "backtest",
            "--strategy",
            "bollinger_bands",
            "--capital",
            "50000",
            "--prices",
            "spy.csv",
        ])
        .unwrap();
        match cli.command {
            Command::Backtest {
                strategy,
                capital,
                prices,
                ..
            } => {
                assert_eq!(strategy, "bollinger_bands");
                assert_eq!(capital, Some(50000.0));
                assert_eq!(prices, Some(PathBuf::from("spy.csv")));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn cli_rejects_prices_with_signals() {
        let result = Cli::try_parse_from([
            "signaltrader",
            "backtest",
            "-s",
            "ma_crossover",
            "--prices",
            "a.csv",
            "--signals",
            "b.csv",
        ]);
        assert!(result.is_err());
    }
}
