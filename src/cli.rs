//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use crate::adapters::csv_adapter::{CsvAdapter, PROVIDER_NAME};
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::tracing_sink::TracingSink;
use crate::domain::backtest::{Backtest, BacktestConfig, BacktestResult};
use crate::domain::bar::VecBarSource;
use crate::domain::config_validation::{build_backtest_config, validate_run_config};
use crate::domain::error::SimError;
use crate::domain::execution::ExecutionLedger;
use crate::domain::risk::RiskGate;
use crate::domain::strategy::DualMaStrategy;
use crate::domain::universe::{LoadedSymbol, load_universe, parse_symbols};
use crate::ports::data_port::DataPort;
use crate::ports::diagnostic_port::SharedSink;

#[derive(Parser, Debug)]
#[command(name = "qtbacktest", about = "Event-driven strategy backtester")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a backtest
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        /// Run a single symbol instead of the configured list
        #[arg(long)]
        symbol: Option<String>,
        #[arg(long)]
        dry_run: bool,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// List symbols available from the configured data source
    ListSymbols {
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Backtest {
            config,
            symbol,
            dry_run,
        } => run_backtest(&config, symbol.as_deref(), dry_run),
        Command::Validate { config } => run_validate(&config),
        Command::ListSymbols { config } => run_list_symbols(&config),
    }
}

pub fn load_config(path: &PathBuf) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|e| {
        let err = SimError::ConfigParse {
            file: path.display().to_string(),
            reason: e.to_string(),
        };
        eprintln!("error: {err}");
        ExitCode::from(&err)
    })
}

/// Resolve the configured provider into a data port.
pub fn open_data_port(config: &BacktestConfig) -> Result<Box<dyn DataPort>, SimError> {
    match config.provider.as_str() {
        PROVIDER_NAME => Ok(Box::new(CsvAdapter::new(config.data_dir.clone()))),
        other => Err(SimError::UnsupportedDataSource {
            provider: other.to_string(),
        }),
    }
}

/// Apply a `--symbol` override on top of the configured list.
pub fn resolve_symbols(
    symbol_override: Option<&str>,
    config: &mut BacktestConfig,
) -> Result<(), SimError> {
    if let Some(raw) = symbol_override {
        config.symbols = parse_symbols(raw).map_err(|e| SimError::ConfigInvalid {
            section: "cli".into(),
            key: "symbol".into(),
            reason: e.to_string(),
        })?;
    }
    Ok(())
}

/// Run one symbol with a fresh ledger, risk gate and strategy.
pub fn run_symbol(
    loaded: LoadedSymbol,
    config: &BacktestConfig,
    sink: SharedSink,
) -> Result<BacktestResult, SimError> {
    let mut ledger = ExecutionLedger::new(config.ledger.clone(), sink.clone());
    let mut risk =
        RiskGate::new(config.risk.clone(), sink.clone()).with_day_offset(config.day_offset);
    let mut strategy = DualMaStrategy::new(config.strategy_name.clone(), config.strategy.clone())?;
    let mut source = VecBarSource::new(loaded.symbol, loaded.bars);

    Backtest::new(&mut source, &mut strategy, &mut risk, &mut ledger, sink).run(&config.analyzer)
}

/// Load the universe and run every symbol in turn. `sink_for` supplies the
/// diagnostic sink for each symbol's run.
pub fn run_universe<F>(
    config: &BacktestConfig,
    data_port: &dyn DataPort,
    sink_for: F,
) -> Result<Vec<BacktestResult>, SimError>
where
    F: Fn(&str) -> SharedSink,
{
    let universe = load_universe(
        data_port,
        &config.symbols,
        config.start_date,
        config.end_date,
        config.interval,
        &sink_for("universe"),
    )?;

    universe
        .loaded
        .into_iter()
        .map(|loaded| {
            let sink = sink_for(&loaded.symbol);
            run_symbol(loaded, config, sink)
        })
        .collect()
}

fn tracing_sink(run: &str) -> SharedSink {
    Arc::new(TracingSink::new(run))
}

fn prepare(config_path: &PathBuf, symbol_override: Option<&str>) -> Result<BacktestConfig, ExitCode> {
    eprintln!("Loading config from {}", config_path.display());
    let adapter = load_config(config_path)?;

    let mut config = build_backtest_config(&adapter).map_err(|e| {
        eprintln!("error: {e}");
        ExitCode::from(&e)
    })?;
    resolve_symbols(symbol_override, &mut config).map_err(|e| {
        eprintln!("error: {e}");
        ExitCode::from(&e)
    })?;
    Ok(config)
}

fn run_backtest(config_path: &PathBuf, symbol_override: Option<&str>, dry_run: bool) -> ExitCode {
    // Stage 1: Load and validate config
    let config = match prepare(config_path, symbol_override) {
        Ok(c) => c,
        Err(code) => return code,
    };

    // Stage 2: Resolve data source
    let data_port = match open_data_port(&config) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    if dry_run {
        return run_dry_run(&config, data_port.as_ref());
    }

    // Stage 3: Run every symbol
    eprintln!(
        "Running {} on {} symbol(s), {} to {} ({})",
        config.strategy_name,
        config.symbols.len(),
        config.start_date,
        config.end_date,
        config.interval,
    );
    let results = match run_universe(&config, data_port.as_ref(), tracing_sink) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    // Stage 4: Console summary
    for result in &results {
        print_summary(result);
    }
    if results.len() > 1 {
        print_aggregate(&results);
    }
    ExitCode::SUCCESS
}

pub fn print_summary(result: &BacktestResult) {
    let report = &result.report;
    let summary = &result.summary;

    eprintln!("\n=== {} ===", result.symbol);
    eprintln!("Bars:             {}", result.bars_processed);
    eprintln!("Total Return:     {:.2}%", report.total_return * 100.0);
    eprintln!("Annual Return:    {:.2}%", report.annual_return * 100.0);
    eprintln!("Annual Vol:       {:.2}%", report.annual_volatility * 100.0);
    eprintln!("Sharpe Ratio:     {:.2}", report.sharpe_ratio);
    eprintln!("Sortino Ratio:    {:.2}", report.sortino_ratio);
    eprintln!("Calmar Ratio:     {:.2}", report.calmar_ratio);
    eprintln!("Max Drawdown:     {:.2}%", report.max_drawdown * 100.0);
    eprintln!("Final Cash:       {:.2}", summary.cash);
    eprintln!(
        "Trades:           {} filled, {} rejected by ledger, {} rejected by risk",
        summary.total_trades, summary.rejected_trades, result.risk_rejections
    );
    eprintln!(
        "Closed:           {} won, {} lost, {} breakeven (realized {:+.2})",
        summary.wins, summary.losses, summary.breakeven, summary.realized_pnl
    );
    for (symbol, qty) in summary.positions.iter().filter(|(_, q)| **q != 0) {
        eprintln!("Open Position:    {symbol} {qty}");
    }
}

fn print_aggregate(results: &[BacktestResult]) {
    eprintln!("\n=== Per-Symbol Summary ===");
    for r in results {
        let pnl_sign = if r.summary.realized_pnl >= 0.0 { "+" } else { "" };
        eprintln!(
            "  {}:  {} trades, {:.2}% return, {}{:.2} realized",
            r.symbol,
            r.summary.total_trades,
            r.report.total_return * 100.0,
            pnl_sign,
            r.summary.realized_pnl,
        );
    }
}

fn run_dry_run(config: &BacktestConfig, data_port: &dyn DataPort) -> ExitCode {
    eprintln!("Config validated successfully");

    eprintln!("\nStrategy:");
    eprintln!("  name:         {}", config.strategy_name);
    eprintln!("  short_window: {}", config.strategy.short_window);
    eprintln!("  long_window:  {}", config.strategy.long_window);
    eprintln!("  trade_size:   {}", config.strategy.trade_size);

    eprintln!("\nExecution:");
    eprintln!("  initial_cash:    {:.2}", config.ledger.initial_cash);
    eprintln!("  commission_rate: {}", config.ledger.commission_rate);
    eprintln!("  slippage_rate:   {}", config.ledger.slippage_rate);
    eprintln!("  periods/year:    {}", config.analyzer.periods_per_year);

    eprintln!("\nRisk:");
    eprintln!("  max_position:     {}", config.risk.max_position);
    eprintln!("  max_drawdown:     {}", config.risk.max_drawdown);
    eprintln!("  max_daily_loss:   {:?}", config.risk.max_daily_loss);
    eprintln!("  max_daily_trades: {:?}", config.risk.max_daily_trades);
    eprintln!("  day boundary:     UTC{}", config.day_offset);

    eprintln!("\nUniverse ({}):", config.provider);
    let universe = match load_universe(
        data_port,
        &config.symbols,
        config.start_date,
        config.end_date,
        config.interval,
        &tracing_sink("universe"),
    ) {
        Ok(u) => u,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };
    for loaded in &universe.loaded {
        eprintln!("  {}: {} bars [OK]", loaded.symbol, loaded.bars.len());
    }
    for skipped in &universe.skipped {
        eprintln!("  {}: skipped ({:?})", skipped.symbol, skipped.reason);
    }

    eprintln!("\nDry run complete: configuration is valid");
    ExitCode::SUCCESS
}

fn run_validate(config_path: &PathBuf) -> ExitCode {
    eprintln!("Validating config: {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    eprintln!("Sections: {}", adapter.sections().join(", "));
    match validate_run_config(&adapter) {
        Ok(()) => {
            eprintln!("Configuration OK");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

fn run_list_symbols(config_path: &PathBuf) -> ExitCode {
    let config = match prepare(config_path, None) {
        Ok(c) => c,
        Err(code) => return code,
    };
    let data_port = match open_data_port(&config) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    match data_port.list_symbols() {
        Ok(symbols) if symbols.is_empty() => {
            eprintln!("No symbols found in {}", config.data_dir.display());
            ExitCode::SUCCESS
        }
        Ok(symbols) => {
            for symbol in &symbols {
                println!("{}", symbol);
            }
            eprintln!("{} symbols found", symbols.len());
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}
