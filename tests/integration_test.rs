mod common;

use approx::assert_relative_eq;
use common::*;
use qtbacktest::adapters::file_config_adapter::FileConfigAdapter;
use qtbacktest::cli;
use qtbacktest::domain::backtest::{Backtest, RunState};
use qtbacktest::domain::bar::VecBarSource;
use qtbacktest::domain::config_validation::build_backtest_config;
use qtbacktest::domain::error::SimError;
use qtbacktest::domain::execution::{FillOutcome, RejectReason};
use qtbacktest::domain::intent::Action;
use qtbacktest::domain::metrics::{AnalyzerConfig, PerformanceReport};
use qtbacktest::domain::portfolio::{Snapshot, single_price};
use qtbacktest::domain::risk::{RiskDecision, RiskRejection};
use qtbacktest::domain::strategy::{DualMaConfig, DualMaStrategy};
use qtbacktest::ports::diagnostic_port::Severity;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

/// Falls, rallies through both averages, then collapses.
const CROSSING_CLOSES: [f64; 9] = [10.0, 9.0, 8.0, 7.0, 12.0, 14.0, 15.0, 6.0, 4.0];

fn dual_ma(short: usize, long: usize, trade_size: i64) -> DualMaStrategy {
    DualMaStrategy::new(
        "dual_ma",
        DualMaConfig {
            short_window: short,
            long_window: long,
            trade_size,
        },
    )
    .unwrap()
}

mod pipeline {
    use super::*;

    #[test]
    fn dual_ma_round_trip_through_gate_and_ledger() {
        let (sink, shared) = recording();
        let mut source = VecBarSource::new("AAPL", bars_from_closes("AAPL", &CROSSING_CLOSES));
        let mut strategy = dual_ma(2, 3, 5);
        let mut risk = gate(100, 0.5);
        let mut ledger = ledger(10_000.0, 0.0, 0.0);

        let result = Backtest::new(&mut source, &mut strategy, &mut risk, &mut ledger, shared)
            .run(&AnalyzerConfig::default())
            .unwrap();

        assert_eq!(result.bars_processed, 9);
        assert_eq!(result.intents_emitted, 2);
        assert_eq!(result.risk_rejections, 0);
        assert_eq!(result.fill_rejections, 0);
        assert_eq!(ledger.trades().len(), 2);
        assert_eq!(ledger.trades()[0].intent.action(), Action::Buy);
        assert_eq!(ledger.trades()[1].intent.action(), Action::Sell);
        assert_eq!(ledger.position("AAPL"), 0);
        assert_relative_eq!(ledger.cash(), 10_000.0 - 60.0 + 30.0);
        assert_relative_eq!(result.summary.realized_pnl, -30.0);
        assert_eq!(result.summary.losses, 1);

        // One point per bar, anchored at initial cash.
        assert_eq!(result.report.equity_curve.len(), 9);
        assert_relative_eq!(result.report.equity_curve[0].equity, 10_000.0);
        assert_relative_eq!(result.report.final_equity().unwrap(), 9_970.0);
        assert_relative_eq!(result.report.total_return, -0.003, epsilon = 1e-12);
        assert!(sink.count(Severity::Info) > 0);
    }

    #[test]
    fn second_run_is_refused() {
        let (_sink, shared) = recording();
        let mut source = VecBarSource::new("AAPL", bars_from_closes("AAPL", &[1.0, 2.0]));
        let mut strategy = dual_ma(1, 2, 1);
        let mut risk = gate(100, 0.2);
        let mut ledger = ledger(1_000.0, 0.0, 0.0);
        let mut backtest = Backtest::new(&mut source, &mut strategy, &mut risk, &mut ledger, shared);

        assert!(backtest.run(&AnalyzerConfig::default()).is_ok());
        assert_eq!(backtest.state(), RunState::Done);
        assert!(matches!(
            backtest.run(&AnalyzerConfig::default()),
            Err(SimError::AlreadyCompleted)
        ));
    }

    #[test]
    fn empty_stream_fails() {
        let (_sink, shared) = recording();
        let mut source = VecBarSource::new("AAPL", Vec::new());
        let mut strategy = dual_ma(1, 2, 1);
        let mut risk = gate(100, 0.2);
        let mut ledger = ledger(1_000.0, 0.0, 0.0);

        let err = Backtest::new(&mut source, &mut strategy, &mut risk, &mut ledger, shared)
            .run(&AnalyzerConfig::default())
            .unwrap_err();
        assert!(matches!(err, SimError::EmptyBarStream { ref symbol } if symbol == "AAPL"));
        assert!(ledger.trade_log().is_empty());
    }

    #[test]
    fn position_limit_blocks_entry_inside_the_loop() {
        let (_sink, shared) = recording();
        let mut source = VecBarSource::new("AAPL", bars_from_closes("AAPL", &CROSSING_CLOSES));
        let mut strategy = dual_ma(2, 3, 10);
        let mut risk = gate(5, 0.5);
        let mut ledger = ledger(10_000.0, 0.0, 0.0);

        let result = Backtest::new(&mut source, &mut strategy, &mut risk, &mut ledger, shared)
            .run(&AnalyzerConfig::default())
            .unwrap();

        // The buy is blocked by risk, then the sell fails for lack of inventory.
        assert_eq!(result.intents_emitted, 2);
        assert_eq!(result.risk_rejections, 1);
        assert_eq!(result.fill_rejections, 1);
        assert!(ledger.trades().is_empty());
        assert_relative_eq!(ledger.cash(), 10_000.0);
        assert_relative_eq!(result.report.total_return, 0.0);
    }
}

mod ledger_scenarios {
    use super::*;

    #[test]
    fn buy_with_commission_only() {
        let mut ledger = ledger(100_000.0, 0.0005, 0.0);
        let outcome = ledger.execute(
            &intent(0, "AAPL", Action::Buy, 100.0, 10),
            &single_price("AAPL", 100.0),
        );

        let FillOutcome::Filled(fill) = outcome else {
            panic!("expected fill");
        };
        assert_relative_eq!(fill.fill_price, 100.0);
        assert_relative_eq!(fill.notional, 1_000.0);
        assert_relative_eq!(fill.fee, 0.5);
        assert_relative_eq!(ledger.cash(), 98_999.5);
        assert_eq!(ledger.position("AAPL"), 10);
    }

    #[test]
    fn risk_rejection_leaves_ledger_unchanged() {
        let mut risk = gate(5, 0.2);
        let ledger = ledger(100_000.0, 0.0, 0.0);
        let before = ledger.summary();

        let decision = risk.check(
            &intent(0, "AAPL", Action::Buy, 100.0, 10),
            &single_price("AAPL", 100.0),
            &ledger,
        );

        assert!(matches!(
            decision,
            RiskDecision::Rejected(RiskRejection::PositionLimit {
                current: 0,
                requested: 10,
                limit: 5,
                ..
            })
        ));
        assert_eq!(ledger.summary(), before);
        assert!(ledger.trade_log().is_empty());
    }

    #[test]
    fn ledger_rejections_do_not_mutate_state() {
        let mut ledger = ledger(500.0, 0.001, 0.01);
        let prices = single_price("AAPL", 100.0);

        let too_big = ledger.execute(&intent(0, "AAPL", Action::Buy, 100.0, 10), &prices);
        let no_stock = ledger.execute(&intent(0, "AAPL", Action::Sell, 100.0, 1), &prices);
        let unpriced = ledger.execute(&intent(0, "MSFT", Action::Buy, 10.0, 1), &prices);

        assert!(matches!(
            too_big,
            FillOutcome::Rejected(RejectReason::InsufficientCash { .. })
        ));
        assert!(matches!(
            no_stock,
            FillOutcome::Rejected(RejectReason::InsufficientPosition { available: 0, .. })
        ));
        assert!(matches!(
            unpriced,
            FillOutcome::Rejected(RejectReason::MissingMarketPrice { .. })
        ));
        assert_relative_eq!(ledger.cash(), 500.0);
        assert!(ledger.positions().is_empty());
        assert!(ledger.trade_log().is_empty());
        assert_eq!(ledger.rejected().len(), 3);
    }

    #[test]
    fn custom_rules_run_in_registration_order_after_builtins() {
        let calls = Rc::new(RefCell::new(Vec::new()));
        let mut risk = gate(100, 0.2);
        for name in ["first", "second"] {
            let calls = Rc::clone(&calls);
            risk.register_fn(name, move |_, _| {
                calls.borrow_mut().push(name);
                if name == "second" {
                    Err("blocked".into())
                } else {
                    Ok(())
                }
            });
        }
        let ledger = ledger(1_000.0, 0.0, 0.0);

        let decision = risk.check(
            &intent(0, "AAPL", Action::Buy, 10.0, 1),
            &single_price("AAPL", 10.0),
            &ledger,
        );

        assert_eq!(*calls.borrow(), vec!["first", "second"]);
        assert!(matches!(
            decision,
            RiskDecision::Rejected(RiskRejection::Custom { ref rule, .. }) if rule == "second"
        ));

        // A built-in failure short-circuits before any custom rule.
        calls.borrow_mut().clear();
        let decision = risk.check(
            &intent(0, "AAPL", Action::Buy, 10.0, 500),
            &single_price("AAPL", 10.0),
            &ledger,
        );
        assert!(!decision.is_accepted());
        assert!(calls.borrow().is_empty());
    }
}

mod analyzer {
    use super::*;

    fn snapshot(offset: i64, value: f64) -> Snapshot {
        Snapshot {
            timestamp: day(offset),
            cash: value,
            positions: BTreeMap::new(),
            total_value: value,
            unpriced: Vec::new(),
        }
    }

    #[test]
    fn drawdown_from_equity_series() {
        let log = vec![snapshot(1, 110_000.0), snapshot(2, 99_000.0)];
        let index = vec![day(0), day(1), day(2)];

        let report =
            PerformanceReport::from_trade_log(&log, 100_000.0, Some(&index), &AnalyzerConfig::default());

        let equity: Vec<f64> = report.equity_curve.iter().map(|p| p.equity).collect();
        assert_eq!(equity, vec![100_000.0, 110_000.0, 99_000.0]);
        assert_relative_eq!(report.max_drawdown, -0.1, epsilon = 1e-12);
        assert_relative_eq!(report.total_return, -0.01, epsilon = 1e-12);
        assert_relative_eq!(report.period_returns[0].value, 0.1, epsilon = 1e-12);
        assert_relative_eq!(report.cumulative_returns[1].value, -0.01, epsilon = 1e-12);
    }
}

mod universe_runs {
    use super::*;

    fn config_for(dir: &std::path::Path, symbols: &str) -> qtbacktest::domain::backtest::BacktestConfig {
        let ini = format!(
            "[backtest]\nsymbols = {symbols}\nstart_date = 2024-01-01\nend_date = 2024-12-31\nprovider = csv\ninitial_cash = 10000\n\n[data]\ndirectory = {}\n\n[risk]\nmax_drawdown = 0.5\n\n[strategy]\nname = dual_ma\nshort_window = 2\nlong_window = 3\ntrade_size = 5\n",
            dir.display()
        );
        let adapter = FileConfigAdapter::from_string(&ini).unwrap();
        build_backtest_config(&adapter).unwrap()
    }

    #[test]
    fn csv_universe_runs_each_symbol_independently() {
        let dir = tempfile::TempDir::new().unwrap();
        write_csv(dir.path(), "AAPL", &CROSSING_CLOSES);
        write_csv(dir.path(), "MSFT", &[5.0, 5.0, 5.0]);
        let config = config_for(dir.path(), "AAPL,MSFT,GHOST");
        let port = cli::open_data_port(&config).unwrap();
        let (sink, shared) = recording();

        let results = cli::run_universe(&config, port.as_ref(), |_| shared.clone()).unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].symbol, "AAPL");
        assert_eq!(results[0].summary.total_trades, 2);
        assert_relative_eq!(results[0].summary.cash, 9_970.0);
        assert_eq!(results[1].symbol, "MSFT");
        assert_eq!(results[1].summary.total_trades, 0);
        assert_relative_eq!(results[1].summary.cash, 10_000.0);
        assert!(sink.contains("skipping GHOST"));
    }

    #[test]
    fn mock_port_with_no_data_fails() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = config_for(dir.path(), "AAPL");
        let port = MockDataPort::new().with_bars("MSFT", bars_from_closes("MSFT", &[1.0]));
        let (_sink, shared) = recording();

        let err = cli::run_universe(&config, &port, |_| shared.clone()).unwrap_err();
        assert!(matches!(err, SimError::EmptyBarStream { .. }));
    }

    #[test]
    fn mock_port_respects_date_window() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut config = config_for(dir.path(), "AAPL");
        config.end_date = date(2024, 1, 4);
        let port = MockDataPort::new().with_bars("AAPL", bars_from_closes("AAPL", &CROSSING_CLOSES));
        let (_sink, shared) = recording();

        let results = cli::run_universe(&config, &port, |_| shared.clone()).unwrap();
        assert_eq!(results[0].bars_processed, 4);
        assert_eq!(results[0].intents_emitted, 0);
    }
}
