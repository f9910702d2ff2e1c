//! End-to-end runs against the simulated venue.

use rust_decimal_macros::dec;
use tokio_test::{assert_err, assert_ok};

use dlmm_bot::{AppConfig, Application};
use dlmm_position::{ExitTrigger, TerminationReason};

fn paper_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.telemetry.status_table = false;
    config.exit.take_profit_percent = dec!(0.5);
    config.exit.stop_loss_percent = dec!(0.5);
    config
}

#[tokio::test(start_paused = true)]
async fn test_paper_run_ends_on_take_profit() {
    // The simulated price drifts up first, so the upside rule fires.
    let app = assert_ok!(Application::new(paper_config()));
    let summary = assert_ok!(app.run().await);

    assert_eq!(
        summary.reason,
        TerminationReason::ExitTriggered {
            trigger: ExitTrigger::TakeProfit,
            closed: true
        }
    );
    assert!(summary.ticks >= 1);
    assert!(summary.pnl_percent.unwrap() >= dec!(0.5));
    assert_eq!(summary.rebalance_count, 0);
}

#[test]
fn test_invalid_config_rejected() {
    let mut config = AppConfig::default();
    config.monitor.interval_secs = 0;
    assert_err!(Application::new(config));
}

#[test]
fn test_default_config_file_parses() {
    let content = include_str!("../../../config/default.toml");
    let config = AppConfig::from_toml(content).unwrap();
    assert_eq!(config.strategy.bin_span, 40);
    assert!(config.exit.take_profit_enabled);
    assert_eq!(config.exit.stop_loss_percent, dec!(10));
}
