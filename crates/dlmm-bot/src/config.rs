//! Application configuration.
//!
//! Read from a TOML file, with `DLMM_`-prefixed environment variables layered
//! on top (`DLMM_MONITOR__INTERVAL_SECS=10` overrides `monitor.interval_secs`).

use std::path::Path;
use std::time::Duration;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use dlmm_core::{
    AssetId, PoolHandle, StrategyKind, StrategyParams, SwaplessConfig, TokenRatio, UsdValue,
    MAX_TOKEN_DECIMALS,
};
use dlmm_position::ExitConfig;

use crate::error::{AppError, AppResult};

/// Environment variable prefix for overrides.
pub const ENV_PREFIX: &str = "DLMM";

/// Operating mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperatingMode {
    /// In-process simulated venue.
    #[default]
    Paper,
}

/// Where [`AppConfig::load`] took its base values from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSource {
    File,
    /// The file was missing; defaults plus environment were used.
    Defaults,
}

/// Control loop settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Pause between ticks (seconds). Default: 5.
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    /// Consecutive failed ticks before giving up. 0 disables. Default: 0.
    #[serde(default)]
    pub max_consecutive_failures: u32,
    /// Buffered status records per subscriber. Default: 64.
    #[serde(default = "default_status_channel_capacity")]
    pub status_channel_capacity: usize,
}

fn default_interval_secs() -> u64 {
    5
}

fn default_status_channel_capacity() -> usize {
    64
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            max_consecutive_failures: 0,
            status_channel_capacity: default_status_channel_capacity(),
        }
    }
}

/// Take-profit / stop-loss rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExitRulesConfig {
    #[serde(default = "default_true")]
    pub take_profit_enabled: bool,
    /// Percent gain that closes the position. Default: 15.
    #[serde(default = "default_take_profit_percent")]
    pub take_profit_percent: Decimal,
    #[serde(default = "default_true")]
    pub stop_loss_enabled: bool,
    /// Percent loss that closes the position. Default: 10.
    #[serde(default = "default_stop_loss_percent")]
    pub stop_loss_percent: Decimal,
}

fn default_true() -> bool {
    true
}

fn default_take_profit_percent() -> Decimal {
    Decimal::from(15)
}

fn default_stop_loss_percent() -> Decimal {
    Decimal::from(10)
}

impl Default for ExitRulesConfig {
    fn default() -> Self {
        Self {
            take_profit_enabled: true,
            take_profit_percent: default_take_profit_percent(),
            stop_loss_enabled: true,
            stop_loss_percent: default_stop_loss_percent(),
        }
    }
}

/// Position sizing and shape, reused for every rebalance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyConfig {
    /// Capital in token X units. Default: 1.
    #[serde(default = "default_capital_amount")]
    pub capital_amount: Decimal,
    /// Share of capital held as token X. Default: 0.5.
    #[serde(default = "default_ratio_x")]
    pub ratio_x: Decimal,
    /// Bins per position. Default: 40.
    #[serde(default = "default_bin_span")]
    pub bin_span: u32,
    #[serde(default = "default_pool_address")]
    pub pool_address: String,
    #[serde(default)]
    pub kind: StrategyKind,
    #[serde(default)]
    pub auto_compound: bool,
    #[serde(default)]
    pub swapless: SwaplessConfig,
}

fn default_capital_amount() -> Decimal {
    Decimal::ONE
}

fn default_ratio_x() -> Decimal {
    Decimal::new(5, 1)
}

fn default_bin_span() -> u32 {
    40
}

fn default_pool_address() -> String {
    "paper-sol-usdc".to_string()
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            capital_amount: default_capital_amount(),
            ratio_x: default_ratio_x(),
            bin_span: default_bin_span(),
            pool_address: default_pool_address(),
            kind: StrategyKind::default(),
            auto_compound: false,
            swapless: SwaplessConfig::default(),
        }
    }
}

/// Position overrides.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PositionConfig {
    /// Baseline for P&L. Defaults to the valuation when monitoring starts.
    #[serde(default)]
    pub initial_capital_usd: Option<Decimal>,
}

/// Simulated market used in paper mode.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaperConfig {
    #[serde(default = "default_token_x_mint")]
    pub token_x_mint: String,
    #[serde(default = "default_token_y_mint")]
    pub token_y_mint: String,
    #[serde(default = "default_token_x_decimals")]
    pub token_x_decimals: u8,
    #[serde(default = "default_token_y_decimals")]
    pub token_y_decimals: u8,
    /// USD price of token X at bin 0. Default: 150.
    #[serde(default = "default_price_x_usd")]
    pub price_x_usd: Decimal,
    /// USD price of token Y. Default: 1.
    #[serde(default = "default_price_y_usd")]
    pub price_y_usd: Decimal,
    /// Relative price step between adjacent bins (bps). Default: 10.
    #[serde(default = "default_bin_step_bps")]
    pub bin_step_bps: u32,
    /// Bins the market moves per step. Default: 2.
    #[serde(default = "default_drift_bins_per_step")]
    pub drift_bins_per_step: u32,
    /// Furthest the market drifts from bin 0 before turning. Default: 30.
    #[serde(default = "default_swing_bins")]
    pub swing_bins: u32,
    /// Market step length (seconds). Default: 5.
    #[serde(default = "default_step_secs")]
    pub step_secs: u64,
    /// Fees accrued per step, in bps of the position's holdings. Default: 2.
    #[serde(default = "default_fee_bps_per_step")]
    pub fee_bps_per_step: Decimal,
}

fn default_token_x_mint() -> String {
    "So11111111111111111111111111111111111111112".to_string()
}

fn default_token_y_mint() -> String {
    "EPjFWdd5AufqoSwSJK7DD6CM9pqmw4KumWCFi4LYpLu".to_string()
}

fn default_token_x_decimals() -> u8 {
    9
}

fn default_token_y_decimals() -> u8 {
    6
}

fn default_price_x_usd() -> Decimal {
    Decimal::from(150)
}

fn default_price_y_usd() -> Decimal {
    Decimal::ONE
}

fn default_bin_step_bps() -> u32 {
    10
}

fn default_drift_bins_per_step() -> u32 {
    2
}

fn default_swing_bins() -> u32 {
    30
}

fn default_step_secs() -> u64 {
    5
}

fn default_fee_bps_per_step() -> Decimal {
    Decimal::from(2)
}

impl Default for PaperConfig {
    fn default() -> Self {
        Self {
            token_x_mint: default_token_x_mint(),
            token_y_mint: default_token_y_mint(),
            token_x_decimals: default_token_x_decimals(),
            token_y_decimals: default_token_y_decimals(),
            price_x_usd: default_price_x_usd(),
            price_y_usd: default_price_y_usd(),
            bin_step_bps: default_bin_step_bps(),
            drift_bins_per_step: default_drift_bins_per_step(),
            swing_bins: default_swing_bins(),
            step_secs: default_step_secs(),
            fee_bps_per_step: default_fee_bps_per_step(),
        }
    }
}

impl PaperConfig {
    pub fn token_x(&self) -> AssetId {
        AssetId::new(self.token_x_mint.clone())
    }

    pub fn token_y(&self) -> AssetId {
        AssetId::new(self.token_y_mint.clone())
    }
}

/// Telemetry configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Log filter used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Print each status record as a table row on stdout.
    #[serde(default = "default_true")]
    pub status_table: bool,
}

fn default_log_level() -> String {
    dlmm_telemetry::DEFAULT_FILTER.to_string()
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            status_table: true,
        }
    }
}

/// Main application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub mode: OperatingMode,
    #[serde(default)]
    pub monitor: MonitorConfig,
    #[serde(default)]
    pub exit: ExitRulesConfig,
    #[serde(default)]
    pub strategy: StrategyConfig,
    #[serde(default)]
    pub position: PositionConfig,
    #[serde(default)]
    pub paper: PaperConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

impl AppConfig {
    /// Load `path` with environment overrides applied.
    ///
    /// A missing file is not an error: defaults plus environment are used and
    /// reported as [`ConfigSource::Defaults`]. Nothing is logged here, since
    /// loading usually precedes logging setup.
    pub fn load(path: &str) -> AppResult<(Self, ConfigSource)> {
        let source = if Path::new(path).exists() {
            ConfigSource::File
        } else {
            ConfigSource::Defaults
        };

        let config: Self = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok((config, source))
    }

    /// Load from a specific file, without environment overrides.
    pub fn from_file(path: &str) -> AppResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse and validate TOML text.
    pub fn from_toml(content: &str) -> AppResult<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| AppError::Config(format!("Failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the monitor cannot run with.
    pub fn validate(&self) -> AppResult<()> {
        if self.monitor.interval_secs == 0 {
            return Err(AppError::Config("monitor.interval_secs must be > 0".to_string()));
        }
        if self.monitor.status_channel_capacity == 0 {
            return Err(AppError::Config(
                "monitor.status_channel_capacity must be > 0".to_string(),
            ));
        }
        if self.exit.take_profit_percent < Decimal::ZERO
            || self.exit.stop_loss_percent < Decimal::ZERO
        {
            return Err(AppError::Config(
                "exit thresholds must not be negative".to_string(),
            ));
        }
        if let Some(initial) = self.position.initial_capital_usd {
            if initial < Decimal::ZERO {
                return Err(AppError::Config(
                    "position.initial_capital_usd must not be negative".to_string(),
                ));
            }
        }
        self.exit_config()?.validate()?;
        self.validate_paper()
    }

    fn validate_paper(&self) -> AppResult<()> {
        let p = &self.paper;
        if p.token_x_decimals > MAX_TOKEN_DECIMALS || p.token_y_decimals > MAX_TOKEN_DECIMALS {
            return Err(AppError::Config(format!(
                "paper token decimals must be <= {MAX_TOKEN_DECIMALS}"
            )));
        }
        if p.token_x_mint == p.token_y_mint {
            return Err(AppError::Config(
                "paper token mints must differ".to_string(),
            ));
        }
        if p.price_x_usd <= Decimal::ZERO || p.price_y_usd <= Decimal::ZERO {
            return Err(AppError::Config("paper prices must be positive".to_string()));
        }
        if p.bin_step_bps == 0 || p.step_secs == 0 {
            return Err(AppError::Config(
                "paper.bin_step_bps and paper.step_secs must be > 0".to_string(),
            ));
        }
        if p.fee_bps_per_step < Decimal::ZERO {
            return Err(AppError::Config(
                "paper.fee_bps_per_step must not be negative".to_string(),
            ));
        }
        Ok(())
    }

    /// Strategy parameters for the run.
    pub fn strategy_params(&self) -> AppResult<StrategyParams> {
        let s = &self.strategy;
        Ok(StrategyParams {
            capital_amount: s.capital_amount,
            token_ratio: TokenRatio::new(s.ratio_x)?,
            bin_span: s.bin_span,
            pool_address: PoolHandle::new(s.pool_address.clone()),
            kind: s.kind,
            swapless: s.swapless,
            auto_compound: s.auto_compound,
        })
    }

    /// Exit rules for the run.
    pub fn exit_config(&self) -> AppResult<ExitConfig> {
        Ok(ExitConfig {
            take_profit_enabled: self.exit.take_profit_enabled,
            take_profit_percent: self.exit.take_profit_percent,
            stop_loss_enabled: self.exit.stop_loss_enabled,
            stop_loss_percent: self.exit.stop_loss_percent,
            strategy: self.strategy_params()?,
        })
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.monitor.interval_secs)
    }

    pub fn initial_capital_usd(&self) -> Option<UsdValue> {
        self.position.initial_capital_usd.map(UsdValue::new)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.mode, OperatingMode::Paper);
        assert_eq!(config.monitor.interval_secs, 5);
        assert_eq!(config.monitor.max_consecutive_failures, 0);
        assert_eq!(config.exit.take_profit_percent, dec!(15));
        assert_eq!(config.exit.stop_loss_percent, dec!(10));
        assert_eq!(config.strategy.bin_span, 40);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = AppConfig::from_toml(
            r#"
            [monitor]
            interval_secs = 10

            [exit]
            take_profit_percent = 20
            stop_loss_enabled = false

            [strategy]
            ratio_x = 0.25
            kind = "bidask"
            "#,
        )
        .unwrap();

        assert_eq!(config.monitor.interval_secs, 10);
        assert_eq!(config.monitor.status_channel_capacity, 64);
        assert_eq!(config.exit.take_profit_percent, dec!(20));
        assert!(!config.exit.stop_loss_enabled);
        assert_eq!(config.strategy.kind, StrategyKind::BidAsk);

        let exit = config.exit_config().unwrap();
        assert_eq!(exit.strategy.token_ratio.ratio_x(), dec!(0.25));
        assert_eq!(exit.strategy.bins_below(), 10);
        assert_eq!(exit.stop_loss_label(), "SL:OFF");
    }

    #[test]
    fn test_rejects_zero_interval() {
        let err = AppConfig::from_toml("[monitor]\ninterval_secs = 0\n").unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[test]
    fn test_rejects_ratio_out_of_range() {
        assert!(AppConfig::from_toml("[strategy]\nratio_x = 1.5\n").is_err());
        assert!(AppConfig::from_toml("[strategy]\nratio_x = -0.1\n").is_err());
    }

    #[test]
    fn test_rejects_zero_bin_span() {
        assert!(AppConfig::from_toml("[strategy]\nbin_span = 0\n").is_err());
    }

    #[test]
    fn test_rejects_negative_thresholds() {
        assert!(AppConfig::from_toml("[exit]\nstop_loss_percent = -5\n").is_err());
        assert!(AppConfig::from_toml("[position]\ninitial_capital_usd = -1\n").is_err());
    }

    #[test]
    fn test_initial_capital_override() {
        let config = AppConfig::from_toml("[position]\ninitial_capital_usd = 1000\n").unwrap();
        assert_eq!(config.initial_capital_usd(), Some(UsdValue::new(dec!(1000))));
        assert_eq!(AppConfig::default().initial_capital_usd(), None);
    }

    #[test]
    fn test_config_serialization() {
        let config = AppConfig::default();
        let toml_str = toml::to_string(&config).unwrap();
        assert!(toml_str.contains("interval_secs"));
        assert!(toml_str.contains("take_profit_percent"));
        let back = AppConfig::from_toml(&toml_str).unwrap();
        assert_eq!(back.strategy.pool_address, config.strategy.pool_address);
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let (config, source) = AppConfig::load("does/not/exist.toml").unwrap();
        assert_eq!(source, ConfigSource::Defaults);
        assert_eq!(config.strategy.bin_span, 40);
    }

    #[test]
    fn test_load_reports_file_source() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/../../config/default.toml");
        let (config, source) = AppConfig::load(path).unwrap();
        assert_eq!(source, ConfigSource::File);
        assert_eq!(config.paper.swing_bins, 30);
    }

    #[test]
    fn test_from_file() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/../../config/default.toml");
        let config = AppConfig::from_file(path).unwrap();
        assert_eq!(config.paper.bin_step_bps, 10);

        let err = AppConfig::from_file("does/not/exist.toml").unwrap_err();
        assert!(matches!(err, AppError::Io(_)));
    }
}
