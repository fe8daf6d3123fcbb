//! Configuration module for the signal execution pipeline
//!
//! Handles configuration loading from TOML files and environment,
//! and provides the structured configuration types.

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

/// Main pipeline configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Worker pool configuration
    #[serde(default)]
    pub workers: WorkerConfig,

    /// Risk and health limits
    #[serde(default)]
    pub limits: LimitsConfig,

    /// Pre-signed transaction cache
    #[serde(default)]
    pub presign: PresignConfig,

    /// Telemetry sizing
    #[serde(default)]
    pub telemetry: TelemetryConfig,

    /// Background feeder configuration
    #[serde(default)]
    pub feeds: FeedsConfig,

    /// Safety gate configuration
    #[serde(default)]
    pub safety: SafetyConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Number of execution workers (0 = one per available core)
    #[serde(default)]
    pub count: usize,

    /// Sleep between pause/kill-switch polls in the worker loop
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsConfig {
    /// Maximum admitted position size in USD (inclusive boundary)
    #[serde(default = "default_max_position_usd")]
    pub max_position_usd: f64,

    /// Success-rate floor below which `health_check` reports unhealthy
    #[serde(default = "default_health_success_floor")]
    pub health_success_floor: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresignConfig {
    /// Pool size `refresh` refills towards, per (token, direction)
    #[serde(default = "default_presign_quantity")]
    pub target_quantity: usize,

    /// Payloads older than this are dropped on `refresh`
    #[serde(default = "default_presign_ttl")]
    pub ttl_secs: u64,

    /// Pools at or below this level are refilled on `refresh`
    #[serde(default = "default_presign_watermark")]
    pub low_watermark: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Capacity of the recent-results ring buffer
    #[serde(default = "default_recent_capacity")]
    pub recent_capacity: usize,

    /// Results evicted per overflow (0 = capacity / 10)
    #[serde(default)]
    pub eviction_block: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedsConfig {
    /// Run the synthetic signal sources (off when real feeds are wired in)
    #[serde(default = "default_true")]
    pub enable_synthetic_signals: bool,

    /// Run the congestion monitor that samples network conditions
    #[serde(default = "default_true")]
    pub enable_congestion_monitor: bool,

    /// Signal source poll cycle in milliseconds
    #[serde(default = "default_signal_interval_ms")]
    pub signal_interval_ms: u64,

    /// Congestion/fee monitor cycle in milliseconds
    #[serde(default = "default_congestion_interval_ms")]
    pub congestion_interval_ms: u64,

    /// Network base fee the congestion multiplier is applied to
    #[serde(default = "default_base_fee")]
    pub base_fee: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SafetyConfig {
    /// Reject tokens with no cached safety verdict instead of admitting them
    #[serde(default)]
    pub strict_unknown_assets: bool,

    /// Congestion level above which MEV protection is considered engaged
    #[serde(default = "default_mev_congestion_threshold")]
    pub mev_congestion_threshold: f64,

    /// Tokens whose safety verdict and routes are warmed at construction
    #[serde(default = "default_warm_tokens")]
    pub warm_tokens: Vec<String>,
}

// Default value functions
fn default_poll_interval_ms() -> u64 { 10 }
fn default_max_position_usd() -> f64 { 100_000.0 }
fn default_health_success_floor() -> f64 { 0.5 }
fn default_presign_quantity() -> usize { 10 }
fn default_presign_ttl() -> u64 { 30 }
fn default_presign_watermark() -> usize { 2 }
fn default_recent_capacity() -> usize { 1000 }
fn default_signal_interval_ms() -> u64 { 100 }
fn default_congestion_interval_ms() -> u64 { 1000 }
fn default_base_fee() -> f64 { 0.000001 }
fn default_mev_congestion_threshold() -> f64 { 0.7 }
fn default_true() -> bool { true }

fn default_warm_tokens() -> Vec<String> {
    vec![
        "So11111111111111111111111111111111111111112".to_string(), // SOL
        "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v".to_string(), // USDC
        "Es9vMFrzaCERmJfrF4H2FYD4KCoNkY11McCe8BenwNYB".to_string(), // USDT
    ]
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            count: 0,
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_position_usd: default_max_position_usd(),
            health_success_floor: default_health_success_floor(),
        }
    }
}

impl Default for PresignConfig {
    fn default() -> Self {
        Self {
            target_quantity: default_presign_quantity(),
            ttl_secs: default_presign_ttl(),
            low_watermark: default_presign_watermark(),
        }
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            recent_capacity: default_recent_capacity(),
            eviction_block: 0,
        }
    }
}

impl Default for FeedsConfig {
    fn default() -> Self {
        Self {
            enable_synthetic_signals: default_true(),
            enable_congestion_monitor: default_true(),
            signal_interval_ms: default_signal_interval_ms(),
            congestion_interval_ms: default_congestion_interval_ms(),
            base_fee: default_base_fee(),
        }
    }
}

impl Default for SafetyConfig {
    fn default() -> Self {
        Self {
            strict_unknown_assets: false,
            mev_congestion_threshold: default_mev_congestion_threshold(),
            warm_tokens: default_warm_tokens(),
        }
    }
}

impl PipelineConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: PipelineConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration with environment variables from `.env` applied first
    pub fn from_file_with_env(path: &str) -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_file(path)
    }

    /// Reject configurations the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.workers.poll_interval_ms == 0 {
            bail!("workers.poll_interval_ms must be positive");
        }
        if self.limits.max_position_usd <= 0.0 {
            bail!("limits.max_position_usd must be positive");
        }
        if !(0.0..=1.0).contains(&self.limits.health_success_floor) {
            bail!("limits.health_success_floor must be within [0.0, 1.0]");
        }
        if self.presign.target_quantity == 0 {
            bail!("presign.target_quantity must be at least 1");
        }
        if self.presign.low_watermark > self.presign.target_quantity {
            bail!("presign.low_watermark cannot exceed presign.target_quantity");
        }
        if self.telemetry.recent_capacity == 0 {
            bail!("telemetry.recent_capacity must be at least 1");
        }
        if self.telemetry.eviction_block > self.telemetry.recent_capacity {
            bail!("telemetry.eviction_block cannot exceed telemetry.recent_capacity");
        }
        if self.feeds.signal_interval_ms == 0 || self.feeds.congestion_interval_ms == 0 {
            bail!("feed intervals must be positive");
        }
        if self.feeds.base_fee <= 0.0 {
            bail!("feeds.base_fee must be positive");
        }
        if !(0.0..=1.0).contains(&self.safety.mev_congestion_threshold) {
            bail!("safety.mev_congestion_threshold must be within [0.0, 1.0]");
        }
        Ok(())
    }

    /// Worker count with the `0 = auto` default resolved.
    pub fn worker_count(&self) -> usize {
        if self.workers.count > 0 {
            self.workers.count
        } else {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4)
        }
    }

    /// Eviction block with the `0 = capacity / 10` default resolved.
    pub fn eviction_block(&self) -> usize {
        if self.telemetry.eviction_block > 0 {
            self.telemetry.eviction_block
        } else {
            (self.telemetry.recent_capacity / 10).max(1)
        }
    }
}
