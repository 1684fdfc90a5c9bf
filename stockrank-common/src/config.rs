//! Configuration management for the stockrank service.
//!
//! The service reads one JSON file, `~/.stockrank/config.json` by default.
//! Everything in it is static: it is loaded once at process start and never
//! mutated afterwards.
//!
//! # Configuration Priority
//!
//! 1. Environment variables (STOCKRANK_* prefix, plus `PORT`)
//! 2. Explicit config file values
//! 3. Default values
//!
//! # Environment Variable Mapping
//!
//! - `STOCKRANK_CONFIG` → path of the config file
//! - `STOCKRANK_BIND_ADDRESS` → network.bind
//! - `STOCKRANK_PORT` → network.port (`PORT` is honoured as a fallback)
//! - `STOCKRANK_LOG_LEVEL` → observability.log_level
//! - `STOCKRANK_LOG_FORMAT` → observability.log_format
//! - `STOCKRANK_CACHE_TTL_SECS` → ranking.cache_ttl_secs

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Get the configuration directory path.
pub fn config_dir() -> PathBuf {
    directories::UserDirs::new().map_or_else(
        || PathBuf::from(".stockrank"),
        |dirs| dirs.home_dir().join(".stockrank"),
    )
}

/// Get the configuration file path.
///
/// `STOCKRANK_CONFIG` takes precedence over the default location.
pub fn config_path() -> PathBuf {
    std::env::var("STOCKRANK_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| config_dir().join("config.json"))
}

// ============================================================================
// Root Configuration
// ============================================================================

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// HTTP bind address and port
    #[serde(default)]
    pub network: NetworkConfig,

    /// Logging configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,

    /// Upstream market data provider
    #[serde(default)]
    pub provider: ProviderConfig,

    /// Universe, scoring and caching policy
    #[serde(default)]
    pub ranking: RankingConfig,
}

impl Config {
    /// Load configuration from the default path.
    pub fn load() -> Result<Self> {
        let path = config_path();
        if !path.exists() {
            tracing::info!(path = %path.display(), "Config file not found, using defaults");
            return Ok(Self::default());
        }

        Self::load_from(&path)
    }

    /// Load configuration from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;

        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config from {}", path.display()))
    }

    /// Load configuration with environment variable overrides applied.
    pub fn load_with_env() -> Result<Self> {
        let mut config = Self::load()?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides to the configuration.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary key lookup.
    ///
    /// Values that fail to parse are ignored and the file value is kept.
    pub fn apply_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(bind) = lookup("STOCKRANK_BIND_ADDRESS") {
            self.network.bind = bind;
        }

        let port = lookup("STOCKRANK_PORT").or_else(|| lookup("PORT"));
        if let Some(p) = port.and_then(|p| p.parse().ok()) {
            self.network.port = p;
        }

        if let Some(level) = lookup("STOCKRANK_LOG_LEVEL") {
            self.observability.log_level = level;
        }

        if let Some(format) = lookup("STOCKRANK_LOG_FORMAT") {
            self.observability.log_format = format;
        }

        if let Some(ttl) = lookup("STOCKRANK_CACHE_TTL_SECS").and_then(|t| t.parse().ok()) {
            self.ranking.cache_ttl_secs = ttl;
        }
    }

    /// Get the `host:port` string the HTTP server binds to.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.network.bind, self.network.port)
    }
}

// ============================================================================
// Network Configuration
// ============================================================================

/// HTTP listener configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Bind address. Default: "0.0.0.0" (all interfaces).
    /// Set to "127.0.0.1" for local only.
    #[serde(default = "default_bind_address")]
    pub bind: String,

    /// HTTP port
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            bind: default_bind_address(),
            port: default_port(),
        }
    }
}

fn default_bind_address() -> String {
    "0.0.0.0".into()
}

fn default_port() -> u16 {
    5000
}

// ============================================================================
// Observability Configuration
// ============================================================================

/// Observability configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level", alias = "level")]
    pub log_level: String,

    /// Log format (json, pretty)
    #[serde(default = "default_log_format", alias = "format")]
    pub log_format: String,

    /// Additional module targets to force to `warn`.
    #[serde(default)]
    pub excluded_targets: Vec<String>,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: default_log_format(),
            excluded_targets: Vec::new(),
        }
    }
}

fn default_log_level() -> String {
    "info".into()
}

fn default_log_format() -> String {
    "pretty".into()
}

// ============================================================================
// Provider Configuration
// ============================================================================

/// Upstream fundamentals provider (Yahoo Finance quoteSummary).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// API base URL
    #[serde(default = "default_provider_base_url")]
    pub base_url: String,

    /// URL visited once to obtain session cookies
    #[serde(default = "default_session_url")]
    pub session_url: String,

    /// User agent sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// HTTP client timeout in seconds
    #[serde(default = "default_provider_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: default_provider_base_url(),
            session_url: default_session_url(),
            user_agent: default_user_agent(),
            timeout_secs: default_provider_timeout_secs(),
        }
    }
}

fn default_provider_base_url() -> String {
    "https://query2.finance.yahoo.com".into()
}

fn default_session_url() -> String {
    "https://fc.yahoo.com".into()
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36"
        .into()
}

fn default_provider_timeout_secs() -> u64 {
    15
}

// ============================================================================
// Ranking Configuration
// ============================================================================

/// Universe, scoring, normalization and caching policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankingConfig {
    /// Symbols ranked on every request
    #[serde(default = "default_universe")]
    pub universe: Vec<String>,

    /// Symbol suffixes classified as domestic (case-insensitive)
    #[serde(default = "default_domestic_suffixes")]
    pub domestic_suffixes: Vec<String>,

    /// Lifetime of a cached metrics snapshot, in seconds
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,

    /// Output score range
    #[serde(default)]
    pub score_range: ScoreRange,

    /// Raw score weights
    #[serde(default)]
    pub weights: ScoreWeights,

    /// Cross-sectional normalization method
    #[serde(default)]
    pub normalization: NormalizationMethod,

    /// Symmetric jitter amplitude applied after normalization (disabled when `None`)
    #[serde(default)]
    pub jitter: Option<f64>,

    /// Seed for the jitter / discount randomness (entropy-seeded when `None`)
    #[serde(default)]
    pub jitter_seed: Option<u64>,

    /// Recommended buy price policy
    #[serde(default)]
    pub buy_price: BuyPricePolicy,

    /// Per-symbol fetch timeout in milliseconds
    #[serde(default = "default_fetch_timeout_ms")]
    pub fetch_timeout_ms: u64,

    /// Whole-batch timeout in seconds
    #[serde(default = "default_batch_timeout_secs")]
    pub batch_timeout_secs: u64,

    /// Maximum number of in-flight upstream lookups
    #[serde(default = "default_max_concurrent_fetches")]
    pub max_concurrent_fetches: usize,
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            universe: default_universe(),
            domestic_suffixes: default_domestic_suffixes(),
            cache_ttl_secs: default_cache_ttl_secs(),
            score_range: ScoreRange::default(),
            weights: ScoreWeights::default(),
            normalization: NormalizationMethod::default(),
            jitter: None,
            jitter_seed: None,
            buy_price: BuyPricePolicy::default(),
            fetch_timeout_ms: default_fetch_timeout_ms(),
            batch_timeout_secs: default_batch_timeout_secs(),
            max_concurrent_fetches: default_max_concurrent_fetches(),
        }
    }
}

impl RankingConfig {
    /// Cache entry lifetime.
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    /// Per-symbol fetch timeout.
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }

    /// Whole-batch timeout.
    pub fn batch_timeout(&self) -> Duration {
        Duration::from_secs(self.batch_timeout_secs)
    }
}

/// 50 NSE-listed and 50 US-listed equities.
pub const DEFAULT_DOMESTIC_UNIVERSE: &[&str] = &[
    "RELIANCE.NS", "TCS.NS", "INFY.NS", "HDFCBANK.NS", "ICICIBANK.NS",
    "KOTAKBANK.NS", "HINDUNILVR.NS", "LT.NS", "BAJFINANCE.NS", "ITC.NS",
    "ASIANPAINT.NS", "SUNPHARMA.NS", "HCLTECH.NS", "WIPRO.NS", "MARUTI.NS",
    "ULTRACEMCO.NS", "ONGC.NS", "NTPC.NS", "POWERGRID.NS", "BHARTIARTL.NS",
    "SBIN.NS", "GRASIM.NS", "TITAN.NS", "HINDALCO.NS", "JSWSTEEL.NS",
    "COALINDIA.NS", "BPCL.NS", "INDUSINDBK.NS", "ADANIENT.NS", "ADANIPORTS.NS",
    "DRREDDY.NS", "CIPLA.NS", "APOLLOHOSP.NS", "BRITANNIA.NS", "TATAMOTORS.NS",
    "M&M.NS", "EICHERMOT.NS", "HEROMOTOCO.NS", "BAJAJ-AUTO.NS", "SHREECEM.NS",
    "DIVISLAB.NS", "UPL.NS", "TECHM.NS", "ZOMATO.NS", "DLF.NS",
    "GAIL.NS", "PNB.NS", "BANKBARODA.NS", "BHEL.NS", "IRCTC.NS",
];

/// US half of the default universe.
pub const DEFAULT_FOREIGN_UNIVERSE: &[&str] = &[
    "AAPL", "MSFT", "GOOGL", "AMZN", "TSLA",
    "META", "NVDA", "NFLX", "BRK-B", "JPM",
    "V", "MA", "PYPL", "DIS", "ADBE",
    "INTC", "CSCO", "PEP", "KO", "XOM",
    "WMT", "PFE", "NKE", "MCD", "IBM",
    "CRM", "ABNB", "SQ", "TWTR", "UBER",
    "LYFT", "ORCL", "AMD", "BA", "GE",
    "F", "GM", "LMT", "BABA", "JD",
    "SHOP", "SNAP", "ZM", "DOCU", "ROKU",
    "SPOT", "PLTR", "HOOD", "BYND", "PTON",
];

fn default_universe() -> Vec<String> {
    DEFAULT_DOMESTIC_UNIVERSE
        .iter()
        .chain(DEFAULT_FOREIGN_UNIVERSE)
        .map(|s| s.to_string())
        .collect()
}

fn default_domestic_suffixes() -> Vec<String> {
    vec![".NS".into(), ".BO".into()]
}

fn default_cache_ttl_secs() -> u64 {
    300
}

fn default_fetch_timeout_ms() -> u64 {
    10_000
}

fn default_batch_timeout_secs() -> u64 {
    60
}

fn default_max_concurrent_fetches() -> usize {
    16
}

/// Closed output interval `[low, high]` for normalized scores.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreRange {
    pub low: f64,
    pub high: f64,
}

impl Default for ScoreRange {
    fn default() -> Self {
        Self {
            low: 1.0,
            high: 10.0,
        }
    }
}

impl ScoreRange {
    pub fn new(low: f64, high: f64) -> Self {
        Self { low, high }
    }

    /// `high - low`
    pub fn span(&self) -> f64 {
        self.high - self.low
    }

    /// `(low + high) / 2`
    pub fn midpoint(&self) -> f64 {
        (self.low + self.high) / 2.0
    }

    /// Clip a value into the range.
    pub fn clip(&self, value: f64) -> f64 {
        value.clamp(self.low, self.high)
    }
}

/// Weight magnitudes of the composite raw score.
///
/// Signs are fixed by the formula: ROE, ROCE proxy and book value add,
/// P/E and debt/equity subtract.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreWeights {
    #[serde(default = "default_weight_roe")]
    pub return_on_equity: f64,
    #[serde(default = "default_weight_roce")]
    pub return_on_assets: f64,
    #[serde(default = "default_weight_pe")]
    pub price_to_earnings: f64,
    #[serde(default = "default_weight_de")]
    pub debt_to_equity: f64,
    #[serde(default = "default_weight_bv")]
    pub book_value: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            return_on_equity: default_weight_roe(),
            return_on_assets: default_weight_roce(),
            price_to_earnings: default_weight_pe(),
            debt_to_equity: default_weight_de(),
            book_value: default_weight_bv(),
        }
    }
}

impl ScoreWeights {
    /// All five weights in formula order.
    pub fn as_array(&self) -> [f64; 5] {
        [
            self.return_on_equity,
            self.return_on_assets,
            self.price_to_earnings,
            self.debt_to_equity,
            self.book_value,
        ]
    }
}

fn default_weight_roe() -> f64 {
    0.30
}

fn default_weight_roce() -> f64 {
    0.25
}

fn default_weight_pe() -> f64 {
    0.20
}

fn default_weight_de() -> f64 {
    0.15
}

fn default_weight_bv() -> f64 {
    0.10
}

/// How raw scores are mapped onto the output range.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NormalizationMethod {
    /// Batch-relative min-max scaling
    #[default]
    MinMax,
    /// Batch-relative scaling of rank positions
    Rank,
    /// Batch-independent `raw + 5`, clipped
    FixedOffset,
}

/// Recommended buy price policy. Exactly one is active per deployment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum BuyPricePolicy {
    /// `book_value * (1 + pe / 10)` when both are positive
    #[default]
    Valuation,
    /// `current_price * factor`, factor in `[0.8, 0.9]`
    Discount {
        #[serde(default = "default_discount_factor")]
        factor: f64,
        /// Draw the factor uniformly from `[0.8, 0.9]` per instrument
        #[serde(default)]
        randomize: bool,
    },
}

/// Lower bound of the discount factor.
pub const MIN_DISCOUNT_FACTOR: f64 = 0.8;

/// Upper bound of the discount factor.
pub const MAX_DISCOUNT_FACTOR: f64 = 0.9;

fn default_discount_factor() -> f64 {
    0.85
}

// ============================================================================
// Tests
// ============================================================================
