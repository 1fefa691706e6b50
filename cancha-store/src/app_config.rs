use cancha_core::CommissionRates;
use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub database: DatabaseConfig,
    pub booking: BookingRules,
    pub sweeper: SweeperConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_acquire_timeout_secs")]
    pub acquire_timeout_secs: u64,
    /// Upper bound for any single statement, including advisory lock waits
    #[serde(default = "default_statement_timeout_ms")]
    pub statement_timeout_ms: u64,
    #[serde(default = "default_lock_timeout_ms")]
    pub lock_timeout_ms: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BookingRules {
    pub direct_commission_rate: f64,
    pub administrative_commission_rate: f64,
    pub vat_rate: f64,
    #[serde(default = "default_lock_granularity")]
    pub lock_granularity_minutes: u32,
}

impl BookingRules {
    pub fn commission_rates(&self) -> CommissionRates {
        CommissionRates {
            direct: self.direct_commission_rate,
            administrative: self.administrative_commission_rate,
            vat_rate: self.vat_rate,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct SweeperConfig {
    pub interval_seconds: u64,
}

fn default_max_connections() -> u32 { 10 }
fn default_acquire_timeout_secs() -> u64 { 3 }
fn default_statement_timeout_ms() -> u64 { 10_000 }
fn default_lock_timeout_ms() -> u64 { 5_000 }
fn default_lock_granularity() -> u32 { cancha_core::slot::DEFAULT_LOCK_GRANULARITY_MINUTES }

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            // Per-environment overrides, optional
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Local overrides, not checked in
            .add_source(config::File::with_name("config/local").required(false))
            // Eg.. `CANCHA_DATABASE__URL=postgres://...`
            .add_source(config::Environment::with_prefix("CANCHA").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
