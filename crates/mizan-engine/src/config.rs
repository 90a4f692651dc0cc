//! # Engine Configuration
//!
//! Everything a terminal needs to run the invoice engine: where the
//! database lives, which VAT regime applies, who the business is.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     MIZAN_DB_PATH=/var/lib/mizan/mizan.db                              │
//! │     MIZAN_TAX_RATE_BPS=1500                                            │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/pos/mizan.toml (Linux)                                   │
//! │     ~/Library/Application Support/com.mizan.pos/mizan.toml (macOS)    │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     ./mizan.db, 15% exclusive VAT                                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # mizan.toml
//! [database]
//! path = "/var/lib/mizan/mizan.db"
//! max_connections = 5
//!
//! [tax]
//! rate_bps = 1500     # 15.00%
//! inclusive = true    # menu prices include VAT
//!
//! [business]
//! business_name = "Mandi House"
//! tax_number = "300000000000003"
//! address = "King Fahd Rd, Riyadh"
//!
//! [logging]
//! filter = "info,mizan=debug,sqlx=warn"
//!
//! [events]
//! channel_capacity = 256
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, info, warn};

use crate::error::{EngineError, EngineResult};
use mizan_core::validation::validate_tax_rate;
use mizan_core::{BusinessSettings, TaxConfig, TaxRate};
use mizan_db::DbConfig;

// =============================================================================
// Database
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// SQLite file, or `:memory:`.
    #[serde(default = "default_db_path")]
    pub path: PathBuf,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    #[serde(default = "default_true")]
    pub run_migrations: bool,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./mizan.db")
}

fn default_max_connections() -> u32 {
    5
}

fn default_true() -> bool {
    true
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            max_connections: default_max_connections(),
            run_migrations: true,
        }
    }
}

// =============================================================================
// Tax
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaxSettings {
    /// Basis points, 1500 = 15%.
    #[serde(default = "default_rate_bps")]
    pub rate_bps: u32,

    /// Menu prices already include VAT.
    #[serde(default)]
    pub inclusive: bool,
}

fn default_rate_bps() -> u32 {
    TaxRate::default().bps()
}

impl Default for TaxSettings {
    fn default() -> Self {
        Self {
            rate_bps: default_rate_bps(),
            inclusive: false,
        }
    }
}

// =============================================================================
// Logging & Events
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

fn default_log_filter() -> String {
    crate::telemetry::DEFAULT_FILTER.to_string()
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventSettings {
    /// Events a slow subscriber may fall behind before it starts lagging.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

fn default_channel_capacity() -> usize {
    256
}

impl Default for EventSettings {
    fn default() -> Self {
        Self {
            channel_capacity: default_channel_capacity(),
        }
    }
}

// =============================================================================
// Engine Config
// =============================================================================

/// Complete engine configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub database: DatabaseSettings,

    #[serde(default)]
    pub tax: TaxSettings,

    /// Seller identity printed on every invoice and encoded in its QR code.
    #[serde(default)]
    pub business: BusinessSettings,

    #[serde(default)]
    pub logging: LoggingSettings,

    #[serde(default)]
    pub events: EventSettings,
}

impl EngineConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (mizan.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> EngineResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading engine config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.business = config.business.normalized();
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns default if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load engine config: {}. Using defaults.", e);
            Self::default()
        })
    }

    pub fn save(&self, config_path: Option<PathBuf>) -> EngineResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| EngineError::Config("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents)?;

        info!(?path, "Engine config saved");
        Ok(())
    }

    /// Checks values the engine cannot work around.
    ///
    /// Business identity is not checked here: an unconfigured terminal can
    /// still sell, it just cannot print a compliant QR code until the name
    /// and VAT number are filled in.
    pub fn validate(&self) -> EngineResult<()> {
        validate_tax_rate(self.tax_rate())?;

        if self.database.path.as_os_str().is_empty() {
            return Err(EngineError::Config("database.path must not be empty".into()));
        }

        if self.database.max_connections == 0 {
            return Err(EngineError::Config(
                "database.max_connections must be greater than 0".into(),
            ));
        }

        if self.events.channel_capacity == 0 {
            return Err(EngineError::Config(
                "events.channel_capacity must be greater than 0".into(),
            ));
        }

        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(path) = std::env::var("MIZAN_DB_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = PathBuf::from(path);
        }

        if let Ok(rate) = std::env::var("MIZAN_TAX_RATE_BPS") {
            match rate.parse::<u32>() {
                Ok(bps) => self.tax.rate_bps = bps,
                Err(_) => warn!(rate = %rate, "Ignoring non-numeric MIZAN_TAX_RATE_BPS"),
            }
        }

        if let Ok(inclusive) = std::env::var("MIZAN_TAX_INCLUSIVE") {
            match inclusive.to_lowercase().as_str() {
                "1" | "true" | "yes" => self.tax.inclusive = true,
                "0" | "false" | "no" => self.tax.inclusive = false,
                _ => warn!(value = %inclusive, "Unknown MIZAN_TAX_INCLUSIVE value"),
            }
        }

        if let Ok(name) = std::env::var("MIZAN_BUSINESS_NAME") {
            self.business.business_name = name;
        }

        if let Ok(number) = std::env::var("MIZAN_TAX_NUMBER") {
            self.business.tax_number = number;
        }

        if let Ok(filter) = std::env::var("MIZAN_LOG") {
            self.logging.filter = filter;
        }
    }

    /// `mizan.toml` in the platform config directory.
    pub fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "mizan", "pos")
            .map(|dirs| dirs.config_dir().join("mizan.toml"))
    }

    // =========================================================================
    // Convenience Methods
    // =========================================================================

    pub fn tax_rate(&self) -> TaxRate {
        TaxRate::from_bps(self.tax.rate_bps)
    }

    pub fn tax_config(&self) -> TaxConfig {
        TaxConfig {
            rate: self.tax_rate(),
            inclusive: self.tax.inclusive,
        }
    }

    pub fn db_config(&self) -> DbConfig {
        if self.database.path.as_os_str() == ":memory:" {
            return DbConfig::in_memory().run_migrations(self.database.run_migrations);
        }

        DbConfig::new(&self.database.path)
            .max_connections(self.database.max_connections)
            .run_migrations(self.database.run_migrations)
    }

    /// Config for tests: in-memory database and a named business.
    pub fn in_memory() -> Self {
        let mut config = Self::default();
        config.database.path = PathBuf::from(":memory:");
        config.business = BusinessSettings::new("Mandi House", "300000000000003");
        config
    }
}
