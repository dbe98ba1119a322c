use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{MomentumError, Result};

/// Top-level configuration for Momentum.
///
/// Loaded from `~/.momentum/config.toml` by default. Every section is
/// optional in the file and falls back to its defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MomentumConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub planner: PlannerConfig,
    #[serde(default)]
    pub guard: GuardConfig,
}

impl MomentumConfig {
    /// Load configuration from a TOML file.
    ///
    /// Returns an error if the file cannot be read, parsed, or fails validation.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: MomentumConfig = toml::from_str(&content)?;
        config.validate()?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the
    /// file does not exist or cannot be parsed.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Save the current configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }

    /// Reject values that would stall the planner or disable a protection.
    pub fn validate(&self) -> Result<()> {
        let checks: [(&str, u64); 10] = [
            (
                "planner.max_concurrent_actions",
                self.planner.max_concurrent_actions as u64,
            ),
            (
                "planner.dispatch_interval_secs",
                self.planner.dispatch_interval_secs,
            ),
            (
                "planner.cleanup_interval_secs",
                self.planner.cleanup_interval_secs,
            ),
            (
                "guard.rate_limit_capacity",
                self.guard.rate_limit_capacity as u64,
            ),
            (
                "guard.rate_limit_window_secs",
                self.guard.rate_limit_window_secs,
            ),
            (
                "guard.failure_threshold",
                self.guard.failure_threshold as u64,
            ),
            ("guard.cooldown_secs", self.guard.cooldown_secs),
            (
                "guard.max_concurrent_calls",
                self.guard.max_concurrent_calls as u64,
            ),
            ("guard.call_timeout_secs", self.guard.call_timeout_secs),
            ("guard.max_attempts", self.guard.max_attempts as u64),
        ];

        for (field, value) in checks {
            if value == 0 {
                return Err(MomentumError::Config(format!("{} must be at least 1", field)));
            }
        }
        Ok(())
    }
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Data directory for the SQLite memory store.
    pub data_dir: String,
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            data_dir: "~/.momentum/data".to_string(),
            log_level: "info".to_string(),
        }
    }
}

/// Action planner settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    /// Global ceiling on actions in progress, shared across all owners.
    pub max_concurrent_actions: usize,
    /// `max_attempts` given to actions created without an explicit value.
    pub default_max_attempts: u32,
    /// Seconds between dispatch passes of the coordination loop.
    pub dispatch_interval_secs: u64,
    /// Seconds between cleanup passes of the coordination loop.
    pub cleanup_interval_secs: u64,
    /// Terminal actions older than this are removed by cleanup.
    pub cleanup_retention_hours: u64,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_actions: 4,
            default_max_attempts: 3,
            dispatch_interval_secs: 5,
            cleanup_interval_secs: 3600,
            cleanup_retention_hours: 168,
        }
    }
}

impl PlannerConfig {
    pub fn dispatch_interval(&self) -> Duration {
        Duration::from_secs(self.dispatch_interval_secs)
    }

    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval_secs)
    }

    pub fn retention(&self) -> Duration {
        Duration::from_secs(self.cleanup_retention_hours * 3600)
    }
}

/// Protected call layer settings: rate limit, circuit breaker, concurrency, retry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GuardConfig {
    /// Calls admitted per rolling window.
    pub rate_limit_capacity: u32,
    /// Length of the rolling window in seconds.
    pub rate_limit_window_secs: u64,
    /// Consecutive failed calls that open the circuit.
    pub failure_threshold: u32,
    /// Seconds the circuit stays open before admitting a probe.
    pub cooldown_secs: u64,
    /// Calls allowed in flight at once.
    pub max_concurrent_calls: usize,
    /// Per-attempt timeout in seconds.
    pub call_timeout_secs: u64,
    /// Total attempts per call, including the first.
    pub max_attempts: u32,
    /// Backoff unit; attempt `n` waits `n * base_delay_ms`.
    pub base_delay_ms: u64,
    /// Upper bound of uniform random jitter added to each backoff, 0 disables it.
    pub jitter_ms: u64,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            rate_limit_capacity: 30,
            rate_limit_window_secs: 60,
            failure_threshold: 5,
            cooldown_secs: 60,
            max_concurrent_calls: 4,
            call_timeout_secs: 30,
            max_attempts: 3,
            base_delay_ms: 1000,
            jitter_ms: 0,
        }
    }
}

impl GuardConfig {
    pub fn rate_limit_window(&self) -> Duration {
        Duration::from_secs(self.rate_limit_window_secs)
    }

    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.cooldown_secs)
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_secs)
    }

    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }

    pub fn jitter(&self) -> Duration {
        Duration::from_millis(self.jitter_ms)
    }
}
