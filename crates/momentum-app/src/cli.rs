//! CLI argument definitions for the Momentum planner daemon.
//!
//! Priority resolution: CLI args > env vars > config file > defaults.

use clap::Parser;
use std::path::PathBuf;

/// Momentum: runs the action planner against offline collaborators.
#[derive(Parser, Debug)]
#[command(name = "momentum", version, about)]
pub struct CliArgs {
    /// Path to the configuration file.
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// Data directory for the SQLite memory store.
    #[arg(short = 'd', long = "data-dir")]
    pub data_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short = 'l', long = "log-level")]
    pub log_level: Option<String>,

    /// Keep action snapshots in memory instead of SQLite.
    #[arg(long = "in-memory")]
    pub in_memory: bool,
}

impl CliArgs {
    /// Resolve the configuration file path.
    ///
    /// Priority: --config flag > MOMENTUM_CONFIG env var > ~/.momentum/config.toml.
    pub fn resolve_config_path(&self) -> PathBuf {
        if let Some(ref p) = self.config {
            return p.clone();
        }
        if let Ok(p) = std::env::var("MOMENTUM_CONFIG") {
            return PathBuf::from(p);
        }
        default_config_path()
    }

    /// Data directory override, if given.
    pub fn resolve_data_dir(&self) -> Option<String> {
        self.data_dir
            .as_ref()
            .map(|p| p.to_string_lossy().to_string())
    }

    pub fn resolve_log_level(&self) -> Option<String> {
        self.log_level.clone()
    }
}

/// Default config file path for the current platform.
fn default_config_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    if let Ok(home) = std::env::var("USERPROFILE") {
        return PathBuf::from(home).join(".momentum").join("config.toml");
    }
    #[cfg(not(target_os = "windows"))]
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".momentum").join("config.toml");
    }
    PathBuf::from("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_all_flags() {
        let args = CliArgs::try_parse_from([
            "momentum",
            "-c",
            "/etc/momentum.toml",
            "-d",
            "/var/lib/momentum",
            "-l",
            "debug",
            "--in-memory",
        ])
        .unwrap();

        assert_eq!(args.resolve_config_path(), PathBuf::from("/etc/momentum.toml"));
        assert_eq!(args.resolve_data_dir().as_deref(), Some("/var/lib/momentum"));
        assert_eq!(args.resolve_log_level().as_deref(), Some("debug"));
        assert!(args.in_memory);
    }

    #[test]
    fn test_defaults_leave_overrides_unset() {
        let args = CliArgs::try_parse_from(["momentum"]).unwrap();
        assert!(args.resolve_data_dir().is_none());
        assert!(args.resolve_log_level().is_none());
        assert!(!args.in_memory);
    }

    #[test]
    fn test_unknown_flag_rejected() {
        assert!(CliArgs::try_parse_from(["momentum", "--port", "3030"]).is_err());
    }

    #[test]
    fn test_default_config_path_file_name() {
        assert!(default_config_path().ends_with("config.toml"));
    }
}
