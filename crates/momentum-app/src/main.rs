//! Momentum planner binary - composition root.
//!
//! 1. Load configuration from TOML and apply CLI overrides
//! 2. Open the memory store (SQLite, or in-memory with `--in-memory`)
//! 3. Build the protected call layer and the executor table
//! 4. Run the planner loop until Ctrl-C

mod cli;
mod offline;

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;

use momentum_action::executor::{ChainExecutor, NotificationExecutor, ToolExecutor};
use momentum_action::{ExecutorTable, Planner};
use momentum_core::config::MomentumConfig;
use momentum_guard::ProtectedExecutor;
use momentum_storage::{Database, InMemoryStore, MemoryStore, SqliteMemoryStore};

use cli::CliArgs;
use offline::{EchoModel, EchoTools, TracingNotifier};

/// Expand ~ to home directory in a path string.
fn resolve_data_dir(data_dir: &str) -> PathBuf {
    if data_dir.starts_with("~/") || data_dir.starts_with("~\\") {
        #[cfg(target_os = "windows")]
        let home = std::env::var("USERPROFILE").unwrap_or_else(|_| ".".to_string());
        #[cfg(not(target_os = "windows"))]
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
        PathBuf::from(home).join(&data_dir[2..])
    } else {
        PathBuf::from(data_dir)
    }
}

fn build_executors(guard: &Arc<ProtectedExecutor>) -> Result<ExecutorTable, Box<dyn std::error::Error>> {
    let mut table = ExecutorTable::new();
    table.register(Arc::new(ChainExecutor::new(
        Arc::new(EchoModel),
        Arc::clone(guard),
    )))?;
    table.register(Arc::new(ToolExecutor::new(
        Arc::new(EchoTools),
        Arc::clone(guard),
    )))?;
    table.register(Arc::new(NotificationExecutor::new(Arc::new(TracingNotifier))))?;
    Ok(table)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    // Config is read before tracing so the configured level can seed the filter.
    let config_file = args.resolve_config_path();
    let (mut config, load_error) = match MomentumConfig::load(&config_file) {
        Ok(config) => (config, None),
        Err(e) => (MomentumConfig::default(), Some(e)),
    };
    if let Some(dir) = args.resolve_data_dir() {
        config.general.data_dir = dir;
    }
    if let Some(level) = args.resolve_log_level() {
        config.general.log_level = level;
    }

    // Tracing.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.general.log_level)),
        )
        .init();

    tracing::info!("Starting Momentum v{}", env!("CARGO_PKG_VERSION"));
    match load_error {
        None => tracing::info!(path = %config_file.display(), "Configuration loaded"),
        Some(e) => tracing::warn!(
            path = %config_file.display(),
            error = %e,
            "Failed to load config, using defaults"
        ),
    }

    // Memory store.
    let memory: Arc<dyn MemoryStore> = if args.in_memory {
        tracing::info!("Using in-memory action history");
        Arc::new(InMemoryStore::new())
    } else {
        let db_path = resolve_data_dir(&config.general.data_dir).join("momentum.db");
        let db = Database::new(&db_path)?;
        tracing::info!(path = %db_path.display(), "SQLite memory store opened");
        Arc::new(SqliteMemoryStore::new(Arc::new(db)))
    };

    // Executors share one protected call layer.
    let guard = Arc::new(ProtectedExecutor::new(&config.guard));
    let executors = build_executors(&guard)?;

    let planner = Arc::new(Planner::new(config.planner.clone(), executors, memory));
    let runner = {
        let planner = Arc::clone(&planner);
        tokio::spawn(async move { planner.run().await })
    };

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown requested");
    planner.shutdown();
    runner.await?;

    tracing::info!(
        planner = ?planner.stats(),
        guard = ?guard.stats(),
        "Momentum stopped"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use momentum_action::ActionKind;

    #[test]
    fn test_resolve_data_dir_expands_home() {
        let plain = resolve_data_dir("/tmp/momentum");
        assert_eq!(plain, PathBuf::from("/tmp/momentum"));

        let expanded = resolve_data_dir("~/.momentum/data");
        assert!(expanded.ends_with(".momentum/data"));
        assert!(!expanded.starts_with("~"));
    }

    #[test]
    fn test_every_kind_has_an_executor() {
        let guard = Arc::new(ProtectedExecutor::new(&MomentumConfig::default().guard));
        let table = build_executors(&guard).unwrap();
        assert_eq!(table.kinds(), ActionKind::ALL.to_vec());
    }
}
