//! ProcSentry - Main Entry Point

mod cli;
mod constants;
mod logic;

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::sync::watch;

use logic::audit::AuditStore;
use logic::baseline::PermissionBaseline;
use logic::config::{OperatingMode, RuntimeConfig};
use logic::driver::PipelineDriver;
use logic::enforce::{EnforcementCapability, EnforcementMachine, HostCapability};
use logic::policy::PolicyTable;
use logic::snapshot::SysinfoSource;

#[tokio::main]
async fn main() {
    let args = cli::Cli::parse();

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(args.log_level.clone()),
    )
    .init();

    // Configuration: file first, CLI flags override.
    let mut config = match &args.config {
        Some(path) => match RuntimeConfig::load(path) {
            Ok(config) => config,
            Err(e) => {
                log::error!("Fatal: {}", e);
                std::process::exit(1);
            }
        },
        None => RuntimeConfig::default(),
    };
    if let Some(mode) = args.mode {
        config.mode = mode;
    }
    if let Some(interval) = args.interval {
        config.poll_interval_secs = interval;
    }
    if let Some(db) = args.db {
        config.db_path = Some(db);
    }

    let host = hostname::get()
        .map(|h| h.to_string_lossy().to_string())
        .unwrap_or_else(|_| "unknown-host".to_string());
    log::info!(
        "Starting {} v{} on {} in {} mode",
        constants::APP_NAME,
        constants::APP_VERSION,
        host,
        config.mode
    );

    // Audit store unreachable at startup is fatal - running without an
    // audit trail is not an option.
    let db_path = config
        .db_path
        .clone()
        .unwrap_or_else(AuditStore::default_path);
    let store = match AuditStore::open(&db_path) {
        Ok(store) => Arc::new(store),
        Err(e) => {
            log::error!("Fatal: {}", e);
            std::process::exit(1);
        }
    };

    match store.unresolved_alerts(100) {
        Ok(pending) if !pending.is_empty() => {
            log::warn!("{} unresolved alerts pending review", pending.len());
        }
        Ok(_) => {}
        Err(e) => log::error!("Could not read pending alerts: {}", e),
    }

    let mut table = match config.policy_rules.clone() {
        Some(rules) => PolicyTable::new(rules),
        None => PolicyTable::default_rules(),
    };
    if config.mode == OperatingMode::Lockdown {
        table = table.tightened(config.lockdown_offset);
        log::info!(
            "Lockdown: policy thresholds tightened by {}",
            config.lockdown_offset
        );
    }

    let capability: Arc<dyn EnforcementCapability> = Arc::new(HostCapability::new());
    let baseline = Arc::new(PermissionBaseline::new());
    let machine = Arc::new(EnforcementMachine::new(
        config.mode,
        table,
        capability,
        Arc::clone(&store),
        Duration::from_millis(config.capability_timeout_ms),
    ));

    let driver = PipelineDriver::new(
        config.scoring.clone(),
        Duration::from_secs(config.poll_interval_secs.max(1)),
        baseline,
        machine,
        Arc::clone(&store),
    );

    let source = Box::new(SysinfoSource::new(config.hash_executables));

    // Cooperative shutdown: ctrl-c flips the channel, in-flight work
    // finishes, no new batch starts.
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::info!("Shutdown signal received");
            let _ = shutdown_tx.send(true);
        }
    });

    driver.run(source, shutdown_rx).await;
    log::info!("{} shut down cleanly", constants::APP_NAME);
}
