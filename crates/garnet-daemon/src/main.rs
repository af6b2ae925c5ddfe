// crates/garnet-daemon/src/main.rs
//
// Binary entrypoint for the Garnet staking daemon.
//
// Parses CLI arguments, loads configuration, initializes tracing, builds or
// resumes the staking ledger, constructs shared state, and runs the block
// scheduler until ctrl-c or the requested number of blocks.

mod config;
mod genesis;
mod scheduler;
mod shared;
mod state;

use clap::Parser;
use config::{DaemonConfig, StorageBackend};
use scheduler::BlockScheduler;
use shared::{DaemonLedger, DaemonSharedState};
use state::{NodeState, NodeStateMachine};

use garnet_core::error::GarnetError;
use garnet_core::{SnapshotStore, StakingQuery};
use garnet_economics::{Grt, StakingLedger};
use garnet_store::{MemorySnapshotStore, RocksSnapshotStore};

/// Garnet staking daemon: drives the validator reward, jailing and slashing
/// engine over a simulated block schedule.
#[derive(Parser, Debug)]
#[command(name = "garnet-daemon", version = "0.1.0", about = "Garnet staking engine daemon")]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(long, default_value = "~/.garnet/config.toml")]
    config: String,

    /// Stop after producing this many blocks.
    #[arg(long)]
    blocks: Option<u64>,

    /// Override the configured log level.
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Load configuration from TOML file, falling back to defaults if the file
    // is not found. Logged once tracing is up.
    let config_path = expand_tilde(&args.config);
    let loaded = DaemonConfig::load(&config_path);
    let mut daemon_config = match &loaded {
        Ok(cfg) => cfg.clone(),
        Err(_) => DaemonConfig::default(),
    };

    // CLI --log-level overrides the config file value.
    if let Some(level) = args.log_level.clone() {
        daemon_config.node.log_level = level;
    }

    // Initialize tracing subscriber for structured logging. RUST_LOG wins
    // over the configured level.
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(
            |_| tracing_subscriber::EnvFilter::new(&daemon_config.node.log_level),
        ))
        .init();

    match loaded {
        Ok(_) => tracing::info!("Loaded configuration from {}", config_path),
        Err(e) => tracing::warn!(
            "Could not load config from {}: {}. Using defaults.",
            config_path,
            e
        ),
    }
    daemon_config.validate()?;

    tracing::info!("Garnet Staking Daemon v0.1.0");
    tracing::info!("Storage backend: {:?}", daemon_config.node.storage);
    tracing::info!("Data directory: {}", daemon_config.node.data_dir);
    tracing::info!(
        "Reward period: {}s, block time: {}s",
        daemon_config.params.rewards.period,
        daemon_config.chain.block_time_secs
    );

    let mut state_machine = NodeStateMachine::new();
    state_machine.transition(NodeState::Loading)?;

    let ledger = load_ledger(&daemon_config)?;
    let genesis_time = daemon_config.chain.genesis_timestamp()?;
    let shared_state = DaemonSharedState::new(ledger);

    state_machine.transition(NodeState::Producing)?;
    let mut scheduler = BlockScheduler::new(
        shared_state.clone(),
        daemon_config.chain.clone(),
        daemon_config.simulation.clone(),
        genesis_time,
    )
    .with_max_blocks(args.blocks);

    let result = scheduler.run().await;
    if let Err(e) = &result {
        tracing::error!("Block scheduler error: {}", e);
    }

    state_machine.transition(NodeState::ShuttingDown)?;
    log_final_state(&shared_state).await?;
    tracing::info!(
        "Garnet daemon {} after {:?}",
        state_machine.current(),
        shared_state.start_time.elapsed()
    );

    result?;
    Ok(())
}

/// Open the configured snapshot store and build or resume the ledger.
fn load_ledger(config: &DaemonConfig) -> Result<DaemonLedger, GarnetError> {
    let store: Box<dyn SnapshotStore> = match config.node.storage {
        StorageBackend::Memory => Box::new(MemorySnapshotStore::new()),
        StorageBackend::RocksDb => {
            let data_dir = expand_tilde(&config.node.data_dir);
            std::fs::create_dir_all(&data_dir).map_err(|e| {
                GarnetError::Storage(format!("Failed to create {}: {}", data_dir, e))
            })?;
            let db_path = format!("{}/snapshots", data_dir);
            let store = RocksSnapshotStore::open(&db_path)?;
            tracing::info!("Snapshot store opened at {}", db_path);
            Box::new(store)
        }
    };

    let ledger = if store.latest()?.is_some() {
        StakingLedger::open(config.params.clone(), store)?
    } else {
        let genesis = genesis::build_genesis(config)?;
        StakingLedger::from_genesis(config.params.clone(), genesis, store)?
    };

    Ok(match config.node.snapshot_retention {
        0 => ledger,
        retention => ledger.with_retention(retention),
    })
}

/// Log every validator's stake and jail status at the tip.
async fn log_final_state(shared: &DaemonSharedState) -> Result<(), GarnetError> {
    let ledger = shared.ledger.read().await;
    let tip = ledger.tip();
    tracing::info!(
        "Final height {}: total bonded {}, epoch {}",
        tip.height,
        Grt::from_carats(ledger.get_total_bonded(None)?),
        tip.pool.epoch
    );
    if ledger.pending_evidence() > 0 {
        tracing::warn!("{} evidence items left unprocessed", ledger.pending_evidence());
    }
    if let Some(report) = shared.last_epoch.read().await.as_ref() {
        tracing::info!(
            "Last epoch closed at block {}: {} distributed, {} carried",
            report.height,
            Grt::from_carats(report.distribution.distributed()),
            Grt::from_carats(report.distribution.carried_out)
        );
    }
    for address in tip.accounts.keys() {
        let account = ledger.get_staking_state(address, None)?;
        match account.jailed_until {
            Some(until) => tracing::info!(
                "  {} bonded {} (jailed until {})",
                address,
                Grt::from_carats(account.bonded),
                until
            ),
            None => tracing::info!(
                "  {} bonded {} ({:?})",
                address,
                Grt::from_carats(account.bonded),
                ledger.health(address)
            ),
        }
    }
    Ok(())
}

/// Expand `~` at the start of a path to the user's home directory.
fn expand_tilde(path: &str) -> String {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return format!("{}/{}", home.display(), rest);
        }
    }
    path.to_string()
}
