//! Vertical Tabs Reloaded settings bridge.
//!
//! Runs the sync broker as a standalone background process. The legacy
//! component is attached over stdin/stdout; logs go to stderr.

mod cli;
mod stdio;

use std::sync::Arc;

use clap::Parser;

use vtabs_core::{
    BridgeConfig, BroadcastBus, Database, LegacyPort, PeerInbound, SettingsStore, SqliteStorage,
    SyncBroker,
};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("vtabs=debug".parse()?)
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    tracing::info!("Starting vtabs-bridge v{}", vtabs_core::VERSION);

    let args = cli::Args::parse();
    let mut config = load_config(&args)?;
    args.apply(&mut config);
    tracing::debug!(?config, "Bridge configured");

    // Single-threaded: the broker relies on cooperative scheduling only
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    runtime.block_on(run(config, args.print_settings))
}

fn load_config(args: &cli::Args) -> anyhow::Result<BridgeConfig> {
    let path = match &args.config {
        Some(path) => path.clone(),
        None => match BridgeConfig::default_path() {
            Some(path) => path,
            None => return Ok(BridgeConfig::default()),
        },
    };
    Ok(BridgeConfig::load(&path)?)
}

async fn run(config: BridgeConfig, print_settings: bool) -> anyhow::Result<()> {
    let db = match &config.database_path {
        Some(path) => Database::open_at(path.clone())?,
        None => Database::open()?,
    };
    let store = SettingsStore::new(Arc::new(SqliteStorage::new(db)?));

    let snapshot = store.snapshot().await;
    if print_settings {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
        return Ok(());
    }
    tracing::info!(settings = ?snapshot, "Loaded settings");

    let (port, port_peer, legacy_rx) = LegacyPort::connect(config.legacy_endpoint.clone());
    let (bus, broadcast_rx) = BroadcastBus::new();
    // The legacy component listens on the bus as well as on its port
    let legacy_listener = bus.subscribe();
    let broker = SyncBroker::new(store, Arc::new(port), Arc::new(bus.sender()), &config);
    // Content scripts live in the browser, so nothing in this process posts
    // on the bus. Dropping the bus closes the runtime listener.
    drop(bus);

    let inbound = PeerInbound {
        legacy: legacy_rx,
        broadcast: broadcast_rx,
    };

    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let mut stdout = tokio::io::stdout();

    tokio::select! {
        _ = broker.run(inbound) => {
            tracing::info!("Broker stopped");
        }
        result = stdio::pump(port_peer, legacy_listener, stdin, &mut stdout) => {
            result?;
            tracing::info!("Legacy component detached, shutting down");
        }
        result = tokio::signal::ctrl_c() => {
            result?;
            tracing::info!("Interrupted, shutting down");
        }
    }

    Ok(())
}
