use std::path::PathBuf;

use clap::Parser;
use vtabs_core::BridgeConfig;

/// CLI arguments for vtabs-bridge
#[derive(Parser, Debug)]
#[command(name = "vtabs-bridge")]
#[command(about = "Keep Vertical Tabs Reloaded settings in sync between its components")]
pub struct Args {
    /// Config file (JSON). Defaults to <config dir>/vtabs/bridge.json
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Settings database path
    #[arg(long)]
    pub database: Option<PathBuf>,

    /// Name of the legacy port
    #[arg(long)]
    pub endpoint: Option<String>,

    /// Milliseconds to wait before asking the legacy side for its settings
    #[arg(long)]
    pub startup_delay_ms: Option<u64>,

    /// Print the current settings (defaults applied) as JSON and exit
    #[arg(long)]
    pub print_settings: bool,
}

impl Args {
    /// Override file configuration with whatever was given on the command line.
    pub fn apply(&self, config: &mut BridgeConfig) {
        if let Some(path) = &self.database {
            config.database_path = Some(path.clone());
        }
        if let Some(endpoint) = &self.endpoint {
            config.legacy_endpoint = endpoint.clone();
        }
        if let Some(delay) = self.startup_delay_ms {
            config.startup_delay_ms = delay;
        }
    }
}
