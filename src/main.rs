//! `binscan` daemon.
//!
//! ```bash
//! binscan --config binscan.toml --port 3000 --data-file inventory_data.csv
//! ```

use std::{net::IpAddr, path::PathBuf, sync::Arc};

use binscan::{
    config::{self, InventoryConfig},
    daemon::InventoryDaemon,
    InventoryServiceImpl, TableStore,
};
use clap::Parser;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "binscan", version, about = "Bin inventory ledger with QR pick codes")]
struct Cli {
    /// TOML config file; missing file means defaults
    #[arg(short, long, env = "BINSCAN_CONFIG", default_value = "binscan.toml")]
    config: PathBuf,

    /// Address to bind
    #[arg(long, env = "BINSCAN_BIND")]
    bind: Option<IpAddr>,

    /// Port to listen on
    #[arg(short, long, env = "BINSCAN_PORT")]
    port: Option<u16>,

    /// Inventory CSV file
    #[arg(short, long, env = "BINSCAN_DATA_FILE")]
    data_file: Option<PathBuf>,

    /// URL the QR codes point at, e.g. http://192.168.1.20:3000/scan.html
    #[arg(long, env = "BINSCAN_SCAN_URL")]
    scan_base_url: Option<String>,
}

impl Cli {
    fn resolve(self) -> Result<InventoryConfig, String> {
        let mut cfg = InventoryConfig::from_file(&self.config)?;
        if let Some(bind) = self.bind {
            cfg.bind = bind;
        }
        if let Some(port) = self.port {
            cfg.port = port;
        }
        if let Some(data_file) = self.data_file {
            cfg.data_file = data_file;
        }
        if let Some(url) = self.scan_base_url {
            cfg.scan_base_url = Some(url);
        }
        Ok(cfg)
    }
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let cfg = Cli::parse().resolve()?;
    config::set_config(cfg)?;

    let store = TableStore::new(config::data_file());
    match store.load() {
        Ok(table) => tracing::info!(
            "binscan: {} bins, {} skus in {}",
            table.len(),
            table.skus().len(),
            store.path().display()
        ),
        // not fatal: the file may be dropped in place after startup
        Err(e) => tracing::warn!("binscan: {}", e),
    }

    let service = Arc::new(InventoryServiceImpl::new(store));
    let daemon = InventoryDaemon::new(service, config::scan_base_url());
    daemon.serve(config::listen_addr()).await?;
    Ok(())
}
