//! Process-wide configuration.
//!
//! Values come from an optional TOML file and may be overridden on the command
//! line. The resolved config is stored once in a global and read through the
//! getter functions below.
//!
//! ```toml
//! port = 3000
//! data_file = "inventory_data.csv"
//! scan_base_url = "http://192.168.1.20:3000/scan.html"
//! ```

use std::{
    fs,
    net::{IpAddr, Ipv4Addr, SocketAddr},
    path::{Path, PathBuf},
};

use once_cell::sync::OnceCell;
use serde::Deserialize;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_DATA_FILE: &str = "inventory_data.csv";
pub const SCAN_PAGE: &str = "scan.html";

static CONFIG: OnceCell<InventoryConfig> = OnceCell::new();

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InventoryConfig {
    /// Address to bind; the port is also used to derive the default scan URL.
    pub bind: IpAddr,
    pub port: u16,
    /// CSV file holding the inventory table.
    pub data_file: PathBuf,
    /// URL of the page the phone opens after scanning. Defaults to
    /// `http://localhost:{port}/scan.html`.
    pub scan_base_url: Option<String>,
}

impl Default for InventoryConfig {
    fn default() -> Self {
        Self {
            bind: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: DEFAULT_PORT,
            data_file: PathBuf::from(DEFAULT_DATA_FILE),
            scan_base_url: None,
        }
    }
}

impl InventoryConfig {
    /// Read a config file. A missing file yields the defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, String> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)
            .map_err(|e| format!("read config {}: {e}", path.display()))?;
        Self::from_toml(&content).map_err(|e| format!("parse config {}: {e}", path.display()))
    }

    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind, self.port)
    }

    pub fn scan_base_url(&self) -> String {
        self.scan_base_url
            .clone()
            .unwrap_or_else(|| format!("http://localhost:{}/{SCAN_PAGE}", self.port))
    }
}

/// Load `path` and install it as the global config.
pub fn init_config(path: impl AsRef<Path>) -> Result<(), String> {
    set_config(InventoryConfig::from_file(path)?)
}

/// Install an already resolved config. Fails if one is installed.
pub fn set_config(config: InventoryConfig) -> Result<(), String> {
    CONFIG
        .set(config)
        .map_err(|_| "config already initialized".to_string())
}

/// The installed config, or the defaults when none was installed.
pub fn get_config() -> &'static InventoryConfig {
    CONFIG.get_or_init(InventoryConfig::default)
}

pub fn listen_addr() -> SocketAddr {
    get_config().listen_addr()
}

pub fn data_file() -> PathBuf {
    get_config().data_file.clone()
}

pub fn scan_base_url() -> String {
    get_config().scan_base_url()
}
