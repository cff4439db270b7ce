//! On-disk config (TOML, CLI-overridable) plus the config directory that
//! also holds the two persisted-state files mtp-proto reads and writes.

use std::path::PathBuf;

use directories_next::ProjectDirs;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

static CONFIG_ROOT: Lazy<PathBuf> = Lazy::new(init_config_root);

fn init_config_root() -> PathBuf {
    std::env::var("ZUNE_ROOT").map(PathBuf::from).unwrap_or_else(|_| {
        ProjectDirs::from("net", "zune", "zune-host")
            .expect("failed to resolve a platform config directory")
            .config_dir()
            .to_path_buf()
    })
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostConfig {
    pub device_ip: [u8; 4],
    pub host_ip: [u8; 4],
    pub dns_server_ip: [u8; 4],
    pub proxy_upstream_base: Option<String>,
    pub static_data_root: Option<PathBuf>,
    pub network_mode_enabled: bool,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            device_ip: [192, 168, 55, 101],
            host_ip: [192, 168, 55, 100],
            dns_server_ip: [192, 168, 0, 30],
            proxy_upstream_base: None,
            static_data_root: None,
            network_mode_enabled: false,
        }
    }
}

impl HostConfig {
    pub fn load() -> anyhow::Result<Self> {
        let path = CONFIG_ROOT.join("config.toml");
        match std::fs::read_to_string(&path) {
            Ok(raw) => Ok(toml::from_str(&raw)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::debug!("no config file at {path:?}, using defaults");
                Ok(Self::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn to_netstack_config(&self) -> netstack::NetstackConfig {
        netstack::NetstackConfig {
            device_ip: self.device_ip,
            host_ip: self.host_ip,
            dns_server_ip: self.dns_server_ip,
            proxy_upstream_base: self.proxy_upstream_base.clone(),
            static_data_root: self.static_data_root.clone(),
            network_mode_enabled: self.network_mode_enabled,
            global_large_response_gap: std::time::Duration::from_millis(1278),
        }
    }

    pub fn pairing_guid_path(&self) -> PathBuf {
        CONFIG_ROOT.join("pairing.guid")
    }

    pub fn device_session_guid_path(&self) -> PathBuf {
        CONFIG_ROOT.join("session.guid")
    }
}
