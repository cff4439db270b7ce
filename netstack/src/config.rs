//! Inputs the dispatcher needs before it can bring a device into network
//! mode. No config file format is mandated; callers load these from
//! wherever their environment (CLI flags, TOML, env vars) dictates.

use std::time::Duration;

#[derive(Debug, Clone)]
pub struct NetstackConfig {
    pub device_ip: [u8; 4],
    pub host_ip: [u8; 4],
    pub dns_server_ip: [u8; 4],
    pub proxy_upstream_base: Option<String>,
    pub static_data_root: Option<std::path::PathBuf>,
    pub network_mode_enabled: bool,
    pub global_large_response_gap: Duration,
}

impl Default for NetstackConfig {
    fn default() -> Self {
        Self {
            device_ip: [192, 168, 55, 101],
            host_ip: [192, 168, 55, 100],
            dns_server_ip: [192, 168, 0, 30],
            proxy_upstream_base: None,
            static_data_root: None,
            network_mode_enabled: false,
            global_large_response_gap: Duration::from_millis(1278),
        }
    }
}
