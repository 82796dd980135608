use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

use mrirecon_config::{ConfigStore, Scope};
use mrirecon_frame::ChannelConfig;
use tracing::debug;

use crate::error::{Result, ServerError};

/// Port used when the main configuration does not set one.
pub const DEFAULT_PORT: u16 = 9999;

/// Server settings, read from the global tier of the main configuration.
///
/// | key                   | default     |
/// |-----------------------|-------------|
/// | `port`                | 9999        |
/// | `bind_address`        | `0.0.0.0`   |
/// | `pipeline_dir`        | `.`         |
/// | `buffer_size`         | 1 MiB       |
/// | `fork_per_connection` | `true`      |
/// | `log_path`            | none        |
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_address: IpAddr,
    pub port: u16,
    pub pipeline_dir: PathBuf,
    pub channel: ChannelConfig,
    pub fork_per_connection: bool,
    pub log_path: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: DEFAULT_PORT,
            pipeline_dir: PathBuf::from("."),
            channel: ChannelConfig::network(),
            fork_per_connection: cfg!(unix),
            log_path: None,
        }
    }
}

impl ServerConfig {
    /// Read settings from `store`, falling back to defaults for absent keys.
    pub fn from_store(store: &ConfigStore) -> Result<Self> {
        let mut config = Self::default();
        let global = Scope::global();

        if let Some(port) = store.get_int(global, "port")? {
            config.port = u16::try_from(port)
                .map_err(|_| ServerError::InvalidConfig(format!("port {port} out of range")))?;
        }
        if let Some(addr) = store.get(global, "bind_address") {
            config.bind_address = addr.parse().map_err(|_| {
                ServerError::InvalidConfig(format!("bind_address {addr:?} is not an IP address"))
            })?;
        }
        if let Some(dir) = store.get(global, "pipeline_dir") {
            config.pipeline_dir = PathBuf::from(dir);
        }
        if let Some(size) = store.get_int(global, "buffer_size")? {
            config.channel.capacity = usize::try_from(size)
                .ok()
                .filter(|size| *size > 0)
                .ok_or_else(|| {
                    ServerError::InvalidConfig(format!("buffer_size {size} must be positive"))
                })?;
        }
        if let Some(fork) = store.get_bool(global, "fork_per_connection")? {
            config.fork_per_connection = fork;
        }
        if let Some(path) = store.get(global, "log_path") {
            config.log_path = Some(PathBuf::from(path));
        }
        if let Some(dir) = store.get(global, "plugin_dir") {
            debug!(dir, "plugin_dir is ignored, plugins are built in");
        }

        Ok(config)
    }

    /// Check settings that depend on the filesystem.
    pub fn validate(&self) -> Result<()> {
        if !self.pipeline_dir.is_dir() {
            return Err(ServerError::InvalidConfig(format!(
                "pipeline_dir {} is not a directory",
                self.pipeline_dir.display()
            )));
        }
        if self.fork_per_connection && !cfg!(unix) {
            return Err(ServerError::InvalidConfig(
                "fork_per_connection requires a Unix platform".into(),
            ));
        }
        Ok(())
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_address, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_when_unset() {
        let config = ServerConfig::from_store(&ConfigStore::new()).unwrap();
        assert_eq!(config.port, 9999);
        assert_eq!(config.channel.capacity, 1024 * 1024);
        assert_eq!(config.socket_addr().to_string(), "0.0.0.0:9999");
    }

    #[test]
    fn reads_global_keys() {
        let mut store = ConfigStore::new();
        store.set(Scope::global(), "port", "7001").unwrap();
        store.set(Scope::global(), "bind_address", "127.0.0.1").unwrap();
        store.set(Scope::global(), "pipeline_dir", "/srv/p").unwrap();
        store.set(Scope::global(), "buffer_size", "4096").unwrap();
        store.set(Scope::global(), "fork_per_connection", "false").unwrap();
        store.set(Scope::global(), "log_path", "/var/log/recon.log").unwrap();

        let config = ServerConfig::from_store(&store).unwrap();
        assert_eq!(config.socket_addr().to_string(), "127.0.0.1:7001");
        assert_eq!(config.pipeline_dir, PathBuf::from("/srv/p"));
        assert_eq!(config.channel.capacity, 4096);
        assert!(!config.fork_per_connection);
        assert_eq!(config.log_path, Some(PathBuf::from("/var/log/recon.log")));
    }

    #[test]
    fn rejects_bad_values() {
        for (key, value) in [
            ("port", "70000"),
            ("port", "http"),
            ("bind_address", "localhost:1"),
            ("buffer_size", "0"),
        ] {
            let mut store = ConfigStore::new();
            store.set(Scope::global(), key, value).unwrap();
            assert!(ServerConfig::from_store(&store).is_err(), "{key}={value}");
        }
    }

    #[test]
    fn validate_requires_pipeline_dir() {
        let config = ServerConfig {
            pipeline_dir: PathBuf::from("/nonexistent/mrirecon/pipelines"),
            ..ServerConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ServerError::InvalidConfig(_))
        ));
    }
}
