use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use mrirecon_config::ConfigStore;
use mrirecon_pipeline::PluginRegistry;
use mrirecon_server::{ReconServer, ServerConfig, ServerContext};
use tracing::info;

use crate::cmd::ServeArgs;
use crate::exit::{config_error, server_error, CliError, CliResult, INTERNAL, SUCCESS};

pub fn run(args: ServeArgs) -> CliResult<i32> {
    let store = match &args.config {
        Some(path) => {
            ConfigStore::from_file(path).map_err(|err| config_error("config load failed", err))?
        }
        None => ConfigStore::new(),
    };

    let mut config =
        ServerConfig::from_store(&store).map_err(|err| server_error("invalid config", err))?;
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(dir) = args.pipeline_dir {
        config.pipeline_dir = dir;
    }
    if args.inline {
        config.fork_per_connection = false;
    }
    config
        .validate()
        .map_err(|err| server_error("invalid config", err))?;

    let context = ServerContext::new(
        store,
        Arc::new(PluginRegistry::with_builtins()),
        config.pipeline_dir.clone(),
    );

    let running = Arc::new(AtomicBool::new(true));
    let mut server = ReconServer::bind(&config, context)
        .map_err(|err| server_error("bind failed", err))?
        .with_shutdown_flag(running.clone());
    install_ctrlc_handler(running, wake_addr(server.local_addr()))?;

    let served = server
        .serve_connections(args.count)
        .map_err(|err| server_error("serve failed", err))?;
    info!(served, "shutting down");
    Ok(SUCCESS)
}

/// Loopback address that reaches a listener bound to `local`.
fn wake_addr(local: SocketAddr) -> SocketAddr {
    let ip = match local.ip() {
        IpAddr::V4(ip) if ip.is_unspecified() => IpAddr::V4(Ipv4Addr::LOCALHOST),
        IpAddr::V6(ip) if ip.is_unspecified() => IpAddr::V6(Ipv6Addr::LOCALHOST),
        ip => ip,
    };
    SocketAddr::new(ip, local.port())
}

fn install_ctrlc_handler(running: Arc<AtomicBool>, wake: SocketAddr) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
        // Unblock the pending accept.
        let _ = TcpStream::connect(wake);
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wake_addr_prefers_loopback() {
        let addr: SocketAddr = "0.0.0.0:9999".parse().unwrap();
        assert_eq!(wake_addr(addr).to_string(), "127.0.0.1:9999");
        let addr: SocketAddr = "[::]:7000".parse().unwrap();
        assert_eq!(wake_addr(addr).to_string(), "[::1]:7000");
        let addr: SocketAddr = "10.0.0.5:80".parse().unwrap();
        assert_eq!(wake_addr(addr), addr);
    }
}
