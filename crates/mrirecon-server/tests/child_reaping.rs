//! Forked connection handlers must not linger as zombies while the listener
//! sits in accept. Kept in its own test binary so forking happens in a
//! process with as few threads as possible.
#![cfg(target_os = "linux")]

use std::net::{IpAddr, Ipv4Addr};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use mrirecon_config::ConfigStore;
use mrirecon_frame::Dimensions;
use mrirecon_pipeline::PluginRegistry;
use mrirecon_proto::{ReconRequest, SampleArray};
use mrirecon_server::{ReconClient, ReconServer, ServerConfig, ServerContext};

const SORT: &str = r#"{
    "plugins": [ { "id": "sort_combine", "alias": "sorter" } ],
    "root": "sorter"
}"#;

/// `(pid, state)` of every process whose parent is this test process.
fn children() -> Vec<(u32, char)> {
    let me = std::process::id();
    let mut found = Vec::new();
    for entry in std::fs::read_dir("/proc").unwrap().flatten() {
        let Ok(pid) = entry.file_name().to_string_lossy().parse::<u32>() else {
            continue;
        };
        let Ok(stat) = std::fs::read_to_string(entry.path().join("stat")) else {
            continue;
        };
        // The command name may contain spaces; fields resume after ')'.
        let Some(rest) = stat.rfind(')').map(|at| &stat[at + 1..]) else {
            continue;
        };
        let mut fields = rest.split_whitespace();
        let state = fields.next().and_then(|s| s.chars().next());
        let ppid = fields.next().and_then(|p| p.parse::<u32>().ok());
        if let (Some(state), Some(ppid)) = (state, ppid) {
            if ppid == me {
                found.push((pid, state));
            }
        }
    }
    found
}

#[test]
fn finished_handlers_are_reaped_while_accept_blocks() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("sort.json"), SORT).unwrap();
    let config = ServerConfig {
        bind_address: IpAddr::V4(Ipv4Addr::LOCALHOST),
        port: 0,
        pipeline_dir: dir.path().to_path_buf(),
        fork_per_connection: true,
        ..ServerConfig::default()
    };
    let context = ServerContext::new(
        ConfigStore::new(),
        Arc::new(PluginRegistry::with_builtins()),
        dir.path(),
    );
    let running = Arc::new(AtomicBool::new(true));
    let mut server = ReconServer::bind(&config, context)
        .unwrap()
        .with_shutdown_flag(Arc::clone(&running));
    let addr = server.local_addr();
    let handle = thread::spawn(move || server.serve().unwrap());

    let dims = Dimensions::with_extent(4, 2, 1);
    let values = (0..8).map(|v| v as f32).collect();
    let input = SampleArray::from_vec(dims, false, values).unwrap();
    for _ in 0..3 {
        let response = ReconClient::connect(&addr.to_string())
            .unwrap()
            .submit_array(&ReconRequest::new("sort"), &input)
            .unwrap();
        assert!(response.succeeded());
        assert_eq!(response.data.as_ref(), Some(&input));
    }

    // The listener is now blocked in accept with no further connection.
    let deadline = Instant::now() + Duration::from_secs(5);
    let mut remaining = children();
    while !remaining.is_empty() && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(20));
        remaining = children();
    }
    assert!(
        remaining.is_empty(),
        "connection handlers left behind: {remaining:?}"
    );

    running.store(false, Ordering::SeqCst);
    let _ = std::net::TcpStream::connect(addr);
    handle.join().unwrap();
}
