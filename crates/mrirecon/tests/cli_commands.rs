#![cfg(all(unix, feature = "cli"))]

use std::net::{TcpListener, TcpStream};
use std::path::Path;
use std::process::{Child, Command, Output, Stdio};
use std::thread;
use std::time::{Duration, Instant};

const SORT_SCALE: &str = r#"{
    "plugins": [
        { "id": "sort_combine", "alias": "sorter" },
        { "id": "scale", "alias": "gain" }
    ],
    "root": "sorter",
    "links": [ { "input": "sorter", "output": "gain" } ]
}"#;

fn free_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").expect("ephemeral bind should work");
    listener.local_addr().expect("local addr").port()
}

fn mrirecon() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_mrirecon"));
    cmd.env_remove("MRIRECON_CONFIG")
        .arg("--log-level")
        .arg("error");
    cmd
}

fn start_server(dir: &Path) -> (Child, String) {
    let pipelines = dir.join("pipelines");
    std::fs::create_dir_all(&pipelines).expect("pipeline dir should be creatable");
    std::fs::write(pipelines.join("sort_scale.json"), SORT_SCALE)
        .expect("pipeline file should be writable");

    let port = free_port();
    let config = dir.join("server.json");
    std::fs::write(
        &config,
        format!(
            r#"{{
                "params": {{
                    "bind_address": "127.0.0.1",
                    "port": {port},
                    "pipeline_dir": "{}"
                }},
                "plugins": [
                    {{ "plugin_alias": "gain", "params": {{ "factor": 2 }} }}
                ]
            }}"#,
            pipelines.display()
        ),
    )
    .expect("config should be writable");

    let child = mrirecon()
        .arg("serve")
        .arg("--config")
        .arg(&config)
        .arg("--inline")
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .spawn()
        .expect("serve should start");

    let addr = format!("127.0.0.1:{port}");
    let start = Instant::now();
    while TcpStream::connect(&addr).is_err() {
        if start.elapsed() >= Duration::from_secs(5) {
            panic!("server did not come up");
        }
        thread::sleep(Duration::from_millis(25));
    }
    (child, addr)
}

fn stop(mut child: Child) {
    let _ = child.kill();
    let _ = child.wait();
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn version_prints_package_version() {
    let output = mrirecon().arg("version").output().expect("version should run");
    assert!(output.status.success());
    assert_eq!(
        stdout(&output).trim(),
        format!("mrirecon {}", env!("CARGO_PKG_VERSION"))
    );
}

#[test]
fn submit_writes_result_that_dump_reads() {
    let dir = tempfile::tempdir().expect("temp dir");
    let (server, addr) = start_server(dir.path());
    let result = dir.path().join("result.dat");

    let output = mrirecon()
        .args(["--format", "json", "submit", &addr, "--pipeline", "sort_scale"])
        .args(["--dims", "4,3,2", "--output"])
        .arg(&result)
        .output()
        .expect("submit should run");
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let text = stdout(&output);
    assert!(text.contains("\"success\":true"), "{text}");
    assert!(text.contains("\"max\":46.0"), "{text}");

    let output = mrirecon()
        .args(["--format", "json", "dump"])
        .arg(&result)
        .output()
        .expect("dump should run");
    assert!(output.status.success());
    let text = stdout(&output);
    assert!(text.contains("\"measurements\":3"), "{text}");
    assert!(text.contains("\"values\":24"), "{text}");

    stop(server);
}

#[test]
fn request_param_overrides_main_config() {
    let dir = tempfile::tempdir().expect("temp dir");
    let (server, addr) = start_server(dir.path());

    let output = mrirecon()
        .args(["--format", "json", "submit", &addr, "--pipeline", "sort_scale"])
        .args(["--dims", "2,1,1", "--param", "gain:factor=10"])
        .output()
        .expect("submit should run");
    assert!(output.status.success());
    assert!(stdout(&output).contains("\"max\":10.0"));

    stop(server);
}

#[test]
fn unknown_pipeline_exits_with_failure() {
    let dir = tempfile::tempdir().expect("temp dir");
    let (server, addr) = start_server(dir.path());

    let output = mrirecon()
        .args(["--format", "json", "submit", &addr, "--pipeline", "missing"])
        .output()
        .expect("submit should run");
    assert_eq!(output.status.code(), Some(1));
    assert!(stdout(&output).contains("\"success\":false"));

    stop(server);
}

#[test]
fn submit_without_server_fails_to_connect() {
    let addr = format!("127.0.0.1:{}", free_port());
    let output = mrirecon()
        .args(["submit", &addr, "--pipeline", "sort_scale"])
        .output()
        .expect("submit should run");
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("connect failed"));
}

#[test]
fn serve_rejects_missing_pipeline_dir() {
    let output = mrirecon()
        .args(["serve", "--inline", "--pipeline-dir", "/nonexistent/mrirecon"])
        .output()
        .expect("serve should run");
    assert_eq!(output.status.code(), Some(78));
}

#[test]
fn dump_missing_file_fails() {
    let output = mrirecon()
        .args(["dump", "/nonexistent/job.dat"])
        .output()
        .expect("dump should run");
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("cannot open input"));
}
