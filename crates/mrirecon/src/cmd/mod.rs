use clap::{Args, Subcommand};
use std::path::PathBuf;

use mrirecon_config::ConfigStore;
use mrirecon_server::ServerConfig;

use crate::exit::CliResult;
use crate::output::OutputFormat;

pub mod dump;
pub mod serve;
pub mod submit;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the reconstruction server.
    Serve(ServeArgs),
    /// Submit one reconstruction job.
    Submit(SubmitArgs),
    /// Summarise a measurement stream file.
    Dump(DumpArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Serve(args) => serve::run(args),
        Command::Submit(args) => submit::run(args, format),
        Command::Dump(args) => dump::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

/// Log file named by the server configuration, for `serve` without
/// `--log-file`. Unreadable configuration is reported later by `serve`.
pub fn configured_log_path(command: &Command) -> Option<PathBuf> {
    let Command::Serve(args) = command else {
        return None;
    };
    let store = ConfigStore::from_file(args.config.as_deref()?).ok()?;
    ServerConfig::from_store(&store).ok()?.log_path
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Main configuration file (JSON).
    #[arg(long, value_name = "PATH", env = "MRIRECON_CONFIG")]
    pub config: Option<PathBuf>,
    /// Port to listen on, overriding the configuration.
    #[arg(long)]
    pub port: Option<u16>,
    /// Directory holding pipeline definitions, overriding the configuration.
    #[arg(long, value_name = "DIR")]
    pub pipeline_dir: Option<PathBuf>,
    /// Handle connections in the server process instead of forking.
    #[arg(long)]
    pub inline: bool,
    /// Exit after serving N connections.
    #[arg(long)]
    pub count: Option<usize>,
}

#[derive(Args, Debug)]
pub struct SubmitArgs {
    /// Server address (host:port).
    pub addr: String,
    /// Pipeline to run.
    #[arg(long, short = 'p')]
    pub pipeline: String,
    /// Request parameter as `key=value` (global) or `alias:key=value`.
    #[arg(long = "param", value_name = "[ALIAS:]KEY=VALUE")]
    pub params: Vec<String>,
    /// Read the job from a stream file instead of generating one.
    #[arg(long, value_name = "FILE", conflicts_with_all = ["dims", "complex"])]
    pub input: Option<PathBuf>,
    /// Write the result to a stream file.
    #[arg(long, value_name = "FILE")]
    pub output: Option<PathBuf>,
    /// Shape of the generated dataset: columns,lines,channels.
    #[arg(long, value_delimiter = ',', default_value = "8,8,1")]
    pub dims: Vec<u32>,
    /// Generate complex samples.
    #[arg(long)]
    pub complex: bool,
    /// Ask the server not to reply.
    #[arg(long)]
    pub silent: bool,
}

#[derive(Args, Debug)]
pub struct DumpArgs {
    /// Stream file to read.
    pub file: PathBuf,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}
