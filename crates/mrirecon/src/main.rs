mod cmd;
mod exit;
mod logging;
mod output;

use std::path::PathBuf;

use clap::Parser;

use crate::cmd::Command;
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "mrirecon", version, about = "MRI reconstruction server and client")]
struct Cli {
    /// Output format.
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Log output format.
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    /// Minimum log level.
    #[arg(long, value_name = "LEVEL", default_value = "info", global = true)]
    log_level: LogLevel,

    /// Append logs to a file instead of stderr.
    #[arg(long, value_name = "PATH", global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

fn main() {
    let cli = Cli::parse();
    let log_file = cli
        .log_file
        .clone()
        .or_else(|| cmd::configured_log_path(&cli.command));
    init_logging(cli.log_format, cli.log_level, log_file.as_deref());

    let format = cli.format.unwrap_or_else(OutputFormat::default_for_stdout);
    let result = cmd::run(cli.command, format);

    match result {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_submit_subcommand() {
        let cli = Cli::try_parse_from([
            "mrirecon",
            "submit",
            "127.0.0.1:9999",
            "--pipeline",
            "sort",
            "--param",
            "gain:factor=2",
            "--dims",
            "16,8,2",
        ])
        .expect("submit args should parse");

        let Command::Submit(args) = cli.command else {
            panic!("expected submit");
        };
        assert_eq!(args.dims, vec![16, 8, 2]);
        assert_eq!(args.params, vec!["gain:factor=2".to_string()]);
    }

    #[test]
    fn rejects_input_with_dims() {
        let err = Cli::try_parse_from([
            "mrirecon",
            "submit",
            "127.0.0.1:9999",
            "--pipeline",
            "sort",
            "--input",
            "job.dat",
            "--dims",
            "4,4,1",
        ])
        .expect_err("conflicting args should fail");

        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }

    #[test]
    fn parses_serve_subcommand() {
        let cli = Cli::try_parse_from(["mrirecon", "serve", "--port", "7000", "--inline"])
            .expect("serve args should parse");
        assert!(matches!(cli.command, Command::Serve(ref args) if args.inline));
    }

    #[test]
    fn submit_requires_pipeline() {
        let err = Cli::try_parse_from(["mrirecon", "submit", "127.0.0.1:9999"])
            .expect_err("missing pipeline should fail");
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }
}
