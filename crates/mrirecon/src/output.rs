use std::io::IsTerminal;

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use mrirecon_proto::ArraySummary;
use mrirecon_server::ReconResponse;
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct ResponseOutput<'a> {
    pipeline: &'a str,
    silent: bool,
    success: Option<bool>,
    message: Option<&'a str>,
    result: Option<ArraySummary>,
}

pub fn print_response(pipeline: &str, response: &ReconResponse, format: OutputFormat) {
    let out = ResponseOutput {
        pipeline,
        silent: response.ack.is_none(),
        success: response.ack.as_ref().map(|ack| ack.success),
        message: response.ack.as_ref().map(|ack| ack.message.as_str()),
        result: response.data.as_ref().map(|data| data.summary()),
    };

    match format {
        OutputFormat::Json => print_json(&out),
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["PIPELINE", "STATUS", "MESSAGE", "RESULT"])
                .add_row(vec![
                    out.pipeline.to_string(),
                    status(&out).to_string(),
                    out.message.unwrap_or("-").to_string(),
                    out.result
                        .as_ref()
                        .map_or_else(|| "-".to_string(), |r| r.dims.to_string()),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "pipeline={} status={} message={:?}",
                out.pipeline,
                status(&out),
                out.message.unwrap_or("")
            );
            if let Some(result) = &out.result {
                print_summary_line("result", result);
            }
        }
    }
}

#[derive(Serialize)]
struct DumpOutput<'a> {
    source: &'a str,
    measurements: usize,
    #[serde(flatten)]
    summary: &'a ArraySummary,
}

pub fn print_dump(
    source: &str,
    measurements: usize,
    summary: &ArraySummary,
    format: OutputFormat,
) {
    match format {
        OutputFormat::Json => print_json(&DumpOutput {
            source,
            measurements,
            summary,
        }),
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["SOURCE", "DIMS", "COMPLEX", "MEASUREMENTS", "MIN", "MAX"])
                .add_row(vec![
                    source.to_string(),
                    summary.dims.to_string(),
                    summary.complex.to_string(),
                    measurements.to_string(),
                    bound(summary.min),
                    bound(summary.max),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!("source={source} measurements={measurements}");
            print_summary_line("data", summary);
        }
    }
}

fn print_summary_line(label: &str, summary: &ArraySummary) {
    println!(
        "{label}: dims={} complex={} values={} min={} max={}",
        summary.dims,
        summary.complex,
        summary.values,
        bound(summary.min),
        bound(summary.max)
    );
}

fn print_json<T: Serialize>(value: &T) {
    println!(
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
    );
}

fn status(out: &ResponseOutput<'_>) -> &'static str {
    match out.success {
        None => "sent",
        Some(true) => "ok",
        Some(false) => "failed",
    }
}

fn bound(value: Option<f32>) -> String {
    value.map_or_else(|| "-".to_string(), |v| v.to_string())
}
