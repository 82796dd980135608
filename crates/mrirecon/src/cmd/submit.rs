use std::path::Path;

use mrirecon_config::Scope;
use mrirecon_frame::{ChannelConfig, Dimensions, FrameChannel};
use mrirecon_proto::{
    receive_measurements, send_data, DataHeader, Measurement, ReconRequest, SampleArray,
};
use mrirecon_server::{ReconClient, ReconResponse};
use mrirecon_transport::FileTransport;
use tracing::{debug, info};

use crate::cmd::SubmitArgs;
use crate::exit::{
    channel_error, client_error, data_error, stream_error, transport_error, CliError, CliResult,
    FAILURE, SUCCESS, USAGE,
};
use crate::output::{print_response, OutputFormat};

pub fn run(args: SubmitArgs, format: OutputFormat) -> CliResult<i32> {
    let mut request = ReconRequest::new(args.pipeline.as_str());
    request.silent = args.silent;
    for param in &args.params {
        let (alias, key, value) = parse_param(param)?;
        request
            .config
            .set(Scope::new(None, alias), key, value)
            .map_err(|err| CliError::new(USAGE, format!("invalid --param {param:?}: {err}")))?;
    }

    let client = ReconClient::connect(args.addr.as_str())
        .map_err(|err| client_error("connect failed", err))?;

    let response = match &args.input {
        Some(path) => {
            let (header, measurements) = read_stream(path)?;
            info!(count = measurements.len(), dims = %header.dims, "submitting stream file");
            client.submit(&request, &header, &measurements)
        }
        None => {
            let array = synthetic(&args.dims, args.complex)?;
            info!(dims = %array.dims(), "submitting synthetic dataset");
            client.submit_array(&request, &array)
        }
    }
    .map_err(|err| client_error("submit failed", err))?;

    if let (Some(path), Some(data)) = (&args.output, &response.data) {
        write_stream(path, data)?;
    }

    print_response(&request.pipeline, &response, format);
    Ok(exit_code(&response))
}

fn exit_code(response: &ReconResponse) -> i32 {
    match &response.ack {
        Some(ack) if !ack.success => FAILURE,
        _ => SUCCESS,
    }
}

/// Split `[alias:]key=value`.
fn parse_param(param: &str) -> CliResult<(Option<&str>, &str, &str)> {
    let Some((name, value)) = param.split_once('=') else {
        return Err(CliError::new(
            USAGE,
            format!("invalid --param {param:?}: expected [ALIAS:]KEY=VALUE"),
        ));
    };
    match name.split_once(':') {
        Some((alias, key)) => Ok((Some(alias), key, value)),
        None => Ok((None, name, value)),
    }
}

/// Ramp dataset of shape `columns,lines,channels`.
fn synthetic(dims: &[u32], complex: bool) -> CliResult<SampleArray> {
    let &[columns, lines, channels] = dims else {
        return Err(CliError::new(
            USAGE,
            format!("--dims takes 3 values (columns,lines,channels), got {}", dims.len()),
        ));
    };
    let dims = Dimensions::with_extent(columns, lines, channels);
    let count = SampleArray::value_count(&dims, complex)
        .map_err(|err| CliError::new(USAGE, format!("invalid --dims: {err}")))?;
    let values = (0..count).map(|v| v as f32).collect();
    SampleArray::from_vec(dims, complex, values).map_err(|err| data_error("dataset", err))
}

/// Read a stream file: a data header, measurements and the end signal.
pub fn read_stream(path: &Path) -> CliResult<(DataHeader, Vec<Measurement>)> {
    let file = FileTransport::open_input(path)
        .map_err(|err| transport_error("cannot open input", err))?;
    let mut channel = FrameChannel::with_config(file, ChannelConfig::file());
    let header = channel
        .receive_as::<DataHeader>()
        .map_err(|err| channel_error("cannot read data header", err))?;
    let measurements = receive_measurements(&mut channel)
        .map_err(|err| stream_error("cannot read measurements", err))?;
    Ok((header, measurements))
}

fn write_stream(path: &Path, data: &SampleArray) -> CliResult<()> {
    let file = FileTransport::open_output(path)
        .map_err(|err| transport_error("cannot open output", err))?;
    let mut channel = FrameChannel::with_config(file, ChannelConfig::file());
    send_data(&mut channel, data).map_err(|err| stream_error("cannot write result", err))?;
    channel
        .into_inner()
        .close_output()
        .map_err(|err| transport_error("cannot write result", err))?;
    debug!(path = %path.display(), "result written");
    Ok(())
}
