use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use mrirecon_config::ConfigStore;
use mrirecon_frame::{Dimensions, FrameChannel};
use mrirecon_pipeline::{PipelineDefinition, PluginRegistry};
use mrirecon_proto::{
    receive_measurements, send_data, widen_dims, DataHeader, ReconAck, ReconRequest, SampleArray,
};
use mrirecon_transport::Transport;
use tracing::{debug, info, warn};

use crate::error::SessionError;

/// Stage of the request lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    AwaitingRequest,
    AwaitingHeader,
    AwaitingMeasurements,
    LoadingPipelineDefinition,
    Configuring,
    Reconstructing,
    Responding,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Idle => "idle",
            SessionState::AwaitingRequest => "awaiting-request",
            SessionState::AwaitingHeader => "awaiting-header",
            SessionState::AwaitingMeasurements => "awaiting-measurements",
            SessionState::LoadingPipelineDefinition => "loading-pipeline",
            SessionState::Configuring => "configuring",
            SessionState::Reconstructing => "reconstructing",
            SessionState::Responding => "responding",
        };
        f.write_str(name)
    }
}

/// Read-only state shared by every session of a server.
#[derive(Debug)]
pub struct ServerContext {
    pub main_config: ConfigStore,
    pub registry: Arc<PluginRegistry>,
    pub pipeline_dir: PathBuf,
}

impl ServerContext {
    pub fn new(
        main_config: ConfigStore,
        registry: Arc<PluginRegistry>,
        pipeline_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            main_config,
            registry,
            pipeline_dir: pipeline_dir.into(),
        }
    }

    /// Definition file for `name`, refusing names that could leave the
    /// pipeline directory.
    pub fn pipeline_path(&self, name: &str) -> Result<PathBuf, SessionError> {
        let valid = !name.is_empty()
            && !name.contains(['/', '\\', '\0'])
            && !name.contains("..");
        if !valid {
            return Err(SessionError::PipelineName(name.to_string()));
        }
        Ok(self.pipeline_dir.join(format!("{name}.json")))
    }
}

/// What a finished session did.
#[derive(Debug, Clone)]
pub struct SessionReport {
    pub pipeline: Option<String>,
    pub ack: ReconAck,
    pub silent: bool,
    pub dims: Option<Dimensions>,
    /// Whether the client confirmed receipt of the result.
    pub confirmed: bool,
}

struct Outcome {
    request: Option<ReconRequest>,
    result: Result<SampleArray, SessionError>,
}

/// One client connection, processed to completion by [`run`](Self::run).
pub struct Session<'a, T> {
    channel: FrameChannel<T>,
    context: &'a ServerContext,
    state: SessionState,
}

impl<'a, T: Transport> Session<'a, T> {
    pub fn new(channel: FrameChannel<T>, context: &'a ServerContext) -> Self {
        Self {
            channel,
            context,
            state: SessionState::Idle,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Serve one request.
    ///
    /// Every failure is reported to the client in the acknowledgement
    /// rather than returned. The returned report describes the outcome.
    pub fn run(&mut self) -> SessionReport {
        self.channel.purge();
        let outcome = self.try_reconstruct();

        self.enter(SessionState::Responding);
        let silent = outcome.request.as_ref().is_some_and(|r| r.silent);
        let pipeline = outcome.request.map(|r| r.pipeline);
        let (ack, array) = match outcome.result {
            Ok(array) => (ReconAck::ok("reconstruction succeeded"), Some(array)),
            Err(err) => {
                warn!(error = %err, "request failed");
                (ReconAck::failed(err.to_string()), None)
            }
        };

        let confirmed = if silent {
            false
        } else {
            self.respond(&ack, array.as_ref())
        };

        self.enter(SessionState::Idle);
        info!(
            pipeline = pipeline.as_deref().unwrap_or("-"),
            success = ack.success,
            silent,
            "session finished"
        );
        SessionReport {
            pipeline,
            silent,
            dims: array.as_ref().map(|a| *a.dims()),
            ack,
            confirmed,
        }
    }

    /// Consume the session and return its channel.
    pub fn into_channel(self) -> FrameChannel<T> {
        self.channel
    }

    fn enter(&mut self, next: SessionState) {
        debug!(from = %self.state, to = %next, "session state");
        self.state = next;
    }

    fn try_reconstruct(&mut self) -> Outcome {
        self.enter(SessionState::AwaitingRequest);
        let request = match self.channel.receive_as::<ReconRequest>() {
            Ok(request) => request,
            Err(err) => {
                return Outcome {
                    request: None,
                    result: Err(SessionError::Request(err)),
                }
            }
        };
        info!(pipeline = %request.pipeline, silent = request.silent, "request received");

        let result = self.process(&request);
        Outcome {
            request: Some(request),
            result,
        }
    }

    fn process(&mut self, request: &ReconRequest) -> Result<SampleArray, SessionError> {
        self.enter(SessionState::AwaitingHeader);
        let header = self
            .channel
            .receive_as::<DataHeader>()
            .map_err(SessionError::Header)?;

        self.enter(SessionState::AwaitingMeasurements);
        let measurements =
            receive_measurements(&mut self.channel).map_err(SessionError::Measurements)?;
        debug!(count = measurements.len(), dims = %header.dims, "measurements received");

        self.enter(SessionState::LoadingPipelineDefinition);
        let name = request.pipeline.as_str();
        let path = self.context.pipeline_path(name)?;
        let definition = PipelineDefinition::load(&path).map_err(|source| SessionError::PipelineLoad {
            name: name.to_string(),
            source,
        })?;
        let mut pipeline = definition
            .build(Arc::clone(&self.context.registry))
            .map_err(|source| SessionError::PipelineLoad {
                name: name.to_string(),
                source,
            })?;
        let pipeline_config =
            definition
                .config_store()
                .map_err(|source| SessionError::PipelineConfig {
                    name: name.to_string(),
                    source,
                })?;

        self.enter(SessionState::Configuring);
        pipeline
            .configure(&self.context.main_config, true, false)
            .map_err(SessionError::MainConfig)?;
        pipeline
            .configure(&pipeline_config, false, false)
            .map_err(SessionError::PipelineConfigRejected)?;
        pipeline
            .configure(&request.config, false, true)
            .map_err(SessionError::RequestConfig)?;

        self.enter(SessionState::Reconstructing);
        let dims = widen_dims(&header.dims, &measurements);
        let mut array = SampleArray::new(dims, header.complex).map_err(SessionError::Allocate)?;
        pipeline
            .reconstruct(&measurements, &mut array)
            .map_err(SessionError::Reconstruct)?;
        Ok(array)
    }

    /// Send the acknowledgement and, with a result, the dataset. Returns
    /// whether the client confirmed the result.
    fn respond(&mut self, ack: &ReconAck, array: Option<&SampleArray>) -> bool {
        if let Err(err) = self.channel.send(ack) {
            warn!(error = %err, "failed to send acknowledgement");
            return false;
        }

        let Some(array) = array else {
            return false;
        };
        if let Err(err) = send_data(&mut self.channel, array) {
            warn!(error = %err, "failed to send result");
            return false;
        }

        match self.channel.receive_as::<ReconAck>() {
            Ok(reply) => {
                debug!(success = reply.success, message = %reply.message, "client acknowledged result");
                true
            }
            Err(err) => {
                warn!(error = %err, "client did not acknowledge result");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use mrirecon_config::Scope;
    use mrirecon_proto::{send_measurements, EndSignal, Measurement};
    use mrirecon_transport::Connection;

    use super::*;

    const SORT_ONLY: &str = r#"{
        "plugins": [ { "id": "sort_combine", "alias": "sorter" } ],
        "root": "sorter"
    }"#;

    const SORT_SCALE: &str = r#"{
        "plugins": [
            { "id": "sort_combine", "alias": "sorter" },
            { "id": "scale", "alias": "gain" }
        ],
        "root": "sorter",
        "links": [ { "input": "sorter", "output": "gain" } ],
        "config": [ { "plugin_alias": "gain", "params": { "factor": 2 } } ]
    }"#;

    const NO_ROOT: &str = r#"{ "plugins": [ { "id": "passthrough", "alias": "p" } ] }"#;

    fn context(main: ConfigStore) -> (tempfile::TempDir, ServerContext) {
        let dir = tempfile::tempdir().unwrap();
        for (name, body) in [
            ("sort", SORT_ONLY),
            ("sort_scale", SORT_SCALE),
            ("no_root", NO_ROOT),
        ] {
            std::fs::write(dir.path().join(format!("{name}.json")), body).unwrap();
        }
        let ctx = ServerContext::new(
            main,
            Arc::new(PluginRegistry::with_builtins()),
            dir.path(),
        );
        (dir, ctx)
    }

    fn lines(count: u32, samples: u32) -> Vec<Measurement> {
        (0..count)
            .map(|line| {
                let values = (0..samples).map(|s| (line * samples + s) as f32).collect();
                let mut index = Dimensions::zero();
                index.line = line;
                Measurement::from_values(index, samples, 1, false, values).unwrap()
            })
            .collect()
    }

    /// Sends a full job and returns the client end for inspection.
    fn submit(
        ctx: &ServerContext,
        request: ReconRequest,
        header: Dimensions,
        measurements: &[Measurement],
    ) -> (SessionReport, FrameChannel<Connection>) {
        let (client, server) = Connection::pair().unwrap();
        let mut client = FrameChannel::new(client);
        client.send(&request).unwrap();
        client
            .send(&DataHeader {
                dims: header,
                complex: false,
            })
            .unwrap();
        send_measurements(&mut client, measurements).unwrap();

        std::thread::scope(|scope| {
            let handle = scope.spawn(|| Session::new(FrameChannel::new(server), ctx).run());
            let ack = client.receive_as::<ReconAck>();
            if matches!(ack, Ok(ReconAck { success: true, .. })) {
                client.receive_as::<DataHeader>().unwrap();
                let _ = receive_measurements(&mut client).unwrap();
                client.send(&ReconAck::ok("got it")).unwrap();
            }
            let report = handle.join().unwrap();
            (report, client)
        })
    }

    #[test]
    fn identity_pipeline_succeeds() {
        let (_dir, ctx) = context(ConfigStore::new());
        let (report, _) = submit(
            &ctx,
            ReconRequest::new("sort"),
            Dimensions::with_extent(4, 2, 1),
            &lines(2, 4),
        );
        assert!(report.ack.success, "{}", report.ack.message);
        assert!(report.confirmed);
        assert_eq!(report.dims, Some(Dimensions::with_extent(4, 2, 1)));
    }

    #[test]
    fn header_is_widened_to_fit_measurements() {
        let (_dir, ctx) = context(ConfigStore::new());
        let (report, _) = submit(
            &ctx,
            ReconRequest::new("sort"),
            Dimensions::with_extent(4, 1, 1),
            &lines(3, 4),
        );
        assert!(report.ack.success);
        assert_eq!(report.dims.map(|d| d.line), Some(3));
    }

    #[test]
    fn missing_pipeline_is_reported_in_ack() {
        let (_dir, ctx) = context(ConfigStore::new());
        let (report, _) = submit(
            &ctx,
            ReconRequest::new("nope"),
            Dimensions::with_extent(4, 1, 1),
            &lines(1, 4),
        );
        assert!(!report.ack.success);
        assert!(report.ack.message.contains("failed to load pipeline \"nope\""));
        assert!(!report.confirmed);
    }

    #[test]
    fn long_pipeline_name_still_gets_an_ack() {
        let (_dir, ctx) = context(ConfigStore::new());
        let name = "a".repeat(600);
        let (client, server) = Connection::pair().unwrap();
        let mut client = FrameChannel::new(client);
        client.send(&ReconRequest::new(name.clone())).unwrap();
        client
            .send(&DataHeader {
                dims: Dimensions::with_extent(4, 1, 1),
                complex: false,
            })
            .unwrap();
        send_measurements(&mut client, &lines(1, 4)).unwrap();

        let report = Session::new(FrameChannel::new(server), &ctx).run();
        assert!(!report.ack.success);
        assert_eq!(report.pipeline.as_deref(), Some(name.as_str()));

        let ack = client.receive_as::<ReconAck>().unwrap();
        assert!(!ack.success);
        assert!(ack.message.starts_with("failed to load pipeline"));
        assert!(ack.message.len() < mrirecon_frame::MAX_STRING_LEN);
        assert_eq!(ack, report.ack);
    }

    #[test]
    fn traversal_names_are_refused() {
        let (_dir, ctx) = context(ConfigStore::new());
        for name in ["../etc/passwd", "a/b", ""] {
            assert!(matches!(
                ctx.pipeline_path(name),
                Err(SessionError::PipelineName(_))
            ));
        }
        assert!(ctx.pipeline_path("sort").unwrap().ends_with("sort.json"));
    }

    #[test]
    fn root_without_measurement_support_fails_reconstruction() {
        let (_dir, ctx) = context(ConfigStore::new());
        let (report, _) = submit(
            &ctx,
            ReconRequest::new("no_root"),
            Dimensions::with_extent(4, 1, 1),
            &lines(1, 4),
        );
        assert!(!report.ack.success);
        assert!(report.ack.message.starts_with("reconstruction failed"));
    }

    #[test]
    fn config_layers_report_their_stage() {
        let mut main = ConfigStore::new();
        main.set(Scope::alias("gain"), "factor", "oops").unwrap();
        let (_dir, ctx) = context(main);

        let (report, _) = submit(
            &ctx,
            ReconRequest::new("sort_scale"),
            Dimensions::with_extent(2, 1, 1),
            &lines(1, 2),
        );
        assert!(!report.ack.success);
        assert!(report.ack.message.starts_with("main configuration rejected"));

        let (_dir, ctx) = context(ConfigStore::new());
        let mut request = ReconRequest::new("sort_scale");
        request.config.set(Scope::alias("gain"), "factor", "nan").unwrap();
        let (report, _) = submit(&ctx, request, Dimensions::with_extent(2, 1, 1), &lines(1, 2));
        assert!(report.ack.message.starts_with("request configuration rejected"));
    }

    #[test]
    fn silent_request_gets_no_reply() {
        let (_dir, ctx) = context(ConfigStore::new());
        let (client, server) = Connection::pair().unwrap();
        let mut client = FrameChannel::new(client);
        let mut request = ReconRequest::new("sort");
        request.silent = true;
        client.send(&request).unwrap();
        client
            .send(&DataHeader {
                dims: Dimensions::with_extent(2, 1, 1),
                complex: false,
            })
            .unwrap();
        send_measurements(&mut client, &lines(1, 2)).unwrap();

        let mut session = Session::new(FrameChannel::new(server), &ctx);
        let report = session.run();
        assert!(report.ack.success);
        assert!(report.silent);
        assert_eq!(session.state(), SessionState::Idle);
        drop(session);

        assert!(client.receive_as::<ReconAck>().is_err());
    }

    #[test]
    fn premature_disconnect_fails_measurement_stage() {
        let (_dir, ctx) = context(ConfigStore::new());
        let (client, server) = Connection::pair().unwrap();
        let mut client = FrameChannel::new(client);
        client.send(&ReconRequest::new("sort")).unwrap();
        client
            .send(&DataHeader {
                dims: Dimensions::with_extent(2, 1, 1),
                complex: false,
            })
            .unwrap();
        client.send(&lines(1, 2)[0]).unwrap();
        drop(client);

        let report = Session::new(FrameChannel::new(server), &ctx).run();
        assert!(!report.ack.success);
        assert!(report.ack.message.starts_with("failed to receive measurements"));
        assert!(!report.confirmed);
    }

    #[test]
    fn wrong_first_message_fails_request_stage() {
        let (_dir, ctx) = context(ConfigStore::new());
        let (client, server) = Connection::pair().unwrap();
        let mut client = FrameChannel::new(client);
        client.send(&EndSignal).unwrap();

        let report = Session::new(FrameChannel::new(server), &ctx).run();
        assert!(!report.ack.success);
        assert!(report.pipeline.is_none());

        let ack = client.receive_as::<ReconAck>().unwrap();
        assert!(ack.message.starts_with("failed to receive reconstruction request"));
        assert!(client.peek_kind().is_err());
    }
}
