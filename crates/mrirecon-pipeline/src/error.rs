use std::fmt;

use mrirecon_config::ConfigError;
use mrirecon_proto::ProtoError;

/// Errors raised by a single plugin instance.
#[derive(Debug, thiserror::Error)]
pub enum PluginError {
    /// A parameter is present but unusable.
    #[error("invalid parameter {key:?}: {reason}")]
    InvalidParam { key: String, reason: String },

    /// A parameter did not parse.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The plugin does not implement this entry point.
    #[error("{0} is not supported by this plugin")]
    Unsupported(&'static str),

    /// Array or measurement handling failed.
    #[error(transparent)]
    Data(#[from] ProtoError),

    /// The plugin's own processing failed.
    #[error("{0}")]
    Failed(String),
}

/// One plugin that refused a configuration layer.
#[derive(Debug)]
pub struct ConfigureFailure {
    pub alias: String,
    pub error: PluginError,
}

impl fmt::Display for ConfigureFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.alias, self.error)
    }
}

/// Errors raised while assembling, configuring or running a pipeline.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// No constructor is registered under this module id.
    #[error("unknown plugin module {0:?}")]
    UnknownModule(String),

    /// Plugin aliases must be non-empty.
    #[error("plugin alias must not be empty")]
    EmptyAlias,

    /// A link or root names an alias that is not loaded.
    #[error("no plugin loaded under alias {0:?}")]
    UnknownAlias(String),

    /// The module constructor failed.
    #[error("failed to create {module} as {alias}: {source}")]
    Create {
        module: String,
        alias: String,
        source: PluginError,
    },

    /// `reconstruct` was called before a root was set.
    #[error("pipeline has no root plugin")]
    NoRoot,

    /// The root plugin cannot consume raw measurements.
    #[error("root plugin {0:?} cannot reconstruct from measurements")]
    RootCannotReconstruct(String),

    /// The successor chain revisits a plugin.
    #[error("cycle detected at plugin {0:?}")]
    Cycle(String),

    /// A plugin failed during reconstruction.
    #[error("plugin {alias} failed: {source}")]
    Stage { alias: String, source: PluginError },

    /// One or more plugins rejected a configuration layer.
    #[error("configuration rejected by {}", join_failures(.0))]
    Configure(Vec<ConfigureFailure>),

    /// A pipeline definition could not be loaded.
    #[error("invalid pipeline definition: {0}")]
    Definition(#[from] ConfigError),
}

fn join_failures(failures: &[ConfigureFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

pub type Result<T> = std::result::Result<T, PipelineError>;
