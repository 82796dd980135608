//! Reconstruction pipelines assembled from named plugin instances.
//!
//! A [`PluginRegistry`] maps module ids to constructors. A [`Pipeline`]
//! owns instances keyed by alias, a root that consumes raw measurements,
//! and single-successor links that form the processing chain.

pub mod definition;
pub mod error;
pub mod pipeline;
pub mod plugin;
pub mod plugins;
pub mod registry;

pub use definition::{LinkEntry, PipelineDefinition, PluginEntry};
pub use error::{ConfigureFailure, PipelineError, PluginError, Result};
pub use pipeline::Pipeline;
pub use plugin::ReconPlugin;
pub use registry::{PluginFactory, PluginRegistry};
