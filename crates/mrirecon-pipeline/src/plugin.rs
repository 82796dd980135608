use mrirecon_config::{ConfigStore, Scope};
use mrirecon_proto::{Measurement, SampleArray};

use crate::error::PluginError;

/// A processing stage.
///
/// Instances are created by a [`PluginRegistry`](crate::PluginRegistry)
/// with their alias and owned by one [`Pipeline`](crate::Pipeline).
pub trait ReconPlugin: Send {
    /// Module id this instance was created from.
    fn plugin_id(&self) -> &str;

    /// Instance name within its pipeline.
    fn alias(&self) -> &str;

    /// Apply one configuration layer.
    ///
    /// Called once per layer: the server's main configuration (`is_main`),
    /// the pipeline's own parameters, and the request's parameters
    /// (`is_final`). Later layers override earlier ones where they set a key.
    fn configure(
        &mut self,
        config: &ConfigStore,
        is_main: bool,
        is_final: bool,
    ) -> Result<(), PluginError>;

    /// Process `array` in place.
    fn reconstruct(&mut self, array: &mut SampleArray) -> Result<(), PluginError>;

    /// Build `array` from raw measurements.
    fn reconstruct_measurements(
        &mut self,
        measurements: &[Measurement],
        array: &mut SampleArray,
    ) -> Result<(), PluginError> {
        let _ = (measurements, array);
        Err(PluginError::Unsupported("reconstruction from measurements"))
    }

    /// Whether this plugin can be the root of a pipeline.
    fn can_reconstruct_from_measurements(&self) -> bool {
        false
    }

    /// Lookup scope for this instance's parameters.
    fn scope(&self) -> Scope<'_> {
        Scope::plugin(self.plugin_id(), self.alias())
    }
}

impl std::fmt::Debug for dyn ReconPlugin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReconPlugin")
            .field("plugin_id", &self.plugin_id())
            .field("alias", &self.alias())
            .finish()
    }
}
