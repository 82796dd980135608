use mrirecon_config::ConfigStore;
use mrirecon_proto::{scatter_all, Measurement, SampleArray};
use tracing::{debug, warn};

use crate::error::PluginError;
use crate::plugin::ReconPlugin;

/// Scatters raw measurements into the array at their indices.
///
/// Measurements that do not fit are skipped with a warning.
#[derive(Debug)]
pub struct SortCombine {
    alias: String,
}

impl SortCombine {
    pub const MODULE_ID: &'static str = "sort_combine";

    pub fn new(alias: &str) -> Self {
        Self {
            alias: alias.to_string(),
        }
    }
}

impl ReconPlugin for SortCombine {
    fn plugin_id(&self) -> &str {
        Self::MODULE_ID
    }

    fn alias(&self) -> &str {
        &self.alias
    }

    fn configure(&mut self, _: &ConfigStore, _: bool, _: bool) -> Result<(), PluginError> {
        Ok(())
    }

    fn reconstruct(&mut self, _: &mut SampleArray) -> Result<(), PluginError> {
        Ok(())
    }

    fn reconstruct_measurements(
        &mut self,
        measurements: &[Measurement],
        array: &mut SampleArray,
    ) -> Result<(), PluginError> {
        let placed = scatter_all(measurements, array);
        let skipped = measurements.len() - placed;
        if skipped > 0 {
            warn!(alias = %self.alias, skipped, placed, "some measurements did not fit the array");
        } else {
            debug!(alias = %self.alias, placed, "measurements sorted");
        }
        Ok(())
    }

    fn can_reconstruct_from_measurements(&self) -> bool {
        true
    }
}
