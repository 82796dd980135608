use mrirecon_config::ConfigStore;
use mrirecon_proto::SampleArray;

use crate::error::PluginError;
use crate::plugin::ReconPlugin;

/// Leaves the array untouched. Cannot be a pipeline root.
#[derive(Debug)]
pub struct Passthrough {
    alias: String,
}

impl Passthrough {
    pub const MODULE_ID: &'static str = "passthrough";

    pub fn new(alias: &str) -> Self {
        Self {
            alias: alias.to_string(),
        }
    }
}

impl ReconPlugin for Passthrough {
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
}
