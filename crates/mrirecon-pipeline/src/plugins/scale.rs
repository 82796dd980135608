use mrirecon_config::ConfigStore;
use mrirecon_proto::SampleArray;
use tracing::debug;

use crate::error::PluginError;
use crate::plugin::ReconPlugin;

/// Multiplies every sample by `factor` (default 1.0).
#[derive(Debug)]
pub struct Scale {
    alias: String,
    factor: f64,
}

impl Scale {
    pub const MODULE_ID: &'static str = "scale";

    pub fn new(alias: &str) -> Self {
        Self {
            alias: alias.to_string(),
            factor: 1.0,
        }
    }

    pub fn factor(&self) -> f64 {
        self.factor
    }
}

impl ReconPlugin for Scale {
    fn plugin_id(&self) -> &str {
        Self::MODULE_ID
    }

    fn alias(&self) -> &str {
        &self.alias
    }

    fn configure(&mut self, config: &ConfigStore, _: bool, _: bool) -> Result<(), PluginError> {
        let Some(factor) = config.get_float(self.scope(), "factor")? else {
            return Ok(());
        };
        if !factor.is_finite() {
            return Err(PluginError::InvalidParam {
                key: "factor".into(),
                reason: format!("{factor} is not finite"),
            });
        }
        debug!(alias = %self.alias, factor, "scale configured");
        self.factor = factor;
        Ok(())
    }

    fn reconstruct(&mut self, array: &mut SampleArray) -> Result<(), PluginError> {
        let factor = self.factor as f32;
        for value in array.data_mut() {
            *value *= factor;
        }
        Ok(())
    }
}
