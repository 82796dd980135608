//! Built-in plugin modules.

mod passthrough;
mod scale;
mod sort_combine;

pub use passthrough::Passthrough;
pub use scale::Scale;
pub use sort_combine::SortCombine;

use crate::plugin::ReconPlugin;
use crate::registry::PluginRegistry;

pub(crate) fn register_builtins(registry: &mut PluginRegistry) {
    registry.register(SortCombine::MODULE_ID, |alias: &str| {
        Ok(Box::new(SortCombine::new(alias)) as Box<dyn ReconPlugin>)
    });
    registry.register(Passthrough::MODULE_ID, |alias: &str| {
        Ok(Box::new(Passthrough::new(alias)) as Box<dyn ReconPlugin>)
    });
    registry.register(Scale::MODULE_ID, |alias: &str| {
        Ok(Box::new(Scale::new(alias)) as Box<dyn ReconPlugin>)
    });
}
