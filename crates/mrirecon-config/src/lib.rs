//! Configuration store with global, per-module and per-instance scopes.
//!
//! Values are strings; typed getters parse on demand. Writes are
//! insert-only: the first value stored for a key wins, later `set` calls
//! and merges leave it alone.

pub mod error;
pub mod file;
pub mod store;
mod wire;

pub use error::{ConfigError, Result};
pub use file::{read_capped, ConfigDocument, ParamSet, MAX_CONFIG_FILE_SIZE};
pub use store::{ConfigStore, Scope};
