//! Configuration and preset resolution: layers built-in defaults, an
//! optional TOML config file, environment variables, and CLI flags into one
//! `RuntimeConfig`, and resolves `--preset` shorthands. Never makes a
//! network call.

mod install;
mod presets;
mod pricing;
mod runtime;

pub use install::{default_config_path, install};
pub use presets::list_presets;
pub use pricing::load_pricing_catalog;
pub use runtime::{CliArgs, RuntimeConfig};
