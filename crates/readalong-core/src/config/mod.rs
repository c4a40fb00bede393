//! Configuration loading for the narration engine.
//!
//! Settings live in a TOML file split into `[highlight]`, `[speech]` and
//! `[logging]` tables. Missing or invalid entries fall back to defaults so a
//! narration can always start.

mod defaults;
mod io;
mod models;
mod tables;

pub use io::{load_config, parse_config, serialize_config};
pub use models::{LogLevel, NarrationConfig};
