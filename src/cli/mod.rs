//! CLI command handlers for ParcelView.
//!
//! Besides `serve`, these give headless, scriptable access to the lookup and
//! export paths for automation and testing.

pub mod common;
pub mod config;
pub mod export;
pub mod query;
#[cfg(feature = "web")]
pub mod serve;

// Re-export types used by main.rs and tests
pub use common::{CliError, CliResult, ExitCode};
pub use config::{load_config, ConfigArgs};
pub use export::ExportArgs;
pub use query::QueryArgs;
#[cfg(feature = "web")]
pub use serve::ServeArgs;
