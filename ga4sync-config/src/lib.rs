//! Configuration loading and shared configuration types for the ga4sync loader.
//!
//! Configuration is layered: a `base` file, an environment-specific file
//! (`dev`/`prod`), and `APP_`-prefixed environment variable overrides applied
//! last.

mod load;
pub mod shared;

pub use load::{Environment, LoadConfigError, load_config};
