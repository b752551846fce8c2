//! ChatRelay Common - shared configuration, errors, and logging.
//!
//! This crate holds the pieces every ChatRelay service-level crate needs:
//! the unified configuration file, the error taxonomy, and logging setup.

#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod logging;

pub use config::{config_dir, config_path, Config};
pub use error::{Error, Result};
pub use logging::init_logging;
