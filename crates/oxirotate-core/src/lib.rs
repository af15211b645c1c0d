//! OxiRotate Core - Shared types, configuration, and error handling

pub mod config;
pub mod constants;
pub mod datefmt;
pub mod error;
pub mod size;
pub mod types;

pub use config::*;
pub use constants::*;
pub use error::{Error, Result};
pub use size::parse_size;
pub use types::*;
