//! Kinocheck Common Library
//!
//! Data model and configuration shared by the verification layer and the CLI.

pub mod config;
pub mod error;
pub mod types;

pub use config::HarnessConfig;
pub use error::{Error, Result};
pub use types::*;
