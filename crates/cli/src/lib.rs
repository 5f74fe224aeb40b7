//! kinocheck CLI
//!
//! Command-line front end for running and listing verification checks.

pub mod commands;
pub mod output;
