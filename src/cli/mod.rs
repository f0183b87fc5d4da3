//! Command-line interface for medform.

mod commands;
pub mod icons;
pub mod progress;

pub use commands::{is_verbose, run};
