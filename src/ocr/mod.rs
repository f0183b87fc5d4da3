//! Text recognition for uploaded form images.
//!
//! - [`AzureReadClient`]: Azure Computer Vision Read API (asynchronous submit + poll)
//! - [`recognized_text`]: flattens recognized pages into newline-separated text
//!
//! Callers depend on the [`OcrService`] trait so that other services or test
//! fakes can stand in for the cloud client.

mod azure;
mod backend;
mod config;
mod text;

pub use azure::AzureReadClient;
pub use backend::{OcrError, OcrService};
pub use config::OcrConfig;
pub use text::{recognized_text, NO_TEXT_PLACEHOLDER};
