//! medform - medical form OCR and provisional-diagnosis extraction.
//!
//! The pipeline for each uploaded form image:
//!
//! 1. [`ocr`]: submit the image to the cloud Read API and poll for the result
//! 2. [`services::diagnosis`]: find the "provisional diagnosis" line
//! 3. [`llm`]: ask a language model for structured clinical fields
//! 4. [`services::batch`]: run files one at a time under a rate limit
//! 5. [`export`]: write the results as CSV, JSON or JSON Lines

pub mod config;
pub mod export;
pub mod llm;
pub mod models;
pub mod ocr;
pub mod rate_limit;
pub mod services;
