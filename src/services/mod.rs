//! Service layer: diagnosis lookup and batch processing.
//!
//! Separated from presentation so the CLI, tests or another front end can
//! drive the same pipeline.

pub mod batch;
pub mod diagnosis;

pub use batch::{
    BatchError, BatchOptions, BatchProcessor, ExtractedDiagnosisMode, FallbackPolicy, FileStage,
};
pub use diagnosis::{extract_provisional_diagnosis, NOT_FOUND};
