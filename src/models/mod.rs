//! Data models for medform.

mod fields;
mod page;
mod result;
mod upload;

pub use fields::{FieldError, StructuredFields};
pub use page::{RecognizedLine, RecognizedPage, RecognizedWord};
pub use result::{ProcessingResult, ProcessingStatus, ERROR_OCCURRED};
pub use upload::UploadedFile;
