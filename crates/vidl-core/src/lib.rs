//! Core domain types for the vidl download pipeline.
//!
//! This crate contains pure data types and the error taxonomy shared by the
//! pipeline crates and the CLI. No networking or runtime dependencies allowed;
//! the only I/O surface is writing the format table to a caller-supplied
//! writer.
//!
//! # Structure
//!
//! - `error` - Categorized errors, exit-code mapping, access-restriction recognition
//! - `format` - Stream format metadata handed over by the extraction layer
//! - `input` - Input URL validation

#![deny(unused_crate_dependencies)]

pub mod error;
pub mod format;
pub mod input;

// Re-export commonly used types for convenience
pub use error::{
    CategorizedError, ErrorCategory, RESTRICTED_ACCESS_PREFIX, category_of, exit_code,
    wrap_access_error, wrap_category, wrap_result,
};
pub use format::{Format, write_formats};
pub use input::validate_input_url;
