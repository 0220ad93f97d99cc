//! Download-pipeline services around a transfer.
//!
//! The actual byte transfer lives elsewhere; this crate covers everything
//! the pipeline does around it, in lifecycle order:
//!
//! - `manifest` - pre-download DRM/encryption detection on HLS and DASH manifests
//! - `progress` - concurrent progress rendering during the transfer
//! - `validate` - post-download structural validation of the output file
//!
//! All failures are categorized through `vidl_core::error` so the CLI can
//! map them to stable exit codes.

pub mod manifest;
pub mod progress;
pub mod validate;

// Re-export the surface the CLI and transfer workers use
pub use manifest::{DrmReport, HlsManifest, detect_dash_drm, parse_hls_manifest};
pub use progress::{BarId, ProgressRenderer};
pub use validate::validate_output_file;
