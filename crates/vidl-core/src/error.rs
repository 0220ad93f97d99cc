//! Categorized errors and exit-code mapping.
//!
//! Every failure in the pipeline is tagged with exactly one [`ErrorCategory`]
//! at the point where the kind of failure is first knowable. The category is
//! sticky: wrapping an already-categorized error again keeps the original
//! tag, and `anyhow::Context` layers added on the way up never hide it. The
//! CLI turns the category into a stable process exit code.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Semantic category of a pipeline failure.
///
/// This is a closed set; each category maps to one process exit code via
/// [`exit_code`]. External tooling depends on the mapping, so variants are
/// never renumbered or removed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Failure that never passed through a categorization boundary.
    Unknown,
    /// Malformed input URL or disallowed scheme.
    InvalidUrl,
    /// Structurally invalid output, or a requested format/strategy not available.
    Unsupported,
    /// Access denied by the remote side, or DRM detected before download.
    Restricted,
    /// Transport-layer failure reported by the transfer layer.
    Network,
    /// Local file I/O failure.
    Filesystem,
}

impl ErrorCategory {
    /// String form used in logs and machine-readable output.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::InvalidUrl => "invalid_url",
            Self::Unsupported => "unsupported",
            Self::Restricted => "restricted",
            Self::Network => "network",
            Self::Filesystem => "filesystem",
        }
    }
}

/// An error carrying a semantic category.
///
/// Constructed only through [`wrap_category`]; displays as its underlying
/// cause so user-facing messages stay unchanged by categorization.
#[derive(Debug, Error)]
#[error("{source}")]
pub struct CategorizedError {
    category: ErrorCategory,
    #[source]
    source: anyhow::Error,
}

impl CategorizedError {
    /// The category attached when this error was first recognized.
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        self.category
    }
}

/// Attach a category to an error, unless one is already present.
///
/// First writer wins: if a [`CategorizedError`] sits anywhere in the chain,
/// the error is returned unchanged.
#[must_use]
pub fn wrap_category(category: ErrorCategory, err: anyhow::Error) -> anyhow::Error {
    if is_categorized(&err) {
        return err;
    }
    anyhow::Error::new(CategorizedError {
        category,
        source: err,
    })
}

fn is_categorized(err: &anyhow::Error) -> bool {
    err.chain()
        .any(|cause| cause.downcast_ref::<CategorizedError>().is_some())
}

/// Result adapter for [`wrap_category`]; `Ok` values pass through untouched.
pub fn wrap_result<T>(category: ErrorCategory, result: anyhow::Result<T>) -> anyhow::Result<T> {
    result.map_err(|err| wrap_category(category, err))
}

/// Extract the category from an error chain.
///
/// Returns [`ErrorCategory::Unknown`] for `None` or for errors that never
/// passed through [`wrap_category`].
#[must_use]
pub fn category_of(err: Option<&anyhow::Error>) -> ErrorCategory {
    // Innermost tag wins: the chain runs outermost-first, and the category
    // assigned earliest sits deepest.
    err.and_then(|err| {
        err.chain()
            .filter_map(|cause| cause.downcast_ref::<CategorizedError>())
            .last()
    })
    .map_or(ErrorCategory::Unknown, CategorizedError::category)
}

/// Map an error to its stable process exit code.
///
/// The table is a fixed contract: `invalid_url` 2, `unsupported` 3,
/// `restricted` 4, `network` 5, `filesystem` 6, uncategorized 1, success 0.
#[must_use]
pub fn exit_code(err: Option<&anyhow::Error>) -> i32 {
    match category_of(err) {
        ErrorCategory::InvalidUrl => 2,
        ErrorCategory::Unsupported => 3,
        ErrorCategory::Restricted => 4,
        ErrorCategory::Network => 5,
        ErrorCategory::Filesystem => 6,
        ErrorCategory::Unknown => i32::from(err.is_some()),
    }
}

/// Stable marker prepended to recognized access-restriction messages.
pub const RESTRICTED_ACCESS_PREFIX: &str = "restricted access: ";

/// Phrases the extraction layer is known to emit for gated content.
const RESTRICTION_PHRASES: &[&str] = &[
    "private",
    "members only",
    "age-restricted",
    "sign in to confirm",
    "login required",
];

/// Recognize access-restriction wording in an uncategorized error.
///
/// The extraction layer surfaces restrictions as free-text messages; this
/// matches them case-insensitively and reclassifies the error as
/// [`ErrorCategory::Restricted`], prefixing the message with
/// [`RESTRICTED_ACCESS_PREFIX`]. Errors that do not match, or that already
/// carry a category, come back unchanged.
#[must_use]
pub fn wrap_access_error(err: anyhow::Error) -> anyhow::Error {
    if is_categorized(&err) {
        return err;
    }
    let message = err.to_string();
    let lowered = message.to_lowercase();
    if RESTRICTION_PHRASES
        .iter()
        .any(|phrase| lowered.contains(phrase))
    {
        return wrap_category(
            ErrorCategory::Restricted,
            anyhow::anyhow!("{RESTRICTED_ACCESS_PREFIX}{message}"),
        );
    }
    err
}

#[cfg(test)]
mod tests {
    use anyhow::anyhow;

    use super::*;

    #[test]
    fn test_first_assigned_category_wins() {
        let err = wrap_category(ErrorCategory::Network, anyhow!("connection reset"));
        let err = wrap_category(ErrorCategory::Filesystem, err);
        assert_eq!(category_of(Some(&err)), ErrorCategory::Network);
    }

    #[test]
    fn test_category_survives_context_layers() {
        let err = wrap_category(ErrorCategory::Restricted, anyhow!("drm detected"));
        let err = err.context("inspecting manifest").context("processing url");
        assert_eq!(category_of(Some(&err)), ErrorCategory::Restricted);

        // Re-wrapping the contextualized error still keeps the original tag.
        let err = wrap_category(ErrorCategory::Unsupported, err);
        assert_eq!(category_of(Some(&err)), ErrorCategory::Restricted);
    }

    #[test]
    fn test_message_unchanged_by_categorization() {
        let err = wrap_category(ErrorCategory::Filesystem, anyhow!("stat output: denied"));
        assert_eq!(err.to_string(), "stat output: denied");
    }

    #[test]
    fn test_category_of_uncategorized() {
        let plain = anyhow!("something went wrong");
        assert_eq!(category_of(Some(&plain)), ErrorCategory::Unknown);
        assert_eq!(category_of(None), ErrorCategory::Unknown);
    }

    #[test]
    fn test_exit_code_table() {
        let cases = [
            (ErrorCategory::InvalidUrl, 2),
            (ErrorCategory::Unsupported, 3),
            (ErrorCategory::Restricted, 4),
            (ErrorCategory::Network, 5),
            (ErrorCategory::Filesystem, 6),
        ];
        for (category, want) in cases {
            let err = wrap_category(category, anyhow!("boom"));
            assert_eq!(exit_code(Some(&err)), want, "category {category:?}");
        }
        assert_eq!(exit_code(Some(&anyhow!("uncategorized"))), 1);
        assert_eq!(exit_code(None), 0);
    }

    #[test]
    fn test_exit_code_same_category_same_code() {
        let first = wrap_category(ErrorCategory::Network, anyhow!("timeout"));
        let second = wrap_category(ErrorCategory::Network, anyhow!("connection refused"));
        assert_eq!(exit_code(Some(&first)), exit_code(Some(&second)));
    }

    #[test]
    fn test_wrap_result_passes_ok_through() {
        let ok: anyhow::Result<u32> = Ok(7);
        assert_eq!(wrap_result(ErrorCategory::Network, ok).unwrap(), 7);
    }

    #[test]
    fn test_access_error_recognized() {
        let cases = [
            "This video is private",
            "Members only content",
            "This video is age-restricted",
            "Sign in to confirm your age",
        ];
        for message in cases {
            let err = wrap_access_error(anyhow!("{message}"));
            assert_eq!(
                category_of(Some(&err)),
                ErrorCategory::Restricted,
                "message {message:?}"
            );
            assert!(
                err.to_string().starts_with(RESTRICTED_ACCESS_PREFIX),
                "expected marker prefix, got {:?}",
                err.to_string()
            );
            assert!(err.to_string().ends_with(message));
        }
    }

    #[test]
    fn test_access_error_unrelated_unchanged() {
        for message in ["network timeout", "something went wrong"] {
            let err = wrap_access_error(anyhow!("{message}"));
            assert_eq!(err.to_string(), message);
            assert_eq!(category_of(Some(&err)), ErrorCategory::Unknown);
        }
    }

    #[test]
    fn test_access_error_respects_existing_category() {
        // "private key" would match textually, but the error is already
        // tagged as a filesystem failure and must stay that way.
        let err = wrap_category(ErrorCategory::Filesystem, anyhow!("cannot read private key"));
        let err = wrap_access_error(err);
        assert_eq!(category_of(Some(&err)), ErrorCategory::Filesystem);
        assert!(!err.to_string().starts_with(RESTRICTED_ACCESS_PREFIX));
    }

    #[test]
    fn test_category_serialization() {
        let json = serde_json::to_string(&ErrorCategory::InvalidUrl).unwrap();
        assert_eq!(json, "\"invalid_url\"");
        let parsed: ErrorCategory = serde_json::from_str("\"restricted\"").unwrap();
        assert_eq!(parsed, ErrorCategory::Restricted);
        assert_eq!(parsed.as_str(), "restricted");
    }
}
