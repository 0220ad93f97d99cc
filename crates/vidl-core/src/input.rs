//! Input URL validation.
//!
//! Runs before anything else in the pipeline: the extraction layer only
//! ever sees URLs that parsed cleanly and use a scheme we can fetch.

use anyhow::anyhow;
use url::Url;

use crate::error::{ErrorCategory, wrap_category};

/// Validate a user-supplied video URL.
///
/// Accepts absolute `http`/`https` URLs with a host; everything else fails
/// with an [`ErrorCategory::InvalidUrl`] error.
pub fn validate_input_url(raw: &str) -> anyhow::Result<Url> {
    let trimmed = raw.trim();
    let parsed = match Url::parse(trimmed) {
        Ok(parsed) => parsed,
        Err(err) => {
            return Err(wrap_category(
                ErrorCategory::InvalidUrl,
                anyhow!("invalid url {trimmed:?}: {err}"),
            ));
        }
    };
    match parsed.scheme() {
        "http" | "https" => {
            if parsed.host_str().is_none_or(str::is_empty) {
                return Err(wrap_category(
                    ErrorCategory::InvalidUrl,
                    anyhow!("invalid url {trimmed:?}: missing host"),
                ));
            }
            Ok(parsed)
        }
        scheme => Err(wrap_category(
            ErrorCategory::InvalidUrl,
            anyhow!("invalid url {trimmed:?}: scheme must be http or https, got {scheme:?}"),
        )),
    }
}

#[cfg(test)]
mod tests {
    use crate::error::category_of;

    use super::*;

    #[test]
    fn test_validate_url() {
        let cases = [
            ("https://www.youtube.com/watch?v=dQw4w9WgXcQ", true),
            ("http://example.com/video.mp4", true),
            ("  https://example.com/video  ", true),
            ("www.youtube.com/watch?v=dQw4w9WgXcQ", false),
            ("ftp://example.com/video", false),
            ("file:///tmp/video.mp4", false),
            ("", false),
        ];
        for (input, want_ok) in cases {
            let result = validate_input_url(input);
            assert_eq!(result.is_ok(), want_ok, "input {input:?}");
            if let Err(err) = result {
                assert_eq!(category_of(Some(&err)), ErrorCategory::InvalidUrl);
            }
        }
    }
}
