//! Streaming-manifest inspection.
//!
//! Runs before any bytes are fetched: an HLS playlist declaring an
//! encryption key, or a DASH manifest carrying a known DRM scheme, means
//! the download cannot produce a playable file and the pipeline aborts with
//! a `restricted` error instead of wasting the transfer.
//!
//! Both inspectors are pure functions over manifest bytes. Failures here
//! are never transient; there is nothing to retry.

use anyhow::anyhow;
use serde::{Deserialize, Serialize};
use tracing::debug;

use vidl_core::{ErrorCategory, wrap_category};

/// Widevine DRM system identifier.
pub const WIDEVINE_SYSTEM_ID: &str = "edef8ba9-79d6-4ace-a3c8-27dcd51d21ed";
/// `PlayReady` DRM system identifier.
pub const PLAYREADY_SYSTEM_ID: &str = "9a04f079-9840-4286-ab92-e65be0885f95";
/// `FairPlay` DRM system identifier.
pub const FAIRPLAY_SYSTEM_ID: &str = "94ce86fb-07ff-4f43-adb8-93d2fa968ca2";

const DRM_SYSTEM_IDS: &[&str] = &[WIDEVINE_SYSTEM_ID, PLAYREADY_SYSTEM_ID, FAIRPLAY_SYSTEM_ID];

/// Encryption signaling extracted from an HLS playlist.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HlsManifest {
    /// Whether the playlist declares an encryption key.
    pub encrypted: bool,
    /// Key method from the first key directive (e.g. `AES-128`).
    pub key_method: String,
    /// Key location from the first key directive.
    pub key_uri: String,
}

/// DRM signaling extracted from a DASH manifest.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrmReport {
    /// Whether any known DRM system identifier was found.
    pub detected: bool,
    /// The matched scheme URIs, for diagnostics.
    pub scheme_uris: Vec<String>,
}

/// Scan an HLS playlist for encryption-key directives.
///
/// The first `#EXT-X-KEY` directive wins; a playlist without one is
/// reported as cleartext. Text without the `#EXTM3U` header fails as
/// `unsupported`.
pub fn parse_hls_manifest(data: &[u8]) -> anyhow::Result<HlsManifest> {
    let text = String::from_utf8_lossy(data);
    let mut lines = text.lines().map(str::trim).filter(|line| !line.is_empty());
    if !lines.next().is_some_and(|line| line.starts_with("#EXTM3U")) {
        return Err(wrap_category(
            ErrorCategory::Unsupported,
            anyhow!("not an hls playlist: missing #EXTM3U header"),
        ));
    }

    let mut manifest = HlsManifest::default();
    for line in lines {
        let Some(attrs) = line.strip_prefix("#EXT-X-KEY:") else {
            continue;
        };
        let method = attr_value(attrs, "METHOD").unwrap_or_default();
        if method.eq_ignore_ascii_case("NONE") {
            // An explicit cleartext directive only covers the segments that
            // follow it; keep scanning in case a later directive encrypts.
            continue;
        }
        manifest.encrypted = true;
        manifest.key_method = method.to_string();
        manifest.key_uri = attr_value(attrs, "URI").unwrap_or_default().to_string();
        debug!(method = %manifest.key_method, "hls playlist declares encryption");
        break;
    }
    Ok(manifest)
}

/// Extract one attribute value from an HLS tag's attribute list.
///
/// Quoted values run to the closing quote (they may contain commas);
/// unquoted values run to the next comma.
fn attr_value<'a>(attrs: &'a str, name: &str) -> Option<&'a str> {
    let needle = format!("{name}=");
    let start = attrs.find(&needle)? + needle.len();
    let rest = &attrs[start..];
    if let Some(quoted) = rest.strip_prefix('"') {
        let end = quoted.find('"')?;
        Some(&quoted[..end])
    } else {
        let end = rest.find(',').unwrap_or(rest.len());
        Some(&rest[..end])
    }
}

/// Scan a DASH manifest for content-protection scheme identifiers.
///
/// This is a substring scan, not a validating XML parse: a manifest mangled
/// enough to break an XML parser can still carry real DRM signaling, and
/// missing real DRM is worse than a spurious abort. Matching is
/// case-insensitive; the matched URIs are reported in document order.
#[must_use]
pub fn detect_dash_drm(data: &[u8]) -> DrmReport {
    const ATTR: &str = "schemeiduri";

    let text = String::from_utf8_lossy(data);
    let lower = text.to_ascii_lowercase();
    let bytes = lower.as_bytes();

    let mut scheme_uris: Vec<String> = Vec::new();
    let mut offset = 0;
    while let Some(found) = lower[offset..].find(ATTR) {
        let mut cursor = offset + found + ATTR.len();
        while bytes.get(cursor).is_some_and(|b| *b == b' ' || *b == b'=') {
            cursor += 1;
        }
        let (start, end) = match bytes.get(cursor) {
            Some(&quote @ (b'"' | b'\'')) => {
                let start = cursor + 1;
                let end = lower[start..]
                    .find(quote as char)
                    .map_or(lower.len(), |pos| start + pos);
                (start, end)
            }
            _ => {
                let end = lower[cursor..]
                    .find(|c: char| c.is_ascii_whitespace() || c == '>' || c == '/')
                    .map_or(lower.len(), |pos| cursor + pos);
                (cursor, end)
            }
        };
        let value = &text[start..end];
        if is_drm_scheme(value) && !scheme_uris.iter().any(|seen| seen == value) {
            scheme_uris.push(value.to_string());
        }
        offset = end.max(cursor);
    }

    if !scheme_uris.is_empty() {
        debug!(schemes = ?scheme_uris, "dash manifest carries drm signaling");
    }
    DrmReport {
        detected: !scheme_uris.is_empty(),
        scheme_uris,
    }
}

fn is_drm_scheme(value: &str) -> bool {
    let lowered = value.to_ascii_lowercase();
    DRM_SYSTEM_IDS.iter().any(|id| lowered.contains(id))
}
