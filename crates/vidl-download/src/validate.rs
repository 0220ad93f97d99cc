//! Post-download output validation.
//!
//! A byte-count match from the transfer layer does not guarantee a playable
//! file: servers return short 200 responses and proxies truncate. A cheap
//! structural sniff of the leading bytes catches that class of silent
//! corruption without a full demux.
//!
//! Read failures are categorized `filesystem`, structural mismatches
//! `unsupported`; nothing leaves this module uncategorized.

use std::fs::{self, File};
use std::io::Read;
use std::path::Path;

use anyhow::{Context, anyhow};
use vidl_core::{ErrorCategory, Format, wrap_category};

/// EBML magic number shared by WebM and Matroska.
const EBML_MAGIC: u32 = 0x1A45_DFA3;
/// MPEG transport stream packet sync byte.
const TS_SYNC_BYTE: u8 = 0x47;
/// MPEG transport stream packet length.
const TS_PACKET_LEN: usize = 188;
/// Enough leading bytes to see the second packet's sync byte.
const TS_HEADER_LEN: u64 = 189;
/// How far into an MP4 file to look for a `moov`/`moof` atom.
const MP4_SCAN_WINDOW: u64 = 1024 * 1024;

/// Validate a fully written output file against its container's structure.
///
/// The strategy is picked by file extension, falling back to the format
/// hint's media type for unrecognized extensions; files with no matching
/// strategy are accepted unconditionally.
pub fn validate_output_file(path: &Path, format: Option<&Format>) -> anyhow::Result<()> {
    let info = fs::metadata(path)
        .context("stat output")
        .map_err(|err| wrap_category(ErrorCategory::Filesystem, err))?;
    if info.len() == 0 {
        return Err(wrap_category(
            ErrorCategory::Unsupported,
            anyhow!("output file is empty"),
        ));
    }

    let ext = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    match ext.as_str() {
        "mp4" | "m4v" | "mov" | "m4a" | "m4s" => validate_mp4(path),
        "webm" | "mkv" => validate_ebml(path),
        "ts" => validate_mpeg_ts(path),
        "mp3" => validate_mp3(path),
        _ => {
            if format.is_some_and(|format| format.mime_type.to_ascii_lowercase().contains("mp4")) {
                return validate_mp4(path);
            }
            Ok(())
        }
    }
}

/// Read up to `size` leading bytes; short files yield what they have.
fn read_header(path: &Path, size: u64) -> std::io::Result<Vec<u8>> {
    let file = File::open(path)?;
    let mut buf = Vec::new();
    file.take(size).read_to_end(&mut buf)?;
    Ok(buf)
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|window| window == needle)
}

fn validate_mp4(path: &Path) -> anyhow::Result<()> {
    let header = read_header(path, 12)
        .context("read mp4 header")
        .map_err(|err| wrap_category(ErrorCategory::Filesystem, err))?;
    if header.len() < 8 || &header[4..8] != b"ftyp" {
        return Err(wrap_category(
            ErrorCategory::Unsupported,
            anyhow!("invalid mp4 header"),
        ));
    }
    let body = read_header(path, MP4_SCAN_WINDOW)
        .context("read mp4 body")
        .map_err(|err| wrap_category(ErrorCategory::Filesystem, err))?;
    if !contains(&body, b"moov") && !contains(&body, b"moof") {
        return Err(wrap_category(
            ErrorCategory::Unsupported,
            anyhow!("missing moov/moof atom"),
        ));
    }
    Ok(())
}

fn validate_ebml(path: &Path) -> anyhow::Result<()> {
    let header = read_header(path, 4)
        .context("read ebml header")
        .map_err(|err| wrap_category(ErrorCategory::Filesystem, err))?;
    let magic = header
        .first_chunk::<4>()
        .map(|chunk| u32::from_be_bytes(*chunk));
    if magic != Some(EBML_MAGIC) {
        return Err(wrap_category(
            ErrorCategory::Unsupported,
            anyhow!("invalid webm/mkv header"),
        ));
    }
    Ok(())
}

fn validate_mpeg_ts(path: &Path) -> anyhow::Result<()> {
    let header = read_header(path, TS_HEADER_LEN)
        .context("read ts header")
        .map_err(|err| wrap_category(ErrorCategory::Filesystem, err))?;
    if header.first() != Some(&TS_SYNC_BYTE) {
        return Err(wrap_category(
            ErrorCategory::Unsupported,
            anyhow!("invalid transport stream header"),
        ));
    }
    // A second sync byte one packet in confirms a stable 188-byte cadence
    // rather than a coincidental first byte.
    if header.len() > TS_PACKET_LEN && header[TS_PACKET_LEN] != TS_SYNC_BYTE {
        return Err(wrap_category(
            ErrorCategory::Unsupported,
            anyhow!("invalid transport stream sync"),
        ));
    }
    Ok(())
}

fn validate_mp3(path: &Path) -> anyhow::Result<()> {
    let header = read_header(path, 3)
        .context("read mp3 header")
        .map_err(|err| wrap_category(ErrorCategory::Filesystem, err))?;
    if header.len() < 3 {
        return Err(wrap_category(
            ErrorCategory::Unsupported,
            anyhow!("invalid mp3 header"),
        ));
    }
    if &header[..3] == b"ID3" || header[0] == 0xFF {
        return Ok(());
    }
    Err(wrap_category(
        ErrorCategory::Unsupported,
        anyhow!("invalid mp3 header"),
    ))
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;
    use vidl_core::category_of;

    use super::*;

    fn write_file(dir: &TempDir, name: &str, data: &[u8]) -> std::path::PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, data).unwrap();
        path
    }

    const MP4_HEADER: &[u8] = &[
        0x00, 0x00, 0x00, 0x18, b'f', b't', b'y', b'p', b'i', b's', b'o', b'm', b'm', b'o', b'o',
        b'v',
    ];

    #[test]
    fn test_valid_mp4_passes() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "file.mp4", MP4_HEADER);
        validate_output_file(&path, None).unwrap();
    }

    #[test]
    fn test_truncated_mp4_is_unsupported() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "file.mp4", &MP4_HEADER[..4]);
        let err = validate_output_file(&path, None).unwrap_err();
        assert_eq!(category_of(Some(&err)), ErrorCategory::Unsupported);
    }

    #[test]
    fn test_mp4_without_moov_is_unsupported() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "file.mp4", &MP4_HEADER[..12]);
        let err = validate_output_file(&path, None).unwrap_err();
        assert_eq!(category_of(Some(&err)), ErrorCategory::Unsupported);
    }

    #[test]
    fn test_valid_ts_passes() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "file.ts", &[0x47, 0x00, 0x00, 0x00]);
        validate_output_file(&path, None).unwrap();
    }

    #[test]
    fn test_ts_two_packet_cadence() {
        let dir = TempDir::new().unwrap();
        let mut good = vec![0u8; 189];
        good[0] = 0x47;
        good[188] = 0x47;
        let path = write_file(&dir, "good.ts", &good);
        validate_output_file(&path, None).unwrap();

        let mut bad = good;
        bad[188] = 0x00;
        let path = write_file(&dir, "bad.ts", &bad);
        let err = validate_output_file(&path, None).unwrap_err();
        assert_eq!(category_of(Some(&err)), ErrorCategory::Unsupported);
    }

    #[test]
    fn test_ts_wrong_sync_byte_is_unsupported() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "file.ts", &[0x00, 0x47, 0x47, 0x47]);
        let err = validate_output_file(&path, None).unwrap_err();
        assert_eq!(category_of(Some(&err)), ErrorCategory::Unsupported);
    }

    #[test]
    fn test_ebml_magic() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "file.webm", &[0x1A, 0x45, 0xDF, 0xA3, 0x00]);
        validate_output_file(&path, None).unwrap();

        let path = write_file(&dir, "file.mkv", &[0x1A, 0x45, 0xDF, 0x00, 0x00]);
        let err = validate_output_file(&path, None).unwrap_err();
        assert_eq!(category_of(Some(&err)), ErrorCategory::Unsupported);
    }

    #[test]
    fn test_mp3_accepts_id3_and_frame_sync() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "tagged.mp3", b"ID3\x04\x00");
        validate_output_file(&path, None).unwrap();

        let path = write_file(&dir, "raw.mp3", &[0xFF, 0xFB, 0x90]);
        validate_output_file(&path, None).unwrap();

        let path = write_file(&dir, "bad.mp3", b"abc");
        let err = validate_output_file(&path, None).unwrap_err();
        assert_eq!(category_of(Some(&err)), ErrorCategory::Unsupported);
    }

    #[test]
    fn test_empty_file_is_unsupported() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "file.mp4", &[]);
        let err = validate_output_file(&path, None).unwrap_err();
        assert_eq!(category_of(Some(&err)), ErrorCategory::Unsupported);
    }

    #[test]
    fn test_missing_file_is_filesystem() {
        let dir = TempDir::new().unwrap();
        let err = validate_output_file(&dir.path().join("absent.mp4"), None).unwrap_err();
        assert_eq!(category_of(Some(&err)), ErrorCategory::Filesystem);
    }

    #[test]
    fn test_unknown_extension_accepted() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "file.xyz", b"whatever");
        validate_output_file(&path, None).unwrap();
    }

    #[test]
    fn test_unknown_extension_with_mp4_hint() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "file.bin", b"not an mp4 at all");
        let hint = Format {
            mime_type: "video/mp4; codecs=\"avc1\"".to_string(),
            ..Format::default()
        };
        let err = validate_output_file(&path, Some(&hint)).unwrap_err();
        assert_eq!(category_of(Some(&err)), ErrorCategory::Unsupported);

        let path = write_file(&dir, "good.bin", MP4_HEADER);
        validate_output_file(&path, Some(&hint)).unwrap();
    }
}
