//! Stream format metadata.
//!
//! The extraction layer describes each playable stream with a [`Format`].
//! The pipeline uses it two ways: as the validator's hint when a file
//! extension is unrecognized, and as rows of the `--list-formats` table the
//! CLI prints when a requested format is not available.

use std::io::{self, Write};

use serde::{Deserialize, Serialize};

/// One playable stream variant as reported by the extraction layer.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Format {
    /// Numeric stream identifier.
    pub itag: u32,
    /// Coarse quality name (e.g. `hd720`).
    pub quality: String,
    /// Human-readable quality label (e.g. `720p`).
    pub quality_label: String,
    /// Full MIME type, including codec parameters.
    pub mime_type: String,
    /// Average bitrate in bits per second.
    pub bitrate: u64,
    /// Number of audio channels; 0 for video-only streams.
    pub audio_channels: u16,
    /// Pixel width; 0 for audio-only streams.
    pub width: u32,
    /// Pixel height; 0 for audio-only streams.
    pub height: u32,
    /// Declared content length in bytes; 0 when the server did not say.
    pub content_length: u64,
}

impl Format {
    /// Shortened MIME type without codec parameters, for table display.
    #[must_use]
    pub fn media_type(&self) -> &str {
        self.mime_type
            .split(';')
            .next()
            .unwrap_or(&self.mime_type)
            .trim()
    }
}

/// Write the available-formats table.
///
/// One header row, one row per format, columns aligned for terminal reading.
pub fn write_formats(out: &mut impl Write, formats: &[Format]) -> io::Result<()> {
    writeln!(
        out,
        "{:>6}  {:<10} {:<18} {:>10} {:>3} {:>11} {:>12}",
        "itag", "quality", "mime", "bitrate", "ch", "resolution", "size"
    )?;
    for format in formats {
        let resolution = if format.width > 0 && format.height > 0 {
            format!("{}x{}", format.width, format.height)
        } else {
            "-".to_string()
        };
        let label = if format.quality_label.is_empty() {
            &format.quality
        } else {
            &format.quality_label
        };
        writeln!(
            out,
            "{:>6}  {:<10} {:<18} {:>10} {:>3} {:>11} {:>12}",
            format.itag,
            label,
            format.media_type(),
            format.bitrate,
            format.audio_channels,
            resolution,
            format.content_length,
        )?;
    }
    Ok(())
}
