//! Per-bar state and line formatting.

use std::fmt::Write;
use std::time::{Duration, Instant};

use indicatif::HumanBytes;

/// Shown while a bar has no bytes yet and an ETA cannot be computed.
const ETA_PLACEHOLDER: &str = "-:--:--";

/// Reporting state for one in-flight transfer.
///
/// Owned exclusively by the rendering actor; producers only ever reach it
/// through events.
pub(super) struct BarState {
    prefix: String,
    total: u64,
    current: u64,
    started: Instant,
}

impl BarState {
    pub(super) fn new(prefix: String, total: u64) -> Self {
        Self {
            prefix,
            total,
            current: 0,
            started: Instant::now(),
        }
    }

    /// Apply an update event: advance by `delta`, then let an absolute
    /// `value` or a newly discovered `total` override.
    pub(super) fn apply(&mut self, delta: u64, value: u64, total: u64) {
        self.current += delta;
        if value > 0 {
            self.current = value;
        }
        if total > 0 {
            self.total = total;
        }
    }

    /// Snap to the final value. Called on finish so the last rendered state
    /// never shows a partially counted transfer.
    pub(super) const fn complete(&mut self) {
        if self.total > 0 && self.current < self.total {
            self.current = self.total;
        }
    }

    /// Render one display line: prefix, bar, percentage, counts, speed, ETA.
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    pub(super) fn render_line(&self, columns: u16, colored: bool) -> String {
        let elapsed = self.started.elapsed();

        let percent = if self.total > 0 {
            self.current as f64 * 100.0 / self.total as f64
        } else {
            0.0
        };

        let speed = if elapsed.as_secs_f64() > 0.0 {
            let bytes_per_sec = (self.current as f64 / elapsed.as_secs_f64()) as u64;
            format!("{}/s", HumanBytes(bytes_per_sec))
        } else {
            String::new()
        };

        let width: usize = if columns > 100 { 40 } else { 30 };
        let filled = if self.total > 0 {
            ((width as f64 * self.current as f64 / self.total as f64) as usize).min(width)
        } else {
            0
        };
        let mut bar = String::new();
        if colored {
            let _ = write!(
                bar,
                "\x1b[38;5;197m{}\x1b[0m\x1b[2m{}\x1b[0m",
                "━".repeat(filled),
                "━".repeat(width - filled)
            );
        } else {
            let _ = write!(bar, "{}{}", "━".repeat(filled), "-".repeat(width - filled));
        }

        format!(
            "{} {} {:5.1}% {:>7}/{:>7} {:>10} {}",
            self.prefix,
            bar,
            percent,
            HumanBytes(self.current).to_string(),
            HumanBytes(self.total).to_string(),
            speed,
            self.eta(elapsed),
        )
    }

    fn eta(&self, elapsed: Duration) -> String {
        if self.total > 0 && self.current >= self.total {
            return format_clock(Duration::ZERO);
        }
        if self.current == 0 || self.total == 0 {
            return ETA_PLACEHOLDER.to_string();
        }
        let remaining = elapsed.as_secs_f64() * ((self.total - self.current) as f64)
            / (self.current as f64);
        // The estimate can overflow Duration when barely any bytes have
        // arrived against an enormous total; clamp instead of panicking.
        format_clock(Duration::try_from_secs_f64(remaining).unwrap_or(Duration::MAX))
    }
}

/// Format a duration as `H:MM:SS`.
pub(super) fn format_clock(duration: Duration) -> String {
    let secs = duration.as_secs();
    format!("{}:{:02}:{:02}", secs / 3600, (secs % 3600) / 60, secs % 60)
}
