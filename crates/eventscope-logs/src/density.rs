//! Tumbling-window density counting.
//!
//! A density matcher walks the stream once, keeping one open window. The
//! first line opens the window at its own timestamp. A later line at `d`
//! belongs to the open window when `d` is in `(start, start + size]`; when it
//! lies beyond, the open window is closed and empty windows are emitted for
//! every interval skipped, so the series has no holes. Lines that go back in
//! time are reported and ignored.

use chrono::TimeDelta;
use serde::Deserialize;

use eventscope_types::{DatedLine, DensitySeries, DensityWindow, Diagnostic, Timestamp};

use crate::error::ConfigError;
use crate::matcher::Matcher;
use crate::pattern::Pattern;

/// Default window size (5 minutes)
pub const DEFAULT_WINDOW_SECS: i64 = 300;

/// What happens to the window still open at end of stream
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FinalWindow {
    /// Only fully closed windows are reported
    #[default]
    Drop,

    /// The open window is reported with its partial count
    Flush,
}

/// Window parameters shared by every density matcher of a run
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WindowConfig {
    size: TimeDelta,
    final_window: FinalWindow,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            size: TimeDelta::seconds(DEFAULT_WINDOW_SECS),
            final_window: FinalWindow::Drop,
        }
    }
}

impl WindowConfig {
    /// Window of `secs` seconds; zero, negative and unrepresentable sizes
    /// are rejected
    pub fn new(secs: i64, final_window: FinalWindow) -> Result<Self, ConfigError> {
        if secs <= 0 {
            return Err(ConfigError::NonPositiveWindow { secs });
        }
        let size = TimeDelta::try_seconds(secs).ok_or(ConfigError::WindowTooLarge { secs })?;
        Ok(Self { size, final_window })
    }

    pub fn size(&self) -> TimeDelta {
        self.size
    }

    pub fn size_secs(&self) -> i64 {
        self.size.num_seconds()
    }

    pub fn final_window(&self) -> FinalWindow {
        self.final_window
    }
}

/// The window currently accumulating matches
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct OpenWindow {
    start: Timestamp,
    count: u64,

    /// Latest accepted timestamp, for detecting time going backward
    last_seen: Timestamp,
}

impl OpenWindow {
    fn starting_at(ts: Timestamp) -> Self {
        Self {
            start: ts,
            count: 0,
            last_seen: ts,
        }
    }
}

/// Counts pattern matches per tumbling window
#[derive(Debug)]
pub struct DensityMatcher {
    pattern: Pattern,
    window: WindowConfig,

    /// `None` until the first line arrives
    open: Option<OpenWindow>,

    /// Closed windows, oldest first
    series: DensitySeries,
}

impl DensityMatcher {
    pub fn new(pattern: Pattern, window: WindowConfig) -> Self {
        Self {
            pattern,
            window,
            open: None,
            series: Vec::new(),
        }
    }
}

impl Matcher for DensityMatcher {
    type Series = DensitySeries;

    fn name(&self) -> &str {
        self.pattern.pattern()
    }

    fn observe(&mut self, line: &DatedLine, diagnostics: &mut Vec<Diagnostic>) {
        let d = line.timestamp;
        let size = self.window.size;

        // On the first line both checks below are no-ops
        let open = self.open.get_or_insert_with(|| OpenWindow::starting_at(d));

        if d < open.last_seen {
            diagnostics.push(Diagnostic::OutOfOrder {
                origin: line.origin.clone(),
                raw: line.raw.clone(),
            });
            return;
        }
        open.last_seen = d;

        // First iteration closes the open window, later ones fill the gap.
        // A window ending past the representable range never closes.
        while let Some(end) = open.start.checked_add_signed(size) {
            if d <= end {
                break;
            }
            self.series.push(DensityWindow::new(open.start, open.count));
            open.start = end;
            open.count = 0;
        }

        if self.pattern.is_match(&line.payload) {
            open.count += 1;
        }
    }

    fn finish(mut self) -> DensitySeries {
        if let (FinalWindow::Flush, Some(open)) = (self.window.final_window, self.open) {
            self.series.push(DensityWindow::new(open.start, open.count));
        }
        self.series
    }
}
