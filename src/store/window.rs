//! Time-bound resolution for range queries.
//!
//! Callers hand over the raw `from`/`to` strings exactly as they arrived.
//! Resolution is total: every input maps to either a concrete inclusive
//! window or an explicit `Malformed` tag that the facade turns into an empty
//! result.

use serde::Serialize;

/// Inclusive `[from, to]` window in epoch seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeWindow {
    pub from: i64,
    pub to: i64,
}

impl TimeWindow {
    /// Window of `span_secs` ending at `now`.
    pub fn trailing(now: i64, span_secs: i64) -> Self {
        Self {
            from: now.saturating_sub(span_secs),
            to: now,
        }
    }

    /// Inverted windows (from > to) select nothing.
    pub fn is_empty(&self) -> bool {
        self.from > self.to
    }

    pub fn contains(&self, ts: i64) -> bool {
        self.from <= ts && ts <= self.to
    }
}

/// Outcome of resolving caller-supplied bounds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WindowResolution {
    /// Both bounds supplied and well-formed.
    Explicit(TimeWindow),
    /// Bounds absent (or only one given): the trailing default window.
    Default(TimeWindow),
    /// Bounds supplied but not integers.
    Malformed { details: String },
}

impl WindowResolution {
    pub fn window(&self) -> Option<TimeWindow> {
        match self {
            Self::Explicit(w) | Self::Default(w) => Some(*w),
            Self::Malformed { .. } => None,
        }
    }
}

/// Resolve optional raw bounds against `now`.
///
/// Both bounds must be present for either to take effect; a lone `from` or
/// `to` is ignored and the default window applies. Blank strings count as
/// absent.
pub fn resolve_window(
    from: Option<&str>,
    to: Option<&str>,
    now: i64,
    default_span_secs: i64,
) -> WindowResolution {
    let from = from.map(str::trim).filter(|s| !s.is_empty());
    let to = to.map(str::trim).filter(|s| !s.is_empty());

    match (from, to) {
        (Some(from_raw), Some(to_raw)) => match (from_raw.parse::<i64>(), to_raw.parse::<i64>()) {
            (Ok(from), Ok(to)) => WindowResolution::Explicit(TimeWindow { from, to }),
            (Err(e), _) => WindowResolution::Malformed {
                details: format!("from={from_raw:?}: {e}"),
            },
            (_, Err(e)) => WindowResolution::Malformed {
                details: format!("to={to_raw:?}: {e}"),
            },
        },
        _ => WindowResolution::Default(TimeWindow::trailing(now, default_span_secs)),
    }
}
