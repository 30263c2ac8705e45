//! Activity journal: JSONL record of every query the facade serves.

pub mod jsonl;

use parking_lot::Mutex;

use crate::core::config::JournalConfig;
use jsonl::{JournalEntry, JsonlConfig, JsonlWriter};

/// Thread-safe handle over the JSONL writer.
///
/// A disabled journal accepts entries and drops them, so call sites never
/// branch on configuration.
pub struct ActivityJournal {
    writer: Option<Mutex<JsonlWriter>>,
}

impl ActivityJournal {
    /// Open the journal described by `cfg`, or a no-op journal when disabled.
    pub fn open(cfg: &JournalConfig) -> Self {
        if !cfg.enabled {
            return Self::disabled();
        }
        Self {
            writer: Some(Mutex::new(JsonlWriter::open(JsonlConfig::from(cfg)))),
        }
    }

    /// Journal that records nothing.
    pub fn disabled() -> Self {
        Self { writer: None }
    }

    /// Whether entries are persisted anywhere.
    pub fn is_enabled(&self) -> bool {
        self.writer.is_some()
    }

    /// Append one entry.
    pub fn record(&self, entry: &JournalEntry) {
        if let Some(writer) = &self.writer {
            writer.lock().write_entry(entry);
        }
    }

    /// Degradation state of the underlying writer (`"disabled"` when off).
    pub fn state(&self) -> String {
        self.writer
            .as_ref()
            .map_or_else(|| "disabled".to_string(), |w| w.lock().state().to_string())
    }
}

impl std::fmt::Debug for ActivityJournal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActivityJournal")
            .field("state", &self.state())
            .finish()
    }
}
