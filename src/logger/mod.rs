//! Activity logging: where analyzer lifecycle records go.

pub mod jsonl;

use std::sync::Arc;

use parking_lot::Mutex;

pub use jsonl::{EventType, JsonlWriter, LogEntry, Severity};

/// Destination for activity records.
pub trait ActivitySink {
    /// Accept one record. Failures are handled by the sink itself.
    fn record(&mut self, entry: &LogEntry);

    /// Push buffered records out. No-op by default.
    fn flush(&mut self) {}
}

impl ActivitySink for JsonlWriter {
    fn record(&mut self, entry: &LogEntry) {
        self.write_entry(entry);
    }

    fn flush(&mut self) {
        JsonlWriter::flush(self);
    }
}

/// Drops everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiscardSink;

impl ActivitySink for DiscardSink {
    fn record(&mut self, _entry: &LogEntry) {}
}

/// Keeps records in memory. Clones share the same buffer.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    entries: Arc<Mutex<Vec<LogEntry>>>,
}

impl MemorySink {
    /// Empty buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every record so far, oldest first.
    #[must_use]
    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries.lock().clone()
    }

    /// Event types in arrival order.
    #[must_use]
    pub fn events(&self) -> Vec<EventType> {
        self.entries.lock().iter().map(|e| e.event).collect()
    }

    /// How many records carry `event`.
    #[must_use]
    pub fn count(&self, event: EventType) -> usize {
        self.entries.lock().iter().filter(|e| e.event == event).count()
    }
}

impl ActivitySink for MemorySink {
    fn record(&mut self, entry: &LogEntry) {
        self.entries.lock().push(entry.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_sink_clones_share_entries() {
        let sink = MemorySink::new();
        let mut boxed: Box<dyn ActivitySink> = Box::new(sink.clone());
        boxed.record(&LogEntry::new(EventType::TraceStart, Severity::Info));
        boxed.record(&LogEntry::new(EventType::TraceStart, Severity::Info));
        boxed.record(&LogEntry::new(EventType::ConfigWarning, Severity::Warning));
        assert_eq!(sink.count(EventType::TraceStart), 2);
        assert_eq!(sink.events().last(), Some(&EventType::ConfigWarning));
    }

    #[test]
    fn discard_sink_accepts_anything() {
        let mut sink = DiscardSink;
        sink.record(&LogEntry::new(EventType::AnalyzerInit, Severity::Info));
        sink.flush();
    }
}
