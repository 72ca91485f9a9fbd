//! In-process perf sink.

use std::collections::BTreeMap;
use std::sync::Mutex;
use std::time::Duration;

use super::{PerfRecord, PerfSink};

/// Keeps every record in arrival order.
///
/// Shared between runs through `Arc`; the lock is held only to push or copy.
#[derive(Debug, Default)]
pub struct MemoryPerfSink {
    records: Mutex<Vec<PerfRecord>>,
}

impl MemoryPerfSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of all records so far.
    pub fn records(&self) -> Vec<PerfRecord> {
        self.records
            .lock()
            .map(|records| records.clone())
            .unwrap_or_default()
    }

    /// Recorded keys, in arrival order.
    pub fn keys(&self) -> Vec<String> {
        self.records().into_iter().map(|r| r.key).collect()
    }

    /// Total duration and count per key.
    pub fn totals(&self) -> BTreeMap<String, (Duration, usize)> {
        let mut totals: BTreeMap<String, (Duration, usize)> = BTreeMap::new();
        for record in self.records() {
            let entry = totals.entry(record.key).or_default();
            entry.0 += record.duration;
            entry.1 += 1;
        }
        totals
    }

    pub fn len(&self) -> usize {
        self.records.lock().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl PerfSink for MemoryPerfSink {
    fn record(&self, key: &str, duration: Duration) {
        if let Ok(mut records) = self.records.lock() {
            records.push(PerfRecord::new(key, duration));
        }
    }
}
