//! Captured instrumentation entries and the per-task entry buffer

use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};

/// Kind of a captured instrumentation record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    /// A timed function invocation
    Function,
    /// A garbage-collection / allocator pause
    Gc,
    /// A DNS resolution wait
    Dns,
    /// A network wait
    Net,
    /// A user mark
    Mark,
    /// A user measure between two marks
    Measure,
}

/// Kind-specific payload attached to an entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntryDetail {
    /// The task's own wrapper invocation: which cycle of which task
    Cycle {
        /// 1-based cycle index
        cycle: u64,
        /// Name of the owning task
        taskname: String,
    },
    /// A user mark carrying a value in an optional unit
    Mark {
        /// The recorded value
        value: f64,
        /// Unit label for display (e.g. "MB")
        #[serde(skip_serializing_if = "Option::is_none")]
        unit: Option<String>,
    },
    /// Free-form payload supplied by gc/dns/net integrations
    Raw(serde_json::Value),
}

/// A captured instrumentation record. Immutable once captured.
///
/// Serializes to the wire shape
/// `{name, entryType, startTime, duration, detail}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entry {
    /// Entry name (function name, mark name, ...)
    pub name: String,
    /// What kind of record this is
    pub entry_type: EntryKind,
    /// Milliseconds since the provider's epoch
    pub start_time: f64,
    /// Duration in milliseconds (zero for marks)
    pub duration: f64,
    /// Kind-specific payload, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<EntryDetail>,
}

impl Entry {
    /// Create an entry without a detail payload
    pub fn new(name: impl Into<String>, entry_type: EntryKind, start_time: f64, duration: f64) -> Self {
        Self {
            name: name.into(),
            entry_type,
            start_time,
            duration,
            detail: None,
        }
    }

    /// Attach a detail payload
    #[must_use]
    pub fn with_detail(mut self, detail: EntryDetail) -> Self {
        self.detail = Some(detail);
        self
    }

    /// The `{cycle, taskname}` payload, when this is a task wrapper entry
    pub fn cycle_detail(&self) -> Option<(u64, &str)> {
        match &self.detail {
            Some(EntryDetail::Cycle { cycle, taskname }) => Some((*cycle, taskname.as_str())),
            _ => None,
        }
    }
}

/// Append-only, grouped buffer of captured entries.
///
/// One group is appended per instrumentation flush. The buffer is shared
/// between the provider's delivery task (writer) and the executor/aligner
/// (readers); readers always work from a flattened snapshot.
#[derive(Debug, Clone, Default)]
pub struct EntryBuffer {
    groups: Arc<Mutex<Vec<Vec<Entry>>>>,
}

impl EntryBuffer {
    /// Create an empty buffer
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one delivered batch as a new group
    pub fn push_group(&self, group: Vec<Entry>) {
        self.groups
            .lock()
            .expect("entry buffer lock poisoned")
            .push(group);
    }

    /// Number of groups appended so far
    pub fn group_count(&self) -> usize {
        self.groups.lock().expect("entry buffer lock poisoned").len()
    }

    /// Total number of entries across all groups
    pub fn len(&self) -> usize {
        self.groups
            .lock()
            .expect("entry buffer lock poisoned")
            .iter()
            .map(Vec::len)
            .sum()
    }

    /// True when no entry has been delivered yet
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Immutable snapshot of all entries in append order
    pub fn flattened(&self) -> Vec<Entry> {
        self.groups
            .lock()
            .expect("entry buffer lock poisoned")
            .iter()
            .flatten()
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_wire_shape() {
        let entry = Entry::new("fn", EntryKind::Function, 12.5, 3.25).with_detail(
            EntryDetail::Cycle {
                cycle: 1,
                taskname: "alpha".to_string(),
            },
        );

        let json = serde_json::to_string(&entry).unwrap();
        assert!(json.contains("\"entryType\":\"function\""));
        assert!(json.contains("\"startTime\":12.5"));
        assert!(json.contains("\"duration\":3.25"));
        assert!(json.contains("\"taskname\":\"alpha\""));

        let back: Entry = serde_json::from_str(&json).unwrap();
        assert_eq!(back, entry);
    }

    #[test]
    fn test_detail_is_skipped_when_absent() {
        let entry = Entry::new("gc", EntryKind::Gc, 0.0, 1.0);
        let json = serde_json::to_string(&entry).unwrap();
        assert!(!json.contains("detail"));
    }

    #[test]
    fn test_mark_detail_roundtrip() {
        let entry = Entry::new("heap", EntryKind::Mark, 5.0, 0.0).with_detail(EntryDetail::Mark {
            value: 42.5,
            unit: Some("MB".to_string()),
        });

        let json = serde_json::to_string(&entry).unwrap();
        let back: Entry = serde_json::from_str(&json).unwrap();
        assert_eq!(back.detail, entry.detail);
    }

    #[test]
    fn test_buffer_groups_and_flatten() {
        let buffer = EntryBuffer::new();
        assert!(buffer.is_empty());

        buffer.push_group(vec![Entry::new("a", EntryKind::Function, 1.0, 1.0)]);
        buffer.push_group(vec![
            Entry::new("b", EntryKind::Mark, 2.0, 0.0),
            Entry::new("c", EntryKind::Measure, 3.0, 1.0),
        ]);

        assert_eq!(buffer.group_count(), 2);
        assert_eq!(buffer.len(), 3);

        let flat = buffer.flattened();
        let names: Vec<&str> = flat.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_buffer_snapshot_is_detached() {
        let buffer = EntryBuffer::new();
        buffer.push_group(vec![Entry::new("a", EntryKind::Function, 1.0, 1.0)]);

        let snapshot = buffer.flattened();
        buffer.push_group(vec![Entry::new("b", EntryKind::Function, 2.0, 1.0)]);

        assert_eq!(snapshot.len(), 1);
        assert_eq!(buffer.len(), 2);
    }
}
