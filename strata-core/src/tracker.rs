//! Per-instance change detection.
//!
//! A [`DiffTracker`] remembers the last committed value of every field a
//! document exposes through its accessor table. Cascade rules consult it to
//! find out whether an association moved since the last successful cascade,
//! and therefore whether a stale embed has to be cleaned up.

use serde_json::Value;
use std::collections::HashMap;

use crate::inspect::Inspectable;

/// Snapshot of a document's field values at the last reset
///
/// Owned by exactly one document instance. Not synchronized: callers sharing
/// an instance across tasks must serialize access themselves.
#[derive(Debug, Clone, Default)]
pub struct DiffTracker {
    snapshot: HashMap<String, Value>,
    captured: bool,
}

impl DiffTracker {
    /// Tracker with a baseline taken from `doc`
    pub fn capturing(doc: &dyn Inspectable) -> Self {
        let mut tracker = Self::default();
        tracker.capture(doc);
        tracker
    }

    /// Record the current values of all fields as the baseline
    pub fn capture(&mut self, doc: &dyn Inspectable) {
        self.snapshot = doc
            .field_names()
            .into_iter()
            .filter_map(|name| doc.get_field_value(name).map(|value| (name.to_string(), value)))
            .collect();
        self.captured = true;
    }

    /// Re-capture the current values as the new baseline
    pub fn reset(&mut self, doc: &dyn Inspectable) {
        self.capture(doc);
    }

    /// Whether a baseline has ever been taken
    pub fn is_captured(&self) -> bool {
        self.captured
    }

    /// True iff the field's live value differs from the baseline.
    ///
    /// Untracked fields, and every field of a tracker that was never captured,
    /// count as unmodified.
    pub fn modified(&self, doc: &dyn Inspectable, field_name: &str) -> bool {
        match self.snapshot.get(field_name) {
            Some(original) => doc.get_field_value(field_name).as_ref() != Some(original),
            None => false,
        }
    }

    /// Names of every tracked field whose value changed since the baseline
    pub fn modified_fields(&self, doc: &dyn Inspectable) -> Vec<String> {
        let mut fields: Vec<String> = self
            .snapshot
            .keys()
            .filter(|name| self.modified(doc, name))
            .cloned()
            .collect();
        fields.sort();
        fields
    }

    /// Baseline value of a tracked field
    pub fn original_value(&self, field_name: &str) -> Option<&Value> {
        self.snapshot.get(field_name)
    }
}

/// Documents owning a [`DiffTracker`]
///
/// The provided methods take the tracker and the document through `self`, so
/// callers never juggle a borrow of the tracker against a borrow of its owner.
pub trait Tracked: Inspectable + Sized {
    fn diff_tracker(&self) -> &DiffTracker;

    fn diff_tracker_mut(&mut self) -> &mut DiffTracker;

    fn modified(&self, field_name: &str) -> bool {
        self.diff_tracker().modified(self, field_name)
    }

    fn original_value(&self, field_name: &str) -> Option<Value> {
        self.diff_tracker().original_value(field_name).cloned()
    }

    fn reset_tracker(&mut self) {
        let baseline = DiffTracker::capturing(self);
        *self.diff_tracker_mut() = baseline;
    }
}
