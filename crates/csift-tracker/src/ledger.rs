//! The in-memory ledger of tracked jobs.

use csift_models::{CorrelationId, JobRecord};

/// Ordered collection of job records, keyed by correlation id.
///
/// Insertion order is preserved for display. The tracker owns the only
/// mutable handle; everything else sees cloned snapshots. Records are never
/// removed by the system itself, only by explicit user action.
#[derive(Debug, Default)]
pub struct Ledger {
    entries: Vec<JobRecord>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record. Correlation ids are client-minted UUIDs, so
    /// collisions are not a practical concern; a duplicate insert is refused
    /// to keep ids unique.
    pub fn insert(&mut self, record: JobRecord) -> bool {
        if self.contains(&record.id) {
            return false;
        }
        self.entries.push(record);
        true
    }

    pub fn contains(&self, id: &CorrelationId) -> bool {
        self.entries.iter().any(|r| &r.id == id)
    }

    pub fn get(&self, id: &CorrelationId) -> Option<&JobRecord> {
        self.entries.iter().find(|r| &r.id == id)
    }

    pub fn get_mut(&mut self, id: &CorrelationId) -> Option<&mut JobRecord> {
        self.entries.iter_mut().find(|r| &r.id == id)
    }

    /// Remove a record, preserving the order of the rest.
    pub fn remove(&mut self, id: &CorrelationId) -> Option<JobRecord> {
        let index = self.entries.iter().position(|r| &r.id == id)?;
        Some(self.entries.remove(index))
    }

    /// Clone of all records in insertion order.
    pub fn snapshot(&self) -> Vec<JobRecord> {
        self.entries.clone()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
