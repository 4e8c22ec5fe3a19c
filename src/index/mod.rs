//! In-memory snapshot of every record in an opened store

mod record;

pub use record::Record;
pub(crate) use record::FoldedText;

use std::ops::Index;
use std::sync::Arc;

/// Ordered, immutable set of records in the engine's native key order.
///
/// Cloning is cheap and shares the records, so the index can be handed to
/// background search threads without copying. There is no mutation API: a
/// reopen builds a new index and the old one is dropped once the last clone
/// goes away.
#[derive(Debug, Clone)]
pub struct RecordIndex {
    records: Arc<[Record]>,
}

impl RecordIndex {
    pub fn empty() -> Self {
        Self {
            records: Arc::from(Vec::new()),
        }
    }

    pub fn from_records(records: Vec<Record>) -> Self {
        Self {
            records: Arc::from(records),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, position: usize) -> Option<&Record> {
        self.records.get(position)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Record> {
        self.records.iter()
    }

    pub(crate) fn as_slice(&self) -> &[Record] {
        &self.records
    }

    /// Whether both handles refer to the same snapshot
    pub fn same_snapshot(&self, other: &RecordIndex) -> bool {
        Arc::ptr_eq(&self.records, &other.records)
    }

    /// Sum of raw key and value sizes
    pub fn total_bytes(&self) -> usize {
        self.records
            .iter()
            .map(|r| r.key_bytes().len() + r.value_bytes().len())
            .sum()
    }
}

impl Default for RecordIndex {
    fn default() -> Self {
        Self::empty()
    }
}

impl Index<usize> for RecordIndex {
    type Output = Record;

    fn index(&self, position: usize) -> &Record {
        &self.records[position]
    }
}

impl<'a> IntoIterator for &'a RecordIndex {
    type Item = &'a Record;
    type IntoIter = std::slice::Iter<'a, Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_preserves_order() {
        let index = RecordIndex::from_records(vec![
            Record::new("a", "1"),
            Record::new("b", "2"),
            Record::new("c", "3"),
        ]);
        let keys: Vec<_> = index.iter().map(|r| r.key_display().into_owned()).collect();
        assert_eq!(keys, ["a", "b", "c"]);
        assert_eq!(index.len(), 3);
        assert_eq!(index[1].value_display(), "2");
    }

    #[test]
    fn test_clone_shares_snapshot() {
        let index = RecordIndex::from_records(vec![Record::new("a", "1")]);
        let other = index.clone();
        assert!(index.same_snapshot(&other));
        assert!(!index.same_snapshot(&RecordIndex::from_records(vec![Record::new("a", "1")])));
    }

    #[test]
    fn test_empty_index() {
        let index = RecordIndex::empty();
        assert!(index.is_empty());
        assert!(index.get(0).is_none());
        assert_eq!(index.total_bytes(), 0);
    }
}
