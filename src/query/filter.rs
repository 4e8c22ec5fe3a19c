use crate::index::{Record, RecordIndex};
use memchr::memmem::Finder;
use rayon::prelude::*;
use std::sync::Arc;

/// Records of one index snapshot that matched a query, in index order
#[derive(Debug, Clone)]
pub struct FilteredView {
    index: RecordIndex,
    positions: Arc<[usize]>,
}

impl FilteredView {
    /// Every record of `index`
    pub fn all(index: &RecordIndex) -> Self {
        Self {
            index: index.clone(),
            positions: (0..index.len()).collect(),
        }
    }

    pub fn empty() -> Self {
        Self::all(&RecordIndex::empty())
    }

    pub(crate) fn from_positions(index: &RecordIndex, positions: Arc<[usize]>) -> Self {
        Self {
            index: index.clone(),
            positions,
        }
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn get(&self, i: usize) -> Option<&Record> {
        self.positions.get(i).map(|&p| &self.index[p])
    }

    pub fn iter(&self) -> impl Iterator<Item = &Record> + '_ {
        self.positions.iter().map(|&p| &self.index[p])
    }

    /// Positions of the matching records within the index
    pub fn positions(&self) -> &[usize] {
        &self.positions
    }

    /// The snapshot this view was computed from
    pub fn index(&self) -> &RecordIndex {
        &self.index
    }

    /// Whether the view contains the whole index
    pub fn is_unfiltered(&self) -> bool {
        self.positions.len() == self.index.len()
    }

    pub(crate) fn shared_positions(&self) -> Arc<[usize]> {
        Arc::clone(&self.positions)
    }
}

/// A case-folded substring query
pub struct Matcher {
    text: Finder<'static>,
    hex: Finder<'static>,
}

impl Matcher {
    /// Returns None for a blank query, which matches everything
    pub fn new(query: &str) -> Option<Self> {
        if query.trim().is_empty() {
            return None;
        }

        let folded = query.to_lowercase();
        // Hex renderings only hold [0-9A-F ], so matching the uppercased
        // folded query against them equals folding both sides
        let hex = folded.to_ascii_uppercase();

        Some(Self {
            text: Finder::new(folded.as_bytes()).into_owned(),
            hex: Finder::new(hex.as_bytes()).into_owned(),
        })
    }

    pub fn is_match(&self, record: &Record) -> bool {
        let folded = record.folded();
        self.text.find(folded.key.as_bytes()).is_some()
            || self.text.find(folded.value.as_bytes()).is_some()
            || self.hex.find(record.key_hex().as_bytes()).is_some()
            || self.hex.find(record.value_hex().as_bytes()).is_some()
    }
}

/// Filter `index` by `query`.
///
/// A blank query returns the whole index. Otherwise a record matches when the
/// query, case-folded, is a substring of its key text, value text, key hex or
/// value hex. Index order is kept.
pub fn filter(index: &RecordIndex, query: &str) -> FilteredView {
    filter_with_threshold(index, query, usize::MAX)
}

/// Like [`filter`], using the rayon pool once the index has at least
/// `parallel_threshold` records
pub fn filter_with_threshold(index: &RecordIndex, query: &str, parallel_threshold: usize) -> FilteredView {
    let Some(matcher) = Matcher::new(query) else {
        return FilteredView::all(index);
    };

    let records = index.as_slice();
    let positions: Vec<usize> = if records.len() >= parallel_threshold {
        records
            .par_iter()
            .enumerate()
            .filter(|(_, r)| matcher.is_match(r))
            .map(|(i, _)| i)
            .collect()
    } else {
        records
            .iter()
            .enumerate()
            .filter(|(_, r)| matcher.is_match(r))
            .map(|(i, _)| i)
            .collect()
    };

    FilteredView::from_positions(index, positions.into())
}
