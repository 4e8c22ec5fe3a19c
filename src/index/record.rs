use crate::utils::{classify, to_hex};
use std::borrow::Cow;
use std::sync::OnceLock;

/// A single key/value pair loaded from the store.
///
/// The raw bytes are kept; every rendering is derived from them on demand.
/// Hex strings and the case-folded search text are computed at most once per
/// record and cached in place.
#[derive(Debug)]
pub struct Record {
    key: Box<[u8]>,
    value: Box<[u8]>,
    key_hex: OnceLock<Box<str>>,
    value_hex: OnceLock<Box<str>>,
    folded: OnceLock<FoldedText>,
}

/// Lowercased display text used for case-insensitive matching
#[derive(Debug)]
pub(crate) struct FoldedText {
    pub key: Box<str>,
    pub value: Box<str>,
}

impl Record {
    pub fn new(key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> Self {
        Self {
            key: key.into().into_boxed_slice(),
            value: value.into().into_boxed_slice(),
            key_hex: OnceLock::new(),
            value_hex: OnceLock::new(),
            folded: OnceLock::new(),
        }
    }

    pub fn key_bytes(&self) -> &[u8] {
        &self.key
    }

    pub fn value_bytes(&self) -> &[u8] {
        &self.value
    }

    /// Key as text, or `[Binary: N bytes]`
    pub fn key_display(&self) -> Cow<'_, str> {
        classify(&self.key)
    }

    /// Value as text, or `[Binary: N bytes]`
    pub fn value_display(&self) -> Cow<'_, str> {
        classify(&self.value)
    }

    pub fn key_hex(&self) -> &str {
        self.key_hex.get_or_init(|| to_hex(&self.key).into_boxed_str())
    }

    pub fn value_hex(&self) -> &str {
        self.value_hex.get_or_init(|| to_hex(&self.value).into_boxed_str())
    }

    pub(crate) fn folded(&self) -> &FoldedText {
        self.folded.get_or_init(|| FoldedText {
            key: self.key_display().to_lowercase().into_boxed_str(),
            value: self.value_display().to_lowercase().into_boxed_str(),
        })
    }
}

impl Clone for Record {
    /// Clones the raw bytes only; caches are rebuilt on demand
    fn clone(&self) -> Self {
        Self::new(self.key.to_vec(), self.value.to_vec())
    }
}

impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key && self.value == other.value
    }
}

impl Eq for Record {}
