//! Alias-keyed frame store

use super::frame::DataFrame;
use crate::error::{Error, Result};
use std::collections::BTreeMap;

/// Frames loaded during a session, addressed by alias. Owned by one
/// environment; runs never share a store.
#[derive(Debug, Clone, Default)]
pub struct FrameStore {
    frames: BTreeMap<String, DataFrame>,
}

impl FrameStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a frame, replacing any frame under the same alias
    pub fn insert(&mut self, alias: impl Into<String>, frame: DataFrame) {
        self.frames.insert(alias.into(), frame);
    }

    pub fn get(&self, alias: &str) -> Result<&DataFrame> {
        self.frames.get(alias).ok_or_else(|| Error::frame_not_found(alias))
    }

    pub fn contains(&self, alias: &str) -> bool {
        self.frames.contains_key(alias)
    }

    pub fn remove(&mut self, alias: &str) -> Option<DataFrame> {
        self.frames.remove(alias)
    }

    /// Aliases in sorted order
    pub fn aliases(&self) -> Vec<&str> {
        self.frames.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_insert_get_replace() {
        let mut store = FrameStore::new();
        store.insert("prev", DataFrame::default());
        store.insert("curr", DataFrame::default());
        store.insert("prev", DataFrame::default());

        assert_eq!(store.len(), 2);
        assert_eq!(store.aliases(), vec!["curr", "prev"]);
        assert!(store.get("prev").is_ok());
    }

    #[test]
    fn test_unknown_alias() {
        let store = FrameStore::new();
        let err = store.get("prev").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::FrameNotFound);
        assert_eq!(err.message(), "No dataframe registered with alias 'prev'");
    }
}
