//! # Agent Memory
//!
//! The conversation transcript. Memory is an ordered, append-only list of
//! typed entries; insertion order is the order entries are replayed into
//! every prompt. Nothing is ever removed or edited.

use crate::error::{self, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Who produced a memory entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    User,
    Assistant,
    Environment,
}

/// A single transcript entry. `content` may itself be serialized JSON, such
/// as a result envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryEntry {
    #[serde(rename = "type")]
    pub kind: EntryKind,
    #[serde(default)]
    pub content: String,
}

impl MemoryEntry {
    pub fn new(kind: EntryKind, content: impl Into<String>) -> Self {
        Self {
            kind,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(EntryKind::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(EntryKind::Assistant, content)
    }

    pub fn environment(content: impl Into<String>) -> Self {
        Self::new(EntryKind::Environment, content)
    }
}

/// Append-only transcript
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Memory {
    entries: Vec<MemoryEntry>,
}

impl Memory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry
    pub fn add(&mut self, entry: MemoryEntry) {
        self.entries.push(entry);
    }

    /// All entries, oldest first
    pub fn entries(&self) -> &[MemoryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn last(&self) -> Option<&MemoryEntry> {
        self.entries.last()
    }

    /// Persist the transcript as pretty JSON
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| error::serialization_error(e.to_string()))?;
        std::fs::write(path, json).map_err(|e| {
            error::io_error(format!("Failed to write transcript {}: {}", path.display(), e))
        })?;
        Ok(())
    }

    /// Load a transcript written by [`Memory::save`]
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            error::io_error(format!("Failed to read transcript {}: {}", path.display(), e))
        })?;
        serde_json::from_str(&json)
            .map_err(|e| error::parse_error(format!("Failed to parse transcript: {}", e)))
    }
}

impl Extend<MemoryEntry> for Memory {
    fn extend<I: IntoIterator<Item = MemoryEntry>>(&mut self, iter: I) {
        self.entries.extend(iter);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_append_preserves_order() {
        let mut memory = Memory::new();
        memory.add(MemoryEntry::user("task"));
        memory.add(MemoryEntry::assistant("{\"tool\": \"list_files\", \"args\": {}}"));
        memory.add(MemoryEntry::user("{\"tool_executed\": true}"));

        assert_eq!(memory.len(), 3);
        let kinds: Vec<_> = memory.entries().iter().map(|e| e.kind).collect();
        assert_eq!(kinds, vec![EntryKind::User, EntryKind::Assistant, EntryKind::User]);
        assert_eq!(memory.last().unwrap().content, "{\"tool_executed\": true}");
    }

    #[test]
    fn test_entry_wire_shape() {
        let entry = MemoryEntry::environment("ok");
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json, serde_json::json!({"type": "environment", "content": "ok"}));

        let parsed: MemoryEntry = serde_json::from_str(r#"{"type": "assistant"}"#).unwrap();
        assert_eq!(parsed.kind, EntryKind::Assistant);
        assert!(parsed.content.is_empty());
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("transcript.json");

        let mut memory = Memory::new();
        memory.add(MemoryEntry::user("Describe the data in this directory."));
        memory.add(MemoryEntry::assistant("thinking"));
        memory.save(&path).unwrap();

        let loaded = Memory::load(&path).unwrap();
        assert_eq!(loaded, memory);
    }

    #[test]
    fn test_load_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        assert!(Memory::load(temp_dir.path().join("nope.json")).is_err());
    }
}
