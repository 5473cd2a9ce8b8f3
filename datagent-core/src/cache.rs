//! # Response Cache
//!
//! Persistent prompt -> generated response cache, one JSON file per entry.
//! Keys are the SHA-256 of the model name and the serialized prompt, so a
//! prompt that differs in any message, tool or model misses.

use crate::error::{self, Result};
use crate::generator::GeneratedResponse;
use crate::language::Prompt;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Default cache directory, relative to the working directory
pub const DEFAULT_CACHE_DIR: &str = ".cache_responses";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub key: String,
    pub model: String,
    pub response: GeneratedResponse,
    pub created_at: String,
}

/// File-backed response cache
#[derive(Debug, Clone)]
pub struct ResponseCache {
    base_path: PathBuf,
}

impl ResponseCache {
    pub fn new(base_path: impl AsRef<Path>) -> Result<Self> {
        let base_path = base_path.as_ref().to_path_buf();
        std::fs::create_dir_all(&base_path).map_err(|e| {
            error::cache_failed(format!("Failed to create cache dir {}: {}", base_path.display(), e))
                .set_source(e)
        })?;
        Ok(Self { base_path })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Stable key for a prompt sent to `model`
    pub fn key_for(model: &str, prompt: &Prompt) -> Result<String> {
        let serialized = serde_json::to_vec(prompt)
            .map_err(|e| error::serialization_error(format!("Failed to serialize prompt: {}", e)))?;

        let mut hasher = Sha256::new();
        hasher.update(model.as_bytes());
        hasher.update([0u8]);
        hasher.update(&serialized);
        Ok(hex::encode(hasher.finalize()))
    }

    fn key_to_path(&self, key: &str) -> PathBuf {
        self.base_path.join(format!("{}.json", key))
    }

    /// Cached response, if any. Unreadable entries are treated as misses.
    pub fn get(&self, key: &str) -> Option<GeneratedResponse> {
        let path = self.key_to_path(key);
        let content = std::fs::read_to_string(&path).ok()?;
        match serde_json::from_str::<CacheEntry>(&content) {
            Ok(entry) => {
                debug!(key, "cache hit");
                Some(entry.response)
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "ignoring corrupt cache entry");
                None
            }
        }
    }

    pub fn set(&self, key: &str, model: &str, response: &GeneratedResponse) -> Result<()> {
        let entry = CacheEntry {
            key: key.to_string(),
            model: model.to_string(),
            response: response.clone(),
            created_at: chrono::Utc::now().to_rfc3339(),
        };
        let content = serde_json::to_string_pretty(&entry)
            .map_err(|e| error::serialization_error(e.to_string()))?;

        let path = self.key_to_path(key);
        std::fs::write(&path, content).map_err(|e| {
            error::cache_failed(format!("Failed to write {}: {}", path.display(), e)).set_source(e)
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{ChatMessage, ToolDefinition};
    use tempfile::TempDir;

    fn prompt(text: &str) -> Prompt {
        Prompt {
            messages: vec![ChatMessage::system("Terminate:"), ChatMessage::user(text)],
            tools: vec![ToolDefinition::new("terminate", "Terminates the session")],
        }
    }

    #[test]
    fn test_key_is_stable_and_sensitive() {
        let a = ResponseCache::key_for("gpt-4o", &prompt("hello")).unwrap();
        let b = ResponseCache::key_for("gpt-4o", &prompt("hello")).unwrap();
        let c = ResponseCache::key_for("gpt-4o", &prompt("hello!")).unwrap();
        let d = ResponseCache::key_for("gpt-4o-mini", &prompt("hello")).unwrap();

        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert_ne!(a, c);
        assert_ne!(a, d);
    }

    #[test]
    fn test_set_then_get() {
        let dir = TempDir::new().unwrap();
        let cache = ResponseCache::new(dir.path().join("cache")).unwrap();
        let key = ResponseCache::key_for("gpt-4o", &prompt("hi")).unwrap();

        let response = GeneratedResponse::ToolCall {
            name: "terminate".into(),
            arguments: r#"{"message": "hi"}"#.into(),
        };

        assert!(cache.get(&key).is_none());
        cache.set(&key, "gpt-4o", &response).unwrap();
        assert!(dir.path().join("cache").join(format!("{}.json", key)).exists());
        assert_eq!(cache.get(&key), Some(response));

        let reopened = ResponseCache::new(dir.path().join("cache")).unwrap();
        assert!(reopened.get(&key).is_some());
    }

    #[test]
    fn test_corrupt_entry_is_a_miss() {
        let dir = TempDir::new().unwrap();
        let cache = ResponseCache::new(dir.path()).unwrap();
        std::fs::write(dir.path().join("deadbeef.json"), "not json").unwrap();
        assert!(cache.get("deadbeef").is_none());
    }
}
