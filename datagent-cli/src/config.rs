//! Runtime settings for the CLI.
//!
//! Read from environment variables (after `.env` is loaded):
//! - `OPENAI_API_KEY` - API key. Required unless `OPENAI_BASE_URL` points at
//!   a local OpenAI-compatible server.
//! - `OPENAI_BASE_URL` - Optional. Chat-completions endpoint base.
//! - `DATAGENT_MODEL` - Optional. Defaults to `gpt-4o`.
//! - `DATAGENT_DATA_DIR` - Optional. Defaults to `data/`.
//! - `USE_CACHE` - Optional. `true` enables the response cache.
//! - `DATAGENT_CACHE_DIR` - Optional. Defaults to `.cache_responses`.

use datagent_core::cache::DEFAULT_CACHE_DIR;
use datagent_core::environment::DEFAULT_DATA_DIR;
use datagent_core::{Error, ProviderConfig, Result};
use std::path::PathBuf;

pub const DEFAULT_MODEL: &str = "gpt-4o";

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub model: String,
    pub data_dir: PathBuf,
    pub use_cache: bool,
    pub cache_dir: PathBuf,
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from any variable source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let api_key = get("OPENAI_API_KEY");
        let base_url = get("OPENAI_BASE_URL");
        if api_key.is_none() && base_url.is_none() {
            return Err(Error::config_invalid(
                "OPENAI_API_KEY is not set (set OPENAI_BASE_URL to use a local server)",
            )
            .with_operation("config::from_env"));
        }

        let use_cache = match get("USE_CACHE").as_deref() {
            None => false,
            Some(v) => parse_bool(v).ok_or_else(|| {
                Error::config_invalid(format!("Invalid value for USE_CACHE: {}", v))
                    .with_operation("config::from_env")
            })?,
        };

        Ok(Self {
            api_key,
            base_url,
            model: get("DATAGENT_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            data_dir: get("DATAGENT_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR)),
            use_cache,
            cache_dir: get("DATAGENT_CACHE_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_CACHE_DIR)),
        })
    }

    pub fn provider_config(&self) -> ProviderConfig {
        let config = match (&self.api_key, &self.base_url) {
            (Some(key), Some(url)) => ProviderConfig::openai(key.clone()).with_base_url(url.clone()),
            (Some(key), None) => ProviderConfig::openai(key.clone()),
            (None, url) => ProviderConfig::local(
                url.clone().unwrap_or_else(|| "http://localhost:11434/v1".to_string()),
                self.model.clone(),
            ),
        };
        config.with_model(self.model.clone())
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use datagent_core::{ErrorKind, ProviderType};
    use std::collections::HashMap;

    fn settings(vars: &[(&str, &str)]) -> Result<Settings> {
        let vars: HashMap<String, String> =
            vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Settings::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let s = settings(&[("OPENAI_API_KEY", "sk-test")]).unwrap();
        assert_eq!(s.model, "gpt-4o");
        assert_eq!(s.data_dir, PathBuf::from("data/"));
        assert!(!s.use_cache);
        assert_eq!(s.cache_dir, PathBuf::from(".cache_responses"));

        let provider = s.provider_config();
        assert_eq!(provider.provider_type, ProviderType::OpenAI);
        assert_eq!(provider.default_model.as_deref(), Some("gpt-4o"));
    }

    #[test]
    fn test_missing_key() {
        let err = settings(&[]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConfigInvalid);
    }

    #[test]
    fn test_local_server_without_key() {
        let s = settings(&[
            ("OPENAI_BASE_URL", "http://localhost:8000/v1"),
            ("DATAGENT_MODEL", "qwen2.5"),
            ("USE_CACHE", "True"),
        ])
        .unwrap();
        assert!(s.use_cache);

        let provider = s.provider_config();
        assert_eq!(provider.provider_type, ProviderType::Local);
        assert_eq!(provider.base_url.as_deref(), Some("http://localhost:8000/v1"));
        assert_eq!(provider.default_model.as_deref(), Some("qwen2.5"));
    }

    #[test]
    fn test_invalid_cache_flag() {
        let err = settings(&[("OPENAI_API_KEY", "k"), ("USE_CACHE", "maybe")]).unwrap_err();
        assert!(err.message().contains("USE_CACHE"));
    }
}
