//! Environment-backed configuration.
//!
//! `.env` loading happens once in `main` via `dotenvy`; everything here
//! just reads the process environment.

use std::path::PathBuf;

use thiserror::Error;

/// Maps Platform key, used for both geocoding and the distance matrix.
pub const MAPS_API_KEY_VAR: &str = "GOOGLE_MAPS_API_KEY";
/// Primary and fallback keys for the vision extraction model.
pub const GEMINI_API_KEY_VAR: &str = "GEMINI_API_KEY";
pub const GOOGLE_AI_API_KEY_VAR: &str = "GOOGLE_AI_API_KEY";
/// Route cache location override.
pub const CACHE_PATH_VAR: &str = "DISPATCH_CACHE_PATH";

const DEFAULT_CACHE_FILE: &str = "route_cache.json";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} is not set; add it to the environment or a .env file")]
    MissingKey(&'static str),
}

pub fn maps_api_key() -> Result<String, ConfigError> {
    non_empty_var(MAPS_API_KEY_VAR).ok_or(ConfigError::MissingKey(MAPS_API_KEY_VAR))
}

pub fn gemini_api_key() -> Result<String, ConfigError> {
    non_empty_var(GEMINI_API_KEY_VAR)
        .or_else(|| non_empty_var(GOOGLE_AI_API_KEY_VAR))
        .ok_or(ConfigError::MissingKey(GEMINI_API_KEY_VAR))
}

pub fn cache_path() -> PathBuf {
    non_empty_var(CACHE_PATH_VAR)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CACHE_FILE))
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}
