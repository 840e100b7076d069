//! Environment Configuration Loader
//!
//! Loads `KEY=VALUE` pairs from an environment file and snapshots every key the
//! assistant understands into a [`Settings`] value.
//!
//! ## Usage
//!
//! Call `load_environment()` early in main() before building `Settings`:
//!
//! ```rust
//! use mentor_core::config::{load_environment, Settings};
//!
//! fn main() {
//!     load_environment();
//!     let settings = Settings::from_env();
//!     println!("model: {}", settings.gemini_model);
//! }
//! ```

use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Environment variable that points at a custom environment file
pub const ENV_FILE_VAR: &str = "MENTOR_ENV_FILE";

/// Paths to check (in order of priority)
pub const ENV_FILE_PATHS: &[&str] = &["/etc/mentor/environment", ".env"];

/// Default language model
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash-latest";

/// Longest response the front ends accept
pub const DEFAULT_MAX_MESSAGE_LENGTH: usize = 4096;

/// Per-adapter upstream timeout in seconds
pub const DEFAULT_TOOL_TIMEOUT_SECS: u64 = 5;

/// Daily language-model request budget
pub const DEFAULT_QUOTA_LIMIT: u32 = 50;

/// Default HTTP port for the web server
pub const DEFAULT_PORT: u16 = 5001;

/// Load environment variables from the first environment file found.
///
/// This function:
/// 1. Checks `$MENTOR_ENV_FILE` if set
/// 2. Checks `/etc/mentor/environment` (system-wide)
/// 3. Falls back to `.env` in current directory (development)
/// 4. Does NOT override existing environment variables
///
/// Returns the path that was loaded, or None if no file was found.
pub fn load_environment() -> Option<String> {
    if let Ok(custom_path) = std::env::var(ENV_FILE_VAR) {
        if let Some(path) = try_load_env_file(&custom_path) {
            return Some(path);
        }
    }

    for path in ENV_FILE_PATHS {
        if let Some(loaded_path) = try_load_env_file(path) {
            return Some(loaded_path);
        }
    }

    debug!("No environment file found, using existing environment");
    None
}

fn is_secret(key: &str) -> bool {
    ["KEY", "TOKEN", "SECRET", "PASSWORD"]
        .iter()
        .any(|marker| key.contains(marker))
}

/// Try to load an environment file from the given path.
fn try_load_env_file(path: &str) -> Option<String> {
    let path_obj = Path::new(path);

    if !path_obj.exists() {
        return None;
    }

    match fs::read_to_string(path_obj) {
        Ok(content) => {
            let mut loaded_count = 0;
            let mut skipped_count = 0;

            for line in content.lines() {
                let line = line.trim();

                if line.is_empty() || line.starts_with('#') {
                    continue;
                }

                if let Some((key, value)) = parse_env_line(line) {
                    if std::env::var(&key).is_err() {
                        std::env::set_var(&key, &value);
                        loaded_count += 1;
                        debug!("Loaded: {}={}", key, if is_secret(&key) { "***" } else { &value });
                    } else {
                        skipped_count += 1;
                        debug!("Skipped (already set): {}", key);
                    }
                }
            }

            info!(
                "Loaded {} environment variables from {} ({} skipped - already set)",
                loaded_count, path, skipped_count
            );

            Some(path.to_string())
        }
        Err(e) => {
            warn!("Failed to read environment file {}: {}", path, e);
            None
        }
    }
}

/// Parse a single environment line into key-value pair.
fn parse_env_line(line: &str) -> Option<(String, String)> {
    // KEY=VALUE, KEY="VALUE", KEY='VALUE', optionally prefixed with `export`
    let line = line.strip_prefix("export ").unwrap_or(line);
    let (key, value) = line.split_once('=')?;
    let key = key.trim();
    let value = value.trim();

    if key.is_empty() {
        return None;
    }

    let value = value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .or_else(|| value.strip_prefix('\'').and_then(|v| v.strip_suffix('\'')))
        .unwrap_or(value);

    Some((key.to_string(), value.to_string()))
}

/// Get a configuration value with a default.
pub fn get_config(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Get an optional configuration value. Empty values count as unset.
pub fn get_config_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an integer configuration value.
pub fn get_config_int(key: &str, default: i64) -> i64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Snapshot of every setting the assistant reads from the environment.
///
/// Optional credentials are `None` when unset; adapters use that to pick their
/// fallback chain.
#[derive(Debug, Clone, Serialize)]
pub struct Settings {
    #[serde(skip_serializing)]
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    #[serde(skip_serializing)]
    pub openweather_api_key: Option<String>,
    #[serde(skip_serializing)]
    pub tavily_api_key: Option<String>,
    #[serde(skip_serializing)]
    pub lingua_robot_api_key: Option<String>,
    pub google_sheets_id: Option<String>,
    #[serde(skip_serializing)]
    pub google_sheets_api_key: Option<String>,
    pub gmail_address: Option<String>,
    #[serde(skip_serializing)]
    pub gmail_app_password: Option<String>,
    #[serde(skip_serializing)]
    pub resend_api_key: Option<String>,
    pub email_from: Option<String>,
    pub max_message_length: usize,
    pub tool_timeout_secs: u64,
    pub quota_limit: u32,
    pub port: u16,
    pub memory_file: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            gemini_api_key: None,
            gemini_model: DEFAULT_GEMINI_MODEL.to_string(),
            openweather_api_key: None,
            tavily_api_key: None,
            lingua_robot_api_key: None,
            google_sheets_id: None,
            google_sheets_api_key: None,
            gmail_address: None,
            gmail_app_password: None,
            resend_api_key: None,
            email_from: None,
            max_message_length: DEFAULT_MAX_MESSAGE_LENGTH,
            tool_timeout_secs: DEFAULT_TOOL_TIMEOUT_SECS,
            quota_limit: DEFAULT_QUOTA_LIMIT,
            port: DEFAULT_PORT,
            memory_file: None,
        }
    }
}

impl Settings {
    /// Read all settings from the process environment
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            gemini_api_key: get_config_opt("GEMINI_API_KEY").or_else(|| get_config_opt("GOOGLE_API_KEY")),
            gemini_model: get_config("GEMINI_MODEL", DEFAULT_GEMINI_MODEL),
            openweather_api_key: get_config_opt("OPENWEATHER_API_KEY"),
            tavily_api_key: get_config_opt("TAVILY_API_KEY"),
            lingua_robot_api_key: get_config_opt("LINGUA_ROBOT_API_KEY"),
            google_sheets_id: get_config_opt("GOOGLE_SHEETS_ID"),
            google_sheets_api_key: get_config_opt("GOOGLE_SHEETS_API_KEY"),
            gmail_address: get_config_opt("GMAIL_ADDRESS"),
            gmail_app_password: get_config_opt("GMAIL_APP_PASSWORD"),
            resend_api_key: get_config_opt("RESEND_API_KEY"),
            email_from: get_config_opt("EMAIL_FROM"),
            max_message_length: positive_or(
                get_config_int("MAX_MESSAGE_LENGTH", defaults.max_message_length as i64),
                defaults.max_message_length,
            ),
            tool_timeout_secs: positive_or(
                get_config_int("TOOL_TIMEOUT", defaults.tool_timeout_secs as i64),
                defaults.tool_timeout_secs,
            ),
            quota_limit: positive_or(
                get_config_int("GEMINI_QUOTA_LIMIT", defaults.quota_limit as i64),
                defaults.quota_limit,
            ),
            port: positive_or(get_config_int("AGENTIC_PORT", defaults.port as i64), defaults.port),
            memory_file: get_config_opt("MEMORY_FILE").map(PathBuf::from),
        }
    }

    /// Whether SMTP credentials are present
    pub fn has_smtp(&self) -> bool {
        self.gmail_address.is_some() && self.gmail_app_password.is_some()
    }

    /// Log which integrations are configured (never the secrets themselves)
    pub fn log_summary(&self) {
        info!(
            model = %self.gemini_model,
            llm = self.gemini_api_key.is_some(),
            weather = self.openweather_api_key.is_some(),
            search = self.tavily_api_key.is_some(),
            lingua_robot = self.lingua_robot_api_key.is_some(),
            sheets = self.google_sheets_id.is_some(),
            smtp = self.has_smtp(),
            resend = self.resend_api_key.is_some(),
            "Settings loaded"
        );
    }
}

fn positive_or<T: TryFrom<i64>>(value: i64, default: T) -> T {
    if value <= 0 {
        return default;
    }
    T::try_from(value).unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_env_line_simple() {
        let (k, v) = parse_env_line("FOO=bar").unwrap();
        assert_eq!(k, "FOO");
        assert_eq!(v, "bar");
    }

    #[test]
    fn test_parse_env_line_quoted() {
        let (k, v) = parse_env_line("GEMINI_MODEL=\"gemini pro\"").unwrap();
        assert_eq!(k, "GEMINI_MODEL");
        assert_eq!(v, "gemini pro");

        let (_, v) = parse_env_line("FOO='bar'").unwrap();
        assert_eq!(v, "bar");
    }

    #[test]
    fn test_parse_env_line_export_and_equals_in_value() {
        let (k, v) = parse_env_line("export TOKEN=a=b").unwrap();
        assert_eq!(k, "TOKEN");
        assert_eq!(v, "a=b");
    }

    #[test]
    fn test_parse_env_line_empty() {
        assert!(parse_env_line("").is_none());
        assert!(parse_env_line("=value").is_none());
    }

    #[test]
    fn test_positive_or() {
        assert_eq!(positive_or(0, 5u64), 5);
        assert_eq!(positive_or(-3, 5u64), 5);
        assert_eq!(positive_or(70000, 5001u16), 5001);
        assert_eq!(positive_or(8080, 5001u16), 8080);
    }

    #[test]
    fn test_settings_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.gemini_model, DEFAULT_GEMINI_MODEL);
        assert_eq!(settings.max_message_length, 4096);
        assert_eq!(settings.quota_limit, 50);
        assert!(!settings.has_smtp());
    }

    #[test]
    fn test_secret_masking() {
        assert!(is_secret("GEMINI_API_KEY"));
        assert!(is_secret("GMAIL_APP_PASSWORD"));
        assert!(!is_secret("GEMINI_MODEL"));
    }
}
