//! Session configuration loading
//!
//! Configuration is resolved once, before a session opens:
//! 1. TOML file (every field optional, defaults fill the rest)
//! 2. Environment variables (acquisition overrides)
//! 3. Validation
//!
//! The resulting [`SessionConfig`] is handed to each session by value.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, warn};

use venturi_core::config::SessionConfig;
use venturi_core::error::ConfigError;

/// Default configuration file name
pub const CONFIG_FILE_NAME: &str = "venturi.toml";

/// Environment variable naming an explicit configuration file
pub const CONFIG_PATH_ENV: &str = "VENTURI_CONFIG_PATH";

/// Parent directories searched for [`CONFIG_FILE_NAME`]
const SEARCH_DEPTH: usize = 5;

/// Errors while locating, reading or validating configuration
#[derive(Error, Debug)]
pub enum LoadError {
    /// No configuration file found
    #[error("Config file not found: {0}")]
    FileNotFound(String),

    /// File could not be read
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// File is not valid TOML for a session configuration
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),

    /// Parsed configuration failed validation
    #[error(transparent)]
    Invalid(#[from] ConfigError),
}

/// Result type for configuration loading
pub type LoadResult<T> = Result<T, LoadError>;

/// Find the configuration file
///
/// Search order:
/// 1. `VENTURI_CONFIG_PATH` environment variable
/// 2. `./venturi.toml`
/// 3. `venturi.toml` in up to five parent directories
///
/// # Errors
///
/// Returns `LoadError::FileNotFound` if no location holds a file.
pub fn find_config_file() -> LoadResult<PathBuf> {
    let cwd = env::current_dir().ok();
    locate_config(env::var(CONFIG_PATH_ENV).ok(), cwd.as_deref())
}

/// Resolve the configuration file from an explicit path or a search
/// starting at `start`
fn locate_config(env_path: Option<String>, start: Option<&Path>) -> LoadResult<PathBuf> {
    if let Some(env_path) = env_path {
        let path = PathBuf::from(env_path);
        if path.exists() {
            return Ok(path);
        }
        return Err(LoadError::FileNotFound(format!(
            "{CONFIG_PATH_ENV} points to a missing file: {}",
            path.display()
        )));
    }

    let search_paths: Vec<PathBuf> = start
        .map(|dir| dir.ancestors().take(SEARCH_DEPTH + 1).map(|d| d.join(CONFIG_FILE_NAME)).collect())
        .unwrap_or_default();

    if let Some(found) = search_paths.iter().find(|p| p.exists()) {
        return Ok(found.clone());
    }

    let searched = search_paths
        .iter()
        .map(|p| format!("  - {}", p.display()))
        .collect::<Vec<_>>()
        .join("\n");
    Err(LoadError::FileNotFound(format!(
        "'{CONFIG_FILE_NAME}' not found in any of these locations:\n{searched}\n\nSet {CONFIG_PATH_ENV} to specify a custom location."
    )))
}

/// Load, override and validate a configuration
///
/// # Arguments
///
/// * `config_path` - File to read; searched for with [`find_config_file`] if `None`
///
/// # Errors
///
/// Returns an error if the file is missing, unreadable, not valid TOML, or
/// fails validation after overrides.
pub fn load_config(config_path: Option<&Path>) -> LoadResult<SessionConfig> {
    let config_file = match config_path {
        Some(path) => path.to_path_buf(),
        None => find_config_file()?,
    };
    debug!(path = %config_file.display(), "Loading configuration");

    let content = fs::read_to_string(&config_file)?;
    let mut config = parse_config(&content)?;
    apply_overrides(&mut config, |key| env::var(key).ok());
    config.validate()?;
    Ok(config)
}

/// Parse configuration TOML without overrides or validation
///
/// # Errors
///
/// Returns `LoadError::Parse` for malformed TOML or mistyped fields.
pub fn parse_config(content: &str) -> LoadResult<SessionConfig> {
    Ok(toml::from_str(content)?)
}

/// Apply acquisition overrides looked up through `lookup`
///
/// Supported variables:
/// - `VENTURI_SAMPLE_RATE_HZ` -> `signal.sample_rate_hz`
/// - `VENTURI_CHANNEL_COUNT` -> `signal.channel_count`
/// - `VENTURI_WINDOW_SIZE` -> `signal.window_size`
/// - `VENTURI_BUFFER_CAPACITY` -> `signal.buffer_capacity`
///
/// Unparseable values are ignored with a warning.
pub fn apply_overrides<F>(config: &mut SessionConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(v) = parsed(&lookup, "VENTURI_SAMPLE_RATE_HZ") {
        config.signal.sample_rate_hz = v;
    }
    if let Some(v) = parsed(&lookup, "VENTURI_CHANNEL_COUNT") {
        config.signal.channel_count = v;
    }
    if let Some(v) = parsed(&lookup, "VENTURI_WINDOW_SIZE") {
        config.signal.window_size = v;
    }
    if let Some(v) = parsed(&lookup, "VENTURI_BUFFER_CAPACITY") {
        config.signal.buffer_capacity = v;
    }
}

fn parsed<T, F>(lookup: &F, key: &str) -> Option<T>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            warn!(key, value = %raw, "Ignoring unparseable override");
            None
        }
    }
}
