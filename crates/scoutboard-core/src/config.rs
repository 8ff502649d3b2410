// Configuration loading and parsing (scoutboard.toml, credentials.toml).

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::search_cache::DEFAULT_CAPACITY;

/// Environment variable that overrides the bearer token from credentials.toml.
pub const TOKEN_ENV_VAR: &str = "SCOUTBOARD_TOKEN";

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },

    #[error("failed to initialize config from defaults: {message}")]
    DefaultsCopyError { message: String },
}

// ---------------------------------------------------------------------------
// Top-level assembled Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Config {
    pub api: ApiConfig,
    pub search: SearchConfig,
    pub logging: LoggingConfig,
    pub credentials: CredentialsConfig,
}

// ---------------------------------------------------------------------------
// scoutboard.toml structs
// ---------------------------------------------------------------------------

/// Raw deserialization target for the entire scoutboard.toml file.
#[derive(Debug, Clone, Deserialize)]
struct ScoutboardFile {
    api: ApiConfig,
    #[serde(default)]
    search: SearchConfig,
    #[serde(default)]
    logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// Root of the player-lists API, e.g. `https://scouting.example.com/api`.
    #[serde(default)]
    pub base_url: String,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// Run against the in-memory backend instead of a server.
    #[serde(default)]
    pub offline: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchConfig {
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        SearchConfig {
            debounce_ms: default_debounce_ms(),
            cache_capacity: default_cache_capacity(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            filter: default_log_filter(),
        }
    }
}

fn default_request_timeout_ms() -> u64 {
    10_000
}

fn default_debounce_ms() -> u64 {
    300
}

fn default_cache_capacity() -> usize {
    DEFAULT_CAPACITY
}

fn default_log_filter() -> String {
    "scoutboard=info,warn".to_string()
}

// ---------------------------------------------------------------------------
// credentials.toml structs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize, Default)]
pub struct CredentialsConfig {
    pub bearer_token: Option<String>,
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Load and validate configuration from `config/scoutboard.toml` and
/// (optionally) `config/credentials.toml`, relative to `base_dir`.
///
/// Does not copy defaults; `load_config()` does that first.
pub fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let config_dir = base_dir.join("config");

    // --- scoutboard.toml (required) ---
    let main_path = config_dir.join("scoutboard.toml");
    let main_text = read_file(&main_path)?;
    let file: ScoutboardFile =
        toml::from_str(&main_text).map_err(|e| ConfigError::ParseError {
            path: main_path.clone(),
            source: e,
        })?;

    // --- credentials.toml (optional) ---
    let credentials_path = config_dir.join("credentials.toml");
    let mut credentials: CredentialsConfig = if credentials_path.exists() {
        let cred_text = read_file(&credentials_path)?;
        toml::from_str(&cred_text).map_err(|e| ConfigError::ParseError {
            path: credentials_path.clone(),
            source: e,
        })?
    } else {
        CredentialsConfig::default()
    };

    if let Ok(token) = std::env::var(TOKEN_ENV_VAR) {
        if !token.trim().is_empty() {
            credentials.bearer_token = Some(token);
        }
    }

    let config = Config {
        api: file.api,
        search: file.search,
        logging: file.logging,
        credentials,
    };

    validate(&config)?;

    Ok(config)
}

/// File seeded from `defaults/` on first run. `credentials.toml` is never
/// seeded; `defaults/credentials.toml.example` documents it.
const MAIN_FILE: &str = "scoutboard.toml";

/// Directory, relative to the working directory, that holds `scoutboard.log`.
pub const LOG_DIR: &str = "logs";

/// Seed `config/scoutboard.toml` from `defaults/` if it does not exist yet.
///
/// Returns the path written, or `None` when the file was already present. An
/// existing file is never overwritten.
pub fn ensure_config_files(base_dir: &Path) -> Result<Option<PathBuf>, ConfigError> {
    let target = base_dir.join("config").join(MAIN_FILE);
    if target.exists() {
        return Ok(None);
    }

    let source = base_dir.join("defaults").join(MAIN_FILE);
    if !source.is_file() {
        return Err(ConfigError::DefaultsCopyError {
            message: format!(
                "{} is missing and there is no {} to seed it from",
                target.display(),
                source.display()
            ),
        });
    }

    let copy_err = |e: std::io::Error| ConfigError::DefaultsCopyError {
        message: format!("failed to seed {}: {e}", target.display()),
    };
    std::fs::create_dir_all(base_dir.join("config")).map_err(copy_err)?;
    std::fs::copy(&source, &target).map_err(copy_err)?;
    Ok(Some(target))
}

/// Seed and load configuration relative to the working directory.
pub fn load_config() -> Result<Config, ConfigError> {
    let cwd = std::env::current_dir().map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("cannot determine working directory: {e}"),
    })?;
    ensure_config_files(&cwd)?;
    load_config_from(&cwd)
}

/// `logs/` under the working directory.
pub fn default_log_dir() -> Result<PathBuf, std::io::Error> {
    Ok(std::env::current_dir()?.join(LOG_DIR))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate(config: &Config) -> Result<(), ConfigError> {
    if !config.api.offline {
        let url = config.api.base_url.trim();
        if url.is_empty() {
            return Err(ConfigError::ValidationError {
                field: "api.base_url".into(),
                message: "must be set unless api.offline = true".into(),
            });
        }
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ConfigError::ValidationError {
                field: "api.base_url".into(),
                message: format!("must be an http(s) URL, got {url}"),
            });
        }
    }

    let positive: &[(&str, u64)] = &[
        ("api.request_timeout_ms", config.api.request_timeout_ms),
        ("search.debounce_ms", config.search.debounce_ms),
        ("search.cache_capacity", config.search.cache_capacity as u64),
    ];
    for (name, val) in positive {
        if *val == 0 {
            return Err(ConfigError::ValidationError {
                field: name.to_string(),
                message: "must be > 0".into(),
            });
        }
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const VALID: &str = r#"
[api]
base_url = "https://scouting.example.com/api"
request_timeout_ms = 5000

[search]
debounce_ms = 300
cache_capacity = 20
"#;

    /// Fresh scratch directory with a `config/` subdirectory.
    fn scratch(name: &str) -> PathBuf {
        let tmp = std::env::temp_dir().join(format!("scoutboard_config_{name}"));
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(tmp.join("config")).unwrap();
        tmp
    }

    fn expect_validation_field(err: ConfigError, expected: &str) {
        match err {
            ConfigError::ValidationError { field, .. } => assert_eq!(field, expected),
            other => panic!("expected ValidationError, got: {other}"),
        }
    }

    #[test]
    fn load_valid_config() {
        let tmp = scratch("valid");
        fs::write(tmp.join("config/scoutboard.toml"), VALID).unwrap();

        let config = load_config_from(&tmp).expect("should load valid config");
        assert_eq!(config.api.base_url, "https://scouting.example.com/api");
        assert_eq!(config.api.request_timeout_ms, 5000);
        assert!(!config.api.offline);
        assert_eq!(config.search.debounce_ms, 300);
        assert_eq!(config.search.cache_capacity, 20);
        assert_eq!(config.logging.filter, "scoutboard=info,warn");

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn search_and_logging_sections_are_optional() {
        let tmp = scratch("minimal");
        fs::write(
            tmp.join("config/scoutboard.toml"),
            "[api]\nbase_url = \"http://localhost:8000\"\n",
        )
        .unwrap();

        let config = load_config_from(&tmp).unwrap();
        assert_eq!(config.api.request_timeout_ms, 10_000);
        assert_eq!(config.search.debounce_ms, 300);
        assert_eq!(config.search.cache_capacity, DEFAULT_CAPACITY);

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn offline_mode_needs_no_base_url() {
        let tmp = scratch("offline");
        fs::write(tmp.join("config/scoutboard.toml"), "[api]\noffline = true\n").unwrap();

        let config = load_config_from(&tmp).unwrap();
        assert!(config.api.offline);

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn credentials_toml_with_token() {
        let tmp = scratch("creds");
        fs::write(tmp.join("config/scoutboard.toml"), VALID).unwrap();
        fs::write(
            tmp.join("config/credentials.toml"),
            "bearer_token = \"tok-123\"\n",
        )
        .unwrap();

        let config = load_config_from(&tmp).unwrap();
        // The env override may be set in the developer's shell.
        if std::env::var(TOKEN_ENV_VAR).is_err() {
            assert_eq!(config.credentials.bearer_token.as_deref(), Some("tok-123"));
        }

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn rejects_missing_base_url() {
        let tmp = scratch("no_url");
        fs::write(tmp.join("config/scoutboard.toml"), "[api]\n").unwrap();

        let err = load_config_from(&tmp).unwrap_err();
        expect_validation_field(err, "api.base_url");

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn rejects_non_http_base_url() {
        let tmp = scratch("ftp_url");
        fs::write(
            tmp.join("config/scoutboard.toml"),
            "[api]\nbase_url = \"ftp://example.com\"\n",
        )
        .unwrap();

        let err = load_config_from(&tmp).unwrap_err();
        expect_validation_field(err, "api.base_url");

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn rejects_zero_debounce() {
        let tmp = scratch("zero_debounce");
        fs::write(
            tmp.join("config/scoutboard.toml"),
            VALID.replace("debounce_ms = 300", "debounce_ms = 0"),
        )
        .unwrap();

        let err = load_config_from(&tmp).unwrap_err();
        expect_validation_field(err, "search.debounce_ms");

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn rejects_zero_cache_capacity() {
        let tmp = scratch("zero_cache");
        fs::write(
            tmp.join("config/scoutboard.toml"),
            VALID.replace("cache_capacity = 20", "cache_capacity = 0"),
        )
        .unwrap();

        let err = load_config_from(&tmp).unwrap_err();
        expect_validation_field(err, "search.cache_capacity");

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn file_not_found_for_missing_main_file() {
        let tmp = scratch("missing");

        match load_config_from(&tmp).unwrap_err() {
            ConfigError::FileNotFound { path } => assert!(path.ends_with("scoutboard.toml")),
            other => panic!("expected FileNotFound, got: {other}"),
        }

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn parse_error_for_invalid_toml() {
        let tmp = scratch("invalid");
        fs::write(tmp.join("config/scoutboard.toml"), "this is not valid [[[ toml").unwrap();

        match load_config_from(&tmp).unwrap_err() {
            ConfigError::ParseError { path, .. } => assert!(path.ends_with("scoutboard.toml")),
            other => panic!("expected ParseError, got: {other}"),
        }

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn seeds_main_file_once() {
        let tmp = std::env::temp_dir().join("scoutboard_config_seed");
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(tmp.join("defaults")).unwrap();
        fs::write(tmp.join("defaults/scoutboard.toml"), VALID).unwrap();
        fs::write(tmp.join("defaults/credentials.toml.example"), "bearer_token = \"...\"\n")
            .unwrap();

        let seeded = ensure_config_files(&tmp).unwrap();
        assert_eq!(seeded, Some(tmp.join("config/scoutboard.toml")));
        assert!(!tmp.join("config/credentials.toml").exists());
        assert!(load_config_from(&tmp).is_ok());

        fs::write(tmp.join("config/scoutboard.toml"), "# edited\n").unwrap();
        assert_eq!(ensure_config_files(&tmp).unwrap(), None);
        assert_eq!(
            fs::read_to_string(tmp.join("config/scoutboard.toml")).unwrap(),
            "# edited\n"
        );

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn existing_config_needs_no_defaults() {
        let tmp = scratch("no_defaults");
        fs::write(tmp.join("config/scoutboard.toml"), VALID).unwrap();
        assert_eq!(ensure_config_files(&tmp).unwrap(), None);
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn missing_config_and_defaults_is_an_error() {
        let tmp = std::env::temp_dir().join("scoutboard_config_nothing");
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(&tmp).unwrap();

        match ensure_config_files(&tmp).unwrap_err() {
            ConfigError::DefaultsCopyError { message } => {
                assert!(message.contains("no "), "{message}");
                assert!(message.contains("defaults"), "{message}");
            }
            other => panic!("expected DefaultsCopyError, got: {other}"),
        }

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn log_dir_is_under_working_directory() {
        let dir = default_log_dir().unwrap();
        assert!(dir.ends_with("logs"));
        assert!(dir.starts_with(std::env::current_dir().unwrap()));
    }
}
