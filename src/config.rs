//! Configuration for the Telegram API credentials and session
//!
//! Values come from the process environment (optionally seeded from a `.env`
//! file) and from an optional `config.yml`. Environment variables take
//! precedence over config.yml values.

use serde::Deserialize;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use crate::error::{Error, Result};

/// Default session name; the grammers session lives in `<name>.session`.
pub const SESSION_NAME: &str = "draft_bot_session";
pub const CONFIG_FILE: &str = "config.yml";

pub const ENV_API_ID: &str = "TELEGRAM_API_ID";
pub const ENV_API_HASH: &str = "TELEGRAM_API_HASH";
pub const ENV_PHONE: &str = "TELEGRAM_PHONE";
pub const ENV_SESSION: &str = "TELEGRAM_SESSION";

/// YAML config structures
#[derive(Debug, Default, Deserialize)]
struct YamlConfig {
    telegram: Option<TelegramConfig>,
}

#[derive(Debug, Default, Deserialize)]
struct TelegramConfig {
    #[serde(default, deserialize_with = "deserialize_string_or_number")]
    api_id: Option<String>,
    api_hash: Option<String>,
    #[serde(default, deserialize_with = "deserialize_string_or_number")]
    phone: Option<String>,
    session_name: Option<String>,
}

/// Deserialize a value that can be either a string or a number
fn deserialize_string_or_number<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::Error;
    let value: Option<serde_yaml::Value> = Option::deserialize(deserializer)?;
    match value {
        None => Ok(None),
        Some(serde_yaml::Value::String(s)) => Ok(Some(s)),
        Some(serde_yaml::Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(D::Error::custom(format!(
            "expected string or number, got {:?}",
            other
        ))),
    }
}

/// Resolved configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub api_id: i32,
    pub api_hash: String,
    pub phone: Option<String>,
    pub session_name: String,
    pub lock_file: String,
}

impl Config {
    /// Load configuration from `.env`, the environment and an optional config.yml.
    pub fn load() -> Result<Self> {
        Self::load_dotenv();

        let telegram = match read_yaml(CONFIG_FILE)? {
            Some(section) => section,
            None => read_yaml(format!("../{}", CONFIG_FILE))?.unwrap_or_default(),
        };

        Self::resolve(telegram)
    }

    /// Load configuration with an explicit config file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::load_dotenv();

        let telegram = read_yaml(path.as_ref())?.ok_or_else(|| {
            Error::InvalidConfig(format!("config file {} not found", path.as_ref().display()))
        })?;

        Self::resolve(telegram)
    }

    /// Build configuration from the environment alone.
    pub fn from_env() -> Result<Self> {
        Self::resolve(TelegramConfig::default())
    }

    /// Path of the persisted grammers session.
    pub fn session_file(&self) -> String {
        format!("{}.session", self.session_name)
    }

    fn resolve(telegram: TelegramConfig) -> Result<Self> {
        let api_id_raw = resolve_env_string(telegram.api_id, ENV_API_ID)
            .ok_or_else(|| Error::MissingCredentials(format!("{} must be set", ENV_API_ID)))?;
        let api_hash = resolve_env_string(telegram.api_hash, ENV_API_HASH)
            .ok_or_else(|| Error::MissingCredentials(format!("{} must be set", ENV_API_HASH)))?;

        let api_id = parse_api_id(&api_id_raw)?;
        let phone = resolve_env_string(telegram.phone, ENV_PHONE);
        let session_name = resolve_env_string(telegram.session_name, ENV_SESSION)
            .unwrap_or_else(|| SESSION_NAME.to_string());
        let lock_file = format!("{}.lock", session_name);

        Ok(Self {
            api_id,
            api_hash,
            phone,
            session_name,
            lock_file,
        })
    }

    /// Load .env file into environment variables using dotenvy
    fn load_dotenv() {
        // Try to load from current directory first, then parent
        if dotenvy::dotenv().is_err() {
            let _ = dotenvy::from_filename("../.env");
        }
    }
}

/// Read the `telegram:` section of a YAML config. A missing file is not an error.
fn read_yaml<P: AsRef<Path>>(path: P) -> Result<Option<TelegramConfig>> {
    let content = match fs::read_to_string(path.as_ref()) {
        Ok(content) => content,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(Error::IoError(err)),
    };

    let yaml: YamlConfig = serde_yaml::from_str(&content)?;
    Ok(Some(yaml.telegram.unwrap_or_default()))
}

/// Resolve a value: a `${VAR}` placeholder reads VAR, then the explicit
/// env key, then the literal YAML value. Blank values count as unset.
fn resolve_env_string(value: Option<String>, env_key: &str) -> Option<String> {
    if let Some(ref v) = value {
        if let Some(var_name) = v.strip_prefix("${").and_then(|rest| rest.strip_suffix('}')) {
            if let Some(env_val) = non_blank_env(var_name) {
                return Some(env_val);
            }
        }
    }

    if let Some(env_val) = non_blank_env(env_key) {
        return Some(env_val);
    }

    value
        .filter(|v| !(v.starts_with("${") && v.ends_with('}')))
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn non_blank_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_api_id(raw: &str) -> Result<i32> {
    match raw.parse::<i32>() {
        Ok(id) if id > 0 => Ok(id),
        _ => Err(Error::InvalidConfig(format!(
            "{} must be a positive integer, got '{}'",
            ENV_API_ID, raw
        ))),
    }
}
