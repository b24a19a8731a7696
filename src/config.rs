//! Configuration for the bot session and the upload request
//!
//! Credentials come from the environment (`API_ID`, `API_HASH`, `BOT_TOKEN`),
//! optionally seeded from a `.env` file. The request comes from the CLI.

use std::env;
use std::fmt;
use std::path::PathBuf;

use crate::error::{Error, Result};

/// Default session file, matching the bot's session name.
pub const SESSION_FILE: &str = "bot.session";

pub const ENV_API_ID: &str = "API_ID";
pub const ENV_API_HASH: &str = "API_HASH";
pub const ENV_BOT_TOKEN: &str = "BOT_TOKEN";

/// Bot credentials. Immutable once loaded.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub api_id: i32,
    pub api_hash: String,
    pub bot_token: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("api_id", &self.api_id)
            .field("api_hash", &"<redacted>")
            .field("bot_token", &"<redacted>")
            .finish()
    }
}

impl Credentials {
    /// Load credentials from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load credentials through an arbitrary lookup.
    ///
    /// Variables are checked in order, so the first missing one is reported.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| -> Result<String> {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or_else(|| Error::Configuration(format!("{} is missing", key)))
        };

        let raw_id = required(ENV_API_ID)?;
        let api_id = raw_id.parse::<i32>().map_err(|_| {
            Error::Configuration(format!("{} must be an integer, got '{}'", ENV_API_ID, raw_id))
        })?;
        let api_hash = required(ENV_API_HASH)?;
        let bot_token = required(ENV_BOT_TOKEN)?;

        Ok(Self {
            api_id,
            api_hash,
            bot_token,
        })
    }
}

/// What to send and where.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRequest {
    pub recipient: String,
    pub caption: String,
    pub file_paths: Vec<PathBuf>,
}

impl UploadRequest {
    /// Build a request from raw CLI values.
    ///
    /// `files` may contain newline-delimited lists (CI multi-line inputs).
    pub fn new(to: Option<&str>, message: Option<&str>, files: &[String]) -> Result<Self> {
        let recipient = to
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| Error::Configuration("recipient (--to) is missing".to_string()))?
            .to_string();

        let file_paths: Vec<PathBuf> = process_files_arg(files)
            .into_iter()
            .map(PathBuf::from)
            .collect();
        if file_paths.is_empty() {
            return Err(Error::Configuration(
                "no files given (--files)".to_string(),
            ));
        }

        Ok(Self {
            recipient,
            caption: message.unwrap_or_default().to_string(),
            file_paths,
        })
    }
}

/// Flatten `--files` values, splitting each on line breaks.
///
/// Lines are trimmed at both ends and blank lines dropped; interior
/// whitespace is part of the path.
pub fn process_files_arg(files: &[String]) -> Vec<String> {
    files
        .iter()
        .flat_map(|arg| arg.lines())
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Load .env file into environment variables using dotenvy
pub fn load_dotenv() {
    // Try to load from current directory first, then parent
    if dotenvy::dotenv().is_err() {
        let _ = dotenvy::from_filename("../.env");
    }
}
