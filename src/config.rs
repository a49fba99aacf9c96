use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] serde_json::Error),

    #[error("Failed to create config directory")]
    CreateDirError,
}

/// Every problem found while validating a report request, in input order.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{}", .0.join(" "))]
pub struct ValidationError(pub Vec<String>);

/// Handshake style the user asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Security {
    Ssl,
    StartTls,
}

impl FromStr for Security {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "ssl" => Ok(Security::Ssl),
            "starttls" => Ok(Security::StartTls),
            _ => Err("Security must be SSL or STARTTLS.".to_string()),
        }
    }
}

impl fmt::Display for Security {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Security::Ssl => write!(f, "ssl"),
            Security::StartTls => write!(f, "starttls"),
        }
    }
}

pub const DEFAULT_MAILBOX: &str = "INBOX";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerProfile {
    pub host: String,
    pub port: u16,
    pub security: Security,
    pub mailbox: String,
    pub username: String,
}

impl Default for ServerProfile {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: 993,
            security: Security::Ssl,
            mailbox: DEFAULT_MAILBOX.to_string(),
            username: String::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: Option<ServerProfile>,
    pub connect_timeout_secs: u64,
    pub default_window_days: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: None,
            connect_timeout_secs: 10,
            default_window_days: 7,
        }
    }
}

impl Config {
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        let path = Path::new(path);

        // A missing file is not an error, it just means defaults
        if !path.exists() {
            return Ok(Config::default());
        }

        let content = fs::read_to_string(path)?;
        let config = serde_json::from_str(&content)?;

        Ok(config)
    }

    pub fn save(&self, path: &str) -> Result<(), ConfigError> {
        let path = Path::new(path);

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|_| ConfigError::CreateDirError)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;

        Ok(())
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs.max(1))
    }
}

/// Raw, unvalidated request fields as they arrive from the command line
/// (after merging with the saved profile).
#[derive(Debug, Clone, Default)]
pub struct RequestInput {
    pub host: String,
    pub port: Option<u16>,
    pub security: String,
    pub mailbox: String,
    pub username: String,
    pub password: String,
    pub start_date: String,
    pub end_date: String,
}

#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// A report request that passed validation. Date ordering and range size are
/// checked later by the window planner.
#[derive(Debug, Clone)]
pub struct ReportRequest {
    pub host: String,
    pub port: u16,
    pub security: Security,
    pub mailbox: String,
    pub credentials: Credentials,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl RequestInput {
    pub fn validate(&self) -> Result<ReportRequest, ValidationError> {
        let mut errors = Vec::new();

        let host = self.host.trim();
        if host.is_empty() {
            errors.push("Mail server is required.".to_string());
        }
        let port = match self.port {
            Some(port) if port > 0 => port,
            _ => {
                errors.push("Connection port must be a positive number.".to_string());
                0
            }
        };
        let username = self.username.trim();
        if username.is_empty() {
            errors.push("Username is required.".to_string());
        }
        if self.password.is_empty() {
            errors.push("Password is required.".to_string());
        }
        let security = match self.security.parse::<Security>() {
            Ok(security) => Some(security),
            Err(message) => {
                errors.push(message);
                None
            }
        };
        let mailbox = match self.mailbox.trim() {
            "" => DEFAULT_MAILBOX,
            name => name,
        };

        let start = parse_date(&self.start_date);
        if start.is_none() {
            errors.push("Start date is invalid.".to_string());
        }
        let end = parse_date(&self.end_date);
        if end.is_none() {
            errors.push("End date is invalid.".to_string());
        }

        match (security, start, end) {
            (Some(security), Some(start), Some(end)) if errors.is_empty() => Ok(ReportRequest {
                host: host.to_string(),
                port,
                security,
                mailbox: mailbox.to_string(),
                credentials: Credentials {
                    username: username.to_string(),
                    password: self.password.clone(),
                },
                start,
                end,
            }),
            _ => Err(ValidationError(errors)),
        }
    }
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").ok()
}
