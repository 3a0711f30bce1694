//! # Configuration Management
//!
//! Centralized configuration for version identification, archive decoding and logging.
//!
//! ## Configuration Sources
//! - TOML files via `from_file()`
//! - Direct instantiation with defaults
//! - Environment-specific overrides via `from_env()`
//!
//! The identify toggle lets callers skip the network handshake entirely and fall back
//! to a timestamp-based name for the output directory.

use crate::error::{GamepackError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::Level;

/// Port the version handshake server listens on
pub const DEFAULT_PORT: u16 = 43594;

/// Host queried for the current version
pub const DEFAULT_HOST: &str = "world2.runescape.com";

/// Major version the search starts from
pub const DEFAULT_MAJOR_VERSION: u32 = 833;

/// Minor version sent with every handshake
pub const DEFAULT_MINOR_VERSION: u32 = 1;

/// Attempts made before giving up on identification
pub const DEFAULT_ATTEMPT_COUNT: u32 = 100;

/// Interval between polls for a handshake response
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Upper bound for encrypted and decompressed archive sizes (64 MB)
pub const MAX_ARCHIVE_SIZE: usize = 64 * 1024 * 1024;

/// Name of the encrypted archive inside the gamepack jar
pub const ENCRYPTED_ARCHIVE_NAME: &str = "inner.pack.gz";

/// Suffix of compiled class entries
pub const CLASS_SUFFIX: &str = ".class";

/// World whose applet page carries the client parameters
pub const DEFAULT_WORLD: u32 = 2;

/// Which game's client is being retrieved.
///
/// Only the RuneScape gamepack hides its classes in an encrypted inner archive; the
/// other clients ship them as plain jar entries.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum ClientSource {
    Classic,
    Oldschool,
    #[default]
    Runescape,
}

impl ClientSource {
    pub const ALL: [ClientSource; 3] = [
        ClientSource::Classic,
        ClientSource::Oldschool,
        ClientSource::Runescape,
    ];

    /// Lowercase name, as used in configuration and directory names
    pub fn name(self) -> &'static str {
        match self {
            ClientSource::Classic => "classic",
            ClientSource::Oldschool => "oldschool",
            ClientSource::Runescape => "runescape",
        }
    }

    pub fn is_encrypted(self) -> bool {
        matches!(self, ClientSource::Runescape)
    }

    /// Whether the version handshake applies to this client
    pub fn supports_identification(self) -> bool {
        matches!(self, ClientSource::Runescape)
    }

    /// File name the downloaded jar is saved under
    pub fn jar_name(self) -> &'static str {
        if self.is_encrypted() {
            "gamepack.jar"
        } else {
            "client.jar"
        }
    }

    /// Base URL the gamepack location is resolved against.
    pub fn client_url(self, world: u32) -> String {
        let (prefix, suffix) = match self {
            ClientSource::Classic => ("classic", ".runescape.com/"),
            ClientSource::Oldschool => ("oldschool", ".runescape.com/"),
            ClientSource::Runescape => ("world", ".runescape.com/g=runescape/"),
        };
        format!("http://{prefix}{world}{suffix}")
    }

    /// Applet page URL; `j0` marks a client with a working Java installation.
    pub fn page_url(self, world: u32) -> String {
        format!("{}j0", self.client_url(world))
    }
}

impl fmt::Display for ClientSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ClientSource {
    type Err = GamepackError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|source| source.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| GamepackError::Config(format!("Unknown client source: {s}")))
    }
}

/// Main configuration structure that contains all configurable settings
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct LynxConfig {
    /// Version identification settings
    #[serde(default)]
    pub identify: IdentifyConfig,

    /// Archive decoding settings
    #[serde(default)]
    pub archive: ArchiveConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl LynxConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut file = File::open(path)
            .map_err(|e| GamepackError::Config(format!("Failed to open config file: {e}")))?;

        let mut contents = String::new();
        file.read_to_string(&mut contents)
            .map_err(|e| GamepackError::Config(format!("Failed to read config file: {e}")))?;

        Self::from_toml(&contents)
    }

    /// Load configuration from TOML string
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str::<Self>(content)
            .map_err(|e| GamepackError::Config(format!("Failed to parse TOML: {e}")))
    }

    /// Load configuration from environment variables
    ///
    /// Unset variables keep their defaults; a set but unparsable value is an error.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(host) = std::env::var("LYNX_HOST") {
            config.identify.host = host;
        }

        if let Some(port) = env_value("LYNX_PORT")? {
            config.identify.port = port;
        }

        if let Some(major) = env_value("LYNX_MAJOR_VERSION")? {
            config.identify.major_version = major;
        }

        if let Some(attempts) = env_value("LYNX_MAX_ATTEMPTS")? {
            config.identify.max_attempts = attempts;
        }

        if let Some(interval) = env_value::<u64>("LYNX_POLL_INTERVAL_MS")? {
            config.identify.poll_interval = Duration::from_millis(interval);
        }

        if let Some(enabled) = env_value("LYNX_IDENTIFY")? {
            config.identify.enabled = enabled;
        }

        if let Some(source) = env_value("LYNX_SOURCE")? {
            config.archive.source = source;
        }

        Ok(config)
    }

    /// Apply overrides to the default configuration
    pub fn default_with_overrides<F>(mutator: F) -> Self
    where
        F: FnOnce(&mut Self),
    {
        let mut config = Self::default();
        mutator(&mut config);
        config
    }

    /// Generate example configuration file content
    pub fn example_config() -> String {
        toml::to_string_pretty(&Self::default())
            .unwrap_or_else(|_| String::from("# Failed to generate example config"))
    }

    /// Validate the configuration for common issues and misconfigurations
    ///
    /// Returns a list of validation errors. Empty list means configuration is valid.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        errors.extend(self.identify.validate());
        errors.extend(self.archive.validate());
        errors.extend(self.logging.validate());
        errors
    }

    /// Validate and return Result - convenience method
    pub fn validate_strict(&self) -> Result<()> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(GamepackError::Config(format!(
                "Configuration validation failed:\n  - {}",
                errors.join("\n  - ")
            )))
        }
    }
}

/// Parse an environment variable, treating an unset variable as `None`.
fn env_value<T>(name: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| GamepackError::Config(format!("Invalid {name}: {e}"))),
        Err(std::env::VarError::NotPresent) => Ok(None),
        Err(e) => Err(GamepackError::Config(format!("Invalid {name}: {e}"))),
    }
}

/// Version identification settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IdentifyConfig {
    /// Whether the handshake is performed at all
    pub enabled: bool,

    /// Host of the handshake server
    pub host: String,

    /// Port of the handshake server
    pub port: u16,

    /// Major version the search starts from
    pub major_version: u32,

    /// Minor version sent with every request
    pub minor_version: u32,

    /// Polling iterations before giving up
    pub max_attempts: u32,

    /// Maximum wait for a response byte per iteration
    #[serde(with = "duration_serde")]
    pub poll_interval: Duration,

    /// Timeout for opening each connection
    #[serde(with = "duration_serde")]
    pub connect_timeout: Duration,
}

impl Default for IdentifyConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            host: String::from(DEFAULT_HOST),
            port: DEFAULT_PORT,
            major_version: DEFAULT_MAJOR_VERSION,
            minor_version: DEFAULT_MINOR_VERSION,
            max_attempts: DEFAULT_ATTEMPT_COUNT,
            poll_interval: DEFAULT_POLL_INTERVAL,
            connect_timeout: Duration::from_secs(5),
        }
    }
}

impl IdentifyConfig {
    /// `host:port` string used to open connections
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Validate identification configuration
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.host.is_empty() {
            errors.push("Handshake host cannot be empty".to_string());
        }

        if self.port == 0 {
            errors.push("Handshake port must be greater than 0".to_string());
        }

        if self.max_attempts == 0 {
            errors.push("Max attempts must be greater than 0".to_string());
        }

        if self.poll_interval.as_millis() < 10 {
            errors.push("Poll interval too short (minimum: 10ms)".to_string());
        } else if self.poll_interval.as_secs() > 60 {
            errors.push("Poll interval too long (maximum: 60s)".to_string());
        }

        if self.connect_timeout.as_millis() < 100 {
            errors.push("Connect timeout too short (minimum: 100ms)".to_string());
        } else if self.connect_timeout.as_secs() > 300 {
            errors.push("Connect timeout too long (maximum: 300s)".to_string());
        }

        errors
    }
}

/// Archive decoding settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ArchiveConfig {
    /// Client whose gamepack is decoded
    #[serde(default)]
    pub source: ClientSource,

    /// Largest accepted archive at any decoding stage, in bytes
    pub max_archive_size: usize,

    /// Name of the encrypted entry inside the gamepack jar
    pub inner_archive_name: String,

    /// Suffix identifying compiled class entries
    pub class_suffix: String,

    /// Program used to reverse Pack200 streams
    pub unpack200_program: String,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            source: ClientSource::default(),
            max_archive_size: MAX_ARCHIVE_SIZE,
            inner_archive_name: String::from(ENCRYPTED_ARCHIVE_NAME),
            class_suffix: String::from(CLASS_SUFFIX),
            unpack200_program: String::from("unpack200"),
        }
    }
}

impl ArchiveConfig {
    /// Validate archive configuration
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.max_archive_size < 1024 {
            errors.push("Max archive size too small (minimum: 1 KB)".to_string());
        } else if self.max_archive_size > 1024 * 1024 * 1024 {
            errors.push(format!(
                "Max archive size too large: {} bytes (maximum: 1 GB)",
                self.max_archive_size
            ));
        }

        if self.inner_archive_name.is_empty() {
            errors.push("Inner archive name cannot be empty".to_string());
        }

        if self.class_suffix.is_empty() {
            errors.push("Class suffix cannot be empty".to_string());
        }

        if self.unpack200_program.is_empty() {
            errors.push("unpack200 program cannot be empty".to_string());
        }

        errors
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(with = "log_level_serde")]
    pub log_level: Level,

    /// Whether to use JSON formatting for logs
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_level: Level::INFO,
            json_format: false,
        }
    }
}

impl LoggingConfig {
    /// Validate logging configuration
    pub fn validate(&self) -> Vec<String> {
        // Every level/format combination is currently valid
        Vec::new()
    }
}

/// Helper module for Duration serialization/deserialization
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let millis = duration.as_millis() as u64;
        millis.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

/// Helper module for tracing::Level serialization/deserialization
mod log_level_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::str::FromStr;
    use tracing::Level;

    pub fn serialize<S>(level: &Level, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let level_str = match *level {
            Level::TRACE => "trace",
            Level::DEBUG => "debug",
            Level::INFO => "info",
            Level::WARN => "warn",
            Level::ERROR => "error",
        };
        level_str.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Level, D::Error>
    where
        D: Deserializer<'de>,
    {
        let level_str = String::deserialize(deserializer)?;
        Level::from_str(&level_str)
            .map_err(|_| serde::de::Error::custom(format!("Invalid log level: {level_str}")))
    }
}
