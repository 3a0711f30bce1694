//! Applet parameters scraped from the client page.
//!
//! Lines are matched loosely: `archive=<location>` followed by two spaces gives the
//! gamepack location, and `<param name="..." value="...">` tags give name/value pairs.

use crate::core::handshake::CONNECTION_KEY_LEN;
use crate::error::{constants, GamepackError, Result};
use std::collections::HashMap;

/// Parameter holding the encoded AES secret
pub const SECRET_PARAMETER_NAME: &str = "0";

/// Parameter holding the encoded AES initialisation vector
pub const VECTOR_PARAMETER_NAME: &str = "-1";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppletParameters {
    archive: Option<String>,
    values: HashMap<String, String>,
}

impl AppletParameters {
    /// Parse every line of an applet page.
    ///
    /// # Errors
    /// Returns `GamepackError::MissingParameter` for a `<param` tag without a name or value.
    pub fn parse(page: &str) -> Result<Self> {
        let mut parameters = Self::default();

        for line in page.lines() {
            if let Some(archive) = archive_location(line) {
                parameters.archive = Some(archive.to_string());
            }

            if let Some(tag) = param_tag(line) {
                let name = between_last(tag, "name=\"", "\" ").ok_or_else(|| {
                    GamepackError::MissingParameter(format!("name in parameter {tag}"))
                })?;
                let value = between_last(tag, "value=\"", "\"").ok_or_else(|| {
                    GamepackError::MissingParameter(format!("value in parameter {tag}"))
                })?;
                parameters
                    .values
                    .insert(name.trim().to_string(), value.trim().to_string());
            }
        }

        Ok(parameters)
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.values.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn archive(&self) -> Result<&str> {
        self.archive
            .as_deref()
            .ok_or_else(|| GamepackError::MissingParameter(constants::ERR_NO_ARCHIVE.into()))
    }

    pub fn secret(&self) -> Result<&str> {
        self.get(SECRET_PARAMETER_NAME)
            .ok_or_else(|| GamepackError::MissingParameter(constants::ERR_NO_SECRET.into()))
    }

    pub fn vector(&self) -> Result<&str> {
        self.get(VECTOR_PARAMETER_NAME)
            .ok_or_else(|| GamepackError::MissingParameter(constants::ERR_NO_VECTOR.into()))
    }

    /// The handshake connection key: any value exactly 32 bytes long.
    ///
    /// When several values qualify, the one with the smallest parameter name is used.
    pub fn connection_key(&self) -> Result<&str> {
        self.values
            .iter()
            .filter(|(_, value)| value.len() == CONNECTION_KEY_LEN)
            .min_by(|a, b| a.0.cmp(b.0))
            .map(|(_, value)| value.as_str())
            .ok_or_else(|| GamepackError::MissingParameter(constants::ERR_NO_CONNECTION_KEY.into()))
    }
}

fn archive_location(line: &str) -> Option<&str> {
    let start = line.find("archive=")? + "archive=".len();
    let rest = &line[start..];
    let end = rest.rfind("  ")?;
    Some(rest[..end].trim())
}

fn param_tag(line: &str) -> Option<&str> {
    let start = line.find("<param")? + "<param".len();
    let rest = &line[start..];
    let end = rest.rfind('>')?;
    Some(&rest[..end])
}

/// Text after the first `open` and before the last following `close`.
fn between_last<'a>(text: &'a str, open: &str, close: &str) -> Option<&'a str> {
    let start = text.find(open)? + open.len();
    let rest = &text[start..];
    let end = rest.rfind(close)?;
    Some(&rest[..end])
}
