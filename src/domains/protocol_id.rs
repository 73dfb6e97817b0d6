use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{EnvelopeError, Result};

const MAX_PART_LEN: usize = 128;

static IDENTIFIER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z_][a-zA-Z0-9_]*$").expect("identifier pattern"));

/// Typed view of an `author/name:version` protocol identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ProtocolId {
    author: String,
    name: String,
    version: String,
}

impl ProtocolId {
    pub fn new(
        author: impl Into<String>,
        name: impl Into<String>,
        version: impl Into<String>,
    ) -> Result<Self> {
        let id = Self {
            author: author.into(),
            name: name.into(),
            version: version.into(),
        };
        check_identifier("author", &id.author)?;
        check_identifier("name", &id.name)?;
        check_version(&id.version)?;
        Ok(id)
    }

    pub fn author(&self) -> &str {
        &self.author
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> &str {
        &self.version
    }
}

fn check_identifier(part: &str, value: &str) -> Result<()> {
    if value.len() > MAX_PART_LEN || !IDENTIFIER.is_match(value) {
        return Err(EnvelopeError::InvalidProtocolId(format!(
            "{part} '{value}' must match [a-zA-Z_][a-zA-Z0-9_]*"
        )));
    }
    Ok(())
}

fn check_version(value: &str) -> Result<()> {
    if value.is_empty()
        || value
            .chars()
            .any(|c| c == '/' || c == ':' || c.is_whitespace())
    {
        return Err(EnvelopeError::InvalidProtocolId(format!(
            "invalid version '{value}'"
        )));
    }
    Ok(())
}

impl FromStr for ProtocolId {
    type Err = EnvelopeError;

    fn from_str(value: &str) -> Result<Self> {
        let (author, rest) = value.split_once('/').ok_or_else(|| {
            EnvelopeError::InvalidProtocolId(format!("'{value}' is missing the author"))
        })?;
        let (name, version) = rest.split_once(':').ok_or_else(|| {
            EnvelopeError::InvalidProtocolId(format!("'{value}' is missing the version"))
        })?;
        Self::new(author, name, version)
    }
}

impl TryFrom<String> for ProtocolId {
    type Error = EnvelopeError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<ProtocolId> for String {
    fn from(id: ProtocolId) -> Self {
        id.to_string()
    }
}

impl fmt::Display for ProtocolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}:{}", self.author, self.name, self.version)
    }
}
