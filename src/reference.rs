//! Schema references
//!
//! A reference is one edge of the dependency graph: the name a schema imports
//! another schema under, plus the `(subject, version)` it lives at in the store.
//! References arrive from outside (REST payloads, stored schemas), so every
//! field is optional until [`SchemaReference::validate`] has been called.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Result, SchemaError};

/// Wire sentinel meaning "latest registered version"
pub const LATEST_VERSION: i32 = -1;

/// A validated version selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VersionSpec {
    /// Highest version registered for the subject
    Latest,
    /// A concrete, positive version
    Exact(u32),
}

impl VersionSpec {
    /// Interpret a wire version number
    ///
    /// Returns `None` for zero and for negatives other than the sentinel.
    pub fn from_wire(version: i32) -> Option<Self> {
        match version {
            LATEST_VERSION => Some(VersionSpec::Latest),
            v if v > 0 => Some(VersionSpec::Exact(v as u32)),
            _ => None,
        }
    }

    pub fn is_latest(self) -> bool {
        matches!(self, VersionSpec::Latest)
    }
}

impl fmt::Display for VersionSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VersionSpec::Latest => write!(f, "latest"),
            VersionSpec::Exact(v) => write!(f, "{}", v),
        }
    }
}

impl std::str::FromStr for VersionSpec {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("latest") {
            return Ok(VersionSpec::Latest);
        }
        let wire: i32 = s.parse().map_err(|_| format!("invalid version: {}", s))?;
        VersionSpec::from_wire(wire).ok_or_else(|| format!("invalid version: {}", s))
    }
}

/// A named dependency on `(subject, version)`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct SchemaReference {
    /// Import name; the key in the resolved mapping
    #[serde(default)]
    pub name: Option<String>,
    /// Subject the referenced schema is registered under
    #[serde(default)]
    pub subject: Option<String>,
    /// Positive version or [`LATEST_VERSION`]
    #[serde(default)]
    pub version: Option<i32>,
}

/// A reference whose fields have all been checked
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidReference<'a> {
    pub name: &'a str,
    pub subject: &'a str,
    pub version: VersionSpec,
}

impl SchemaReference {
    /// Create a fully populated reference
    pub fn new(name: impl Into<String>, subject: impl Into<String>, version: i32) -> Self {
        Self {
            name: Some(name.into()),
            subject: Some(subject.into()),
            version: Some(version),
        }
    }

    /// Create a reference to the latest version of a subject
    pub fn latest(name: impl Into<String>, subject: impl Into<String>) -> Self {
        Self::new(name, subject, LATEST_VERSION)
    }

    /// Check that name, subject and version are all present and well formed
    pub fn validate(&self) -> Result<ValidReference<'_>> {
        let name = non_empty(self.name.as_deref()).ok_or_else(|| self.invalid("name"))?;
        let subject = non_empty(self.subject.as_deref()).ok_or_else(|| self.invalid("subject"))?;
        let wire = self.version.ok_or_else(|| self.invalid("version"))?;
        let version = VersionSpec::from_wire(wire).ok_or_else(|| SchemaError::InvalidVersion {
            subject: subject.to_string(),
            version: wire.into(),
        })?;

        Ok(ValidReference { name, subject, version })
    }

    /// Rebuild this reference with a concrete version
    ///
    /// Fails when `version` does not fit the positive wire range.
    pub fn with_version(&self, version: u32) -> Result<Self> {
        let wire = i32::try_from(version).map_err(|_| SchemaError::InvalidVersion {
            subject: self.subject.clone().unwrap_or_default(),
            version: version.into(),
        })?;
        Ok(Self {
            version: Some(wire),
            ..self.clone()
        })
    }

    fn invalid(&self, missing: &'static str) -> SchemaError {
        SchemaError::InvalidReference {
            reference: self.to_string(),
            missing,
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

impl fmt::Display for SchemaReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{name={}, subject={}, version={}}}",
            self.name.as_deref().unwrap_or("null"),
            self.subject.as_deref().unwrap_or("null"),
            self.version.map(|v| v.to_string()).unwrap_or_else(|| "null".to_string()),
        )
    }
}
