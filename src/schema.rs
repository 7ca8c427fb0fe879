//! Stored schema types

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::fingerprint::Fingerprint;
use crate::reference::SchemaReference;

/// Schema language discriminator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SchemaType {
    /// Apache Avro (the registry default when no type is given)
    #[default]
    Avro,
    /// Protocol Buffers
    Protobuf,
    /// JSON Schema
    Json,
}

impl SchemaType {
    /// Discriminator string used on the wire and for provider dispatch
    pub fn as_str(&self) -> &'static str {
        match self {
            SchemaType::Avro => "AVRO",
            SchemaType::Protobuf => "PROTOBUF",
            SchemaType::Json => "JSON",
        }
    }

    /// Parse a discriminator, case-insensitively
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_uppercase().as_str() {
            "AVRO" => Some(SchemaType::Avro),
            "PROTOBUF" => Some(SchemaType::Protobuf),
            "JSON" => Some(SchemaType::Json),
            _ => None,
        }
    }
}

impl fmt::Display for SchemaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A schema version as held by a store
///
/// Entries are immutable once built; stores hand them out behind `Arc`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredSchema {
    /// Subject the schema is registered under
    pub subject: String,
    /// Concrete version, never the latest sentinel
    pub version: u32,
    /// Registry-assigned id
    pub id: u32,
    /// Schema language
    pub schema_type: SchemaType,
    /// The schema's own dependencies, in declaration order
    pub references: Vec<SchemaReference>,
    /// Raw schema source text
    pub definition: String,
}

impl StoredSchema {
    /// Create a stored schema without references
    pub fn new(
        subject: impl Into<String>,
        version: u32,
        id: u32,
        schema_type: SchemaType,
        definition: impl Into<String>,
    ) -> Self {
        Self {
            subject: subject.into(),
            version,
            id,
            schema_type,
            references: Vec::new(),
            definition: definition.into(),
        }
    }

    /// Attach references
    pub fn with_references(mut self, references: Vec<SchemaReference>) -> Self {
        self.references = references;
        self
    }

    /// Fingerprint of the raw definition
    pub fn fingerprint(&self) -> Fingerprint {
        Fingerprint::from_text(&self.definition)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_type_discriminators() {
        assert_eq!(SchemaType::Protobuf.as_str(), "PROTOBUF");
        assert_eq!(SchemaType::parse("protobuf"), Some(SchemaType::Protobuf));
        assert_eq!(SchemaType::parse("JSON"), Some(SchemaType::Json));
        assert_eq!(SchemaType::parse("xml"), None);
        assert_eq!(SchemaType::default(), SchemaType::Avro);
    }

    #[test]
    fn test_schema_type_serde() {
        let json = serde_json::to_string(&SchemaType::Protobuf).unwrap();
        assert_eq!(json, "\"PROTOBUF\"");
        let parsed: SchemaType = serde_json::from_str("\"JSON\"").unwrap();
        assert_eq!(parsed, SchemaType::Json);
    }

    #[test]
    fn test_stored_schema_builder() {
        let schema = StoredSchema::new("s1", 1, 10, SchemaType::Protobuf, "syntax = \"proto3\";")
            .with_references(vec![SchemaReference::new("b.proto", "s2", 1)]);
        assert_eq!(schema.references.len(), 1);
        assert_eq!(schema.fingerprint(), Fingerprint::from_text("syntax = \"proto3\";"));
    }
}
