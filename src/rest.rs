//! REST entity helpers
//!
//! Conversions between the registry's REST JSON and the crate's types. REST
//! payloads are loose (every field may be missing), so they land in
//! [`RestSchema`] first and are checked on conversion to [`StoredSchema`].

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{Result, SchemaError};
use crate::parser::ParsedSchema;
use crate::provider::SchemaProvider;
use crate::reference::SchemaReference;
use crate::schema::{SchemaType, StoredSchema};

/// A schema as returned by `GET /subjects/{subject}/versions/{version}`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestSchema {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_type: Option<String>,
    #[serde(default)]
    pub references: Vec<SchemaReference>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
}

/// A schema as returned by `GET /schemas/ids/{id}`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaString {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_type: Option<String>,
    #[serde(default, rename = "schema", skip_serializing_if = "Option::is_none")]
    pub schema_string: Option<String>,
    #[serde(default)]
    pub references: Vec<SchemaReference>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_id: Option<i32>,
}

impl SchemaString {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Parse a REST JSON response into a [`RestSchema`]
pub fn parse_rest_schema(json: &str) -> Result<RestSchema> {
    Ok(serde_json::from_str(json)?)
}

/// Parse a JSON array of REST schemas
pub fn parse_rest_schemas(json: &str) -> Result<Vec<RestSchema>> {
    Ok(serde_json::from_str(json)?)
}

/// Read a JSON array of REST schemas from a file
pub fn load_rest_schemas(path: impl AsRef<Path>) -> Result<Vec<RestSchema>> {
    let content = fs::read_to_string(path)?;
    parse_rest_schemas(&content)
}

/// Convert a REST schema into the shape providers parse
pub fn to_schema_string(rest: &RestSchema) -> SchemaString {
    SchemaString {
        schema_type: rest.schema_type.clone(),
        schema_string: rest.schema.clone(),
        references: rest.references.clone(),
        max_id: rest.id,
    }
}

/// Parse a REST schema with `provider`
pub fn rest_to_parsed_schema(
    rest: &RestSchema,
    provider: &dyn SchemaProvider,
) -> Result<Option<ParsedSchema>> {
    to_parsed_schema(&to_schema_string(rest), provider)
}

/// Parse a `SchemaString` JSON payload with `provider`
pub fn to_parsed_schema_json(
    json: &str,
    provider: &dyn SchemaProvider,
) -> Result<Option<ParsedSchema>> {
    to_parsed_schema(&SchemaString::from_json(json)?, provider)
}

/// Parse a [`SchemaString`] with `provider`
///
/// A schema whose type does not match the provider yields `Ok(None)`; a missing
/// schema text is an error.
pub fn to_parsed_schema(
    schema: &SchemaString,
    provider: &dyn SchemaProvider,
) -> Result<Option<ParsedSchema>> {
    let schema_type = schema
        .schema_type
        .as_deref()
        .unwrap_or(SchemaType::Avro.as_str());
    if !schema_type.eq_ignore_ascii_case(provider.schema_type()) {
        warn!(
            schema_type,
            provider = provider.schema_type(),
            "schema type does not match provider"
        );
        return Ok(None);
    }

    let text = schema
        .schema_string
        .as_deref()
        .ok_or_else(|| SchemaError::InvalidFormat("schema string is missing".to_string()))?;
    provider.parse_schema(text, &schema.references)
}

impl TryFrom<RestSchema> for StoredSchema {
    type Error = SchemaError;

    fn try_from(rest: RestSchema) -> Result<Self> {
        let subject = rest
            .subject
            .filter(|s| !s.is_empty())
            .ok_or_else(|| SchemaError::InvalidFormat("subject is missing".to_string()))?;
        let version = rest
            .version
            .filter(|v| *v > 0)
            .ok_or_else(|| {
                SchemaError::InvalidFormat(format!("subject \"{}\" has no concrete version", subject))
            })? as u32;
        let id = u32::try_from(rest.id.unwrap_or(0))
            .map_err(|_| SchemaError::InvalidFormat(format!("negative id for subject \"{}\"", subject)))?;
        let schema_type = match rest.schema_type.as_deref() {
            None => SchemaType::default(),
            Some(value) => SchemaType::parse(value)
                .ok_or_else(|| SchemaError::InvalidFormat(format!("unknown schema type \"{}\"", value)))?,
        };
        let definition = rest.schema.ok_or_else(|| {
            SchemaError::InvalidFormat(format!("subject \"{}\" version {} has no schema", subject, version))
        })?;

        Ok(StoredSchema {
            subject,
            version,
            id,
            schema_type,
            references: rest.references,
            definition,
        })
    }
}

impl TryFrom<&StoredSchema> for RestSchema {
    type Error = SchemaError;

    fn try_from(stored: &StoredSchema) -> Result<Self> {
        let version = i32::try_from(stored.version).map_err(|_| SchemaError::InvalidVersion {
            subject: stored.subject.clone(),
            version: stored.version.into(),
        })?;
        let id = i32::try_from(stored.id).map_err(|_| {
            SchemaError::InvalidFormat(format!(
                "id {} of subject \"{}\" does not fit the REST model",
                stored.id, stored.subject
            ))
        })?;

        Ok(Self {
            subject: Some(stored.subject.clone()),
            version: Some(version),
            id: Some(id),
            schema_type: Some(stored.schema_type.as_str().to_string()),
            references: stored.references.clone(),
            schema: Some(stored.definition.clone()),
        })
    }
}
