//! Schema-text parsers
//!
//! A parser turns raw schema text plus its already-resolved dependencies into a
//! [`ParsedSchema`]. Parsers never talk to a store; everything they may need
//! arrives in the [`SchemaSource`].
//!
//! The parsers shipped here are structural checks, not full compilers: they
//! catch unbalanced definitions and imports that resolution did not supply.

use regex::Regex;
use serde::Serialize;
use thiserror::Error;

use crate::fingerprint::Fingerprint;
use crate::reference::SchemaReference;
use crate::resolver::ResolvedReferences;
use crate::schema::SchemaType;

/// Errors raised while parsing schema text
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Syntax error: {0}")]
    Syntax(String),

    #[error("Import \"{0}\" is not among the resolved references")]
    UnresolvedImport(String),

    #[error("Dependency \"{name}\" is invalid: {message}")]
    InvalidDependency { name: String, message: String },
}

/// Everything a parser gets to see
#[derive(Debug, Clone, Copy)]
pub struct SchemaSource<'a> {
    /// Raw text of the schema being parsed
    pub definition: &'a str,
    /// The schema's declared references, versions pinned
    pub references: &'a [SchemaReference],
    /// Transitively resolved dependency texts
    pub dependencies: &'a ResolvedReferences,
}

/// A schema that passed its parser
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParsedSchema {
    pub schema_type: SchemaType,
    /// Declared name (protobuf package, JSON `title`/`$id`), when there is one
    pub name: Option<String>,
    pub definition: String,
    pub references: Vec<SchemaReference>,
    pub dependencies: ResolvedReferences,
}

impl ParsedSchema {
    pub fn new(schema_type: SchemaType, name: Option<String>, source: SchemaSource<'_>) -> Self {
        Self {
            schema_type,
            name,
            definition: source.definition.to_string(),
            references: source.references.to_vec(),
            dependencies: source.dependencies.clone(),
        }
    }

    /// Fingerprint over the definition followed by dependencies in resolution order
    pub fn fingerprint(&self) -> Fingerprint {
        Fingerprint::from_parts(
            std::iter::once(self.definition.as_str())
                .chain(self.dependencies.values().map(String::as_str)),
        )
    }
}

/// External schema-text parser seam
pub trait SchemaParser: Send + Sync {
    /// Schema language this parser understands
    fn schema_type(&self) -> SchemaType;

    /// Parse `source`, or explain why it cannot be parsed
    fn parse(&self, source: SchemaSource<'_>) -> Result<ParsedSchema, ParseError>;
}

/// Structural Protocol Buffers checker
///
/// Checks brace balance, the `syntax` statement and that every `import` is
/// either a resolved dependency or a well-known `google/protobuf/` type.
#[derive(Debug)]
pub struct ProtobufParser {
    comments: Regex,
    syntax: Regex,
    imports: Regex,
    package: Regex,
}

impl Default for ProtobufParser {
    fn default() -> Self {
        Self::new()
    }
}

impl ProtobufParser {
    pub fn new() -> Self {
        Self {
            comments: Regex::new(r"(?s)/\*.*?\*/|//[^\n]*").expect("comment regex"),
            syntax: Regex::new(r#"syntax\s*=\s*"([^"]*)"\s*;"#).expect("syntax regex"),
            imports: Regex::new(r#"import\s+(?:public\s+|weak\s+)?"([^"]+)"\s*;"#)
                .expect("import regex"),
            package: Regex::new(r"package\s+([A-Za-z_][\w.]*)\s*;").expect("package regex"),
        }
    }

    fn check_text(&self, text: &str) -> Result<String, ParseError> {
        let stripped = self.comments.replace_all(text, "").into_owned();
        check_balanced(&stripped)?;

        if let Some(caps) = self.syntax.captures(&stripped) {
            match &caps[1] {
                "proto2" | "proto3" => {}
                other => return Err(ParseError::Syntax(format!("unknown syntax \"{}\"", other))),
            }
        }
        Ok(stripped)
    }
}

impl SchemaParser for ProtobufParser {
    fn schema_type(&self) -> SchemaType {
        SchemaType::Protobuf
    }

    fn parse(&self, source: SchemaSource<'_>) -> Result<ParsedSchema, ParseError> {
        for (name, text) in source.dependencies {
            self.check_text(text).map_err(|e| ParseError::InvalidDependency {
                name: name.clone(),
                message: e.to_string(),
            })?;
        }

        let stripped = self.check_text(source.definition)?;
        for caps in self.imports.captures_iter(&stripped) {
            let import = &caps[1];
            if !import.starts_with("google/protobuf/") && !source.dependencies.contains_key(import) {
                return Err(ParseError::UnresolvedImport(import.to_string()));
            }
        }

        let package = self
            .package
            .captures(&stripped)
            .map(|caps| caps[1].to_string());
        Ok(ParsedSchema::new(SchemaType::Protobuf, package, source))
    }
}

/// JSON Schema checker: the definition and every dependency must be valid JSON
#[derive(Debug, Default)]
pub struct JsonSchemaParser;

impl SchemaParser for JsonSchemaParser {
    fn schema_type(&self) -> SchemaType {
        SchemaType::Json
    }

    fn parse(&self, source: SchemaSource<'_>) -> Result<ParsedSchema, ParseError> {
        for (name, text) in source.dependencies {
            serde_json::from_str::<serde_json::Value>(text).map_err(|e| {
                ParseError::InvalidDependency {
                    name: name.clone(),
                    message: e.to_string(),
                }
            })?;
        }

        let value: serde_json::Value = serde_json::from_str(source.definition)
            .map_err(|e| ParseError::Syntax(e.to_string()))?;
        let name = ["title", "$id"]
            .iter()
            .find_map(|key| value.get(*key).and_then(|v| v.as_str()))
            .map(String::from);
        Ok(ParsedSchema::new(SchemaType::Json, name, source))
    }
}

fn check_balanced(text: &str) -> Result<(), ParseError> {
    let mut depth: i64 = 0;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text.char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth < 0 {
                    return Err(ParseError::Syntax(format!("unexpected '}}' at offset {}", offset)));
                }
            }
            _ => {}
        }
    }

    if in_string {
        return Err(ParseError::Syntax("unterminated string literal".to_string()));
    }
    if depth != 0 {
        return Err(ParseError::Syntax(format!("{} unclosed '{{'", depth)));
    }
    Ok(())
}
