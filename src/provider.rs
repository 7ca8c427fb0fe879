//! Schema providers
//!
//! A provider owns one schema language. It resolves the references of an
//! incoming schema against a store, then hands text plus dependencies to a
//! [`SchemaParser`].
//!
//! Failures split two ways:
//! - resolution errors (bad reference, missing dependency) are data-integrity
//!   problems and propagate as `Err`
//! - parse errors are logged and reported as `Ok(None)` so callers can try
//!   another provider

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{error, warn};

use crate::config::ResolverSettings;
use crate::error::{Result, SchemaError};
use crate::parser::{JsonSchemaParser, ParsedSchema, ProtobufParser, SchemaParser, SchemaSource};
use crate::reference::SchemaReference;
use crate::resolver::{ReferenceResolver, Resolution};
use crate::store::SchemaVersionFetcher;

/// Parses schemas of one type, dispatched by its discriminator
pub trait SchemaProvider: Send + Sync {
    /// Discriminator, e.g. `"PROTOBUF"`
    fn schema_type(&self) -> &'static str;

    /// Parse `schema` with its declared references
    ///
    /// `Ok(None)` means the text could not be parsed as this type.
    fn parse_schema(
        &self,
        schema: &str,
        references: &[SchemaReference],
    ) -> Result<Option<ParsedSchema>>;
}

/// Provider that resolves references itself before parsing
pub struct ReferenceResolvingProvider<F, P> {
    resolver: ReferenceResolver<F>,
    parser: P,
}

impl<F: SchemaVersionFetcher, P: SchemaParser> ReferenceResolvingProvider<F, P> {
    pub fn new(fetcher: F, parser: P) -> Self {
        Self {
            resolver: ReferenceResolver::new(fetcher),
            parser,
        }
    }

    pub fn with_settings(fetcher: F, parser: P, settings: &ResolverSettings) -> Self {
        Self {
            resolver: ReferenceResolver::with_settings(fetcher, settings),
            parser,
        }
    }

    /// The store used for resolution
    pub fn schema_version_fetcher(&self) -> &F {
        self.resolver.fetcher()
    }

    /// Resolve references without parsing
    pub fn resolve_references(&self, references: &[SchemaReference]) -> Result<Resolution> {
        self.resolver.resolve(references)
    }
}

impl<F: SchemaVersionFetcher, P: SchemaParser> SchemaProvider for ReferenceResolvingProvider<F, P> {
    fn schema_type(&self) -> &'static str {
        self.parser.schema_type().as_str()
    }

    fn parse_schema(
        &self,
        schema: &str,
        references: &[SchemaReference],
    ) -> Result<Option<ParsedSchema>> {
        let resolution = self.resolver.resolve(references)?;
        let source = SchemaSource {
            definition: schema,
            references: &resolution.references,
            dependencies: &resolution.schemas,
        };

        match self.parser.parse(source) {
            Ok(parsed) => Ok(Some(parsed)),
            Err(e) => {
                error!(
                    schema_type = self.schema_type(),
                    error = %e,
                    "could not parse schema"
                );
                Ok(None)
            }
        }
    }
}

/// Providers keyed by schema type discriminator
#[derive(Default)]
pub struct ProviderRegistry {
    providers: HashMap<String, Box<dyn SchemaProvider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the protobuf and JSON providers over a shared store
    pub fn with_defaults<F>(fetcher: Arc<F>, settings: &ResolverSettings) -> Self
    where
        F: SchemaVersionFetcher + ?Sized + 'static,
    {
        let mut registry = Self::new();
        registry.register(ReferenceResolvingProvider::with_settings(
            Arc::clone(&fetcher),
            ProtobufParser::new(),
            settings,
        ));
        registry.register(ReferenceResolvingProvider::with_settings(
            fetcher,
            JsonSchemaParser,
            settings,
        ));
        registry
    }

    /// Add a provider, replacing any existing one for the same type
    pub fn register(&mut self, provider: impl SchemaProvider + 'static) {
        let key = provider.schema_type().to_ascii_uppercase();
        if self.providers.insert(key, Box::new(provider)).is_some() {
            warn!("replaced existing schema provider");
        }
    }

    /// Provider for a discriminator, case-insensitively
    pub fn get(&self, schema_type: &str) -> Option<&dyn SchemaProvider> {
        self.providers
            .get(&schema_type.to_ascii_uppercase())
            .map(|provider| provider.as_ref())
    }

    /// Registered discriminators, sorted
    pub fn schema_types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = self.providers.keys().map(String::as_str).collect();
        types.sort_unstable();
        types
    }

    /// Dispatch to the provider for `schema_type`
    pub fn parse_schema(
        &self,
        schema_type: &str,
        schema: &str,
        references: &[SchemaReference],
    ) -> Result<Option<ParsedSchema>> {
        let provider = self
            .get(schema_type)
            .ok_or_else(|| SchemaError::UnknownSchemaType(schema_type.to_string()))?;
        provider.parse_schema(schema, references)
    }
}
