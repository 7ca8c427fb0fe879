//! Schema Reference Resolution
//!
//! Resolves the transitive references of a schema (for example a Protobuf file
//! importing other registered files) against a versioned schema store, and
//! flattens them into a name → definition mapping a parser can use without
//! doing lookups of its own.
//!
//! ## Features
//!
//! - **Depth-first resolution**: dependencies land before their dependents
//! - **Name deduplication**: diamonds are fetched once, cycles terminate
//! - **Explicit "latest"**: the `-1` sentinel is resolved by the store and the
//!   pinned version is returned alongside the mapping
//! - **Thread-safe in-memory store**: usable as a cache or a test fixture
//! - **Provider dispatch**: one provider per schema type, selected by discriminator
//!
//! ## Flow
//!
//! ```text
//! raw schema + references
//!         │
//!         ▼
//! SchemaProvider ──► ReferenceResolver ──► SchemaVersionFetcher
//!         │                 │
//!         │        name → definition
//!         ▼                 │
//!   SchemaParser ◄──────────┘
//!         │
//!         ▼
//!  Option<ParsedSchema>
//! ```

pub mod config;
pub mod error;
pub mod fingerprint;
pub mod parser;
pub mod provider;
pub mod reference;
pub mod resolver;
pub mod rest;
pub mod schema;
pub mod store;

pub use config::{RefsConfig, ResolverSettings};
pub use error::{Result, SchemaError};
pub use fingerprint::Fingerprint;
pub use parser::{JsonSchemaParser, ParseError, ParsedSchema, ProtobufParser, SchemaParser, SchemaSource};
pub use provider::{ProviderRegistry, ReferenceResolvingProvider, SchemaProvider};
pub use reference::{SchemaReference, VersionSpec, LATEST_VERSION};
pub use resolver::{ReferenceResolver, Resolution, ResolvedReferences};
pub use rest::{RestSchema, SchemaString};
pub use schema::{SchemaType, StoredSchema};
pub use store::{InMemorySchemaStore, SchemaVersionFetcher, SubjectVersion};
