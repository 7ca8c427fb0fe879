//! Reference Resolution
//!
//! Walks the transitive reference graph of a schema and flattens it into a
//! name → definition mapping that a schema parser can consume without doing
//! any store lookups of its own.
//!
//! ## Algorithm
//!
//! Depth-first over the reference list, in order:
//!
//! 1. validate the reference (name, subject and version must be present)
//! 2. skip it if its name was already resolved or is being resolved further up
//!    the stack, which also breaks reference cycles
//! 3. fetch `(subject, version)` from the store, including soft-deleted versions
//! 4. resolve the fetched schema's own references
//! 5. insert `name → definition`
//!
//! Dependencies therefore appear before their dependents in the output.
//! Any failure aborts the whole call; no partial mapping is returned.

use std::collections::HashSet;

use indexmap::IndexMap;
use serde::Serialize;
use tracing::debug;

use crate::config::ResolverSettings;
use crate::error::{Result, SchemaError};
use crate::reference::{SchemaReference, LATEST_VERSION};
use crate::store::SchemaVersionFetcher;

/// Resolved dependencies: reference name → raw definition, in resolution order
pub type ResolvedReferences = IndexMap<String, String>;

/// Output of one resolution pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Resolution {
    /// The input references, with `latest` sentinels replaced by the concrete
    /// version that was fetched
    pub references: Vec<SchemaReference>,
    /// Every transitively reachable definition, dependencies first
    pub schemas: ResolvedReferences,
}

impl Resolution {
    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}

/// Per-call state threaded through the traversal
#[derive(Default)]
struct Accumulator {
    schemas: ResolvedReferences,
    /// Names whose dependencies are still being resolved
    pending: HashSet<String>,
}

impl Accumulator {
    fn seen(&self, name: &str) -> bool {
        self.schemas.contains_key(name) || self.pending.contains(name)
    }
}

/// Resolves reference lists against a [`SchemaVersionFetcher`]
#[derive(Debug, Clone)]
pub struct ReferenceResolver<F> {
    fetcher: F,
    lookup_deleted: bool,
    max_depth: Option<usize>,
}

impl<F: SchemaVersionFetcher> ReferenceResolver<F> {
    /// Create a resolver with default settings
    pub fn new(fetcher: F) -> Self {
        Self::with_settings(fetcher, &ResolverSettings::default())
    }

    /// Create a resolver from configuration
    pub fn with_settings(fetcher: F, settings: &ResolverSettings) -> Self {
        Self {
            fetcher,
            lookup_deleted: settings.lookup_deleted,
            max_depth: settings.max_depth,
        }
    }

    /// Whether soft-deleted versions are requested from the store
    pub fn lookup_deleted(mut self, lookup_deleted: bool) -> Self {
        self.lookup_deleted = lookup_deleted;
        self
    }

    /// Limit how deep reference chains may nest; `None` for no limit
    pub fn max_depth(mut self, max_depth: Option<usize>) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// The underlying store
    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    /// Resolve a root reference list
    pub fn resolve(&self, references: &[SchemaReference]) -> Result<Resolution> {
        let mut acc = Accumulator::default();
        let mut pinned = Vec::with_capacity(references.len());

        for reference in references {
            let fetched = self.resolve_reference(reference, &mut acc, 0)?;
            pinned.push(match fetched {
                Some(version) if reference.version == Some(LATEST_VERSION) => {
                    reference.with_version(version)?
                }
                _ => reference.clone(),
            });
        }

        debug!(count = acc.schemas.len(), "resolved schema references");
        Ok(Resolution {
            references: pinned,
            schemas: acc.schemas,
        })
    }

    /// Resolve and keep only the name → definition mapping
    pub fn resolve_schemas(&self, references: &[SchemaReference]) -> Result<ResolvedReferences> {
        Ok(self.resolve(references)?.schemas)
    }

    fn resolve_all(
        &self,
        references: &[SchemaReference],
        acc: &mut Accumulator,
        depth: usize,
    ) -> Result<()> {
        for reference in references {
            self.resolve_reference(reference, acc, depth)?;
        }
        Ok(())
    }

    /// Returns the concrete version fetched, or `None` when the name was skipped
    fn resolve_reference(
        &self,
        reference: &SchemaReference,
        acc: &mut Accumulator,
        depth: usize,
    ) -> Result<Option<u32>> {
        let valid = reference.validate()?;

        if acc.seen(valid.name) {
            debug!(name = valid.name, "reference already resolved, skipping");
            return Ok(None);
        }

        if let Some(limit) = self.max_depth {
            if depth >= limit {
                return Err(SchemaError::DepthExceeded {
                    name: valid.name.to_string(),
                    limit,
                });
            }
        }

        debug!(
            name = valid.name,
            subject = valid.subject,
            version = %valid.version,
            "fetching schema reference"
        );
        let schema = self
            .fetcher
            .get_by_version(valid.subject, valid.version, self.lookup_deleted)?
            .ok_or_else(|| SchemaError::NotFound {
                subject: valid.subject.to_string(),
                version: valid.version.to_string(),
            })?;

        acc.pending.insert(valid.name.to_string());
        self.resolve_all(&schema.references, acc, depth + 1)?;
        acc.pending.remove(valid.name);

        acc.schemas
            .insert(valid.name.to_string(), schema.definition.clone());
        Ok(Some(schema.version))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reference::VersionSpec;
    use crate::schema::{SchemaType, StoredSchema};
    use crate::store::InMemorySchemaStore;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn stored(subject: &str, version: u32, definition: &str, refs: Vec<SchemaReference>) -> StoredSchema {
        StoredSchema::new(subject, version, version, SchemaType::Protobuf, definition)
            .with_references(refs)
    }

    /// Counts lookups on the way through to an in-memory store
    struct Counting {
        inner: InMemorySchemaStore,
        calls: AtomicUsize,
    }

    impl Counting {
        fn new(schemas: Vec<StoredSchema>) -> Self {
            Self {
                inner: schemas.into_iter().collect(),
                calls: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl SchemaVersionFetcher for Counting {
        fn get_by_version(
            &self,
            subject: &str,
            version: VersionSpec,
            lookup_deleted: bool,
        ) -> Result<Option<Arc<StoredSchema>>> {
            assert!(lookup_deleted, "resolution must include soft-deleted versions");
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.get_by_version(subject, version, lookup_deleted)
        }
    }

    #[test]
    fn test_empty_references() {
        let store = Counting::new(vec![]);
        let resolver = ReferenceResolver::new(&store);
        let resolution = resolver.resolve(&[]).unwrap();
        assert!(resolution.is_empty());
        assert!(resolution.references.is_empty());
        assert_eq!(store.calls(), 0);
    }

    #[test]
    fn test_single_level() {
        let store = Counting::new(vec![stored("s1", 1, "D1", vec![])]);
        let resolver = ReferenceResolver::new(&store);
        let schemas = resolver
            .resolve_schemas(&[SchemaReference::new("A", "s1", 1)])
            .unwrap();
        assert_eq!(schemas.len(), 1);
        assert_eq!(schemas["A"], "D1");
    }

    #[test]
    fn test_dependencies_come_first() {
        let store = Counting::new(vec![
            stored("s1", 1, "D1", vec![SchemaReference::new("B", "s2", 1)]),
            stored("s2", 1, "D2", vec![]),
        ]);
        let resolver = ReferenceResolver::new(&store);
        let schemas = resolver
            .resolve_schemas(&[SchemaReference::new("A", "s1", 1)])
            .unwrap();
        let order: Vec<&str> = schemas.keys().map(String::as_str).collect();
        assert_eq!(order, vec!["B", "A"]);
        assert_eq!(schemas["A"], "D1");
        assert_eq!(schemas["B"], "D2");
    }

    #[test]
    fn test_latest_is_pinned_in_output_only() {
        let store = Counting::new(vec![
            stored("s1", 1, "v1", vec![]),
            stored("s1", 3, "v3", vec![]),
            stored("s1", 2, "v2", vec![]),
        ]);
        let resolver = ReferenceResolver::new(&store);
        let input = vec![SchemaReference::latest("A", "s1")];
        let resolution = resolver.resolve(&input).unwrap();

        assert_eq!(resolution.references[0].version, Some(3));
        assert_eq!(resolution.schemas["A"], "v3");
        assert_eq!(input[0].version, Some(LATEST_VERSION));
    }

    #[test]
    fn test_exact_versions_are_not_rewritten() {
        let store = Counting::new(vec![stored("s1", 1, "v1", vec![]), stored("s1", 2, "v2", vec![])]);
        let resolver = ReferenceResolver::new(&store);
        let input = vec![SchemaReference::new("A", "s1", 1)];
        let resolution = resolver.resolve(&input).unwrap();
        assert_eq!(resolution.references, input);
    }

    #[test]
    fn test_cycle_terminates() {
        let store = Counting::new(vec![
            stored("s1", 1, "D1", vec![SchemaReference::new("B", "s2", 1)]),
            stored("s2", 1, "D2", vec![SchemaReference::new("A", "s1", 1)]),
        ]);
        let resolver = ReferenceResolver::new(&store);
        let schemas = resolver
            .resolve_schemas(&[SchemaReference::new("A", "s1", 1)])
            .unwrap();
        assert_eq!(schemas.len(), 2);
        assert_eq!(schemas["A"], "D1");
        assert_eq!(schemas["B"], "D2");
        assert_eq!(store.calls(), 2);
    }

    #[test]
    fn test_self_reference_terminates() {
        let store = Counting::new(vec![stored("s1", 1, "D1", vec![SchemaReference::new("A", "s1", 1)])]);
        let resolver = ReferenceResolver::new(&store);
        let schemas = resolver
            .resolve_schemas(&[SchemaReference::new("A", "s1", 1)])
            .unwrap();
        assert_eq!(schemas.len(), 1);
        assert_eq!(store.calls(), 1);
    }

    #[test]
    fn test_diamond_fetches_shared_dependency_once() {
        let store = Counting::new(vec![
            stored("left", 1, "L", vec![SchemaReference::new("base", "base", 1)]),
            stored("right", 1, "R", vec![SchemaReference::new("base", "base", 1)]),
            stored("base", 1, "BASE", vec![]),
        ]);
        let resolver = ReferenceResolver::new(&store);
        let schemas = resolver
            .resolve_schemas(&[
                SchemaReference::new("left", "left", 1),
                SchemaReference::new("right", "right", 1),
            ])
            .unwrap();
        let order: Vec<&str> = schemas.keys().map(String::as_str).collect();
        assert_eq!(order, vec!["base", "left", "right"]);
        assert_eq!(store.calls(), 3);
    }

    #[test]
    fn test_first_resolution_of_a_name_wins() {
        let store = Counting::new(vec![stored("s1", 1, "first", vec![]), stored("s2", 1, "second", vec![])]);
        let resolver = ReferenceResolver::new(&store);
        let input = vec![SchemaReference::new("A", "s1", 1), SchemaReference::latest("A", "s2")];
        let resolution = resolver.resolve(&input).unwrap();
        assert_eq!(resolution.schemas["A"], "first");
        // Skipped before lookup, so the sentinel stays
        assert_eq!(resolution.references[1].version, Some(LATEST_VERSION));
        assert_eq!(store.calls(), 1);
    }

    #[test]
    fn test_missing_schema_fails() {
        let store = Counting::new(vec![stored("s1", 1, "D1", vec![SchemaReference::new("B", "s2", 4)])]);
        let resolver = ReferenceResolver::new(&store);
        let err = resolver
            .resolve(&[SchemaReference::new("A", "s1", 1)])
            .unwrap_err();
        assert!(err.is_integrity_error());
        match err {
            SchemaError::NotFound { subject, version } => {
                assert_eq!(subject, "s2");
                assert_eq!(version, "4");
            }
            other => panic!("Expected NotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_reference_fails_before_lookup() {
        let store = Counting::new(vec![stored("s1", 1, "D1", vec![])]);
        let resolver = ReferenceResolver::new(&store);
        let bad = SchemaReference {
            name: None,
            subject: Some("s1".into()),
            version: Some(1),
        };
        let err = resolver
            .resolve(&[bad, SchemaReference::new("A", "s1", 1)])
            .unwrap_err();
        assert!(matches!(err, SchemaError::InvalidReference { missing: "name", .. }));
        assert_eq!(store.calls(), 0);
    }

    #[test]
    fn test_invalid_nested_reference_aborts() {
        let nested = SchemaReference {
            name: Some("B".into()),
            subject: None,
            version: Some(1),
        };
        let store = Counting::new(vec![stored("s1", 1, "D1", vec![nested])]);
        let resolver = ReferenceResolver::new(&store);
        let err = resolver
            .resolve(&[SchemaReference::new("A", "s1", 1)])
            .unwrap_err();
        assert!(matches!(err, SchemaError::InvalidReference { missing: "subject", .. }));
    }

    #[test]
    fn test_latest_beyond_wire_range_fails() {
        let store = Counting::new(vec![stored("s1", u32::MAX, "huge", vec![])]);
        let resolver = ReferenceResolver::new(&store);
        let err = resolver
            .resolve(&[SchemaReference::latest("A", "s1")])
            .unwrap_err();
        match err {
            SchemaError::InvalidVersion { subject, version } => {
                assert_eq!(subject, "s1");
                assert_eq!(version, i64::from(u32::MAX));
            }
            other => panic!("Expected InvalidVersion, got {:?}", other),
        }
    }

    #[test]
    fn test_default_settings_allow_deep_chains() {
        let chain: Vec<StoredSchema> = (0..70u32)
            .map(|i| {
                let refs = if i < 69 {
                    vec![SchemaReference::new(format!("N{}", i + 1), format!("s{}", i + 1), 1)]
                } else {
                    vec![]
                };
                stored(&format!("s{}", i), 1, &format!("D{}", i), refs)
            })
            .collect();
        let store = Counting::new(chain);
        let resolver = ReferenceResolver::new(&store);
        let schemas = resolver
            .resolve_schemas(&[SchemaReference::new("N0", "s0", 1)])
            .unwrap();
        assert_eq!(schemas.len(), 70);
        assert_eq!(schemas.get_index(0).map(|(k, _)| k.as_str()), Some("N69"));
        assert_eq!(store.calls(), 70);
    }

    #[test]
    fn test_depth_limit() {
        let store = Counting::new(vec![
            stored("s1", 1, "D1", vec![SchemaReference::new("B", "s2", 1)]),
            stored("s2", 1, "D2", vec![SchemaReference::new("C", "s3", 1)]),
            stored("s3", 1, "D3", vec![]),
        ]);
        let refs = [SchemaReference::new("A", "s1", 1)];

        let limited = ReferenceResolver::new(&store).max_depth(Some(2));
        assert!(matches!(
            limited.resolve(&refs),
            Err(SchemaError::DepthExceeded { limit: 2, .. })
        ));

        let unlimited = ReferenceResolver::new(&store).max_depth(None);
        assert_eq!(unlimited.resolve(&refs).unwrap().schemas.len(), 3);
    }
}
