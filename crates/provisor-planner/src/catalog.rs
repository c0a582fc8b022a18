//! Queryable, read-only component catalogs.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use provisor_version::VersionRange;

use crate::metadata::{Component, ComponentKey, Environment, Requirement, NAMESPACE_ID};

/// A queryable, immutable collection of components.
///
/// Lookups never fail: an empty range or an unknown namespace simply
/// matches nothing. Result order is catalog insertion order.
pub trait Catalog {
    /// Components providing a capability with the given namespace and name
    /// whose version lies in the range.
    fn query(&self, namespace: &str, name: &str, range: &VersionRange) -> Vec<Arc<Component>>;

    /// Components with the given id whose version lies in the range.
    fn by_identity(&self, id: &str, range: &VersionRange) -> Vec<Arc<Component>>;
}

/// Components matching a requirement, with its environment gate applied.
/// A requirement whose filter excludes the environment matches nothing.
pub fn candidates(
    catalog: &dyn Catalog,
    requirement: &Requirement,
    env: &Environment,
) -> Vec<Arc<Component>> {
    if !requirement.filter_matches(env) {
        return Vec::new();
    }
    catalog.query(
        requirement.namespace(),
        requirement.name(),
        requirement.range(),
    )
}

/// An in-memory catalog with capability and identity indexes.
#[derive(Debug, Clone, Default)]
pub struct MemoryCatalog {
    components: Vec<Arc<Component>>,
    by_id: BTreeMap<String, Vec<usize>>,
    by_capability: BTreeMap<(String, String), Vec<usize>>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_components<I>(components: I) -> Self
    where
        I: IntoIterator<Item = Component>,
    {
        let mut catalog = Self::new();
        for component in components {
            catalog.add(component);
        }
        catalog
    }

    /// Add a component. A duplicate `(id, version)` entry is ignored.
    pub fn add(&mut self, component: Component) {
        let key = component.key();
        if self
            .by_id
            .get(component.id())
            .is_some_and(|indexes| indexes.iter().any(|&i| self.components[i].key() == key))
        {
            return;
        }

        let index = self.components.len();
        let component = Arc::new(component);

        self.by_id
            .entry(component.id().to_string())
            .or_default()
            .push(index);
        for cap in component.provided() {
            self.by_capability
                .entry((cap.namespace().to_string(), cap.name().to_string()))
                .or_default()
                .push(index);
        }
        self.components.push(component);
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Component>> {
        self.components.iter()
    }
}

impl Catalog for MemoryCatalog {
    fn query(&self, namespace: &str, name: &str, range: &VersionRange) -> Vec<Arc<Component>> {
        if range.is_empty() {
            return Vec::new();
        }
        let Some(indexes) = self
            .by_capability
            .get(&(namespace.to_string(), name.to_string()))
        else {
            return Vec::new();
        };
        indexes
            .iter()
            .map(|&i| &self.components[i])
            .filter(|c| {
                c.provided().iter().any(|cap| {
                    cap.namespace() == namespace
                        && cap.name() == name
                        && range.contains(cap.version())
                })
            })
            .cloned()
            .collect()
    }

    fn by_identity(&self, id: &str, range: &VersionRange) -> Vec<Arc<Component>> {
        self.query(NAMESPACE_ID, id, range)
    }
}

/// A transparent union of catalogs, de-duplicating identical
/// `(id, version)` entries across constituents (first occurrence wins).
#[derive(Clone, Default)]
pub struct CompositeCatalog {
    children: Vec<Arc<dyn Catalog + Send + Sync>>,
}

impl CompositeCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, catalog: Arc<dyn Catalog + Send + Sync>) {
        self.children.push(catalog);
    }

    fn dedup(results: Vec<Arc<Component>>) -> Vec<Arc<Component>> {
        let mut seen: BTreeSet<ComponentKey> = BTreeSet::new();
        results
            .into_iter()
            .filter(|c| seen.insert(c.key()))
            .collect()
    }
}

impl Catalog for CompositeCatalog {
    fn query(&self, namespace: &str, name: &str, range: &VersionRange) -> Vec<Arc<Component>> {
        Self::dedup(
            self.children
                .iter()
                .flat_map(|child| child.query(namespace, name, range))
                .collect(),
        )
    }

    fn by_identity(&self, id: &str, range: &VersionRange) -> Vec<Arc<Component>> {
        Self::dedup(
            self.children
                .iter()
                .flat_map(|child| child.by_identity(id, range))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::Capability;
    use provisor_version::Version;

    fn v(text: &str) -> Version {
        Version::parse(text).unwrap()
    }

    fn r(text: &str) -> VersionRange {
        VersionRange::parse(text).unwrap()
    }

    fn unit(id: &str, version: &str) -> Component {
        Component::builder(id, v(version)).build().unwrap()
    }

    #[test]
    fn test_by_identity_with_range() {
        let catalog = MemoryCatalog::from_components([
            unit("part", "1.0.0"),
            unit("part", "2.0.0"),
            unit("other", "1.0.0"),
        ]);

        let hits = catalog.by_identity("part", &r("[1.0,2.0)"));
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].version(), &v("1.0.0"));

        assert!(catalog.by_identity("part", &r("[3.0,4.0)")).is_empty());
        assert!(catalog.by_identity("missing", &r("*")).is_empty());
    }

    #[test]
    fn test_query_by_capability() {
        let provider = Component::builder("provider", v("1.0"))
            .provides(Capability::new("java.package", "org.example.api", v("3.1")))
            .build()
            .unwrap();
        let catalog = MemoryCatalog::from_components([provider]);

        assert_eq!(
            catalog
                .query("java.package", "org.example.api", &r("[3.0,4.0)"))
                .len(),
            1
        );
        assert!(catalog
            .query("java.package", "org.example.api", &r("[4.0,5.0)"))
            .is_empty());
        assert!(catalog
            .query("unknown.namespace", "org.example.api", &r("*"))
            .is_empty());
    }

    #[test]
    fn test_empty_range_matches_nothing() {
        let catalog = MemoryCatalog::from_components([unit("part", "1.0.0")]);
        assert!(catalog.by_identity("part", &VersionRange::none()).is_empty());
    }

    #[test]
    fn test_duplicate_entries_ignored() {
        let mut catalog = MemoryCatalog::new();
        catalog.add(unit("part", "1.0.0"));
        catalog.add(unit("part", "1.0.0"));
        assert_eq!(catalog.len(), 1);
    }

    #[test]
    fn test_composite_unions_and_dedups() {
        let left = MemoryCatalog::from_components([unit("a", "1.0"), unit("shared", "1.0")]);
        let right = MemoryCatalog::from_components([unit("b", "1.0"), unit("shared", "1.0")]);

        let mut composite = CompositeCatalog::new();
        composite.push(Arc::new(left));
        composite.push(Arc::new(right));

        assert_eq!(composite.by_identity("a", &r("*")).len(), 1);
        assert_eq!(composite.by_identity("b", &r("*")).len(), 1);
        assert_eq!(composite.by_identity("shared", &r("*")).len(), 1);
    }

    #[test]
    fn test_candidates_respects_filter_gate() {
        use crate::metadata::Filter;

        let catalog = MemoryCatalog::from_components([unit("part", "1.0.0")]);
        let req = Requirement::on_id("part", r("*"))
            .with_filter(Filter::parse("(osgi.os=linux)").unwrap());

        let linux = Environment::from_properties([("osgi.os", "linux")]);
        let win = Environment::from_properties([("osgi.os", "win32")]);

        assert_eq!(candidates(&catalog, &req, &linux).len(), 1);
        assert!(candidates(&catalog, &req, &win).is_empty());
    }
}
