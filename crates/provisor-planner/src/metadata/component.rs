use std::cmp::Ordering;
use std::fmt;

use indexmap::IndexMap;
use provisor_version::Version;
use serde::{Deserialize, Serialize};

use super::{Capability, Environment, MetadataError, Requirement, NAMESPACE_ID};

/// The `(id, version)` identity of a component.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ComponentKey {
    pub id: String,
    pub version: Version,
}

impl ComponentKey {
    pub fn new(id: impl Into<String>, version: Version) -> Self {
        Self {
            id: id.into(),
            version,
        }
    }
}

impl Ord for ComponentKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.id
            .cmp(&other.id)
            .then_with(|| self.version.cmp(&other.version))
    }
}

impl PartialOrd for ComponentKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for ComponentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.id, self.version)
    }
}

/// A versioned, identity-bearing unit of software with declared
/// capabilities and requirements. Immutable once built; constructed through
/// [`ComponentBuilder`].
///
/// Every component implicitly provides a capability in the reserved
/// identity namespace naming itself at its own version; the builder
/// synthesizes it, and rejects user capabilities declared in that
/// namespace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Component {
    id: String,
    version: Version,
    singleton: bool,
    properties: IndexMap<String, String>,
    provided: Vec<Capability>,
    required: Vec<Requirement>,
}

impl Component {
    pub fn builder(id: impl Into<String>, version: Version) -> ComponentBuilder {
        ComponentBuilder::new(id, version)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn version(&self) -> &Version {
        &self.version
    }

    pub fn key(&self) -> ComponentKey {
        ComponentKey::new(self.id.clone(), self.version.clone())
    }

    pub fn is_singleton(&self) -> bool {
        self.singleton
    }

    pub fn properties(&self) -> &IndexMap<String, String> {
        &self.properties
    }

    /// Provided capabilities, the implicit identity capability first.
    pub fn provided(&self) -> &[Capability] {
        &self.provided
    }

    /// Declared requirements, in declaration order.
    pub fn required(&self) -> &[Requirement] {
        &self.required
    }

    /// Whether any provided capability satisfies the requirement in the
    /// given environment.
    pub fn satisfies(&self, requirement: &Requirement, env: &Environment) -> bool {
        requirement.filter_matches(env)
            && self
                .provided
                .iter()
                .any(|cap| requirement.matches_capability(cap))
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.id, self.version)
    }
}

/// Builder for [`Component`].
#[derive(Debug, Clone)]
pub struct ComponentBuilder {
    id: String,
    version: Version,
    singleton: bool,
    properties: IndexMap<String, String>,
    provided: Vec<Capability>,
    required: Vec<Requirement>,
}

impl ComponentBuilder {
    fn new(id: impl Into<String>, version: Version) -> Self {
        Self {
            id: id.into(),
            version,
            singleton: false,
            properties: IndexMap::new(),
            provided: Vec::new(),
            required: Vec::new(),
        }
    }

    pub fn singleton(mut self, singleton: bool) -> Self {
        self.singleton = singleton;
        self
    }

    pub fn property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn provides(mut self, capability: Capability) -> Self {
        self.provided.push(capability);
        self
    }

    pub fn requires(mut self, requirement: Requirement) -> Self {
        self.required.push(requirement);
        self
    }

    pub fn build(self) -> Result<Component, MetadataError> {
        for cap in &self.provided {
            if cap.is_identity() {
                return Err(MetadataError::ReservedNamespace(NAMESPACE_ID.to_string()));
            }
        }

        let mut provided = Vec::with_capacity(self.provided.len() + 1);
        provided.push(Capability::identity(self.id.clone(), self.version.clone()));
        provided.extend(self.provided);

        Ok(Component {
            id: self.id,
            version: self.version,
            singleton: self.singleton,
            properties: self.properties,
            provided,
            required: self.required,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use provisor_version::VersionRange;

    fn v(text: &str) -> Version {
        Version::parse(text).unwrap()
    }

    #[test]
    fn test_implicit_identity_capability() {
        let unit = Component::builder("org.example.sdk", v("1.0.0"))
            .build()
            .unwrap();

        assert_eq!(unit.provided().len(), 1);
        let identity = &unit.provided()[0];
        assert!(identity.is_identity());
        assert_eq!(identity.name(), "org.example.sdk");
        assert_eq!(identity.version(), &v("1.0.0"));
    }

    #[test]
    fn test_reserved_namespace_rejected() {
        let result = Component::builder("spoofer", v("1.0.0"))
            .provides(Capability::new(NAMESPACE_ID, "victim", v("9.9")))
            .build();
        assert_eq!(
            result.unwrap_err(),
            MetadataError::ReservedNamespace(NAMESPACE_ID.to_string())
        );
    }

    #[test]
    fn test_satisfies_own_identity_requirement() {
        let unit = Component::builder("part", v("1.2.0")).build().unwrap();
        let env = Environment::new();

        let hit = Requirement::on_id("part", VersionRange::parse("[1.0,2.0)").unwrap());
        let miss = Requirement::on_id("part", VersionRange::parse("[2.0,3.0)").unwrap());

        assert!(unit.satisfies(&hit, &env));
        assert!(!unit.satisfies(&miss, &env));
    }

    #[test]
    fn test_satisfies_declared_capability() {
        let unit = Component::builder("provider", v("1.0.0"))
            .provides(Capability::new("java.package", "org.example.api", v("3.1")))
            .build()
            .unwrap();
        let env = Environment::new();

        let req = Requirement::new(
            "java.package",
            "org.example.api",
            VersionRange::parse("[3.0,4.0)").unwrap(),
        );
        assert!(unit.satisfies(&req, &env));
    }

    #[test]
    fn test_key_ordering() {
        let a = ComponentKey::new("a", v("2.0"));
        let b = ComponentKey::new("b", v("1.0"));
        let a2 = ComponentKey::new("a", v("10.0"));
        assert!(a < b);
        assert!(a < a2);
    }

    #[test]
    fn test_requirement_order_preserved() {
        let unit = Component::builder("c", v("1.0"))
            .requires(Requirement::on_id("first", VersionRange::any()))
            .requires(Requirement::on_id("second", VersionRange::any()))
            .build()
            .unwrap();
        let names: Vec<&str> = unit.required().iter().map(|r| r.name()).collect();
        assert_eq!(names, vec!["first", "second"]);
    }
}
