use std::fmt;

use provisor_version::VersionRange;
use serde::{Deserialize, Serialize};

use super::{Capability, Environment, Filter, NAMESPACE_ID};

/// A constraint a component declares against capabilities it needs.
///
/// A requirement matches a capability when namespace and name are equal and
/// the capability's version lies in the range; the filter (if any) gates the
/// whole requirement on the resolution environment. `optional` requirements
/// never block satisfiability; non-`greedy` requirements are satisfied only
/// by components already otherwise selected and never pull new components
/// into the selection; `multiple` requirements are satisfied by every
/// matching provider rather than a single one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Requirement {
    namespace: String,
    name: String,
    range: VersionRange,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    filter: Option<Filter>,
    #[serde(default)]
    optional: bool,
    #[serde(default = "default_greedy")]
    greedy: bool,
    #[serde(default)]
    multiple: bool,
}

fn default_greedy() -> bool {
    true
}

impl Requirement {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>, range: VersionRange) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
            range,
            filter: None,
            optional: false,
            greedy: true,
            multiple: false,
        }
    }

    /// A requirement on a component identity, the common way one component
    /// requires another by id.
    pub fn on_id(id: impl Into<String>, range: VersionRange) -> Self {
        Self::new(NAMESPACE_ID, id, range)
    }

    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn optional(mut self, optional: bool) -> Self {
        self.optional = optional;
        self
    }

    pub fn greedy(mut self, greedy: bool) -> Self {
        self.greedy = greedy;
        self
    }

    pub fn multiple(mut self, multiple: bool) -> Self {
        self.multiple = multiple;
        self
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn range(&self) -> &VersionRange {
        &self.range
    }

    pub fn filter(&self) -> Option<&Filter> {
        self.filter.as_ref()
    }

    pub fn is_optional(&self) -> bool {
        self.optional
    }

    pub fn is_greedy(&self) -> bool {
        self.greedy
    }

    pub fn is_multiple(&self) -> bool {
        self.multiple
    }

    /// Whether the filter gate passes in the given environment. A
    /// requirement without a filter always passes.
    pub fn filter_matches(&self, env: &Environment) -> bool {
        self.filter.as_ref().map_or(true, |f| f.matches(env))
    }

    /// Whether the capability alone satisfies namespace, name and range.
    /// The environment gate is checked separately via `filter_matches`.
    pub fn matches_capability(&self, capability: &Capability) -> bool {
        self.namespace == capability.namespace()
            && self.name == capability.name()
            && self.range.contains(capability.version())
    }

    /// Full match: capability plus environment gate.
    pub fn matches(&self, capability: &Capability, env: &Environment) -> bool {
        self.filter_matches(env) && self.matches_capability(capability)
    }
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{} {}", self.namespace, self.name, self.range)?;
        if self.optional {
            write!(f, " (optional)")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use provisor_version::Version;

    fn v(text: &str) -> Version {
        Version::parse(text).unwrap()
    }

    fn r(text: &str) -> VersionRange {
        VersionRange::parse(text).unwrap()
    }

    #[test]
    fn test_matches_by_namespace_name_range() {
        let req = Requirement::on_id("part", r("[1.0.0,2.0.0)"));
        let env = Environment::new();

        assert!(req.matches(&Capability::identity("part", v("1.5.0")), &env));
        assert!(!req.matches(&Capability::identity("part", v("2.0.0")), &env));
        assert!(!req.matches(&Capability::identity("other", v("1.5.0")), &env));
        assert!(!req.matches(&Capability::new("ns", "part", v("1.5.0")), &env));
    }

    #[test]
    fn test_filter_gates_requirement() {
        let req = Requirement::on_id("part", r("*"))
            .with_filter(Filter::parse("(osgi.os=linux)").unwrap());
        let cap = Capability::identity("part", v("1.0.0"));

        let linux = Environment::from_properties([("osgi.os", "linux")]);
        let win = Environment::from_properties([("osgi.os", "win32")]);

        assert!(req.matches(&cap, &linux));
        assert!(!req.matches(&cap, &win));
    }

    #[test]
    fn test_defaults() {
        let req = Requirement::on_id("part", r("*"));
        assert!(!req.is_optional());
        assert!(req.is_greedy());
        assert!(!req.is_multiple());
    }
}
