use std::fmt;

use provisor_version::Version;
use serde::{Deserialize, Serialize};

/// The reserved namespace in which every component implicitly provides a
/// capability naming itself at its own version. User-declared capabilities
/// must not collide with it.
pub const NAMESPACE_ID: &str = "provisor.id";

/// A named, versioned feature a component provides.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Capability {
    namespace: String,
    name: String,
    version: Version,
}

impl Capability {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>, version: Version) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
            version,
        }
    }

    /// The implicit identity capability of a component.
    pub(crate) fn identity(id: impl Into<String>, version: Version) -> Self {
        Self::new(NAMESPACE_ID, id, version)
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> &Version {
        &self.version
    }

    pub fn is_identity(&self) -> bool {
        self.namespace == NAMESPACE_ID
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{} {}", self.namespace, self.name, self.version)
    }
}
