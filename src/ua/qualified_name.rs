/// A (namespace index, name) pair used as a node's browse name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct QualifiedName {
    namespace_index: u16,
    name: String,
}

impl QualifiedName {
    #[must_use]
    pub fn new(namespace_index: u16, name: impl Into<String>) -> Self {
        Self {
            namespace_index,
            name: name.into(),
        }
    }

    #[must_use]
    pub const fn namespace_index(&self) -> u16 {
        self.namespace_index
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}
