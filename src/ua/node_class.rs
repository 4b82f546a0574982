/// The class of a node, fixed at creation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum NodeClass {
    Variable,
    VariableType,
    Object,
    ObjectType,
    ReferenceType,
    DataType,
    View,
    Method,
}

impl NodeClass {
    const fn bit(self) -> u32 {
        match self {
            Self::Object => 1 << 0,
            Self::Variable => 1 << 1,
            Self::Method => 1 << 2,
            Self::ObjectType => 1 << 3,
            Self::VariableType => 1 << 4,
            Self::ReferenceType => 1 << 5,
            Self::DataType => 1 << 6,
            Self::View => 1 << 7,
        }
    }
}

/// A bit mask over [`NodeClass`] variants, as used by browse requests to filter results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NodeClassMask(u32);

impl NodeClassMask {
    /// Matches every node class.
    pub const ALL: Self = Self(
        NodeClass::Object.bit()
            | NodeClass::Variable.bit()
            | NodeClass::Method.bit()
            | NodeClass::ObjectType.bit()
            | NodeClass::VariableType.bit()
            | NodeClass::ReferenceType.bit()
            | NodeClass::DataType.bit()
            | NodeClass::View.bit(),
    );

    /// Matches no node class.
    pub const NONE: Self = Self(0);

    #[must_use]
    pub const fn of(class: NodeClass) -> Self {
        Self(class.bit())
    }

    #[must_use]
    pub const fn with(self, class: NodeClass) -> Self {
        Self(self.0 | class.bit())
    }

    #[must_use]
    pub const fn contains(self, class: NodeClass) -> bool {
        (self.0 & class.bit()) != 0
    }
}

impl FromIterator<NodeClass> for NodeClassMask {
    fn from_iter<T: IntoIterator<Item = NodeClass>>(iter: T) -> Self {
        iter.into_iter().fold(Self::NONE, Self::with)
    }
}

#[cfg(test)]
mod tests {
    use super::{NodeClass, NodeClassMask};

    #[test]
    fn all_contains_every_class() {
        for class in [
            NodeClass::Object,
            NodeClass::Variable,
            NodeClass::Method,
            NodeClass::ObjectType,
            NodeClass::VariableType,
            NodeClass::ReferenceType,
            NodeClass::DataType,
            NodeClass::View,
        ] {
            assert!(NodeClassMask::ALL.contains(class));
        }
    }

    #[test]
    fn none_contains_nothing() {
        assert!(!NodeClassMask::NONE.contains(NodeClass::Object));
    }
}
