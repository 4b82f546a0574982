use std::fmt;

use super::Guid;

/// The payload of a [`NodeId`]: exactly one of the four identifier shapes OPC UA allows.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Identifier {
    Numeric(u32),
    String(String),
    Guid(Guid),
    ByteString(Vec<u8>),
}

impl Identifier {
    /// Single-letter tag used by the node-path string grammar (`{ns;typeChar[;v=typeId]}name`):
    /// `I`/`S`/`B`/`G` for Integer/String/Bytestring/Guid.
    #[must_use]
    pub const fn path_char(&self) -> char {
        match self {
            Self::Numeric(_) => 'I',
            Self::String(_) => 'S',
            Self::ByteString(_) => 'B',
            Self::Guid(_) => 'G',
        }
    }
}

/// A (namespace index, identifier) pair addressing a single node in the address space.
///
/// Two `NodeId`s are equal iff their namespace index and identifier (variant and content) both
/// match; there is no cross-variant coercion (a numeric `0` and a string `"0"` are distinct).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NodeId {
    namespace_index: u16,
    identifier: Identifier,
}

impl NodeId {
    /// The null node id: namespace 0, numeric identifier 0.
    pub const NULL: Self = Self {
        namespace_index: 0,
        identifier: Identifier::Numeric(0),
    };

    /// Creates a node id with a numeric identifier.
    #[must_use]
    pub const fn numeric(namespace_index: u16, value: u32) -> Self {
        Self {
            namespace_index,
            identifier: Identifier::Numeric(value),
        }
    }

    /// Creates a node id with a string identifier.
    #[must_use]
    pub fn string(namespace_index: u16, value: impl Into<String>) -> Self {
        Self {
            namespace_index,
            identifier: Identifier::String(value.into()),
        }
    }

    /// Creates a node id with a GUID identifier.
    #[must_use]
    pub const fn guid(namespace_index: u16, value: Guid) -> Self {
        Self {
            namespace_index,
            identifier: Identifier::Guid(value),
        }
    }

    /// Creates a node id with an opaque byte-string identifier.
    #[must_use]
    pub fn byte_string(namespace_index: u16, value: impl Into<Vec<u8>>) -> Self {
        Self {
            namespace_index,
            identifier: Identifier::ByteString(value.into()),
        }
    }

    /// Returns `true` for the null node id (namespace 0, numeric 0).
    #[must_use]
    pub fn is_null(&self) -> bool {
        *self == Self::NULL
    }

    #[must_use]
    pub const fn namespace_index(&self) -> u16 {
        self.namespace_index
    }

    #[must_use]
    pub const fn identifier(&self) -> &Identifier {
        &self.identifier
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.identifier {
            Identifier::Numeric(value) => write!(f, "ns={};i={value}", self.namespace_index),
            Identifier::String(value) => write!(f, "ns={};s={value}", self.namespace_index),
            Identifier::Guid(value) => write!(f, "ns={};g={value}", self.namespace_index),
            Identifier::ByteString(value) => {
                write!(f, "ns={};b={}", self.namespace_index, hex_encode(value))
            }
        }
    }
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|byte| format!("{byte:02x}")).collect()
}
