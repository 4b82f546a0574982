use std::fmt;

#[cfg(feature = "uuid")]
use uuid::Uuid;

/// A 16-byte GUID, one of the four [`Identifier`](super::Identifier) variants a [`NodeId`](super::NodeId) may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Guid([u8; 16]);

impl Guid {
    /// The nil GUID (all bytes zero).
    pub const NIL: Self = Self([0; 16]);

    /// Wraps 16 raw bytes as a GUID without interpreting their layout.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    /// Returns the underlying bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }
}

#[cfg(feature = "uuid")]
impl From<Uuid> for Guid {
    fn from(uuid: Uuid) -> Self {
        Self(*uuid.as_bytes())
    }
}

#[cfg(feature = "uuid")]
impl From<Guid> for Uuid {
    fn from(guid: Guid) -> Self {
        Uuid::from_bytes(guid.0)
    }
}

impl fmt::Display for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        #[cfg(feature = "uuid")]
        {
            write!(f, "{}", Uuid::from_bytes(self.0))
        }
        #[cfg(not(feature = "uuid"))]
        {
            for byte in self.0 {
                write!(f, "{byte:02x}")?;
            }
            Ok(())
        }
    }
}
