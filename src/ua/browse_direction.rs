/// The direction of references a browse descriptor follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BrowseDirection {
    Forward,
    Inverse,
    Both,
}

impl BrowseDirection {
    /// Returns `true` when a reference stored with forward sense `is_forward` matches this
    /// direction filter.
    #[must_use]
    pub const fn matches(self, is_forward: bool) -> bool {
        match self {
            Self::Forward => is_forward,
            Self::Inverse => !is_forward,
            Self::Both => true,
        }
    }
}
