use std::fmt;

/// A 32-bit OPC UA status code.
///
/// The top two bits classify the code as `Good` (`00`), `Uncertain` (`01`) or `Bad` (`1x`); the
/// rest of the value identifies the specific condition. Only the codes this crate actually
/// produces or consumes are named as associated constants; unrecognised codes round-trip
/// through [`StatusCode::from_raw`]/[`StatusCode::raw`] unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StatusCode(u32);

macro_rules! status_codes {
    ($($(#[$doc:meta])* $name:ident = $value:expr;)*) => {
        impl StatusCode {
            $(
                $(#[$doc])*
                pub const $name: StatusCode = StatusCode($value);
            )*
        }
    };
}

status_codes! {
    /// The operation succeeded.
    GOOD = 0x0000_0000;

    BAD_INVALID_ARGUMENT = 0x8020_0000;
    BAD_RESOURCE_UNAVAILABLE = 0x8020_4000;
    BAD_COMMUNICATION_ERROR = 0x8020_5000;
    BAD_TIMEOUT = 0x800A_0000;
    BAD_SESSION_CLOSED = 0x8000_B000;
    BAD_INTERNAL_ERROR = 0x8000_0000;
    BAD_DECODING_ERROR = 0x8006_0000;
    BAD_ENCODING_LIMITS_EXCEEDED = 0x8006_1000;
    BAD_NODE_ID_UNKNOWN = 0x8033_0000;
    BAD_ATTRIBUTE_ID_INVALID = 0x8035_0000;
    BAD_NODE_ID_EXISTS = 0x803E_0000;
    BAD_NODE_ID_INVALID = 0x8033_1000;
    BAD_PARENT_NODE_ID_INVALID = 0x803B_0000;
    BAD_SOURCE_NODE_ID_INVALID = 0x8031_0000;
    BAD_TARGET_NODE_ID_INVALID = 0x8032_0000;
    BAD_ALREADY_EXISTS = 0x803E_0001;
    BAD_NOT_WRITABLE = 0x803C_0000;
    BAD_TYPE_MISMATCH = 0x8036_0000;
    BAD_ARGUMENTS_MISSING = 0x8080_2000;
    BAD_INVALID_ARGUMENTS_MISSING = 0x8080_2000;
    BAD_USER_ACCESS_DENIED = 0x801F_0000;
    BAD_TOO_MANY_OPERATIONS = 0x8070_0000;
    BAD_NOT_SUPPORTED = 0x8015_0000;
    BAD_METHOD_INVALID = 0x8068_0000;
    BAD_NOTHING_TO_DO = 0x8004_0000;
    BAD_SUBSCRIPTION_ID_INVALID = 0x8034_8000;
    BAD_SEQUENCE_NUMBER_UNKNOWN = 0x8047_0000;
    BAD_NO_SUBSCRIPTION = 0x8046_0000;
    BAD_TOO_MANY_PUBLISH_REQUESTS = 0x8067_0000;
    BAD_MESSAGE_NOT_AVAILABLE = 0x8068_1000;
    BAD_CONTINUATION_POINT_INVALID = 0x804C_0000;
    BAD_NO_CONTINUATION_POINTS = 0x804D_0000;
    BAD_MONITORED_ITEM_ID_INVALID = 0x8042_8000;
    BAD_INDEX_RANGE_INVALID = 0x8020_B000;
    BAD_INDEX_RANGE_NO_DATA = 0x8020_C000;
}

impl StatusCode {
    /// Wraps a raw status code value.
    #[must_use]
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// Returns the raw status code value.
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Returns `true` for the `Good` quality class (top two bits `00`).
    #[must_use]
    pub const fn is_good(self) -> bool {
        (self.0 >> 30) == 0b00
    }

    /// Returns `true` for the `Uncertain` quality class (top two bits `01`).
    #[must_use]
    pub const fn is_uncertain(self) -> bool {
        (self.0 >> 30) == 0b01
    }

    /// Returns `true` for the `Bad` quality class (top bit set).
    #[must_use]
    pub const fn is_bad(self) -> bool {
        (self.0 >> 31) == 0b1
    }
}

impl Default for StatusCode {
    fn default() -> Self {
        Self::GOOD
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08X}", self.0)
    }
}

impl std::error::Error for StatusCode {}

#[cfg(test)]
mod tests {
    use super::StatusCode;

    #[test]
    fn quality_classes() {
        assert!(StatusCode::GOOD.is_good());
        assert!(!StatusCode::GOOD.is_bad());
        assert!(StatusCode::BAD_NODE_ID_UNKNOWN.is_bad());
        assert!(!StatusCode::BAD_NODE_ID_UNKNOWN.is_good());
    }

    #[test]
    fn default_is_good() {
        assert_eq!(StatusCode::default(), StatusCode::GOOD);
    }
}
