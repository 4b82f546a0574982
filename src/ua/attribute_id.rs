/// The attribute being addressed by a Read/Write/MonitoredItem operation.
///
/// Every node carries the common attributes; class-specific attributes (e.g. [`Self::VALUE`])
/// are only meaningful for the node classes that declare them (§3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AttributeId(u32);

macro_rules! attribute_ids {
    ($($name:ident = $value:expr;)*) => {
        impl AttributeId {
            $(pub const $name: AttributeId = AttributeId($value);)*
        }
    };
}

attribute_ids! {
    NODE_ID = 1;
    NODE_CLASS = 2;
    BROWSE_NAME = 3;
    DISPLAY_NAME = 4;
    DESCRIPTION = 5;
    WRITE_MASK = 6;
    USER_WRITE_MASK = 7;
    IS_ABSTRACT = 8;
    SYMMETRIC = 9;
    INVERSE_NAME = 10;
    CONTAINS_NO_LOOPS = 11;
    EVENT_NOTIFIER = 12;
    VALUE = 13;
    DATA_TYPE = 14;
    VALUE_RANK = 15;
    ARRAY_DIMENSIONS = 16;
    ACCESS_LEVEL = 17;
    USER_ACCESS_LEVEL = 18;
    MINIMUM_SAMPLING_INTERVAL = 19;
    HISTORIZING = 20;
    EXECUTABLE = 21;
    USER_EXECUTABLE = 22;
}

impl AttributeId {
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }
}
