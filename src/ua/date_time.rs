/// A 64-bit OPC UA timestamp: 100 ns ticks since 1601-01-01 UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DateTime(i64);

impl DateTime {
    /// The epoch instant itself (tick count zero).
    pub const EPOCH: Self = Self(0);

    #[must_use]
    pub const fn from_ticks(ticks: i64) -> Self {
        Self(ticks)
    }

    #[must_use]
    pub const fn ticks(self) -> i64 {
        self.0
    }

    #[cfg(feature = "time")]
    #[must_use]
    pub fn now() -> Self {
        // 1601-01-01 to 1970-01-01 is 11_644_473_600 seconds.
        const EPOCH_OFFSET_100NS: i64 = 11_644_473_600 * 10_000_000;
        let unix_100ns = time::OffsetDateTime::now_utc().unix_timestamp_nanos() / 100;
        Self(EPOCH_OFFSET_100NS + i64::try_from(unix_100ns).unwrap_or(i64::MAX))
    }
}
