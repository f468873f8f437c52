use {crate::domain::eth::U256, std::time::Duration, thiserror::Error};

/// The current time. Fixed for the whole test run so that deadlines are
/// deterministic.
pub fn now() -> chrono::DateTime<chrono::Utc> {
    #[cfg(test)]
    {
        static FIXED: std::sync::LazyLock<chrono::DateTime<chrono::Utc>> =
            std::sync::LazyLock::new(chrono::Utc::now);
        *FIXED
    }
    #[cfg(not(test))]
    chrono::Utc::now()
}

/// The point in time after which the router must reject an action instead of
/// executing it.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct Deadline(chrono::DateTime<chrono::Utc>);

impl Deadline {
    /// A deadline `validity` from now. Has to be computed right before an
    /// action is submitted, never when it was quoted.
    pub fn from_now(validity: Duration) -> Result<Self, DeadlineOutOfRange> {
        let validity = chrono::Duration::from_std(validity).map_err(|_| DeadlineOutOfRange)?;
        now()
            .checked_add_signed(validity)
            .map(Self)
            .ok_or(DeadlineOutOfRange)
    }

    /// The deadline as a unix timestamp, the way the router expects it.
    pub fn timestamp(self) -> U256 {
        U256::from(self.0.timestamp().max(0).unsigned_abs())
    }
}

impl From<chrono::DateTime<chrono::Utc>> for Deadline {
    fn from(value: chrono::DateTime<chrono::Utc>) -> Self {
        Self(value)
    }
}

#[derive(Debug, Error)]
#[error("the deadline is out of range")]
pub struct DeadlineOutOfRange;
