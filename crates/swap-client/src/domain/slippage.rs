//! Slippage tolerance and the minimum amounts derived from it.

use {
    crate::domain::eth::U256,
    std::{fmt, str::FromStr},
    thiserror::Error,
};

/// Basis points in 100%.
const BPS: u64 = 10_000;

/// Maximum accepted adverse price movement between quoting and execution,
/// stored at basis point resolution. Always strictly between 0% and 100%.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Tolerance(u64);

impl Tolerance {
    /// The tolerances offered without custom entry: 0.5%, 1% and 3%.
    pub const PRESETS: [Self; 3] = [Self(50), Self(100), Self(300)];

    pub fn from_bps(bps: u64) -> Result<Self, InvalidTolerance> {
        if bps == 0 || bps >= BPS {
            return Err(InvalidTolerance::OutOfRange);
        }
        Ok(Self(bps))
    }

    pub fn bps(self) -> u64 {
        self.0
    }

    /// The minimum amount to accept for a `quoted` amount, i.e.
    /// `floor(quoted * (10000 - bps) / 10000)`.
    ///
    /// The result is never larger than `quoted`.
    pub fn minimum_accepted(self, quoted: U256) -> U256 {
        // With `quoted = q * 10000 + r` the floor distributes over `q` exactly,
        // so nothing here can overflow.
        let bps = U256::from(BPS);
        let keep = U256::from(BPS - self.0);
        let (q, r) = quoted.div_rem(bps);
        q * keep + r * keep / bps
    }
}

impl Default for Tolerance {
    fn default() -> Self {
        Self::PRESETS[0]
    }
}

impl FromStr for Tolerance {
    type Err = InvalidTolerance;

    /// Parses a percentage like `0.5` or `3`, optionally followed by `%`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let percent = s.strip_suffix('%').unwrap_or(s);
        let bps = number::to_fixed_point(percent, 2).map_err(|err| match err {
            number::ParseError::TooPrecise(_) => InvalidTolerance::TooPrecise,
            err => InvalidTolerance::Malformed(err),
        })?;
        let bps = u64::try_from(bps).map_err(|_| InvalidTolerance::OutOfRange)?;
        Self::from_bps(bps)
    }
}

impl fmt::Display for Tolerance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", number::from_fixed_point(U256::from(self.0), 2))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidTolerance {
    #[error("tolerance must be strictly between 0% and 100%")]
    OutOfRange,
    #[error("tolerance supports at most two decimal places")]
    TooPrecise,
    #[error("malformed tolerance: {0}")]
    Malformed(number::ParseError),
}
