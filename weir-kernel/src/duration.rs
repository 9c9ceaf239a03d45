//! Millisecond duration type used by every timer-driven combinator.
//!
//! [`DurationMs`] serializes as a plain integer (milliseconds) rather than
//! serde's internal `{"secs": N, "nanos": N}` shape, so a delay written in
//! a config or a trace stays readable and stable.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Duration in milliseconds with a stable JSON serialization format.
///
/// The kernel deals exclusively in millisecond granularity: `delay`,
/// `timeout`, `debounce` and `clock` all take a [`DurationMs`]. Zero is
/// meaningful — a zero delay defers to the next scheduler tick instead of
/// arming a timer.
///
/// # Examples
///
/// ```
/// use weir_kernel::DurationMs;
///
/// let d = DurationMs::from_millis(250);
/// assert_eq!(d.as_millis(), 250);
/// assert_eq!(serde_json::to_string(&d).unwrap(), "250");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DurationMs(u64);

impl DurationMs {
    /// Zero duration — "next tick", not "now".
    pub const ZERO: Self = Self(0);

    /// Create from milliseconds.
    pub fn from_millis(ms: u64) -> Self {
        Self(ms)
    }

    /// Create from seconds.
    pub fn from_secs(secs: u64) -> Self {
        Self(secs.saturating_mul(1000))
    }

    /// The value in milliseconds.
    pub fn as_millis(&self) -> u64 {
        self.0
    }

    /// Whether this is the zero duration.
    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Convert to `std::time::Duration`.
    pub fn to_std(&self) -> Duration {
        Duration::from_millis(self.0)
    }
}

impl From<u64> for DurationMs {
    fn from(ms: u64) -> Self {
        Self(ms)
    }
}

impl From<Duration> for DurationMs {
    fn from(d: Duration) -> Self {
        Self(d.as_millis() as u64)
    }
}

impl From<DurationMs> for Duration {
    fn from(d: DurationMs) -> Self {
        Duration::from_millis(d.0)
    }
}

impl Default for DurationMs {
    fn default() -> Self {
        Self::ZERO
    }
}

impl std::fmt::Display for DurationMs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}ms", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_integer_wire_format() {
        let d = DurationMs::from_secs(2);
        assert_eq!(serde_json::to_string(&d).unwrap(), "2000");
        let back: DurationMs = serde_json::from_str("2000").unwrap();
        assert_eq!(back, d);
    }

    #[test]
    fn zero_is_zero() {
        assert!(DurationMs::ZERO.is_zero());
        assert!(!DurationMs::from_millis(1).is_zero());
    }
}
