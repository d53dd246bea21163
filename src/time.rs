use crate::Timestamp;
use std::time::{SystemTime, UNIX_EPOCH};

/// Returns the current timestamp in nanoseconds.
///
/// Returns 0 if the system clock is set before the UNIX epoch.
#[must_use]
pub fn timestamp() -> Timestamp {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default()
}

/// Helpers for expressing step sizes and time ranges in nanoseconds.
///
/// ```
/// use stepblock::{Bounds, Duration};
///
/// let end = Duration::hours(2);
/// let bounds = Bounds::new(end - Duration::minutes(15), end, Duration::minutes(1))?;
///
/// assert_eq!(15, bounds.steps());
/// # Ok::<(), stepblock::Error>(())
/// ```
pub struct Duration;

impl Duration {
    /// N days in nanoseconds.
    #[must_use]
    pub const fn days(n: u64) -> Timestamp {
        Self::hours(n) * 24
    }

    /// N hours in nanoseconds.
    #[must_use]
    pub const fn hours(n: u64) -> Timestamp {
        Self::minutes(n) * 60
    }

    /// N minutes in nanoseconds.
    #[must_use]
    pub const fn minutes(n: u64) -> Timestamp {
        Self::seconds(n) * 60
    }

    /// N seconds in nanoseconds.
    #[must_use]
    pub const fn seconds(n: u64) -> Timestamp {
        Self::millis(n) * 1_000
    }

    /// N milliseconds in nanoseconds.
    #[must_use]
    pub const fn millis(n: u64) -> Timestamp {
        Self::micros(n) * 1_000
    }

    /// N microseconds in nanoseconds.
    #[must_use]
    pub const fn micros(n: u64) -> Timestamp {
        Self::nanos(n) * 1_000
    }

    /// N nanoseconds.
    #[must_use]
    pub const fn nanos(n: u64) -> Timestamp {
        n as Timestamp
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test_log::test]
    fn duration_units() {
        assert_eq!(1_000_000_000, Duration::seconds(1));
        assert_eq!(Duration::seconds(90), Duration::minutes(1) + Duration::seconds(30));
        assert_eq!(Duration::hours(48), Duration::days(2));
    }
}
