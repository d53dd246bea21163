use crate::Timestamp;

/// Canonical step grid of a block: `[start, end)` in steps of `step_size`.
///
/// Grid times are `start`, `start + step_size`, ... up to (excluding) `end`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Bounds {
    start: Timestamp,
    end: Timestamp,
    step_size: Timestamp,
}

impl std::fmt::Display for Bounds {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}..{}) step {}", self.start, self.end, self.step_size)
    }
}

impl Bounds {
    /// Creates validated bounds.
    ///
    /// # Errors
    ///
    /// Returns error if `end <= start` or `step_size` is zero.
    pub fn new(start: Timestamp, end: Timestamp, step_size: Timestamp) -> crate::Result<Self> {
        if end <= start || step_size == 0 {
            return Err(crate::Error::InvalidBounds {
                start,
                end,
                step_size,
            });
        }

        Ok(Self {
            start,
            end,
            step_size,
        })
    }

    /// First grid time.
    #[must_use]
    pub fn start(&self) -> Timestamp {
        self.start
    }

    /// Exclusive end of the grid.
    #[must_use]
    pub fn end(&self) -> Timestamp {
        self.end
    }

    /// Distance between two grid times.
    #[must_use]
    pub fn step_size(&self) -> Timestamp {
        self.step_size
    }

    /// Number of grid steps, `ceil((end - start) / step_size)`.
    #[must_use]
    pub fn steps(&self) -> usize {
        let steps = (self.end - self.start).div_ceil(self.step_size);
        usize::try_from(steps).unwrap_or(usize::MAX)
    }

    /// Grid time of the step at `index`.
    ///
    /// Saturates at [`Timestamp::MAX`].
    #[must_use]
    pub fn time_at(&self, index: usize) -> Timestamp {
        (index as Timestamp)
            .saturating_mul(self.step_size)
            .saturating_add(self.start)
    }

    /// Returns `true` if both bounds cover the same time range,
    /// regardless of step size.
    #[must_use]
    pub fn same_range(&self, other: &Self) -> bool {
        self.start == other.start && self.end == other.end
    }

    /// Returns the same time range with a different step size.
    ///
    /// # Errors
    ///
    /// Returns error if `step_size` is zero.
    pub fn with_step_size(&self, step_size: Timestamp) -> crate::Result<Self> {
        Self::new(self.start, self.end, step_size)
    }
}
