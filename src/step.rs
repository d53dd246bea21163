use crate::{
    consolidation::Consolidation, series::ConsolidatedSeriesIter, Bounds, GridIterator,
    Timestamp, Value,
};

/// One row of a block: a grid time and one value per series.
#[derive(Clone, Debug, PartialEq)]
pub struct Step {
    /// Grid time of the step
    pub time: Timestamp,

    /// Consolidated value of each series, in block order
    pub values: Vec<Value>,
}

/// Advances all series of a block in lock-step, emitting one [`Step`] per grid step.
///
/// Iteration stops as soon as any series is exhausted, so every emitted row
/// has a value (possibly a gap) for every series.
pub struct StepIter<C: Consolidation> {
    series: Vec<ConsolidatedSeriesIter<C>>,
    bounds: Bounds,

    /// `None` before the first successful `advance`
    index: Option<usize>,

    is_exhausted: bool,
}

impl<C: Consolidation> StepIter<C> {
    /// Creates a step iterator over already opened series iterators.
    #[must_use]
    pub fn new(bounds: Bounds, series: Vec<ConsolidatedSeriesIter<C>>) -> Self {
        Self {
            series,
            bounds,
            index: None,
            is_exhausted: false,
        }
    }

    /// Row width: the number of series, and thus values, in every row.
    ///
    /// This is not the number of steps; see [`StepIter::step_count`].
    #[must_use]
    pub fn step_width(&self) -> usize {
        self.series.len()
    }

    /// Number of steps of the canonical grid.
    ///
    /// Fewer rows are emitted if a series runs out early.
    #[must_use]
    pub fn step_count(&self) -> usize {
        self.bounds.steps()
    }

    /// Index of the current step.
    #[must_use]
    pub fn index(&self) -> Option<usize> {
        self.index
    }

    /// The current row.
    ///
    /// The time is derived from the canonical grid only.
    #[must_use]
    pub fn current_row(&self) -> Step {
        Step {
            time: self.bounds.time_at(self.index.unwrap_or_default()),
            values: self
                .series
                .iter()
                .map(ConsolidatedSeriesIter::value)
                .collect(),
        }
    }
}

impl<C: Consolidation> GridIterator for StepIter<C> {
    type Item = Step;

    fn advance(&mut self) -> crate::Result<bool> {
        if self.is_exhausted || self.series.is_empty() {
            self.is_exhausted = true;
            return Ok(false);
        }

        for (idx, series) in self.series.iter_mut().enumerate() {
            if !series.advance()? {
                log::trace!(
                    "series #{idx} exhausted after {} steps",
                    self.index.map_or(0, |i| i + 1),
                );
                self.is_exhausted = true;
                return Ok(false);
            }
        }

        self.index = Some(self.index.map_or(0, |i| i + 1));

        Ok(true)
    }

    fn current(&self) -> Step {
        self.current_row()
    }

    fn release(&mut self) {
        if !self.series.is_empty() {
            log::trace!("releasing step iterator over {} series", self.series.len());
        }

        for series in &mut self.series {
            series.release();
        }
        self.series.clear();
        self.is_exhausted = true;
    }
}

impl<C: Consolidation> Iterator for StepIter<C> {
    type Item = crate::Result<Step>;

    fn next(&mut self) -> Option<Self::Item> {
        let advanced = self.advance();

        if advanced.is_err() {
            self.is_exhausted = true;
        }

        if fail_iter!(advanced) {
            Some(Ok(self.current_row()))
        } else {
            None
        }
    }
}
