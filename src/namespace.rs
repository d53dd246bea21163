use crate::{
    cursor::{CursorSource, Datapoint, RawCursor},
    Bounds, GridIterator, Timestamp, Value,
};
use std::sync::Arc;

/// One namespace's contribution to one series.
///
/// A namespace may split a series over several raw sources (e.g. one per
/// on-disk block); they are drained strictly in the order they were added.
#[derive(Clone)]
pub struct NamespaceBlock {
    namespace: String,
    bounds: Bounds,
    sources: Vec<Arc<dyn CursorSource>>,
}

impl std::fmt::Debug for NamespaceBlock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NamespaceBlock")
            .field("namespace", &self.namespace)
            .field("bounds", &self.bounds)
            .field("sources", &self.sources.len())
            .finish()
    }
}

impl NamespaceBlock {
    /// Creates a namespace block without any sources.
    ///
    /// `bounds.step_size()` is the native resolution of the namespace.
    pub fn new<S: Into<String>>(namespace: S, bounds: Bounds) -> Self {
        Self {
            namespace: namespace.into(),
            bounds,
            sources: Vec::new(),
        }
    }

    /// Appends a raw source.
    #[must_use]
    pub fn with_source<S: CursorSource + 'static>(mut self, source: S) -> Self {
        self.sources.push(Arc::new(source));
        self
    }

    /// Name of the namespace.
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Bounds with the native step size of the namespace.
    #[must_use]
    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    /// Number of raw sources.
    #[must_use]
    pub fn source_count(&self) -> usize {
        self.sources.len()
    }

    /// Opens all sources and returns an iterator over the canonical `grid`.
    pub(crate) fn iter(&self, grid: Bounds) -> crate::Result<NamespaceBlockIter> {
        let cursors = self
            .sources
            .iter()
            .map(|source| source.open())
            .collect::<crate::Result<Vec<_>>>()?;

        if grid.step_size() != self.bounds.step_size() {
            log::trace!(
                "grinding namespace {:?} (native step {}) onto step {}",
                self.namespace,
                self.bounds.step_size(),
                grid.step_size(),
            );
        }

        Ok(NamespaceBlockIter::new(grid, cursors))
    }
}

/// Resamples an ordered sequence of raw cursors onto a step grid.
///
/// A datapoint at `ts` is the value of exactly one step: the one whose grid
/// time `t` satisfies `t <= ts < t + step_size`. Every other step is a gap.
pub struct NamespaceBlockIter {
    cursors: Vec<Box<dyn RawCursor>>,
    cursor_idx: usize,
    bounds: Bounds,

    /// `None` before the first call to `advance`
    index_time: Option<Timestamp>,

    last_seen: Option<Datapoint>,
    is_exhausted: bool,
}

impl NamespaceBlockIter {
    /// Creates an iterator draining `cursors` in order.
    #[must_use]
    pub fn new(bounds: Bounds, cursors: Vec<Box<dyn RawCursor>>) -> Self {
        Self {
            cursors,
            cursor_idx: 0,
            bounds,
            index_time: None,
            last_seen: None,
            is_exhausted: false,
        }
    }

    /// Grid time of the current step.
    #[must_use]
    pub fn index_time(&self) -> Option<Timestamp> {
        self.index_time
    }

    /// Value at the current step, or `NaN` if no datapoint falls into its window.
    #[must_use]
    pub fn value(&self) -> Value {
        match (self.index_time, self.last_seen) {
            (Some(t), Some(dp)) if t <= dp.ts && dp.ts - t < self.bounds.step_size() => dp.value,
            _ => Value::NAN,
        }
    }

    fn pull(&mut self) -> crate::Result<Option<Datapoint>> {
        while let Some(cursor) = self.cursors.get_mut(self.cursor_idx) {
            while cursor.advance()? {
                if let Some(dp) = cursor.current() {
                    return Ok(Some(dp));
                }

                log::warn!("raw cursor #{} advanced without a datapoint", self.cursor_idx);
            }

            // NOTE: Drained cursors are released right away, the next one takes over
            log::trace!("raw cursor #{} drained", self.cursor_idx);
            cursor.release();
            self.cursor_idx += 1;
        }

        Ok(None)
    }
}

impl GridIterator for NamespaceBlockIter {
    type Item = Value;

    fn advance(&mut self) -> crate::Result<bool> {
        if self.is_exhausted {
            return Ok(false);
        }

        let index_time = match self.index_time {
            None => Some(self.bounds.start()),
            Some(t) => t.checked_add(self.bounds.step_size()),
        };

        let Some(index_time) = index_time.filter(|&t| t < self.bounds.end()) else {
            self.is_exhausted = true;
            return Ok(false);
        };

        self.index_time = Some(index_time);

        while self.last_seen.map_or(true, |dp| index_time > dp.ts) {
            let Some(dp) = self.pull()? else {
                break;
            };
            self.last_seen = Some(dp);
        }

        Ok(true)
    }

    fn current(&self) -> Value {
        self.value()
    }

    fn release(&mut self) {
        for cursor in self.cursors.iter_mut().skip(self.cursor_idx) {
            cursor.release();
        }
        self.cursors.clear();
        self.cursor_idx = 0;
        self.is_exhausted = true;
    }
}

impl Drop for NamespaceBlockIter {
    fn drop(&mut self) {
        self.release();
    }
}
