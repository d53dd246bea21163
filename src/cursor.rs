use crate::{Timestamp, Value};
use std::sync::Arc;

/// A raw, stored datapoint.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Datapoint {
    /// Timestamp in nanoseconds
    pub ts: Timestamp,

    /// Stored value
    pub value: Value,
}

impl Datapoint {
    /// Creates a datapoint.
    #[must_use]
    pub fn new(ts: Timestamp, value: Value) -> Self {
        Self { ts, value }
    }
}

/// Forward-only cursor over the stored datapoints of one series in one namespace.
///
/// Datapoints must be yielded in ascending timestamp order.
pub trait RawCursor {
    /// Moves to the next datapoint.
    ///
    /// Returns `Ok(false)` once the cursor is exhausted.
    ///
    /// # Errors
    ///
    /// Returns error if the datapoint could not be read.
    fn advance(&mut self) -> crate::Result<bool>;

    /// Datapoint the cursor is positioned on.
    fn current(&self) -> Option<Datapoint>;

    /// Frees whatever the cursor holds on to.
    fn release(&mut self) {}
}

/// Something raw cursors can be (re-)opened from.
pub trait CursorSource {
    /// Opens a new cursor positioned before the first datapoint.
    ///
    /// # Errors
    ///
    /// Returns error if the underlying storage could not be accessed.
    fn open(&self) -> crate::Result<Box<dyn RawCursor>>;
}

/// Adapts an iterator of datapoints into a [`RawCursor`].
pub struct IterCursor<I: Iterator<Item = crate::Result<Datapoint>>> {
    inner: Option<I>,
    current: Option<Datapoint>,
}

impl<I: Iterator<Item = crate::Result<Datapoint>>> IterCursor<I> {
    /// Wraps `inner`.
    pub fn new(inner: I) -> Self {
        Self {
            inner: Some(inner),
            current: None,
        }
    }
}

impl<I: Iterator<Item = crate::Result<Datapoint>>> RawCursor for IterCursor<I> {
    fn advance(&mut self) -> crate::Result<bool> {
        let Some(inner) = &mut self.inner else {
            return Ok(false);
        };

        match inner.next() {
            Some(dp) => {
                self.current = Some(dp?);
                Ok(true)
            }
            None => {
                self.current = None;
                Ok(false)
            }
        }
    }

    fn current(&self) -> Option<Datapoint> {
        self.current
    }

    fn release(&mut self) {
        self.inner = None;
        self.current = None;
    }
}

/// In-memory raw series, shared between all cursors opened from it.
#[derive(Clone, Debug)]
pub struct MemorySeries(Arc<[Datapoint]>);

impl MemorySeries {
    /// Creates an in-memory series.
    ///
    /// # Errors
    ///
    /// Returns error if the datapoints are not ordered by timestamp.
    pub fn new(points: Vec<Datapoint>) -> crate::Result<Self> {
        for pair in points.windows(2) {
            if let [prev, next] = pair {
                if next.ts < prev.ts {
                    return Err(crate::Error::UnorderedDatapoints {
                        prev: prev.ts,
                        next: next.ts,
                    });
                }
            }
        }

        Ok(Self(points.into()))
    }

    /// Number of datapoints.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if the series holds no datapoints.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Opens a cursor without boxing it.
    #[must_use]
    pub fn cursor(&self) -> MemoryCursor {
        MemoryCursor {
            points: Some(self.0.clone()),
            next: 0,
            current: None,
        }
    }
}

impl CursorSource for MemorySeries {
    fn open(&self) -> crate::Result<Box<dyn RawCursor>> {
        Ok(Box::new(self.cursor()))
    }
}

/// Cursor over a [`MemorySeries`].
pub struct MemoryCursor {
    points: Option<Arc<[Datapoint]>>,
    next: usize,
    current: Option<Datapoint>,
}

impl RawCursor for MemoryCursor {
    fn advance(&mut self) -> crate::Result<bool> {
        self.current = self
            .points
            .as_ref()
            .and_then(|points| points.get(self.next))
            .copied();

        if self.current.is_some() {
            self.next += 1;
        }

        Ok(self.current.is_some())
    }

    fn current(&self) -> Option<Datapoint> {
        self.current
    }

    fn release(&mut self) {
        self.points = None;
        self.current = None;
    }
}
