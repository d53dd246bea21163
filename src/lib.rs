//! Step-aligned block iteration for multi-resolution time series.
//!
//! Raw datapoints of a series may be stored in several namespaces, each
//! with its own retention and resolution. `stepblock` grinds all of them
//! onto one canonical grid (`start`, `end`, `step_size`) and exposes the
//! result as a rectangular block of `[step x series]` values.
//!
//! The iterator stack, leaves first:
//!
//! - a [`RawCursor`] walks the stored datapoints of one series in one namespace
//! - a [`NamespaceBlockIter`] resamples one or more raw cursors onto the grid,
//!   carrying a datapoint forward for exactly one step
//! - a [`ConsolidatedSeriesIter`] advances all namespaces of a series in lock-step
//!   and reduces their values with a [`Consolidation`] policy
//! - a [`StepIter`] advances all series in lock-step and emits one [`Step`] row per grid step
//!
//! Missing data is never stored as a magic value: a step without a datapoint
//! in its window is a gap, reported as `NaN`.
//!
//! ```
//! use stepblock::{
//!     tagset, Bounds, ConsolidatedSeries, Datapoint, MemorySeries, MultiSeriesBlock,
//!     NamespaceBlock, SeriesMeta,
//! };
//!
//! let bounds = Bounds::new(0, 40, 10)?;
//!
//! let raw = MemorySeries::new(vec![
//!     Datapoint::new(5, 1.0),
//!     Datapoint::new(25, 2.0),
//! ])?;
//!
//! let series = ConsolidatedSeries::new(SeriesMeta::new("cpu.total", tagset!("host" => "h-1")), bounds)
//!     .with_namespace(NamespaceBlock::new("raw", bounds).with_source(raw));
//!
//! let block = MultiSeriesBlock::builder(bounds).series(series).build()?;
//!
//! for step in block.step_iter()? {
//!     let step = step?;
//!     println!("{} => {:?}", step.time, step.values);
//! }
//!
//! # Ok::<(), stepblock::Error>(())
//! ```

#![forbid(unsafe_code)]
#![deny(clippy::all, missing_docs)]
#![deny(clippy::unwrap_used)]
#![warn(clippy::indexing_slicing)]
#![warn(clippy::pedantic, clippy::nursery)]
#![warn(clippy::expect_used)]
#![allow(clippy::missing_const_for_fn)]
#![warn(clippy::multiple_crate_versions)]
#![warn(clippy::result_unit_err)]

macro_rules! fail_iter {
    ($e:expr) => {
        match $e {
            Ok(v) => v,
            Err(e) => return Some(Err(e)),
        }
    };
}

mod block;
mod bounds;
mod consolidation;
mod cursor;
mod error;
mod namespace;
mod series;
mod step;
mod storage;
mod time;

type HashMap<K, V> = std::collections::HashMap<K, V, rustc_hash::FxBuildHasher>;

pub use block::{Builder, Metadata, MultiSeriesBlock, Series, SeriesIter, SeriesMeta};
pub use bounds::Bounds;
pub use consolidation::{Avg, Consolidation, First, FirstPresent, Max, Min, Sum};
pub use cursor::{CursorSource, Datapoint, IterCursor, MemoryCursor, MemorySeries, RawCursor};
pub use error::{Error, Result};
pub use namespace::{NamespaceBlock, NamespaceBlockIter};
pub use series::{ConsolidatedSeries, ConsolidatedSeriesIter};
pub use step::{Step, StepIter};
pub use storage::{Store, StoreBuilder, StoredSeries};
pub use time::{timestamp, Duration};

/// Nanosecond timestamp.
pub type Timestamp = u128;

/// Value of a datapoint; gaps are `NaN`.
pub type Value = f64;

/// A list of tags.
pub type TagSet<'a> = [(&'a str, &'a str)];

/// Owned tags of a series or block.
pub type Tags = HashMap<String, String>;

/// Uniform contract shared by every level of the iterator stack.
///
/// `advance` moves to the next grid step and returns `Ok(false)` once the
/// iterator is exhausted. `current` is only meaningful after `advance`
/// returned `Ok(true)`.
pub trait GridIterator {
    /// What the iterator yields at each step.
    type Item;

    /// Moves to the next grid step.
    ///
    /// # Errors
    ///
    /// Returns error if an underlying raw cursor failed.
    fn advance(&mut self) -> Result<bool>;

    /// Returns the item at the current step.
    fn current(&self) -> Self::Item;

    /// Releases all owned resources. Calling it more than once is a no-op.
    fn release(&mut self);
}

/// Macro to create a list of tags.
///
/// # Examples
///
/// ```
/// use stepblock::{tagset, TagSet};
///
/// let tags: &TagSet = tagset!(
///   "service" => "db",
///   "env" => "production",
/// );
/// ```
#[macro_export]
macro_rules! tagset {
  ($($k:expr => $v:expr),* $(,)?) => {{
      &[$(($k.into(), $v.into()),)*]
  }}
}
