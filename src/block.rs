use crate::{
    consolidation::{Consolidation, First},
    series::{ConsolidatedSeries, ConsolidatedSeriesIter},
    step::StepIter,
    Bounds, TagSet, Tags,
};
use std::collections::HashSet;

/// Identity of one logical series: a name plus its tags.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SeriesMeta {
    name: String,
    tags: Tags,
}

impl std::fmt::Display for SeriesMeta {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.series_key())
    }
}

impl SeriesMeta {
    /// Creates series metadata.
    #[must_use]
    pub fn new(name: &str, tags: &TagSet) -> Self {
        Self {
            name: name.to_string(),
            tags: tags
                .iter()
                .map(|&(key, value)| (key.to_string(), value.to_string()))
                .collect(),
        }
    }

    /// Name of the series (e.g. `cpu.total`).
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Tags of the series.
    #[must_use]
    pub fn tags(&self) -> &Tags {
        &self.tags
    }

    /// Returns the value of a tag.
    #[must_use]
    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(String::as_str)
    }

    /// Canonical key of the series, `name#k1:v1;k2:v2` with tags sorted by key.
    #[must_use]
    pub fn series_key(&self) -> String {
        let mut tags = self.tags.iter().collect::<Vec<_>>();
        tags.sort();

        let total_len = tags
            .iter()
            .map(|(key, value)| key.len() + value.len() + 1) // +1 for the ':' between key and value
            .sum::<usize>()
            + tags.len().saturating_sub(1); // Add space for the semicolons

        let mut key = String::with_capacity(self.name.len() + 1 + total_len);
        key.push_str(&self.name);
        key.push('#');

        for (idx, (k, v)) in tags.iter().enumerate() {
            if idx > 0 {
                key.push(';');
            }
            key.push_str(k);
            key.push(':');
            key.push_str(v);
        }

        key
    }
}

/// Block-level metadata: the canonical grid and block-scoped tags.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Metadata {
    /// Canonical grid shared by every series
    pub bounds: Bounds,

    /// Tags shared by the whole block
    pub tags: Tags,
}

impl Metadata {
    /// Creates metadata without tags.
    #[must_use]
    pub fn new(bounds: Bounds) -> Self {
        Self {
            bounds,
            tags: Tags::default(),
        }
    }
}

/// A series as seen through [`MultiSeriesBlock::series_iter`].
pub struct Series<'a, C: Consolidation> {
    /// Metadata of the series
    pub meta: &'a SeriesMeta,

    /// Consolidated values of the series, one per step
    pub values: ConsolidatedSeriesIter<C>,
}

/// Lazily opens one series after another, in block order.
pub struct SeriesIter<'a, C: Consolidation> {
    series: std::slice::Iter<'a, ConsolidatedSeries>,
    consolidation: C,
}

impl<'a, C: Consolidation> Iterator for SeriesIter<'a, C> {
    type Item = crate::Result<Series<'a, C>>;

    fn next(&mut self) -> Option<Self::Item> {
        let series = self.series.next()?;
        let values = fail_iter!(series.iter(self.consolidation.clone()));

        Some(Ok(Series {
            meta: series.meta(),
            values,
        }))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.series.size_hint()
    }
}

/// A rectangular `[step x series]` block of consolidated values.
///
/// The block owns the description of every series (their raw sources), not
/// any cursor state, so it can hand out any number of fresh iterators.
pub struct MultiSeriesBlock<C: Consolidation = First> {
    meta: Metadata,
    series: Vec<ConsolidatedSeries>,
    consolidation: C,
    is_released: bool,
}

impl MultiSeriesBlock<First> {
    /// Starts building a block over the given canonical grid.
    #[must_use]
    pub fn builder(bounds: Bounds) -> Builder<First> {
        Builder::new(bounds)
    }
}

impl<C: Consolidation> MultiSeriesBlock<C> {
    /// Creates a block.
    ///
    /// # Errors
    ///
    /// Returns error if a series or namespace block disagrees with the canonical bounds,
    /// if a series has no name, or if two series share the same series key.
    pub fn new(
        meta: Metadata,
        series: Vec<ConsolidatedSeries>,
        consolidation: C,
    ) -> crate::Result<Self> {
        let mut keys = HashSet::with_capacity(series.len());

        for (index, s) in series.iter().enumerate() {
            if s.meta().name().is_empty() {
                return Err(crate::Error::InvalidSeriesMeta {
                    index,
                    reason: "series name is empty",
                });
            }

            let key = s.meta().series_key();

            if s.bounds() != meta.bounds {
                return Err(crate::Error::BoundsMismatch {
                    series: key,
                    namespace: None,
                    expected: meta.bounds,
                    actual: s.bounds(),
                });
            }

            s.validate()?;

            if !keys.insert(key.clone()) {
                return Err(crate::Error::DuplicateSeries(key));
            }
        }

        log::debug!(
            "created block {} with {} series",
            meta.bounds,
            series.len()
        );

        Ok(Self {
            meta,
            series,
            consolidation,
            is_released: false,
        })
    }

    /// Canonical bounds and block tags.
    #[must_use]
    pub fn meta(&self) -> &Metadata {
        &self.meta
    }

    /// Returns a fresh step iterator.
    ///
    /// All raw sources are opened anew, so the block can be iterated again.
    ///
    /// # Errors
    ///
    /// Returns error if the block was released, or if a raw source could not be opened.
    pub fn step_iter(&self) -> crate::Result<StepIter<C>> {
        if self.is_released {
            return Err(crate::Error::Released);
        }

        let series = self
            .series
            .iter()
            .map(|s| s.iter(self.consolidation.clone()))
            .collect::<crate::Result<Vec<_>>>()?;

        Ok(StepIter::new(self.meta.bounds, series))
    }

    /// Returns a lazy iterator over all series, in block order.
    ///
    /// Every series yields its own values until it is exhausted; there is no
    /// truncation across series.
    ///
    /// # Errors
    ///
    /// Returns error if the block was released.
    pub fn series_iter(&self) -> crate::Result<SeriesIter<'_, C>> {
        if self.is_released {
            return Err(crate::Error::Released);
        }

        Ok(SeriesIter {
            series: self.series.iter(),
            consolidation: self.consolidation.clone(),
        })
    }

    /// Metadata of every series, in block order.
    #[must_use]
    pub fn series_meta(&self) -> Vec<&SeriesMeta> {
        self.series.iter().map(ConsolidatedSeries::meta).collect()
    }

    /// Number of steps of the canonical grid.
    #[must_use]
    pub fn step_count(&self) -> usize {
        self.meta.bounds.steps()
    }

    /// Number of series.
    #[must_use]
    pub fn series_count(&self) -> usize {
        self.series.len()
    }

    /// Drops every series and its raw sources.
    ///
    /// Iterators handed out earlier own their cursors and are released on their own.
    pub fn release(&mut self) {
        if self.is_released {
            return;
        }

        log::trace!("releasing block with {} series", self.series.len());

        self.series.clear();
        self.is_released = true;
    }
}

/// Builder for [`MultiSeriesBlock`].
pub struct Builder<C: Consolidation> {
    meta: Metadata,
    series: Vec<ConsolidatedSeries>,
    consolidation: C,
}

impl Builder<First> {
    pub(crate) fn new(bounds: Bounds) -> Self {
        Self {
            meta: Metadata::new(bounds),
            series: Vec::new(),
            consolidation: First,
        }
    }
}

impl<C: Consolidation> Builder<C> {
    /// Adds a block-scoped tag.
    #[must_use]
    pub fn tag(mut self, key: &str, value: &str) -> Self {
        self.meta.tags.insert(key.to_string(), value.to_string());
        self
    }

    /// Sets the consolidation policy.
    ///
    /// Default = [`First`]
    #[must_use]
    pub fn consolidation<D: Consolidation>(self, consolidation: D) -> Builder<D> {
        Builder {
            meta: self.meta,
            series: self.series,
            consolidation,
        }
    }

    /// Appends a series; series order is the column order of every row.
    #[must_use]
    pub fn series(mut self, series: ConsolidatedSeries) -> Self {
        self.series.push(series);
        self
    }

    /// Validates and builds the block.
    ///
    /// # Errors
    ///
    /// See [`MultiSeriesBlock::new`].
    pub fn build(self) -> crate::Result<MultiSeriesBlock<C>> {
        MultiSeriesBlock::new(self.meta, self.series, self.consolidation)
    }
}
