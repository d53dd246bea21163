use crate::{
    block::SeriesMeta,
    consolidation::Consolidation,
    namespace::{NamespaceBlock, NamespaceBlockIter},
    Bounds, GridIterator, Value,
};

/// One logical series, available in one or more namespaces.
#[derive(Clone, Debug)]
pub struct ConsolidatedSeries {
    meta: SeriesMeta,
    bounds: Bounds,
    namespaces: Vec<NamespaceBlock>,
}

impl ConsolidatedSeries {
    /// Creates a series without any namespace blocks.
    #[must_use]
    pub fn new(meta: SeriesMeta, bounds: Bounds) -> Self {
        Self {
            meta,
            bounds,
            namespaces: Vec::new(),
        }
    }

    /// Appends a namespace block.
    ///
    /// Namespace order is the order values are handed to the consolidation.
    #[must_use]
    pub fn with_namespace(mut self, namespace: NamespaceBlock) -> Self {
        self.namespaces.push(namespace);
        self
    }

    /// Series metadata.
    #[must_use]
    pub fn meta(&self) -> &SeriesMeta {
        &self.meta
    }

    /// Bounds of the series.
    #[must_use]
    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    /// Namespace blocks, in consolidation order.
    #[must_use]
    pub fn namespaces(&self) -> &[NamespaceBlock] {
        &self.namespaces
    }

    /// Checks that every namespace block covers the series' time range.
    pub(crate) fn validate(&self) -> crate::Result<()> {
        for ns in &self.namespaces {
            if !ns.bounds().same_range(&self.bounds) {
                return Err(crate::Error::BoundsMismatch {
                    series: self.meta.series_key(),
                    namespace: Some(ns.namespace().to_string()),
                    expected: self.bounds,
                    actual: ns.bounds(),
                });
            }
        }
        Ok(())
    }

    /// Opens all namespaces and returns an iterator over the series' grid.
    pub(crate) fn iter<C: Consolidation>(
        &self,
        consolidation: C,
    ) -> crate::Result<ConsolidatedSeriesIter<C>> {
        let namespaces = self
            .namespaces
            .iter()
            .map(|ns| ns.iter(self.bounds))
            .collect::<crate::Result<Vec<_>>>()?;

        Ok(ConsolidatedSeriesIter::new(namespaces, consolidation))
    }
}

/// Advances all namespace iterators of a series in lock-step
/// and consolidates their values.
///
/// The iterator is exhausted as soon as any namespace is exhausted.
pub struct ConsolidatedSeriesIter<C: Consolidation> {
    namespaces: Vec<NamespaceBlockIter>,
    consolidation: C,

    /// Namespace values of the current step, refilled on every `advance`
    values: Vec<Value>,

    is_exhausted: bool,
}

impl<C: Consolidation> ConsolidatedSeriesIter<C> {
    /// Creates an iterator over already opened namespace iterators.
    #[must_use]
    pub fn new(namespaces: Vec<NamespaceBlockIter>, consolidation: C) -> Self {
        Self {
            values: vec![Value::NAN; namespaces.len()],
            namespaces,
            consolidation,
            is_exhausted: false,
        }
    }

    /// Number of namespaces.
    #[must_use]
    pub fn namespace_count(&self) -> usize {
        self.namespaces.len()
    }

    /// Consolidated value at the current step.
    #[must_use]
    pub fn value(&self) -> Value {
        self.consolidation.consolidate(&self.values)
    }
}

impl<C: Consolidation> GridIterator for ConsolidatedSeriesIter<C> {
    type Item = Value;

    fn advance(&mut self) -> crate::Result<bool> {
        if self.is_exhausted || self.namespaces.is_empty() {
            self.is_exhausted = true;
            return Ok(false);
        }

        for (idx, ns) in self.namespaces.iter_mut().enumerate() {
            if !ns.advance()? {
                log::trace!("namespace #{idx} exhausted, series is exhausted");
                self.is_exhausted = true;
                return Ok(false);
            }
        }

        self.values.clear();
        self.values.extend(self.namespaces.iter().map(NamespaceBlockIter::value));

        Ok(true)
    }

    fn current(&self) -> Value {
        self.value()
    }

    fn release(&mut self) {
        for ns in &mut self.namespaces {
            ns.release();
        }
        self.namespaces.clear();
        self.values.clear();
        self.is_exhausted = true;
    }
}

impl<C: Consolidation> Iterator for ConsolidatedSeriesIter<C> {
    type Item = crate::Result<Value>;

    fn next(&mut self) -> Option<Self::Item> {
        let advanced = self.advance();

        if let Err(e) = &advanced {
            log::debug!("series iteration failed: {e}");
            self.is_exhausted = true;
        }

        if fail_iter!(advanced) {
            Some(Ok(self.value()))
        } else {
            None
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::{Datapoint, Error, First, FirstPresent, IterCursor, MemorySeries, Max, Timestamp};

    fn namespace(
        name: &str,
        bounds: Bounds,
        points: &[(Timestamp, Value)],
    ) -> crate::Result<NamespaceBlock> {
        let raw = MemorySeries::new(
            points
                .iter()
                .map(|&(ts, value)| Datapoint::new(ts, value))
                .collect(),
        )?;
        Ok(NamespaceBlock::new(name, bounds).with_source(raw))
    }

    fn meta() -> SeriesMeta {
        SeriesMeta::new("cpu.total", crate::tagset!("host" => "h-1"))
    }

    #[test_log::test]
    fn series_first_value_wins() -> crate::Result<()> {
        let bounds = Bounds::new(0, 20, 10)?;
        let series = ConsolidatedSeries::new(meta(), bounds)
            .with_namespace(namespace("fine", bounds, &[(12, 1.0)])?)
            .with_namespace(namespace("coarse", bounds, &[(3, 3.0), (15, 4.0)])?);

        let values = series.iter(First)?.collect::<crate::Result<Vec<_>>>()?;

        assert_eq!(2, values.len());
        assert!(values[0].is_nan());
        assert_eq!(1.0, values[1]);

        Ok(())
    }

    #[test_log::test]
    fn series_pluggable_consolidation() -> crate::Result<()> {
        let bounds = Bounds::new(0, 20, 10)?;
        let series = ConsolidatedSeries::new(meta(), bounds)
            .with_namespace(namespace("fine", bounds, &[(12, 1.0)])?)
            .with_namespace(namespace("coarse", bounds, &[(3, 3.0), (15, 4.0)])?);

        let values = series
            .iter(FirstPresent)?
            .collect::<crate::Result<Vec<_>>>()?;
        assert_eq!(vec![3.0, 1.0], values);

        let values = series.iter(Max)?.collect::<crate::Result<Vec<_>>>()?;
        assert_eq!(vec![3.0, 4.0], values);

        Ok(())
    }

    #[test_log::test]
    fn series_coarse_namespace_on_fine_grid() -> crate::Result<()> {
        let bounds = Bounds::new(0, 40, 10)?;
        let coarse = bounds.with_step_size(20)?;

        let series = ConsolidatedSeries::new(meta(), bounds)
            .with_namespace(namespace("coarse", coarse, &[(0, 1.0), (20, 2.0)])?);

        let values = series.iter(First)?.collect::<crate::Result<Vec<_>>>()?;

        assert_eq!(4, values.len());
        assert_eq!(1.0, values[0]);
        assert!(values[1].is_nan());
        assert_eq!(2.0, values[2]);
        assert!(values[3].is_nan());

        Ok(())
    }

    #[test_log::test]
    fn series_without_namespaces_is_terminal() -> crate::Result<()> {
        let bounds = Bounds::new(0, 40, 10)?;
        let mut iter = ConsolidatedSeries::new(meta(), bounds).iter(First)?;

        assert!(!iter.advance()?);
        assert!(iter.next().is_none());

        Ok(())
    }

    #[test_log::test]
    fn series_length_is_minimum_of_namespaces() -> crate::Result<()> {
        let long = Bounds::new(0, 50, 10)?;
        let short = Bounds::new(0, 30, 10)?;

        let namespaces = vec![
            NamespaceBlockIter::new(long, vec![]),
            NamespaceBlockIter::new(short, vec![]),
        ];
        let iter = ConsolidatedSeriesIter::new(namespaces, First);

        assert_eq!(3, iter.count());

        Ok(())
    }

    #[test_log::test]
    fn series_validate_rejects_other_range() -> crate::Result<()> {
        let bounds = Bounds::new(0, 40, 10)?;
        let series = ConsolidatedSeries::new(meta(), bounds)
            .with_namespace(namespace("ok", bounds.with_step_size(20)?, &[])?)
            .with_namespace(namespace("bad", Bounds::new(0, 30, 10)?, &[])?);

        match series.validate() {
            Err(crate::Error::BoundsMismatch { namespace, .. }) => {
                assert_eq!(Some("bad".to_string()), namespace);
            }
            other => panic!("unexpected result: {other:?}"),
        }

        Ok(())
    }

    #[test_log::test]
    fn series_release_is_idempotent() -> crate::Result<()> {
        let bounds = Bounds::new(0, 40, 10)?;
        let series = ConsolidatedSeries::new(meta(), bounds)
            .with_namespace(namespace("fine", bounds, &[(1, 1.0)])?);

        let mut iter = series.iter(First)?;
        assert!(iter.advance()?);

        iter.release();
        iter.release();

        assert!(!iter.advance()?);
        assert_eq!(0, iter.namespace_count());

        Ok(())
    }

    #[test_log::test]
    fn series_iter_stops_after_cursor_error() -> crate::Result<()> {
        let bounds = Bounds::new(0, 40, 10)?;
        let failing = IterCursor::new(
            vec![Ok(Datapoint::new(2, 1.0)), Err(Error::Decode("value"))].into_iter(),
        );

        let mut iter = ConsolidatedSeriesIter::new(
            vec![
                NamespaceBlockIter::new(bounds, vec![Box::new(failing)]),
                NamespaceBlockIter::new(bounds, vec![]),
            ],
            FirstPresent,
        );

        assert_eq!(1.0, iter.next().unwrap()?);
        assert!(matches!(iter.next(), Some(Err(Error::Decode("value")))));
        assert!(iter.next().is_none());
        assert!(iter.next().is_none());

        Ok(())
    }

    #[test_log::test]
    fn series_value_follows_current_step() -> crate::Result<()> {
        let bounds = Bounds::new(0, 30, 10)?;
        let series = ConsolidatedSeries::new(meta(), bounds)
            .with_namespace(namespace("fine", bounds, &[(12, 1.0)])?)
            .with_namespace(namespace("coarse", bounds, &[(3, 3.0), (25, 4.0)])?);

        let mut iter = series.iter(FirstPresent)?;
        assert!(iter.value().is_nan());

        let mut values = vec![];
        while iter.advance()? {
            assert_eq!(iter.value().to_bits(), iter.current().to_bits());
            values.push(iter.value());
        }
        assert_eq!(vec![3.0, 1.0, 4.0], values);

        iter.release();
        assert!(iter.value().is_nan());

        Ok(())
    }
}
