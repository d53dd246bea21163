use crate::{
    block::SeriesMeta,
    cursor::{CursorSource, Datapoint, IterCursor, RawCursor},
    namespace::NamespaceBlock,
    Bounds, Timestamp,
};
use byteorder::{BigEndian, ReadBytesExt};
use fjall::{CompressionType, Keyspace, PartitionCreateOptions, PartitionHandle};
use self_cell::self_cell;
use std::path::Path;

const PARTITION_PREFIX: &str = "_stepblock#v1#ns#";

const TS_LEN: usize = std::mem::size_of::<Timestamp>();

/// Builder for [`Store`].
pub struct StoreBuilder {
    cache_size_mib: u64,
    max_memtable_size_mib: u32,
}

impl StoreBuilder {
    pub(crate) fn new() -> Self {
        Self {
            cache_size_mib: 64,
            max_memtable_size_mib: 16,
        }
    }

    /// Sets the cache size in MiB.
    ///
    /// Default = 64 MiB
    #[must_use]
    pub fn cache_size_mib(mut self, mib: u64) -> Self {
        self.cache_size_mib = mib;
        self
    }

    /// Sets the memtable size of each namespace in MiB.
    ///
    /// Default = 16 MiB
    #[must_use]
    pub fn max_memtable_size_mib(mut self, mib: u32) -> Self {
        self.max_memtable_size_mib = mib;
        self
    }

    /// Opens or recovers a raw series store.
    ///
    /// # Errors
    ///
    /// Returns error if an I/O error occurred.
    pub fn open<P: AsRef<Path>>(self, path: P) -> crate::Result<Store> {
        let keyspace = fjall::Config::new(path)
            .cache_size(self.cache_size_mib * 1_024 * 1_024)
            .open()?;

        Ok(Store {
            keyspace,
            max_memtable_size: self.max_memtable_size_mib.saturating_mul(1_024 * 1_024),
        })
    }
}

/// Embedded store of raw datapoints, one partition per namespace.
///
/// Supplies the raw cursors a [`crate::MultiSeriesBlock`] is built from.
pub struct Store {
    keyspace: Keyspace,
    max_memtable_size: u32,
}

impl Store {
    /// Creates a builder to configure a store.
    #[must_use]
    pub fn builder() -> StoreBuilder {
        StoreBuilder::new()
    }

    /// Opens a store with the default configuration.
    ///
    /// # Errors
    ///
    /// Returns error if an I/O error occurred.
    pub fn open<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        Self::builder().open(path)
    }

    fn partition(&self, namespace: &str) -> crate::Result<PartitionHandle> {
        let is_valid = !namespace.is_empty()
            && namespace.len() <= 200
            && namespace
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.');

        if !is_valid {
            return Err(crate::Error::InvalidNamespace(namespace.to_string()));
        }

        let opts = PartitionCreateOptions::default()
            .block_size(4_096)
            .compression(CompressionType::Lz4)
            .max_memtable_size(self.max_memtable_size);

        Ok(self
            .keyspace
            .open_partition(&format!("{PARTITION_PREFIX}{namespace}"), opts)?)
    }

    fn series_prefix(series: &SeriesMeta) -> Vec<u8> {
        let key = series.series_key();

        let mut prefix = Vec::with_capacity(key.len() + 1 + TS_LEN);
        prefix.extend_from_slice(key.as_bytes());
        prefix.push(0);
        prefix
    }

    fn datapoint_key(prefix: &[u8], ts: Timestamp) -> Vec<u8> {
        let mut key = Vec::with_capacity(prefix.len() + TS_LEN);
        key.extend_from_slice(prefix);
        key.extend_from_slice(&ts.to_be_bytes());
        key
    }

    /// Writes a datapoint of a series into a namespace.
    ///
    /// A second write with the same timestamp replaces the first.
    ///
    /// # Errors
    ///
    /// Returns error if the namespace name is invalid, or if an I/O error occurred.
    pub fn write(&self, namespace: &str, series: &SeriesMeta, dp: Datapoint) -> crate::Result<()> {
        let partition = self.partition(namespace)?;
        let key = Self::datapoint_key(&Self::series_prefix(series), dp.ts);

        log::trace!("writing {series} @ {} = {} into {namespace:?}", dp.ts, dp.value);

        partition.insert(key, dp.value.to_be_bytes())?;

        Ok(())
    }

    /// Returns a source over the datapoints of a series in `[bounds.start, bounds.end)`.
    ///
    /// # Errors
    ///
    /// Returns error if the namespace name is invalid, or if an I/O error occurred.
    pub fn source(
        &self,
        namespace: &str,
        series: &SeriesMeta,
        bounds: &Bounds,
    ) -> crate::Result<StoredSeries> {
        let partition = self.partition(namespace)?;
        let prefix = Self::series_prefix(series);

        Ok(StoredSeries {
            partition,
            lo: Self::datapoint_key(&prefix, bounds.start()),
            hi: Self::datapoint_key(&prefix, bounds.end()),
        })
    }

    /// Returns the namespace block of a series, backed by this store.
    ///
    /// `bounds` carries the native step size of the namespace.
    ///
    /// # Errors
    ///
    /// Returns error if the namespace name is invalid, or if an I/O error occurred.
    pub fn namespace_block(
        &self,
        namespace: &str,
        series: &SeriesMeta,
        bounds: Bounds,
    ) -> crate::Result<NamespaceBlock> {
        let source = self.source(namespace, series, &bounds)?;

        log::debug!("opened {series} in namespace {namespace:?} over {bounds}");

        Ok(NamespaceBlock::new(namespace, bounds).with_source(source))
    }
}

fn decode(key: &[u8], value: &[u8]) -> crate::Result<Datapoint> {
    let mut ts_bytes = key
        .len()
        .checked_sub(TS_LEN)
        .and_then(|pos| key.get(pos..))
        .ok_or(crate::Error::Decode("key too short"))?;

    let ts = ts_bytes
        .read_u128::<BigEndian>()
        .map_err(|_| crate::Error::Decode("timestamp"))?;

    let mut value_bytes = value;
    let value = value_bytes
        .read_f64::<BigEndian>()
        .map_err(|_| crate::Error::Decode("value"))?;

    Ok(Datapoint::new(ts, value))
}

type BoxedRange<'a> = Box<dyn Iterator<Item = crate::Result<Datapoint>> + 'a>;

self_cell!(
    struct RangeReader {
        owner: PartitionHandle,

        #[covariant]
        dependent: BoxedRange,
    }
);

impl Iterator for RangeReader {
    type Item = crate::Result<Datapoint>;

    fn next(&mut self) -> Option<Self::Item> {
        self.with_dependent_mut(|_, iter| iter.next())
    }
}

/// Datapoints of one series in one namespace, read from a [`Store`].
#[derive(Clone)]
pub struct StoredSeries {
    partition: PartitionHandle,
    lo: Vec<u8>,
    hi: Vec<u8>,
}

impl CursorSource for StoredSeries {
    fn open(&self) -> crate::Result<Box<dyn RawCursor>> {
        let (lo, hi) = (self.lo.clone(), self.hi.clone());

        let reader = RangeReader::new(self.partition.clone(), |partition| {
            Box::new(
                partition
                    .range(lo..hi)
                    .map(|kv| -> crate::Result<Datapoint> {
                        let (key, value) = kv?;
                        decode(&key, &value)
                    }),
            )
        });

        Ok(Box::new(IterCursor::new(reader)))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::{tagset, ConsolidatedSeries, Error, FirstPresent, MultiSeriesBlock, Value};

    fn host(host: &str) -> SeriesMeta {
        SeriesMeta::new("cpu.total", tagset!("env" => "prod", "host" => host))
    }

    fn drain(source: &StoredSeries) -> crate::Result<Vec<Datapoint>> {
        let mut cursor = source.open()?;
        let mut points = vec![];
        while cursor.advance()? {
            points.push(cursor.current().unwrap());
        }
        Ok(points)
    }

    #[test_log::test]
    fn store_reads_in_time_order() -> crate::Result<()> {
        let path = tempfile::tempdir()?;
        let store = Store::open(&path)?;
        let series = host("h-1");

        for ts in [30, 10, 20] {
            store.write("raw", &series, Datapoint::new(ts, ts as Value))?;
        }

        let points = drain(&store.source("raw", &series, &Bounds::new(0, 100, 10)?)?)?;

        assert_eq!(
            vec![
                Datapoint::new(10, 10.0),
                Datapoint::new(20, 20.0),
                Datapoint::new(30, 30.0),
            ],
            points
        );

        Ok(())
    }

    #[test_log::test]
    fn store_source_respects_bounds_and_series() -> crate::Result<()> {
        let path = tempfile::tempdir()?;
        let store = Store::open(&path)?;

        for ts in [5, 10, 25, 40] {
            store.write("raw", &host("h-1"), Datapoint::new(ts, 1.0))?;
            store.write("raw", &host("h-10"), Datapoint::new(ts, 2.0))?;
        }
        store.write("agg", &host("h-1"), Datapoint::new(20, 3.0))?;

        let points = drain(&store.source("raw", &host("h-1"), &Bounds::new(10, 40, 10)?)?)?;
        assert_eq!(
            vec![Datapoint::new(10, 1.0), Datapoint::new(25, 1.0)],
            points
        );

        let points = drain(&store.source("agg", &host("h-1"), &Bounds::new(0, 40, 10)?)?)?;
        assert_eq!(vec![Datapoint::new(20, 3.0)], points);

        let points = drain(&store.source("agg", &host("h-2"), &Bounds::new(0, 40, 10)?)?)?;
        assert!(points.is_empty());

        Ok(())
    }

    #[test_log::test]
    fn store_rejects_invalid_namespace() -> crate::Result<()> {
        let path = tempfile::tempdir()?;
        let store = Store::open(&path)?;

        assert!(matches!(
            store.write("", &host("h-1"), Datapoint::new(0, 0.0)),
            Err(Error::InvalidNamespace(_))
        ));
        assert!(matches!(
            store.write("a b", &host("h-1"), Datapoint::new(0, 0.0)),
            Err(Error::InvalidNamespace(_))
        ));

        Ok(())
    }

    #[test_log::test]
    fn store_backed_block() -> crate::Result<()> {
        let path = tempfile::tempdir()?;
        let store = Store::builder().cache_size_mib(8).open(&path)?;

        let bounds = Bounds::new(0, 40, 10)?;
        let coarse = bounds.with_step_size(20)?;

        let series = host("h-1");
        store.write("raw_10", &series, Datapoint::new(12, 1.0))?;
        store.write("agg_20", &series, Datapoint::new(0, 5.0))?;
        store.write("agg_20", &series, Datapoint::new(20, 6.0))?;

        let block = MultiSeriesBlock::builder(bounds)
            .consolidation(FirstPresent)
            .series(
                ConsolidatedSeries::new(series.clone(), bounds)
                    .with_namespace(store.namespace_block("raw_10", &series, bounds)?)
                    .with_namespace(store.namespace_block("agg_20", &series, coarse)?),
            )
            .build()?;

        let values = block
            .step_iter()?
            .map(|row| row.map(|row| row.values[0]))
            .collect::<crate::Result<Vec<_>>>()?;

        assert_eq!(4, values.len());
        assert_eq!(5.0, values[0]);
        assert_eq!(1.0, values[1]);
        assert_eq!(6.0, values[2]);
        assert!(values[3].is_nan());

        Ok(())
    }

    #[test_log::test]
    fn decode_rejects_short_input() {
        assert!(matches!(decode(&[1, 2], &[0; 8]), Err(Error::Decode(_))));
        assert!(matches!(decode(&[0; 17], &[0; 3]), Err(Error::Decode("value"))));
    }
}
