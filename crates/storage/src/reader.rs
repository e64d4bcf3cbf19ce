use crate::error::StatsError;
use crate::percentile::CountingArray;
use csv::StringRecord;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;

const MILLIS_PER_SEC: i64 = 1_000;

#[derive(Debug, Clone, Copy)]
struct Column {
    index: usize,
    name: &'static str,
}

const REQUEST_TYPE: Column = Column {
    index: 0,
    name: "RequestType",
};
const PATH: Column = Column {
    index: 1,
    name: "Path",
};
const START_TIMESTAMP: Column = Column {
    index: 2,
    name: "StartTimestamp(ms)",
};
const LATENCY: Column = Column {
    index: 3,
    name: "Latency(ms)",
};

/// One raw row. Fields are parsed on demand so that a computation only
/// fails on the columns it actually reads.
struct Row<'a> {
    path: &'a Path,
    record: &'a StringRecord,
}

impl Row<'_> {
    fn line(&self) -> u64 {
        self.record.position().map(|pos| pos.line()).unwrap_or(0)
    }

    fn field(&self, column: Column) -> Result<&str, StatsError> {
        self.record
            .get(column.index)
            .ok_or_else(|| self.malformed(column, ""))
    }

    fn parse<T: FromStr>(&self, column: Column) -> Result<T, StatsError> {
        let raw = self.field(column)?;
        raw.trim().parse().map_err(|_| self.malformed(column, raw))
    }

    fn malformed(&self, column: Column, value: &str) -> StatsError {
        StatsError::MalformedField {
            path: self.path.to_path_buf(),
            line: self.line(),
            column: column.name,
            value: value.to_string(),
        }
    }

    /// `"<METHOD> <path>"`, the grouping key of every latency statistic.
    fn endpoint_key(&self) -> Result<String, StatsError> {
        Ok(format!(
            "{} {}",
            self.field(REQUEST_TYPE)?,
            self.field(PATH)?
        ))
    }

    fn latency_ms(&self) -> Result<u64, StatsError> {
        self.parse(LATENCY)
    }

    fn start_time_ms(&self) -> Result<i64, StatsError> {
        self.parse(START_TIMESTAMP)
    }
}

/// Re-reads a finished request record file. Every computation is its own
/// pass over the file so independent ones can run on separate threads.
#[derive(Debug, Clone)]
pub struct CsvStatsReader {
    path: PathBuf,
}

impl CsvStatsReader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn for_each_row<F>(&self, mut visit: F) -> Result<(), StatsError>
    where
        F: FnMut(&Row<'_>) -> Result<(), StatsError>,
    {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_path(&self.path)
            .map_err(|err| StatsError::csv(&self.path, err))?;
        let mut record = StringRecord::new();
        while reader
            .read_record(&mut record)
            .map_err(|err| StatsError::csv(&self.path, err))?
        {
            visit(&Row {
                path: &self.path,
                record: &record,
            })?;
        }
        Ok(())
    }

    /// Mean latency per endpoint key.
    pub fn mean_latencies(&self) -> Result<BTreeMap<String, f64>, StatsError> {
        let mut sums: BTreeMap<String, (u64, u64)> = BTreeMap::new();
        self.for_each_row(|row| {
            let latency = row.latency_ms()?;
            let entry = sums.entry(row.endpoint_key()?).or_insert((0, 0));
            entry.0 += latency;
            entry.1 += 1;
            Ok(())
        })?;

        Ok(sums
            .into_iter()
            .filter(|(_, (_, count))| *count > 0)
            .map(|(key, (sum, count))| (key, sum as f64 / count as f64))
            .collect())
    }

    /// Largest latency per endpoint key.
    pub fn max_latencies(&self) -> Result<BTreeMap<String, u64>, StatsError> {
        let mut max_by_key: BTreeMap<String, u64> = BTreeMap::new();
        self.for_each_row(|row| {
            let latency = row.latency_ms()?;
            let max = max_by_key.entry(row.endpoint_key()?).or_insert(0);
            *max = (*max).max(latency);
            Ok(())
        })?;
        Ok(max_by_key)
    }

    /// One counting array per key, sized from `max_by_key`.
    pub fn counting_arrays(
        &self,
        max_by_key: &BTreeMap<String, u64>,
    ) -> Result<BTreeMap<String, CountingArray>, StatsError> {
        let mut arrays: BTreeMap<String, CountingArray> = max_by_key
            .iter()
            .map(|(key, max)| (key.clone(), CountingArray::with_max(*max)))
            .collect();

        self.for_each_row(|row| {
            let latency = row.latency_ms()?;
            let key = row.endpoint_key()?;
            let array = arrays
                .get_mut(&key)
                .ok_or_else(|| StatsError::MissingMaxLatency { key: key.clone() })?;
            if !array.record(latency) {
                return Err(StatsError::LatencyAboveMax {
                    latency,
                    max: array.max_latency(),
                    key,
                });
            }
            Ok(())
        })?;
        Ok(arrays)
    }

    pub fn median_latencies(
        &self,
        max_by_key: &BTreeMap<String, u64>,
    ) -> Result<BTreeMap<String, u64>, StatsError> {
        Ok(self
            .counting_arrays(max_by_key)?
            .into_iter()
            .filter_map(|(key, array)| array.median().map(|median| (key, median)))
            .collect())
    }

    pub fn p99_latencies(
        &self,
        max_by_key: &BTreeMap<String, u64>,
    ) -> Result<BTreeMap<String, u64>, StatsError> {
        Ok(self
            .counting_arrays(max_by_key)?
            .into_iter()
            .filter_map(|(key, array)| array.p99().map(|p99| (key, p99)))
            .collect())
    }

    /// Requests started in each second of `[wall_start_ms, wall_stop_ms)`.
    ///
    /// Every start time must fall inside that half-open window, so the wall
    /// timer has to stop strictly after the last request started. A start
    /// time outside it is reported rather than clamped.
    pub fn requests_started_per_second(
        &self,
        wall_start_ms: i64,
        wall_stop_ms: i64,
    ) -> Result<Vec<u64>, StatsError> {
        let span_ms = (wall_stop_ms - wall_start_ms).max(0);
        let buckets = ((span_ms + MILLIS_PER_SEC - 1) / MILLIS_PER_SEC) as usize;
        let mut histogram = vec![0u64; buckets];

        self.for_each_row(|row| {
            let start_time_ms = row.start_time_ms()?;
            let offset = start_time_ms - wall_start_ms;
            let index = offset.div_euclid(MILLIS_PER_SEC);
            match usize::try_from(index)
                .ok()
                .and_then(|index| histogram.get_mut(index))
            {
                Some(bucket) => {
                    *bucket += 1;
                    Ok(())
                }
                None => Err(StatsError::BucketOutOfRange {
                    start_time_ms,
                    wall_start_ms,
                    buckets,
                }),
            }
        })?;
        Ok(histogram)
    }
}
