//! Price Store - date-indexed Brent price series
//!
//! The series is read from a CSV file with a `Date` column and one or more
//! numeric columns. Rows dated before [`price_cutoff`] are dropped at load
//! time and the remainder is kept sorted by date.

use crate::dates::{format_date, parse_date};
use crate::error::{DataUnavailable, LoadError, Result, StoreKind};
use chrono::NaiveDate;
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};
use std::collections::HashSet;
use std::path::Path;
use tracing::{error, info, warn};

/// Label of the date column in the price CSV
pub const DATE_COLUMN: &str = "Date";

/// First date kept in the in-memory series (inclusive)
pub fn price_cutoff() -> NaiveDate {
    NaiveDate::from_ymd_opt(2010, 1, 1).expect("2010-01-01 is a valid date")
}

/// One dated row of the series
#[derive(Debug, Clone, PartialEq)]
pub struct PriceRecord {
    pub date: NaiveDate,

    /// Numeric fields in column order; `None` for empty cells
    pub values: Vec<Option<f64>>,
}

/// A loaded, sorted price series together with its column labels
#[derive(Debug, Clone, Default)]
pub struct PriceSeries {
    date_label: String,
    value_labels: Vec<String>,
    records: Vec<PriceRecord>,
}

impl PriceSeries {
    /// Parse a series from any CSV reader, keeping dates on or after `cutoff`
    pub fn from_reader<R: std::io::Read>(reader: R, cutoff: NaiveDate) -> Result<Self> {
        let mut reader =
            csv::ReaderBuilder::new().has_headers(true).flexible(true).from_reader(reader);

        let headers = reader.headers()?.clone();
        if headers.is_empty() || headers.iter().all(|h| h.trim().is_empty()) {
            return Err(LoadError::NoColumns);
        }

        let date_idx = headers
            .iter()
            .position(|h| h.trim() == DATE_COLUMN)
            .ok_or_else(|| LoadError::missing_column(DATE_COLUMN))?;

        let value_columns: Vec<(usize, String)> = headers
            .iter()
            .enumerate()
            .filter(|(idx, _)| *idx != date_idx)
            .map(|(idx, label)| (idx, label.trim().to_string()))
            .collect();
        if value_columns.is_empty() {
            return Err(LoadError::missing_column("numeric value"));
        }

        let mut records = Vec::new();
        for (idx, row) in reader.records().enumerate() {
            let row = row?;
            // header is row 1
            let row_number = idx + 2;
            // Short rows are allowed; their missing cells read as empty
            if row.len() > headers.len() {
                return Err(LoadError::ExtraFields {
                    row: row_number,
                    expected: headers.len(),
                    found: row.len(),
                });
            }

            let raw_date = row.get(date_idx).unwrap_or("");
            let date = parse_date(raw_date).ok_or_else(|| LoadError::InvalidDate {
                row: row_number,
                value: raw_date.to_string(),
            })?;
            if date < cutoff {
                continue;
            }

            let values = value_columns
                .iter()
                .map(|(col, label)| parse_value(row.get(*col).unwrap_or(""), row_number, label))
                .collect::<Result<Vec<_>>>()?;

            records.push(PriceRecord { date, values });
        }

        // Stable sort keeps the first occurrence of a duplicated date in front
        records.sort_by_key(|r| r.date);
        let before = records.len();
        let mut seen = HashSet::new();
        records.retain(|r| seen.insert(r.date));
        if records.len() < before {
            warn!("Dropped {} price rows with duplicate dates", before - records.len());
        }

        Ok(Self {
            date_label: headers[date_idx].trim().to_string(),
            value_labels: value_columns.into_iter().map(|(_, label)| label).collect(),
            records,
        })
    }

    /// Parse a series from a CSV file
    pub fn from_path<P: AsRef<Path>>(path: P, cutoff: NaiveDate) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file, cutoff)
    }

    /// Records whose date lies within `[start, end]`; either bound may be open
    pub fn range(&self, start: Option<NaiveDate>, end: Option<NaiveDate>) -> PriceSlice<'_> {
        let lo = start.map_or(0, |s| self.records.partition_point(|r| r.date < s));
        let hi = end.map_or(self.records.len(), |e| self.records.partition_point(|r| r.date <= e));

        PriceSlice { series: self, records: &self.records[lo..hi.max(lo)] }
    }

    pub fn records(&self) -> &[PriceRecord] {
        &self.records
    }

    pub fn value_labels(&self) -> &[String] {
        &self.value_labels
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

fn parse_value(raw: &str, row: usize, column: &str) -> Result<Option<f64>> {
    let value = raw.trim();
    if value.is_empty() {
        return Ok(None);
    }
    value.parse::<f64>().map(Some).map_err(|_| LoadError::InvalidNumber {
        row,
        column: column.to_string(),
        value: value.to_string(),
    })
}

/// A borrowed, date-ordered window into a [`PriceSeries`].
///
/// Serializes as a JSON array of objects keyed by the source column labels.
#[derive(Debug, Clone, Copy)]
pub struct PriceSlice<'a> {
    series: &'a PriceSeries,
    records: &'a [PriceRecord],
}

impl<'a> PriceSlice<'a> {
    pub fn records(&self) -> &'a [PriceRecord] {
        self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl Serialize for PriceSlice<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.records.len()))?;
        for record in self.records {
            seq.serialize_element(&LabeledPrice { series: self.series, record })?;
        }
        seq.end()
    }
}

struct LabeledPrice<'a> {
    series: &'a PriceSeries,
    record: &'a PriceRecord,
}

impl Serialize for LabeledPrice<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.record.values.len() + 1))?;
        map.serialize_entry(&self.series.date_label, &format_date(self.record.date))?;
        for (label, value) in self.series.value_labels.iter().zip(&self.record.values) {
            map.serialize_entry(label, value)?;
        }
        map.end()
    }
}

/// Price Store - holds the series or the reason it failed to load
#[derive(Debug)]
pub struct PriceStore {
    state: Result<PriceSeries>,
}

impl PriceStore {
    /// Load the series from `path` using the default cutoff.
    ///
    /// Never fails: a load error is logged and kept for diagnostics, and
    /// every later [`query`](Self::query) reports [`DataUnavailable`].
    pub fn load<P: AsRef<Path>>(path: P) -> Self {
        Self::load_with_cutoff(path, price_cutoff())
    }

    /// Load the series from `path`, keeping dates on or after `cutoff`
    pub fn load_with_cutoff<P: AsRef<Path>>(path: P, cutoff: NaiveDate) -> Self {
        let path = path.as_ref();
        info!("Loading price data from: {:?}", path);

        let state = PriceSeries::from_path(path, cutoff);
        match &state {
            Ok(series) => info!(
                "Loaded {} price rows on or after {} ({} value columns)",
                series.len(),
                cutoff,
                series.value_labels().len()
            ),
            Err(e) => error!("Error loading price data from {:?}: {}", path, e),
        }

        Self { state }
    }

    /// Build a store from an already parsed series
    pub fn from_series(series: PriceSeries) -> Self {
        Self { state: Ok(series) }
    }

    /// Build a store that failed to load
    pub fn unavailable(reason: LoadError) -> Self {
        Self { state: Err(reason) }
    }

    /// Range-filtered view of the series, inclusive on both supplied bounds
    pub fn query(
        &self,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> std::result::Result<PriceSlice<'_>, DataUnavailable> {
        self.state
            .as_ref()
            .map(|series| series.range(start, end))
            .map_err(|_| DataUnavailable::new(StoreKind::Prices))
    }

    pub fn is_available(&self) -> bool {
        self.state.is_ok()
    }

    /// Why the load failed, if it did
    pub fn failure(&self) -> Option<&LoadError> {
        self.state.as_ref().err()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn write_csv(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    fn dates(slice: PriceSlice<'_>) -> Vec<NaiveDate> {
        slice.records().iter().map(|r| r.date).collect()
    }

    #[test]
    fn test_cutoff_excludes_earlier_rows() {
        let file = write_csv("Date,Price\n2009-12-31,77.9\n2010-01-01,78.1\n");
        let store = PriceStore::load(file.path());

        let all = store.query(None, None).unwrap();
        assert_eq!(dates(all), vec![ymd(2010, 1, 1)]);
    }

    #[test]
    fn test_series_is_sorted_ascending() {
        let file = write_csv(
            "Date,Price,Vol_30d\n2020-01-03,3.0,\n2009-06-01,1.0,0.1\n2020-01-01,1.0,0.2\n2020-01-02,2.0,0.3\n",
        );
        let store = PriceStore::load(file.path());

        let all = store.query(None, None).unwrap();
        assert_eq!(dates(all), vec![ymd(2020, 1, 1), ymd(2020, 1, 2), ymd(2020, 1, 3)]);
        assert_eq!(all.records()[2].values, vec![Some(3.0), None]);
    }

    #[test]
    fn test_inclusive_range_query() {
        let file = write_csv(
            "Date,Price\n2020-01-01,1\n2020-01-02,2\n2020-01-03,3\n2020-01-04,4\n2020-01-05,5\n",
        );
        let store = PriceStore::load(file.path());

        let window = store.query(Some(ymd(2020, 1, 1)), Some(ymd(2020, 1, 3))).unwrap();
        assert_eq!(dates(window), vec![ymd(2020, 1, 1), ymd(2020, 1, 2), ymd(2020, 1, 3)]);

        let open_end = store.query(Some(ymd(2020, 1, 4)), None).unwrap();
        assert_eq!(dates(open_end), vec![ymd(2020, 1, 4), ymd(2020, 1, 5)]);

        let open_start = store.query(None, Some(ymd(2020, 1, 1))).unwrap();
        assert_eq!(dates(open_start), vec![ymd(2020, 1, 1)]);

        let between_rows = store.query(Some(ymd(2020, 1, 2)), Some(ymd(2020, 1, 2))).unwrap();
        assert_eq!(between_rows.len(), 1);
    }

    #[test]
    fn test_range_matching_nothing_is_empty_success() {
        let file = write_csv("Date,Price\n2020-01-01,1\n2020-01-02,2\n");
        let store = PriceStore::load(file.path());

        assert!(store.query(Some(ymd(2021, 1, 1)), None).unwrap().is_empty());
        assert!(store.query(Some(ymd(2020, 1, 2)), Some(ymd(2020, 1, 1))).unwrap().is_empty());
    }

    #[test]
    fn test_missing_file_is_unavailable() {
        let store = PriceStore::load("/nonexistent/brent_cleaned.csv");

        assert!(!store.is_available());
        assert!(matches!(store.failure(), Some(LoadError::Io(_))));
        assert_eq!(store.query(None, None).unwrap_err(), DataUnavailable::new(StoreKind::Prices));
    }

    #[test]
    fn test_load_failures() {
        let no_date = write_csv("Day,Price\n2020-01-01,1\n");
        assert!(matches!(
            PriceStore::load(no_date.path()).failure(),
            Some(LoadError::MissingColumn(_))
        ));

        let bad_date = write_csv("Date,Price\n2020-01-01,1\nyesterday,2\n");
        assert!(matches!(
            PriceStore::load(bad_date.path()).failure(),
            Some(LoadError::InvalidDate { row: 3, .. })
        ));

        let bad_number = write_csv("Date,Price\n2020-01-01,n/a\n");
        assert!(matches!(
            PriceStore::load(bad_number.path()).failure(),
            Some(LoadError::InvalidNumber { .. })
        ));

        let empty = write_csv("");
        assert!(!PriceStore::load(empty.path()).is_available());
    }

    #[test]
    fn test_short_rows_leave_missing_values() {
        let series = PriceSeries::from_reader(
            "Date,Price,Vol_30d\n2020-01-01,1,0.2\n2020-01-02,2\n2020-01-03\n".as_bytes(),
            price_cutoff(),
        )
        .unwrap();

        let values: Vec<_> = series.records().iter().map(|r| r.values.clone()).collect();
        assert_eq!(
            values,
            vec![vec![Some(1.0), Some(0.2)], vec![Some(2.0), None], vec![None, None]]
        );
    }

    #[test]
    fn test_long_rows_fail_load() {
        let result =
            PriceSeries::from_reader("Date,Price\n2020-01-01,1,extra\n".as_bytes(), price_cutoff());

        assert!(matches!(
            result,
            Err(LoadError::ExtraFields { row: 2, expected: 2, found: 3 })
        ));
    }

    #[test]
    fn test_every_window_is_exact() {
        let file = write_csv(
            "Date,Price\n2020-01-01,1\n2020-01-02,2\n2020-01-03,3\n2020-01-04,4\n2020-01-05,5\n",
        );
        let store = PriceStore::load(file.path());
        let all = dates(store.query(None, None).unwrap());

        // one day either side of the series, plus an open bound
        let mut bounds: Vec<Option<NaiveDate>> =
            (0..7).map(|d| Some(ymd(2019, 12, 31) + chrono::Days::new(d))).collect();
        bounds.push(None);

        for start in &bounds {
            for end in &bounds {
                let got = dates(store.query(*start, *end).unwrap());
                let expected: Vec<NaiveDate> = all
                    .iter()
                    .copied()
                    .filter(|d| start.map_or(true, |s| *d >= s) && end.map_or(true, |e| *d <= e))
                    .collect();
                assert_eq!(got, expected, "window {:?}..{:?}", start, end);
            }
        }
    }

    #[test]
    fn test_header_only_file_loads_empty() {
        let file = write_csv("Date,Price\n");
        let store = PriceStore::load(file.path());

        assert!(store.is_available());
        assert!(store.query(None, None).unwrap().is_empty());
    }

    #[test]
    fn test_duplicate_dates_keep_first() {
        let series = PriceSeries::from_reader(
            "Date,Price\n2020-01-01,1\n2020-01-01,9\n".as_bytes(),
            price_cutoff(),
        )
        .unwrap();

        assert_eq!(series.len(), 1);
        assert_eq!(series.records()[0].values, vec![Some(1.0)]);
    }

    #[test]
    fn test_slice_serializes_with_source_labels() {
        let series = PriceSeries::from_reader(
            "Date,Price,Vol_30d\n2014-11-05,82.8,\n".as_bytes(),
            price_cutoff(),
        )
        .unwrap();

        let json = serde_json::to_value(series.range(None, None)).unwrap();
        assert_eq!(
            json,
            serde_json::json!([{ "Date": "2014-11-05", "Price": 82.8, "Vol_30d": null }])
        );
    }
}
