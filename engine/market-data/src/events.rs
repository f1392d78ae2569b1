//! Event Store - annotated market events
//!
//! The events file has four positional columns. Its header is trusted only
//! when the first label reads `Event_Date`; otherwise all four labels are
//! replaced with [`CANONICAL_EVENT_COLUMNS`] and the column order is assumed
//! to be correct. Rows whose date does not parse are dropped.

use crate::dates::{format_date, parse_date};
use crate::error::{DataUnavailable, LoadError, Result, StoreKind};
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};
use std::path::Path;
use tracing::{debug, error, info, warn};

/// Number of positional columns in the events file
pub const EVENT_COLUMN_COUNT: usize = 4;

/// Expected labels, in positional order
pub const CANONICAL_EVENT_COLUMNS: [&str; EVENT_COLUMN_COUNT] =
    ["Event_Date", "Event_Name", "Description", "Expected_Impact"];

/// One event row. `event_date` is always `YYYY-MM-DD`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventRecord {
    pub event_date: String,
    pub event_name: String,
    pub description: String,
    pub expected_impact: String,
}

/// The normalized event table
#[derive(Debug, Clone)]
pub struct EventTable {
    labels: [String; EVENT_COLUMN_COUNT],
    records: Vec<EventRecord>,
    relabeled: bool,
    dropped: usize,
}

impl EventTable {
    /// Parse and normalize an event table from any CSV reader
    pub fn from_reader<R: std::io::Read>(reader: R) -> Result<Self> {
        let mut reader =
            csv::ReaderBuilder::new().has_headers(false).flexible(true).from_reader(reader);
        let mut rows = reader.records();

        let header = match rows.next() {
            Some(row) => row?,
            None => return Err(LoadError::NoColumns),
        };
        if header.len() < EVENT_COLUMN_COUNT {
            return Err(LoadError::ColumnCount {
                expected: EVENT_COLUMN_COUNT,
                found: header.len(),
            });
        }

        let first_label = header.get(0).unwrap_or("").trim();
        let relabeled = first_label != CANONICAL_EVENT_COLUMNS[0];
        // A first cell that is itself a date means there was no header row
        let headerless = relabeled && parse_date(first_label).is_some();

        let labels = if relabeled {
            CANONICAL_EVENT_COLUMNS.map(str::to_string)
        } else {
            std::array::from_fn(|i| header.get(i).unwrap_or("").to_string())
        };

        let mut source_rows = Vec::new();
        if headerless {
            source_rows.push(header);
        }
        for row in rows {
            source_rows.push(row?);
        }

        let total = source_rows.len();
        let records: Vec<EventRecord> = source_rows.iter().filter_map(normalize_row).collect();
        let dropped = total - records.len();

        Ok(Self { labels, records, relabeled, dropped })
    }

    /// Parse and normalize an event table from a CSV file
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    pub fn records(&self) -> &[EventRecord] {
        &self.records
    }

    /// Column labels used when serializing rows
    pub fn labels(&self) -> &[String; EVENT_COLUMN_COUNT] {
        &self.labels
    }

    /// Whether the source header was replaced with the canonical labels
    pub fn was_relabeled(&self) -> bool {
        self.relabeled
    }

    /// Number of source rows discarded for an unparseable date
    pub fn dropped_rows(&self) -> usize {
        self.dropped
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

fn normalize_row(row: &csv::StringRecord) -> Option<EventRecord> {
    let cell = |i: usize| row.get(i).unwrap_or("").to_string();
    let date = parse_date(row.get(0).unwrap_or(""))?;

    Some(EventRecord {
        event_date: format_date(date),
        event_name: cell(1),
        description: cell(2),
        expected_impact: cell(3),
    })
}

/// Serializes as a JSON array of objects keyed by the table labels
impl Serialize for EventTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.records.len()))?;
        for record in &self.records {
            seq.serialize_element(&LabeledEvent { labels: &self.labels, record })?;
        }
        seq.end()
    }
}

struct LabeledEvent<'a> {
    labels: &'a [String; EVENT_COLUMN_COUNT],
    record: &'a EventRecord,
}

impl Serialize for LabeledEvent<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let [date, name, description, impact] = self.labels;
        let mut map = serializer.serialize_map(Some(EVENT_COLUMN_COUNT))?;
        map.serialize_entry(date, &self.record.event_date)?;
        map.serialize_entry(name, &self.record.event_name)?;
        map.serialize_entry(description, &self.record.description)?;
        map.serialize_entry(impact, &self.record.expected_impact)?;
        map.end()
    }
}

/// Event Store - holds the table or the reason it failed to load
#[derive(Debug)]
pub struct EventStore {
    state: Result<EventTable>,
}

impl EventStore {
    /// Load and normalize the events file. Never fails; see [`get_all`](Self::get_all).
    pub fn load<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        info!("Loading events from: {:?}", path);

        let state = EventTable::from_path(path);
        match &state {
            Ok(table) => {
                if table.was_relabeled() {
                    debug!("Event header did not match, applied canonical column labels");
                }
                if table.dropped_rows() > 0 {
                    warn!("Dropped {} event rows with unparseable dates", table.dropped_rows());
                }
                info!("Loaded {} events", table.len());
            }
            Err(e) => error!("Error loading events from {:?}: {}", path, e),
        }

        Self { state }
    }

    /// Build a store from an already parsed table
    pub fn from_table(table: EventTable) -> Self {
        Self { state: Ok(table) }
    }

    /// Build a store that failed to load
    pub fn unavailable(reason: LoadError) -> Self {
        Self { state: Err(reason) }
    }

    /// The full table in load order
    pub fn get_all(&self) -> std::result::Result<&EventTable, DataUnavailable> {
        self.state.as_ref().map_err(|_| DataUnavailable::new(StoreKind::Events))
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

    fn parse(content: &str) -> EventTable {
        EventTable::from_reader(content.as_bytes()).unwrap()
    }

    #[test]
    fn test_canonical_header_is_kept() {
        let table = parse(
            "Event_Date,Event_Name,Description,Expected_Impact\n\
             2014-11-27,OPEC meeting,Production unchanged,Negative\n",
        );

        assert!(!table.was_relabeled());
        assert_eq!(table.len(), 1);
        assert_eq!(
            table.records()[0],
            EventRecord {
                event_date: "2014-11-27".to_string(),
                event_name: "OPEC meeting".to_string(),
                description: "Production unchanged".to_string(),
                expected_impact: "Negative".to_string(),
            }
        );
    }

    #[test]
    fn test_matching_first_label_keeps_other_labels() {
        let table = parse(" Event_Date ,Name,Details,Impact\n2020-03-09,Price war,Saudi-Russia,Negative\n");

        assert!(!table.was_relabeled());
        assert_eq!(table.labels()[1], "Name");

        let json = serde_json::to_value(&table).unwrap();
        assert_eq!(json[0]["Name"], "Price war");
        assert_eq!(json[0]["Impact"], "Negative");
    }

    #[test]
    fn test_mislabeled_header_is_replaced() {
        let table = parse("date,name,desc,impact\n2020-03-09,Price war,Saudi-Russia,Negative\n");

        assert!(table.was_relabeled());
        assert_eq!(table.labels().clone(), CANONICAL_EVENT_COLUMNS.map(str::to_string));
        assert_eq!(table.len(), 1);

        let json = serde_json::to_value(&table).unwrap();
        assert_eq!(
            json,
            serde_json::json!([{
                "Event_Date": "2020-03-09",
                "Event_Name": "Price war",
                "Description": "Saudi-Russia",
                "Expected_Impact": "Negative"
            }])
        );
    }

    #[test]
    fn test_headerless_file_keeps_first_row() {
        let table = parse("2008-07-11,Record high,Brent peaks,Positive\n2020-04-20,WTI negative,Storage glut,Negative\n");

        assert!(table.was_relabeled());
        assert_eq!(table.len(), 2);
        assert_eq!(table.records()[0].event_name, "Record high");
    }

    #[test]
    fn test_unparseable_dates_are_dropped() {
        let table = parse(
            "Event_Date,Event_Name,Description,Expected_Impact\n\
             2011-02-15,Arab Spring,Libya unrest,Positive\n\
             ,Missing date,,\n\
             someday,Bad date,,\n\
             2021-02-30,Impossible date,,\n\
             11/05/2014,OPEC,Glut,Negative\n",
        );

        assert_eq!(table.dropped_rows(), 3);
        let dates: Vec<_> = table.records().iter().map(|r| r.event_date.as_str()).collect();
        assert_eq!(dates, vec!["2011-02-15", "2014-11-05"]);
    }

    #[test]
    fn test_short_rows_are_padded() {
        let table = parse("Event_Date,Event_Name,Description,Expected_Impact\n2016-11-30,OPEC cut\n");

        assert_eq!(table.records()[0].event_name, "OPEC cut");
        assert_eq!(table.records()[0].description, "");
    }

    #[test]
    fn test_structural_failures() {
        assert!(matches!(EventTable::from_reader("".as_bytes()), Err(LoadError::NoColumns)));
        assert!(matches!(
            EventTable::from_reader("Event_Date,Event_Name\n2020-01-01,x\n".as_bytes()),
            Err(LoadError::ColumnCount { expected: 4, found: 2 })
        ));
    }

    #[test]
    fn test_missing_file_is_unavailable() {
        let store = EventStore::load("/nonexistent/events.csv");

        assert!(!store.is_available());
        assert_eq!(store.get_all().unwrap_err(), DataUnavailable::new(StoreKind::Events));
    }

    #[test]
    fn test_loaded_but_empty_is_available() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "Event_Date,Event_Name,Description,Expected_Impact").unwrap();

        let store = EventStore::load(file.path());
        assert!(store.get_all().unwrap().is_empty());
    }
}
