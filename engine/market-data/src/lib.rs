//! Market Data - Brent price series, annotated events and change points
//!
//! Both stores are loaded once from CSV files at process start and are
//! read-only afterwards. A failed load never panics: the store remembers
//! why it failed and reports [`DataUnavailable`] on every query.

pub mod change_points;
pub mod dates;
pub mod error;
pub mod events;
pub mod prices;

pub use change_points::{detected_change_points, ChangePoint};
pub use error::{DataUnavailable, LoadError, Result, StoreKind};
pub use events::{EventRecord, EventStore, EventTable, CANONICAL_EVENT_COLUMNS};
pub use prices::{price_cutoff, PriceRecord, PriceSeries, PriceSlice, PriceStore};
