//! # cellwhen-types
//!
//! Core temporal data types for the cellwhen visibility engine.
//!
//! - **Instants**: `Timestamp`, a totally ordered UTC instant with nanosecond resolution
//! - **Durations**: `Interval`, a calendar-aware signed duration (months, days, nanoseconds)
//! - **Rows**: `Cell`, `Row` and `FilteredRow`, the shapes flowing in and out of a row filter
//! - **Statistics**: `FilterStats`
//!
//! All types are serializable with Serde and built on top of `chrono`.
//!
//! ## Examples
//!
//! ```rust
//! use cellwhen_types::interval::Interval;
//! use cellwhen_types::row::Row;
//! use cellwhen_types::timestamp::Timestamp;
//!
//! let t0: Timestamp = "2025-06-01T00:00:00Z".parse().unwrap();
//! let t1 = t0.checked_add_interval(Interval::days(1)).unwrap();
//!
//! let row = Row::new("9")
//!     .with_cell("x", 9, t1)
//!     .with_cell("y", 9, t0);
//! assert_eq!(row.len(), 2);
//! assert!(t0 < t1);
//! ```

pub mod interval;
pub mod row;
pub mod stats;
pub mod timestamp;

pub use interval::{Interval, IntervalParseError};
pub use row::{Cell, CellValue, ColumnId, FilteredRow, Row, RowId};
pub use stats::FilterStats;
pub use timestamp::{DatePart, TimeUnit, Timestamp, TimestampParseError, parse_utc_offset};
