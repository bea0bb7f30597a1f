//! Temporal cell visibility for timestamped rows.
//!
//! Every cell of a row carries its own write timestamp. A `WHEN` predicate
//! decides, cell by cell, which values stay visible, independently of any
//! value-level `WHERE` filtering done upstream.
//!
//! ## Features
//! - **Expression language**: `now()`, `timestamp()`, `when(col)`, `when({*})`,
//!   `min_timestamp`, `max_timestamp`, `to_timestamp`, `date_trunc`, `date_part`
//!   (both with an optional UTC offset), interval arithmetic, comparisons,
//!   `BETWEEN`, `AND`/`OR`/`NOT`
//! - **Compile-time checking**: unknown functions, bad arity and type errors
//!   are reported before the first row is processed
//! - **Undefined safety**: lookups with no data (absent column, empty row)
//!   exclude the cell instead of failing
//! - **Parallel batches**: rows are independent and can be filtered on the
//!   rayon pool (`parallel` feature)
//!
//! ## Row Context
//! Each row is summarised once, from its full cell set, before any cell is
//! tested. `timestamp()` reads the candidate cell; `when(...)` reads that
//! summary. A predicate that never mentions `timestamp()` therefore keeps or
//! drops a whole row at once.
//!
//! ```rust
//! use cellwhen::prelude::*;
//!
//! let t0 = Timestamp::parse("2026-03-01T00:00:00Z")?;
//! let t1 = t0.checked_add_interval(Interval::days(1)).unwrap();
//!
//! let filter = FilterBuilder::new()
//!     .predicate(Expr::timestamp().between(
//!         Expr::now().minus(Expr::interval(Interval::days(1))),
//!         Expr::when_row(),
//!     ))
//!     .now(t0)
//!     .build()?;
//!
//! let rows = vec![Row::new("1").with_cell("x", 1, t1).with_cell("y", 1, t0)];
//! let filtered = filter.filter_rows(rows);
//! assert_eq!(filtered[0].column_count(), 2);
//! # Ok::<(), cellwhen::WhenError>(())
//! ```

pub mod builder;
pub mod compute;
pub mod config;
pub mod error;
pub mod filter;

pub use builder::FilterBuilder;
pub use config::FilterConfig;
pub use error::{CompileError, Result, WhenError};
pub use filter::RowFilter;

pub use compute::{
    BinaryOp, CompiledPredicate, Datum, Expr, ExprType, Literal, QueryContext, RowContext,
};

pub use cellwhen_types::{
    Cell, CellValue, ColumnId, DatePart, FilterStats, FilteredRow, Interval, IntervalParseError, Row,
    RowId, TimeUnit, Timestamp, TimestampParseError,
};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Common imports
pub mod prelude {

    pub use crate::{FilterBuilder, FilterConfig, Result, RowFilter, WhenError};

    pub use crate::{CompiledPredicate, Datum, Expr, QueryContext, RowContext};

    pub use crate::{Cell, FilteredRow, Interval, Row, Timestamp};
}
