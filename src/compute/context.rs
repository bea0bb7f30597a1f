//! Query-scoped and row-scoped evaluation contexts.
//!
//! A [`QueryContext`] is captured once per query and holds the `now()`
//! snapshot. A [`RowContext`] is derived from one row's full, unfiltered cell
//! set before any cell is tested; it is immutable afterwards, so every cell
//! of the row is judged against the same facts.

use cellwhen_types::{Row, Timestamp};
use rustc_hash::FxHashMap;

/// Per-query facts shared by every row and cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryContext {
    now: Timestamp,
}

impl QueryContext {
    /// Snapshot the wall clock.
    pub fn capture() -> Self {
        Self {
            now: Timestamp::now(),
        }
    }

    /// Use a fixed instant for `now()`.
    pub fn at(now: Timestamp) -> Self {
        Self { now }
    }

    pub fn now(&self) -> Timestamp {
        self.now
    }
}

/// Earliest and latest write time seen for one column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ColumnSpan {
    earliest: Timestamp,
    latest: Timestamp,
}

impl ColumnSpan {
    fn single(ts: Timestamp) -> Self {
        Self {
            earliest: ts,
            latest: ts,
        }
    }

    fn widen(&mut self, ts: Timestamp) {
        self.earliest = self.earliest.min(ts);
        self.latest = self.latest.max(ts);
    }
}

/// Read-only snapshot of a row's temporal facts.
///
/// A column that appears more than once resolves to its latest write for
/// `when(col)` and to its earliest for `min_timestamp(col)`.
#[derive(Debug, Clone)]
pub struct RowContext {
    now: Timestamp,
    columns: FxHashMap<String, ColumnSpan>,
    span: Option<ColumnSpan>,
}

impl RowContext {
    pub fn new(row: &Row, query: &QueryContext) -> Self {
        let mut columns: FxHashMap<String, ColumnSpan> =
            FxHashMap::with_capacity_and_hasher(row.len(), Default::default());
        let mut span: Option<ColumnSpan> = None;

        for cell in row {
            match columns.get_mut(cell.column.as_str()) {
                Some(existing) => existing.widen(cell.timestamp),
                None => {
                    columns.insert(cell.column.clone(), ColumnSpan::single(cell.timestamp));
                }
            }
            match span.as_mut() {
                Some(span) => span.widen(cell.timestamp),
                None => span = Some(ColumnSpan::single(cell.timestamp)),
            }
        }

        Self {
            now: query.now(),
            columns,
            span,
        }
    }

    pub fn now(&self) -> Timestamp {
        self.now
    }

    /// Timestamp of `column` in this row, `None` if the column is absent.
    pub fn when(&self, column: &str) -> Option<Timestamp> {
        self.columns.get(column).map(|span| span.latest)
    }

    pub fn earliest(&self, column: &str) -> Option<Timestamp> {
        self.columns.get(column).map(|span| span.earliest)
    }

    /// Latest timestamp over all cells (`when({*})`), `None` for an empty row.
    pub fn row_latest(&self) -> Option<Timestamp> {
        self.span.map(|span| span.latest)
    }

    /// Earliest timestamp over all cells (`min_timestamp({*})`).
    pub fn row_earliest(&self) -> Option<Timestamp> {
        self.span.map(|span| span.earliest)
    }

    pub fn contains_column(&self, column: &str) -> bool {
        self.columns.contains_key(column)
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}
