//! Row filter: applies a compiled `WHEN` predicate to a stream of rows.
//!
//! For every row the filter builds a [`RowContext`] from the complete cell
//! set, then tests each cell against it. Cells never see each other's
//! verdicts, so the result does not depend on cell order, and rows can be
//! processed on any thread in any order.

use cellwhen_types::{Cell, FilterStats, FilteredRow, Row};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::compute::bind::CompiledPredicate;
use crate::compute::context::{QueryContext, RowContext};
use crate::compute::expr::Expr;
use crate::config::FilterConfig;
use crate::error::{Result, WhenError};

#[derive(Debug, Default)]
struct FilterCounters {
    rows_seen: AtomicU64,
    rows_emptied: AtomicU64,
    cells_kept: AtomicU64,
    cells_dropped: AtomicU64,
}

impl FilterCounters {
    /// Publish a locally accumulated tally.
    fn add(&self, stats: &FilterStats) {
        self.rows_seen.fetch_add(stats.rows_seen, Ordering::Relaxed);
        self.rows_emptied
            .fetch_add(stats.rows_emptied, Ordering::Relaxed);
        self.cells_kept.fetch_add(stats.cells_kept, Ordering::Relaxed);
        self.cells_dropped
            .fetch_add(stats.cells_dropped, Ordering::Relaxed);
    }

    fn snapshot(&self) -> FilterStats {
        FilterStats {
            rows_seen: self.rows_seen.load(Ordering::Relaxed),
            rows_emptied: self.rows_emptied.load(Ordering::Relaxed),
            cells_kept: self.cells_kept.load(Ordering::Relaxed),
            cells_dropped: self.cells_dropped.load(Ordering::Relaxed),
        }
    }

    fn reset(&self) {
        self.rows_seen.store(0, Ordering::Relaxed);
        self.rows_emptied.store(0, Ordering::Relaxed);
        self.cells_kept.store(0, Ordering::Relaxed);
        self.cells_dropped.store(0, Ordering::Relaxed);
    }
}

/// Applies one compiled predicate, under one `now()` snapshot, to rows.
///
/// `RowFilter` is `Send + Sync`; share it by reference across threads.
///
/// # Examples
///
/// ```rust
/// use cellwhen::prelude::*;
///
/// let t0 = Timestamp::parse("2026-03-01T00:00:00Z")?;
/// let t1 = t0.checked_add_interval(Interval::days(1)).unwrap();
///
/// let filter = RowFilter::compile(
///     &Expr::timestamp().lt(Expr::when("x")),
///     QueryContext::at(t0),
///     FilterConfig::default(),
/// )?;
///
/// let row = Row::new("1").with_cell("x", 1, t1).with_cell("y", 1, t0);
/// let filtered = filter.filter_row(&row);
/// assert_eq!(filtered.column_count(), 1);
/// assert!(filtered.get("y").is_some());
/// # Ok::<(), cellwhen::WhenError>(())
/// ```
#[derive(Debug)]
pub struct RowFilter {
    predicate: CompiledPredicate,
    query: QueryContext,
    config: FilterConfig,
    counters: FilterCounters,
}

impl RowFilter {
    pub fn new(
        predicate: CompiledPredicate,
        query: QueryContext,
        config: FilterConfig,
    ) -> Result<Self> {
        config.validate().map_err(WhenError::InvalidConfig)?;

        #[cfg(not(feature = "parallel"))]
        {
            if config.parallel {
                log::warn!(
                    "parallel row filtering requested but the `parallel` feature is disabled; rows will be filtered sequentially"
                );
            }
        }

        log::debug!(
            "row filter ready: predicate `{}`, now = {}, cell dependent = {}",
            predicate.source(),
            query.now(),
            predicate.is_cell_dependent()
        );

        Ok(Self {
            predicate,
            query,
            config,
            counters: FilterCounters::default(),
        })
    }

    /// Compile `expr` and build a filter from it in one step.
    pub fn compile(expr: &Expr, query: QueryContext, config: FilterConfig) -> Result<Self> {
        let predicate = CompiledPredicate::compile(expr)?;
        Self::new(predicate, query, config)
    }

    pub fn predicate(&self) -> &CompiledPredicate {
        &self.predicate
    }

    pub fn query_context(&self) -> QueryContext {
        self.query
    }

    pub fn config(&self) -> &FilterConfig {
        &self.config
    }

    /// Context `row` would be judged against.
    pub fn row_context(&self, row: &Row) -> RowContext {
        RowContext::new(row, &self.query)
    }

    /// Filter a borrowed row, cloning the surviving cells.
    pub fn filter_row(&self, row: &Row) -> FilteredRow {
        let mut stats = FilterStats::new();
        let out = self.judge_row(row, &mut stats);
        self.publish(&stats);
        out
    }

    /// Filter an owned row, moving the surviving cells.
    pub fn filter_owned(&self, row: Row) -> FilteredRow {
        let mut stats = FilterStats::new();
        let out = self.judge_owned(row, &mut stats);
        self.publish(&stats);
        out
    }

    fn judge_row(&self, row: &Row, stats: &mut FilterStats) -> FilteredRow {
        let context = self.row_context(row);
        let retained: Vec<Cell> = match self.predicate.row_verdict(&context) {
            Some(true) => row.cells.clone(),
            Some(false) => Vec::new(),
            None => row
                .iter()
                .filter(|cell| self.predicate.test(&context, cell))
                .cloned()
                .collect(),
        };
        Self::finish(row.name.clone(), row.len(), retained, stats)
    }

    fn judge_owned(&self, row: Row, stats: &mut FilterStats) -> FilteredRow {
        let context = self.row_context(&row);
        let Row { name, cells } = row;
        let total = cells.len();
        let retained: Vec<Cell> = match self.predicate.row_verdict(&context) {
            Some(true) => cells,
            Some(false) => Vec::new(),
            None => cells
                .into_iter()
                .filter(|cell| self.predicate.test(&context, cell))
                .collect(),
        };
        Self::finish(name, total, retained, stats)
    }

    fn finish(
        name: String,
        total: usize,
        retained: Vec<Cell>,
        stats: &mut FilterStats,
    ) -> FilteredRow {
        let kept = retained.len();
        stats.record_row(kept as u64, (total - kept) as u64);
        log::trace!("row '{}': kept {} of {} cell(s)", name, kept, total);
        FilteredRow::from_retained(name, retained)
    }

    fn publish(&self, stats: &FilterStats) {
        if self.config.collect_stats {
            self.counters.add(stats);
        }
    }

    fn emit(&self, row: &FilteredRow) -> bool {
        self.config.keep_empty_rows || row.has_columns()
    }

    /// Filter a batch, preserving input order.
    ///
    /// Large batches are spread over the rayon pool when the `parallel`
    /// feature is enabled and `config.parallel` is set. Counters are
    /// published once per batch.
    pub fn filter_rows(&self, rows: Vec<Row>) -> Vec<FilteredRow> {
        #[cfg(feature = "parallel")]
        {
            if self.config.parallel && rows.len() >= self.config.parallel_threshold {
                use rayon::prelude::*;

                log::debug!("filtering {} rows in parallel", rows.len());
                let judged: Vec<(FilteredRow, FilterStats)> = rows
                    .into_par_iter()
                    .map(|row| {
                        let mut stats = FilterStats::new();
                        let out = self.judge_owned(row, &mut stats);
                        (out, stats)
                    })
                    .collect();

                let mut batch = FilterStats::new();
                let out = judged
                    .into_iter()
                    .filter_map(|(row, stats)| {
                        batch.merge(&stats);
                        self.emit(&row).then_some(row)
                    })
                    .collect();
                self.publish(&batch);
                return out;
            }
        }

        let mut batch = FilterStats::new();
        let out = rows
            .into_iter()
            .map(|row| self.judge_owned(row, &mut batch))
            .filter(|row| self.emit(row))
            .collect();
        self.publish(&batch);
        out
    }

    /// Lazily filter a row stream. Counters are updated row by row.
    pub fn filter_iter<'a, I>(&'a self, rows: I) -> impl Iterator<Item = FilteredRow> + 'a
    where
        I: IntoIterator<Item = Row>,
        I::IntoIter: 'a,
    {
        rows.into_iter()
            .map(move |row| self.filter_owned(row))
            .filter(move |row| self.emit(row))
    }

    /// Counters accumulated since construction or the last reset.
    pub fn stats(&self) -> FilterStats {
        self.counters.snapshot()
    }

    pub fn reset_stats(&self) {
        self.counters.reset();
    }
}
