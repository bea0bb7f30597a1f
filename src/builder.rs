//! Filter builder for flexible configuration
//!
//! This module provides a builder pattern for assembling a [`RowFilter`]
//! from a predicate, an optional fixed `now()` and filter settings.

use cellwhen_types::Timestamp;

use crate::compute::context::QueryContext;
use crate::compute::expr::Expr;
use crate::config::FilterConfig;
use crate::error::{Result, WhenError};
use crate::filter::RowFilter;

/// Builder for a [`RowFilter`].
#[derive(Debug, Clone, Default)]
pub struct FilterBuilder {
    predicate: Option<Expr>,
    now: Option<Timestamp>,
    config: FilterConfig,
}

impl FilterBuilder {
    /// Create a new builder with default configuration and no predicate.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the `WHEN` predicate.
    pub fn predicate(mut self, expr: Expr) -> Self {
        self.predicate = Some(expr);
        self
    }

    /// Parse the predicate from its JSON tree form.
    pub fn predicate_json(mut self, json: &str) -> Result<Self> {
        self.predicate = Some(serde_json::from_str(json)?);
        Ok(self)
    }

    /// Pin `now()` to a fixed instant instead of reading the clock at build time.
    pub fn now(mut self, now: Timestamp) -> Self {
        self.now = Some(now);
        self
    }

    /// Set the filter configuration.
    pub fn config(mut self, config: FilterConfig) -> Self {
        self.config = config;
        self
    }

    pub fn parallel(mut self, parallel: bool) -> Self {
        self.config = self.config.with_parallel(parallel);
        self
    }

    pub fn keep_empty_rows(mut self, keep: bool) -> Self {
        self.config = self.config.with_keep_empty_rows(keep);
        self
    }

    /// Compile the predicate and build the filter.
    ///
    /// The `now()` snapshot is taken here, once, unless one was pinned.
    pub fn build(self) -> Result<RowFilter> {
        let expr = self.predicate.ok_or(WhenError::MissingPredicate)?;
        let query = match self.now {
            Some(now) => QueryContext::at(now),
            None => QueryContext::capture(),
        };
        RowFilter::compile(&expr, query, self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cellwhen_types::Row;

    #[test]
    fn test_builder_default() {
        let builder = FilterBuilder::new();
        assert!(builder.predicate.is_none());
        assert!(matches!(builder.build(), Err(WhenError::MissingPredicate)));
    }

    #[test]
    fn test_builder_pinned_now() {
        let now = Timestamp::parse("2026-01-01").unwrap();
        let filter = FilterBuilder::new()
            .predicate(Expr::timestamp().ge(Expr::now()))
            .now(now)
            .parallel(false)
            .build()
            .unwrap();

        assert_eq!(filter.query_context().now(), now);
        assert!(!filter.config().parallel);

        let row = Row::new("r").with_cell("x", 1, now);
        assert_eq!(filter.filter_row(&row).column_count(), 1);
    }

    #[test]
    fn test_builder_captures_clock() {
        let before = Timestamp::now();
        let filter = FilterBuilder::new()
            .predicate(Expr::timestamp().lt(Expr::now()))
            .build()
            .unwrap();
        assert!(filter.query_context().now() >= before);
    }

    #[test]
    fn test_captured_now_is_fixed_for_the_filter() {
        let filter = FilterBuilder::new()
            .predicate(Expr::timestamp().equals(Expr::now()))
            .build()
            .unwrap();
        let snapshot = filter.query_context().now();

        let rows = || {
            vec![
                Row::new("a").with_cell("x", 1, snapshot),
                Row::new("b").with_cell("x", 2, snapshot),
            ]
        };

        let first = filter.filter_rows(rows());
        std::thread::sleep(std::time::Duration::from_millis(5));
        let second = filter.filter_rows(rows());

        assert!(Timestamp::now() > snapshot);
        assert_eq!(filter.query_context().now(), snapshot);
        assert!(first.iter().all(|row| row.column_count() == 1));
        assert_eq!(first, second);
    }

    #[test]
    fn test_builder_from_json() {
        let filter = FilterBuilder::new()
            .predicate_json(
                r#"{ "binary": { "op": "eq",
                     "lhs": { "function": { "name": "timestamp" } },
                     "rhs": { "function": { "name": "when", "args": [ { "column": "x" } ] } } } }"#,
            )
            .unwrap()
            .keep_empty_rows(false)
            .build()
            .unwrap();
        assert!(filter.predicate().is_cell_dependent());
        assert!(!filter.config().keep_empty_rows);
    }

    #[test]
    fn test_builder_reports_compile_errors() {
        let err = FilterBuilder::new()
            .predicate(Expr::now())
            .build()
            .unwrap_err();
        assert!(matches!(err, WhenError::Compile(_)));
    }
}
