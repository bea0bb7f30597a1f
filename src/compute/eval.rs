//! Evaluation of compiled predicates.
//!
//! Values are [`Datum`]s. `Undefined` stands for a lookup with nothing to
//! resolve against (an absent column, an empty row, an out-of-range shift).
//! It propagates through arithmetic and comparisons and makes boolean
//! connectives three-valued; a predicate that ends up `Undefined` rejects the
//! cell. That final step in [`CompiledPredicate::test`] is the only place the
//! policy is applied.

use cellwhen_types::{Cell, Interval, Timestamp};
use std::cmp::Ordering;

use crate::compute::bind::{BoundExpr, CompiledPredicate, Pick};
use crate::compute::context::RowContext;

/// Result of evaluating a (sub-)expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Datum {
    Timestamp(Timestamp),
    Interval(Interval),
    Integer(i64),
    Boolean(bool),
    Undefined,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ArithOp {
    Add,
    Sub,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CompareOp {
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
}

impl CompareOp {
    fn holds(self, ordering: Ordering) -> bool {
        match self {
            CompareOp::Lt => ordering == Ordering::Less,
            CompareOp::Le => ordering != Ordering::Greater,
            CompareOp::Gt => ordering == Ordering::Greater,
            CompareOp::Ge => ordering != Ordering::Less,
            CompareOp::Eq => ordering == Ordering::Equal,
            CompareOp::Ne => ordering != Ordering::Equal,
        }
    }

    /// Verdict for operands that only support equality.
    fn holds_for_equality(self, equal: bool) -> Option<bool> {
        match self {
            CompareOp::Eq => Some(equal),
            CompareOp::Ne => Some(!equal),
            _ => None,
        }
    }
}

impl Datum {
    pub fn is_undefined(&self) -> bool {
        matches!(self, Datum::Undefined)
    }

    pub fn as_timestamp(&self) -> Option<Timestamp> {
        match self {
            Datum::Timestamp(ts) => Some(*ts),
            _ => None,
        }
    }

    pub fn as_interval(&self) -> Option<Interval> {
        match self {
            Datum::Interval(iv) => Some(*iv),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Datum::Integer(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Datum::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub(crate) fn from_option(ts: Option<Timestamp>) -> Datum {
        ts.map(Datum::Timestamp).unwrap_or(Datum::Undefined)
    }

    pub(crate) fn arithmetic(self, op: ArithOp, rhs: Datum) -> Datum {
        let result = match (op, self, rhs) {
            (ArithOp::Add, Datum::Timestamp(ts), Datum::Interval(iv))
            | (ArithOp::Add, Datum::Interval(iv), Datum::Timestamp(ts)) => {
                ts.checked_add_interval(iv).map(Datum::Timestamp)
            }
            (ArithOp::Sub, Datum::Timestamp(ts), Datum::Interval(iv)) => {
                ts.checked_sub_interval(iv).map(Datum::Timestamp)
            }
            (ArithOp::Add, Datum::Integer(a), Datum::Integer(b)) => {
                a.checked_add(b).map(Datum::Integer)
            }
            (ArithOp::Sub, Datum::Integer(a), Datum::Integer(b)) => {
                a.checked_sub(b).map(Datum::Integer)
            }
            (ArithOp::Add, Datum::Interval(a), Datum::Interval(b)) => {
                a.checked_add(b).map(Datum::Interval)
            }
            (ArithOp::Sub, Datum::Interval(a), Datum::Interval(b)) => {
                a.checked_sub(b).map(Datum::Interval)
            }
            _ => None,
        };
        result.unwrap_or(Datum::Undefined)
    }

    pub(crate) fn compare(self, op: CompareOp, rhs: Datum) -> Datum {
        let verdict = match (self, rhs) {
            (Datum::Timestamp(a), Datum::Timestamp(b)) => Some(op.holds(a.cmp(&b))),
            (Datum::Integer(a), Datum::Integer(b)) => Some(op.holds(a.cmp(&b))),
            (Datum::Interval(a), Datum::Interval(b)) => op.holds_for_equality(a == b),
            (Datum::Boolean(a), Datum::Boolean(b)) => op.holds_for_equality(a == b),
            _ => None,
        };
        verdict.map(Datum::Boolean).unwrap_or(Datum::Undefined)
    }

    pub(crate) fn and(self, rhs: Datum) -> Datum {
        match (self.as_bool(), rhs.as_bool()) {
            (Some(false), _) | (_, Some(false)) => Datum::Boolean(false),
            (Some(true), Some(true)) => Datum::Boolean(true),
            _ => Datum::Undefined,
        }
    }

    pub(crate) fn or(self, rhs: Datum) -> Datum {
        match (self.as_bool(), rhs.as_bool()) {
            (Some(true), _) | (_, Some(true)) => Datum::Boolean(true),
            (Some(false), Some(false)) => Datum::Boolean(false),
            _ => Datum::Undefined,
        }
    }

    pub(crate) fn negate(self) -> Datum {
        self.as_bool()
            .map(|b| Datum::Boolean(!b))
            .unwrap_or(Datum::Undefined)
    }

    /// `self BETWEEN low AND high`, both bounds inclusive.
    pub(crate) fn between(self, low: Datum, high: Datum, negated: bool) -> Datum {
        let inside = self
            .compare(CompareOp::Ge, low)
            .and(self.compare(CompareOp::Le, high));
        if negated { inside.negate() } else { inside }
    }
}

/// Evaluate a bound tree. `cell` is the candidate cell's timestamp, `None`
/// when judging a whole row with a predicate that never reads it.
pub(crate) fn evaluate(expr: &BoundExpr, row: &RowContext, cell: Option<Timestamp>) -> Datum {
    match expr {
        BoundExpr::Constant(datum) => *datum,
        BoundExpr::Now => Datum::Timestamp(row.now()),
        BoundExpr::CellTimestamp => Datum::from_option(cell),
        BoundExpr::Column { name, pick } => Datum::from_option(match pick {
            Pick::Latest => row.when(name),
            Pick::Earliest => row.earliest(name),
        }),
        BoundExpr::Row(pick) => Datum::from_option(match pick {
            Pick::Latest => row.row_latest(),
            Pick::Earliest => row.row_earliest(),
        }),
        BoundExpr::Truncate { unit, offset, arg } => Datum::from_option(
            evaluate(arg, row, cell)
                .as_timestamp()
                .and_then(|ts| match offset {
                    Some(offset) => ts.trunc_at(*unit, *offset),
                    None => ts.trunc(*unit),
                }),
        ),
        BoundExpr::Part { part, offset, arg } => evaluate(arg, row, cell)
            .as_timestamp()
            .and_then(|ts| match offset {
                Some(offset) => ts.part_at(*part, *offset),
                None => Some(ts.part(*part)),
            })
            .map(Datum::Integer)
            .unwrap_or(Datum::Undefined),
        BoundExpr::Arithmetic { op, lhs, rhs } => {
            evaluate(lhs, row, cell).arithmetic(*op, evaluate(rhs, row, cell))
        }
        BoundExpr::Compare { op, lhs, rhs } => {
            evaluate(lhs, row, cell).compare(*op, evaluate(rhs, row, cell))
        }
        BoundExpr::And(lhs, rhs) => {
            let left = evaluate(lhs, row, cell);
            if left == Datum::Boolean(false) {
                return left;
            }
            left.and(evaluate(rhs, row, cell))
        }
        BoundExpr::Or(lhs, rhs) => {
            let left = evaluate(lhs, row, cell);
            if left == Datum::Boolean(true) {
                return left;
            }
            left.or(evaluate(rhs, row, cell))
        }
        BoundExpr::Not(inner) => evaluate(inner, row, cell).negate(),
        BoundExpr::Between {
            expr,
            low,
            high,
            negated,
        } => evaluate(expr, row, cell).between(
            evaluate(low, row, cell),
            evaluate(high, row, cell),
            *negated,
        ),
    }
}

impl CompiledPredicate {
    /// Evaluate against a row context with `timestamp()` bound to `cell`.
    pub fn evaluate(&self, row: &RowContext, cell: &Cell) -> Datum {
        evaluate(&self.root, row, Some(cell.timestamp))
    }

    /// Whether `cell` stays visible. Undefined counts as `false`.
    pub fn test(&self, row: &RowContext, cell: &Cell) -> bool {
        self.test_timestamp(row, cell.timestamp)
    }

    /// Same as [`CompiledPredicate::test`] for a bare cell timestamp.
    pub fn test_timestamp(&self, row: &RowContext, cell_timestamp: Timestamp) -> bool {
        evaluate(&self.root, row, Some(cell_timestamp)) == Datum::Boolean(true)
    }

    /// Verdict shared by every cell of the row, or `None` when the predicate
    /// reads `timestamp()` and cells must be judged one at a time.
    pub fn row_verdict(&self, row: &RowContext) -> Option<bool> {
        if self.cell_dependent {
            return None;
        }
        Some(evaluate(&self.root, row, None) == Datum::Boolean(true))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(text: &str) -> Timestamp {
        Timestamp::parse(text).unwrap()
    }

    #[test]
    fn test_arithmetic() {
        let base = Datum::Timestamp(ts("2026-01-01"));
        let day = Datum::Interval(Interval::days(1));
        assert_eq!(
            base.arithmetic(ArithOp::Add, day),
            Datum::Timestamp(ts("2026-01-02"))
        );
        assert_eq!(
            day.arithmetic(ArithOp::Add, base),
            Datum::Timestamp(ts("2026-01-02"))
        );
        assert_eq!(
            base.arithmetic(ArithOp::Sub, day),
            Datum::Timestamp(ts("2025-12-31"))
        );
        assert_eq!(
            day.arithmetic(ArithOp::Add, day),
            Datum::Interval(Interval::days(2))
        );
        assert!(
            Datum::Undefined
                .arithmetic(ArithOp::Add, day)
                .is_undefined()
        );
    }

    #[test]
    fn test_compare_timestamps() {
        let a = Datum::Timestamp(ts("2026-01-01"));
        let b = Datum::Timestamp(ts("2026-01-02"));
        assert_eq!(a.compare(CompareOp::Lt, b), Datum::Boolean(true));
        assert_eq!(a.compare(CompareOp::Gt, b), Datum::Boolean(false));
        assert_eq!(a.compare(CompareOp::Le, a), Datum::Boolean(true));
        assert_eq!(a.compare(CompareOp::Ne, b), Datum::Boolean(true));
        assert_eq!(a.compare(CompareOp::Eq, a), Datum::Boolean(true));
    }

    #[test]
    fn test_compare_with_undefined_is_undefined() {
        let a = Datum::Timestamp(ts("2026-01-01"));
        for op in [
            CompareOp::Lt,
            CompareOp::Le,
            CompareOp::Gt,
            CompareOp::Ge,
            CompareOp::Eq,
            CompareOp::Ne,
        ] {
            assert!(a.compare(op, Datum::Undefined).is_undefined());
            assert!(Datum::Undefined.compare(op, a).is_undefined());
        }
    }

    #[test]
    fn test_integers() {
        let nine = Datum::Integer(9);
        let twelve = Datum::Integer(12);
        assert_eq!(nine.compare(CompareOp::Lt, twelve), Datum::Boolean(true));
        assert_eq!(nine.compare(CompareOp::Ge, twelve), Datum::Boolean(false));
        assert_eq!(nine.arithmetic(ArithOp::Add, twelve), Datum::Integer(21));
        assert!(
            Datum::Integer(i64::MAX)
                .arithmetic(ArithOp::Add, Datum::Integer(1))
                .is_undefined()
        );
        assert!(
            nine.compare(CompareOp::Eq, Datum::Timestamp(ts("2026-01-01")))
                .is_undefined()
        );
        assert_eq!(
            Datum::Integer(10).between(nine, twelve, false),
            Datum::Boolean(true)
        );
    }

    #[test]
    fn test_intervals_only_compare_for_equality() {
        let a = Datum::Interval(Interval::days(1));
        assert_eq!(a.compare(CompareOp::Eq, a), Datum::Boolean(true));
        assert!(a.compare(CompareOp::Lt, a).is_undefined());
    }

    #[test]
    fn test_three_valued_logic() {
        let t = Datum::Boolean(true);
        let f = Datum::Boolean(false);
        let u = Datum::Undefined;

        assert_eq!(f.and(u), f);
        assert_eq!(u.and(f), f);
        assert!(t.and(u).is_undefined());
        assert_eq!(t.or(u), t);
        assert!(f.or(u).is_undefined());
        assert!(u.negate().is_undefined());
        assert_eq!(t.negate(), f);
    }

    #[test]
    fn test_between_inclusive() {
        let lo = Datum::Timestamp(ts("2026-01-01"));
        let hi = Datum::Timestamp(ts("2026-01-03"));
        assert_eq!(lo.between(lo, hi, false), Datum::Boolean(true));
        assert_eq!(hi.between(lo, hi, false), Datum::Boolean(true));
        assert_eq!(
            Datum::Timestamp(ts("2026-01-04")).between(lo, hi, false),
            Datum::Boolean(false)
        );
        assert_eq!(
            Datum::Timestamp(ts("2026-01-04")).between(lo, hi, true),
            Datum::Boolean(true)
        );
        assert!(lo.between(Datum::Undefined, hi, true).is_undefined());
    }
}
