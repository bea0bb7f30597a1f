//! Compute layer for `WHEN` predicate processing.
//!
//! This module separates expression handling from row orchestration.
//! It provides:
//! - `expr`: the unbound syntax tree handed over by a front end
//! - `bind`: compilation into a typed, constant-folded predicate
//! - `eval`: the three-valued evaluator over timestamps and intervals
//! - `context`: query and row contexts the evaluator reads from
//!
//! Nothing here touches the row stream itself; see [`crate::filter`].

pub mod bind;
pub mod context;
pub mod eval;
pub mod expr;

pub use bind::{CompiledPredicate, ExprType};
pub use context::{QueryContext, RowContext};
pub use eval::Datum;
pub use expr::{BinaryOp, Expr, Literal};
