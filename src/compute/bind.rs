//! Compilation of `WHEN` expressions.
//!
//! Binding resolves function names, checks arity and operand types, coerces
//! text literals to timestamps and folds constant sub-trees. Every problem a
//! predicate can have is reported here as a [`CompileError`], so nothing can
//! go wrong once rows start flowing.

use cellwhen_types::{DatePart, TimeUnit, Timestamp, parse_utc_offset};
use chrono::FixedOffset;
use smallvec::SmallVec;
use std::fmt;

use crate::compute::eval::{ArithOp, CompareOp, Datum};
use crate::compute::expr::{BinaryOp, Expr, Literal};
use crate::error::CompileError;

/// Static type of a (sub-)expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExprType {
    Timestamp,
    Interval,
    Integer,
    Boolean,
    String,
}

impl fmt::Display for ExprType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ExprType::Timestamp => "timestamp",
            ExprType::Interval => "interval",
            ExprType::Integer => "integer",
            ExprType::Boolean => "boolean",
            ExprType::String => "string",
        })
    }
}

/// Which end of a column's (or row's) timestamps a lookup resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Pick {
    Latest,
    Earliest,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum BoundExpr {
    Constant(Datum),
    Now,
    CellTimestamp,
    Column {
        name: String,
        pick: Pick,
    },
    Row(Pick),
    Truncate {
        unit: TimeUnit,
        offset: Option<FixedOffset>,
        arg: Box<BoundExpr>,
    },
    Part {
        part: DatePart,
        offset: Option<FixedOffset>,
        arg: Box<BoundExpr>,
    },
    Arithmetic {
        op: ArithOp,
        lhs: Box<BoundExpr>,
        rhs: Box<BoundExpr>,
    },
    Compare {
        op: CompareOp,
        lhs: Box<BoundExpr>,
        rhs: Box<BoundExpr>,
    },
    And(Box<BoundExpr>, Box<BoundExpr>),
    Or(Box<BoundExpr>, Box<BoundExpr>),
    Not(Box<BoundExpr>),
    Between {
        expr: Box<BoundExpr>,
        low: Box<BoundExpr>,
        high: Box<BoundExpr>,
        negated: bool,
    },
}

impl BoundExpr {
    fn constant(&self) -> Option<Datum> {
        match self {
            BoundExpr::Constant(datum) => Some(*datum),
            _ => None,
        }
    }
}

/// Intermediate binding result. Text stays unbound until the context says
/// what it should become.
enum Bound {
    Text(String),
    Typed(BoundExpr, ExprType),
}

impl Bound {
    fn ty(&self) -> ExprType {
        match self {
            Bound::Text(_) => ExprType::String,
            Bound::Typed(_, ty) => *ty,
        }
    }

    /// Accept a timestamp, or text that parses as one.
    fn into_timestamp(self, context: &str) -> Result<BoundExpr, CompileError> {
        match self {
            Bound::Typed(expr, ExprType::Timestamp) => Ok(expr),
            Bound::Text(text) => Timestamp::parse(&text)
                .map(|ts| BoundExpr::Constant(Datum::Timestamp(ts)))
                .map_err(|e| CompileError::InvalidArgument {
                    function: context.to_string(),
                    reason: e.to_string(),
                }),
            Bound::Typed(_, found) => Err(CompileError::TypeMismatch {
                context: context.to_string(),
                expected: ExprType::Timestamp,
                found,
            }),
        }
    }

    fn into_typed(self, expected: ExprType, context: &str) -> Result<BoundExpr, CompileError> {
        if expected == ExprType::Timestamp {
            return self.into_timestamp(context);
        }
        match self {
            Bound::Typed(expr, ty) if ty == expected => Ok(expr),
            other => Err(CompileError::TypeMismatch {
                context: context.to_string(),
                expected,
                found: other.ty(),
            }),
        }
    }
}

/// A type-checked `WHEN` predicate, ready to be tested against cells.
///
/// Compilation records two facts the row filter relies on: whether the
/// predicate reads the candidate cell's own timestamp (if not, one verdict
/// serves the whole row) and which columns it looks up.
///
/// # Examples
///
/// ```
/// use cellwhen::compute::{CompiledPredicate, Expr};
///
/// let predicate = CompiledPredicate::compile(&Expr::timestamp().lt(Expr::when("x")))?;
/// assert!(predicate.is_cell_dependent());
/// assert_eq!(predicate.referenced_columns().collect::<Vec<_>>(), vec!["x"]);
/// # Ok::<(), cellwhen::error::CompileError>(())
/// ```
#[derive(Debug, Clone)]
pub struct CompiledPredicate {
    pub(crate) root: BoundExpr,
    pub(crate) cell_dependent: bool,
    source: Expr,
    columns: SmallVec<[String; 4]>,
    row_aggregate: bool,
}

impl CompiledPredicate {
    pub fn compile(expr: &Expr) -> Result<Self, CompileError> {
        let mut binder = Binder::default();
        let bound = binder.bind(expr)?;

        let root = match bound {
            Bound::Typed(root, ExprType::Boolean) => root,
            other => {
                return Err(CompileError::NonBooleanPredicate { found: other.ty() });
            }
        };

        let mut columns = binder.columns;
        columns.sort_unstable();
        columns.dedup();

        log::debug!(
            "compiled WHEN predicate `{}` (cell dependent: {}, columns: {:?}, row aggregate: {})",
            expr,
            binder.cell_dependent,
            columns,
            binder.row_aggregate
        );

        Ok(Self {
            root,
            cell_dependent: binder.cell_dependent,
            source: expr.clone(),
            columns,
            row_aggregate: binder.row_aggregate,
        })
    }

    /// The expression this predicate was compiled from.
    pub fn source(&self) -> &Expr {
        &self.source
    }

    /// True when the predicate reads `timestamp()`.
    pub fn is_cell_dependent(&self) -> bool {
        self.cell_dependent
    }

    /// Columns looked up through `when(col)` and friends, sorted.
    pub fn referenced_columns(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(String::as_str)
    }

    /// True when the predicate reads a `{*}` aggregate.
    pub fn uses_row_aggregate(&self) -> bool {
        self.row_aggregate
    }

    /// The folded verdict, when the predicate does not depend on any row.
    pub fn constant_verdict(&self) -> Option<bool> {
        self.root
            .constant()
            .map(|datum| datum == Datum::Boolean(true))
    }
}

#[derive(Default)]
struct Binder {
    cell_dependent: bool,
    row_aggregate: bool,
    columns: SmallVec<[String; 4]>,
}

impl Binder {
    fn bind(&mut self, expr: &Expr) -> Result<Bound, CompileError> {
        match expr {
            Expr::Literal(literal) => Ok(match literal {
                Literal::Timestamp(ts) => {
                    Bound::Typed(BoundExpr::Constant(Datum::Timestamp(*ts)), ExprType::Timestamp)
                }
                Literal::Interval(iv) => {
                    Bound::Typed(BoundExpr::Constant(Datum::Interval(*iv)), ExprType::Interval)
                }
                Literal::Integer(value) => {
                    Bound::Typed(BoundExpr::Constant(Datum::Integer(*value)), ExprType::Integer)
                }
                Literal::Boolean(b) => {
                    Bound::Typed(BoundExpr::Constant(Datum::Boolean(*b)), ExprType::Boolean)
                }
                Literal::String(text) => Bound::Text(text.clone()),
            }),
            Expr::Column(name) => Err(CompileError::MisplacedReference {
                what: format!("column reference '{}'", name),
            }),
            Expr::Wildcard => Err(CompileError::MisplacedReference {
                what: "{*}".to_string(),
            }),
            Expr::Function { name, args } => self.bind_function(name, args),
            Expr::Binary { op, lhs, rhs } => self.bind_binary(*op, lhs, rhs),
            Expr::Between {
                expr,
                low,
                high,
                negated,
            } => {
                let context = "BETWEEN";
                let (expr, low, high) = (self.bind(expr)?, self.bind(low)?, self.bind(high)?);
                let operand_ty = if [&expr, &low, &high]
                    .iter()
                    .any(|b| b.ty() == ExprType::Integer)
                {
                    ExprType::Integer
                } else {
                    ExprType::Timestamp
                };
                let expr = expr.into_typed(operand_ty, context)?;
                let low = low.into_typed(operand_ty, context)?;
                let high = high.into_typed(operand_ty, context)?;

                let bound = match (expr.constant(), low.constant(), high.constant()) {
                    (Some(e), Some(l), Some(h)) => BoundExpr::Constant(e.between(l, h, *negated)),
                    _ => BoundExpr::Between {
                        expr: Box::new(expr),
                        low: Box::new(low),
                        high: Box::new(high),
                        negated: *negated,
                    },
                };
                Ok(Bound::Typed(bound, ExprType::Boolean))
            }
            Expr::Not(inner) => {
                let inner = self.bind(inner)?.into_typed(ExprType::Boolean, "NOT")?;
                let bound = match inner.constant() {
                    Some(datum) => BoundExpr::Constant(datum.negate()),
                    None => BoundExpr::Not(Box::new(inner)),
                };
                Ok(Bound::Typed(bound, ExprType::Boolean))
            }
        }
    }

    fn bind_function(&mut self, name: &str, args: &[Expr]) -> Result<Bound, CompileError> {
        let lowered = name.to_ascii_lowercase();
        match lowered.as_str() {
            "now" => {
                check_arity(name, args, 0)?;
                Ok(Bound::Typed(BoundExpr::Now, ExprType::Timestamp))
            }
            "timestamp" => {
                check_arity(name, args, 0)?;
                self.cell_dependent = true;
                Ok(Bound::Typed(BoundExpr::CellTimestamp, ExprType::Timestamp))
            }
            "when" | "max_timestamp" => {
                check_arity(name, args, 1)?;
                self.bind_lookup(name, &args[0], Pick::Latest)
            }
            "min_timestamp" => {
                check_arity(name, args, 1)?;
                self.bind_lookup(name, &args[0], Pick::Earliest)
            }
            "to_timestamp" => {
                check_arity(name, args, 1)?;
                let arg = self.bind(&args[0])?.into_timestamp(name)?;
                Ok(Bound::Typed(arg, ExprType::Timestamp))
            }
            "date_trunc" => {
                let (unit, arg, offset) = self.bind_calendar_args::<TimeUnit>(name, args)?;
                let bound = match arg.constant() {
                    Some(Datum::Timestamp(ts)) => BoundExpr::Constant(Datum::from_option(
                        match offset {
                            Some(offset) => ts.trunc_at(unit, offset),
                            None => ts.trunc(unit),
                        },
                    )),
                    _ => BoundExpr::Truncate {
                        unit,
                        offset,
                        arg: Box::new(arg),
                    },
                };
                Ok(Bound::Typed(bound, ExprType::Timestamp))
            }
            "date_part" => {
                let (part, arg, offset) = self.bind_calendar_args::<DatePart>(name, args)?;
                let bound = match arg.constant() {
                    Some(Datum::Timestamp(ts)) => BoundExpr::Constant(
                        match offset {
                            Some(offset) => ts.part_at(part, offset),
                            None => Some(ts.part(part)),
                        }
                        .map(Datum::Integer)
                        .unwrap_or(Datum::Undefined),
                    ),
                    _ => BoundExpr::Part {
                        part,
                        offset,
                        arg: Box::new(arg),
                    },
                };
                Ok(Bound::Typed(bound, ExprType::Integer))
            }
            _ => Err(CompileError::UnknownFunction {
                name: name.to_string(),
            }),
        }
    }

    /// `(<unit>, <timestamp> [, <utc offset>])`, with the unit and offset
    /// given as string literals.
    fn bind_calendar_args<U>(
        &mut self,
        name: &str,
        args: &[Expr],
    ) -> Result<(U, BoundExpr, Option<FixedOffset>), CompileError>
    where
        U: std::str::FromStr,
        U::Err: fmt::Display,
    {
        if args.len() != 2 && args.len() != 3 {
            return Err(CompileError::Arity {
                name: name.to_string(),
                expected: 2,
                found: args.len(),
            });
        }

        let invalid = |reason: String| CompileError::InvalidArgument {
            function: name.to_string(),
            reason,
        };

        let unit = match &args[0] {
            Expr::Literal(Literal::String(unit)) => {
                unit.parse::<U>().map_err(|e| invalid(e.to_string()))?
            }
            other => {
                return Err(invalid(format!(
                    "expected a unit name as first argument, got {}",
                    other
                )));
            }
        };

        let arg = self.bind(&args[1])?.into_timestamp(name)?;

        let offset = match args.get(2) {
            None => None,
            Some(Expr::Literal(Literal::String(text))) => {
                Some(parse_utc_offset(text).map_err(|e| invalid(e.to_string()))?)
            }
            Some(other) => {
                return Err(invalid(format!(
                    "expected a UTC offset string as third argument, got {}",
                    other
                )));
            }
        };

        Ok((unit, arg, offset))
    }

    fn bind_lookup(&mut self, name: &str, arg: &Expr, pick: Pick) -> Result<Bound, CompileError> {
        let bound = match arg {
            Expr::Column(column) => {
                self.columns.push(column.clone());
                BoundExpr::Column {
                    name: column.clone(),
                    pick,
                }
            }
            Expr::Wildcard => {
                self.row_aggregate = true;
                BoundExpr::Row(pick)
            }
            other => {
                return Err(CompileError::InvalidArgument {
                    function: name.to_string(),
                    reason: format!("expected a column name or {{*}}, got {}", other),
                });
            }
        };
        Ok(Bound::Typed(bound, ExprType::Timestamp))
    }

    fn bind_binary(&mut self, op: BinaryOp, lhs: &Expr, rhs: &Expr) -> Result<Bound, CompileError> {
        let lhs = self.bind(lhs)?;
        let rhs = self.bind(rhs)?;
        let context = format!("operator '{}'", op.symbol());

        let (bound, ty) = match op {
            BinaryOp::Add | BinaryOp::Sub => {
                let arith = if op == BinaryOp::Add {
                    ArithOp::Add
                } else {
                    ArithOp::Sub
                };
                let (lhs, rhs, ty) = match (lhs.ty(), rhs.ty(), arith) {
                    (ExprType::Integer, ExprType::Integer, _) => (
                        lhs.into_typed(ExprType::Integer, &context)?,
                        rhs.into_typed(ExprType::Integer, &context)?,
                        ExprType::Integer,
                    ),
                    (ExprType::Interval, ExprType::Interval, _) => (
                        lhs.into_typed(ExprType::Interval, &context)?,
                        rhs.into_typed(ExprType::Interval, &context)?,
                        ExprType::Interval,
                    ),
                    (ExprType::Interval, _, ArithOp::Add) => (
                        lhs.into_typed(ExprType::Interval, &context)?,
                        rhs.into_timestamp(&context)?,
                        ExprType::Timestamp,
                    ),
                    _ => (
                        lhs.into_timestamp(&context)?,
                        rhs.into_typed(ExprType::Interval, &context)?,
                        ExprType::Timestamp,
                    ),
                };
                (fold_arithmetic(arith, lhs, rhs), ty)
            }
            BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
                let operand_ty = match (lhs.ty(), rhs.ty()) {
                    (ExprType::Integer, _) | (_, ExprType::Integer) => ExprType::Integer,
                    _ => ExprType::Timestamp,
                };
                let lhs = lhs.into_typed(operand_ty, &context)?;
                let rhs = rhs.into_typed(operand_ty, &context)?;
                (fold_compare(compare_op(op), lhs, rhs), ExprType::Boolean)
            }
            BinaryOp::Eq | BinaryOp::Ne => {
                // Equality also works on intervals, integers and booleans; text follows its partner.
                let operand_ty = match (lhs.ty(), rhs.ty()) {
                    (ExprType::Interval, _) | (_, ExprType::Interval) => ExprType::Interval,
                    (ExprType::Integer, _) | (_, ExprType::Integer) => ExprType::Integer,
                    (ExprType::Boolean, _) | (_, ExprType::Boolean) => ExprType::Boolean,
                    _ => ExprType::Timestamp,
                };
                let lhs = lhs.into_typed(operand_ty, &context)?;
                let rhs = rhs.into_typed(operand_ty, &context)?;
                (fold_compare(compare_op(op), lhs, rhs), ExprType::Boolean)
            }
            BinaryOp::And | BinaryOp::Or => {
                let lhs = lhs.into_typed(ExprType::Boolean, &context)?;
                let rhs = rhs.into_typed(ExprType::Boolean, &context)?;
                let bound = match (lhs.constant(), rhs.constant(), op) {
                    (Some(l), Some(r), BinaryOp::And) => BoundExpr::Constant(l.and(r)),
                    (Some(l), Some(r), _) => BoundExpr::Constant(l.or(r)),
                    (_, _, BinaryOp::And) => BoundExpr::And(Box::new(lhs), Box::new(rhs)),
                    _ => BoundExpr::Or(Box::new(lhs), Box::new(rhs)),
                };
                (bound, ExprType::Boolean)
            }
        };

        Ok(Bound::Typed(bound, ty))
    }
}

fn check_arity(name: &str, args: &[Expr], expected: usize) -> Result<(), CompileError> {
    if args.len() != expected {
        return Err(CompileError::Arity {
            name: name.to_string(),
            expected,
            found: args.len(),
        });
    }
    Ok(())
}

fn compare_op(op: BinaryOp) -> CompareOp {
    match op {
        BinaryOp::Lt => CompareOp::Lt,
        BinaryOp::Le => CompareOp::Le,
        BinaryOp::Gt => CompareOp::Gt,
        BinaryOp::Ge => CompareOp::Ge,
        BinaryOp::Eq => CompareOp::Eq,
        _ => CompareOp::Ne,
    }
}

fn fold_arithmetic(op: ArithOp, lhs: BoundExpr, rhs: BoundExpr) -> BoundExpr {
    match (lhs.constant(), rhs.constant()) {
        (Some(l), Some(r)) => BoundExpr::Constant(l.arithmetic(op, r)),
        _ => BoundExpr::Arithmetic {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        },
    }
}

fn fold_compare(op: CompareOp, lhs: BoundExpr, rhs: BoundExpr) -> BoundExpr {
    match (lhs.constant(), rhs.constant()) {
        (Some(l), Some(r)) => BoundExpr::Constant(l.compare(op, r)),
        _ => BoundExpr::Compare {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        },
    }
}
