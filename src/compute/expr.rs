//! Unbound `WHEN` expression tree.
//!
//! This is the shape a front-end parser hands over. Nothing here is checked:
//! function names, arity and operand types are validated when the tree is
//! compiled (see [`crate::compute::bind`]). The tree is serde-friendly so a
//! predicate can also arrive as JSON.

use cellwhen_types::{Interval, Timestamp};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Constant leaf.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Literal {
    Timestamp(Timestamp),
    Interval(Interval),
    Integer(i64),
    /// Text; coerced to a timestamp wherever one is expected
    String(String),
    Boolean(bool),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BinaryOp {
    Add,
    Sub,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
    And,
    Or,
}

impl BinaryOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::Eq => "=",
            BinaryOp::Ne => "!=",
            BinaryOp::And => "AND",
            BinaryOp::Or => "OR",
        }
    }
}

/// `WHEN` syntax tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Expr {
    Literal(Literal),
    /// Column reference, legal only as a function argument
    Column(String),
    /// The `{*}` row marker, legal only as a function argument
    Wildcard,
    Function {
        name: String,
        #[serde(default)]
        args: Vec<Expr>,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    /// Inclusive range test
    Between {
        expr: Box<Expr>,
        low: Box<Expr>,
        high: Box<Expr>,
        #[serde(default)]
        negated: bool,
    },
    Not(Box<Expr>),
}

impl Expr {
    pub fn call(name: impl Into<String>, args: Vec<Expr>) -> Self {
        Expr::Function {
            name: name.into(),
            args,
        }
    }

    /// `now()`
    pub fn now() -> Self {
        Self::call("now", Vec::new())
    }

    /// `timestamp()`
    pub fn timestamp() -> Self {
        Self::call("timestamp", Vec::new())
    }

    /// `when(<column>)`
    pub fn when(column: impl Into<String>) -> Self {
        Self::call("when", vec![Expr::Column(column.into())])
    }

    /// `when({*})`
    pub fn when_row() -> Self {
        Self::call("when", vec![Expr::Wildcard])
    }

    pub fn column(name: impl Into<String>) -> Self {
        Expr::Column(name.into())
    }

    pub fn at(ts: Timestamp) -> Self {
        Expr::Literal(Literal::Timestamp(ts))
    }

    pub fn interval(interval: Interval) -> Self {
        Expr::Literal(Literal::Interval(interval))
    }

    pub fn integer(value: i64) -> Self {
        Expr::Literal(Literal::Integer(value))
    }

    pub fn string(text: impl Into<String>) -> Self {
        Expr::Literal(Literal::String(text.into()))
    }

    pub fn boolean(value: bool) -> Self {
        Expr::Literal(Literal::Boolean(value))
    }

    pub fn binary(self, op: BinaryOp, rhs: Expr) -> Self {
        Expr::Binary {
            op,
            lhs: Box::new(self),
            rhs: Box::new(rhs),
        }
    }

    pub fn plus(self, rhs: Expr) -> Self {
        self.binary(BinaryOp::Add, rhs)
    }

    pub fn minus(self, rhs: Expr) -> Self {
        self.binary(BinaryOp::Sub, rhs)
    }

    pub fn lt(self, rhs: Expr) -> Self {
        self.binary(BinaryOp::Lt, rhs)
    }

    pub fn le(self, rhs: Expr) -> Self {
        self.binary(BinaryOp::Le, rhs)
    }

    pub fn gt(self, rhs: Expr) -> Self {
        self.binary(BinaryOp::Gt, rhs)
    }

    pub fn ge(self, rhs: Expr) -> Self {
        self.binary(BinaryOp::Ge, rhs)
    }

    pub fn equals(self, rhs: Expr) -> Self {
        self.binary(BinaryOp::Eq, rhs)
    }

    pub fn not_equals(self, rhs: Expr) -> Self {
        self.binary(BinaryOp::Ne, rhs)
    }

    pub fn and(self, rhs: Expr) -> Self {
        self.binary(BinaryOp::And, rhs)
    }

    pub fn or(self, rhs: Expr) -> Self {
        self.binary(BinaryOp::Or, rhs)
    }

    pub fn between(self, low: Expr, high: Expr) -> Self {
        Expr::Between {
            expr: Box::new(self),
            low: Box::new(low),
            high: Box::new(high),
            negated: false,
        }
    }

    pub fn not_between(self, low: Expr, high: Expr) -> Self {
        Expr::Between {
            expr: Box::new(self),
            low: Box::new(low),
            high: Box::new(high),
            negated: true,
        }
    }

    pub fn negate(self) -> Self {
        Expr::Not(Box::new(self))
    }

    fn is_compound(&self) -> bool {
        matches!(
            self,
            Expr::Binary { .. } | Expr::Between { .. } | Expr::Not(_)
        )
    }
}

struct Operand<'a>(&'a Expr);

impl fmt::Display for Operand<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_compound() {
            write!(f, "({})", self.0)
        } else {
            write!(f, "{}", self.0)
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Timestamp(ts) => write!(f, "TIMESTAMP '{}'", ts),
            Literal::Interval(iv) => write!(f, "INTERVAL '{}'", iv),
            Literal::Integer(value) => write!(f, "{}", value),
            Literal::String(text) => write!(f, "'{}'", text.replace('\'', "''")),
            Literal::Boolean(true) => f.write_str("TRUE"),
            Literal::Boolean(false) => f.write_str("FALSE"),
        }
    }
}

/// SQL-like rendering, used in log lines and error context.
impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Literal(literal) => write!(f, "{}", literal),
            Expr::Column(name) => f.write_str(name),
            Expr::Wildcard => f.write_str("{*}"),
            Expr::Function { name, args } => {
                write!(f, "{}(", name)?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                f.write_str(")")
            }
            Expr::Binary { op, lhs, rhs } => {
                write!(f, "{} {} {}", Operand(lhs), op.symbol(), Operand(rhs))
            }
            Expr::Between {
                expr,
                low,
                high,
                negated,
            } => write!(
                f,
                "{} {}BETWEEN {} AND {}",
                Operand(expr),
                if *negated { "NOT " } else { "" },
                Operand(low),
                Operand(high)
            ),
            Expr::Not(inner) => write!(f, "NOT {}", Operand(inner)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_between() {
        let expr = Expr::timestamp().between(
            Expr::now().minus(Expr::interval(Interval::days(1))),
            Expr::when_row(),
        );
        assert_eq!(
            expr.to_string(),
            "timestamp() BETWEEN (now() - INTERVAL '1d') AND when({*})"
        );
    }

    #[test]
    fn test_display_comparison() {
        let expr = Expr::when("y")
            .gt(Expr::now().plus(Expr::interval(Interval::seconds(2))))
            .negate();
        assert_eq!(
            expr.to_string(),
            "NOT (when(y) > (now() + INTERVAL '2s'))"
        );
    }

    #[test]
    fn test_display_date_part() {
        let expr = Expr::call(
            "date_part",
            vec![Expr::string("hour"), Expr::timestamp(), Expr::string("+05:00")],
        )
        .lt(Expr::integer(12));
        assert_eq!(
            expr.to_string(),
            "date_part('hour', timestamp(), '+05:00') < 12"
        );
    }

    #[test]
    fn test_string_literal_escaping() {
        assert_eq!(Expr::string("it's").to_string(), "'it''s'");
    }

    #[test]
    fn test_json_shape() {
        let expr: Expr = serde_json::from_value(serde_json::json!({
            "binary": {
                "op": "lt",
                "lhs": { "function": { "name": "timestamp" } },
                "rhs": { "function": { "name": "when", "args": [ { "column": "x" } ] } }
            }
        }))
        .unwrap();
        assert_eq!(expr, Expr::timestamp().lt(Expr::when("x")));
    }

    #[test]
    fn test_json_round_trip_with_literals() {
        let expr = Expr::timestamp().between(
            Expr::when_row().plus(Expr::interval(Interval::seconds(1))),
            Expr::string("2026-01-01"),
        );
        let json = serde_json::to_string(&expr).unwrap();
        let back: Expr = serde_json::from_str(&json).unwrap();
        assert_eq!(back, expr);
    }
}
