//! Filter predicate expressions for scans.
//!
//! Metadata table scans pass the filter through unchanged as the residual of
//! every task; the execution path evaluates it against produced rows.
//!
//! `field_id` is the canonical identifier for columns. The `column` name is
//! stored for display only and is never used for lookup.

use std::fmt;

/// Comparison operators for filter expressions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonOp {
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
}

impl ComparisonOp {
    /// Get the negation of this operator.
    pub fn negate(&self) -> Self {
        match self {
            Self::Eq => Self::NotEq,
            Self::NotEq => Self::Eq,
            Self::Lt => Self::GtEq,
            Self::LtEq => Self::Gt,
            Self::Gt => Self::LtEq,
            Self::GtEq => Self::Lt,
        }
    }
}

impl fmt::Display for ComparisonOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Eq => write!(f, "="),
            Self::NotEq => write!(f, "!="),
            Self::Lt => write!(f, "<"),
            Self::LtEq => write!(f, "<="),
            Self::Gt => write!(f, ">"),
            Self::GtEq => write!(f, ">="),
        }
    }
}

/// Literal values for comparisons against metadata table columns.
#[derive(Debug, Clone, PartialEq)]
pub enum LiteralValue {
    Boolean(bool),
    Int32(i32),
    Int64(i64),
    String(String),
}

impl fmt::Display for LiteralValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Boolean(v) => write!(f, "{}", v),
            Self::Int32(v) => write!(f, "{}", v),
            Self::Int64(v) => write!(f, "{}L", v),
            Self::String(v) => write!(f, "'{}'", v),
        }
    }
}

/// Filter expression tree.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Expression {
    /// Always true (no filtering)
    #[default]
    AlwaysTrue,
    /// Always false (no results)
    AlwaysFalse,
    Not(Box<Expression>),
    And(Vec<Expression>),
    Or(Vec<Expression>),
    IsNull {
        field_id: i32,
        column: String,
    },
    IsNotNull {
        field_id: i32,
        column: String,
    },
    Comparison {
        field_id: i32,
        column: String,
        op: ComparisonOp,
        value: LiteralValue,
    },
}

impl Expression {
    fn comparison(field_id: i32, column: impl Into<String>, op: ComparisonOp, value: LiteralValue) -> Self {
        Self::Comparison {
            field_id,
            column: column.into(),
            op,
            value,
        }
    }

    pub fn eq(field_id: i32, column: impl Into<String>, value: LiteralValue) -> Self {
        Self::comparison(field_id, column, ComparisonOp::Eq, value)
    }

    pub fn not_eq(field_id: i32, column: impl Into<String>, value: LiteralValue) -> Self {
        Self::comparison(field_id, column, ComparisonOp::NotEq, value)
    }

    pub fn lt(field_id: i32, column: impl Into<String>, value: LiteralValue) -> Self {
        Self::comparison(field_id, column, ComparisonOp::Lt, value)
    }

    pub fn gt(field_id: i32, column: impl Into<String>, value: LiteralValue) -> Self {
        Self::comparison(field_id, column, ComparisonOp::Gt, value)
    }

    pub fn is_null(field_id: i32, column: impl Into<String>) -> Self {
        Self::IsNull {
            field_id,
            column: column.into(),
        }
    }

    pub fn is_not_null(field_id: i32, column: impl Into<String>) -> Self {
        Self::IsNotNull {
            field_id,
            column: column.into(),
        }
    }

    /// Create a logical AND of expressions.
    pub fn and(exprs: Vec<Expression>) -> Self {
        // Flatten nested ANDs and filter out AlwaysTrue
        let mut flattened = Vec::new();
        for expr in exprs {
            match expr {
                Expression::AlwaysTrue => continue,
                Expression::AlwaysFalse => return Expression::AlwaysFalse,
                Expression::And(inner) => flattened.extend(inner),
                other => flattened.push(other),
            }
        }

        match flattened.len() {
            0 => Expression::AlwaysTrue,
            1 => flattened.swap_remove(0),
            _ => Expression::And(flattened),
        }
    }

    /// Create a logical OR of expressions.
    pub fn or(exprs: Vec<Expression>) -> Self {
        let mut flattened = Vec::new();
        for expr in exprs {
            match expr {
                Expression::AlwaysFalse => continue,
                Expression::AlwaysTrue => return Expression::AlwaysTrue,
                Expression::Or(inner) => flattened.extend(inner),
                other => flattened.push(other),
            }
        }

        match flattened.len() {
            0 => Expression::AlwaysFalse,
            1 => flattened.swap_remove(0),
            _ => Expression::Or(flattened),
        }
    }

    /// Create a logical NOT.
    pub fn negate(expr: Expression) -> Self {
        match expr {
            Expression::AlwaysTrue => Expression::AlwaysFalse,
            Expression::AlwaysFalse => Expression::AlwaysTrue,
            Expression::Not(inner) => *inner,
            Expression::Comparison {
                field_id,
                column,
                op,
                value,
            } => Expression::Comparison {
                field_id,
                column,
                op: op.negate(),
                value,
            },
            other => Expression::Not(Box::new(other)),
        }
    }

    pub fn is_always_true(&self) -> bool {
        matches!(self, Expression::AlwaysTrue)
    }

    /// Get all field IDs referenced by this expression.
    pub fn referenced_field_ids(&self) -> Vec<i32> {
        let mut ids = Vec::new();
        self.collect_field_ids(&mut ids);
        ids.sort();
        ids.dedup();
        ids
    }

    fn collect_field_ids(&self, ids: &mut Vec<i32>) {
        match self {
            Expression::AlwaysTrue | Expression::AlwaysFalse => {}
            Expression::Not(inner) => inner.collect_field_ids(ids),
            Expression::And(exprs) | Expression::Or(exprs) => {
                for expr in exprs {
                    expr.collect_field_ids(ids);
                }
            }
            Expression::IsNull { field_id, .. }
            | Expression::IsNotNull { field_id, .. }
            | Expression::Comparison { field_id, .. } => ids.push(*field_id),
        }
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::AlwaysTrue => write!(f, "TRUE"),
            Expression::AlwaysFalse => write!(f, "FALSE"),
            Expression::Not(inner) => write!(f, "NOT ({})", inner),
            Expression::And(exprs) => {
                let parts: Vec<String> = exprs.iter().map(|e| e.to_string()).collect();
                write!(f, "({})", parts.join(" AND "))
            }
            Expression::Or(exprs) => {
                let parts: Vec<String> = exprs.iter().map(|e| e.to_string()).collect();
                write!(f, "({})", parts.join(" OR "))
            }
            Expression::IsNull { column, .. } => write!(f, "{} IS NULL", column),
            Expression::IsNotNull { column, .. } => write!(f, "{} IS NOT NULL", column),
            Expression::Comparison {
                column, op, value, ..
            } => write!(f, "{} {} {}", column, op, value),
        }
    }
}
