//! Typed predicates accumulated by the builders.

use std::fmt;

use dynoschema_model::AttributeValue;

use crate::error::SchemaError;
use crate::path::AttributePath;

/// Comparison and function operators a predicate can apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    /// Equal (`=`).
    Eq,
    /// Not equal (`<>`).
    Ne,
    /// Less than (`<`).
    Lt,
    /// Less than or equal (`<=`).
    Le,
    /// Greater than (`>`).
    Gt,
    /// Greater than or equal (`>=`).
    Ge,
    /// `path BETWEEN low AND high`, inclusive.
    Between,
    /// `begins_with(path, prefix)`.
    BeginsWith,
    /// `contains(path, operand)`.
    Contains,
    /// `path IN (a, b, ...)`.
    In,
    /// `attribute_exists(path)`.
    Exists,
    /// `attribute_not_exists(path)`.
    NotExists,
}

/// Number of operands an operator takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    /// Exactly this many.
    Exactly(usize),
    /// At least this many.
    AtLeast(usize),
}

impl Arity {
    /// Returns `true` if `count` operands satisfy this arity.
    #[must_use]
    pub fn accepts(self, count: usize) -> bool {
        match self {
            Self::Exactly(n) => count == n,
            Self::AtLeast(n) => count >= n,
        }
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exactly(n) => write!(f, "{n}"),
            Self::AtLeast(n) => write!(f, "at least {n}"),
        }
    }
}

impl Operator {
    /// Operand count this operator takes.
    #[must_use]
    pub fn arity(self) -> Arity {
        match self {
            Self::Eq
            | Self::Ne
            | Self::Lt
            | Self::Le
            | Self::Gt
            | Self::Ge
            | Self::BeginsWith
            | Self::Contains => Arity::Exactly(1),
            Self::Between => Arity::Exactly(2),
            Self::In => Arity::AtLeast(1),
            Self::Exists | Self::NotExists => Arity::Exactly(0),
        }
    }

    /// The infix symbol for binary comparisons.
    #[must_use]
    pub fn symbol(self) -> Option<&'static str> {
        match self {
            Self::Eq => Some("="),
            Self::Ne => Some("<>"),
            Self::Lt => Some("<"),
            Self::Le => Some("<="),
            Self::Gt => Some(">"),
            Self::Ge => Some(">="),
            _ => None,
        }
    }

    /// Returns `true` for `<`, `<=`, `>`, `>=` and `BETWEEN`.
    #[must_use]
    pub fn is_ordering(self) -> bool {
        matches!(
            self,
            Self::Lt | Self::Le | Self::Gt | Self::Ge | Self::Between
        )
    }

    /// The operator's name as used in error messages.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Eq => "EQ",
            Self::Ne => "NE",
            Self::Lt => "LT",
            Self::Le => "LE",
            Self::Gt => "GT",
            Self::Ge => "GE",
            Self::Between => "BETWEEN",
            Self::BeginsWith => "BEGINS_WITH",
            Self::Contains => "CONTAINS",
            Self::In => "IN",
            Self::Exists => "EXISTS",
            Self::NotExists => "NOT_EXISTS",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One condition on one attribute path.
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    path: AttributePath,
    operator: Operator,
    operands: Vec<AttributeValue>,
}

impl Predicate {
    /// Create a predicate, checking the operand count against the operator.
    ///
    /// # Errors
    ///
    /// Returns `SchemaError::Arity` if the operand count is wrong.
    pub fn new(
        path: AttributePath,
        operator: Operator,
        operands: Vec<AttributeValue>,
    ) -> Result<Self, SchemaError> {
        let arity = operator.arity();
        if !arity.accepts(operands.len()) {
            return Err(SchemaError::Arity {
                operator: operator.to_string(),
                expected: arity.to_string(),
                actual: operands.len(),
            });
        }
        Ok(Self {
            path,
            operator,
            operands,
        })
    }

    /// The attribute the condition applies to.
    #[must_use]
    pub fn path(&self) -> &AttributePath {
        &self.path
    }

    /// The operator.
    #[must_use]
    pub fn operator(&self) -> Operator {
        self.operator
    }

    /// Literal operands, in order.
    #[must_use]
    pub fn operands(&self) -> &[AttributeValue] {
        &self.operands
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.path, self.operator)?;
        for (i, operand) in self.operands.iter().enumerate() {
            let sep = if i == 0 { " " } else { ", " };
            write!(f, "{sep}{operand}")?;
        }
        Ok(())
    }
}
