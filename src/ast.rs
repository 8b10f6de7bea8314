// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Filter expression syntax tree.
//!
//! Serialized form, as consumed by the image query endpoint:
//!
//! ```text
//! comparison / combinator  {"operator": "not in", "operands": [<operand>, ...]}
//! identifier operand       {"identifier": "meta.clinical.sex", "type": "string"}
//! literal operand          plain json value: "female", 5, true, null, ["a", []]
//! ```
//!
//! `operator` is one of `=`, `>=`, `<`, `in`, `not in`, `and`, `or`, `not`.
//! Comparisons have two operands (identifier, literal), `and`/`or` have two
//! nested nodes and `not` has one. `type` is `null` when no coercion applies.

use crate::lexer::*;
use crate::schema::CoerceType;
use crate::value::Value;

use core::fmt;

use serde::ser::{SerializeMap, SerializeSeq, Serializer};
use serde::Serialize;

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum CompareOp {
    Eq,
    Ge,
    Lt,
    In,
    NotIn,
}

impl CompareOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::Ge => ">=",
            CompareOp::Lt => "<",
            CompareOp::In => "in",
            CompareOp::NotIn => "not in",
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum BoolOp {
    And,
    Or,
}

impl BoolOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            BoolOp::And => "and",
            BoolOp::Or => "or",
        }
    }
}

/// Reference to a facet, the left operand of every comparison.
#[derive(Debug, Clone)]
pub struct Identifier {
    pub span: Span,
    pub name: String,
    /// Set by type annotation; `None` means the operand is used as-is.
    pub coerce_to_type: Option<CoerceType>,
}

impl Serialize for Identifier {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry("identifier", &self.name)?;
        map.serialize_entry("type", &self.coerce_to_type)?;
        map.end()
    }
}

#[derive(Debug, Clone)]
pub struct Literal {
    pub span: Span,
    pub value: Value,
}

impl Serialize for Literal {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.value.serialize(serializer)
    }
}

#[derive(Debug, Clone)]
pub enum Expr {
    Compare {
        span: Span,
        op: CompareOp,
        lhs: Identifier,
        rhs: Literal,
    },

    BoolExpr {
        span: Span,
        op: BoolOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },

    Not {
        span: Span,
        expr: Box<Expr>,
    },
}

impl Expr {
    pub fn span(&self) -> &Span {
        use Expr::*;
        match self {
            Compare { span, .. } | BoolExpr { span, .. } | Not { span, .. } => span,
        }
    }

    pub fn operator(&self) -> &'static str {
        match self {
            Expr::Compare { op, .. } => op.as_str(),
            Expr::BoolExpr { op, .. } => op.as_str(),
            Expr::Not { .. } => "not",
        }
    }

    /// Comparison nodes in source order.
    pub fn comparisons(&self) -> Vec<&Expr> {
        let mut out = vec![];
        self.collect_comparisons(&mut out);
        out
    }

    fn collect_comparisons<'a>(&'a self, out: &mut Vec<&'a Expr>) {
        match self {
            Expr::Compare { .. } => out.push(self),
            Expr::BoolExpr { lhs, rhs, .. } => {
                lhs.collect_comparisons(out);
                rhs.collect_comparisons(out);
            }
            Expr::Not { expr, .. } => expr.collect_comparisons(out),
        }
    }
}

struct Operands<'a>(&'a Expr);

impl Serialize for Operands<'_> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self.0 {
            Expr::Compare { lhs, rhs, .. } => {
                let mut seq = serializer.serialize_seq(Some(2))?;
                seq.serialize_element(lhs)?;
                seq.serialize_element(rhs)?;
                seq.end()
            }
            Expr::BoolExpr { lhs, rhs, .. } => {
                let mut seq = serializer.serialize_seq(Some(2))?;
                seq.serialize_element(lhs.as_ref())?;
                seq.serialize_element(rhs.as_ref())?;
                seq.end()
            }
            Expr::Not { expr, .. } => {
                let mut seq = serializer.serialize_seq(Some(1))?;
                seq.serialize_element(expr.as_ref())?;
                seq.end()
            }
        }
    }
}

impl Serialize for Expr {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry("operator", self.operator())?;
        map.serialize_entry("operands", &Operands(self))?;
        map.end()
    }
}

/// Renders the node in the grammar's syntax, fully parenthesized.
impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Compare { op, lhs, rhs, .. } => {
                write!(f, "({} {} {})", lhs.name, op.as_str(), rhs.value)
            }
            Expr::BoolExpr { op, lhs, rhs, .. } => {
                write!(f, "({lhs} {} {rhs})", op.as_str())
            }
            Expr::Not { expr, .. } => write!(f, "not {expr}"),
        }
    }
}
