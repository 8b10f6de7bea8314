// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::ast::Expr;
use crate::encoding;
use crate::error::{FilterError, Result};
use crate::parser::Grammar;
use crate::schema::{CoerceType, FacetRegistry};
use crate::*;

use log::{debug, error};

/// Turns compiled filter expressions into server-ready syntax trees.
///
/// Identifiers and string literals are percent-decoded, then every comparison
/// is annotated with the coercion type of the facet it references.
#[derive(Debug, Clone)]
pub struct PostProcessor {
    registry: Rc<FacetRegistry>,
    grammar: Grammar,
}

impl PostProcessor {
    pub fn new(registry: Rc<FacetRegistry>) -> Self {
        Self {
            registry,
            grammar: Grammar::new(),
        }
    }

    pub fn registry(&self) -> &FacetRegistry {
        &self.registry
    }

    /// Parses `expression` and runs both passes over the result.
    ///
    /// The expression is expected to come from the facet filters, so parse and
    /// decode failures are reported as [`FilterError::Internal`].
    pub fn compile(&self, expression: &str) -> Result<Expr> {
        let mut ast = self
            .grammar
            .parse(expression)
            .map_err(|e| internal("generated filter expression does not parse", e))?;
        self.dehexify(&mut ast)?;
        self.annotate_types(&mut ast)?;
        debug!("compiled filter: {ast}");
        Ok(ast)
    }

    /// Percent-decodes identifier names and string literals in place.
    pub fn dehexify(&self, expr: &mut Expr) -> Result<()> {
        match expr {
            Expr::Compare { lhs, rhs, .. } => {
                lhs.name = encoding::dehexify(&lhs.name)
                    .map_err(|e| internal("could not decode identifier", e))?;
                rhs.value
                    .for_each_string_mut(&mut |s| {
                        *s = encoding::dehexify(s)?;
                        Ok(())
                    })
                    .map_err(|e| internal("could not decode literal", e))
            }
            Expr::BoolExpr { lhs, rhs, .. } => {
                self.dehexify(lhs)?;
                self.dehexify(rhs)
            }
            Expr::Not { expr, .. } => self.dehexify(expr),
        }
    }

    /// Fills in the coercion type of every comparison whose type is unset.
    /// `object` facets are left unset.
    pub fn annotate_types(&self, expr: &mut Expr) -> Result<()> {
        match expr {
            Expr::Compare { lhs, .. } => {
                if lhs.coerce_to_type.is_none() {
                    let schema = self.registry.lookup(&lhs.name)?;
                    if schema.coerce_to_type != CoerceType::Object {
                        lhs.coerce_to_type = Some(schema.coerce_to_type);
                    }
                }
                Ok(())
            }
            Expr::BoolExpr { lhs, rhs, .. } => {
                self.annotate_types(lhs)?;
                self.annotate_types(rhs)
            }
            Expr::Not { expr, .. } => self.annotate_types(expr),
        }
    }
}

fn internal(context: &str, e: anyhow::Error) -> FilterError {
    error!("{context}: {e}");
    FilterError::Internal(format!("{context}: {e}"))
}
