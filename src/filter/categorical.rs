// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use super::{array_literal, ident, label_literal, BinFilter, BinStates};
use crate::bins::CompleteFacet;
use crate::error::Result;

/// Filter over a single-valued field.
///
/// Compiles to `(<id> not in [<excluded labels>])`, or nothing when every bin
/// is included.
#[derive(Debug)]
pub struct CategoricalFacetFilter {
    states: BinStates,
}

impl CategoricalFacetFilter {
    pub fn new(facet: &CompleteFacet) -> Self {
        Self {
            states: BinStates::new(facet),
        }
    }
}

impl BinFilter for CategoricalFacetFilter {
    fn states(&self) -> &BinStates {
        &self.states
    }

    fn states_mut(&mut self) -> &mut BinStates {
        &mut self.states
    }

    fn as_expression(&self) -> Result<String> {
        if self.states.excluded().next().is_none() {
            return Ok(String::new());
        }
        Ok(format!(
            "({} not in {})",
            ident(self.states.facet_id()),
            array_literal(self.states.excluded(), label_literal)
        ))
    }
}
