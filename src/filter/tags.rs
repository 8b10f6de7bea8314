// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use super::{array_literal, ident, label_literal, BinFilter, BinStates};
use crate::bins::{CompleteFacet, NULL_LABEL};
use crate::error::Result;

/// Filter over a list-valued field such as image tags.
///
/// Compiles to `(<id> in [<included labels>])`. An item without tags is
/// stored with an empty list, so the `__null__` bin matches `[]`.
#[derive(Debug)]
pub struct TagsCategoricalFacetFilter {
    states: BinStates,
}

impl TagsCategoricalFacetFilter {
    pub fn new(facet: &CompleteFacet) -> Self {
        Self {
            states: BinStates::new(facet),
        }
    }
}

fn tag_literal(label: &str) -> String {
    if label == NULL_LABEL {
        "[]".to_string()
    } else {
        label_literal(label)
    }
}

impl BinFilter for TagsCategoricalFacetFilter {
    fn states(&self) -> &BinStates {
        &self.states
    }

    fn states_mut(&mut self) -> &mut BinStates {
        &mut self.states
    }

    fn as_expression(&self) -> Result<String> {
        if self.states.all_included() {
            return Ok(String::new());
        }
        Ok(format!(
            "({} in {})",
            ident(self.states.facet_id()),
            array_literal(self.states.included(), tag_literal)
        ))
    }
}
