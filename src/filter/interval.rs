// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use super::{ident, BinFilter, BinStates};
use crate::bins::{parse_interval_label, CompleteFacet, NULL_LABEL};
use crate::error::{FilterError, Result};

/// Filter over a numeric field binned into `[low - high)` ranges.
///
/// Excluded ranges are merged where they touch and each merged range is
/// written as `(not (<id> >= low) or not (<id> < high))`, since the grammar
/// has no range operator.
#[derive(Debug)]
pub struct IntervalFacetFilter {
    states: BinStates,
}

impl IntervalFacetFilter {
    pub fn new(facet: &CompleteFacet) -> Self {
        Self {
            states: BinStates::new(facet),
        }
    }

    /// Excluded ranges, sorted and merged.
    pub fn excluded_ranges(&self) -> Result<Vec<(f64, f64)>> {
        let mut ranges = vec![];
        for label in self.states.excluded().filter(|l| *l != NULL_LABEL) {
            match parse_interval_label(label) {
                Some(range) => ranges.push(range),
                None => {
                    return Err(FilterError::MalformedBinLabel {
                        facet: self.states.facet_id().to_string(),
                        label: label.to_string(),
                    })
                }
            }
        }
        Ok(merge_ranges(ranges))
    }
}

/// Sorts ranges and joins those that touch or overlap. Duplicates collapse.
fn merge_ranges(mut ranges: Vec<(f64, f64)>) -> Vec<(f64, f64)> {
    ranges.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.total_cmp(&b.1)));

    let mut merged: Vec<(f64, f64)> = Vec::with_capacity(ranges.len());
    for (low, high) in ranges {
        match merged.last_mut() {
            Some(last) if low <= last.1 => last.1 = last.1.max(high),
            _ => merged.push((low, high)),
        }
    }
    merged
}

impl BinFilter for IntervalFacetFilter {
    fn states(&self) -> &BinStates {
        &self.states
    }

    fn states_mut(&mut self) -> &mut BinStates {
        &mut self.states
    }

    fn as_expression(&self) -> Result<String> {
        let id = ident(self.states.facet_id());
        let mut clauses: Vec<String> = self
            .excluded_ranges()?
            .into_iter()
            .map(|(low, high)| format!("(not ({id} >= {low}) or not ({id} < {high}))"))
            .collect();

        if self.states.is_included(NULL_LABEL) == Some(false) {
            clauses.push(format!("({id} not in [null])"));
        }

        if clauses.is_empty() {
            return Ok(String::new());
        }
        Ok(format!("({})", clauses.join(" and ")))
    }
}
