// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Per-facet inclusion state and its compilation to filter expressions.

mod categorical;
mod interval;
mod tags;

pub use categorical::CategoricalFacetFilter;
pub use interval::IntervalFacetFilter;
pub use tags::TagsCategoricalFacetFilter;

use crate::bins::{CompleteFacet, NULL_LABEL};
use crate::encoding::hexify;
use crate::error::{FilterError, Result};
use crate::events::{FilterChange, ListenerId, Notifier};
use crate::schema::FacetKind;
use crate::*;

use indexmap::IndexMap;
use log::debug;

/// Inclusion flag for every bin label of one facet.
///
/// The label set is fixed at construction; every label starts out included.
#[derive(Debug)]
pub struct BinStates {
    facet_id: Rc<str>,
    states: IndexMap<String, bool>,
    notifier: Notifier,
}

impl BinStates {
    pub fn new(facet: &CompleteFacet) -> Self {
        Self {
            facet_id: facet.id.as_str().into(),
            states: facet.labels().map(|l| (l.to_string(), true)).collect(),
            notifier: Notifier::new(),
        }
    }

    pub fn facet_id(&self) -> &str {
        &self.facet_id
    }

    pub fn is_included(&self, label: &str) -> Option<bool> {
        self.states.get(label).copied()
    }

    pub fn set_included(&mut self, label: &str, included: bool) -> Result<()> {
        match self.states.get_mut(label) {
            Some(state) => *state = included,
            None => {
                return Err(FilterError::UnknownBin {
                    facet: self.facet_id.to_string(),
                    label: label.to_string(),
                })
            }
        }
        debug!("{}: `{label}` included={included}", self.facet_id);
        self.notify();
        Ok(())
    }

    pub fn set_all_included(&mut self, included: bool) {
        self.states.values_mut().for_each(|s| *s = included);
        debug!("{}: all bins included={included}", self.facet_id);
        self.notify();
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> + '_ {
        self.states.keys().map(String::as_str)
    }

    pub fn included(&self) -> impl Iterator<Item = &str> + '_ {
        self.states
            .iter()
            .filter(|(_, included)| **included)
            .map(|(l, _)| l.as_str())
    }

    pub fn excluded(&self) -> impl Iterator<Item = &str> + '_ {
        self.states
            .iter()
            .filter(|(_, included)| !**included)
            .map(|(l, _)| l.as_str())
    }

    pub fn all_included(&self) -> bool {
        self.states.values().all(|s| *s)
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    fn notify(&self) {
        self.notifier.emit(&FilterChange {
            facet_id: self.facet_id.clone(),
        });
    }
}

/// Operations shared by every facet filter variant.
pub trait BinFilter {
    fn states(&self) -> &BinStates;

    fn states_mut(&mut self) -> &mut BinStates;

    /// Compiles the current state to an expression fragment. The empty string
    /// means the filter excludes nothing.
    fn as_expression(&self) -> Result<String>;

    fn facet_id(&self) -> &str {
        self.states().facet_id()
    }

    /// `None` if `label` is not one of the facet's bins.
    fn is_included(&self, label: &str) -> Option<bool> {
        self.states().is_included(label)
    }

    fn labels(&self) -> Vec<&str> {
        self.states().labels().collect()
    }

    fn included_labels(&self) -> Vec<&str> {
        self.states().included().collect()
    }

    fn excluded_labels(&self) -> Vec<&str> {
        self.states().excluded().collect()
    }

    fn set_included(&mut self, label: &str, included: bool) -> Result<()> {
        self.states_mut().set_included(label, included)
    }

    fn set_all_included(&mut self, included: bool) {
        self.states_mut().set_all_included(included)
    }

    fn on_change(&self, listener: impl FnMut(&FilterChange) + 'static) -> ListenerId
    where
        Self: Sized,
    {
        self.states().notifier().subscribe(listener)
    }

    fn off(&self, id: ListenerId) -> bool {
        self.states().notifier().unsubscribe(id)
    }
}

/// A facet filter of any kind.
#[derive(Debug)]
pub enum FacetFilter {
    Categorical(CategoricalFacetFilter),
    TagsCategorical(TagsCategoricalFacetFilter),
    Interval(IntervalFacetFilter),
}

impl FacetFilter {
    pub fn new(kind: FacetKind, facet: &CompleteFacet) -> Self {
        match kind {
            FacetKind::Categorical => Self::Categorical(CategoricalFacetFilter::new(facet)),
            FacetKind::TagsCategorical => {
                Self::TagsCategorical(TagsCategoricalFacetFilter::new(facet))
            }
            FacetKind::Interval => Self::Interval(IntervalFacetFilter::new(facet)),
        }
    }

    pub fn kind(&self) -> FacetKind {
        match self {
            Self::Categorical(_) => FacetKind::Categorical,
            Self::TagsCategorical(_) => FacetKind::TagsCategorical,
            Self::Interval(_) => FacetKind::Interval,
        }
    }

    /// Whether the filter currently constrains anything.
    pub fn is_active(&self) -> bool {
        match self {
            Self::TagsCategorical(_) => !self.states().all_included(),
            _ => self.states().excluded().next().is_some(),
        }
    }
}

impl BinFilter for FacetFilter {
    fn states(&self) -> &BinStates {
        match self {
            Self::Categorical(f) => f.states(),
            Self::TagsCategorical(f) => f.states(),
            Self::Interval(f) => f.states(),
        }
    }

    fn states_mut(&mut self) -> &mut BinStates {
        match self {
            Self::Categorical(f) => f.states_mut(),
            Self::TagsCategorical(f) => f.states_mut(),
            Self::Interval(f) => f.states_mut(),
        }
    }

    fn as_expression(&self) -> Result<String> {
        match self {
            Self::Categorical(f) => f.as_expression(),
            Self::TagsCategorical(f) => f.as_expression(),
            Self::Interval(f) => f.as_expression(),
        }
    }
}

/// Identifier token for a facet id.
fn ident(facet_id: &str) -> String {
    hexify(facet_id)
}

/// Literal for a bin label. The null sentinel becomes the `null` literal so it
/// is never sent as a string.
fn label_literal(label: &str) -> String {
    if label == NULL_LABEL {
        "null".to_string()
    } else {
        format!("\"{}\"", hexify(label))
    }
}

fn array_literal<'a>(
    items: impl Iterator<Item = &'a str>,
    literal: fn(&str) -> String,
) -> String {
    let items: Vec<String> = items.map(literal).collect();
    format!("[{}]", items.join(","))
}
