// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::ast::Expr;
use crate::bins::{CompleteFacet, Histogram};
use crate::error::{FilterError, Result};
use crate::events::{FilterChange, ListenerId, Notifier};
use crate::filter::{BinFilter, FacetFilter};
use crate::postprocess::PostProcessor;
use crate::schema::FacetRegistry;
use crate::*;

use indexmap::IndexMap;
use log::{debug, error};

/// One facet filter per facet, combined into a single filter expression.
///
/// Changes to any facet filter are re-emitted by the aggregator, so a single
/// listener sees every mutation.
#[derive(Debug)]
pub struct FilterAggregator {
    filters: IndexMap<String, FacetFilter>,
    notifier: Notifier,
    post: PostProcessor,
}

impl FilterAggregator {
    pub fn new(
        registry: Rc<FacetRegistry>,
        complete_facets: impl IntoIterator<Item = CompleteFacet>,
    ) -> Result<Self> {
        let mut aggregator = Self {
            filters: IndexMap::new(),
            notifier: Notifier::new(),
            post: PostProcessor::new(registry),
        };
        aggregator.initialize(complete_facets)?;
        Ok(aggregator)
    }

    /// Builds filters for every facet of a histogram snapshot.
    pub fn from_histogram(registry: Rc<FacetRegistry>, histogram: &Histogram) -> Result<Self> {
        Self::new(registry, histogram.facets.iter().cloned())
    }

    /// Replaces every facet filter. On error the previous filters are kept.
    pub fn initialize(
        &mut self,
        complete_facets: impl IntoIterator<Item = CompleteFacet>,
    ) -> Result<()> {
        let mut filters = IndexMap::new();
        for facet in complete_facets {
            if filters.contains_key(&facet.id) {
                return Err(FilterError::InvalidConfig(format!(
                    "facet '{}' supplied more than once",
                    facet.id
                )));
            }
            let filter = self.build_filter(&facet)?;
            filters.insert(facet.id, filter);
        }
        debug!("initialized {} facet filters", filters.len());
        self.filters = filters;
        Ok(())
    }

    fn build_filter(&self, facet: &CompleteFacet) -> Result<FacetFilter> {
        let schema = self.post.registry().lookup(&facet.id)?;
        let filter = FacetFilter::new(schema.kind, facet);
        let notifier = self.notifier.clone();
        filter.on_change(move |change| notifier.emit(change));
        Ok(filter)
    }

    pub fn registry(&self) -> &FacetRegistry {
        self.post.registry()
    }

    pub fn facet_filter(&self, facet_id: &str) -> Result<&FacetFilter> {
        self.filters
            .get(facet_id)
            .ok_or_else(|| FilterError::UnknownFacet(facet_id.to_string()))
    }

    pub fn facet_filter_mut(&mut self, facet_id: &str) -> Result<&mut FacetFilter> {
        self.filters
            .get_mut(facet_id)
            .ok_or_else(|| FilterError::UnknownFacet(facet_id.to_string()))
    }

    /// Facet ids in initialization order.
    pub fn facet_ids(&self) -> impl Iterator<Item = &str> + '_ {
        self.filters.keys().map(String::as_str)
    }

    pub fn filters(&self) -> impl Iterator<Item = &FacetFilter> + '_ {
        self.filters.values()
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Active facet expressions joined with `and`. Empty when no facet
    /// filter constrains anything.
    pub fn as_expression(&self) -> Result<String> {
        let mut clauses = vec![];
        for filter in self.filters.values() {
            let clause = filter.as_expression()?;
            if !clause.is_empty() {
                clauses.push(clause);
            }
        }
        Ok(clauses.join(" and "))
    }

    /// The decoded, type-annotated syntax tree of [`Self::as_expression`], or
    /// `None` when there is nothing to filter.
    pub fn as_ast(&self) -> Result<Option<Expr>> {
        let expression = self.as_expression()?;
        if expression.is_empty() {
            return Ok(None);
        }
        debug!("compiling filter expression: {expression}");
        self.post.compile(&expression).map(Some)
    }

    /// [`Self::as_ast`] serialized as compact json. `None` means the query
    /// parameter should be omitted.
    pub fn as_query_param(&self) -> Result<Option<String>> {
        match self.as_ast()? {
            Some(ast) => match serde_json::to_string(&ast) {
                Ok(json) => Ok(Some(json)),
                Err(e) => {
                    error!("could not serialize filter: {e}");
                    Err(FilterError::Internal(e.to_string()))
                }
            },
            None => Ok(None),
        }
    }

    pub fn on_change(&self, listener: impl FnMut(&FilterChange) + 'static) -> ListenerId {
        self.notifier.subscribe(listener)
    }

    pub fn off(&self, id: ListenerId) -> bool {
        self.notifier.unsubscribe(id)
    }

    /// Includes every bin of every facet.
    pub fn reset(&mut self) {
        for filter in self.filters.values_mut() {
            filter.set_all_included(true);
        }
    }

    /// Replaces the filter of an already known facet with one built from a
    /// refreshed bin set. The new filter starts with every bin included.
    pub fn rebuild_facet(&mut self, facet: CompleteFacet) -> Result<()> {
        if !self.filters.contains_key(&facet.id) {
            return Err(FilterError::UnknownFacet(facet.id));
        }
        let filter = self.build_filter(&facet)?;
        debug!("{}: rebuilt with {} bins", facet.id, filter.states().len());
        self.filters.insert(facet.id.clone(), filter);
        self.notifier.emit(&FilterChange {
            facet_id: facet.id.as_str().into(),
        });
        Ok(())
    }
}
