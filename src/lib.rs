// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

// Use README.md as crate documentation.
#![doc = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/README.md"))]

use std::rc::Rc;

mod aggregator;
mod ast;
mod bins;
mod encoding;
mod error;
mod events;
mod filter;
mod lexer;
mod parser;
mod postprocess;
mod schema;
mod value;

pub use aggregator::FilterAggregator;
pub use ast::Expr;
pub use bins::{
    interval_bins, interval_label, parse_interval_label, Bin, CompleteFacet, Histogram,
    NULL_LABEL, PASSED_FILTERS_KEY,
};
pub use encoding::{dehexify, hexify};
pub use error::FilterError;
pub use events::{FilterChange, ListenerId, Notifier};
pub use filter::{
    BinFilter, BinStates, CategoricalFacetFilter, FacetFilter, IntervalFacetFilter,
    TagsCategoricalFacetFilter,
};
pub use parser::Grammar;
pub use postprocess::PostProcessor;
pub use schema::{CoerceType, FacetKind, FacetRegistry, FacetSchema, IntervalLayout};
pub use value::Value;

/// Items in `unstable` are likely to change.
pub mod unstable {
    pub use crate::ast::*;
    pub use crate::lexer::*;
    pub use crate::parser::*;
}
