// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use thiserror::Error;

/// Errors raised while building or compiling facet filters.
///
/// Every variant is a precondition violation: either the caller asked for
/// something that was never registered, or the filter compiler produced
/// output its own grammar rejects.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FilterError {
    /// Facet id not present in the schema registry or the aggregator.
    #[error("unknown facet '{0}'")]
    UnknownFacet(String),

    /// Bin label not present in a facet filter.
    #[error("unknown bin '{label}' for facet '{facet}'")]
    UnknownBin { facet: String, label: String },

    /// Interval bin label does not match `[low - high)`.
    #[error("malformed bin label '{label}' for interval facet '{facet}'")]
    MalformedBinLabel { facet: String, label: String },

    /// Facet schema configuration could not be loaded.
    #[error("invalid facet configuration: {0}")]
    InvalidConfig(String),

    /// The compiler emitted an expression that its grammar cannot handle.
    #[error("internal error: {0}")]
    Internal(String),
}

pub type Result<T, E = FilterError> = core::result::Result<T, E>;

impl From<serde_json::Error> for FilterError {
    fn from(error: serde_json::Error) -> Self {
        FilterError::InvalidConfig(error.to_string())
    }
}

#[cfg(feature = "yaml")]
impl From<serde_yaml::Error> for FilterError {
    fn from(error: serde_yaml::Error) -> Self {
        FilterError::InvalidConfig(error.to_string())
    }
}
