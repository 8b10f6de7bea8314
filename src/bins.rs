// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use anyhow::{anyhow, bail, Result};
use indexmap::IndexMap;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value as JsonValue;

/// Label of the bin holding items whose value is absent.
pub const NULL_LABEL: &str = "__null__";

/// Key of the histogram entry carrying the unfiltered total.
pub const PASSED_FILTERS_KEY: &str = "__passedFilters__";

lazy_static! {
    static ref INTERVAL_LABEL: Regex =
        Regex::new(r"^\[(\S+) - (\S+)\)$").expect("interval label pattern must compile");
}

/// One observed or possible value of a facet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bin {
    #[serde(default = "null_label", deserialize_with = "deserialize_label")]
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub low_bound: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub high_bound: Option<f64>,
    #[serde(default)]
    pub count: u64,
}

fn null_label() -> String {
    NULL_LABEL.to_string()
}

// Histogram labels are raw field values: strings, booleans, numbers or null.
fn deserialize_label<'de, D>(deserializer: D) -> core::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;
    match JsonValue::deserialize(deserializer)? {
        JsonValue::Null => Ok(null_label()),
        JsonValue::String(s) => Ok(s),
        JsonValue::Bool(b) => Ok(b.to_string()),
        JsonValue::Number(n) => Ok(n.to_string()),
        v => Err(D::Error::custom(format!("bin label must be a scalar, found {v}"))),
    }
}

impl Bin {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            low_bound: None,
            high_bound: None,
            count: 0,
        }
    }

    pub fn null() -> Self {
        Self::new(NULL_LABEL)
    }

    pub fn interval(low_bound: f64, high_bound: f64) -> Self {
        Self {
            label: interval_label(low_bound, high_bound),
            low_bound: Some(low_bound),
            high_bound: Some(high_bound),
            count: 0,
        }
    }

    pub fn is_null(&self) -> bool {
        self.label == NULL_LABEL
    }

    // Interval bins are sometimes delivered with bounds but no label.
    fn fill_interval_label(&mut self) {
        if let (true, Some(low), Some(high)) = (self.is_null(), self.low_bound, self.high_bound) {
            self.label = interval_label(low, high);
        }
    }
}

/// A facet id together with every bin it can take.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompleteFacet {
    pub id: String,
    pub bins: Vec<Bin>,
}

impl CompleteFacet {
    pub fn new(id: impl Into<String>, bins: Vec<Bin>) -> Self {
        Self {
            id: id.into(),
            bins,
        }
    }

    /// Builds a facet from plain labels.
    pub fn from_labels<I, S>(id: impl Into<String>, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(id, labels.into_iter().map(Bin::new).collect())
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> + '_ {
        self.bins.iter().map(|b| b.label.as_str())
    }
}

/// A histogram response: per-facet bins plus the number of images that pass
/// the current filter.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Histogram {
    pub total: u64,
    pub facets: Vec<CompleteFacet>,
}

impl Histogram {
    /// Parses a histogram response. The reserved `__passedFilters__` entry is
    /// removed from the facet data and reported as `total`.
    pub fn from_json(json: &str) -> Result<Self> {
        let entries: IndexMap<String, JsonValue> = serde_json::from_str(json)?;
        Self::from_entries(entries)
    }

    pub fn from_entries(entries: IndexMap<String, JsonValue>) -> Result<Self> {
        let mut histogram = Histogram::default();
        for (id, bins) in entries {
            if id == PASSED_FILTERS_KEY {
                histogram.total = passed_filters_count(&bins)?;
                continue;
            }
            let mut bins: Vec<Bin> = serde_json::from_value(bins)
                .map_err(|e| anyhow!("invalid bins for facet `{id}`. {e}"))?;
            bins.iter_mut().for_each(Bin::fill_interval_label);
            histogram.facets.push(CompleteFacet { id, bins });
        }
        Ok(histogram)
    }

    pub fn facet(&self, id: &str) -> Option<&CompleteFacet> {
        self.facets.iter().find(|f| f.id == id)
    }
}

fn passed_filters_count(value: &JsonValue) -> Result<u64> {
    match value {
        JsonValue::Array(items) if items.is_empty() => Ok(0),
        JsonValue::Array(items) => match items[0].get("count").and_then(JsonValue::as_u64) {
            Some(count) => Ok(count),
            None => bail!("`{PASSED_FILTERS_KEY}` entry has no count"),
        },
        _ => bail!("`{PASSED_FILTERS_KEY}` must be an array"),
    }
}

/// Formats the label of the half-open range `[low, high)`.
pub fn interval_label(low: f64, high: f64) -> String {
    format!("[{low} - {high})")
}

/// Parses a label produced by [`interval_label`]. Returns `None` when the text
/// does not describe a finite, non-empty range.
pub fn parse_interval_label(label: &str) -> Option<(f64, f64)> {
    let captures = INTERVAL_LABEL.captures(label)?;
    let low: f64 = captures[1].parse().ok()?;
    let high: f64 = captures[2].parse().ok()?;
    (low.is_finite() && high.is_finite() && low < high).then_some((low, high))
}

/// Partitions `[low, high)` into `num_bins` equal half-open bins, followed by
/// the `__null__` bin. Adjacent bins share their boundary value exactly and the
/// last real bin ends at `high`.
pub fn interval_bins(low: f64, high: f64, num_bins: usize) -> Vec<Bin> {
    let mut bins = Vec::with_capacity(num_bins + 1);
    if num_bins > 0 {
        let edges: Vec<f64> = (0..=num_bins)
            .map(|i| match i {
                i if i == num_bins => high,
                i => low + (high - low) * i as f64 / num_bins as f64,
            })
            .collect();
        bins.extend(edges.windows(2).map(|w| Bin::interval(w[0], w[1])));
    }
    bins.push(Bin::null());
    bins
}
