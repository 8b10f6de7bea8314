// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::bins::{interval_bins, Bin};
use crate::error::{FilterError, Result};

use core::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// How a facet's bins are selected and compiled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FacetKind {
    /// Single-valued field; compiles to an exclusion list.
    Categorical,
    /// List-valued field; compiles to an inclusion list.
    TagsCategorical,
    /// Numeric field binned into half-open ranges.
    Interval,
}

/// Type the query executor should coerce comparison operands to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoerceType {
    String,
    Number,
    Boolean,
    ObjectId,
    /// Operands are used as-is; never written into the AST.
    Object,
}

impl CoerceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CoerceType::String => "string",
            CoerceType::Number => "number",
            CoerceType::Boolean => "boolean",
            CoerceType::ObjectId => "objectid",
            CoerceType::Object => "object",
        }
    }
}

impl fmt::Display for CoerceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Equal-width partition of `[low_bound, high_bound)` used by interval facets.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntervalLayout {
    pub low_bound: f64,
    pub high_bound: f64,
    pub num_bins: usize,
}

impl IntervalLayout {
    pub fn new(low_bound: f64, high_bound: f64, num_bins: usize) -> Self {
        Self {
            low_bound,
            high_bound,
            num_bins,
        }
    }

    /// The complete bin set of this layout, `__null__` last.
    pub fn bins(&self) -> Vec<Bin> {
        interval_bins(self.low_bound, self.high_bound, self.num_bins)
    }

    fn is_valid(&self) -> bool {
        self.num_bins > 0
            && self.low_bound.is_finite()
            && self.high_bound.is_finite()
            && self.low_bound < self.high_bound
    }
}

/// Static description of one filterable attribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FacetSchema {
    pub id: String,
    pub kind: FacetKind,
    pub coerce_to_type: CoerceType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval: Option<IntervalLayout>,
}

impl FacetSchema {
    pub fn categorical(id: impl Into<String>, coerce_to_type: CoerceType) -> Self {
        Self {
            id: id.into(),
            kind: FacetKind::Categorical,
            coerce_to_type,
            interval: None,
        }
    }

    pub fn tags(id: impl Into<String>, coerce_to_type: CoerceType) -> Self {
        Self {
            id: id.into(),
            kind: FacetKind::TagsCategorical,
            coerce_to_type,
            interval: None,
        }
    }

    pub fn interval(
        id: impl Into<String>,
        coerce_to_type: CoerceType,
        layout: IntervalLayout,
    ) -> Self {
        Self {
            id: id.into(),
            kind: FacetKind::Interval,
            coerce_to_type,
            interval: Some(layout),
        }
    }
}

/// Read-only mapping from facet id to its schema, in registration order.
#[derive(Debug, Clone, Default)]
pub struct FacetRegistry {
    facets: IndexMap<String, FacetSchema>,
}

impl FacetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The facets exposed by the ISIC image browser.
    pub fn isic() -> Self {
        use CoerceType::{Boolean, Number, Object, ObjectId};

        let categorical = [
            ("folderId", ObjectId),
            ("meta.clinical.benign_malignant", CoerceType::String),
            ("meta.clinical.sex", CoerceType::String),
            ("meta.clinical.diagnosis", CoerceType::String),
            ("meta.clinical.diagnosis_confirm_type", CoerceType::String),
            ("meta.clinical.anatom_site_general", CoerceType::String),
            ("meta.clinical.melanocytic", Boolean),
            ("meta.clinical.family_hx_mm", Boolean),
            ("meta.clinical.personal_hx_mm", Boolean),
            ("meta.clinical.nevus_type", CoerceType::String),
            ("meta.clinical.mel_class", CoerceType::String),
            ("meta.clinical.mel_type", CoerceType::String),
            ("meta.clinical.mel_mitotic_index", CoerceType::String),
            ("meta.clinical.mel_ulcer", Boolean),
            ("meta.acquisition.image_type", CoerceType::String),
            ("meta.acquisition.dermoscopic_type", CoerceType::String),
        ];
        let interval = [
            ("meta.clinical.age_approx", IntervalLayout::new(0.0, 90.0, 18)),
            (
                "meta.clinical.clin_size_long_diam_mm",
                IntervalLayout::new(0.0, 100.0, 10),
            ),
            ("meta.clinical.mel_thick_mm", IntervalLayout::new(0.0, 5.0, 10)),
            ("meta.acquisition.pixelsX", IntervalLayout::new(0.0, 10000.0, 10)),
            ("meta.acquisition.pixelsY", IntervalLayout::new(0.0, 10000.0, 10)),
        ];

        let mut facets = IndexMap::new();
        for (id, coerce) in categorical {
            facets.insert(id.to_string(), FacetSchema::categorical(id, coerce));
        }
        for (id, layout) in interval {
            facets.insert(id.to_string(), FacetSchema::interval(id, Number, layout));
        }
        facets.insert(
            "notes.tags".to_string(),
            FacetSchema::tags("notes.tags", Object),
        );
        Self { facets }
    }

    /// Loads a list of facet schemas from json.
    pub fn from_json(json: &str) -> Result<Self> {
        let schemas: Vec<FacetSchema> = serde_json::from_str(json)?;
        Self::from_schemas(schemas)
    }

    /// Loads a list of facet schemas from yaml.
    #[cfg(feature = "yaml")]
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let schemas: Vec<FacetSchema> = serde_yaml::from_str(yaml)?;
        Self::from_schemas(schemas)
    }

    pub fn from_schemas(schemas: impl IntoIterator<Item = FacetSchema>) -> Result<Self> {
        let mut registry = Self::new();
        for schema in schemas {
            registry.register(schema)?;
        }
        Ok(registry)
    }

    /// Adds a facet. Ids must be non-blank and unique; interval facets need a
    /// non-empty, finite layout.
    pub fn register(&mut self, schema: FacetSchema) -> Result<()> {
        if schema.id.trim().is_empty() {
            return Err(FilterError::InvalidConfig(
                "facet id must not be empty".to_string(),
            ));
        }
        if self.facets.contains_key(&schema.id) {
            return Err(FilterError::InvalidConfig(format!(
                "facet '{}' is already registered",
                schema.id
            )));
        }
        let layout_ok = schema.interval.is_some_and(|l| l.is_valid());
        if schema.kind == FacetKind::Interval && !layout_ok {
            return Err(FilterError::InvalidConfig(format!(
                "interval facet '{}' requires lowBound < highBound and numBins > 0",
                schema.id
            )));
        }
        self.facets.insert(schema.id.clone(), schema);
        Ok(())
    }

    pub fn lookup(&self, facet_id: &str) -> Result<&FacetSchema> {
        self.facets
            .get(facet_id)
            .ok_or_else(|| FilterError::UnknownFacet(facet_id.to_string()))
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> + '_ {
        self.facets.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &FacetSchema> + '_ {
        self.facets.values()
    }

    pub fn len(&self) -> usize {
        self.facets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.facets.is_empty()
    }
}
