//! Input payload shapes: layer metadata, sampled features, and request
//! options.
//!
//! Everything here is read-only input. Attribute records keep their insertion
//! order, and metadata fields are cloned before the assembler touches them.

use serde::Deserialize;
use serde_json::{Map, Value};

/// One raw data record: an insertion-ordered mapping from field name to an
/// arbitrary sampled value.
pub type AttributeSample = Map<String, Value>;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Payload {
    #[serde(default)]
    pub metadata: Option<Metadata>,
    #[serde(default)]
    pub features: Vec<Feature>,
    #[serde(default)]
    pub statistics: Option<Vec<AttributeSample>>,
}

impl Payload {
    pub fn metadata_fields(&self) -> Option<&[MetadataField]> {
        self.metadata.as_ref().and_then(|m| m.fields.as_deref())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Metadata {
    #[serde(default)]
    pub fields: Option<Vec<MetadataField>>,
}

/// A feature carries its attribute record under `properties` (GeoJSON) or
/// `attributes` (feature-service JSON); the first one present wins.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Feature {
    #[serde(default)]
    pub properties: Option<AttributeSample>,
    #[serde(default)]
    pub attributes: Option<AttributeSample>,
}

impl Feature {
    pub fn sample(&self) -> Option<&AttributeSample> {
        self.properties.as_ref().or(self.attributes.as_ref())
    }
}

/// Caller-declared shape of one field, independent of any sample data.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct MetadataField {
    pub name: String,
    #[serde(default)]
    pub alias: Option<String>,
    #[serde(default, rename = "type")]
    pub datatype: Option<String>,
    #[serde(default)]
    pub length: Option<u32>,
}

impl MetadataField {
    /// Bare declaration carrying only a name; type, alias, and length default
    /// downstream.
    pub fn named(name: &str) -> MetadataField {
        MetadataField {
            name: name.to_string(),
            ..MetadataField::default()
        }
    }
}

/// Recognized computation options.
#[derive(Debug, Clone, Default)]
pub struct ComputeOptions {
    /// Fallback attribute record consulted when the payload carries no
    /// features.
    pub attribute_sample: Option<AttributeSample>,
    /// Comma-separated field-name allowlist; `"*"`, blank, or absent keeps
    /// every field.
    pub out_fields: Option<String>,
}

/// Caller-supplied mode flag altering output decoration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RequestContext {
    #[default]
    Generic,
    Layer,
}

impl RequestContext {
    /// Total over any label: `"layer"` selects the layer-service shape,
    /// everything else the generic one.
    pub fn from_label(label: &str) -> RequestContext {
        if label == "layer" {
            RequestContext::Layer
        } else {
            RequestContext::Generic
        }
    }

    pub fn is_layer(self) -> bool {
        self == RequestContext::Layer
    }
}
