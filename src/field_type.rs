//! Canonical field types: runtime detection from sampled attribute values and
//! mapping of declared type labels onto the Esri field-type vocabulary.
//!
//! [`FieldType`] doubles as the detection result and the parsed form of a
//! declared metadata label. Detection only ever produces the scalar subset
//! (string, integer, double, date, boolean); the remaining variants exist so
//! declared metadata can name the full vocabulary.

use std::{fmt, str::FromStr};

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize, Serializer, de};
use serde_json::Value;

use crate::FieldError;

const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];
const DATE_FORMATS: &[&str] = &["%Y-%m-%d"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    Oid,
    String,
    Integer,
    SmallInteger,
    Double,
    Single,
    Date,
    Boolean,
    Geometry,
    Blob,
    Guid,
    GlobalId,
    Xml,
}

impl FieldType {
    /// Classifies a single sampled attribute value.
    ///
    /// Deterministic and total: `null` and structured values fall back to
    /// [`FieldType::String`] rather than failing.
    pub fn detect(value: &Value) -> FieldType {
        match value {
            Value::Null => FieldType::String,
            Value::Bool(_) => FieldType::Boolean,
            Value::Number(number) => {
                if number.is_i64() || number.is_u64() {
                    FieldType::Integer
                } else {
                    FieldType::Double
                }
            }
            Value::String(text) => {
                if is_date_like(text) {
                    FieldType::Date
                } else {
                    FieldType::String
                }
            }
            Value::Array(_) | Value::Object(_) => FieldType::String,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::Oid => "oid",
            FieldType::String => "string",
            FieldType::Integer => "integer",
            FieldType::SmallInteger => "small-integer",
            FieldType::Double => "double",
            FieldType::Single => "single",
            FieldType::Date => "date",
            FieldType::Boolean => "boolean",
            FieldType::Geometry => "geometry",
            FieldType::Blob => "blob",
            FieldType::Guid => "guid",
            FieldType::GlobalId => "global-id",
            FieldType::Xml => "xml",
        }
    }

    /// Canonical Esri name for this type.
    ///
    /// The Esri vocabulary has no boolean field type; boolean columns are
    /// carried as strings.
    pub fn esri_name(&self) -> &'static str {
        match self {
            FieldType::Oid => "esriFieldTypeOID",
            FieldType::String | FieldType::Boolean => "esriFieldTypeString",
            FieldType::Integer => "esriFieldTypeInteger",
            FieldType::SmallInteger => "esriFieldTypeSmallInteger",
            FieldType::Double => "esriFieldTypeDouble",
            FieldType::Single => "esriFieldTypeSingle",
            FieldType::Date => "esriFieldTypeDate",
            FieldType::Geometry => "esriFieldTypeGeometry",
            FieldType::Blob => "esriFieldTypeBlob",
            FieldType::Guid => "esriFieldTypeGUID",
            FieldType::GlobalId => "esriFieldTypeGlobalID",
            FieldType::Xml => "esriFieldTypeXML",
        }
    }

    pub fn all() -> &'static [FieldType] {
        &[
            FieldType::String,
            FieldType::Integer,
            FieldType::SmallInteger,
            FieldType::Double,
            FieldType::Single,
            FieldType::Date,
            FieldType::Boolean,
            FieldType::Oid,
            FieldType::Geometry,
            FieldType::Blob,
            FieldType::Guid,
            FieldType::GlobalId,
            FieldType::Xml,
        ]
    }

    pub fn variants() -> Vec<&'static str> {
        FieldType::all().iter().map(FieldType::as_str).collect()
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for FieldType {
    type Err = FieldError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "string" | "text" | "esrifieldtypestring" => Ok(FieldType::String),
            "integer" | "int" | "esrifieldtypeinteger" => Ok(FieldType::Integer),
            "small-integer" | "smallinteger" | "short" | "esrifieldtypesmallinteger" => {
                Ok(FieldType::SmallInteger)
            }
            "double" | "float" | "esrifieldtypedouble" => Ok(FieldType::Double),
            "single" | "esrifieldtypesingle" => Ok(FieldType::Single),
            "date" | "datetime" | "timestamp" | "esrifieldtypedate" => Ok(FieldType::Date),
            "boolean" | "bool" => Ok(FieldType::Boolean),
            "oid" | "objectid" | "esrifieldtypeoid" => Ok(FieldType::Oid),
            "geometry" | "esrifieldtypegeometry" => Ok(FieldType::Geometry),
            "blob" | "esrifieldtypeblob" => Ok(FieldType::Blob),
            "guid" | "uuid" | "esrifieldtypeguid" => Ok(FieldType::Guid),
            "global-id" | "globalid" | "esrifieldtypeglobalid" => Ok(FieldType::GlobalId),
            "xml" | "esrifieldtypexml" => Ok(FieldType::Xml),
            _ => Err(FieldError::UnsupportedType(value.trim().to_string())),
        }
    }
}

impl Serialize for FieldType {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.esri_name())
    }
}

impl<'de> Deserialize<'de> for FieldType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let token = String::deserialize(deserializer)?;
        FieldType::from_str(&token).map_err(|err| de::Error::custom(err.to_string()))
    }
}

fn is_date_like(text: &str) -> bool {
    let trimmed = text.trim();
    if trimmed.len() < 8 {
        return false;
    }
    DateTime::parse_from_rfc3339(trimmed).is_ok()
        || DATETIME_FORMATS
            .iter()
            .any(|fmt| NaiveDateTime::parse_from_str(trimmed, fmt).is_ok())
        || DATE_FORMATS
            .iter()
            .any(|fmt| NaiveDate::parse_from_str(trimmed, fmt).is_ok())
}
