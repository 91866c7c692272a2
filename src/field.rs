//! Schema field descriptors and the builder that applies template defaults.
//!
//! A [`Field`] is one named, typed attribute slot in a layer schema, shaped
//! the way GeoServices clients expect (`esriFieldType*` tags, camelCase
//! properties). Construction always goes through typed templates — the
//! generic attribute template or the dedicated `OBJECTID` identifier
//! template — so no shared base object is ever mutated.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{FieldError, field_type::FieldType, payload::RequestContext};

/// Name of the designated unique-key field, required first in every
/// collection that carries one.
pub const OID_FIELD_NAME: &str = "OBJECTID";

const STRING_LENGTH_DEFAULT: u32 = 128;
const DATE_LENGTH_DEFAULT: u32 = 36;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SqlType {
    #[serde(rename = "sqlTypeInteger")]
    Integer,
    #[default]
    #[serde(rename = "sqlTypeOther")]
    Other,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Field {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    pub alias: String,
    #[serde(default)]
    pub sql_type: SqlType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub length: Option<u32>,
    pub domain: Option<Value>,
    pub default_value: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub editable: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nullable: Option<bool>,
}

impl Field {
    /// Builds one field descriptor from its declared or detected parts.
    ///
    /// `OBJECTID` always resolves to a fresh copy of the identifier template,
    /// ignoring the supplied alias, type label, and length. For every other
    /// name the label is mapped onto its canonical type (a missing label is
    /// treated as `string`), the alias falls back to the name, and the length
    /// falls back to 128 for strings and 36 for dates. Unrecognized labels
    /// fail with [`FieldError::UnsupportedType`].
    pub fn build(
        name: &str,
        alias: Option<&str>,
        type_label: Option<&str>,
        length: Option<u32>,
        context: RequestContext,
    ) -> Result<Field, FieldError> {
        if name == OID_FIELD_NAME {
            return Ok(Field::object_id(context));
        }
        let field_type = match type_label {
            Some(label) => label.parse()?,
            None => FieldType::String,
        };
        let length = length.or(match field_type {
            FieldType::String => Some(STRING_LENGTH_DEFAULT),
            FieldType::Date => Some(DATE_LENGTH_DEFAULT),
            _ => None,
        });
        let field = Field {
            length,
            ..Field::template(name, alias.unwrap_or(name), field_type)
        };
        Ok(field.for_context(context))
    }

    /// Fresh copy of the dedicated identifier-field template.
    pub fn object_id(context: RequestContext) -> Field {
        let field = Field {
            sql_type: SqlType::Integer,
            ..Field::template(OID_FIELD_NAME, OID_FIELD_NAME, FieldType::Oid)
        };
        field.for_context(context)
    }

    /// Generic attribute-field template with the given computed values laid
    /// over it.
    fn template(name: &str, alias: &str, field_type: FieldType) -> Field {
        Field {
            name: name.to_string(),
            field_type,
            alias: alias.to_string(),
            sql_type: SqlType::Other,
            length: None,
            domain: None,
            default_value: None,
            editable: None,
            nullable: None,
        }
    }

    fn for_context(mut self, context: RequestContext) -> Field {
        if context.is_layer() {
            self.editable = Some(false);
            self.nullable = Some(false);
        }
        self
    }
}
