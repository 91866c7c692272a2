//! Field collection assembly: metadata-driven and sample-driven derivation.
//!
//! This module owns the end-to-end computation: choosing the derivation
//! source, requested-field filtering, identifier injection, report-only
//! discrepancy detection, and the identifier-first ordering invariant.
//!
//! ## Responsibilities
//!
//! - [`from_properties`]: one field per sampled attribute, in insertion order
//! - [`from_metadata`]: clone, inject `OBJECTID`, filter by the allowlist
//! - [`compute_fields`]: top-level decision order over statistics, features,
//!   and metadata
//! - [`identifier_first`]: pure reordering, identifier always at index 0

use log::debug;

use crate::{
    FieldError,
    discrepancy::{self, Discrepancy},
    field::{Field, OID_FIELD_NAME},
    field_type::FieldType,
    payload::{AttributeSample, ComputeOptions, MetadataField, Payload, RequestContext},
};

/// Fields derived from one sampled record, labeled with the identifier
/// field's name.
#[derive(Debug, Clone, PartialEq)]
pub struct SampledFields {
    pub oid_field: String,
    pub fields: Vec<Field>,
}

/// Result of a top-level computation: the ordered collection plus any
/// metadata/sample discrepancies observed along the way.
#[derive(Debug, Clone, PartialEq)]
pub struct ComputedFields {
    pub fields: Vec<Field>,
    pub warnings: Vec<Discrepancy>,
}

/// Derives one field per sampled attribute, using the attribute name as both
/// field name and alias.
///
/// An absent sample yields an empty collection. In layer context the
/// identifier template is appended when the sample has no `OBJECTID`
/// attribute, and the result is required to lead with the identifier field.
pub fn from_properties(
    properties: Option<&AttributeSample>,
    context: RequestContext,
) -> Result<SampledFields, FieldError> {
    let Some(properties) = properties else {
        return Ok(SampledFields {
            oid_field: OID_FIELD_NAME.to_string(),
            fields: Vec::new(),
        });
    };

    let mut fields = Vec::with_capacity(properties.len() + 1);
    for (name, value) in properties {
        let detected = FieldType::detect(value);
        fields.push(Field::build(
            name,
            None,
            Some(detected.as_str()),
            None,
            context,
        )?);
    }
    if context.is_layer() && !fields.iter().any(|field| field.name == OID_FIELD_NAME) {
        fields.push(Field::object_id(context));
    }

    let fields = if context.is_layer() {
        require_identifier_first(fields)?
    } else {
        identifier_first(fields)
    };
    Ok(SampledFields {
        oid_field: OID_FIELD_NAME.to_string(),
        fields,
    })
}

/// Resolves the requested field declarations from caller metadata.
///
/// The input is cloned, a bare `OBJECTID` declaration is appended when none
/// exists, and the result is filtered by the comma-separated allowlist unless
/// it is absent, blank, or the `"*"` wildcard. Injection happens before
/// filtering, so `OBJECTID` participates in the filter like any other name.
/// Filtered output keeps the metadata order, not the allowlist order.
pub fn from_metadata(fields: &[MetadataField], out_fields: Option<&str>) -> Vec<MetadataField> {
    let mut requested = fields.to_vec();
    if !requested.iter().any(|field| field.name == OID_FIELD_NAME) {
        requested.push(MetadataField::named(OID_FIELD_NAME));
    }

    let Some(allowlist) = out_fields
        .map(str::trim)
        .filter(|raw| !raw.is_empty() && *raw != "*")
    else {
        return requested;
    };
    let allowed: Vec<&str> = allowlist
        .split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .collect();
    requested.retain(|field| allowed.contains(&field.name.as_str()));
    requested
}

/// Top-level entry: computes the field collection for one request.
///
/// Derivation source, in order: explicit metadata fields when declared;
/// otherwise the first statistics record when statistics are present;
/// otherwise the first feature's attribute record, falling back to
/// `options.attribute_sample` only when the payload carries no feature at
/// all. Discrepancy warnings are returned alongside the collection and never
/// alter it.
pub fn compute_fields(
    payload: &Payload,
    context: RequestContext,
    options: &ComputeOptions,
) -> Result<ComputedFields, FieldError> {
    let Some(metadata_fields) = payload.metadata_fields() else {
        let sampled = if let Some(statistics) = payload.statistics.as_ref() {
            debug!("deriving fields from the first statistics record");
            from_properties(statistics.first(), context)?
        } else {
            debug!("deriving fields from the sampled feature record");
            from_properties(sample_record(payload, options), context)?
        };
        return Ok(ComputedFields {
            fields: sampled.fields,
            warnings: Vec::new(),
        });
    };

    debug!(
        "deriving fields from {} metadata declaration(s)",
        metadata_fields.len()
    );
    let requested = from_metadata(metadata_fields, options.out_fields.as_deref());
    let warnings = match sample_record(payload, options) {
        Some(sample) => discrepancy::detect(metadata_fields, sample),
        None => Vec::new(),
    };

    let mut fields = Vec::with_capacity(requested.len());
    for declaration in &requested {
        fields.push(Field::build(
            &declaration.name,
            declaration.alias.as_deref(),
            declaration.datatype.as_deref(),
            declaration.length,
            context,
        )?);
    }
    Ok(ComputedFields {
        fields: identifier_first(fields),
        warnings,
    })
}

/// Returns a new sequence with the identifier field first and the rest in
/// their original relative order. A collection without an identifier field is
/// returned unchanged.
pub fn identifier_first(fields: Vec<Field>) -> Vec<Field> {
    let Some(index) = fields
        .iter()
        .position(|field| field.name == OID_FIELD_NAME)
    else {
        return fields;
    };
    let mut rest = fields;
    let identifier = rest.remove(index);
    let mut ordered = Vec::with_capacity(rest.len() + 1);
    ordered.push(identifier);
    ordered.append(&mut rest);
    ordered
}

fn require_identifier_first(fields: Vec<Field>) -> Result<Vec<Field>, FieldError> {
    if !fields.iter().any(|field| field.name == OID_FIELD_NAME) {
        return Err(FieldError::IdentifierFieldMissing);
    }
    Ok(identifier_first(fields))
}

fn sample_record<'a>(
    payload: &'a Payload,
    options: &'a ComputeOptions,
) -> Option<&'a AttributeSample> {
    match payload.features.first() {
        Some(feature) => feature.sample(),
        None => options.attribute_sample.as_ref(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn sample(value: serde_json::Value) -> AttributeSample {
        value.as_object().expect("object sample").clone()
    }

    fn names(fields: &[Field]) -> Vec<&str> {
        fields.iter().map(|field| field.name.as_str()).collect()
    }

    fn declaration(name: &str, datatype: &str) -> MetadataField {
        MetadataField {
            name: name.to_string(),
            alias: None,
            datatype: Some(datatype.to_string()),
            length: None,
        }
    }

    #[test]
    fn sampling_builds_one_field_per_key_in_insertion_order() {
        let record = sample(json!({"zulu": "a", "alpha": 2, "mike": 3.5}));
        let sampled =
            from_properties(Some(&record), RequestContext::Generic).expect("derive fields");
        assert_eq!(names(&sampled.fields), vec!["zulu", "alpha", "mike"]);
        assert_eq!(sampled.fields[0].field_type, FieldType::String);
        assert_eq!(sampled.fields[1].field_type, FieldType::Integer);
        assert_eq!(sampled.fields[2].field_type, FieldType::Double);
        assert_eq!(sampled.oid_field, OID_FIELD_NAME);
    }

    #[test]
    fn sampling_uses_the_key_as_alias_and_leaves_lengths_to_defaults() {
        let record = sample(json!({"label": "x"}));
        let sampled =
            from_properties(Some(&record), RequestContext::Generic).expect("derive fields");
        assert_eq!(sampled.fields[0].alias, "label");
        assert_eq!(sampled.fields[0].length, Some(128));
    }

    #[test]
    fn sampling_an_absent_record_yields_an_empty_collection() {
        let sampled = from_properties(None, RequestContext::Layer).expect("derive fields");
        assert!(sampled.fields.is_empty());
        assert_eq!(sampled.oid_field, OID_FIELD_NAME);
    }

    #[test]
    fn layer_sampling_appends_and_fronts_the_identifier() {
        let record = sample(json!({"label": "x", "count": 2}));
        let sampled = from_properties(Some(&record), RequestContext::Layer).expect("derive fields");
        assert_eq!(names(&sampled.fields), vec![OID_FIELD_NAME, "label", "count"]);
        let identifier = &sampled.fields[0];
        assert_eq!(identifier.field_type, FieldType::Oid);
        assert_eq!(identifier.editable, Some(false));
        assert_eq!(identifier.nullable, Some(false));
    }

    #[test]
    fn layer_sampling_keeps_an_existing_identifier_unique() {
        let record = sample(json!({"label": "x", "OBJECTID": 7}));
        let sampled = from_properties(Some(&record), RequestContext::Layer).expect("derive fields");
        assert_eq!(names(&sampled.fields), vec![OID_FIELD_NAME, "label"]);
    }

    #[test]
    fn generic_sampling_reorders_an_existing_identifier() {
        let record = sample(json!({"label": "x", "OBJECTID": 7, "count": 1}));
        let sampled =
            from_properties(Some(&record), RequestContext::Generic).expect("derive fields");
        assert_eq!(names(&sampled.fields), vec![OID_FIELD_NAME, "label", "count"]);
    }

    #[test]
    fn generic_sampling_without_identifier_is_left_alone() {
        let record = sample(json!({"label": "x", "count": 1}));
        let sampled =
            from_properties(Some(&record), RequestContext::Generic).expect("derive fields");
        assert_eq!(names(&sampled.fields), vec!["label", "count"]);
        assert_eq!(sampled.fields[0].editable, None);
    }

    #[test]
    fn metadata_resolution_appends_a_missing_identifier_exactly_once() {
        let declared = vec![declaration("a", "String"), declaration("b", "Integer")];
        let requested = from_metadata(&declared, None);
        let requested_names: Vec<&str> =
            requested.iter().map(|field| field.name.as_str()).collect();
        assert_eq!(requested_names, vec!["a", "b", OID_FIELD_NAME]);

        let with_oid = from_metadata(&requested, None);
        let count = with_oid
            .iter()
            .filter(|field| field.name == OID_FIELD_NAME)
            .count();
        assert_eq!(count, 1);
    }

    #[test]
    fn wildcard_and_absent_filters_are_equivalent() {
        let declared = vec![declaration("a", "String"), declaration("b", "Integer")];
        assert_eq!(from_metadata(&declared, Some("*")), from_metadata(&declared, None));
        assert_eq!(from_metadata(&declared, Some("")), from_metadata(&declared, None));
        assert_eq!(from_metadata(&declared, Some("  ")), from_metadata(&declared, None));
    }

    #[test]
    fn filtering_tolerates_whitespace_and_keeps_metadata_order() {
        let declared = vec![
            declaration("a", "String"),
            declaration("b", "Integer"),
            declaration("c", "Double"),
        ];
        let requested = from_metadata(&declared, Some(" c , a "));
        let requested_names: Vec<&str> =
            requested.iter().map(|field| field.name.as_str()).collect();
        assert_eq!(requested_names, vec!["a", "c"]);
    }

    #[test]
    fn injected_identifier_participates_in_the_filter() {
        let declared = vec![declaration("a", "String"), declaration(OID_FIELD_NAME, "oid")];
        let requested = from_metadata(&declared, Some("a"));
        let requested_names: Vec<&str> =
            requested.iter().map(|field| field.name.as_str()).collect();
        assert_eq!(requested_names, vec!["a"]);

        let listed = from_metadata(&declared, Some("a,OBJECTID"));
        assert_eq!(listed.len(), 2);
    }

    #[test]
    fn statistics_take_precedence_when_metadata_is_absent() {
        let payload: Payload = serde_json::from_value(json!({
            "features": [{"properties": {"ignored": true}}],
            "statistics": [{"min_value": 1, "max_value": 9.5}]
        }))
        .expect("payload");
        let computed = compute_fields(&payload, RequestContext::Generic, &ComputeOptions::default())
            .expect("compute");
        assert_eq!(names(&computed.fields), vec!["min_value", "max_value"]);
        assert!(computed.warnings.is_empty());
    }

    #[test]
    fn empty_statistics_yield_an_empty_collection() {
        let payload: Payload = serde_json::from_value(json!({"statistics": []})).expect("payload");
        let computed = compute_fields(&payload, RequestContext::Layer, &ComputeOptions::default())
            .expect("compute");
        assert!(computed.fields.is_empty());
    }

    #[test]
    fn feature_attributes_drive_sampling_when_nothing_else_is_declared() {
        let payload: Payload = serde_json::from_value(json!({
            "features": [{"attributes": {"label": "x", "count": 2}}]
        }))
        .expect("payload");
        let computed = compute_fields(&payload, RequestContext::Layer, &ComputeOptions::default())
            .expect("compute");
        assert_eq!(names(&computed.fields), vec![OID_FIELD_NAME, "label", "count"]);
    }

    #[test]
    fn attribute_sample_applies_only_without_features() {
        let options = ComputeOptions {
            attribute_sample: Some(sample(json!({"fallback": 1}))),
            out_fields: None,
        };

        let empty: Payload = serde_json::from_value(json!({})).expect("payload");
        let computed =
            compute_fields(&empty, RequestContext::Generic, &options).expect("compute");
        assert_eq!(names(&computed.fields), vec!["fallback"]);

        let bare_feature: Payload =
            serde_json::from_value(json!({"features": [{}]})).expect("payload");
        let computed =
            compute_fields(&bare_feature, RequestContext::Generic, &options).expect("compute");
        assert!(computed.fields.is_empty());
    }

    #[test]
    fn metadata_drives_the_collection_and_sampling_only_warns() {
        let payload: Payload = serde_json::from_value(json!({
            "metadata": {"fields": [
                {"name": "label", "type": "String", "alias": "Label"},
                {"name": "count", "type": "Integer"}
            ]},
            "features": [{"properties": {"label": 99, "extra": "x"}}]
        }))
        .expect("payload");
        let computed = compute_fields(&payload, RequestContext::Layer, &ComputeOptions::default())
            .expect("compute");

        assert_eq!(names(&computed.fields), vec![OID_FIELD_NAME, "label", "count"]);
        assert_eq!(computed.fields[1].alias, "Label");
        assert_eq!(computed.fields[1].field_type, FieldType::String);
        assert_eq!(
            computed.warnings,
            vec![
                Discrepancy::TypeMismatch {
                    field: "label".to_string(),
                    declared: FieldType::String,
                    detected: FieldType::Integer,
                },
                Discrepancy::MissingFromSample {
                    field: "count".to_string()
                },
            ]
        );
    }

    #[test]
    fn filtering_away_the_identifier_is_not_an_error() {
        let payload: Payload = serde_json::from_value(json!({
            "metadata": {"fields": [
                {"name": "a", "type": "String"},
                {"name": "OBJECTID", "type": "oid"}
            ]}
        }))
        .expect("payload");
        let options = ComputeOptions {
            attribute_sample: None,
            out_fields: Some("a".to_string()),
        };
        let computed =
            compute_fields(&payload, RequestContext::Layer, &options).expect("compute");
        assert_eq!(names(&computed.fields), vec!["a"]);
    }

    #[test]
    fn an_unsupported_metadata_label_fails_the_whole_computation() {
        let payload: Payload = serde_json::from_value(json!({
            "metadata": {"fields": [
                {"name": "a", "type": "String"},
                {"name": "b", "type": "tensor"}
            ]}
        }))
        .expect("payload");
        let err = compute_fields(&payload, RequestContext::Generic, &ComputeOptions::default())
            .unwrap_err();
        assert_eq!(err, FieldError::UnsupportedType("tensor".to_string()));
    }

    #[test]
    fn an_empty_payload_computes_an_empty_collection() {
        let payload = Payload::default();
        let computed = compute_fields(&payload, RequestContext::Generic, &ComputeOptions::default())
            .expect("compute");
        assert!(computed.fields.is_empty());
        assert!(computed.warnings.is_empty());
    }

    #[test]
    fn requiring_an_identifier_fails_without_one() {
        let fields = vec![
            Field::build("a", None, Some("string"), None, RequestContext::Generic)
                .expect("build field"),
        ];
        let err = require_identifier_first(fields).unwrap_err();
        assert_eq!(err, FieldError::IdentifierFieldMissing);
    }

    proptest! {
        #[test]
        fn layer_sampling_always_leads_with_the_identifier(
            keys in proptest::collection::hash_set("[a-z]{1,8}", 1..12)
        ) {
            let mut record = AttributeSample::new();
            for (index, key) in keys.iter().enumerate() {
                record.insert(key.clone(), json!(index));
            }
            let sampled = from_properties(Some(&record), RequestContext::Layer)
                .expect("derive fields");
            prop_assert_eq!(sampled.fields.len(), record.len() + 1);
            prop_assert_eq!(sampled.fields[0].name.as_str(), OID_FIELD_NAME);
            prop_assert!(sampled.fields.iter().all(|field| field.editable == Some(false) && field.nullable == Some(false)));
        }
    }
}
