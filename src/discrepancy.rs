//! Report-only reconciliation between declared metadata fields and one
//! sampled attribute record.
//!
//! Detection never alters a field collection; it returns structured warnings
//! and leaves surfacing to the caller.

use std::fmt;

use crate::{
    field::OID_FIELD_NAME,
    field_type::FieldType,
    payload::{AttributeSample, MetadataField},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Discrepancy {
    /// A field is declared in metadata but the sample record has no property
    /// with its name.
    MissingFromSample { field: String },
    /// The declared type and the type detected from the sampled value
    /// disagree.
    TypeMismatch {
        field: String,
        declared: FieldType,
        detected: FieldType,
    },
}

impl fmt::Display for Discrepancy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Discrepancy::MissingFromSample { field } => {
                write!(
                    f,
                    "field '{field}' is declared in metadata but was not found in the sample record"
                )
            }
            Discrepancy::TypeMismatch {
                field,
                declared,
                detected,
            } => {
                write!(
                    f,
                    "field '{field}' is declared as {declared} but its sampled value was detected as {detected}"
                )
            }
        }
    }
}

/// Compares each declared field against the sample record.
///
/// The identifier field is exempt from type comparison, and a declared label
/// the type system does not recognize produces no warning here — the field
/// builder rejects it instead.
pub fn detect(metadata_fields: &[MetadataField], sample: &AttributeSample) -> Vec<Discrepancy> {
    let mut warnings = Vec::new();
    for field in metadata_fields {
        let Some(value) = sample.get(&field.name) else {
            warnings.push(Discrepancy::MissingFromSample {
                field: field.name.clone(),
            });
            continue;
        };
        if field.name == OID_FIELD_NAME {
            continue;
        }
        let Some(declared) = field
            .datatype
            .as_deref()
            .and_then(|label| label.parse::<FieldType>().ok())
        else {
            continue;
        };
        let detected = FieldType::detect(value);
        if declared == detected || tolerated(declared, detected) {
            continue;
        }
        warnings.push(Discrepancy::TypeMismatch {
            field: field.name.clone(),
            declared,
            detected,
        });
    }
    warnings
}

// Epoch timestamps and whole-number doubles both sample as integers.
fn tolerated(declared: FieldType, detected: FieldType) -> bool {
    matches!(
        (declared, detected),
        (FieldType::Date, FieldType::Integer) | (FieldType::Double, FieldType::Integer)
    )
}
