//! Type validators: per-item-type acceptance and status promotion rules.
//!
//! Two-tier checking. The value slot must match the item's declared type —
//! a mismatch is a hard error and nothing is written. The per-type
//! constraint (range, photo minimum, signature presence, …) is soft: a
//! failing value submitted as compliant is still persisted, but its
//! effective status is clamped to non-compliant and the failure is
//! returned as a [`ConstraintViolation`] warning. Field technicians must
//! never be blocked from recording what they observed, but cannot silently
//! mis-report it as compliant.

use liftops_types::{
    ChecklistError, ChecklistResult, ConstraintRule, ConstraintViolation, ItemType,
    ResponseStatus, ResponseValue, TemplateItem,
};

/// Result of validating one submission
#[derive(Clone, Debug, PartialEq)]
pub struct ValidationOutcome {
    /// The status that will actually be persisted
    pub effective_status: ResponseStatus,
    /// Soft failures, empty when the submission was honored as-is
    pub warnings: Vec<ConstraintViolation>,
}

/// Check that a submitted value occupies the legal slot for the item type.
///
/// Hard error: a `TypeMismatch` rejects the whole call.
pub fn check_value_slot(item: &TemplateItem, value: Option<&ResponseValue>) -> ChecklistResult<()> {
    match value {
        Some(v) if !v.matches(item.item_type) => Err(ChecklistError::TypeMismatch {
            item_order: item.order,
            expected: item.item_type,
        }),
        _ => Ok(()),
    }
}

/// Validate a submission against the item's promotion and constraint rules.
///
/// `value` is the effective value: the newly submitted one, or the stored
/// one when the submission only changes status. Statuses other than
/// compliant are honored as submitted — that is the operator override path
/// (e.g. accepting an out-of-range reading as non-compliant with a note,
/// or marking an item not applicable).
pub fn validate_response(
    item: &TemplateItem,
    submitted: ResponseStatus,
    value: Option<&ResponseValue>,
) -> ChecklistResult<ValidationOutcome> {
    check_value_slot(item, value)?;

    if submitted != ResponseStatus::Compliant {
        return Ok(ValidationOutcome {
            effective_status: submitted,
            warnings: Vec::new(),
        });
    }

    match constraint_failure(item, value) {
        Some(violation) => Ok(ValidationOutcome {
            effective_status: ResponseStatus::NonCompliant,
            warnings: vec![violation],
        }),
        None => Ok(ValidationOutcome {
            effective_status: ResponseStatus::Compliant,
            warnings: Vec::new(),
        }),
    }
}

/// The per-type extra constraint a compliant status must satisfy.
fn constraint_failure(
    item: &TemplateItem,
    value: Option<&ResponseValue>,
) -> Option<ConstraintViolation> {
    match item.item_type {
        ItemType::Boolean => match value {
            Some(ResponseValue::Bool(false)) => Some(violation(
                item,
                ConstraintRule::BooleanFalse,
                "answered 'no' cannot be compliant".to_string(),
            )),
            _ => None,
        },

        ItemType::Text => match value {
            Some(ResponseValue::Text(text)) if text.trim().is_empty() => Some(violation(
                item,
                ConstraintRule::EmptyText,
                "text submission is empty".to_string(),
            )),
            _ => None,
        },

        ItemType::Number | ItemType::Reading => {
            let (min, max) = item.allowed_range?;
            match value {
                Some(ResponseValue::Number(n)) if *n < min || *n > max => {
                    let unit = item.unit.as_deref().unwrap_or("");
                    Some(violation(
                        item,
                        ConstraintRule::OutOfRange,
                        format!("value {n}{unit} outside permitted interval [{min}, {max}]"),
                    ))
                }
                _ => None,
            }
        }

        ItemType::Photo => {
            let min = item.min_photos.unwrap_or(0) as usize;
            let count = value.map(|v| v.evidence_count()).unwrap_or(0);
            if count < min {
                Some(violation(
                    item,
                    ConstraintRule::InsufficientPhotos,
                    format!("{count} photo(s) attached, minimum is {min}"),
                ))
            } else {
                None
            }
        }

        ItemType::Signature => {
            let count = value.map(|v| v.evidence_count()).unwrap_or(0);
            if count == 0 {
                Some(violation(
                    item,
                    ConstraintRule::MissingSignature,
                    "no signature reference attached".to_string(),
                ))
            } else {
                None
            }
        }
    }
}

fn violation(item: &TemplateItem, rule: ConstraintRule, detail: String) -> ConstraintViolation {
    ConstraintViolation {
        item_order: item.order,
        rule,
        detail,
    }
}
