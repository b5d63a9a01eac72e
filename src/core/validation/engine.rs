//! Rule evaluation
//!
//! Collect-all semantics: every field is checked even after another field
//! fails, but within one field the first failing check wins.

use serde_json::Value;
use uuid::Uuid;
use validator::ValidateEmail;

use super::rules::{FieldType, ValidationRule};
use crate::core::error::ApiError;

/// Evaluate `rules` against `input` in declaration order
///
/// Returns every failing rule's message. An empty vec means the input passed;
/// the input itself is never touched or coerced.
pub fn validate(input: &Value, rules: &[ValidationRule]) -> Vec<String> {
    rules
        .iter()
        .filter_map(|rule| check_field(input, rule))
        .collect()
}

/// Evaluate `rules` and convert failures into the 400 error the pipeline
/// emits: `message` is the first collected error, `details` the full list
pub fn validate_as_error(input: &Value, rules: &[ValidationRule]) -> Result<(), ApiError> {
    let errors = validate(input, rules);
    match errors.first() {
        None => Ok(()),
        Some(first) => Err(ApiError::Validation {
            message: first.clone(),
            details: errors,
        }),
    }
}

fn check_field(input: &Value, rule: &ValidationRule) -> Option<String> {
    let value = input.get(&rule.field);

    if is_absent(value) {
        if rule.required {
            return Some(fail(rule, format!("{} is required", rule.field)));
        }
        return None;
    }
    let value = value?;

    if let Some(field_type) = rule.field_type {
        if let Some(message) = check_type(value, field_type, &rule.field) {
            return Some(fail(rule, message));
        }
    }

    if let Some(s) = value.as_str() {
        let len = s.chars().count();
        if let Some(min) = rule.min_length {
            if len < min {
                return Some(fail(
                    rule,
                    format!("{} must be at least {} characters", rule.field, min),
                ));
            }
        }
        if let Some(max) = rule.max_length {
            if len > max {
                return Some(fail(
                    rule,
                    format!("{} must be at most {} characters", rule.field, max),
                ));
            }
        }
        if let Some(pattern) = &rule.pattern {
            if !pattern.is_match(s) {
                return Some(fail(rule, format!("{} has an invalid format", rule.field)));
            }
        }
    }

    if let Some(custom) = &rule.custom {
        if !custom(value) {
            return Some(fail(rule, format!("{} is invalid", rule.field)));
        }
    }

    None
}

/// Missing key, JSON null, and empty/whitespace-only strings all count as
/// absent for the `required` check
fn is_absent(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.trim().is_empty(),
        Some(_) => false,
    }
}

fn check_type(value: &Value, field_type: FieldType, field: &str) -> Option<String> {
    match field_type {
        FieldType::Text => {
            if value.is_string() {
                None
            } else {
                Some(format!("{} must be a string", field))
            }
        }
        FieldType::Email => match value.as_str() {
            Some(s) if s.validate_email() => None,
            _ => Some(format!("{} must be a valid email address", field)),
        },
        FieldType::Uuid => match value.as_str() {
            Some(s) if is_uuid_v4(s) => None,
            _ => Some(format!("{} must be a valid UUID", field)),
        },
        FieldType::Number => match value.as_f64() {
            Some(n) if n.is_finite() => None,
            _ => Some(format!("{} must be a number", field)),
        },
    }
}

fn is_uuid_v4(s: &str) -> bool {
    Uuid::parse_str(s).is_ok_and(|u| u.get_version_num() == 4)
}

fn fail(rule: &ValidationRule, default: String) -> String {
    rule.message.clone().unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    // === required ===

    #[test]
    fn test_required_missing_field_fails() {
        let rules = vec![ValidationRule::new("email").required()];
        let errors = validate(&json!({}), &rules);
        assert_eq!(errors, vec!["email is required"]);
    }

    #[test]
    fn test_required_null_fails() {
        let rules = vec![ValidationRule::new("email").required()];
        let errors = validate(&json!({ "email": null }), &rules);
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn test_required_whitespace_string_fails() {
        let rules = vec![ValidationRule::new("name").required()];
        let errors = validate(&json!({ "name": "   " }), &rules);
        assert_eq!(errors, vec!["name is required"]);
    }

    #[test]
    fn test_required_present_passes() {
        let rules = vec![ValidationRule::new("name").required()];
        assert!(validate(&json!({ "name": "Ada" }), &rules).is_empty());
    }

    #[test]
    fn test_optional_missing_passes() {
        let rules = vec![ValidationRule::new("description").text().max_length(10)];
        assert!(validate(&json!({}), &rules).is_empty());
    }

    // === type checks ===

    #[test]
    fn test_text_rejects_number() {
        let rules = vec![ValidationRule::new("name").text()];
        let errors = validate(&json!({ "name": 42 }), &rules);
        assert_eq!(errors, vec!["name must be a string"]);
    }

    #[test]
    fn test_email_accepts_valid_address() {
        let rules = vec![ValidationRule::new("email").email()];
        assert!(validate(&json!({ "email": "ada@lovelace.dev" }), &rules).is_empty());
    }

    #[test]
    fn test_email_rejects_invalid_address() {
        let rules = vec![ValidationRule::new("email").email()];
        let errors = validate(&json!({ "email": "not-an-email" }), &rules);
        assert_eq!(errors, vec!["email must be a valid email address"]);
    }

    #[test]
    fn test_uuid_accepts_v4() {
        let rules = vec![ValidationRule::new("id").uuid()];
        let id = uuid::Uuid::new_v4().to_string();
        assert!(validate(&json!({ "id": id }), &rules).is_empty());
    }

    #[test]
    fn test_uuid_rejects_non_v4() {
        let rules = vec![ValidationRule::new("id").uuid()];
        // v1-style UUID: valid syntax, wrong version
        let errors = validate(
            &json!({ "id": "c232ab00-9414-11ec-b3c8-9f6bdeced846" }),
            &rules,
        );
        assert_eq!(errors, vec!["id must be a valid UUID"]);
    }

    #[test]
    fn test_uuid_rejects_garbage() {
        let rules = vec![ValidationRule::new("id").uuid()];
        let errors = validate(&json!({ "id": "123" }), &rules);
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn test_number_accepts_integer_and_float() {
        let rules = vec![ValidationRule::new("limit").number()];
        assert!(validate(&json!({ "limit": 10 }), &rules).is_empty());
        assert!(validate(&json!({ "limit": 10.5 }), &rules).is_empty());
    }

    #[test]
    fn test_number_rejects_numeric_string() {
        let rules = vec![ValidationRule::new("limit").number()];
        let errors = validate(&json!({ "limit": "10" }), &rules);
        assert_eq!(errors, vec!["limit must be a number"]);
    }

    // === length, pattern, custom ===

    #[test]
    fn test_min_length_enforced() {
        let rules = vec![ValidationRule::new("name").text().min_length(3)];
        let errors = validate(&json!({ "name": "ab" }), &rules);
        assert_eq!(errors, vec!["name must be at least 3 characters"]);
    }

    #[test]
    fn test_length_counts_characters_not_bytes() {
        // "héé" is 3 characters but 5 bytes; a byte-based check would reject it
        let rules = vec![ValidationRule::new("name").text().max_length(3)];
        assert!(validate(&json!({ "name": "héé" }), &rules).is_empty());
    }

    #[test]
    fn test_max_length_enforced() {
        let rules = vec![ValidationRule::new("title").text().max_length(5)];
        let errors = validate(&json!({ "title": "too long title" }), &rules);
        assert_eq!(errors, vec!["title must be at most 5 characters"]);
    }

    #[test]
    fn test_pattern_mismatch_fails() {
        let rules = vec![ValidationRule::new("slug").text().pattern("^[a-z-]+$")];
        let errors = validate(&json!({ "slug": "Not A Slug" }), &rules);
        assert_eq!(errors, vec!["slug has an invalid format"]);
    }

    #[test]
    fn test_custom_predicate_false_fails() {
        let rules = vec![
            ValidationRule::new("count")
                .number()
                .custom(|v| v.as_f64().is_some_and(|n| n > 0.0)),
        ];
        let errors = validate(&json!({ "count": -3 }), &rules);
        assert_eq!(errors, vec!["count is invalid"]);
    }

    // === ordering and collect-all semantics ===

    #[test]
    fn test_first_failure_short_circuits_field() {
        // Wrong type: length and custom checks must not also fire
        let rules = vec![
            ValidationRule::new("name")
                .text()
                .min_length(100)
                .custom(|_| false),
        ];
        let errors = validate(&json!({ "name": 42 }), &rules);
        assert_eq!(errors, vec!["name must be a string"]);
    }

    #[test]
    fn test_all_fields_collected() {
        let rules = vec![
            ValidationRule::new("email").required().email(),
            ValidationRule::new("name").required(),
            ValidationRule::new("role").text(),
        ];
        let errors = validate(&json!({ "role": 1 }), &rules);
        assert_eq!(
            errors,
            vec![
                "email is required",
                "name is required",
                "role must be a string"
            ]
        );
    }

    #[test]
    fn test_message_override_replaces_default() {
        let rules = vec![
            ValidationRule::new("email")
                .required()
                .message("Email address is mandatory"),
        ];
        let errors = validate(&json!({}), &rules);
        assert_eq!(errors, vec!["Email address is mandatory"]);
    }

    #[test]
    fn test_engine_is_deterministic() {
        let rules = vec![
            ValidationRule::new("email").required().email(),
            ValidationRule::new("name").required().min_length(2),
        ];
        let input = json!({ "email": "bad", "name": "x" });
        let first = validate(&input, &rules);
        let second = validate(&input, &rules);
        assert_eq!(first, second);
    }

    #[test]
    fn test_input_is_untouched() {
        let rules = vec![ValidationRule::new("name").required()];
        let input = json!({ "name": "Ada", "extra": {"nested": true} });
        let before = input.clone();
        let _ = validate(&input, &rules);
        assert_eq!(input, before);
    }

    // === validate_as_error ===

    #[test]
    fn test_validate_as_error_uses_first_message_and_full_details() {
        let rules = vec![
            ValidationRule::new("email").required(),
            ValidationRule::new("name").required(),
        ];
        let err = validate_as_error(&json!({}), &rules).expect_err("should fail");
        match err {
            ApiError::Validation { message, details } => {
                assert_eq!(message, "email is required");
                assert_eq!(details.len(), 2);
            }
            other => panic!("expected Validation, got {:?}", other),
        }
    }

    #[test]
    fn test_validate_as_error_passes_clean_input() {
        let rules = vec![ValidationRule::new("email").required().email()];
        assert!(validate_as_error(&json!({ "email": "a@b.co" }), &rules).is_ok());
    }
}
