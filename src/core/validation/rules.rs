//! Per-field validation rules and their fluent builder

use regex::Regex;
use serde_json::Value;
use std::sync::Arc;

/// Ad-hoc predicate applied after the built-in checks
pub type CustomValidator = Arc<dyn Fn(&Value) -> bool + Send + Sync>;

/// Primitive shape a field value must have
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    /// Any JSON string
    Text,
    /// String accepted as an email address
    Email,
    /// String parsing as a version-4 UUID
    Uuid,
    /// Finite JSON number
    Number,
}

/// Declarative rule for a single input field
///
/// Checks run in a fixed order: required → type → length bounds → pattern →
/// custom predicate. The first failing check ends evaluation for that field;
/// other fields are still checked.
#[derive(Clone)]
pub struct ValidationRule {
    pub(crate) field: String,
    pub(crate) required: bool,
    pub(crate) field_type: Option<FieldType>,
    pub(crate) min_length: Option<usize>,
    pub(crate) max_length: Option<usize>,
    pub(crate) pattern: Option<Regex>,
    pub(crate) custom: Option<CustomValidator>,
    pub(crate) message: Option<String>,
}

impl ValidationRule {
    /// Start a rule for `field`; optional and untyped until configured
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            required: false,
            field_type: None,
            min_length: None,
            max_length: None,
            pattern: None,
            custom: None,
            message: None,
        }
    }

    /// The value must be present and non-empty
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn text(mut self) -> Self {
        self.field_type = Some(FieldType::Text);
        self
    }

    pub fn email(mut self) -> Self {
        self.field_type = Some(FieldType::Email);
        self
    }

    pub fn uuid(mut self) -> Self {
        self.field_type = Some(FieldType::Uuid);
        self
    }

    pub fn number(mut self) -> Self {
        self.field_type = Some(FieldType::Number);
        self
    }

    /// Minimum length in characters (not bytes)
    pub fn min_length(mut self, min: usize) -> Self {
        self.min_length = Some(min);
        self
    }

    /// Maximum length in characters (not bytes)
    pub fn max_length(mut self, max: usize) -> Self {
        self.max_length = Some(max);
        self
    }

    /// String values must match `pattern`
    ///
    /// # Panics
    ///
    /// Panics if `pattern` is not a valid regex. Rules are compile-time-fixed
    /// policy built at startup, so a bad pattern is a programming error.
    pub fn pattern(mut self, pattern: &str) -> Self {
        self.pattern = Some(Regex::new(pattern).expect("invalid validation rule pattern"));
        self
    }

    /// Attach an ad-hoc predicate; `false` fails the field
    pub fn custom<F>(mut self, validator: F) -> Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        self.custom = Some(Arc::new(validator));
        self
    }

    /// The value must be one of `allowed` (string-typed shorthand for a
    /// custom predicate)
    pub fn one_of(self, allowed: &'static [&'static str]) -> Self {
        let field = self.field.clone();
        self.custom(move |value| {
            value.as_str().is_some_and(|s| allowed.contains(&s))
        })
        .message(format!("{} must be one of: {}", field, allowed.join(", ")))
    }

    /// Override the default error message for this rule
    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Field this rule applies to
    pub fn field(&self) -> &str {
        &self.field
    }
}

impl std::fmt::Debug for ValidationRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValidationRule")
            .field("field", &self.field)
            .field("required", &self.required)
            .field("field_type", &self.field_type)
            .field("min_length", &self.min_length)
            .field("max_length", &self.max_length)
            .field("pattern", &self.pattern.as_ref().map(Regex::as_str))
            .field("custom", &self.custom.is_some())
            .field("message", &self.message)
            .finish()
    }
}
