//! Field and form validation.
//!
//! Every check here is a pure function of a value and a [`FieldRule`].
//! Failures come back as messages, never as errors or panics, so callers
//! can render them next to the offending field.
//!
//! Checks run in a fixed order and the first failure wins:
//!
//! 1. required
//! 2. type format (email, phone, password strength, number bounds)
//! 3. length bounds
//! 4. custom pattern
//! 5. allowed values
//!
//! [`validate_form`] adds one cross-field check on top: a field with
//! `must_match` has to equal the named field once its own checks pass.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use super::models::{FieldRule, FieldRules, FieldType, FieldValue, FieldValues, MessageKind, ValidationResult};

pub const REQUIRED_MESSAGE: &str = "This field is required";
pub const INVALID_EMAIL_MESSAGE: &str = "Please enter a valid email address";
pub const INVALID_PHONE_MESSAGE: &str = "Please enter a valid phone number";
pub const WEAK_PASSWORD_MESSAGE: &str =
    "Password must be at least 8 characters with uppercase, lowercase, and numbers";
pub const INVALID_PATTERN_MESSAGE: &str = "Invalid format";
pub const INVALID_CHOICE_MESSAGE: &str = "Please select a valid option";
pub const MISMATCH_MESSAGE: &str = "Passwords do not match";

/// Upper bound used by number rules that set no maximum.
pub const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

/// Minimum password length for the length bucket.
pub const MIN_PASSWORD_LENGTH: usize = 8;

static EMAIL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern compiles"));

// Country prefix, mobile operator code, seven subscriber digits.
static PHONE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+994(50|51|55|70|77)\d{7}$").expect("phone pattern compiles"));

static DIGITS_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+$").expect("digits pattern compiles"));

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_PATTERN.is_match(email)
}

pub fn is_valid_phone(phone: &str) -> bool {
    PHONE_PATTERN.is_match(phone)
}

/// Pattern matching one or more ASCII digits and nothing else.
pub fn digits_pattern() -> Regex {
    DIGITS_PATTERN.clone()
}

/// Checks that `value` is a finite number inside the given bounds.
///
/// The lower bound is inclusive unless `exclusive_min` is set; the upper
/// bound is always inclusive.
pub fn is_valid_amount(value: &FieldValue, min: f64, max: f64, exclusive_min: bool) -> bool {
    match value.as_number() {
        Some(amount) => {
            let above_min = if exclusive_min { amount > min } else { amount >= min };
            above_min && amount <= max
        }
        None => false,
    }
}

/// Coarse label for a strength score.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrengthLabel {
    Weak,
    Moderate,
    Strong,
}

impl fmt::Display for StrengthLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            StrengthLabel::Weak => "Weak",
            StrengthLabel::Moderate => "Moderate",
            StrengthLabel::Strong => "Strong",
        };
        f.write_str(text)
    }
}

/// Result of the four password strength checks.
///
/// Each passing check is worth 25 points. The score only drives the
/// strength meter: a password is valid only when all four checks pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PasswordStrength {
    pub long_enough: bool,
    pub has_uppercase: bool,
    pub has_lowercase: bool,
    pub has_digit: bool,
}

impl PasswordStrength {
    pub fn evaluate(password: &str) -> Self {
        Self {
            long_enough: password.chars().count() >= MIN_PASSWORD_LENGTH,
            has_uppercase: password.chars().any(|c| c.is_ascii_uppercase()),
            has_lowercase: password.chars().any(|c| c.is_ascii_lowercase()),
            has_digit: password.chars().any(|c| c.is_ascii_digit()),
        }
    }

    /// Score from 0 to 100 in steps of 25.
    pub fn score(&self) -> u8 {
        [self.long_enough, self.has_uppercase, self.has_lowercase, self.has_digit]
            .iter()
            .filter(|passed| **passed)
            .count() as u8
            * 25
    }

    pub fn is_valid(&self) -> bool {
        self.long_enough && self.has_uppercase && self.has_lowercase && self.has_digit
    }

    pub fn label(&self) -> StrengthLabel {
        match self.score() {
            s if s < 30 => StrengthLabel::Weak,
            s if s < 70 => StrengthLabel::Moderate,
            _ => StrengthLabel::Strong,
        }
    }
}

fn message_or(rule: &FieldRule, kind: MessageKind, default: impl FnOnce() -> String) -> String {
    rule.messages
        .get(kind)
        .map(str::to_string)
        .unwrap_or_else(default)
}

fn check_format(value: &FieldValue, rule: &FieldRule) -> Option<String> {
    let text = value.as_text();
    match rule.field_type {
        FieldType::Text => None,
        FieldType::Email if !is_valid_email(&text) => {
            Some(message_or(rule, MessageKind::Format, || INVALID_EMAIL_MESSAGE.to_string()))
        }
        FieldType::Tel if !is_valid_phone(&text) => {
            Some(message_or(rule, MessageKind::Format, || INVALID_PHONE_MESSAGE.to_string()))
        }
        FieldType::Password if !PasswordStrength::evaluate(&text).is_valid() => {
            Some(message_or(rule, MessageKind::Format, || WEAK_PASSWORD_MESSAGE.to_string()))
        }
        FieldType::Number => {
            let min = rule.min.unwrap_or(0.0);
            let max = rule.max.unwrap_or(MAX_SAFE_INTEGER);
            let range_message = || format!("Amount must be between {min} and {max}");
            if value.as_number().is_none() {
                let message = rule
                    .messages
                    .get(MessageKind::Format)
                    .or_else(|| rule.messages.get(MessageKind::Range))
                    .map(str::to_string)
                    .unwrap_or_else(range_message);
                Some(message)
            } else if !is_valid_amount(value, min, max, rule.exclusive_min) {
                Some(message_or(rule, MessageKind::Range, range_message))
            } else {
                None
            }
        }
        _ => None,
    }
}

/// Validates one value against one rule.
///
/// Returns the first failing check's message, or `None` when the value is
/// acceptable. An empty value only fails when the rule is required.
///
/// ```
/// use bankform::domain::{validate_field, FieldRule, FieldValue};
///
/// let rule = FieldRule::email().required();
/// assert!(validate_field(&FieldValue::from("a@b.co"), &rule).is_none());
/// assert!(validate_field(&FieldValue::from("a@b"), &rule).is_some());
/// ```
pub fn validate_field(value: &FieldValue, rule: &FieldRule) -> Option<String> {
    if value.is_empty() {
        return rule
            .required
            .then(|| message_or(rule, MessageKind::Required, || REQUIRED_MESSAGE.to_string()));
    }

    if let Some(message) = check_format(value, rule) {
        return Some(message);
    }

    let length = value.char_len();
    if let Some(min_length) = rule.min_length {
        if length < min_length {
            return Some(message_or(rule, MessageKind::MinLength, || {
                format!("Minimum length is {min_length} characters")
            }));
        }
    }
    if let Some(max_length) = rule.max_length {
        if length > max_length {
            return Some(message_or(rule, MessageKind::MaxLength, || {
                format!("Maximum length is {max_length} characters")
            }));
        }
    }

    let text = value.as_text();
    if let Some(pattern) = &rule.pattern {
        if !pattern.is_match(&text) {
            return Some(message_or(rule, MessageKind::Pattern, || INVALID_PATTERN_MESSAGE.to_string()));
        }
    }

    if let Some(allowed) = &rule.one_of {
        if !allowed.iter().any(|option| option.as_str() == &*text) {
            return Some(message_or(rule, MessageKind::Choice, || INVALID_CHOICE_MESSAGE.to_string()));
        }
    }

    None
}

/// Validates the named field inside a whole set of values, including the
/// cross-field `must_match` check. Missing fields are validated as empty.
pub fn validate_in_context(values: &FieldValues, field: &str, rule: &FieldRule) -> Option<String> {
    let empty = FieldValue::default();
    let value = values.get(field).unwrap_or(&empty);

    if let Some(message) = validate_field(value, rule) {
        return Some(message);
    }

    if let Some(other) = &rule.must_match {
        if !value.is_empty() {
            let other_value = values.get(other.as_str()).unwrap_or(&empty);
            if value.as_text() != other_value.as_text() {
                return Some(message_or(rule, MessageKind::Mismatch, || MISMATCH_MESSAGE.to_string()));
            }
        }
    }

    None
}

/// Validates every ruled field and returns only the failures.
///
/// A form is valid when the returned result is empty.
pub fn validate_form(values: &FieldValues, rules: &FieldRules) -> ValidationResult {
    rules
        .iter()
        .filter_map(|(field, rule)| {
            validate_in_context(values, field, rule).map(|message| (field.clone(), message))
        })
        .collect()
}
