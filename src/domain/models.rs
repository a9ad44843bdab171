use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::errors::DomainResult;

/// A single scalar form value.
///
/// Forms never nest: every field holds text, a number or a flag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Bool(bool),
    Number(f64),
    Text(String),
}

impl Default for FieldValue {
    fn default() -> Self {
        FieldValue::Text(String::new())
    }
}

impl FieldValue {
    /// Returns true for blank text and for an unchecked flag.
    ///
    /// Numbers are never empty; a non-finite number is caught by the
    /// number check instead.
    pub fn is_empty(&self) -> bool {
        match self {
            FieldValue::Text(text) => text.trim().is_empty(),
            FieldValue::Bool(flag) => !flag,
            FieldValue::Number(_) => false,
        }
    }

    pub fn as_text(&self) -> Cow<'_, str> {
        match self {
            FieldValue::Text(text) => Cow::Borrowed(text.as_str()),
            FieldValue::Number(number) => Cow::Owned(number.to_string()),
            FieldValue::Bool(flag) => Cow::Owned(flag.to_string()),
        }
    }

    /// Parses the value as a finite number.
    pub fn as_number(&self) -> Option<f64> {
        let number = match self {
            FieldValue::Number(number) => *number,
            FieldValue::Text(text) => text.trim().parse::<f64>().ok()?,
            FieldValue::Bool(_) => return None,
        };
        number.is_finite().then_some(number)
    }

    pub fn as_bool(&self) -> bool {
        match self {
            FieldValue::Bool(flag) => *flag,
            FieldValue::Text(text) => text == "true",
            FieldValue::Number(number) => *number != 0.0,
        }
    }

    /// Length in characters of the textual form.
    pub fn char_len(&self) -> usize {
        self.as_text().chars().count()
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_text())
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Number(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Bool(value)
    }
}

/// Field values keyed by field name.
pub type FieldValues = BTreeMap<String, FieldValue>;

/// Failing fields mapped to their error message. An absent field is valid.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValidationResult(BTreeMap<String, String>);

impl ValidationResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_valid(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn insert(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.insert(field.into(), message.into());
    }

    pub fn remove(&mut self, field: &str) -> Option<String> {
        self.0.remove(field)
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(field, message)| (field.as_str(), message.as_str()))
    }
}

impl FromIterator<(String, String)> for ValidationResult {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// The format check a rule applies after the required check.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    #[default]
    Text,
    Email,
    Tel,
    Password,
    Number,
}

/// Which check a message override applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Required,
    Format,
    Range,
    MinLength,
    MaxLength,
    Pattern,
    Choice,
    Mismatch,
}

/// Per-check message overrides. `None` falls back to the default message.
#[derive(Debug, Clone, Default)]
pub struct RuleMessages {
    pub required: Option<String>,
    pub format: Option<String>,
    pub range: Option<String>,
    pub min_length: Option<String>,
    pub max_length: Option<String>,
    pub pattern: Option<String>,
    pub choice: Option<String>,
    pub mismatch: Option<String>,
}

impl RuleMessages {
    pub fn get(&self, kind: MessageKind) -> Option<&str> {
        let slot = match kind {
            MessageKind::Required => &self.required,
            MessageKind::Format => &self.format,
            MessageKind::Range => &self.range,
            MessageKind::MinLength => &self.min_length,
            MessageKind::MaxLength => &self.max_length,
            MessageKind::Pattern => &self.pattern,
            MessageKind::Choice => &self.choice,
            MessageKind::Mismatch => &self.mismatch,
        };
        slot.as_deref()
    }

    fn slot_mut(&mut self, kind: MessageKind) -> &mut Option<String> {
        match kind {
            MessageKind::Required => &mut self.required,
            MessageKind::Format => &mut self.format,
            MessageKind::Range => &mut self.range,
            MessageKind::MinLength => &mut self.min_length,
            MessageKind::MaxLength => &mut self.max_length,
            MessageKind::Pattern => &mut self.pattern,
            MessageKind::Choice => &mut self.choice,
            MessageKind::Mismatch => &mut self.mismatch,
        }
    }
}

/// Declarative constraints for one form field.
///
/// Rules are built fluently:
///
/// ```
/// use bankform::domain::{FieldRule, MessageKind};
///
/// let rule = FieldRule::email()
///     .required()
///     .message(MessageKind::Required, "Email is required");
/// assert!(rule.required);
/// ```
#[derive(Debug, Clone, Default)]
pub struct FieldRule {
    pub required: bool,
    pub field_type: FieldType,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub exclusive_min: bool,
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
    pub pattern: Option<Regex>,
    pub one_of: Option<Vec<String>>,
    pub must_match: Option<String>,
    pub messages: RuleMessages,
}

impl FieldRule {
    pub fn new(field_type: FieldType) -> Self {
        Self {
            field_type,
            ..Self::default()
        }
    }

    pub fn text() -> Self {
        Self::new(FieldType::Text)
    }

    pub fn email() -> Self {
        Self::new(FieldType::Email)
    }

    pub fn tel() -> Self {
        Self::new(FieldType::Tel)
    }

    pub fn password() -> Self {
        Self::new(FieldType::Password)
    }

    pub fn number() -> Self {
        Self::new(FieldType::Number)
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn range(mut self, min: f64, max: f64) -> Self {
        self.min = Some(min);
        self.max = Some(max);
        self
    }

    /// Makes the lower bound of the number range exclusive.
    pub fn exclusive_min(mut self) -> Self {
        self.exclusive_min = true;
        self
    }

    pub fn min_length(mut self, length: usize) -> Self {
        self.min_length = Some(length);
        self
    }

    pub fn max_length(mut self, length: usize) -> Self {
        self.max_length = Some(length);
        self
    }

    /// Requires exactly `length` characters.
    pub fn exact_length(self, length: usize) -> Self {
        self.min_length(length).max_length(length)
    }

    pub fn pattern(mut self, pattern: Regex) -> Self {
        self.pattern = Some(pattern);
        self
    }

    /// Compiles `pattern` and attaches it to the rule.
    pub fn try_pattern(self, pattern: &str) -> DomainResult<Self> {
        Ok(self.pattern(Regex::new(pattern)?))
    }

    pub fn one_of<I, S>(mut self, allowed: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.one_of = Some(allowed.into_iter().map(Into::into).collect());
        self
    }

    /// The field must equal the value of `other` once its own checks pass.
    pub fn must_match(mut self, other: impl Into<String>) -> Self {
        self.must_match = Some(other.into());
        self
    }

    pub fn message(mut self, kind: MessageKind, text: impl Into<String>) -> Self {
        *self.messages.slot_mut(kind) = Some(text.into());
        self
    }
}

/// Rules keyed by field name.
pub type FieldRules = BTreeMap<String, FieldRule>;

/// One page of a multi-page form.
#[derive(Debug, Clone, Default)]
pub struct StepDefinition {
    /// One-based position of the step in its flow.
    pub index: usize,
    /// Fields shown on this step, in display order.
    pub fields: Vec<String>,
    pub rules: FieldRules,
}

impl StepDefinition {
    pub fn new(index: usize) -> Self {
        Self {
            index,
            ..Self::default()
        }
    }

    /// Adds a validated field.
    pub fn rule(mut self, field: impl Into<String>, rule: FieldRule) -> Self {
        let field = field.into();
        self.fields.push(field.clone());
        self.rules.insert(field, rule);
        self
    }

    /// Adds a field that carries no rule, such as an optional flag.
    pub fn input(mut self, field: impl Into<String>) -> Self {
        self.fields.push(field.into());
        self
    }
}
