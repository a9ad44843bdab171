//! Field values, errors and touched flags for one form.

use std::collections::BTreeSet;

use crate::domain::{
    validate_form, validate_in_context, FieldRule, FieldRules, FieldValue, FieldValues, ValidationResult,
};

/// Mutable state of a form while it is on screen.
///
/// Errors are cleared as soon as the user edits a field and are only
/// recomputed on blur, step advance or submit. Live fields are the
/// exception: their error is recomputed on every change so the user gets
/// immediate feedback (used for the password pair).
#[derive(Debug, Clone, Default)]
pub struct FormState {
    pub values: FieldValues,
    pub errors: ValidationResult,
    pub touched: BTreeSet<String>,
    initial: FieldValues,
    live: FieldRules,
}

impl FormState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a form whose values start from (and reset to) `initial`.
    pub fn with_values(initial: FieldValues) -> Self {
        Self {
            values: initial.clone(),
            initial,
            ..Self::default()
        }
    }

    /// Marks `field` as validated on every change using `rule`.
    pub fn with_live_field(mut self, field: impl Into<String>, rule: FieldRule) -> Self {
        self.live.insert(field.into(), rule);
        self
    }

    pub fn value(&self, field: &str) -> Option<&FieldValue> {
        self.values.get(field)
    }

    /// Textual value of `field`, empty when unset.
    pub fn text(&self, field: &str) -> String {
        self.values
            .get(field)
            .map(|value| value.as_text().into_owned())
            .unwrap_or_default()
    }

    pub fn error(&self, field: &str) -> Option<&str> {
        self.errors.get(field)
    }

    pub fn is_touched(&self, field: &str) -> bool {
        self.touched.contains(field)
    }

    pub fn is_live(&self, field: &str) -> bool {
        self.live.contains_key(field)
    }

    /// Overwrites a field value.
    ///
    /// An existing error on the field is dropped, unless the field is live,
    /// in which case its error is recomputed. Live fields that must match
    /// this one are rechecked too when they already hold a value.
    pub fn set_field(&mut self, field: &str, value: impl Into<FieldValue>) {
        self.values.insert(field.to_string(), value.into());

        if self.live.contains_key(field) {
            self.refresh_live(field);
        } else {
            self.errors.remove(field);
        }

        let dependents: Vec<String> = self
            .live
            .iter()
            .filter(|(name, rule)| name.as_str() != field && rule.must_match.as_deref() == Some(field))
            .map(|(name, _)| name.clone())
            .collect();
        for dependent in dependents {
            let filled = self.values.get(&dependent).is_some_and(|value| !value.is_empty());
            if filled {
                self.refresh_live(&dependent);
            }
        }
    }

    /// Records that the user has left `field`. Does not validate.
    pub fn set_touched(&mut self, field: &str) {
        self.touched.insert(field.to_string());
    }

    /// Touches `field` and validates it alone when it has a rule.
    pub fn blur(&mut self, field: &str, rule: Option<&FieldRule>) {
        self.set_touched(field);
        if let Some(rule) = rule {
            match validate_in_context(&self.values, field, rule) {
                Some(message) => self.errors.insert(field, message),
                None => {
                    self.errors.remove(field);
                }
            }
        }
    }

    /// Validates all ruled fields, replacing the current errors.
    ///
    /// Returns true when the form is valid.
    pub fn validate(&mut self, rules: &FieldRules) -> bool {
        self.errors = validate_form(&self.values, rules);
        self.errors.is_valid()
    }

    pub fn set_errors(&mut self, errors: ValidationResult) {
        self.errors = errors;
    }

    pub fn set_error(&mut self, field: &str, message: impl Into<String>) {
        self.errors.insert(field, message);
    }

    pub fn clear_errors(&mut self) {
        self.errors.clear();
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_valid()
    }

    /// Restores the initial values and forgets errors and touched flags.
    pub fn reset(&mut self) {
        self.values = self.initial.clone();
        self.errors.clear();
        self.touched.clear();
    }

    fn refresh_live(&mut self, field: &str) {
        let Some(rule) = self.live.get(field) else {
            return;
        };
        let empty = self.values.get(field).is_none_or(FieldValue::is_empty);
        let message = if empty {
            None
        } else {
            validate_in_context(&self.values, field, rule)
        };
        match message {
            Some(message) => self.errors.insert(field, message),
            None => {
                self.errors.remove(field);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{MISMATCH_MESSAGE, REQUIRED_MESSAGE, WEAK_PASSWORD_MESSAGE};

    fn password_form() -> FormState {
        FormState::new()
            .with_live_field("password", FieldRule::password().required())
            .with_live_field("confirmPassword", FieldRule::text().required().must_match("password"))
    }

    #[test]
    fn test_set_field_clears_error() {
        let mut form = FormState::new();
        form.set_error("name", REQUIRED_MESSAGE);
        form.set_field("name", "Ada");
        assert!(form.error("name").is_none());
        assert_eq!(form.text("name"), "Ada");
    }

    #[test]
    fn test_set_field_twice_does_not_resurrect_error() {
        let mut form = FormState::new();
        form.set_error("name", REQUIRED_MESSAGE);
        form.set_field("name", "Ada");
        let values_after_first = form.values.clone();
        form.set_field("name", "Ada");
        assert_eq!(form.values, values_after_first);
        assert!(form.error("name").is_none());
    }

    #[test]
    fn test_set_touched_does_not_validate() {
        let mut form = FormState::new();
        form.set_touched("email");
        assert!(form.is_touched("email"));
        assert!(form.is_valid());
    }

    #[test]
    fn test_blur_validates_single_field() {
        let mut form = FormState::new();
        form.set_field("email", "not-an-email");
        form.blur("email", Some(&FieldRule::email().required()));
        assert!(form.is_touched("email"));
        assert!(form.error("email").is_some());

        form.set_field("email", "a@b.co");
        form.blur("email", Some(&FieldRule::email().required()));
        assert!(form.error("email").is_none());
    }

    #[test]
    fn test_live_password_recomputed() {
        let mut form = password_form();
        form.set_field("password", "weak");
        assert_eq!(form.error("password"), Some(WEAK_PASSWORD_MESSAGE));
        form.set_field("password", "weak");
        assert_eq!(form.error("password"), Some(WEAK_PASSWORD_MESSAGE));
        form.set_field("password", "Strong123");
        assert!(form.error("password").is_none());
        form.set_field("password", "");
        assert!(form.error("password").is_none());
    }

    #[test]
    fn test_live_confirm_follows_password() {
        let mut form = password_form();
        form.set_field("password", "Strong123");
        form.set_field("confirmPassword", "Strong12");
        assert_eq!(form.error("confirmPassword"), Some(MISMATCH_MESSAGE));
        form.set_field("confirmPassword", "Strong123");
        assert!(form.error("confirmPassword").is_none());

        form.set_field("password", "Strong1234");
        assert_eq!(form.error("confirmPassword"), Some(MISMATCH_MESSAGE));
    }

    #[test]
    fn test_validate_and_reset() {
        let mut initial = FieldValues::new();
        initial.insert("phone".into(), FieldValue::from("+994"));
        let mut form = FormState::with_values(initial);
        let mut rules = FieldRules::new();
        rules.insert("name".into(), FieldRule::text().required());

        assert!(!form.validate(&rules));
        assert_eq!(form.error("name"), Some(REQUIRED_MESSAGE));

        form.set_field("name", "Ada");
        form.set_touched("name");
        assert!(form.validate(&rules));

        form.reset();
        assert_eq!(form.text("phone"), "+994");
        assert_eq!(form.text("name"), "");
        assert!(form.touched.is_empty());
    }
}
