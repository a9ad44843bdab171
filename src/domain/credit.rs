//! Credit limit derivation for new credit cards.

use serde::{Deserialize, Serialize};

use super::models::{FieldRule, FieldValue, FieldValues, MessageKind, ValidationResult};
use super::validation::validate_field;

/// Maximum approvable limit as a multiple of monthly income.
pub const INCOME_MULTIPLIER: f64 = 3.0;
pub const MIN_MONTHLY_INCOME: f64 = 300.0;
pub const MIN_CREDIT_LIMIT: f64 = 100.0;

/// Outcome of an eligibility check. Never a rejection: an oversized request
/// is cut down to the income-based maximum.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "limit", rename_all = "lowercase")]
pub enum CreditDecision {
    Approved(f64),
    Adjusted(f64),
}

impl CreditDecision {
    pub fn limit(&self) -> f64 {
        match self {
            CreditDecision::Approved(limit) | CreditDecision::Adjusted(limit) => *limit,
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            CreditDecision::Approved(_) => "Credit Approved!",
            CreditDecision::Adjusted(_) => "Limit Adjusted",
        }
    }

    pub fn message(&self) -> String {
        match self {
            CreditDecision::Approved(limit) => {
                format!("Your credit limit has been approved: {limit} AZN")
            }
            CreditDecision::Adjusted(limit) => {
                format!("Maximum credit limit based on your income: {limit} AZN")
            }
        }
    }
}

/// Derives the approved limit from income and the requested limit.
///
/// ```
/// use bankform::domain::{derive_credit_limit, CreditDecision};
///
/// assert_eq!(derive_credit_limit(1000.0, 2000.0), CreditDecision::Approved(2000.0));
/// assert_eq!(derive_credit_limit(500.0, 2000.0), CreditDecision::Adjusted(1500.0));
/// ```
pub fn derive_credit_limit(monthly_income: f64, desired_limit: f64) -> CreditDecision {
    let max_possible_limit = monthly_income * INCOME_MULTIPLIER;
    if desired_limit <= max_possible_limit {
        CreditDecision::Approved(desired_limit)
    } else {
        CreditDecision::Adjusted(max_possible_limit)
    }
}

pub fn monthly_income_rule() -> FieldRule {
    FieldRule::number()
        .required()
        .range(MIN_MONTHLY_INCOME, f64::MAX)
        .message(MessageKind::Required, "Please enter your monthly income")
        .message(MessageKind::Format, "Please enter your monthly income")
        .message(MessageKind::Range, "Minimum monthly income is 300 AZN")
}

pub fn desired_limit_rule() -> FieldRule {
    FieldRule::number()
        .required()
        .range(MIN_CREDIT_LIMIT, f64::MAX)
        .message(MessageKind::Required, "Minimum credit limit is 100 AZN")
        .message(MessageKind::Format, "Minimum credit limit is 100 AZN")
        .message(MessageKind::Range, "Minimum credit limit is 100 AZN")
}

/// Validates the credit inputs and, when they pass, derives the decision.
pub fn check_eligibility(
    values: &FieldValues,
    income_field: &str,
    limit_field: &str,
) -> Result<CreditDecision, ValidationResult> {
    let empty = FieldValue::default();
    let income = values.get(income_field).unwrap_or(&empty);
    let limit = values.get(limit_field).unwrap_or(&empty);

    let mut errors = ValidationResult::new();
    if let Some(message) = validate_field(income, &monthly_income_rule()) {
        errors.insert(income_field, message);
    }
    if let Some(message) = validate_field(limit, &desired_limit_rule()) {
        errors.insert(limit_field, message);
    }

    match (income.as_number(), limit.as_number()) {
        (Some(income), Some(limit)) if errors.is_valid() => Ok(derive_credit_limit(income, limit)),
        _ => Err(errors),
    }
}
