//! The contract between a completed form and whatever consumes it.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::FieldValues;

/// Shown when a collaborator fails without saying why.
pub const DEFAULT_SUBMIT_ERROR: &str = "An error occurred. Please try again.";

/// `{ success, error?, data? }` as returned by a submit collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmitOutcome {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl SubmitOutcome {
    pub fn success<T: Serialize>(data: &T) -> Self {
        Self {
            success: true,
            error: None,
            data: serde_json::to_value(data).ok(),
        }
    }

    pub fn empty_success() -> Self {
        Self {
            success: true,
            error: None,
            data: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            data: None,
        }
    }

    /// The error text to show, verbatim when the collaborator gave one.
    pub fn error_message(&self) -> &str {
        self.error.as_deref().unwrap_or(DEFAULT_SUBMIT_ERROR)
    }
}

/// An external, possibly slow and possibly failing consumer of form values.
#[async_trait]
pub trait SubmitCollaborator: Send + Sync {
    async fn submit(&self, values: &FieldValues) -> SubmitOutcome;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_shape() {
        let ok = SubmitOutcome::success(&serde_json::json!({"id": "u1"}));
        let json = serde_json::to_value(&ok).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["data"]["id"], "u1");
        assert!(json.get("error").is_none());

        let failed: SubmitOutcome =
            serde_json::from_str(r#"{"success":false,"error":"User with this email already exists"}"#).unwrap();
        assert_eq!(failed.error_message(), "User with this email already exists");
    }

    #[test]
    fn test_failure_without_text_uses_default() {
        let failed = SubmitOutcome {
            success: false,
            error: None,
            data: None,
        };
        assert_eq!(failed.error_message(), DEFAULT_SUBMIT_ERROR);
    }
}
