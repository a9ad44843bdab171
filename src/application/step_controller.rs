//! Finite-state sequencing of multi-step forms.
//!
//! A flow has steps `1..=N`. Moving forward is gated on the current step's
//! rules; moving back is always allowed. Submission happens only from the
//! last step and re-checks every step, since earlier values may have been
//! edited after their step was passed.

use tracing::{debug, info, warn};

use super::form_state::FormState;
use super::submit::{SubmitCollaborator, SubmitOutcome};
use crate::domain::{FieldRule, FieldRules, StepDefinition, ValidationResult};

/// What a call to [`StepController::submit`] did.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitResult {
    /// Called off the last step or after completion; nothing happened.
    Ignored,
    /// Validation failed; the errors are also stored on the form.
    Rejected(ValidationResult),
    /// The collaborator reported a failure; its text is kept verbatim.
    Failed(String),
    /// The collaborator accepted the values.
    Submitted(SubmitOutcome),
}

/// Drives a form through its ordered steps.
#[derive(Debug, Clone)]
pub struct StepController {
    steps: Vec<StepDefinition>,
    current: usize,
    completed: bool,
    submit_error: Option<String>,
    pub form: FormState,
}

impl StepController {
    /// Creates a controller at step 1. An empty step list behaves as a
    /// single step without rules.
    pub fn new(steps: Vec<StepDefinition>) -> Self {
        Self {
            steps,
            current: 1,
            completed: false,
            submit_error: None,
            form: FormState::new(),
        }
    }

    pub fn with_form(mut self, form: FormState) -> Self {
        self.form = form;
        self
    }

    /// Current one-based step.
    pub fn current(&self) -> usize {
        self.current
    }

    /// Number of steps, never less than one.
    pub fn total(&self) -> usize {
        self.steps.len().max(1)
    }

    pub fn is_first(&self) -> bool {
        self.current == 1
    }

    pub fn is_last(&self) -> bool {
        self.current == self.total()
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }

    pub fn errors(&self) -> &ValidationResult {
        &self.form.errors
    }

    /// Error text from the last failed submit, if any.
    pub fn submit_error(&self) -> Option<&str> {
        self.submit_error.as_deref()
    }

    pub fn steps(&self) -> &[StepDefinition] {
        &self.steps
    }

    pub fn step(&self) -> Option<&StepDefinition> {
        self.steps.get(self.current - 1)
    }

    /// Replaces a step definition, for flows whose fields depend on earlier
    /// answers.
    pub fn replace_step(&mut self, definition: StepDefinition) {
        if let Some(slot) = self.steps.iter_mut().find(|step| step.index == definition.index) {
            *slot = definition;
        }
    }

    /// Rules of the current step.
    pub fn current_rules(&self) -> FieldRules {
        self.step().map(|step| step.rules.clone()).unwrap_or_default()
    }

    /// Union of the rules of every step.
    pub fn all_rules(&self) -> FieldRules {
        self.steps
            .iter()
            .flat_map(|step| step.rules.iter().map(|(field, rule)| (field.clone(), rule.clone())))
            .collect()
    }

    /// Rule for `field` from whichever step declares it.
    pub fn rule_for(&self, field: &str) -> Option<&FieldRule> {
        self.steps.iter().find_map(|step| step.rules.get(field))
    }

    /// Advances one step if the current step validates.
    ///
    /// On failure the step is unchanged and the errors are left on the form
    /// for rendering. Returns true when the step changed or the current step
    /// was already the last one and validated.
    pub fn next(&mut self) -> bool {
        let rules = self.current_rules();
        if self.form.validate(&rules) {
            self.current = (self.current + 1).min(self.total());
            self.submit_error = None;
            debug!(step = self.current, total = self.total(), "advanced to step");
            true
        } else {
            debug!(step = self.current, errors = self.form.errors.len(), "step gate rejected");
            false
        }
    }

    /// Goes back one step without validating and clears all errors.
    pub fn prev(&mut self) {
        self.current = self.current.saturating_sub(1).max(1);
        self.form.clear_errors();
        self.submit_error = None;
        debug!(step = self.current, "returned to step");
    }

    /// Validates every step and hands the values to `collaborator`.
    ///
    /// A no-op off the last step. On a collaborator failure the step stays
    /// the same and the error text is kept so the user can retry.
    pub async fn submit<C>(&mut self, collaborator: &C) -> SubmitResult
    where
        C: SubmitCollaborator + ?Sized,
    {
        if !self.is_last() || self.completed {
            debug!(step = self.current, "submit ignored off the last step");
            return SubmitResult::Ignored;
        }

        let rules = self.all_rules();
        if !self.form.validate(&rules) {
            debug!(errors = self.form.errors.len(), "submit rejected by validation");
            return SubmitResult::Rejected(self.form.errors.clone());
        }

        self.submit_error = None;
        let outcome = collaborator.submit(&self.form.values).await;
        if outcome.success {
            info!(steps = self.total(), "form submitted");
            self.completed = true;
            SubmitResult::Submitted(outcome)
        } else {
            let message = outcome.error_message().to_string();
            warn!(error = %message, "submit collaborator failed");
            self.submit_error = Some(message.clone());
            SubmitResult::Failed(message)
        }
    }

    pub fn clear_submit_error(&mut self) {
        self.submit_error = None;
    }

    /// Starts the flow over with a fresh form.
    pub fn restart(&mut self) {
        self.current = 1;
        self.completed = false;
        self.submit_error = None;
        self.form.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use parking_lot::Mutex;

    use crate::domain::{FieldRule, FieldValues, REQUIRED_MESSAGE};

    struct Recorder {
        calls: Mutex<Vec<FieldValues>>,
        outcome: SubmitOutcome,
    }

    impl Recorder {
        fn new(outcome: SubmitOutcome) -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                outcome,
            }
        }
    }

    #[async_trait]
    impl SubmitCollaborator for Recorder {
        async fn submit(&self, values: &FieldValues) -> SubmitOutcome {
            self.calls.lock().push(values.clone());
            self.outcome.clone()
        }
    }

    fn two_steps() -> StepController {
        StepController::new(vec![
            StepDefinition::new(1)
                .rule("name", FieldRule::text().required())
                .rule("email", FieldRule::email().required()),
            StepDefinition::new(2).rule("city", FieldRule::text().required()),
        ])
    }

    #[test]
    fn test_starts_at_first_step() {
        let controller = two_steps();
        assert_eq!(controller.current(), 1);
        assert_eq!(controller.total(), 2);
        assert!(controller.is_first());
        assert!(!controller.is_last());
    }

    #[test]
    fn test_next_blocked_by_empty_required_fields() {
        let mut controller = two_steps();
        controller.form.set_field("name", "Ada");

        assert!(!controller.next());
        assert_eq!(controller.current(), 1);
        assert_eq!(controller.errors().len(), 1);
        assert_eq!(controller.errors().get("email"), Some(REQUIRED_MESSAGE));
        assert!(!controller.errors().contains("city"));
    }

    #[test]
    fn test_next_advances_and_clears_errors() {
        let mut controller = two_steps();
        assert!(!controller.next());
        controller.form.set_field("name", "Ada");
        controller.form.set_field("email", "ada@bank.az");
        assert!(controller.next());
        assert_eq!(controller.current(), 2);
        assert!(controller.errors().is_valid());
    }

    #[test]
    fn test_next_is_capped_at_last_step() {
        let mut controller = StepController::new(vec![StepDefinition::new(1)]);
        assert!(controller.next());
        assert_eq!(controller.current(), 1);
    }

    #[test]
    fn test_prev_floor_and_clears_errors() {
        let mut controller = two_steps();
        controller.next();
        assert!(!controller.errors().is_valid());
        controller.prev();
        assert_eq!(controller.current(), 1);
        assert!(controller.errors().is_valid());
        controller.prev();
        assert_eq!(controller.current(), 1);
    }

    #[test]
    fn test_empty_steps_behave_as_one() {
        let controller = StepController::new(Vec::new());
        assert_eq!(controller.total(), 1);
        assert!(controller.is_last());
        assert!(controller.current_rules().is_empty());
    }

    #[tokio::test]
    async fn test_submit_ignored_off_last_step() {
        let mut controller = two_steps();
        let recorder = Recorder::new(SubmitOutcome::empty_success());
        assert_eq!(controller.submit(&recorder).await, SubmitResult::Ignored);
        assert!(recorder.calls.lock().is_empty());
    }

    #[tokio::test]
    async fn test_submit_rechecks_earlier_steps() {
        let mut controller = two_steps();
        controller.form.set_field("name", "Ada");
        controller.form.set_field("email", "ada@bank.az");
        assert!(controller.next());
        controller.form.set_field("city", "Baku");
        controller.form.set_field("email", "broken");

        let recorder = Recorder::new(SubmitOutcome::empty_success());
        let result = controller.submit(&recorder).await;
        assert!(matches!(result, SubmitResult::Rejected(ref errors) if errors.contains("email")));
        assert_eq!(controller.current(), 2);
        assert!(recorder.calls.lock().is_empty());
    }

    #[tokio::test]
    async fn test_submit_failure_keeps_error_verbatim() {
        let mut controller = two_steps();
        controller.form.set_field("name", "Ada");
        controller.form.set_field("email", "ada@bank.az");
        controller.next();
        controller.form.set_field("city", "Baku");

        let recorder = Recorder::new(SubmitOutcome::failure("Bank is closed"));
        let result = controller.submit(&recorder).await;
        assert_eq!(result, SubmitResult::Failed("Bank is closed".to_string()));
        assert_eq!(controller.submit_error(), Some("Bank is closed"));
        assert!(!controller.is_completed());
        assert_eq!(controller.current(), 2);

        // retry is allowed
        let result = controller.submit(&recorder).await;
        assert!(matches!(result, SubmitResult::Failed(_)));
        assert_eq!(recorder.calls.lock().len(), 2);
    }

    #[tokio::test]
    async fn test_submit_success_passes_all_values() {
        let mut controller = two_steps();
        controller.form.set_field("name", "Ada");
        controller.form.set_field("email", "ada@bank.az");
        controller.next();
        controller.form.set_field("city", "Baku");

        let recorder = Recorder::new(SubmitOutcome::empty_success());
        let result = controller.submit(&recorder).await;
        assert!(matches!(result, SubmitResult::Submitted(_)));
        assert!(controller.is_completed());

        let calls = recorder.calls.lock();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].len(), 3);

        drop(calls);
        assert_eq!(controller.submit(&recorder).await, SubmitResult::Ignored);
    }

    #[test]
    fn test_restart() {
        let mut controller = two_steps();
        controller.form.set_field("name", "Ada");
        controller.form.set_field("email", "ada@bank.az");
        controller.next();
        controller.restart();
        assert_eq!(controller.current(), 1);
        assert_eq!(controller.form.text("name"), "");
    }
}
