//! The concrete forms: login, registration, card creation, utility payment.
//!
//! Each flow owns a [`StepController`] with its step definitions and adds
//! whatever flow-specific behaviour sits around the generic engine.

use rand::Rng;

use super::form_state::FormState;
use super::step_controller::{StepController, SubmitResult};
use super::submit::SubmitCollaborator;
use crate::domain::{
    check_eligibility, digits_pattern, normalize_phone_input, CardSystem, CardType, CreditDecision, Currency,
    DomainError, DomainResult, FieldRule, FieldValue, FieldValues, MessageKind, NewCard, PasswordStrength,
    StepDefinition, UtilityPayment, UtilityProvider, ValidationResult, PHONE_PREFIX,
};

pub mod fields {
    pub const NAME: &str = "name";
    pub const SURNAME: &str = "surname";
    pub const EMAIL: &str = "email";
    pub const PHONE: &str = "phone";
    pub const EMPLOYMENT: &str = "employment";
    pub const PASSWORD: &str = "password";
    pub const CONFIRM_PASSWORD: &str = "confirmPassword";

    pub const CARD_TYPE: &str = "type";
    pub const CARD_SYSTEM: &str = "system";
    pub const CURRENCY: &str = "currency";
    pub const MONTHLY_INCOME: &str = "monthlyIncome";
    pub const DESIRED_LIMIT: &str = "desiredLimit";
    pub const APPROVED_LIMIT: &str = "approvedLimit";
    pub const ELIGIBILITY: &str = "eligibility";

    pub const PROVIDER: &str = "provider";
    pub const CODE: &str = "code";
    pub const CARD_ID: &str = "cardId";
    pub const AMOUNT: &str = "amount";
}

use fields::*;

pub const MAX_PAYMENT_AMOUNT: f64 = 10_000.0;

/// How a field is edited on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Secret,
    Toggle,
    Choice,
}

/// A field as shown by the terminal UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub label: &'static str,
    pub kind: FieldKind,
}

const fn spec(name: &'static str, label: &'static str, kind: FieldKind) -> FieldSpec {
    FieldSpec { name, label, kind }
}

fn values_of(pairs: &[(&str, FieldValue)]) -> FieldValues {
    pairs
        .iter()
        .map(|(field, value)| (field.to_string(), value.clone()))
        .collect()
}

// Login

pub struct LoginFlow {
    pub controller: StepController,
}

impl Default for LoginFlow {
    fn default() -> Self {
        Self::new()
    }
}

impl LoginFlow {
    pub const FIELDS: [FieldSpec; 2] = [
        spec(EMAIL, "Email", FieldKind::Text),
        spec(PASSWORD, "Password", FieldKind::Secret),
    ];

    pub fn new() -> Self {
        let step = StepDefinition::new(1)
            .rule(
                EMAIL,
                FieldRule::email()
                    .required()
                    .message(MessageKind::Required, "Email is required"),
            )
            .rule(
                PASSWORD,
                FieldRule::text()
                    .required()
                    .message(MessageKind::Required, "Password is required"),
            );
        Self {
            controller: StepController::new(vec![step]),
        }
    }

    pub fn set_field(&mut self, field: &str, value: impl Into<FieldValue>) {
        self.controller.form.set_field(field, value);
    }

    pub async fn submit<C: SubmitCollaborator + ?Sized>(&mut self, collaborator: &C) -> SubmitResult {
        let result = self.controller.submit(collaborator).await;
        if matches!(result, SubmitResult::Submitted(_)) {
            self.controller.restart();
        }
        result
    }
}

// Registration

/// The pages of the registration form, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationStep {
    Personal,
    Security,
    Review,
}

impl RegistrationStep {
    pub const ALL: [RegistrationStep; 3] = [
        RegistrationStep::Personal,
        RegistrationStep::Security,
        RegistrationStep::Review,
    ];

    pub fn index(&self) -> usize {
        match self {
            RegistrationStep::Personal => 1,
            RegistrationStep::Security => 2,
            RegistrationStep::Review => 3,
        }
    }

    pub fn from_index(index: usize) -> DomainResult<Self> {
        Self::ALL
            .get(index.wrapping_sub(1))
            .copied()
            .ok_or(DomainError::UnknownStep(index))
    }

    pub fn title(&self) -> &'static str {
        match self {
            RegistrationStep::Personal => "Personal Info",
            RegistrationStep::Security => "Security",
            RegistrationStep::Review => "Confirmation",
        }
    }

    pub fn fields(&self) -> &'static [FieldSpec] {
        const PERSONAL: [FieldSpec; 5] = [
            spec(NAME, "Name", FieldKind::Text),
            spec(SURNAME, "Surname", FieldKind::Text),
            spec(EMAIL, "Email", FieldKind::Text),
            spec(PHONE, "Phone", FieldKind::Text),
            spec(EMPLOYMENT, "Currently employed", FieldKind::Toggle),
        ];
        const SECURITY: [FieldSpec; 2] = [
            spec(PASSWORD, "Password", FieldKind::Secret),
            spec(CONFIRM_PASSWORD, "Confirm password", FieldKind::Secret),
        ];
        match self {
            RegistrationStep::Personal => &PERSONAL,
            RegistrationStep::Security => &SECURITY,
            RegistrationStep::Review => &[],
        }
    }
}

fn password_rule() -> FieldRule {
    FieldRule::password()
        .required()
        .message(MessageKind::Required, "Password is required")
}

fn confirm_password_rule() -> FieldRule {
    FieldRule::text()
        .required()
        .must_match(PASSWORD)
        .message(MessageKind::Required, "Please confirm your password")
}

pub fn registration_steps() -> Vec<StepDefinition> {
    vec![
        StepDefinition::new(RegistrationStep::Personal.index())
            .rule(
                NAME,
                FieldRule::text()
                    .required()
                    .message(MessageKind::Required, "Name is required"),
            )
            .rule(
                SURNAME,
                FieldRule::text()
                    .required()
                    .message(MessageKind::Required, "Surname is required"),
            )
            .rule(
                EMAIL,
                FieldRule::email()
                    .required()
                    .message(MessageKind::Required, "Email is required")
                    .message(MessageKind::Format, "Please enter a valid email"),
            )
            .rule(
                PHONE,
                FieldRule::tel()
                    .required()
                    .message(MessageKind::Format, "Please enter a valid Azerbaijani phone number"),
            )
            .input(EMPLOYMENT),
        StepDefinition::new(RegistrationStep::Security.index())
            .rule(PASSWORD, password_rule())
            .rule(CONFIRM_PASSWORD, confirm_password_rule()),
        StepDefinition::new(RegistrationStep::Review.index()),
    ]
}

pub struct RegistrationFlow {
    pub controller: StepController,
}

impl Default for RegistrationFlow {
    fn default() -> Self {
        Self::new()
    }
}

impl RegistrationFlow {
    pub fn new() -> Self {
        let initial = values_of(&[
            (NAME, FieldValue::default()),
            (SURNAME, FieldValue::default()),
            (EMAIL, FieldValue::default()),
            (PHONE, FieldValue::from(PHONE_PREFIX)),
            (EMPLOYMENT, FieldValue::from(false)),
            (PASSWORD, FieldValue::default()),
            (CONFIRM_PASSWORD, FieldValue::default()),
        ]);
        let form = FormState::with_values(initial)
            .with_live_field(PASSWORD, password_rule())
            .with_live_field(CONFIRM_PASSWORD, confirm_password_rule());
        Self {
            controller: StepController::new(registration_steps()).with_form(form),
        }
    }

    pub fn current_step(&self) -> RegistrationStep {
        RegistrationStep::from_index(self.controller.current()).unwrap_or(RegistrationStep::Personal)
    }

    /// Sets a field; phone input is normalised to the `+994` format and
    /// dropped when it would grow past a full number.
    pub fn set_field(&mut self, field: &str, value: impl Into<FieldValue>) {
        let value = value.into();
        if field == PHONE {
            let raw = value.as_text();
            if PHONE_PREFIX.starts_with(&*raw) {
                self.controller.form.set_field(PHONE, PHONE_PREFIX);
            } else if let Some(phone) = normalize_phone_input(&raw) {
                self.controller.form.set_field(PHONE, phone);
            }
            return;
        }
        self.controller.form.set_field(field, value);
    }

    pub fn toggle_employment(&mut self) {
        let employed = self
            .controller
            .form
            .value(EMPLOYMENT)
            .is_some_and(FieldValue::as_bool);
        self.controller.form.set_field(EMPLOYMENT, !employed);
    }

    pub fn password_strength(&self) -> PasswordStrength {
        PasswordStrength::evaluate(&self.controller.form.text(PASSWORD))
    }

    pub fn next(&mut self) -> bool {
        self.controller.next()
    }

    pub fn prev(&mut self) {
        self.controller.prev();
    }

    pub async fn submit<C: SubmitCollaborator + ?Sized>(&mut self, collaborator: &C) -> SubmitResult {
        self.controller.submit(collaborator).await
    }
}

// Card creation

/// Generates a random 16 digit card number in groups of four.
pub fn generate_card_number() -> String {
    let mut rng = rand::thread_rng();
    let digits: Vec<String> = (0..4)
        .map(|_| (0..4).map(|_| rng.gen_range(0..10).to_string()).collect())
        .collect();
    digits.join(" ")
}

/// Builds the card request from submitted card-form values.
pub fn card_request(values: &FieldValues, holder_name: &str) -> DomainResult<NewCard> {
    let text = |field: &str| values.get(field).map(|value| value.as_text().into_owned()).unwrap_or_default();
    let card_type = CardType::from_id(&text(CARD_TYPE))?;
    let limit = match card_type {
        CardType::Credit => values.get(APPROVED_LIMIT).and_then(FieldValue::as_number),
        _ => None,
    };
    Ok(NewCard {
        card_type,
        system: CardSystem::from_id(&text(CARD_SYSTEM))?,
        currency: Currency::from_id(&text(CURRENCY))?,
        number: generate_card_number(),
        balance: limit.unwrap_or(0.0),
        limit,
        name: holder_name.to_string(),
    })
}

pub struct CardApplicationFlow {
    pub controller: StepController,
    employed: bool,
    decision: Option<CreditDecision>,
}

impl CardApplicationFlow {
    pub const CREDIT_REQUIRES_EMPLOYMENT: &'static str = "Credit cards are available only for employed customers";
    pub const ELIGIBILITY_REQUIRED: &'static str = "Please check credit eligibility first";

    /// `employed` decides whether credit cards may be requested.
    pub fn new(employed: bool) -> Self {
        let initial = values_of(&[
            (CARD_TYPE, FieldValue::from(CardType::Debit.id())),
            (CARD_SYSTEM, FieldValue::from(CardSystem::Visa.id())),
            (CURRENCY, FieldValue::from(Currency::Azn.id())),
        ]);
        let mut flow = Self {
            controller: StepController::new(vec![Self::step_for(CardType::Debit)])
                .with_form(FormState::with_values(initial)),
            employed,
            decision: None,
        };
        flow.refresh_rules();
        flow
    }

    fn step_for(card_type: CardType) -> StepDefinition {
        let step = StepDefinition::new(1)
            .rule(CARD_TYPE, FieldRule::text().required().one_of(CardType::ids()))
            .rule(CARD_SYSTEM, FieldRule::text().required().one_of(CardSystem::ids()))
            .rule(CURRENCY, FieldRule::text().required().one_of(Currency::ids()));
        match card_type {
            CardType::Credit => step
                .rule(MONTHLY_INCOME, crate::domain::monthly_income_rule())
                .rule(DESIRED_LIMIT, crate::domain::desired_limit_rule()),
            _ => step,
        }
    }

    fn refresh_rules(&mut self) {
        let card_type = self.card_type();
        self.controller.replace_step(Self::step_for(card_type));
    }

    pub fn card_type(&self) -> CardType {
        CardType::from_id(&self.controller.form.text(CARD_TYPE)).unwrap_or_default()
    }

    pub fn decision(&self) -> Option<CreditDecision> {
        self.decision
    }

    /// Fields on screen; the credit fields only appear for credit cards.
    pub fn visible_fields(&self) -> Vec<FieldSpec> {
        let mut specs = vec![
            spec(CARD_TYPE, "Card type", FieldKind::Choice),
            spec(CARD_SYSTEM, "Payment system", FieldKind::Choice),
            spec(CURRENCY, "Currency", FieldKind::Choice),
        ];
        if self.card_type() == CardType::Credit {
            specs.push(spec(MONTHLY_INCOME, "Monthly income (AZN)", FieldKind::Text));
            specs.push(spec(DESIRED_LIMIT, "Desired credit limit (AZN)", FieldKind::Text));
        }
        specs
    }

    /// Switches the card type, refusing credit for unemployed applicants.
    pub fn select_card_type(&mut self, card_type: CardType) {
        if card_type == CardType::Credit && !self.employed {
            self.controller
                .form
                .set_error(CARD_TYPE, Self::CREDIT_REQUIRES_EMPLOYMENT);
            return;
        }
        self.controller.form.set_field(CARD_TYPE, card_type.id());
        self.invalidate_decision();
        self.refresh_rules();
    }

    /// Moves a choice field to its next option.
    pub fn cycle_option(&mut self, field: &str) {
        match field {
            CARD_TYPE => {
                let all = CardType::ALL;
                let mut next = self.card_type();
                // Skip credit when it is not available.
                for _ in 0..all.len() {
                    let position = all.iter().position(|item| *item == next).unwrap_or(0);
                    next = all[(position + 1) % all.len()];
                    if next != CardType::Credit || self.employed {
                        break;
                    }
                }
                self.select_card_type(next);
            }
            CARD_SYSTEM => {
                let current = CardSystem::from_id(&self.controller.form.text(CARD_SYSTEM)).unwrap_or_default();
                let all = CardSystem::ALL;
                let position = all.iter().position(|item| *item == current).unwrap_or(0);
                self.set_field(CARD_SYSTEM, all[(position + 1) % all.len()].id());
            }
            CURRENCY => {
                let current = Currency::from_id(&self.controller.form.text(CURRENCY)).unwrap_or_default();
                let all = Currency::ALL;
                let position = all.iter().position(|item| *item == current).unwrap_or(0);
                self.set_field(CURRENCY, all[(position + 1) % all.len()].id());
            }
            _ => {}
        }
    }

    pub fn set_field(&mut self, field: &str, value: impl Into<FieldValue>) {
        if field == CARD_TYPE {
            let value = value.into();
            match CardType::from_id(&value.as_text()) {
                Ok(card_type) => self.select_card_type(card_type),
                Err(_) => self.controller.form.set_field(CARD_TYPE, value),
            }
            return;
        }
        self.controller.form.set_field(field, value);
        if field == MONTHLY_INCOME || field == DESIRED_LIMIT {
            self.invalidate_decision();
        }
    }

    fn invalidate_decision(&mut self) {
        self.decision = None;
        self.controller.form.values.remove(APPROVED_LIMIT);
        self.controller.form.errors.remove(ELIGIBILITY);
    }

    /// Validates the credit inputs and derives the approvable limit.
    ///
    /// Returns `None` for non-credit cards or when the inputs are invalid,
    /// in which case the input errors are set on the form.
    pub fn check_eligibility(&mut self) -> Option<CreditDecision> {
        if self.card_type() != CardType::Credit {
            return None;
        }
        match check_eligibility(&self.controller.form.values, MONTHLY_INCOME, DESIRED_LIMIT) {
            Ok(decision) => {
                let form = &mut self.controller.form;
                form.errors.remove(MONTHLY_INCOME);
                form.errors.remove(DESIRED_LIMIT);
                form.errors.remove(ELIGIBILITY);
                form.values
                    .insert(APPROVED_LIMIT.to_string(), FieldValue::Number(decision.limit()));
                self.decision = Some(decision);
                Some(decision)
            }
            Err(errors) => {
                self.decision = None;
                self.controller.form.set_errors(errors);
                None
            }
        }
    }

    /// Submit is available once a credit card has a decision.
    pub fn can_submit(&self) -> bool {
        self.card_type() != CardType::Credit || self.decision.is_some()
    }

    pub async fn submit<C: SubmitCollaborator + ?Sized>(&mut self, collaborator: &C) -> SubmitResult {
        if !self.can_submit() {
            let mut errors = ValidationResult::new();
            errors.insert(ELIGIBILITY, Self::ELIGIBILITY_REQUIRED);
            self.controller.form.set_error(ELIGIBILITY, Self::ELIGIBILITY_REQUIRED);
            return SubmitResult::Rejected(errors);
        }
        self.controller.submit(collaborator).await
    }
}

// Utility payment

pub struct UtilityPaymentFlow {
    pub controller: StepController,
    card_ids: Vec<String>,
    success_message: Option<String>,
}

impl UtilityPaymentFlow {
    pub const FIELDS: [FieldSpec; 4] = [
        spec(PROVIDER, "Provider", FieldKind::Choice),
        spec(CODE, "Customer code", FieldKind::Text),
        spec(CARD_ID, "Payment card", FieldKind::Choice),
        spec(AMOUNT, "Amount (AZN)", FieldKind::Text),
    ];

    /// `card_ids` are the cards the user may pay with; the first one is
    /// preselected.
    pub fn new(card_ids: Vec<String>) -> Self {
        let provider = UtilityProvider::default();
        let initial = values_of(&[
            (PROVIDER, FieldValue::from(provider.id())),
            (CODE, FieldValue::default()),
            (CARD_ID, FieldValue::from(card_ids.first().cloned().unwrap_or_default())),
            (AMOUNT, FieldValue::default()),
        ]);
        Self {
            controller: StepController::new(vec![Self::step_for(provider, &card_ids)])
                .with_form(FormState::with_values(initial)),
            card_ids,
            success_message: None,
        }
    }

    fn step_for(provider: UtilityProvider, card_ids: &[String]) -> StepDefinition {
        let length = provider.code_length();
        let length_message = format!("Code must be exactly {length} digits");
        StepDefinition::new(1)
            .input(PROVIDER)
            .rule(
                CODE,
                FieldRule::text()
                    .required()
                    .exact_length(length)
                    .pattern(digits_pattern())
                    .message(MessageKind::Required, "Please enter your customer code")
                    .message(MessageKind::MinLength, length_message.clone())
                    .message(MessageKind::MaxLength, length_message)
                    .message(MessageKind::Pattern, "Code must contain only numbers"),
            )
            .rule(
                CARD_ID,
                FieldRule::text()
                    .required()
                    .one_of(card_ids.iter().cloned())
                    .message(MessageKind::Required, "Please select a payment card")
                    .message(MessageKind::Choice, "Please select a payment card"),
            )
            .rule(
                AMOUNT,
                FieldRule::number()
                    .required()
                    .range(0.0, MAX_PAYMENT_AMOUNT)
                    .exclusive_min()
                    .message(MessageKind::Required, "Please enter a valid amount")
                    .message(MessageKind::Format, "Please enter a valid amount")
                    .message(MessageKind::Range, "Amount must be greater than 0 and at most 10000"),
            )
    }

    pub fn provider(&self) -> UtilityProvider {
        UtilityProvider::from_id(&self.controller.form.text(PROVIDER)).unwrap_or_default()
    }

    pub fn success_message(&self) -> Option<&str> {
        self.success_message.as_deref()
    }

    pub fn select_provider(&mut self, provider: UtilityProvider) {
        self.set_field(PROVIDER, provider.id());
        self.controller
            .replace_step(Self::step_for(provider, &self.card_ids));
    }

    pub fn cycle_option(&mut self, field: &str) {
        match field {
            PROVIDER => self.select_provider(self.provider().next()),
            CARD_ID if !self.card_ids.is_empty() => {
                let current = self.controller.form.text(CARD_ID);
                let position = self.card_ids.iter().position(|id| *id == current);
                let next = position.map_or(0, |p| (p + 1) % self.card_ids.len());
                let card_id = self.card_ids[next].clone();
                self.set_field(CARD_ID, card_id);
            }
            _ => {}
        }
    }

    /// Any edit dismisses the previous payment's confirmation.
    pub fn set_field(&mut self, field: &str, value: impl Into<FieldValue>) {
        self.controller.form.set_field(field, value);
        self.success_message = None;
        self.controller.clear_submit_error();
    }

    pub async fn submit<C: SubmitCollaborator + ?Sized>(&mut self, collaborator: &C) -> SubmitResult {
        let provider = self.provider();
        let amount = self.controller.form.text(AMOUNT);
        let result = self.controller.submit(collaborator).await;
        if matches!(result, SubmitResult::Submitted(_)) {
            self.success_message = Some(format!(
                "Payment of {} AZN to {} completed!",
                amount.trim(),
                provider.name()
            ));
            self.controller.restart();
            self.controller.form.set_field(PROVIDER, provider.id());
        }
        result
    }
}

/// Builds the payment request from submitted payment-form values.
pub fn payment_request(values: &FieldValues) -> DomainResult<UtilityPayment> {
    let text = |field: &str| values.get(field).map(|value| value.as_text().into_owned()).unwrap_or_default();
    Ok(UtilityPayment {
        provider: UtilityProvider::from_id(&text(PROVIDER))?,
        customer_code: text(CODE),
        card_id: text(CARD_ID),
        amount: values.get(AMOUNT).and_then(FieldValue::as_number).unwrap_or(0.0),
    })
}
