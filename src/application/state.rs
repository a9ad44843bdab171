//! Application state for the terminal banking forms.
//!
//! `App` owns one flow per screen and routes key-level actions (type a
//! character, move focus, confirm, go back) to whichever flow is on screen.

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::runtime::{Builder, Runtime};
use tracing::{debug, info};

use super::flows::{
    CardApplicationFlow, FieldKind, FieldSpec, LoginFlow, RegistrationFlow, UtilityPaymentFlow,
};
use super::session::{AuthService, OpenCard, PayUtility, RegisterAccount, SignIn};
use super::step_controller::{StepController, SubmitResult};
use crate::domain::{CardType, FieldValue};
use crate::infrastructure::{AppConfig, CsvExporter, MockBankApi, SessionStore};

/// Screen currently shown.
///
/// The mode decides which flow receives input and what gets rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppMode {
    /// Signed out landing screen
    Welcome,
    Login,
    /// Three step registration form
    Register,
    /// Cards and payment history of the signed-in user
    Dashboard,
    AddCard,
    Utilities,
    /// Key reference
    Help,
}

pub const FIX_FIELDS_MESSAGE: &str = "Please fix the highlighted fields";

/// Main application state.
///
/// Submits run to completion on a private current-thread runtime inside
/// the key event that triggered them.
pub struct App {
    pub mode: AppMode,
    previous_mode: AppMode,
    pub auth: AuthService,
    pub login: LoginFlow,
    pub registration: RegistrationFlow,
    pub card_flow: CardApplicationFlow,
    pub payment_flow: UtilityPaymentFlow,
    /// Index into [`App::visible_fields`]
    pub focus: usize,
    /// Temporary status message to display
    pub status_message: Option<String>,
    /// Scroll position in help text
    pub help_scroll: usize,
    export_file: PathBuf,
    runtime: Runtime,
}

impl App {
    pub fn new(config: &AppConfig, store: Arc<dyn SessionStore>) -> io::Result<Self> {
        let runtime = Builder::new_current_thread().enable_time().build()?;
        let api = Arc::new(MockBankApi::new(config.api_latency()));
        let auth = AuthService::new(api, store);
        let employed = auth.user().is_some_and(|user| user.employment);
        let card_ids = auth.cards().into_iter().map(|card| card.id).collect();
        let mode = if auth.is_authenticated() {
            AppMode::Dashboard
        } else {
            AppMode::Welcome
        };

        Ok(Self {
            mode,
            previous_mode: mode,
            auth,
            login: LoginFlow::new(),
            registration: RegistrationFlow::new(),
            card_flow: CardApplicationFlow::new(employed),
            payment_flow: UtilityPaymentFlow::new(card_ids),
            focus: 0,
            status_message: None,
            help_scroll: 0,
            export_file: config.export_file.clone(),
            runtime,
        })
    }

    /// Switches screens, preparing a fresh form where one is needed.
    pub fn open(&mut self, mode: AppMode) {
        match mode {
            AppMode::Login => self.login = LoginFlow::new(),
            AppMode::Register => self.registration = RegistrationFlow::new(),
            AppMode::AddCard => {
                let employed = self.auth.user().is_some_and(|user| user.employment);
                self.card_flow = CardApplicationFlow::new(employed);
            }
            AppMode::Utilities => {
                let card_ids: Vec<String> = self.auth.cards().into_iter().map(|card| card.id).collect();
                if card_ids.is_empty() {
                    self.status_message = Some("Add a card before paying bills".to_string());
                    return;
                }
                self.payment_flow = UtilityPaymentFlow::new(card_ids);
            }
            AppMode::Help => {
                self.previous_mode = self.mode;
                self.help_scroll = 0;
            }
            AppMode::Welcome | AppMode::Dashboard => {}
        }
        debug!(from = ?self.mode, to = ?mode, "screen changed");
        self.mode = mode;
        self.focus = 0;
        if mode != AppMode::Help {
            self.status_message = None;
        }
    }

    /// Fields of the form on screen, in focus order.
    pub fn visible_fields(&self) -> Vec<FieldSpec> {
        match self.mode {
            AppMode::Login => LoginFlow::FIELDS.to_vec(),
            AppMode::Register => self.registration.current_step().fields().to_vec(),
            AppMode::AddCard => self.card_flow.visible_fields(),
            AppMode::Utilities => UtilityPaymentFlow::FIELDS.to_vec(),
            AppMode::Welcome | AppMode::Dashboard | AppMode::Help => Vec::new(),
        }
    }

    pub fn focused_field(&self) -> Option<FieldSpec> {
        self.visible_fields().get(self.focus).copied()
    }

    /// The step controller of the form on screen.
    pub fn controller(&self) -> Option<&StepController> {
        match self.mode {
            AppMode::Login => Some(&self.login.controller),
            AppMode::Register => Some(&self.registration.controller),
            AppMode::AddCard => Some(&self.card_flow.controller),
            AppMode::Utilities => Some(&self.payment_flow.controller),
            AppMode::Welcome | AppMode::Dashboard | AppMode::Help => None,
        }
    }

    fn controller_mut(&mut self) -> Option<&mut StepController> {
        match self.mode {
            AppMode::Login => Some(&mut self.login.controller),
            AppMode::Register => Some(&mut self.registration.controller),
            AppMode::AddCard => Some(&mut self.card_flow.controller),
            AppMode::Utilities => Some(&mut self.payment_flow.controller),
            AppMode::Welcome | AppMode::Dashboard | AppMode::Help => None,
        }
    }

    /// Validates the focused field as the user leaves it.
    fn blur_focused(&mut self) {
        let Some(field) = self.focused_field() else {
            return;
        };
        if let Some(controller) = self.controller_mut() {
            let rule = controller.rule_for(field.name).cloned();
            controller.form.blur(field.name, rule.as_ref());
        }
    }

    pub fn focus_next(&mut self) {
        let count = self.visible_fields().len();
        if count == 0 {
            return;
        }
        self.blur_focused();
        self.focus = (self.focus + 1) % count;
    }

    pub fn focus_prev(&mut self) {
        let count = self.visible_fields().len();
        if count == 0 {
            return;
        }
        self.blur_focused();
        self.focus = (self.focus + count - 1) % count;
    }

    fn set_value(&mut self, field: &str, value: impl Into<FieldValue>) {
        match self.mode {
            AppMode::Login => self.login.set_field(field, value),
            AppMode::Register => self.registration.set_field(field, value),
            AppMode::AddCard => self.card_flow.set_field(field, value),
            AppMode::Utilities => self.payment_flow.set_field(field, value),
            AppMode::Welcome | AppMode::Dashboard | AppMode::Help => {}
        }
    }

    fn field_text(&self, field: &str) -> String {
        self.controller()
            .map(|controller| controller.form.text(field))
            .unwrap_or_default()
    }

    /// Types `c` into the focused field. Space toggles or cycles
    /// non-text fields.
    pub fn input_char(&mut self, c: char) {
        let Some(field) = self.focused_field() else {
            return;
        };
        match field.kind {
            FieldKind::Text | FieldKind::Secret => {
                let mut text = self.field_text(field.name);
                text.push(c);
                self.set_value(field.name, text);
            }
            FieldKind::Toggle | FieldKind::Choice if c == ' ' => self.cycle_choice(),
            _ => {}
        }
    }

    pub fn backspace(&mut self) {
        let Some(field) = self.focused_field() else {
            return;
        };
        if matches!(field.kind, FieldKind::Text | FieldKind::Secret) {
            let mut text = self.field_text(field.name);
            if text.pop().is_some() {
                self.set_value(field.name, text);
            }
        }
    }

    /// Advances the focused toggle or choice field.
    pub fn cycle_choice(&mut self) {
        let Some(field) = self.focused_field() else {
            return;
        };
        match (self.mode, field.kind) {
            (AppMode::Register, FieldKind::Toggle) => self.registration.toggle_employment(),
            (AppMode::AddCard, FieldKind::Choice) => self.card_flow.cycle_option(field.name),
            (AppMode::Utilities, FieldKind::Choice) => self.payment_flow.cycle_option(field.name),
            _ => {}
        }
    }

    /// Enter: next step, eligibility check or submit, depending on screen.
    pub fn confirm(&mut self) {
        match self.mode {
            AppMode::Login => self.submit_login(),
            AppMode::Register => self.confirm_registration(),
            AppMode::AddCard => self.confirm_card(),
            AppMode::Utilities => self.submit_payment(),
            AppMode::Welcome | AppMode::Dashboard | AppMode::Help => {}
        }
    }

    /// Esc: previous step, or leave the screen.
    pub fn back(&mut self) {
        match self.mode {
            AppMode::Register if !self.registration.controller.is_first() => {
                self.registration.prev();
                self.focus = 0;
            }
            AppMode::Login | AppMode::Register => self.open(AppMode::Welcome),
            AppMode::AddCard | AppMode::Utilities => self.open(AppMode::Dashboard),
            AppMode::Help => {
                self.mode = self.previous_mode;
                self.focus = 0;
            }
            AppMode::Welcome | AppMode::Dashboard => {}
        }
    }

    fn report(&mut self, result: &SubmitResult) {
        match result {
            SubmitResult::Rejected(_) => self.status_message = Some(FIX_FIELDS_MESSAGE.to_string()),
            SubmitResult::Failed(message) => self.status_message = Some(message.clone()),
            SubmitResult::Ignored | SubmitResult::Submitted(_) => {}
        }
    }

    fn submit_login(&mut self) {
        let result = self.runtime.block_on(self.login.submit(&SignIn(&self.auth)));
        self.report(&result);
        if matches!(result, SubmitResult::Submitted(_)) {
            self.open(AppMode::Dashboard);
            let name = self.auth.user().map(|user| user.name).unwrap_or_default();
            self.status_message = Some(format!("Welcome back, {name}"));
        }
    }

    fn confirm_registration(&mut self) {
        if !self.registration.controller.is_last() {
            if self.registration.next() {
                self.focus = 0;
                self.status_message = None;
            } else {
                self.status_message = Some(FIX_FIELDS_MESSAGE.to_string());
            }
            return;
        }

        let result = self
            .runtime
            .block_on(self.registration.submit(&RegisterAccount(&self.auth)));
        self.report(&result);
        if matches!(result, SubmitResult::Submitted(_)) {
            info!("registration completed");
            self.registration = RegistrationFlow::new();
            self.open(AppMode::Dashboard);
            self.status_message = Some("Registration successful!".to_string());
        }
    }

    fn confirm_card(&mut self) {
        if self.card_flow.card_type() == CardType::Credit && self.card_flow.decision().is_none() {
            self.status_message = match self.card_flow.check_eligibility() {
                Some(decision) => Some(format!("{}: {}", decision.title(), decision.message())),
                None => Some(FIX_FIELDS_MESSAGE.to_string()),
            };
            return;
        }

        let result = self.runtime.block_on(self.card_flow.submit(&OpenCard(&self.auth)));
        self.report(&result);
        if matches!(result, SubmitResult::Submitted(_)) {
            self.open(AppMode::Dashboard);
            self.status_message = Some("Card created successfully!".to_string());
        }
    }

    fn submit_payment(&mut self) {
        let result = self
            .runtime
            .block_on(self.payment_flow.submit(&PayUtility(&self.auth)));
        self.report(&result);
        if matches!(result, SubmitResult::Submitted(_)) {
            self.focus = 0;
            self.status_message = self.payment_flow.success_message().map(str::to_string);
        }
    }

    /// Selects the card after (or before) the current one on the dashboard.
    pub fn select_card(&mut self, forward: bool) {
        let cards = self.auth.cards();
        if cards.is_empty() {
            return;
        }
        let current = self
            .auth
            .current_card()
            .and_then(|card| cards.iter().position(|c| c.id == card.id))
            .unwrap_or(0);
        let next = if forward {
            (current + 1) % cards.len()
        } else {
            (current + cards.len() - 1) % cards.len()
        };
        self.auth.update_current_card(&cards[next].id);
    }

    /// Blocks the current card, or unblocks it when already blocked.
    pub fn toggle_card_block(&mut self) {
        let outcome = self.runtime.block_on(self.auth.toggle_current_card_block());
        self.status_message = Some(if outcome.success {
            match self.auth.current_card() {
                Some(card) if card.is_blocked => "Card blocked".to_string(),
                _ => "Card unblocked".to_string(),
            }
        } else {
            outcome.error_message().to_string()
        });
    }

    pub fn logout(&mut self) {
        self.auth.logout();
        self.open(AppMode::Welcome);
        self.status_message = Some("Signed out".to_string());
    }

    /// Writes the payment history to the configured export file.
    pub fn export_payments(&mut self) {
        let result = CsvExporter::export_payments(&self.auth.payments(), &self.export_file);
        match result {
            Ok(path) => {
                self.status_message = Some(format!("Exported to {path}"));
            }
            Err(error) => {
                self.status_message = Some(format!("Export failed: {error}"));
            }
        }
    }
}
