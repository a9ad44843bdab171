//! Signed-in user, their cards and payments, kept in a [`SessionStore`].

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use tracing::{info, warn};

use super::flows::{card_request, fields, payment_request};
use super::submit::{SubmitCollaborator, SubmitOutcome};
use crate::domain::{Card, FieldValues, PaymentReceipt, User};
use crate::infrastructure::{AccountSnapshot, MockBankApi, RegistrationRequest, SessionStore, SessionStoreExt};

pub const USER_KEY: &str = "user";
pub const CARDS_KEY: &str = "userCards";
pub const CURRENT_CARD_KEY: &str = "currentCardId";
pub const PAYMENTS_KEY: &str = "userPayments";

pub const NOT_SIGNED_IN: &str = "Please sign in first";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Session {
    pub user: Option<User>,
    pub cards: Vec<Card>,
    pub current_card_id: Option<String>,
    pub payments: Vec<PaymentReceipt>,
}

/// Account operations on top of the bank API. Every successful change is
/// written through to the session store.
pub struct AuthService {
    api: Arc<MockBankApi>,
    store: Arc<dyn SessionStore>,
    session: RwLock<Session>,
    last_error: RwLock<Option<String>>,
}

fn load_or_default<T: DeserializeOwned + Default>(store: &dyn SessionStore, key: &str) -> T {
    match store.get_json::<T>(key) {
        Ok(value) => value.unwrap_or_default(),
        Err(e) => {
            warn!(key, error = %e, "stored session value unreadable, starting empty");
            T::default()
        }
    }
}

impl AuthService {
    /// Restores whatever session the store holds.
    pub fn new(api: Arc<MockBankApi>, store: Arc<dyn SessionStore>) -> Self {
        let session = Session {
            user: load_or_default(store.as_ref(), USER_KEY),
            cards: load_or_default(store.as_ref(), CARDS_KEY),
            current_card_id: load_or_default(store.as_ref(), CURRENT_CARD_KEY),
            payments: load_or_default(store.as_ref(), PAYMENTS_KEY),
        };
        if let Some(user) = &session.user {
            info!(user_id = %user.id, cards = session.cards.len(), "session restored");
        }
        Self {
            api,
            store,
            session: RwLock::new(session),
            last_error: RwLock::new(None),
        }
    }

    pub fn session(&self) -> Session {
        self.session.read().clone()
    }

    pub fn user(&self) -> Option<User> {
        self.session.read().user.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.read().user.is_some()
    }

    pub fn cards(&self) -> Vec<Card> {
        self.session.read().cards.clone()
    }

    pub fn payments(&self) -> Vec<PaymentReceipt> {
        self.session.read().payments.clone()
    }

    /// The selected card, falling back to the first one.
    pub fn current_card(&self) -> Option<Card> {
        let session = self.session.read();
        session
            .current_card_id
            .as_ref()
            .and_then(|id| session.cards.iter().find(|card| &card.id == id))
            .or_else(|| session.cards.first())
            .cloned()
    }

    pub fn last_error(&self) -> Option<String> {
        self.last_error.read().clone()
    }

    /// Selects a card by id. Returns false when the user has no such card.
    pub fn update_current_card(&self, card_id: &str) -> bool {
        let mut session = self.session.write();
        if !session.cards.iter().any(|card| card.id == card_id) {
            return false;
        }
        session.current_card_id = Some(card_id.to_string());
        drop(session);
        self.persist_value(CURRENT_CARD_KEY, &Some(card_id.to_string()));
        true
    }

    pub async fn register(&self, values: &FieldValues) -> SubmitOutcome {
        let request = RegistrationRequest::from_values(values);
        match self.api.register(request).await {
            Ok(user) => {
                let outcome = SubmitOutcome::success(&user);
                self.start_session(AccountSnapshot {
                    user,
                    cards: Vec::new(),
                    payments: Vec::new(),
                });
                outcome
            }
            Err(e) => self.fail(e.to_string()),
        }
    }

    pub async fn login(&self, email: &str, password: &str) -> SubmitOutcome {
        match self.api.login(email.trim(), password).await {
            Ok(account) => {
                let outcome = SubmitOutcome::success(&account.user);
                self.start_session(account);
                outcome
            }
            Err(e) => self.fail(e.to_string()),
        }
    }

    pub fn logout(&self) {
        let user = self.session.write().user.take();
        if let Some(user) = user {
            info!(user_id = %user.id, "signed out");
        }
        *self.session.write() = Session::default();
        *self.last_error.write() = None;
        for key in [USER_KEY, CARDS_KEY, CURRENT_CARD_KEY, PAYMENTS_KEY] {
            if let Err(e) = self.store.remove(key) {
                warn!(key, error = %e, "failed to clear session value");
            }
        }
    }

    /// Opens a card from card-form values for the signed-in user.
    pub async fn add_card(&self, values: &FieldValues) -> SubmitOutcome {
        let Some(user) = self.user() else {
            return self.fail(NOT_SIGNED_IN);
        };
        let request = match card_request(values, &user.full_name()) {
            Ok(request) => request,
            Err(e) => return self.fail(e.to_string()),
        };
        match self.api.add_card(&user.email, request).await {
            Ok(card) => {
                let outcome = SubmitOutcome::success(&card);
                let mut session = self.session.write();
                session.cards.push(card.clone());
                if session.current_card_id.is_none() {
                    session.current_card_id = Some(card.id.clone());
                }
                let snapshot = session.clone();
                drop(session);
                self.persist_value(CARDS_KEY, &snapshot.cards);
                self.persist_value(CURRENT_CARD_KEY, &snapshot.current_card_id);
                *self.last_error.write() = None;
                outcome
            }
            Err(e) => self.fail(e.to_string()),
        }
    }

    /// Flips the blocked flag of the current card.
    pub async fn toggle_current_card_block(&self) -> SubmitOutcome {
        let Some(user) = self.user() else {
            return self.fail(NOT_SIGNED_IN);
        };
        let Some(card) = self.current_card() else {
            return self.fail("No card selected");
        };
        match self.api.set_card_blocked(&user.email, &card.id, !card.is_blocked).await {
            Ok(updated) => {
                let outcome = SubmitOutcome::success(&updated);
                let mut session = self.session.write();
                if let Some(slot) = session.cards.iter_mut().find(|c| c.id == updated.id) {
                    *slot = updated;
                }
                let cards = session.cards.clone();
                drop(session);
                self.persist_value(CARDS_KEY, &cards);
                *self.last_error.write() = None;
                outcome
            }
            Err(e) => self.fail(e.to_string()),
        }
    }

    /// Pays a utility bill from payment-form values.
    pub async fn pay_utility(&self, values: &FieldValues) -> SubmitOutcome {
        let Some(user) = self.user() else {
            return self.fail(NOT_SIGNED_IN);
        };
        let payment = match payment_request(values) {
            Ok(payment) => payment,
            Err(e) => return self.fail(e.to_string()),
        };
        match self.api.pay_utility(&user.email, payment).await {
            Ok(receipt) => {
                let outcome = SubmitOutcome::success(&receipt);
                let mut session = self.session.write();
                session.payments.push(receipt);
                let payments = session.payments.clone();
                drop(session);
                self.persist_value(PAYMENTS_KEY, &payments);
                *self.last_error.write() = None;
                outcome
            }
            Err(e) => self.fail(e.to_string()),
        }
    }

    fn start_session(&self, account: AccountSnapshot) {
        let AccountSnapshot { user, cards, payments } = account;
        info!(user_id = %user.id, cards = cards.len(), payments = payments.len(), "signed in");
        let session = Session {
            current_card_id: cards.first().map(|card| card.id.clone()),
            user: Some(user),
            cards,
            payments,
        };
        self.persist_value(USER_KEY, &session.user);
        self.persist_value(CARDS_KEY, &session.cards);
        self.persist_value(CURRENT_CARD_KEY, &session.current_card_id);
        self.persist_value(PAYMENTS_KEY, &session.payments);
        *self.session.write() = session;
        *self.last_error.write() = None;
    }

    fn persist_value<T: serde::Serialize>(&self, key: &str, value: &T) {
        if let Err(e) = self.store.set_json(key, value) {
            warn!(key, error = %e, "failed to persist session value");
        }
    }

    fn fail(&self, message: impl Into<String>) -> SubmitOutcome {
        let message = message.into();
        *self.last_error.write() = Some(message.clone());
        SubmitOutcome::failure(message)
    }
}

/// Registration collaborator.
pub struct RegisterAccount<'a>(pub &'a AuthService);

#[async_trait]
impl SubmitCollaborator for RegisterAccount<'_> {
    async fn submit(&self, values: &FieldValues) -> SubmitOutcome {
        self.0.register(values).await
    }
}

/// Login collaborator.
pub struct SignIn<'a>(pub &'a AuthService);

#[async_trait]
impl SubmitCollaborator for SignIn<'_> {
    async fn submit(&self, values: &FieldValues) -> SubmitOutcome {
        let text = |field: &str| values.get(field).map(|value| value.as_text().into_owned()).unwrap_or_default();
        self.0.login(&text(fields::EMAIL), &text(fields::PASSWORD)).await
    }
}

/// Card creation collaborator.
pub struct OpenCard<'a>(pub &'a AuthService);

#[async_trait]
impl SubmitCollaborator for OpenCard<'_> {
    async fn submit(&self, values: &FieldValues) -> SubmitOutcome {
        self.0.add_card(values).await
    }
}

/// Utility payment collaborator.
pub struct PayUtility<'a>(pub &'a AuthService);

#[async_trait]
impl SubmitCollaborator for PayUtility<'_> {
    async fn submit(&self, values: &FieldValues) -> SubmitOutcome {
        self.0.pay_utility(values).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::flows::{CardApplicationFlow, LoginFlow, RegistrationFlow, UtilityPaymentFlow};
    use crate::application::SubmitResult;
    use crate::domain::{CardType, FieldValue};
    use crate::infrastructure::MemorySessionStore;

    fn service() -> (AuthService, Arc<MemorySessionStore>) {
        let store = Arc::new(MemorySessionStore::new());
        let service = AuthService::new(Arc::new(MockBankApi::default()), store.clone());
        (service, store)
    }

    fn registration_values(email: &str, employed: bool) -> FieldValues {
        [
            ("name", FieldValue::from("Ada")),
            ("surname", FieldValue::from("Lovelace")),
            ("email", FieldValue::from(email)),
            ("phone", FieldValue::from("+994501234567")),
            ("employment", FieldValue::from(employed)),
            ("password", FieldValue::from("Strong123")),
            ("confirmPassword", FieldValue::from("Strong123")),
        ]
        .into_iter()
        .map(|(field, value)| (field.to_string(), value))
        .collect()
    }

    #[tokio::test]
    async fn test_register_persists_user() {
        let (service, store) = service();
        let outcome = service.register(&registration_values("ada@bank.az", true)).await;
        assert!(outcome.success);
        assert_eq!(outcome.data.as_ref().unwrap()["email"], "ada@bank.az");
        assert!(service.is_authenticated());

        let stored: Option<User> = store.get_json(USER_KEY).unwrap().unwrap();
        assert_eq!(stored.unwrap().name, "Ada");
    }

    #[tokio::test]
    async fn test_duplicate_registration_fails_verbatim() {
        let (service, _) = service();
        service.register(&registration_values("ada@bank.az", true)).await;
        let outcome = service.register(&registration_values("ADA@bank.az", true)).await;
        assert!(!outcome.success);
        assert_eq!(outcome.error_message(), "User with this email already exists");
        assert_eq!(service.last_error().as_deref(), Some("User with this email already exists"));
    }

    #[tokio::test]
    async fn test_login_and_logout() {
        let (service, store) = service();
        service.register(&registration_values("ada@bank.az", true)).await;
        service.logout();
        assert!(!service.is_authenticated());
        assert!(store.get(USER_KEY).is_none());

        let outcome = service.login("ada@bank.az", "wrong").await;
        assert_eq!(outcome.error_message(), "Invalid email or password");

        let outcome = service.login("ada@bank.az", "Strong123").await;
        assert!(outcome.success);
        assert_eq!(service.user().unwrap().full_name(), "Ada Lovelace");
    }

    #[tokio::test]
    async fn test_actions_require_sign_in() {
        let (service, _) = service();
        let outcome = service.add_card(&FieldValues::new()).await;
        assert_eq!(outcome.error_message(), NOT_SIGNED_IN);
    }

    #[tokio::test]
    async fn test_flows_through_collaborators() {
        let (service, store) = service();

        let mut registration = RegistrationFlow::new();
        for (field, value) in registration_values("ada@bank.az", true) {
            registration.controller.form.set_field(&field, value);
        }
        assert!(registration.next());
        assert!(registration.next());
        let result = registration.submit(&RegisterAccount(&service)).await;
        assert!(matches!(result, SubmitResult::Submitted(_)));

        let mut card_flow = CardApplicationFlow::new(service.user().unwrap().employment);
        card_flow.select_card_type(CardType::Credit);
        card_flow.set_field(fields::MONTHLY_INCOME, "500");
        card_flow.set_field(fields::DESIRED_LIMIT, "2000");
        card_flow.check_eligibility();
        let result = card_flow.submit(&OpenCard(&service)).await;
        assert!(matches!(result, SubmitResult::Submitted(_)));

        let card = service.current_card().unwrap();
        assert_eq!(card.card_type, CardType::Credit);
        assert_eq!(card.limit, Some(1500.0));
        assert_eq!(card.name, "Ada Lovelace");

        let ids: Vec<String> = service.cards().into_iter().map(|card| card.id).collect();
        let mut payment_flow = UtilityPaymentFlow::new(ids);
        payment_flow.set_field(fields::CODE, "123456789");
        payment_flow.set_field(fields::AMOUNT, "12.5");
        let result = payment_flow.submit(&PayUtility(&service)).await;
        assert!(matches!(result, SubmitResult::Submitted(_)));
        assert_eq!(service.payments().len(), 1);

        let stored: Vec<PaymentReceipt> = store.get_json(PAYMENTS_KEY).unwrap().unwrap();
        assert_eq!(stored[0].amount, 12.5);

        service.logout();
        let mut login = LoginFlow::new();
        login.set_field(fields::EMAIL, "ada@bank.az");
        login.set_field(fields::PASSWORD, "Strong123");
        assert!(matches!(login.submit(&SignIn(&service)).await, SubmitResult::Submitted(_)));
        assert_eq!(service.cards().len(), 1);
    }

    #[tokio::test]
    async fn test_payment_history_survives_relogin() {
        let (service, store) = service();
        service.register(&registration_values("ada@bank.az", false)).await;
        let debit: FieldValues = [
            ("type", FieldValue::from("debit")),
            ("system", FieldValue::from("mastercard")),
            ("currency", FieldValue::from("AZN")),
        ]
        .into_iter()
        .map(|(field, value)| (field.to_string(), value))
        .collect();
        assert!(service.add_card(&debit).await.success);

        let card_id = service.current_card().unwrap().id;
        let payment: FieldValues = [
            ("provider", FieldValue::from("azerqaz")),
            ("code", FieldValue::from("123456789")),
            ("cardId", FieldValue::from(card_id.as_str())),
            ("amount", FieldValue::from("40")),
        ]
        .into_iter()
        .map(|(field, value)| (field.to_string(), value))
        .collect();
        assert!(service.pay_utility(&payment).await.success);

        service.logout();
        assert!(service.payments().is_empty());

        assert!(service.login("ada@bank.az", "Strong123").await.success);
        let payments = service.payments();
        assert_eq!(payments.len(), 1);
        assert_eq!(payments[0].amount, 40.0);
        let stored: Vec<PaymentReceipt> = store.get_json(PAYMENTS_KEY).unwrap().unwrap();
        assert_eq!(stored, payments);
    }

    #[tokio::test]
    async fn test_toggle_current_card_block() {
        let (service, _) = service();
        assert_eq!(service.toggle_current_card_block().await.error_message(), NOT_SIGNED_IN);

        service.register(&registration_values("ada@bank.az", false)).await;
        assert_eq!(service.toggle_current_card_block().await.error_message(), "No card selected");

        let debit: FieldValues = [
            ("type", FieldValue::from("debit")),
            ("system", FieldValue::from("visa")),
            ("currency", FieldValue::from("AZN")),
        ]
        .into_iter()
        .map(|(field, value)| (field.to_string(), value))
        .collect();
        service.add_card(&debit).await;
        let card_id = service.current_card().unwrap().id;

        assert!(service.toggle_current_card_block().await.success);
        assert!(service.current_card().unwrap().is_blocked);

        let payment: FieldValues = [
            ("provider", FieldValue::from("azersu")),
            ("code", FieldValue::from("123456789")),
            ("cardId", FieldValue::from(card_id.as_str())),
            ("amount", FieldValue::from("5")),
        ]
        .into_iter()
        .map(|(field, value)| (field.to_string(), value))
        .collect();
        assert_eq!(service.pay_utility(&payment).await.error_message(), "Card is blocked");

        assert!(service.toggle_current_card_block().await.success);
        assert!(!service.current_card().unwrap().is_blocked);
        assert!(service.pay_utility(&payment).await.success);
    }

    #[tokio::test]
    async fn test_network_failure_surfaces() {
        let store = Arc::new(MemorySessionStore::new());
        let api = Arc::new(MockBankApi::default());
        let service = AuthService::new(api.clone(), store);
        api.fail_next("Connection reset");
        let outcome = service.register(&registration_values("ada@bank.az", false)).await;
        assert_eq!(outcome.error_message(), "Connection reset");
        assert!(!service.is_authenticated());
    }

    #[tokio::test]
    async fn test_current_card_selection() {
        let (service, _) = service();
        service.register(&registration_values("ada@bank.az", false)).await;
        let debit: FieldValues = [
            ("type", FieldValue::from("debit")),
            ("system", FieldValue::from("visa")),
            ("currency", FieldValue::from("AZN")),
        ]
        .into_iter()
        .map(|(field, value)| (field.to_string(), value))
        .collect();
        service.add_card(&debit).await;
        service.add_card(&debit).await;

        let cards = service.cards();
        assert_eq!(service.current_card().unwrap().id, cards[0].id);
        assert!(service.update_current_card(&cards[1].id));
        assert_eq!(service.current_card().unwrap().id, cards[1].id);
        assert!(!service.update_current_card("missing"));
    }

    #[test]
    fn test_restores_and_tolerates_bad_values() {
        let store = Arc::new(MemorySessionStore::new());
        store.set(USER_KEY, "{not json".into()).unwrap();
        store.set(CARDS_KEY, "[]".into()).unwrap();
        let service = AuthService::new(Arc::new(MockBankApi::default()), store);
        assert!(!service.is_authenticated());
        assert!(service.cards().is_empty());
    }
}
