//! In-process stand-in for the bank backend.
//!
//! Every call waits for the configured latency and can be told to fail, so
//! the flows see the same slow, fallible collaborator a real API would be.

use std::collections::HashMap;
use std::time::Duration;

use chrono::Utc;
use parking_lot::Mutex;
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

use crate::domain::{Card, FieldValues, NewCard, PaymentReceipt, User, UtilityPayment};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    #[error("User with this email already exists")]
    EmailTaken,
    #[error("Invalid email or password")]
    InvalidCredentials,
    #[error("Account not found")]
    AccountNotFound,
    #[error("Card not found")]
    CardNotFound,
    #[error("Card is blocked")]
    CardBlocked,
    #[error("{0}")]
    Network(String),
}

pub type ApiResult<T> = Result<T, ApiError>;

/// Data needed to open an account.
#[derive(Debug, Clone, PartialEq)]
pub struct RegistrationRequest {
    pub name: String,
    pub surname: String,
    pub email: String,
    pub phone: String,
    pub employment: bool,
    pub password: String,
}

impl RegistrationRequest {
    /// Reads the request from registration form values. Missing fields
    /// become empty strings.
    pub fn from_values(values: &FieldValues) -> Self {
        let text = |field: &str| {
            values
                .get(field)
                .map(|value| value.as_text().trim().to_string())
                .unwrap_or_default()
        };
        Self {
            name: text("name"),
            surname: text("surname"),
            email: text("email"),
            phone: text("phone"),
            employment: values.get("employment").is_some_and(|value| value.as_bool()),
            password: values
                .get("password")
                .map(|value| value.as_text().into_owned())
                .unwrap_or_default(),
        }
    }
}

/// What a successful login hands back.
#[derive(Debug, Clone, PartialEq)]
pub struct AccountSnapshot {
    pub user: User,
    pub cards: Vec<Card>,
    pub payments: Vec<PaymentReceipt>,
}

#[derive(Debug)]
struct Account {
    user: User,
    password: String,
    cards: Vec<Card>,
    payments: Vec<PaymentReceipt>,
}

/// Mock bank with explicit, lock-protected state.
#[derive(Debug)]
pub struct MockBankApi {
    latency: Duration,
    accounts: Mutex<HashMap<String, Account>>,
    pending_failure: Mutex<Option<String>>,
}

impl Default for MockBankApi {
    fn default() -> Self {
        Self::new(Duration::ZERO)
    }
}

fn account_key(email: &str) -> String {
    email.trim().to_lowercase()
}

impl MockBankApi {
    pub fn new(latency: Duration) -> Self {
        Self {
            latency,
            accounts: Mutex::new(HashMap::new()),
            pending_failure: Mutex::new(None),
        }
    }

    /// Makes the next call fail with `message`, as a dropped connection would.
    pub fn fail_next(&self, message: impl Into<String>) {
        *self.pending_failure.lock() = Some(message.into());
    }

    async fn round_trip(&self) -> ApiResult<()> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        match self.pending_failure.lock().take() {
            Some(message) => Err(ApiError::Network(message)),
            None => Ok(()),
        }
    }

    pub async fn register(&self, request: RegistrationRequest) -> ApiResult<User> {
        self.round_trip().await?;

        let key = account_key(&request.email);
        let mut accounts = self.accounts.lock();
        if accounts.contains_key(&key) {
            debug!(email = %key, "registration rejected, email taken");
            return Err(ApiError::EmailTaken);
        }

        let user = User {
            id: Uuid::new_v4().to_string(),
            name: request.name,
            surname: request.surname,
            email: request.email,
            phone: request.phone,
            employment: request.employment,
            created_at: Utc::now(),
        };
        accounts.insert(
            key,
            Account {
                user: user.clone(),
                password: request.password,
                cards: Vec::new(),
                payments: Vec::new(),
            },
        );
        info!(user_id = %user.id, "account created");
        Ok(user)
    }

    pub async fn login(&self, email: &str, password: &str) -> ApiResult<AccountSnapshot> {
        self.round_trip().await?;

        let accounts = self.accounts.lock();
        match accounts.get(&account_key(email)) {
            Some(account) if account.password == password => Ok(AccountSnapshot {
                user: account.user.clone(),
                cards: account.cards.clone(),
                payments: account.payments.clone(),
            }),
            _ => Err(ApiError::InvalidCredentials),
        }
    }

    pub async fn add_card(&self, email: &str, card: NewCard) -> ApiResult<Card> {
        self.round_trip().await?;

        let mut accounts = self.accounts.lock();
        let account = accounts
            .get_mut(&account_key(email))
            .ok_or(ApiError::AccountNotFound)?;
        let card = Card {
            id: Uuid::new_v4().to_string(),
            card_type: card.card_type,
            system: card.system,
            currency: card.currency,
            number: card.number,
            balance: card.balance,
            limit: card.limit,
            name: card.name,
            is_active: true,
            is_blocked: false,
            created_at: Utc::now(),
        };
        account.cards.push(card.clone());
        info!(card_id = %card.id, card_type = card.card_type.id(), "card issued");
        Ok(card)
    }

    /// Blocks or unblocks one of the account's cards.
    pub async fn set_card_blocked(&self, email: &str, card_id: &str, blocked: bool) -> ApiResult<Card> {
        self.round_trip().await?;

        let mut accounts = self.accounts.lock();
        let account = accounts
            .get_mut(&account_key(email))
            .ok_or(ApiError::AccountNotFound)?;
        let card = account
            .cards
            .iter_mut()
            .find(|card| card.id == card_id)
            .ok_or(ApiError::CardNotFound)?;
        card.is_blocked = blocked;
        info!(card_id = %card.id, blocked, "card block state changed");
        Ok(card.clone())
    }

    pub async fn pay_utility(&self, email: &str, payment: UtilityPayment) -> ApiResult<PaymentReceipt> {
        self.round_trip().await?;

        let mut accounts = self.accounts.lock();
        let account = accounts
            .get_mut(&account_key(email))
            .ok_or(ApiError::AccountNotFound)?;
        let card = account
            .cards
            .iter()
            .find(|card| card.id == payment.card_id)
            .ok_or(ApiError::CardNotFound)?;
        if card.is_blocked {
            return Err(ApiError::CardBlocked);
        }

        let receipt = PaymentReceipt {
            id: Uuid::new_v4().to_string(),
            provider: payment.provider,
            customer_code: payment.customer_code,
            card_id: payment.card_id,
            amount: payment.amount,
            paid_at: Utc::now(),
        };
        account.payments.push(receipt.clone());
        info!(receipt_id = %receipt.id, provider = receipt.provider.id(), "utility payment accepted");
        Ok(receipt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CardSystem, CardType, Currency, UtilityProvider};

    fn request(email: &str) -> RegistrationRequest {
        RegistrationRequest {
            name: "Ada".into(),
            surname: "Lovelace".into(),
            email: email.into(),
            phone: "+994501234567".into(),
            employment: true,
            password: "Strong123".into(),
        }
    }

    fn debit_card() -> NewCard {
        NewCard {
            card_type: CardType::Debit,
            system: CardSystem::Visa,
            currency: Currency::Azn,
            number: "4242 4242 4242 4242".into(),
            balance: 0.0,
            limit: None,
            name: "Ada Lovelace".into(),
        }
    }

    #[tokio::test]
    async fn test_register_and_login() {
        let api = MockBankApi::default();
        let user = api.register(request("ada@bank.az")).await.unwrap();
        assert_eq!(user.full_name(), "Ada Lovelace");

        let snapshot = api.login("ADA@bank.az", "Strong123").await.unwrap();
        assert_eq!(snapshot.user.id, user.id);
        assert!(snapshot.cards.is_empty());
        assert!(snapshot.payments.is_empty());

        assert_eq!(
            api.login("ada@bank.az", "wrong").await.unwrap_err(),
            ApiError::InvalidCredentials
        );
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let api = MockBankApi::default();
        api.register(request("ada@bank.az")).await.unwrap();
        let error = api.register(request(" Ada@Bank.az ")).await.unwrap_err();
        assert_eq!(error, ApiError::EmailTaken);
        assert_eq!(error.to_string(), "User with this email already exists");
    }

    #[tokio::test]
    async fn test_fail_next_is_one_shot() {
        let api = MockBankApi::default();
        api.fail_next("Network error. Please check your connection.");
        let error = api.register(request("ada@bank.az")).await.unwrap_err();
        assert_eq!(error.to_string(), "Network error. Please check your connection.");
        assert!(api.register(request("ada@bank.az")).await.is_ok());
    }

    #[tokio::test]
    async fn test_cards_and_payments() {
        let api = MockBankApi::default();
        api.register(request("ada@bank.az")).await.unwrap();
        let card = api.add_card("ada@bank.az", debit_card()).await.unwrap();
        assert!(card.is_active);
        let snapshot = api.login("ada@bank.az", "Strong123").await.unwrap();
        assert_eq!(snapshot.cards, vec![card.clone()]);

        let payment = UtilityPayment {
            provider: UtilityProvider::Azersu,
            customer_code: "123456789".into(),
            card_id: card.id.clone(),
            amount: 25.0,
        };
        let receipt = api.pay_utility("ada@bank.az", payment.clone()).await.unwrap();
        assert_eq!(receipt.amount, 25.0);

        let snapshot = api.login("ada@bank.az", "Strong123").await.unwrap();
        assert_eq!(snapshot.payments, vec![receipt]);

        let foreign = UtilityPayment {
            card_id: "other".into(),
            ..payment
        };
        assert_eq!(
            api.pay_utility("ada@bank.az", foreign).await.unwrap_err(),
            ApiError::CardNotFound
        );
    }

    #[tokio::test]
    async fn test_blocked_card_cannot_pay() {
        let api = MockBankApi::default();
        api.register(request("ada@bank.az")).await.unwrap();
        let card = api.add_card("ada@bank.az", debit_card()).await.unwrap();

        let blocked = api.set_card_blocked("ada@bank.az", &card.id, true).await.unwrap();
        assert!(blocked.is_blocked);

        let payment = UtilityPayment {
            provider: UtilityProvider::Azerishiq,
            customer_code: "1234567890".into(),
            card_id: card.id.clone(),
            amount: 10.0,
        };
        assert_eq!(
            api.pay_utility("ada@bank.az", payment.clone()).await.unwrap_err(),
            ApiError::CardBlocked
        );

        api.set_card_blocked("ada@bank.az", &card.id, false).await.unwrap();
        assert!(api.pay_utility("ada@bank.az", payment).await.is_ok());
        assert_eq!(
            api.set_card_blocked("ada@bank.az", "missing", true).await.unwrap_err(),
            ApiError::CardNotFound
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_latency_is_simulated() {
        let api = MockBankApi::new(Duration::from_millis(500));
        let started = tokio::time::Instant::now();
        api.register(request("ada@bank.az")).await.unwrap();
        assert!(started.elapsed() >= Duration::from_millis(500));
    }

    #[test]
    fn test_request_from_values() {
        let mut values = FieldValues::new();
        values.insert("name".into(), " Ada ".into());
        values.insert("employment".into(), true.into());
        values.insert("password".into(), " pass ".into());
        let request = RegistrationRequest::from_values(&values);
        assert_eq!(request.name, "Ada");
        assert!(request.employment);
        assert_eq!(request.password, " pass ");
        assert_eq!(request.email, "");
    }
}
