//! Bank entities shared by the flows and the mock bank.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::errors::{DomainError, DomainResult};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CardType {
    #[default]
    Debit,
    Credit,
    Premium,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CardSystem {
    #[default]
    Visa,
    Mastercard,
    Amex,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    #[default]
    Azn,
    Usd,
    Eur,
    Gbp,
    Rub,
    Try,
}

/// Utility companies that accept bill payments.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UtilityProvider {
    #[default]
    Azerqaz,
    Azersu,
    Azerishiq,
}

/// Declares the stable string id of each variant and the inverse lookup.
macro_rules! option_ids {
    ($ty:ty, $field:literal, { $($variant:path => $id:literal),+ $(,)? }) => {
        impl $ty {
            pub const ALL: &'static [$ty] = &[$($variant),+];

            pub fn id(&self) -> &'static str {
                match self {
                    $($variant => $id),+
                }
            }

            pub fn from_id(id: &str) -> DomainResult<Self> {
                match id {
                    $($id => Ok($variant),)+
                    other => Err(DomainError::UnknownOption {
                        field: $field.to_string(),
                        value: other.to_string(),
                    }),
                }
            }

            pub fn ids() -> Vec<&'static str> {
                Self::ALL.iter().map(|item| item.id()).collect()
            }
        }
    };
}

option_ids!(CardType, "type", {
    CardType::Debit => "debit",
    CardType::Credit => "credit",
    CardType::Premium => "premium",
});

option_ids!(CardSystem, "system", {
    CardSystem::Visa => "visa",
    CardSystem::Mastercard => "mastercard",
    CardSystem::Amex => "amex",
});

option_ids!(Currency, "currency", {
    Currency::Azn => "AZN",
    Currency::Usd => "USD",
    Currency::Eur => "EUR",
    Currency::Gbp => "GBP",
    Currency::Rub => "RUB",
    Currency::Try => "TRY",
});

option_ids!(UtilityProvider, "provider", {
    UtilityProvider::Azerqaz => "azerqaz",
    UtilityProvider::Azersu => "azersu",
    UtilityProvider::Azerishiq => "azerishiq",
});

impl UtilityProvider {
    pub fn name(&self) -> &'static str {
        match self {
            UtilityProvider::Azerqaz => "Azerqaz",
            UtilityProvider::Azersu => "Azersu",
            UtilityProvider::Azerishiq => "Azerishiq",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            UtilityProvider::Azerqaz => "Gas bill payment",
            UtilityProvider::Azersu => "Water bill payment",
            UtilityProvider::Azerishiq => "Electricity bill payment",
        }
    }

    /// Exact number of digits in a customer code.
    pub fn code_length(&self) -> usize {
        match self {
            UtilityProvider::Azerqaz | UtilityProvider::Azersu => 9,
            UtilityProvider::Azerishiq => 10,
        }
    }

    pub fn next(&self) -> Self {
        let all = Self::ALL;
        let position = all.iter().position(|item| item == self).unwrap_or(0);
        all[(position + 1) % all.len()]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub name: String,
    pub surname: String,
    pub email: String,
    pub phone: String,
    pub employment: bool,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.name, self.surname)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    pub id: String,
    #[serde(rename = "type")]
    pub card_type: CardType,
    pub system: CardSystem,
    pub currency: Currency,
    pub number: String,
    pub balance: f64,
    pub limit: Option<f64>,
    pub name: String,
    pub is_active: bool,
    pub is_blocked: bool,
    pub created_at: DateTime<Utc>,
}

/// A card as requested by the card-creation flow, before the bank assigns
/// an id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCard {
    #[serde(rename = "type")]
    pub card_type: CardType,
    pub system: CardSystem,
    pub currency: Currency,
    pub number: String,
    pub balance: f64,
    pub limit: Option<f64>,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UtilityPayment {
    pub provider: UtilityProvider,
    pub customer_code: String,
    pub card_id: String,
    pub amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentReceipt {
    pub id: String,
    pub provider: UtilityProvider,
    pub customer_code: String,
    pub card_id: String,
    pub amount: f64,
    pub paid_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_option_ids_round_trip() {
        for card_type in CardType::ALL {
            assert_eq!(CardType::from_id(card_type.id()).unwrap(), *card_type);
        }
        assert_eq!(Currency::from_id("EUR").unwrap(), Currency::Eur);
        assert!(matches!(
            CardSystem::from_id("diners"),
            Err(DomainError::UnknownOption { .. })
        ));
    }

    #[test]
    fn test_provider_code_lengths() {
        assert_eq!(UtilityProvider::Azerqaz.code_length(), 9);
        assert_eq!(UtilityProvider::Azersu.code_length(), 9);
        assert_eq!(UtilityProvider::Azerishiq.code_length(), 10);
    }

    #[test]
    fn test_provider_cycle() {
        assert_eq!(UtilityProvider::Azerqaz.next(), UtilityProvider::Azersu);
        assert_eq!(UtilityProvider::Azerishiq.next(), UtilityProvider::Azerqaz);
    }

    #[test]
    fn test_card_serializes_type_field() {
        let card = NewCard {
            card_type: CardType::Credit,
            system: CardSystem::Visa,
            currency: Currency::Azn,
            number: "4242 4242 4242 4242".into(),
            balance: 1500.0,
            limit: Some(1500.0),
            name: "Ada Lovelace".into(),
        };
        let json = serde_json::to_value(&card).unwrap();
        assert_eq!(json["type"], "credit");
        assert_eq!(json["currency"], "AZN");
    }
}
