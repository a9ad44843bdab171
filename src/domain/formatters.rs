//! Display and input formatting helpers.

use super::bank::Currency;

pub const PHONE_PREFIX: &str = "+994";
pub const PHONE_LENGTH: usize = 13;

/// Normalises raw phone input the way the phone field accepts it.
///
/// The `+994` prefix is always kept and only digits are allowed after it.
/// Returns `None` when the result would exceed the full phone length, in
/// which case the keystroke is dropped.
pub fn normalize_phone_input(raw: &str) -> Option<String> {
    let rest = raw.strip_prefix(PHONE_PREFIX).unwrap_or(raw);
    let digits: String = rest.chars().filter(char::is_ascii_digit).collect();
    let phone = format!("{PHONE_PREFIX}{digits}");
    (phone.len() <= PHONE_LENGTH).then_some(phone)
}

/// Formats `+994501234567` as `+994 50 123 45 67`; anything else is
/// returned unchanged.
pub fn format_phone_number(phone: &str) -> String {
    let digits: String = phone.chars().filter(char::is_ascii_digit).collect();
    match digits.strip_prefix("994") {
        Some(rest) if rest.len() == 9 => format!(
            "+994 {} {} {} {}",
            &rest[0..2],
            &rest[2..5],
            &rest[5..7],
            &rest[7..9]
        ),
        _ => phone.to_string(),
    }
}

/// Masks all but the last `visible` digits of a 16 digit card number.
pub fn mask_card_number(number: &str, visible: usize) -> String {
    let digits: String = number.chars().filter(char::is_ascii_digit).collect();
    if digits.is_empty() {
        return "•••• •••• •••• ••••".to_string();
    }
    if digits.len() < 16 {
        return number.to_string();
    }
    format!("•••• •••• •••• {}", &digits[digits.len() - visible.min(digits.len())..])
}

/// Formats an amount with two decimals and the currency code.
pub fn format_currency(amount: f64, currency: Currency) -> String {
    format!("{amount:.2} {}", currency.id())
}
