//! # Payment Form
//!
//! Formatting and validation for the checkout form. Nothing here talks to a
//! payment gateway.
//!
//! ## Card Types
//! Detected from the leading digits:
//! - Visa: `4`
//! - Mastercard: `51-55`, `22-27`
//! - American Express: `34`, `37`
//! - Discover: `6011`, `65`, `644-649`
//!
//! Amex numbers are 15 digits with a 4 digit CVV, everything else is 16 digits
//! with a 3 digit CVV.
//!
//! ## Retention
//! A validated payment keeps the brand and last four digits only. The full
//! number and the CVV are dropped once the form has been checked.
use std::{collections::BTreeMap, sync::LazyLock};

use chrono::{Datelike, NaiveDate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const MIN_BILLING_ADDRESS_LEN: usize = 5;

static VISA: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^4").unwrap());
static MASTERCARD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(5[1-5]|2[2-7])").unwrap());
static AMEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^3[47]").unwrap());
static DISCOVER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(6011|65|64[4-9])").unwrap());

static EXPIRY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(0[1-9]|1[0-2])/(\d{2})$").unwrap());
static EMAIL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap());

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CardType {
    Visa,
    Mastercard,
    Amex,
    Discover,
    Unknown,
}

impl CardType {
    pub fn detect(number: &str) -> Self {
        let digits = digits(number);

        if VISA.is_match(&digits) {
            CardType::Visa
        } else if MASTERCARD.is_match(&digits) {
            CardType::Mastercard
        } else if AMEX.is_match(&digits) {
            CardType::Amex
        } else if DISCOVER.is_match(&digits) {
            CardType::Discover
        } else {
            CardType::Unknown
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            CardType::Visa => "Visa",
            CardType::Mastercard => "Mastercard",
            CardType::Amex => "American Express",
            CardType::Discover => "Discover",
            CardType::Unknown => "Unknown",
        }
    }

    pub fn cvv_len(self) -> usize {
        match self {
            CardType::Amex => 4,
            _ => 3,
        }
    }

    pub fn number_len(self) -> usize {
        match self {
            CardType::Amex => 15,
            _ => 16,
        }
    }
}

fn digits(input: &str) -> String {
    input.chars().filter(char::is_ascii_digit).collect()
}

/// Groups the digits of a card number into blocks of four.
pub fn format_card_number(input: &str) -> String {
    let mut digits = digits(input);
    digits.truncate(CardType::detect(&digits).number_len());

    digits
        .as_bytes()
        .chunks(4)
        .filter_map(|block| std::str::from_utf8(block).ok())
        .collect::<Vec<_>>()
        .join(" ")
}

/// `0525` becomes `05/25`. Partial input is formatted as far as it goes.
pub fn format_expiry(input: &str) -> String {
    let mut digits = digits(input);
    digits.truncate(4);

    if digits.len() > 2 {
        digits.insert(2, '/');
    }

    digits
}

pub fn format_cvv(input: &str, card_type: CardType) -> String {
    let mut digits = digits(input);
    digits.truncate(card_type.cvv_len());

    digits
}

fn luhn(digits: &str) -> bool {
    let sum: u32 = digits
        .bytes()
        .rev()
        .map(|b| (b - b'0') as u32)
        .enumerate()
        .map(|(i, d)| match (i % 2 == 1, d * 2) {
            (true, doubled) if doubled > 9 => doubled - 9,
            (true, doubled) => doubled,
            (false, _) => d,
        })
        .sum();

    sum % 10 == 0
}

pub fn validate_card_number(input: &str) -> Result<CardType, &'static str> {
    let digits = digits(input);

    if digits.is_empty() {
        return Err("Card number is required");
    }

    let card_type = CardType::detect(&digits);
    if card_type == CardType::Unknown {
        return Err("Card type is not supported");
    }

    if digits.len() != card_type.number_len() || !luhn(&digits) {
        return Err("Card number is invalid");
    }

    Ok(card_type)
}

pub fn validate_expiry(input: &str, today: NaiveDate) -> Result<(), &'static str> {
    let captures = EXPIRY
        .captures(input.trim())
        .ok_or("Expiry date must be MM/YY")?;

    let month: u32 = captures[1].parse().map_err(|_| "Expiry date must be MM/YY")?;
    let year: i32 = captures[2].parse().map_err(|_| "Expiry date must be MM/YY")?;

    // A card is good through the last day of its expiry month.
    if (2000 + year, month) < (today.year(), today.month()) {
        return Err("Card has expired");
    }

    Ok(())
}

pub fn validate_cvv(input: &str, card_type: CardType) -> Result<(), &'static str> {
    let trimmed = input.trim();

    if trimmed.len() != card_type.cvv_len() || !trimmed.chars().all(|c| c.is_ascii_digit()) {
        return Err(match card_type {
            CardType::Amex => "CVV must be 4 digits",
            _ => "CVV must be 3 digits",
        });
    }

    Ok(())
}

pub fn validate_billing_address(input: &str) -> Result<(), &'static str> {
    if input.trim().chars().count() < MIN_BILLING_ADDRESS_LEN {
        return Err("Billing address is too short");
    }

    Ok(())
}

pub fn validate_email(input: &str) -> Result<(), &'static str> {
    if !EMAIL.is_match(input.trim()) {
        return Err("Email address is invalid");
    }

    Ok(())
}

pub fn validate_card_name(input: &str) -> Result<(), &'static str> {
    if input.trim().is_empty() {
        return Err("Name on card is required");
    }

    Ok(())
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Field {
    Email,
    CardName,
    CardNumber,
    ExpiryDate,
    Cvv,
    BillingAddress,
}

#[derive(Error, Debug, Default, PartialEq, Serialize)]
#[error("Invalid payment details: {} field(s) rejected", .0.len())]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<Field, String>);

impl FieldErrors {
    fn check(&mut self, field: Field, result: Result<(), &'static str>) {
        if let Err(message) = result {
            self.0.insert(field, message.to_string());
        }
    }

    pub fn get(&self, field: Field) -> Option<&str> {
        self.0.get(&field).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PaymentForm {
    pub email: String,
    pub card_name: String,
    pub card_number: String,
    pub expiry_date: String,
    pub cvv: String,
    pub billing_address: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidatedPayment {
    pub email: String,
    pub card_holder: String,
    pub card_type: CardType,
    pub last4: String,
}

impl PaymentForm {
    /// Checks every field and reports all failures together.
    pub fn validate(&self, today: NaiveDate) -> Result<ValidatedPayment, FieldErrors> {
        let mut errors = FieldErrors::default();

        errors.check(Field::Email, validate_email(&self.email));
        errors.check(Field::CardName, validate_card_name(&self.card_name));

        let card_type = match validate_card_number(&self.card_number) {
            Ok(card_type) => card_type,
            Err(message) => {
                errors.check(Field::CardNumber, Err(message));
                CardType::detect(&self.card_number)
            }
        };

        errors.check(Field::ExpiryDate, validate_expiry(&self.expiry_date, today));
        errors.check(Field::Cvv, validate_cvv(&self.cvv, card_type));
        errors.check(
            Field::BillingAddress,
            validate_billing_address(&self.billing_address),
        );

        if !errors.is_empty() {
            return Err(errors);
        }

        let digits = digits(&self.card_number);
        let last4 = digits[digits.len().saturating_sub(4)..].to_string();

        Ok(ValidatedPayment {
            email: self.email.trim().to_string(),
            card_holder: self.card_name.trim().to_string(),
            card_type,
            last4,
        })
    }
}

/// What the checkout form shows while the user is still typing.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CardPreview {
    pub card_number: String,
    pub expiry_date: String,
    pub cvv: String,
    pub card_type: CardType,
    pub card_label: &'static str,
    pub cvv_length: usize,
}

impl CardPreview {
    pub fn new(card_number: &str, expiry_date: &str, cvv: &str) -> Self {
        let card_type = CardType::detect(card_number);

        Self {
            card_number: format_card_number(card_number),
            expiry_date: format_expiry(expiry_date),
            cvv: format_cvv(cvv, card_type),
            card_type,
            card_label: card_type.label(),
            cvv_length: card_type.cvv_len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 16).unwrap()
    }

    fn valid_form() -> PaymentForm {
        PaymentForm {
            email: "jane@example.com".to_string(),
            card_name: "Jane Doe".to_string(),
            card_number: "4242 4242 4242 4242".to_string(),
            expiry_date: "12/28".to_string(),
            cvv: "123".to_string(),
            billing_address: "12 SW Longer Str".to_string(),
        }
    }

    #[test]
    fn test_detect_card_type() {
        assert_eq!(CardType::detect("4111"), CardType::Visa);
        assert_eq!(CardType::detect("5500 0000"), CardType::Mastercard);
        assert_eq!(CardType::detect("2221"), CardType::Mastercard);
        assert_eq!(CardType::detect("3782"), CardType::Amex);
        assert_eq!(CardType::detect("3400"), CardType::Amex);
        assert_eq!(CardType::detect("6011"), CardType::Discover);
        assert_eq!(CardType::detect("6500"), CardType::Discover);
        assert_eq!(CardType::detect("6440"), CardType::Discover);
        assert_eq!(CardType::detect("5600"), CardType::Unknown);
        assert_eq!(CardType::detect("3000"), CardType::Unknown);
        assert_eq!(CardType::detect(""), CardType::Unknown);
    }

    #[test]
    fn test_format_card_number() {
        assert_eq!(format_card_number("4242424242424242"), "4242 4242 4242 4242");
        assert_eq!(format_card_number("4242-4242-42"), "4242 4242 42");
        assert_eq!(format_card_number("42424242424242429999"), "4242 4242 4242 4242");
        assert_eq!(format_card_number("378282246310005777"), "3782 8224 6310 005");
        assert_eq!(format_card_number("abc"), "");
    }

    #[test]
    fn test_format_expiry() {
        assert_eq!(format_expiry("1"), "1");
        assert_eq!(format_expiry("12"), "12");
        assert_eq!(format_expiry("123"), "12/3");
        assert_eq!(format_expiry("12/289"), "12/28");
    }

    #[test]
    fn test_format_cvv() {
        assert_eq!(format_cvv("12345", CardType::Visa), "123");
        assert_eq!(format_cvv("12a345", CardType::Amex), "1234");
    }

    #[test]
    fn test_validate_card_number() {
        assert_eq!(validate_card_number("4242 4242 4242 4242"), Ok(CardType::Visa));
        assert_eq!(validate_card_number("5555555555554444"), Ok(CardType::Mastercard));
        assert_eq!(validate_card_number("378282246310005"), Ok(CardType::Amex));
        assert_eq!(validate_card_number("6011111111111117"), Ok(CardType::Discover));

        assert!(validate_card_number("").is_err());
        assert!(validate_card_number("4242 4242 4242 4241").is_err());
        assert!(validate_card_number("4242 4242 4242").is_err());
        assert!(validate_card_number("9999 9999 9999 9995").is_err());
    }

    #[test]
    fn test_validate_expiry() {
        assert!(validate_expiry("12/28", today()).is_ok());
        assert!(validate_expiry("10/26", today()).is_ok());

        assert_eq!(validate_expiry("09/26", today()), Err("Card has expired"));
        assert_eq!(validate_expiry("12/25", today()), Err("Card has expired"));

        assert!(validate_expiry("13/28", today()).is_err());
        assert!(validate_expiry("00/28", today()).is_err());
        assert!(validate_expiry("1228", today()).is_err());
        assert!(validate_expiry("1/28", today()).is_err());
    }

    #[test]
    fn test_validate_cvv() {
        assert!(validate_cvv("123", CardType::Visa).is_ok());
        assert!(validate_cvv("1234", CardType::Amex).is_ok());

        assert_eq!(validate_cvv("1234", CardType::Visa), Err("CVV must be 3 digits"));
        assert_eq!(validate_cvv("123", CardType::Amex), Err("CVV must be 4 digits"));
        assert!(validate_cvv("12a", CardType::Visa).is_err());
    }

    #[test]
    fn test_validate_contact_fields() {
        assert!(validate_email("a@b.co").is_ok());
        assert!(validate_email("a b@c.com").is_err());
        assert!(validate_email("missing-at.com").is_err());
        assert!(validate_email("a@nodot").is_err());

        assert!(validate_billing_address("12 Main").is_ok());
        assert!(validate_billing_address("  12   ").is_err());

        assert!(validate_card_name("Jane").is_ok());
        assert!(validate_card_name("   ").is_err());
    }

    #[test]
    fn test_valid_form_keeps_last_four_only() {
        let payment = valid_form().validate(today()).unwrap();

        assert_eq!(payment.card_type, CardType::Visa);
        assert_eq!(payment.last4, "4242");
        assert_eq!(payment.card_holder, "Jane Doe");

        let json = serde_json::to_value(&payment).unwrap();
        let mut fields: Vec<&str> = json
            .as_object()
            .unwrap()
            .keys()
            .map(String::as_str)
            .collect();
        fields.sort_unstable();
        assert_eq!(fields, ["cardHolder", "cardType", "email", "last4"]);
    }

    #[test]
    fn test_invalid_form_reports_every_field() {
        let form = PaymentForm {
            email: "nope".to_string(),
            expiry_date: "01/20".to_string(),
            cvv: "12".to_string(),
            ..valid_form()
        };

        let errors = form.validate(today()).unwrap_err();
        assert_eq!(errors.len(), 3);
        assert_eq!(errors.get(Field::Email), Some("Email address is invalid"));
        assert_eq!(errors.get(Field::ExpiryDate), Some("Card has expired"));
        assert_eq!(errors.get(Field::Cvv), Some("CVV must be 3 digits"));
        assert_eq!(errors.get(Field::CardNumber), None);

        let json = serde_json::to_value(&errors).unwrap();
        assert_eq!(json["cvv"], "CVV must be 3 digits");
    }

    #[test]
    fn test_amex_form_needs_four_digit_cvv() {
        let form = PaymentForm {
            card_number: "3782 822463 10005".to_string(),
            cvv: "123".to_string(),
            ..valid_form()
        };

        let errors = form.validate(today()).unwrap_err();
        assert_eq!(errors.get(Field::Cvv), Some("CVV must be 4 digits"));
    }

    #[test]
    fn test_card_preview() {
        let preview = CardPreview::new("378282246310005", "0530", "98765");

        assert_eq!(preview.card_number, "3782 8224 6310 005");
        assert_eq!(preview.expiry_date, "05/30");
        assert_eq!(preview.cvv, "9876");
        assert_eq!(preview.card_label, "American Express");
        assert_eq!(preview.cvv_length, 4);
    }
}
