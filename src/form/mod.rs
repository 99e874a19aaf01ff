//! Verification form fields and validation rules.
//!
//! The rule checks are locale-free and shared verbatim between the client
//! controller (which maps violations to translated messages) and the server
//! endpoint (which maps them to wire messages). Lengths are counted in
//! characters, not bytes, because names and addresses carry accents.

pub mod controller;

pub use controller::{
    ApiError, ApiResponse, FormController, ReqwestVerificationApi, ServerFieldError,
    SubmissionState, SubmitEnvelope, SubmitReceipt, SubmitRequest, VerificationApi,
};

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::i18n::{translate, Locale};

pub const NAME_MIN_CHARS: usize = 2;
pub const NAME_MAX_CHARS: usize = 100;
pub const ADDRESS_MIN_CHARS: usize = 10;
pub const ADDRESS_MAX_CHARS: usize = 200;

/// Letters, Latin accents, and spaces; digits and symbols are rejected.
static NAME_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-záéíóúÁÉÍÓÚñÑüÜàèìòùÀÈÌÒÙâêîôûÂÊÎÔÛãõÃÕçÇ\s]+$")
        .expect("static name pattern")
});

/// The three user-entered fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationFields {
    pub name: String,
    pub country: String,
    pub address: String,
}

/// Field identifiers used in error reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Name,
    Country,
    Address,
}

impl Field {
    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Name => "name",
            Field::Country => "country",
            Field::Address => "address",
        }
    }
}

/// A single broken rule, independent of presentation language.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleViolation {
    Required,
    TooShort(usize),
    TooLong(usize),
    InvalidFormat,
}

/// Per-field validation error with a translated message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: Field,
    pub message: String,
}

/// Check the name rule set against a raw value.
pub fn check_name(value: &str) -> Option<RuleViolation> {
    let value = value.trim();
    if value.is_empty() {
        return Some(RuleViolation::Required);
    }
    let chars = value.chars().count();
    if chars < NAME_MIN_CHARS {
        return Some(RuleViolation::TooShort(NAME_MIN_CHARS));
    }
    if chars > NAME_MAX_CHARS {
        return Some(RuleViolation::TooLong(NAME_MAX_CHARS));
    }
    if !NAME_PATTERN.is_match(value) {
        return Some(RuleViolation::InvalidFormat);
    }
    None
}

/// Check the country rule set: a non-empty selection.
pub fn check_country(value: &str) -> Option<RuleViolation> {
    if value.trim().is_empty() {
        Some(RuleViolation::Required)
    } else {
        None
    }
}

/// Check the address rule set against a raw value.
pub fn check_address(value: &str) -> Option<RuleViolation> {
    let value = value.trim();
    if value.is_empty() {
        return Some(RuleViolation::Required);
    }
    let chars = value.chars().count();
    if chars < ADDRESS_MIN_CHARS {
        return Some(RuleViolation::TooShort(ADDRESS_MIN_CHARS));
    }
    if chars > ADDRESS_MAX_CHARS {
        return Some(RuleViolation::TooLong(ADDRESS_MAX_CHARS));
    }
    None
}

/// Run one field's checks.
pub fn check_field(field: Field, fields: &VerificationFields) -> Option<RuleViolation> {
    match field {
        Field::Name => check_name(&fields.name),
        Field::Country => check_country(&fields.country),
        Field::Address => check_address(&fields.address),
    }
}

/// Catalog key for a violation on a field.
pub fn violation_key(field: Field, violation: RuleViolation) -> &'static str {
    match (field, violation) {
        (Field::Name, RuleViolation::Required) => "form.validation.name.required",
        (Field::Name, RuleViolation::TooShort(_)) => "form.validation.name.minLength",
        (Field::Name, RuleViolation::TooLong(_)) => "form.validation.name.maxLength",
        (Field::Name, RuleViolation::InvalidFormat) => "form.validation.name.invalid",
        (Field::Country, _) => "form.validation.country.required",
        (Field::Address, RuleViolation::Required) => "form.validation.address.required",
        (Field::Address, RuleViolation::TooShort(_)) => "form.validation.address.minLength",
        (Field::Address, _) => "form.validation.address.maxLength",
    }
}

/// Validate one field into a translated error.
pub fn validate_field(
    field: Field,
    fields: &VerificationFields,
    locale: Locale,
) -> Option<FieldError> {
    check_field(field, fields).map(|violation| FieldError {
        field,
        message: translate(locale, violation_key(field, violation)).to_string(),
    })
}

/// Validate the whole form. An empty result means the form passes.
pub fn validate(fields: &VerificationFields, locale: Locale) -> Vec<FieldError> {
    [Field::Name, Field::Country, Field::Address]
        .into_iter()
        .filter_map(|field| validate_field(field, fields, locale))
        .collect()
}
