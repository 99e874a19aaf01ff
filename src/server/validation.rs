//! Server-side payload validation and sanitization.
//!
//! Mirrors the client rules but never trusts them: every submitted string is
//! re-checked and sanitized here before any use or logging. The CAPTCHA
//! token is validated for shape only; this endpoint deliberately does not
//! call the challenge vendor's verify API.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::data;
use crate::form::{self, RuleViolation};

/// Token shape issued by the hosted widget.
static TOKEN_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_-]+$").expect("static token pattern"));

static HTML_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").expect("static tag pattern"));

/// Body accepted by `POST /api/verification/submit`. Pass-through context
/// beyond the validated fields is retained untyped.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationPayload {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub captcha_token: String,
    #[serde(flatten)]
    pub context: serde_json::Map<String, Value>,
}

/// One field/message pair in a 400 response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMessage {
    pub field: String,
    pub message: String,
}

/// Validate a payload against the full server rule set. An empty result
/// means the payload is acceptable.
pub fn validate_payload(payload: &VerificationPayload) -> Vec<FieldMessage> {
    let mut errors = Vec::new();

    if let Some(violation) = form::check_name(&payload.name) {
        errors.push(FieldMessage {
            field: "name".into(),
            message: name_message(violation),
        });
    }

    if let Some(message) = country_message(&payload.country) {
        errors.push(FieldMessage {
            field: "country".into(),
            message,
        });
    }

    if let Some(violation) = form::check_address(&payload.address) {
        errors.push(FieldMessage {
            field: "address".into(),
            message: address_message(violation),
        });
    }

    if let Some(message) = token_message(&payload.captcha_token) {
        errors.push(FieldMessage {
            field: "captchaToken".into(),
            message,
        });
    }

    errors
}

fn name_message(violation: RuleViolation) -> String {
    match violation {
        RuleViolation::Required => "Name is required".into(),
        RuleViolation::TooShort(min) => format!("Name must be at least {min} characters"),
        RuleViolation::TooLong(max) => format!("Name cannot exceed {max} characters"),
        RuleViolation::InvalidFormat => "Name can only contain letters and spaces".into(),
    }
}

fn country_message(country: &str) -> Option<String> {
    let country = country.trim();
    if country.is_empty() {
        return Some("Country is required".into());
    }
    if !data::is_supported_country(country) {
        let supported: Vec<&str> = data::countries()
            .iter()
            .map(|country| country.code.as_str())
            .collect();
        return Some(format!("Country must be one of: {}", supported.join(", ")));
    }
    None
}

fn address_message(violation: RuleViolation) -> String {
    match violation {
        RuleViolation::Required => "Address is required".into(),
        RuleViolation::TooShort(min) => format!("Address must be at least {min} characters"),
        RuleViolation::TooLong(max) => format!("Address cannot exceed {max} characters"),
        RuleViolation::InvalidFormat => "Address format is invalid".into(),
    }
}

fn token_message(token: &str) -> Option<String> {
    let token = token.trim();
    if token.is_empty() {
        return Some("Captcha token is required".into());
    }
    if !TOKEN_PATTERN.is_match(token) {
        return Some("Invalid captcha token format".into());
    }
    None
}

/// Strip HTML tags, escape entities, and trim. Applied to every submitted
/// string before use or logging.
pub fn sanitize_input(input: &str) -> String {
    let stripped = HTML_TAG.replace_all(input.trim(), "");
    html_escape::encode_quoted_attribute(stripped.as_ref()).into_owned()
}

/// Sanitized copy of the validated fields.
pub fn sanitize_payload(payload: &VerificationPayload) -> VerificationPayload {
    VerificationPayload {
        name: sanitize_input(&payload.name),
        country: payload.country.trim().to_ascii_uppercase(),
        address: sanitize_input(&payload.address),
        captcha_token: payload.captcha_token.trim().to_string(),
        context: payload.context.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(name: &str, country: &str, address: &str, token: &str) -> VerificationPayload {
        VerificationPayload {
            name: name.into(),
            country: country.into(),
            address: address.into(),
            captcha_token: token.into(),
            context: serde_json::Map::new(),
        }
    }

    #[test]
    fn valid_payload_passes() {
        let payload = payload(
            "Juan Pérez",
            "AR",
            "Av. Corrientes 1234, Buenos Aires",
            "tok123",
        );
        assert!(validate_payload(&payload).is_empty());
    }

    #[test]
    fn unsupported_country_is_rejected_server_side() {
        let payload = payload("Juan Pérez", "MX", "Av. Corrientes 1234, CDMX", "tok123");
        let errors = validate_payload(&payload);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "country");
        assert!(errors[0].message.contains("AR, BR"));
    }

    #[test]
    fn token_shape_is_enforced() {
        let errors = validate_payload(&payload(
            "Juan Pérez",
            "AR",
            "Av. Corrientes 1234, Buenos Aires",
            "tok<script>",
        ));
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "captchaToken");

        let errors = validate_payload(&payload(
            "Juan Pérez",
            "AR",
            "Av. Corrientes 1234, Buenos Aires",
            "",
        ));
        assert_eq!(errors[0].message, "Captcha token is required");
    }

    #[test]
    fn every_broken_field_is_reported() {
        let errors = validate_payload(&payload("J", "", "short", ""));
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, ["name", "country", "address", "captchaToken"]);
    }

    #[test]
    fn sanitize_strips_tags_and_escapes_entities() {
        assert_eq!(
            sanitize_input("  <script>alert('x')</script>Juan  "),
            "alert(&#x27;x&#x27;)Juan"
        );
        assert_eq!(sanitize_input("a & b < c"), "a &amp; b &lt; c");
    }

    #[test]
    fn sanitize_payload_normalizes_country_case() {
        let sanitized = sanitize_payload(&payload(
            "Juan <b>Pérez</b>",
            " ar ",
            "Av. Corrientes 1234",
            " tok123 ",
        ));
        assert_eq!(sanitized.name, "Juan Pérez");
        assert_eq!(sanitized.country, "AR");
        assert_eq!(sanitized.captcha_token, "tok123");
    }
}
