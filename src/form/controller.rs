//! Verification form controller.
//!
//! Orchestrates field validation, the CAPTCHA gate, the submission HTTP
//! call, and output-event construction. Submission state moves
//! `idle → submitting → success` or back to idle with a translated error;
//! nothing below this boundary escapes as a panic or an unhandled error.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;
use url::Url;

use crate::boot::DecodedQueryParams;
use crate::captcha::CaptchaController;
use crate::i18n::{translate, Locale};
use crate::output::{MicrofrontendOutput, OutputSink};

use super::{validate, validate_field, Field, FieldError, VerificationFields};

/// JSON body posted to the verification endpoint: the fields, the CAPTCHA
/// token, and every piece of pass-through context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitRequest {
    pub name: String,
    pub country: String,
    pub address: String,
    pub captcha_token: String,
    pub referrer: u32,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shipping_data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub billing_data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_data: Option<Value>,
}

impl SubmitRequest {
    pub fn new(
        fields: &VerificationFields,
        captcha_token: impl Into<String>,
        context: &DecodedQueryParams,
    ) -> Self {
        Self {
            name: fields.name.clone(),
            country: fields.country.clone(),
            address: fields.address.clone(),
            captcha_token: captcha_token.into(),
            referrer: context.referrer,
            token: context.token.clone(),
            customer_data: context.customer_data.clone(),
            shipping_data: context.shipping_data.clone(),
            billing_data: context.billing_data.clone(),
            payment_data: context.payment_data.clone(),
            order_data: context.order_data.clone(),
        }
    }
}

/// Identifier pair returned on success.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitReceipt {
    pub id: String,
    pub timestamp: String,
}

/// Structured validation error from the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerFieldError {
    pub field: String,
    pub message: String,
}

/// Response envelope shared by success and failure paths.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubmitEnvelope {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<SubmitReceipt>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<ServerFieldError>>,
}

/// Status + parsed envelope from one submission call.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    pub envelope: SubmitEnvelope,
}

impl ApiResponse {
    pub fn is_ok(&self) -> bool {
        (200..300).contains(&self.status) && self.envelope.success
    }
}

/// Errors from the verification API transport.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("verification request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("verification response was not a valid envelope: {0}")]
    Malformed(String),
}

/// Transport seam for the verification endpoint, fakeable in tests.
#[async_trait]
pub trait VerificationApi: Send + Sync {
    async fn submit(&self, request: &SubmitRequest) -> Result<ApiResponse, ApiError>;
}

/// Production transport over reqwest.
pub struct ReqwestVerificationApi {
    client: reqwest::Client,
    endpoint: Url,
}

impl ReqwestVerificationApi {
    pub fn new(endpoint: Url) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder().build()?;
        Ok(Self { client, endpoint })
    }
}

#[async_trait]
impl VerificationApi for ReqwestVerificationApi {
    async fn submit(&self, request: &SubmitRequest) -> Result<ApiResponse, ApiError> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .json(request)
            .send()
            .await?;
        let status = response.status().as_u16();
        let envelope = match response.json::<SubmitEnvelope>().await {
            Ok(envelope) => envelope,
            // Error pages may not be JSON; the caller still needs the status.
            Err(_) if !(200..300).contains(&status) => SubmitEnvelope::default(),
            Err(err) => return Err(ApiError::Malformed(err.to_string())),
        };
        Ok(ApiResponse { status, envelope })
    }
}

/// Submission state, `idle → submitting → success | idle(error)`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubmissionState {
    pub is_submitting: bool,
    pub is_success: bool,
    pub error: Option<String>,
}

/// One form instance: fields, per-field errors, submission state, and the
/// owned CAPTCHA controller.
pub struct FormController {
    fields: VerificationFields,
    field_errors: Vec<FieldError>,
    submission: SubmissionState,
    locale: Locale,
    context: DecodedQueryParams,
    captcha: CaptchaController,
    api: Arc<dyn VerificationApi>,
    sink: Arc<dyn OutputSink>,
    submit_timeout: Duration,
}

impl FormController {
    pub fn new(
        locale: Locale,
        context: DecodedQueryParams,
        captcha: CaptchaController,
        api: Arc<dyn VerificationApi>,
        sink: Arc<dyn OutputSink>,
        submit_timeout: Duration,
    ) -> Self {
        Self {
            fields: VerificationFields::default(),
            field_errors: Vec::new(),
            submission: SubmissionState::default(),
            locale,
            context,
            captcha,
            api,
            sink,
            submit_timeout,
        }
    }

    pub fn fields(&self) -> &VerificationFields {
        &self.fields
    }

    pub fn field_errors(&self) -> &[FieldError] {
        &self.field_errors
    }

    pub fn submission(&self) -> &SubmissionState {
        &self.submission
    }

    pub fn context(&self) -> &DecodedQueryParams {
        &self.context
    }

    pub fn captcha(&self) -> &CaptchaController {
        &self.captcha
    }

    pub fn captcha_mut(&mut self) -> &mut CaptchaController {
        &mut self.captcha
    }

    pub fn set_locale(&mut self, locale: Locale) {
        self.locale = locale;
        self.captcha.set_locale(locale);
    }

    pub fn set_name(&mut self, value: impl Into<String>) {
        self.fields.name = value.into();
    }

    pub fn set_country(&mut self, value: impl Into<String>) {
        self.fields.country = value.into();
    }

    pub fn set_address(&mut self, value: impl Into<String>) {
        self.fields.address = value.into();
    }

    /// Pre-fill fields from the decoded initial data when present. Existing
    /// user input is never overwritten.
    pub fn prefill_from_context(&mut self) {
        if self.fields.name.is_empty() {
            if let Some(customer) = &self.context.customer_data {
                let first = customer.get("firstName").and_then(Value::as_str);
                let last = customer.get("lastName").and_then(Value::as_str);
                if let (Some(first), Some(last)) = (first, last) {
                    self.fields.name = format!("{first} {last}");
                }
            }
        }
        if self.fields.country.is_empty() {
            if let Some(country) = self
                .context
                .shipping_data
                .as_ref()
                .and_then(|shipping| shipping.get("country"))
                .and_then(Value::as_str)
            {
                self.fields.country = country.to_string();
            }
        }
        if self.fields.address.is_empty() {
            if let Some(shipping) = &self.context.shipping_data {
                let street = shipping.get("street").and_then(Value::as_str);
                let number = shipping.get("number").and_then(Value::as_str);
                let city = shipping.get("city").and_then(Value::as_str);
                if let (Some(street), Some(number), Some(city)) = (street, number, city) {
                    self.fields.address = format!("{street} {number}, {city}");
                }
            }
        }
    }

    /// Blur-time validation of one field. Replaces any previous error for
    /// that field, leaves the others untouched.
    pub fn on_blur(&mut self, field: Field) {
        self.field_errors.retain(|error| error.field != field);
        if let Some(error) = validate_field(field, &self.fields, self.locale) {
            self.field_errors.push(error);
        }
    }

    /// Full-form validation; records per-field errors.
    pub fn validate_all(&mut self) -> bool {
        self.field_errors = validate(&self.fields, self.locale);
        self.field_errors.is_empty()
    }

    /// Run the submission algorithm. Returns the constructed output on
    /// success; every failure lands in [`SubmissionState`] instead of
    /// propagating.
    pub async fn submit(&mut self) -> Option<MicrofrontendOutput> {
        self.submission.error = None;
        self.submission.is_submitting = true;

        if !self.validate_all() {
            self.submission.is_submitting = false;
            return None;
        }

        // CAPTCHA completion is an explicit user interaction; an unverified
        // widget fails the submission rather than being executed implicitly.
        let captcha_token = match (
            self.captcha.state().is_verified,
            self.captcha.state().token.clone(),
        ) {
            (true, Some(token)) => token,
            _ => {
                self.fail(translate(self.locale, "form.errors.captchaRequired").to_string());
                return None;
            }
        };

        let request = SubmitRequest::new(&self.fields, captcha_token.clone(), &self.context);
        let response =
            match tokio::time::timeout(self.submit_timeout, self.api.submit(&request)).await {
                Ok(Ok(response)) => response,
                Ok(Err(err)) => {
                    log::warn!("submission transport error: {err}");
                    self.fail(translate(self.locale, "form.errors.submitFailed").to_string());
                    return None;
                }
                Err(_) => {
                    log::warn!("submission timed out after {:?}", self.submit_timeout);
                    self.fail(translate(self.locale, "form.errors.submitFailed").to_string());
                    return None;
                }
            };

        if !response.is_ok() {
            let message = response
                .envelope
                .message
                .clone()
                .unwrap_or_else(|| translate(self.locale, "form.errors.submitFailed").to_string());
            log::warn!(
                "submission rejected (status {}): {message}",
                response.status
            );
            self.fail(message);
            return None;
        }

        let mut user_data = json!({
            "name": self.fields.name,
            "country": self.fields.country,
            "address": self.fields.address,
        });
        if let Some(receipt) = &response.envelope.data {
            user_data["verificationId"] = Value::String(receipt.id.clone());
            user_data["serverTimestamp"] = Value::String(receipt.timestamp.clone());
        }

        let output = MicrofrontendOutput::new(
            self.context.referrer,
            captcha_token,
            true,
            Some(user_data),
        );

        self.submission.is_submitting = false;
        self.submission.is_success = true;
        self.fields = VerificationFields::default();
        self.field_errors.clear();
        self.captcha.reset();

        self.sink.deliver(&output);
        Some(output)
    }

    /// Clear fields, CAPTCHA state, and submission state together.
    pub fn reset(&mut self) {
        self.fields = VerificationFields::default();
        self.field_errors.clear();
        self.captcha.reset();
        self.submission = SubmissionState::default();
    }

    fn fail(&mut self, message: String) {
        self.submission.is_submitting = false;
        self.submission.is_success = false;
        self.submission.error = Some(message);
    }
}
