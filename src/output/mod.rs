//! Microfrontend output.
//!
//! The structured event handed to the embedding parent application after a
//! successful verification. Delivery goes through a sink trait so embedders
//! can swap the provisional log sink for postMessage/redirect/callback
//! integration without touching the form controller.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::form_urlencoded;

/// Event emitted exactly once per successful verification. Immutable once
/// created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MicrofrontendOutput {
    /// Step id that embedded this microfrontend, echoed back.
    pub referrer: u32,
    pub captcha_token: String,
    pub verified: bool,
    /// ISO-8601 creation instant.
    pub timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_data: Option<Value>,
}

impl MicrofrontendOutput {
    pub fn new(
        referrer: u32,
        captcha_token: impl Into<String>,
        verified: bool,
        user_data: Option<Value>,
    ) -> Self {
        Self {
            referrer,
            captcha_token: captcha_token.into(),
            verified,
            timestamp: Utc::now().to_rfc3339(),
            user_data,
        }
    }

    /// Example redirect URL for the next step, mirroring what a
    /// redirect-based integration would navigate to.
    pub fn redirect_preview(&self) -> String {
        let verification_id = self
            .user_data
            .as_ref()
            .and_then(|data| data.get("verificationId"))
            .and_then(Value::as_str)
            .unwrap_or_default();
        let query: String = form_urlencoded::Serializer::new(String::new())
            .append_pair("token", &self.captcha_token)
            .append_pair("referrer", &self.referrer.to_string())
            .append_pair("verified", if self.verified { "true" } else { "false" })
            .append_pair("orderId", verification_id)
            .finish();
        format!("{}?{query}", self.referrer)
    }
}

/// Receives the output event. Implementations must not fail the flow.
pub trait OutputSink: Send + Sync {
    fn deliver(&self, output: &MicrofrontendOutput);
}

/// Provisional sink that logs the output, the console analog.
#[derive(Debug, Default)]
pub struct LogOutputSink;

impl OutputSink for LogOutputSink {
    fn deliver(&self, output: &MicrofrontendOutput) {
        log::info!(
            "microfrontend output: verified={} referrer={} token={} timestamp={}",
            output.verified,
            output.referrer,
            output.captcha_token,
            output.timestamp,
        );
        log::info!("redirect preview: {}", output.redirect_preview());
        if let Some(user_data) = &output.user_data {
            log::debug!("verified user data: {user_data}");
        }
    }
}
