//! Boot context plumbing.
//!
//! The microfrontend receives its context either as URL query parameters or
//! as server-injected globals. This module owns the symmetric query-param
//! codec (`urlencode(json(value))` and its inverse), the decoded parameter
//! bag, and the boot context structure shared by the server assembly and the
//! client hydration reader.

pub mod client;
pub mod server;

pub use client::{read_document, HydratedState, HydrationError};
pub use server::BootContextBuilder;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::form_urlencoded;

use crate::config::PerformanceConfig;
use crate::data::Country;
use crate::i18n::Locale;

/// Default step id when the embedding flow does not say otherwise.
pub const DEFAULT_REFERRER_STEP: u32 = 1;

/// Default step name for this microfrontend.
pub const DEFAULT_STEP: &str = "verification";

/// Encode a JSON value for transport in a query parameter.
pub fn encode_param(value: &Value) -> String {
    let json = value.to_string();
    form_urlencoded::byte_serialize(json.as_bytes()).collect()
}

/// Inverse of [`encode_param`]. Returns `None` (and logs) on malformed
/// input; decoding must never fail the page render.
///
/// Transports like the server's query extractor hand over values that are
/// already percent-decoded once, so the raw value is tried as JSON first
/// and only then percent-decoded.
pub fn decode_param(raw: &str) -> Option<Value> {
    if raw.is_empty() {
        return None;
    }
    if let Ok(value) = serde_json::from_str(raw) {
        return Some(value);
    }
    let decoded: String = form_urlencoded::parse(format!("v={raw}").as_bytes())
        .next()
        .map(|(_, value)| value.into_owned())?;
    match serde_json::from_str(&decoded) {
        Ok(value) => Some(value),
        Err(err) => {
            log::warn!("dropping undecodable query param: {err}");
            None
        }
    }
}

/// Context bag decoded from query parameters or injected state. Read-only
/// after construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecodedQueryParams {
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
    /// Numeric id of the step/page that embedded this one.
    #[serde(default = "default_referrer")]
    pub referrer: u32,
    /// Session/transaction token passed through to the backend.
    #[serde(default)]
    pub token: String,
    #[serde(default = "default_step")]
    pub step: String,
}

fn default_referrer() -> u32 {
    DEFAULT_REFERRER_STEP
}

fn default_step() -> String {
    DEFAULT_STEP.to_string()
}

impl Default for DecodedQueryParams {
    fn default() -> Self {
        Self {
            customer_data: None,
            shipping_data: None,
            billing_data: None,
            payment_data: None,
            order_data: None,
            referrer: DEFAULT_REFERRER_STEP,
            token: String::new(),
            step: DEFAULT_STEP.to_string(),
        }
    }
}

impl DecodedQueryParams {
    /// Decode a raw query map. Malformed `*Data` values are dropped, scalar
    /// values fall back to their defaults; this operation cannot fail.
    pub fn from_query(query: &HashMap<String, String>) -> Self {
        let mut params = Self::default();

        params.customer_data = query.get("customerData").and_then(|raw| decode_param(raw));
        params.shipping_data = query.get("shippingData").and_then(|raw| decode_param(raw));
        params.billing_data = query.get("billingData").and_then(|raw| decode_param(raw));
        params.payment_data = query.get("paymentData").and_then(|raw| decode_param(raw));
        params.order_data = query.get("orderData").and_then(|raw| decode_param(raw));

        if let Some(raw) = query.get("referrer") {
            match raw.parse() {
                Ok(referrer) => params.referrer = referrer,
                Err(_) => log::warn!("ignoring non-numeric referrer: {raw}"),
            }
        }
        if let Some(token) = query.get("token") {
            params.token = token.clone();
        }
        if let Some(step) = query.get("step") {
            params.step = step.clone();
        }

        params
    }

    /// Whether any explicit context bag was supplied.
    pub fn has_explicit_data(&self) -> bool {
        self.customer_data.is_some()
            || self.shipping_data.is_some()
            || self.billing_data.is_some()
            || self.payment_data.is_some()
            || self.order_data.is_some()
    }

    /// Encode back into query-string pairs, the mirror of [`from_query`].
    pub fn to_query(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::new();
        let bags = [
            ("customerData", &self.customer_data),
            ("shippingData", &self.shipping_data),
            ("billingData", &self.billing_data),
            ("paymentData", &self.payment_data),
            ("orderData", &self.order_data),
        ];
        for (key, value) in bags {
            if let Some(value) = value {
                pairs.push((key.to_string(), encode_param(value)));
            }
        }
        pairs.push(("referrer".into(), self.referrer.to_string()));
        if !self.token.is_empty() {
            pairs.push(("token".into(), self.token.clone()));
        }
        pairs.push(("step".into(), self.step.clone()));
        pairs
    }
}

/// The structured argument handed to the render entrypoint and produced by
/// the hydration reader. Injected into the page as `__INITIAL_DATA__`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BootContext {
    pub locale: Locale,
    pub country: String,
    #[serde(flatten)]
    pub params: DecodedQueryParams,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
    pub timestamp: String,
    /// Shipped with the page so the client avoids a countries fetch.
    pub countries: Vec<Country>,
}

/// Hydration globals shared between the render pipeline and the client
/// reader. Kept in one place so the two halves cannot drift.
pub(crate) const INITIAL_DATA_GLOBAL: &str = "__INITIAL_DATA__";
pub(crate) const PERFORMANCE_CONFIG_GLOBAL: &str = "__PERFORMANCE_CONFIG__";
pub(crate) const RENDER_TIME_GLOBAL: &str = "__RENDER_TIME__";

/// Convenience pair carried through hydration.
#[derive(Debug, Clone)]
pub struct BootGlobals {
    pub initial: BootContext,
    pub performance: PerformanceConfig,
    pub render_time_ms: Option<u64>,
}
