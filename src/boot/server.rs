//! Server-side boot context assembly.
//!
//! Builds the [`BootContext`] for one request: explicit query parameters win,
//! otherwise the per-country example data seeds the context bags. A missing
//! session token gets a generated demo token so the embedding contract is
//! always satisfied.

use std::collections::HashMap;

use chrono::Utc;
use rand::Rng;

use crate::data;
use crate::i18n::Locale;

use super::{BootContext, DecodedQueryParams};

/// Fluent assembly of a request's [`BootContext`].
pub struct BootContextBuilder {
    locale: Locale,
    country: String,
    query: HashMap<String, String>,
    user_agent: Option<String>,
    ip: Option<String>,
}

impl BootContextBuilder {
    pub fn new(locale: Locale, country: impl Into<String>) -> Self {
        Self {
            locale,
            country: country.into(),
            query: HashMap::new(),
            user_agent: None,
            ip: None,
        }
    }

    pub fn with_query(mut self, query: HashMap<String, String>) -> Self {
        self.query = query;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    pub fn with_ip(mut self, ip: impl Into<String>) -> Self {
        self.ip = Some(ip.into());
        self
    }

    pub fn build(self) -> BootContext {
        let mut params = DecodedQueryParams::from_query(&self.query);

        // Explicit context wins; otherwise seed from the example dataset so
        // the form always has realistic surroundings to render.
        if !params.has_explicit_data() {
            if let Some(example) = data::example_data_for(&self.country) {
                params.customer_data = Some(example.customer_data);
                params.shipping_data = Some(example.shipping_data);
                params.billing_data = Some(example.billing_data);
                params.payment_data = Some(example.payment_data);
                params.order_data = Some(example.order_data);
            }
        }

        if params.token.is_empty() {
            params.token = demo_token();
        }

        BootContext {
            locale: self.locale,
            country: self.country,
            params,
            user_agent: self.user_agent,
            ip: self.ip,
            timestamp: Utc::now().to_rfc3339(),
            countries: data::countries().to_vec(),
        }
    }
}

fn demo_token() -> String {
    let suffix: u32 = rand::thread_rng().gen_range(100_000..1_000_000);
    format!("demo_token_{}_{suffix}", Utc::now().timestamp_millis())
}
