//! # veriform-rs
//!
//! A bilingual (es-AR / pt-BR) data-verification microfrontend: a
//! server-rendered form collecting name, country, and address, gated by a
//! CAPTCHA challenge and submitted to a verification endpoint.
//!
//! The crate has two halves. The server half renders the form shell with
//! injected initial state and exposes the JSON API endpoints. The client
//! half is a headless library: explicit state machines for the CAPTCHA
//! lifecycle and form submission, driven through injected capabilities so
//! every seam can be faked in tests.
//!
//! ## Example
//!
//! ```no_run
//! use veriform_rs::Microfrontend;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let html = reqwest::get("http://localhost:3000/AR").await?.text().await?;
//!     let mut app = Microfrontend::builder().hydrate(&html)?;
//!
//!     let form = app.form_mut();
//!     form.set_name("Juan Pérez");
//!     form.set_country("AR");
//!     form.set_address("Av. Corrientes 1234, Buenos Aires");
//!     form.captcha_mut().mount().await?;
//!     form.captcha_mut().execute().await?;
//!     if let Some(output) = form.submit().await {
//!         println!("verified at {}", output.timestamp);
//!     }
//!     Ok(())
//! }
//! ```

mod microfrontend;

pub mod boot;
pub mod captcha;
pub mod config;
pub mod data;
pub mod form;
pub mod i18n;
pub mod output;
pub mod server;

pub use crate::microfrontend::{
    Microfrontend,
    MicrofrontendBuilder,
    MicrofrontendConfig,
    MicrofrontendError,
    MicrofrontendResult,
};

pub use crate::boot::{
    decode_param,
    encode_param,
    read_document,
    BootContext,
    BootContextBuilder,
    DecodedQueryParams,
    HydratedState,
    HydrationError,
};

pub use crate::captcha::{
    CaptchaController,
    CaptchaPhase,
    CaptchaResult,
    CaptchaState,
    ChallengeError,
    ChallengeProvider,
    RecaptchaWidget,
    ScriptedChallenge,
};

pub use crate::config::{AppConfig, AppConfigBuilder, PerformanceConfig, TEST_SITE_KEY};

pub use crate::data::{countries, country_by_code, example_data_for, Country, ExampleData};

pub use crate::form::{
    ApiError,
    ApiResponse,
    Field,
    FieldError,
    FormController,
    ReqwestVerificationApi,
    RuleViolation,
    ServerFieldError,
    SubmissionState,
    SubmitEnvelope,
    SubmitReceipt,
    SubmitRequest,
    VerificationApi,
    VerificationFields,
};

pub use crate::i18n::{
    translate,
    DetectionContext,
    Locale,
    LocaleDetector,
    MemoryPreferenceStore,
    PreferenceError,
    PreferenceStore,
    RedbPreferenceStore,
    DEFAULT_LOCALE,
    SUPPORTED_LOCALES,
};

pub use crate::output::{LogOutputSink, MicrofrontendOutput, OutputSink};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
