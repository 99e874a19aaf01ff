//! High level client-half orchestration.
//!
//! Wires together the hydration reader, locale detection, the CAPTCHA
//! controller, and the form controller behind a single builder, so an
//! embedder configures capabilities (challenge provider, verification API,
//! output sink, preference store) once and drives the flow through one
//! handle.

use std::sync::Arc;

use thiserror::Error;
use url::Url;

use crate::boot::{read_document, BootGlobals, DecodedQueryParams, HydrationError};
use crate::captcha::{CaptchaController, ChallengeError, ChallengeProvider, ScriptedChallenge};
use crate::form::{ApiError, FormController, ReqwestVerificationApi, VerificationApi};
use crate::i18n::{
    DetectionContext, Locale, LocaleDetector, PreferenceStore, DEFAULT_LOCALE,
};
use crate::output::{LogOutputSink, OutputSink};

/// Result alias used across the orchestration layer.
pub type MicrofrontendResult<T> = Result<T, MicrofrontendError>;

/// High-level error surfaced by the orchestrator.
#[derive(Debug, Error)]
pub enum MicrofrontendError {
    #[error("hydration failed: {0}")]
    Hydration(#[from] HydrationError),
    #[error("challenge error: {0}")]
    Challenge(#[from] ChallengeError),
    #[error("verification api error: {0}")]
    Api(#[from] ApiError),
    #[error("invalid endpoint url: {0}")]
    Url(#[from] url::ParseError),
}

/// Capability set for one microfrontend instance.
pub struct MicrofrontendConfig {
    pub submit_endpoint: String,
    pub provider: Option<Arc<dyn ChallengeProvider>>,
    pub api: Option<Arc<dyn VerificationApi>>,
    pub sink: Arc<dyn OutputSink>,
    pub store: Option<Arc<dyn PreferenceStore>>,
}

impl Default for MicrofrontendConfig {
    fn default() -> Self {
        Self {
            submit_endpoint: "http://localhost:3000/api/verification/submit".into(),
            provider: None,
            api: None,
            sink: Arc::new(LogOutputSink),
            store: None,
        }
    }
}

/// Fluent builder for [`Microfrontend`].
pub struct MicrofrontendBuilder {
    config: MicrofrontendConfig,
}

impl MicrofrontendBuilder {
    pub fn new() -> Self {
        Self {
            config: MicrofrontendConfig::default(),
        }
    }

    pub fn with_submit_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.config.submit_endpoint = endpoint.into();
        self
    }

    pub fn with_provider(mut self, provider: Arc<dyn ChallengeProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn with_api(mut self, api: Arc<dyn VerificationApi>) -> Self {
        self.config.api = Some(api);
        self
    }

    pub fn with_sink(mut self, sink: Arc<dyn OutputSink>) -> Self {
        self.config.sink = sink;
        self
    }

    pub fn with_preference_store(mut self, store: Arc<dyn PreferenceStore>) -> Self {
        self.config.store = Some(store);
        self
    }

    /// Hydrate against a server-rendered document, producing a ready
    /// microfrontend wired to the injected state.
    pub fn hydrate(self, html: &str) -> MicrofrontendResult<Microfrontend> {
        let globals = read_document(html)?;
        Microfrontend::from_globals(self.config, globals)
    }

    /// Build without a server-rendered document, using defaults. Useful for
    /// embedding outside the SSR flow.
    pub fn build(self) -> MicrofrontendResult<Microfrontend> {
        let config = self.config;
        let globals = BootGlobals {
            initial: crate::boot::BootContext {
                locale: DEFAULT_LOCALE,
                country: DEFAULT_LOCALE.country_code().to_string(),
                params: DecodedQueryParams::default(),
                user_agent: None,
                ip: None,
                timestamp: chrono::Utc::now().to_rfc3339(),
                countries: crate::data::countries().to_vec(),
            },
            performance: crate::config::PerformanceConfig::default(),
            render_time_ms: None,
        };
        Microfrontend::from_globals(config, globals)
    }
}

impl Default for MicrofrontendBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// One hydrated microfrontend instance.
pub struct Microfrontend {
    locale: Locale,
    detector: LocaleDetector,
    form: FormController,
    render_time_ms: Option<u64>,
}

impl Microfrontend {
    /// Obtain a builder to customise the instance.
    pub fn builder() -> MicrofrontendBuilder {
        MicrofrontendBuilder::new()
    }

    fn from_globals(
        config: MicrofrontendConfig,
        globals: BootGlobals,
    ) -> MicrofrontendResult<Self> {
        let detector = match &config.store {
            Some(store) => LocaleDetector::with_store(store.clone()),
            None => LocaleDetector::new(),
        };

        // The injected locale wins over whatever the runtime would detect,
        // so the first interactive paint matches the server-rendered page.
        let injected = globals.initial.locale;
        let active = detector.detect(&DetectionContext::new());
        if active != injected {
            log::debug!("switching locale {active} -> {injected} before first paint");
        }
        let locale = injected;

        let provider = config
            .provider
            .unwrap_or_else(|| Arc::new(ScriptedChallenge::loading_with_token("demo-token")));
        let api: Arc<dyn VerificationApi> = match config.api {
            Some(api) => api,
            None => {
                let endpoint = Url::parse(&config.submit_endpoint)?;
                Arc::new(ReqwestVerificationApi::new(endpoint)?)
            }
        };

        let captcha = CaptchaController::new(provider, locale);
        let mut form = FormController::new(
            locale,
            globals.initial.params,
            captcha,
            api,
            config.sink,
            globals.performance.form_submit_timeout(),
        );
        form.prefill_from_context();

        if let Some(ms) = globals.render_time_ms {
            log::debug!("server render took {ms}ms");
        }

        Ok(Self {
            locale,
            detector,
            form,
            render_time_ms: globals.render_time_ms,
        })
    }

    pub fn locale(&self) -> Locale {
        self.locale
    }

    pub fn render_time_ms(&self) -> Option<u64> {
        self.render_time_ms
    }

    pub fn form(&self) -> &FormController {
        &self.form
    }

    pub fn form_mut(&mut self) -> &mut FormController {
        &mut self.form
    }

    /// Interactive locale change: switches the controllers and persists the
    /// preference.
    pub fn switch_locale(&mut self, locale: Locale) {
        if locale == self.locale {
            return;
        }
        self.locale = locale;
        self.form.set_locale(locale);
        self.detector.persist(locale);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boot::BootContextBuilder;
    use crate::config::PerformanceConfig;
    use crate::i18n::MemoryPreferenceStore;
    use crate::server::render::render_page;
    use std::time::Instant;

    fn rendered_page(locale: Locale, country: &str) -> String {
        let boot = BootContextBuilder::new(locale, country).build();
        render_page(&boot, &PerformanceConfig::default(), "<div></div>", Instant::now()).unwrap()
    }

    #[test]
    fn hydrates_locale_and_prefilled_context_from_document() {
        let html = rendered_page(Locale::PtBr, "BR");
        let app = Microfrontend::builder()
            .with_api(Arc::new(NoopApi))
            .hydrate(&html)
            .unwrap();

        assert_eq!(app.locale(), Locale::PtBr);
        assert!(app.render_time_ms().is_some());
        // Example data seeded by the server flows into form defaults.
        assert_eq!(app.form().fields().name, "Maria Silva");
        assert_eq!(app.form().fields().country, "BR");
    }

    #[test]
    fn builds_without_a_document_using_defaults() {
        let app = Microfrontend::builder()
            .with_api(Arc::new(NoopApi))
            .build()
            .unwrap();
        assert_eq!(app.locale(), Locale::EsAr);
        assert!(app.render_time_ms().is_none());
        assert!(app.form().fields().name.is_empty());
    }

    #[test]
    fn hydration_failure_is_reported_not_panicked() {
        let result = Microfrontend::builder()
            .with_api(Arc::new(NoopApi))
            .hydrate("<html><body>blank</body></html>");
        assert!(matches!(
            result,
            Err(MicrofrontendError::Hydration(HydrationError::MissingGlobal(_)))
        ));
    }

    #[test]
    fn interactive_switch_persists_preference() {
        let store = Arc::new(MemoryPreferenceStore::new());
        let html = rendered_page(Locale::EsAr, "AR");
        let mut app = Microfrontend::builder()
            .with_api(Arc::new(NoopApi))
            .with_preference_store(store.clone())
            .hydrate(&html)
            .unwrap();

        assert!(store.get("locale").is_none());
        app.switch_locale(Locale::PtBr);
        assert_eq!(store.get("locale").as_deref(), Some("pt-BR"));
        assert_eq!(app.locale(), Locale::PtBr);
    }

    struct NoopApi;

    #[async_trait::async_trait]
    impl VerificationApi for NoopApi {
        async fn submit(
            &self,
            _request: &crate::form::SubmitRequest,
        ) -> Result<crate::form::ApiResponse, ApiError> {
            Err(ApiError::Malformed("noop".into()))
        }
    }
}
