//! Locale detection.
//!
//! Resolves a supported locale from request context in a fixed priority
//! order: explicit query or path parameter, host/referrer domain mapping,
//! `Accept-Language`, persisted client preference, negotiated runtime
//! language, and finally the default. Detection never fails; persistence is
//! a separate, interactive-only side effect.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, RwLock};

use redb::{Database, ReadableTable, TableDefinition};
use thiserror::Error;

use super::Locale;

/// Fallback when nothing in the context resolves.
pub const DEFAULT_LOCALE: Locale = Locale::EsAr;

/// Key under which the interactive locale choice is persisted.
const PREFERENCE_KEY: &str = "locale";

const PREFERENCES: TableDefinition<&str, &str> = TableDefinition::new("preferences");

/// Domain → locale mapping, exact match first, then suffix/substring match.
const DOMAIN_LOCALES: &[(&str, Locale)] = &[
    ("mercadolibre.com.ar", Locale::EsAr),
    ("mercadolivre.com.br", Locale::PtBr),
    ("mercadolibre.com.mx", Locale::EsAr),
    ("mercadolibre.com.co", Locale::EsAr),
    ("mercadolibre.cl", Locale::EsAr),
    ("localhost", Locale::EsAr),
];

/// Errors surfaced by preference stores.
#[derive(Debug, Error)]
pub enum PreferenceError {
    #[error("preference store unavailable: {0}")]
    Storage(String),
}

/// Persisted key-value storage for the interactive locale choice. The
/// client-side analog of browser local storage.
pub trait PreferenceStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> Result<(), PreferenceError>;
}

/// Preference store backed by a redb database file.
pub struct RedbPreferenceStore {
    db: Database,
}

impl RedbPreferenceStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, PreferenceError> {
        let db = Database::create(path).map_err(|err| PreferenceError::Storage(err.to_string()))?;
        Ok(Self { db })
    }
}

impl PreferenceStore for RedbPreferenceStore {
    fn get(&self, key: &str) -> Option<String> {
        let txn = self.db.begin_read().ok()?;
        let table = txn.open_table(PREFERENCES).ok()?;
        table
            .get(key)
            .ok()
            .flatten()
            .map(|value| value.value().to_string())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), PreferenceError> {
        let txn = self
            .db
            .begin_write()
            .map_err(|err| PreferenceError::Storage(err.to_string()))?;
        {
            let mut table = txn
                .open_table(PREFERENCES)
                .map_err(|err| PreferenceError::Storage(err.to_string()))?;
            table
                .insert(key, value)
                .map_err(|err| PreferenceError::Storage(err.to_string()))?;
        }
        txn.commit()
            .map_err(|err| PreferenceError::Storage(err.to_string()))
    }
}

/// In-memory preference store for tests and server-side detection.
#[derive(Default)]
pub struct MemoryPreferenceStore {
    inner: RwLock<HashMap<String, String>>,
}

impl MemoryPreferenceStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PreferenceStore for MemoryPreferenceStore {
    fn get(&self, key: &str) -> Option<String> {
        self.inner.read().ok()?.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), PreferenceError> {
        self.inner
            .write()
            .map_err(|_| PreferenceError::Storage("poisoned lock".into()))?
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Everything the detector may look at for one resolution.
///
/// Server-side callers fill the request-derived fields; client-side callers
/// fill `runtime_language` from the negotiated browser language.
#[derive(Debug, Clone, Default)]
pub struct DetectionContext {
    /// `?locale=` or `?lang=` value, verbatim.
    pub query_locale: Option<String>,
    /// Two-letter country path segment, e.g. `AR` from `/AR`.
    pub path_country: Option<String>,
    pub host: Option<String>,
    pub referrer: Option<String>,
    /// `X-Forwarded-Host` (or `X-Original-Host`) when behind a proxy/CDN.
    pub forwarded_host: Option<String>,
    pub accept_language: Option<String>,
    /// Negotiated browser/runtime language, e.g. `pt-PT`.
    pub runtime_language: Option<String>,
}

impl DetectionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_query_locale(mut self, value: impl Into<String>) -> Self {
        self.query_locale = Some(value.into());
        self
    }

    pub fn with_path_country(mut self, value: impl Into<String>) -> Self {
        self.path_country = Some(value.into());
        self
    }

    pub fn with_host(mut self, value: impl Into<String>) -> Self {
        self.host = Some(value.into());
        self
    }

    pub fn with_referrer(mut self, value: impl Into<String>) -> Self {
        self.referrer = Some(value.into());
        self
    }

    pub fn with_forwarded_host(mut self, value: impl Into<String>) -> Self {
        self.forwarded_host = Some(value.into());
        self
    }

    pub fn with_accept_language(mut self, value: impl Into<String>) -> Self {
        self.accept_language = Some(value.into());
        self
    }

    pub fn with_runtime_language(mut self, value: impl Into<String>) -> Self {
        self.runtime_language = Some(value.into());
        self
    }
}

/// Priority-ordered locale resolution with optional persisted preference.
pub struct LocaleDetector {
    store: Option<Arc<dyn PreferenceStore>>,
}

impl LocaleDetector {
    /// Detector without a preference store (server side).
    pub fn new() -> Self {
        Self { store: None }
    }

    /// Detector that consults and persists a client preference.
    pub fn with_store(store: Arc<dyn PreferenceStore>) -> Self {
        Self { store: Some(store) }
    }

    /// Resolve a locale. Always returns a value and never writes the store.
    pub fn detect(&self, ctx: &DetectionContext) -> Locale {
        if let Some(locale) = ctx.query_locale.as_deref().and_then(Locale::from_tag) {
            log::debug!("locale from query: {locale}");
            return locale;
        }

        if let Some(locale) = ctx.path_country.as_deref().and_then(country_locale) {
            log::debug!("locale from path country: {locale}");
            return locale;
        }

        for candidate in [&ctx.host, &ctx.referrer, &ctx.forwarded_host] {
            if let Some(locale) = candidate.as_deref().and_then(domain_locale) {
                log::debug!("locale from domain: {locale}");
                return locale;
            }
        }

        if let Some(accept) = ctx.accept_language.as_deref() {
            if accept.contains("pt") {
                log::debug!("locale from accept-language: pt-BR");
                return Locale::PtBr;
            }
        }

        if let Some(stored) = self.stored_preference() {
            log::debug!("locale from stored preference: {stored}");
            return stored;
        }

        if let Some(locale) = ctx.runtime_language.as_deref().and_then(language_locale) {
            log::debug!("locale from runtime language: {locale}");
            return locale;
        }

        log::debug!("locale fallback: {DEFAULT_LOCALE}");
        DEFAULT_LOCALE
    }

    /// Persist an interactive locale change. Storage failures are logged and
    /// swallowed; a broken store never breaks the flow.
    pub fn persist(&self, locale: Locale) {
        let Some(store) = &self.store else {
            return;
        };
        if let Err(err) = store.set(PREFERENCE_KEY, locale.as_str()) {
            log::warn!("failed to persist locale preference: {err}");
        }
    }

    fn stored_preference(&self) -> Option<Locale> {
        self.store
            .as_ref()?
            .get(PREFERENCE_KEY)
            .as_deref()
            .and_then(Locale::from_tag)
    }
}

impl Default for LocaleDetector {
    fn default() -> Self {
        Self::new()
    }
}

/// Map a two-letter country code to its locale.
fn country_locale(code: &str) -> Option<Locale> {
    match code.to_ascii_uppercase().as_str() {
        "AR" => Some(Locale::EsAr),
        "BR" => Some(Locale::PtBr),
        _ => None,
    }
}

/// Match a host, referrer, or forwarded host against the domain map.
fn domain_locale(value: &str) -> Option<Locale> {
    let value = value.to_ascii_lowercase();
    let host = value
        .strip_prefix("https://")
        .or_else(|| value.strip_prefix("http://"))
        .unwrap_or(&value);
    let host = host.split(['/', ':']).next().unwrap_or(host);

    for (domain, locale) in DOMAIN_LOCALES {
        if host == *domain || host.ends_with(&format!(".{domain}")) {
            return Some(*locale);
        }
    }
    // Referrers carry full URLs; fall back to a substring match.
    for (domain, locale) in DOMAIN_LOCALES {
        if value.contains(domain) {
            return Some(*locale);
        }
    }
    None
}

/// Map a negotiated language tag to a supported locale.
fn language_locale(tag: &str) -> Option<Locale> {
    match tag {
        "es" | "es-AR" | "es-ES" | "es-MX" => return Some(Locale::EsAr),
        "pt" | "pt-BR" | "pt-PT" => return Some(Locale::PtBr),
        _ => {}
    }
    match tag.split('-').next() {
        Some("es") => Some(Locale::EsAr),
        Some("pt") => Some(Locale::PtBr),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_param_beats_domain() {
        let detector = LocaleDetector::new();
        let ctx = DetectionContext::new()
            .with_query_locale("pt-BR")
            .with_host("www.mercadolibre.com.ar");
        assert_eq!(detector.detect(&ctx), Locale::PtBr);
    }

    #[test]
    fn domain_suffix_matches_subdomains() {
        let detector = LocaleDetector::new();
        let ctx = DetectionContext::new().with_host("envios.mercadolivre.com.br");
        assert_eq!(detector.detect(&ctx), Locale::PtBr);
    }

    #[test]
    fn referrer_url_matches_by_substring() {
        let detector = LocaleDetector::new();
        let ctx = DetectionContext::new()
            .with_referrer("https://www.mercadolivre.com.br/checkout/step-2");
        assert_eq!(detector.detect(&ctx), Locale::PtBr);
    }

    #[test]
    fn accept_language_resolves_portuguese() {
        let detector = LocaleDetector::new();
        let ctx = DetectionContext::new().with_accept_language("pt-BR,pt;q=0.9,en;q=0.5");
        assert_eq!(detector.detect(&ctx), Locale::PtBr);
    }

    #[test]
    fn stored_preference_wins_over_runtime_language() {
        let store = Arc::new(MemoryPreferenceStore::new());
        store.set(PREFERENCE_KEY, "pt-BR").unwrap();
        let detector = LocaleDetector::with_store(store);
        let ctx = DetectionContext::new().with_runtime_language("es-MX");
        assert_eq!(detector.detect(&ctx), Locale::PtBr);
    }

    #[test]
    fn runtime_language_maps_main_language() {
        let detector = LocaleDetector::new();
        let ctx = DetectionContext::new().with_runtime_language("pt-MZ");
        assert_eq!(detector.detect(&ctx), Locale::PtBr);
    }

    #[test]
    fn empty_context_falls_back() {
        let detector = LocaleDetector::new();
        assert_eq!(detector.detect(&DetectionContext::new()), DEFAULT_LOCALE);
    }

    #[test]
    fn detect_never_writes_the_store() {
        let store = Arc::new(MemoryPreferenceStore::new());
        let detector = LocaleDetector::with_store(store.clone());
        detector.detect(&DetectionContext::new().with_query_locale("pt-BR"));
        assert!(store.get(PREFERENCE_KEY).is_none());

        detector.persist(Locale::PtBr);
        assert_eq!(store.get(PREFERENCE_KEY).as_deref(), Some("pt-BR"));
    }

    #[test]
    fn redb_store_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = RedbPreferenceStore::open(dir.path().join("prefs.redb")).unwrap();
        assert!(store.get(PREFERENCE_KEY).is_none());
        store.set(PREFERENCE_KEY, "es-AR").unwrap();
        assert_eq!(store.get(PREFERENCE_KEY).as_deref(), Some("es-AR"));
    }
}
