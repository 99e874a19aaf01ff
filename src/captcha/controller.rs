//! CAPTCHA lifecycle controller.
//!
//! Explicit state machine over the widget lifecycle:
//! `Unloaded → Loaded → Verified ⟷ (Expired | Errored)`. The controller is
//! the single owner of [`CaptchaState`]; collaborators read it and call the
//! lifecycle methods, never mutate it directly.

use std::sync::Arc;

use crate::i18n::{translate, Locale};

use super::{CaptchaResult, ChallengeError, ChallengeProvider};

/// Observable widget state. Invariant: `is_verified` implies `token` is
/// present; every expiry or error transition clears both.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CaptchaState {
    pub is_loaded: bool,
    pub is_verified: bool,
    pub token: Option<String>,
    pub error: Option<String>,
}

/// Named lifecycle phase derived from the state flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptchaPhase {
    Unloaded,
    Loaded,
    Verified,
    Errored,
}

impl CaptchaState {
    pub fn phase(&self) -> CaptchaPhase {
        if self.error.is_some() {
            CaptchaPhase::Errored
        } else if self.is_verified {
            CaptchaPhase::Verified
        } else if self.is_loaded {
            CaptchaPhase::Loaded
        } else {
            CaptchaPhase::Unloaded
        }
    }
}

/// Drives one widget instance through its lifecycle.
pub struct CaptchaController {
    provider: Arc<dyn ChallengeProvider>,
    locale: Locale,
    state: CaptchaState,
}

impl CaptchaController {
    pub fn new(provider: Arc<dyn ChallengeProvider>, locale: Locale) -> Self {
        Self {
            provider,
            locale,
            state: CaptchaState::default(),
        }
    }

    pub fn state(&self) -> &CaptchaState {
        &self.state
    }

    pub fn provider(&self) -> &Arc<dyn ChallengeProvider> {
        &self.provider
    }

    pub fn set_locale(&mut self, locale: Locale) {
        self.locale = locale;
    }

    /// Bring the widget to `Loaded`. Idempotent: a provider that is already
    /// ready is not reloaded. Load failures transition to `Errored`.
    pub async fn mount(&mut self) -> CaptchaResult<()> {
        if self.state.is_loaded {
            return Ok(());
        }
        if self.provider.ready() {
            self.state.is_loaded = true;
            return Ok(());
        }
        match self.provider.load().await {
            Ok(()) => {
                self.state.is_loaded = true;
                log::debug!("challenge widget loaded ({})", self.provider.name());
                Ok(())
            }
            Err(err) => {
                self.fail(translate(self.locale, "captcha.errors.loadFailed"));
                Err(err)
            }
        }
    }

    /// Widget success callback: store the token and mark verified.
    pub fn on_success(&mut self, token: impl Into<String>) {
        self.state.is_verified = true;
        self.state.token = Some(token.into());
        self.state.error = None;
    }

    /// Widget expiry callback: drop the token, keep any prior error.
    pub fn on_expired(&mut self) {
        self.state.is_verified = false;
        self.state.token = None;
    }

    /// Widget error callback: translated message, token cleared.
    pub fn on_error(&mut self, message: Option<String>) {
        let message = message
            .unwrap_or_else(|| translate(self.locale, "captcha.errors.verificationFailed").into());
        self.fail(message);
    }

    /// Manually run the challenge. Fails fast when the widget has not
    /// loaded; never hangs waiting for an absent widget.
    pub async fn execute(&mut self) -> CaptchaResult<String> {
        if !self.state.is_loaded {
            return Err(ChallengeError::NotLoaded);
        }

        match self.provider.execute().await {
            Ok(token) if !token.is_empty() => {
                self.on_success(token.clone());
                Ok(token)
            }
            Ok(_) => {
                self.fail(translate(self.locale, "captcha.errors.noToken"));
                Err(ChallengeError::NoToken)
            }
            Err(err) => {
                log::warn!("challenge execution failed: {err}");
                self.fail(translate(self.locale, "captcha.errors.executionFailed"));
                Err(err)
            }
        }
    }

    /// Reset widget and local state back to `Loaded`. The script stays
    /// loaded; only the challenge outcome is discarded.
    pub fn reset(&mut self) {
        self.provider.reset();
        self.state.is_verified = false;
        self.state.token = None;
        self.state.error = None;
    }

    fn fail(&mut self, message: impl Into<String>) {
        self.state.is_verified = false;
        self.state.token = None;
        self.state.error = Some(message.into());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::captcha::ScriptedChallenge;

    fn controller(provider: ScriptedChallenge) -> CaptchaController {
        CaptchaController::new(Arc::new(provider), Locale::EsAr)
    }

    #[tokio::test]
    async fn mount_is_idempotent_for_ready_providers() {
        let provider = ScriptedChallenge::ready_with_token("tok123");
        let mut captcha = controller(provider);

        captcha.mount().await.unwrap();
        captcha.mount().await.unwrap();

        assert!(captcha.state().is_loaded);
        assert_eq!(
            captcha.provider().name(),
            "scripted",
        );
        assert_eq!(captcha.state().phase(), CaptchaPhase::Loaded);
    }

    #[tokio::test]
    async fn load_failure_transitions_to_errored() {
        let provider = ScriptedChallenge::failing_to_load("network down");
        let mut captcha = controller(provider);

        assert!(captcha.mount().await.is_err());
        let state = captcha.state();
        assert!(!state.is_loaded);
        assert_eq!(state.phase(), CaptchaPhase::Errored);
        assert_eq!(
            state.error.as_deref(),
            Some(translate(Locale::EsAr, "captcha.errors.loadFailed"))
        );
    }

    #[test]
    fn success_sets_token_and_clears_error() {
        let mut captcha = controller(ScriptedChallenge::ready_with_token("x"));
        captcha.on_error(Some("previous".into()));
        captcha.on_success("tok123");

        let state = captcha.state();
        assert!(state.is_verified);
        assert_eq!(state.token.as_deref(), Some("tok123"));
        assert!(state.error.is_none());
    }

    #[test]
    fn expiry_clears_token_and_keeps_error_untouched() {
        let mut captcha = controller(ScriptedChallenge::ready_with_token("x"));
        captcha.on_success("tok123");
        captcha.on_expired();

        let state = captcha.state();
        assert!(!state.is_verified);
        assert!(state.token.is_none());
        assert!(state.error.is_none());

        // Expiry after an error leaves the error in place.
        captcha.on_error(None);
        captcha.on_expired();
        assert!(captcha.state().error.is_some());
    }

    #[test]
    fn error_clears_token_and_records_translated_message() {
        let mut captcha = controller(ScriptedChallenge::ready_with_token("x"));
        captcha.on_success("tok123");
        captcha.on_error(None);

        let state = captcha.state();
        assert!(!state.is_verified);
        assert!(state.token.is_none());
        assert_eq!(
            state.error.as_deref(),
            Some(translate(Locale::EsAr, "captcha.errors.verificationFailed"))
        );
    }

    #[tokio::test]
    async fn execute_before_mount_fails_fast() {
        let mut captcha = controller(ScriptedChallenge::ready_with_token("tok123"));
        let err = captcha.execute().await.unwrap_err();
        assert!(matches!(err, ChallengeError::NotLoaded));
        assert!(captcha.state().token.is_none());
    }

    #[tokio::test]
    async fn execute_verifies_and_stores_token() {
        let mut captcha = controller(ScriptedChallenge::ready_with_token("tok123"));
        captcha.mount().await.unwrap();

        let token = captcha.execute().await.unwrap();
        assert_eq!(token, "tok123");
        assert_eq!(captcha.state().phase(), CaptchaPhase::Verified);
    }

    #[tokio::test]
    async fn execute_failure_records_translated_error() {
        let provider = ScriptedChallenge::ready_failing_execution("solver offline");
        let mut captcha = controller(provider);
        captcha.mount().await.unwrap();

        assert!(captcha.execute().await.is_err());
        assert_eq!(
            captcha.state().error.as_deref(),
            Some(translate(Locale::EsAr, "captcha.errors.executionFailed"))
        );
    }

    #[tokio::test]
    async fn reset_returns_to_loaded_not_unloaded() {
        let provider = ScriptedChallenge::ready_with_token("tok123");
        let reset_count = provider.reset_count();
        let mut captcha = controller(provider);
        captcha.mount().await.unwrap();
        captcha.execute().await.unwrap();

        captcha.reset();

        let state = captcha.state();
        assert!(state.is_loaded);
        assert!(!state.is_verified);
        assert!(state.token.is_none());
        assert!(state.error.is_none());
        assert_eq!(state.phase(), CaptchaPhase::Loaded);
        assert_eq!(reset_count.load(std::sync::atomic::Ordering::SeqCst), 1);
    }
}
