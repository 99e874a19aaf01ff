//! CAPTCHA integration.
//!
//! The challenge widget is modelled as an injected provider capability so
//! the lifecycle controller stays independent of any concrete vendor and can
//! be driven by a scripted fake in tests. The controller owns the token
//! lifecycle state machine; providers only answer `ready`/`load`/`execute`/
//! `reset`/`render`.

pub mod controller;
pub mod providers;

pub use controller::{CaptchaController, CaptchaPhase, CaptchaState};
pub use providers::{RecaptchaWidget, ScriptedChallenge};

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

/// Common result type for challenge operations.
pub type CaptchaResult<T> = Result<T, ChallengeError>;

/// Shared interface implemented by challenge widgets.
///
/// `execute` resolves with the opaque token certifying a human-interaction
/// event; the token is consumed exactly once by a submission.
#[async_trait]
pub trait ChallengeProvider: Send + Sync {
    fn name(&self) -> &'static str;

    /// Whether the widget is already present and usable.
    fn ready(&self) -> bool;

    /// Load the widget script. Must be a no-op when already [`ready`].
    async fn load(&self) -> CaptchaResult<()>;

    /// Run the challenge and resolve with a token.
    async fn execute(&self) -> CaptchaResult<String>;

    /// Reset the widget's internal challenge. The script stays loaded.
    fn reset(&self);

    /// Markup embedding the widget into a rendered page.
    fn render(&self, site_key: &str) -> String;
}

/// Errors surfaced by challenge providers and the lifecycle controller.
#[derive(Debug, Error)]
pub enum ChallengeError {
    #[error("challenge widget not loaded")]
    NotLoaded,
    #[error("challenge script failed to load: {0}")]
    LoadFailed(String),
    #[error("challenge execution failed: {0}")]
    Execution(String),
    #[error("challenge resolved without a token")]
    NoToken,
    #[error("challenge execution timed out after {0:?}")]
    Timeout(Duration),
    #[error("challenge provider {0} not implemented in this runtime")]
    NotImplemented(&'static str),
}
