//! Challenge provider implementations.
//!
//! The hosted widget bridge used by the render pipeline, plus a fully
//! scripted in-process provider for tests and demos.

mod recaptcha;
mod scripted;

pub use recaptcha::RecaptchaWidget;
pub use scripted::ScriptedChallenge;
