//! Hosted reCAPTCHA widget bridge.
//!
//! The actual challenge runs in the visitor's browser; on this side the
//! bridge contributes the widget markup and script tag for the render
//! pipeline. Execution is therefore not available in this runtime; the
//! token arrives with the form submission instead.

use async_trait::async_trait;

use crate::captcha::{CaptchaResult, ChallengeError, ChallengeProvider};

const SCRIPT_URL: &str = "https://www.google.com/recaptcha/api.js";

/// Bridge to the hosted widget.
#[derive(Debug, Clone, Default)]
pub struct RecaptchaWidget;

impl RecaptchaWidget {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ChallengeProvider for RecaptchaWidget {
    fn name(&self) -> &'static str {
        "recaptcha"
    }

    fn ready(&self) -> bool {
        // The script tag is emitted with the page; the widget is considered
        // present as soon as the document is.
        true
    }

    async fn load(&self) -> CaptchaResult<()> {
        Ok(())
    }

    async fn execute(&self) -> CaptchaResult<String> {
        Err(ChallengeError::NotImplemented(self.name()))
    }

    fn reset(&self) {}

    fn render(&self, site_key: &str) -> String {
        format!(
            "<div class=\"g-recaptcha\" data-sitekey=\"{site_key}\"></div>\n\
             <script src=\"{SCRIPT_URL}\" async defer></script>"
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_embeds_site_key_and_script() {
        let markup = RecaptchaWidget::new().render("6LeKey");
        assert!(markup.contains("data-sitekey=\"6LeKey\""));
        assert!(markup.contains(SCRIPT_URL));
    }

    #[tokio::test]
    async fn execute_is_a_placeholder_in_this_runtime() {
        let widget = RecaptchaWidget::new();
        assert!(matches!(
            widget.execute().await,
            Err(ChallengeError::NotImplemented("recaptcha"))
        ));
    }
}
