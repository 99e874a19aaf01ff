//! Scripted challenge provider.
//!
//! Deterministic in-process stand-in for the hosted widget: load behaviour,
//! execution outcomes, and readiness are all configured up front, and reset
//! calls are counted so tests can assert on widget interaction.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::captcha::{CaptchaResult, ChallengeError, ChallengeProvider};

enum LoadBehaviour {
    Succeed,
    Fail(String),
}

/// Configurable fake widget.
pub struct ScriptedChallenge {
    ready: AtomicBool,
    load: LoadBehaviour,
    outcomes: Mutex<VecDeque<Result<String, String>>>,
    resets: Arc<AtomicUsize>,
}

impl ScriptedChallenge {
    /// Widget already present at mount, yielding `token` on every execution.
    pub fn ready_with_token(token: impl Into<String>) -> Self {
        let token = token.into();
        Self {
            ready: AtomicBool::new(true),
            load: LoadBehaviour::Succeed,
            outcomes: Mutex::new(VecDeque::from([Ok(token.clone()), Ok(token)])),
            resets: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Widget that must be loaded first, then yields `token`.
    pub fn loading_with_token(token: impl Into<String>) -> Self {
        let mut provider = Self::ready_with_token(token);
        provider.ready = AtomicBool::new(false);
        provider
    }

    /// Script load fails with `message`.
    pub fn failing_to_load(message: impl Into<String>) -> Self {
        Self {
            ready: AtomicBool::new(false),
            load: LoadBehaviour::Fail(message.into()),
            outcomes: Mutex::new(VecDeque::new()),
            resets: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Widget ready, but every execution fails with `message`.
    pub fn ready_failing_execution(message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            ready: AtomicBool::new(true),
            load: LoadBehaviour::Succeed,
            outcomes: Mutex::new(VecDeque::from([
                Err(message.clone()),
                Err(message),
            ])),
            resets: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Shared reset counter, for asserting widget interaction.
    pub fn reset_count(&self) -> Arc<AtomicUsize> {
        self.resets.clone()
    }

    /// Queue an additional execution outcome.
    pub fn push_outcome(&self, outcome: Result<String, String>) {
        if let Ok(mut outcomes) = self.outcomes.lock() {
            outcomes.push_back(outcome);
        }
    }
}

#[async_trait]
impl ChallengeProvider for ScriptedChallenge {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    async fn load(&self) -> CaptchaResult<()> {
        match &self.load {
            LoadBehaviour::Succeed => {
                self.ready.store(true, Ordering::SeqCst);
                Ok(())
            }
            LoadBehaviour::Fail(message) => Err(ChallengeError::LoadFailed(message.clone())),
        }
    }

    async fn execute(&self) -> CaptchaResult<String> {
        let outcome = self
            .outcomes
            .lock()
            .ok()
            .and_then(|mut outcomes| outcomes.pop_front());
        match outcome {
            Some(Ok(token)) => Ok(token),
            Some(Err(message)) => Err(ChallengeError::Execution(message)),
            None => Err(ChallengeError::NoToken),
        }
    }

    fn reset(&self) {
        self.resets.fetch_add(1, Ordering::SeqCst);
    }

    fn render(&self, site_key: &str) -> String {
        format!("<div class=\"challenge-stub\" data-sitekey=\"{site_key}\"></div>")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn outcomes_drain_in_order() {
        let provider = ScriptedChallenge::loading_with_token("a");
        assert!(!provider.ready());
        provider.load().await.unwrap();
        assert!(provider.ready());

        provider.push_outcome(Err("drained".into()));
        assert_eq!(provider.execute().await.unwrap(), "a");
        assert_eq!(provider.execute().await.unwrap(), "a");
        assert!(matches!(
            provider.execute().await,
            Err(ChallengeError::Execution(_))
        ));
        assert!(matches!(provider.execute().await, Err(ChallengeError::NoToken)));
    }
}
