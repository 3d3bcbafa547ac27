//! Mock text generator for testing
//!
//! Deterministic, network-free [`TextGenerator`] that records how often it
//! was called, so cache and coalescing behavior can be asserted.
//!
//! # Example
//!
//! ```ignore
//! let mock = Arc::new(MockGenerator::new(MockMode::Reply("Bonjour".into())));
//! let translator = Translator::new(mock.clone());
//! assert_eq!(translator.translate("Hello", "French").await?, "Bonjour");
//! assert_eq!(mock.calls(), 1);
//! ```

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::core::errors::{ProviderError, ProviderResult};
use crate::core::provider::TextGenerator;

/// What the mock answers with
#[derive(Debug, Clone)]
pub enum MockMode {
    /// Always return this text
    Reply(String),

    /// Return the prompt itself, so every distinct request gets a distinct answer
    Echo,

    /// Always fail with this error
    Error(ProviderError),

    /// Panic inside the call, like a provider client bug would
    Panic,
}

/// Mock generator
#[derive(Debug)]
pub struct MockGenerator {
    mode: MockMode,
    /// Simulated latency per call
    delay: Duration,
    calls: AtomicUsize,
    last_prompt: Mutex<Option<String>>,
}

impl MockGenerator {
    pub fn new(mode: MockMode) -> Self {
        Self {
            mode,
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
            last_prompt: Mutex::new(None),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Number of `generate` calls so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.last_prompt
            .lock()
            .ok()
            .and_then(|prompt| prompt.clone())
    }
}

#[async_trait]
impl TextGenerator for MockGenerator {
    async fn generate(&self, prompt: &str) -> ProviderResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut last) = self.last_prompt.lock() {
            *last = Some(prompt.to_string());
        }

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        match &self.mode {
            MockMode::Reply(text) => Ok(text.clone()),
            MockMode::Echo => Ok(prompt.to_string()),
            MockMode::Error(err) => Err(err.clone()),
            MockMode::Panic => panic!("mock generator panicked"),
        }
    }
}
