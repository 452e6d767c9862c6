//! Mock synthesis backend for testing
//!
//! Records every request in the order it starts, writes a small payload to
//! the output path, and can be told to fail selected requests.

use async_trait::async_trait;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::backend::{SynthesisBackend, SynthesisRequest};
use crate::error::{Result, TtsError};

/// Bytes written for every successful request
pub const MOCK_PAYLOAD: &[u8] = b"ID3mock-audio";

type FailurePredicate = Box<dyn Fn(&SynthesisRequest) -> bool + Send + Sync>;

/// A mock backend that never leaves the process
pub struct MockBackend {
    /// Requests in the order synthesis started
    requests: Mutex<Vec<SynthesisRequest>>,
    /// Number of requests that finished writing their payload
    completed: AtomicUsize,
    /// Requests matching this fail immediately
    fail_when: Option<FailurePredicate>,
    /// Message carried by injected failures
    failure_message: String,
}

impl MockBackend {
    /// Create a backend that succeeds for every request
    pub fn always_succeeds() -> Self {
        Self {
            requests: Mutex::new(Vec::new()),
            completed: AtomicUsize::new(0),
            fail_when: None,
            failure_message: String::new(),
        }
    }

    /// Create a backend that fails every request with the given message
    pub fn always_fails(message: &str) -> Self {
        Self::fails_when(|_| true, message)
    }

    /// Create a backend that fails requests whose text contains `needle`
    pub fn fails_on_text(needle: &str, message: &str) -> Self {
        let needle = needle.to_string();
        Self::fails_when(move |request| request.text.contains(&needle), message)
    }

    /// Create a backend that fails requests matching `predicate`
    pub fn fails_when<F>(predicate: F, message: &str) -> Self
    where
        F: Fn(&SynthesisRequest) -> bool + Send + Sync + 'static,
    {
        Self {
            requests: Mutex::new(Vec::new()),
            completed: AtomicUsize::new(0),
            fail_when: Some(Box::new(predicate)),
            failure_message: message.to_string(),
        }
    }

    /// Requests received so far, in the order they started
    pub fn requests(&self) -> Vec<SynthesisRequest> {
        self.requests
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }

    /// Number of synthesize() calls
    pub fn call_count(&self) -> usize {
        self.requests.lock().map(|guard| guard.len()).unwrap_or(0)
    }

    /// Number of requests that wrote their payload
    pub fn completed_count(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SynthesisBackend for MockBackend {
    async fn synthesize(&self, request: &SynthesisRequest) -> Result<()> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }

        if self.fail_when.as_ref().is_some_and(|f| f(request)) {
            return Err(TtsError::BackendFailed {
                backend: self.name().to_string(),
                message: self.failure_message.clone(),
            });
        }

        // Suspend once so sibling requests interleave like real network calls
        tokio::task::yield_now().await;

        tokio::fs::write(&request.output_path, MOCK_PAYLOAD).await?;
        self.completed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}
