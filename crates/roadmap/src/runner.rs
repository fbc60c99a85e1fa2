//! Task dispatch: one prompt, one key, one bounded call
//!
//! `TaskRunner` is the seam between the orchestrator and the HTTP
//! client, using `Pin<Box<dyn Future>>` returns for dyn-compatibility
//! (`Arc<dyn TaskRunner>`); tests substitute counting or scripted
//! runners. `GeminiRunner` is the production implementation: it records
//! usage against the key before the call, then success or failure after,
//! and never retries — retry policy lives one layer up.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use keypool::{KeyId, KeyPool};
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// One dispatch attempt: run `prompt` on the key slot `key`.
pub trait TaskRunner: Send + Sync {
    fn run<'a>(
        &'a self,
        key: KeyId,
        prompt: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<String>> + Send + 'a>>;
}

/// Production runner wiring the key pool to the generation client.
pub struct GeminiRunner {
    pool: Arc<KeyPool>,
    client: gemini::Client,
}

impl GeminiRunner {
    pub fn new(pool: Arc<KeyPool>, client: gemini::Client) -> Self {
        Self { pool, client }
    }
}

impl TaskRunner for GeminiRunner {
    fn run<'a>(
        &'a self,
        key: KeyId,
        prompt: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<String>> + Send + 'a>> {
        Box::pin(async move {
            let secret = self
                .pool
                .key(key)
                .ok_or_else(|| Error::Internal(format!("selected unknown key slot {key}")))?;

            // Usage counts from the attempt, not the outcome: a timed-out
            // call still consumed quota upstream.
            self.pool.record_usage(key);

            match self.client.generate(&secret, prompt).await {
                Ok(text) => {
                    self.pool.record_success(key);
                    debug!(%key, "dispatch succeeded");
                    Ok(text)
                }
                Err(e) => {
                    self.pool.record_failure(key);
                    warn!(%key, error = %e, "dispatch failed");
                    Err(Error::Generation(e))
                }
            }
        })
    }
}
