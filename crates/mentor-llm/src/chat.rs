//! Chat Manager - owns the live provider handle
//!
//! The handle is built by a factory so it can be discarded and recreated
//! (`reset`) without touching callers that hold the manager. Every request
//! passes through the injected [`QuotaTracker`]: an exhausted budget fails the
//! call before it reaches the provider, and provider-side quota errors mark the
//! budget exhausted.

use anyhow::Result;
use mentor_core::{PerformanceMonitor, QuotaTracker};
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::gemini::GeminiClient;
use crate::provider::{is_quota_error, BoxedProvider, ChatMessage, ChatResponse, ProviderType};

/// Builds a fresh provider handle
pub type ProviderFactory = Arc<dyn Fn() -> Result<BoxedProvider> + Send + Sync>;

/// Chat manager - wraps the current provider and its factory
pub struct ChatManager {
    factory: ProviderFactory,
    provider: RwLock<BoxedProvider>,
    resets: AtomicU64,
    quota: Option<Arc<QuotaTracker>>,
    monitor: Option<Arc<PerformanceMonitor>>,
}

impl ChatManager {
    /// Create a manager, building the first handle from the factory
    pub fn new(factory: ProviderFactory) -> Result<Self> {
        let provider = factory()?;
        info!(
            provider = %provider.provider_type(),
            model = %provider.model(),
            "Chat manager initialized"
        );
        Ok(Self {
            factory,
            provider: RwLock::new(provider),
            resets: AtomicU64::new(0),
            quota: None,
            monitor: None,
        })
    }

    /// Manager whose factory always hands back the same provider
    pub fn from_provider(provider: BoxedProvider) -> Self {
        let shared = provider.clone();
        Self {
            factory: Arc::new(move || Ok(shared.clone())),
            provider: RwLock::new(provider),
            resets: AtomicU64::new(0),
            quota: None,
            monitor: None,
        }
    }

    /// Gate every request on a daily quota
    pub fn with_quota(mut self, quota: Arc<QuotaTracker>) -> Self {
        self.quota = Some(quota);
        self
    }

    /// Record request timings as API metrics
    pub fn with_monitor(mut self, monitor: Arc<PerformanceMonitor>) -> Self {
        self.monitor = Some(monitor);
        self
    }

    /// The injected quota tracker, if any
    pub fn quota(&self) -> Option<&Arc<QuotaTracker>> {
        self.quota.as_ref()
    }

    /// Gemini-backed manager built from settings
    pub fn gemini(settings: &mentor_core::Settings) -> Result<Self> {
        // Fail fast on missing credentials before installing the factory
        GeminiClient::from_settings(settings)?;
        let settings = settings.clone();
        Self::new(Arc::new(move || {
            Ok(Arc::new(GeminiClient::from_settings(&settings)?) as BoxedProvider)
        }))
    }

    /// Discard the current handle and build a new one
    pub async fn reset(&self) -> Result<()> {
        let fresh = (self.factory)()?;
        *self.provider.write().await = fresh;
        let count = self.resets.fetch_add(1, Ordering::SeqCst) + 1;
        info!(resets = count, "Language model session reset");
        Ok(())
    }

    /// How many times `reset` succeeded
    pub fn reset_count(&self) -> u64 {
        self.resets.load(Ordering::SeqCst)
    }

    /// Current provider type
    pub async fn provider_type(&self) -> ProviderType {
        self.provider.read().await.provider_type()
    }

    /// Current model id
    pub async fn model(&self) -> String {
        self.provider.read().await.model().to_string()
    }

    async fn current(&self) -> BoxedProvider {
        self.provider.read().await.clone()
    }

    /// Whether the quota allows another request
    pub async fn can_make_request(&self) -> bool {
        match &self.quota {
            Some(quota) => quota.can_make_request().await,
            None => true,
        }
    }

    async fn guarded<T, F>(&self, call: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        if !self.can_make_request().await {
            return Err(anyhow::Error::new(mentor_core::Error::quota(
                "daily language model quota exceeded",
            )));
        }

        let start = Instant::now();
        let result = call.await;

        if let Some(monitor) = &self.monitor {
            let api = self.provider_type().await.to_string();
            monitor.record_api(&api, start.elapsed(), result.is_ok()).await;
        }

        if let Some(quota) = &self.quota {
            match &result {
                Ok(_) => quota.record_request().await,
                Err(e) if is_quota_error(e) => {
                    warn!("Provider rejected request for quota: {}", e);
                    quota.mark_exceeded().await;
                }
                Err(_) => {}
            }
        }

        result
    }

    /// Send a conversation through the current provider
    pub async fn chat(&self, messages: Vec<ChatMessage>) -> Result<ChatResponse> {
        let provider = self.current().await;
        self.guarded(provider.chat(messages)).await
    }

    /// Generate text for a single prompt
    pub async fn generate(&self, prompt: &str) -> Result<String> {
        debug!(prompt_len = prompt.len(), "Generating");
        let provider = self.current().await;
        self.guarded(provider.generate(prompt)).await
    }

    /// Generate text for a prompt plus one inline image
    pub async fn generate_with_image(&self, prompt: &str, mime_type: &str, data_base64: &str) -> Result<String> {
        let provider = self.current().await;
        self.guarded(provider.generate_with_image(prompt, mime_type, data_base64))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::LlmProvider;
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;

    struct Numbered(usize);

    #[async_trait]
    impl LlmProvider for Numbered {
        fn provider_type(&self) -> ProviderType {
            ProviderType::Custom("numbered".to_string())
        }

        fn model(&self) -> &str {
            "test"
        }

        async fn chat(&self, _messages: Vec<ChatMessage>) -> Result<ChatResponse> {
            Ok(ChatResponse {
                message: ChatMessage::assistant(format!("handle {}", self.0)),
                model: "test".to_string(),
                provider: "numbered".to_string(),
                finish_reason: None,
                usage: None,
            })
        }
    }

    #[tokio::test]
    async fn test_reset_rebuilds_handle() {
        let built = Arc::new(AtomicUsize::new(0));
        let counter = built.clone();
        let manager = ChatManager::new(Arc::new(move || {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(Numbered(n)) as BoxedProvider)
        }))
        .unwrap();

        assert_eq!(manager.generate("hi").await.unwrap(), "handle 0");

        manager.reset().await.unwrap();
        assert_eq!(manager.reset_count(), 1);
        assert_eq!(manager.generate("hi").await.unwrap(), "handle 1");
        assert_eq!(built.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_default_image_support_is_an_error() {
        let manager = ChatManager::from_provider(Arc::new(Numbered(7)));
        assert!(manager.generate_with_image("what", "image/png", "AAAA").await.is_err());
        assert_eq!(manager.model().await, "test");
    }

    #[tokio::test]
    async fn test_quota_gate() {
        let quota = Arc::new(QuotaTracker::new(1));
        let manager = ChatManager::from_provider(Arc::new(Numbered(0))).with_quota(quota.clone());

        assert!(manager.generate("first").await.is_ok());
        let err = manager.generate("second").await.unwrap_err();
        assert!(is_quota_error(&err));
        assert_eq!(quota.status().await.requests_made, 1);
    }

    #[test]
    fn test_gemini_requires_key() {
        let settings = mentor_core::Settings::default();
        let Err(err) = ChatManager::gemini(&settings) else {
            panic!("expected missing-key error");
        };
        assert!(matches!(err.downcast_ref::<mentor_core::Error>(), Some(mentor_core::Error::Config(_))));
    }
}
