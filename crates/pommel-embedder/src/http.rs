use crate::cache::EmbeddingCache;
use crate::cancel::CancelToken;
use crate::error::{EmbedderError, Result};
use crate::provider::EmbeddingProvider;
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

/// The external embedding services §4.3 names as in-scope providers.
/// Each has its own request/response shape; [`HttpEmbedder`] normalizes
/// them behind one trait implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    Ollama,
    OllamaRemote,
    OpenAi,
    Voyage,
}

impl ProviderKind {
    fn endpoint(self, base_url: &str) -> String {
        match self {
            Self::Ollama | Self::OllamaRemote => format!("{base_url}/api/embed"),
            Self::OpenAi => format!("{base_url}/v1/embeddings"),
            Self::Voyage => format!("{base_url}/v1/embeddings"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct HttpEmbedderConfig {
    pub provider: ProviderKind,
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub dimension: usize,
    pub request_timeout: Duration,
    pub max_retries: u32,
    pub retry_base_delay: Duration,
    pub max_batch_size: usize,
    pub cache_capacity: usize,
}

impl Default for HttpEmbedderConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::Ollama,
            base_url: "http://127.0.0.1:11434".to_string(),
            api_key: None,
            model: "nomic-embed-text".to_string(),
            dimension: 768,
            request_timeout: Duration::from_secs(30),
            max_retries: 3,
            retry_base_delay: Duration::from_millis(250),
            max_batch_size: 64,
            cache_capacity: 4096,
        }
    }
}

/// HTTP client for an external embedding provider (§4.3). Batches
/// requests, dedups identical texts within a batch, retries transient
/// failures with exponential backoff, and caches results by content hash.
pub struct HttpEmbedder {
    client: reqwest::Client,
    config: HttpEmbedderConfig,
    cache: EmbeddingCache,
}

impl HttpEmbedder {
    pub fn new(config: HttpEmbedderConfig) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(config.request_timeout).build()?;
        let cache = EmbeddingCache::new(config.cache_capacity);
        Ok(Self { client, config, cache })
    }

    async fn embed_batch(&self, texts: &[String], cancel: Option<&CancelToken>) -> Result<Vec<Vec<f32>>> {
        let mut results = vec![Vec::new(); texts.len()];
        let mut uncached_indices = Vec::new();
        let mut uncached_texts = Vec::new();

        for (idx, text) in texts.iter().enumerate() {
            if let Some(hit) = self.cache.get(&self.config.model, text) {
                results[idx] = hit;
            } else {
                uncached_indices.push(idx);
                uncached_texts.push(text.clone());
            }
        }

        if uncached_texts.is_empty() {
            return Ok(results);
        }

        // Dedup among the uncached texts themselves so an identical chunk
        // repeated within one batch costs one embedding, not N.
        let mut unique_to_first_idx: HashMap<&str, usize> = HashMap::new();
        let mut unique_texts = Vec::new();
        for text in &uncached_texts {
            if !unique_to_first_idx.contains_key(text.as_str()) {
                unique_to_first_idx.insert(text.as_str(), unique_texts.len());
                unique_texts.push(text.clone());
            }
        }

        for chunk in unique_texts.chunks(self.config.max_batch_size.max(1)) {
            if let Some(cancel) = cancel {
                if cancel.is_cancelled() {
                    return Err(EmbedderError::Cancelled);
                }
            }
            let chunk_vectors = self.request_with_retry(chunk).await?;
            for (text, vector) in chunk.iter().zip(chunk_vectors.into_iter()) {
                self.cache.put(&self.config.model, text, vector.clone());
                let first_idx = unique_to_first_idx[text.as_str()];
                for (local_idx, uncached_text) in uncached_texts.iter().enumerate() {
                    if unique_to_first_idx[uncached_text.as_str()] == first_idx {
                        results[uncached_indices[local_idx]] = vector.clone();
                    }
                }
            }
        }

        Ok(results)
    }

    async fn request_with_retry(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut attempt = 0;
        loop {
            match self.request_once(texts).await {
                Ok(vectors) => return Ok(vectors),
                Err(err) if attempt < self.config.max_retries => {
                    attempt += 1;
                    let delay = self.config.retry_base_delay * 2u32.saturating_pow(attempt - 1);
                    log::warn!("embedding request failed (attempt {attempt}), retrying in {delay:?}: {err}");
                    tokio::time::sleep(delay).await;
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn request_once(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let endpoint = self.config.provider.endpoint(&self.config.base_url);
        let mut request = self.client.post(&endpoint);
        if let Some(key) = &self.config.api_key {
            request = request.bearer_auth(key);
        }

        let body = match self.config.provider {
            ProviderKind::Ollama | ProviderKind::OllamaRemote => {
                serde_json::json!({ "model": self.config.model, "input": texts })
            }
            ProviderKind::OpenAi | ProviderKind::Voyage => {
                serde_json::json!({ "model": self.config.model, "input": texts })
            }
        };

        let response = request.json(&body).send().await?;
        if !response.status().is_success() {
            return Err(EmbedderError::Unavailable(format!(
                "provider returned HTTP {}",
                response.status()
            )));
        }

        match self.config.provider {
            ProviderKind::Ollama | ProviderKind::OllamaRemote => {
                let parsed: OllamaEmbedResponse = response.json().await.map_err(EmbedderError::Request)?;
                Ok(parsed.embeddings)
            }
            ProviderKind::OpenAi | ProviderKind::Voyage => {
                let parsed: OpenAiEmbedResponse = response.json().await.map_err(EmbedderError::Request)?;
                Ok(parsed.data.into_iter().map(|d| d.embedding).collect())
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct OllamaEmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

#[derive(Debug, Deserialize)]
struct OpenAiEmbedResponse {
    data: Vec<OpenAiEmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct OpenAiEmbeddingData {
    embedding: Vec<f32>,
}

#[async_trait]
impl EmbeddingProvider for HttpEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.embed_batch(texts, None).await
    }

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        let vectors = self.embed_batch(std::slice::from_ref(&text.to_string()), None).await?;
        vectors
            .into_iter()
            .next()
            .ok_or_else(|| EmbedderError::BadResponse("empty embedding response for query".to_string()))
    }

    fn dimension(&self) -> usize {
        self.config.dimension
    }

    fn model_id(&self) -> &str {
        &self.config.model
    }

    async fn available(&self) -> bool {
        self.client
            .get(&self.config.base_url)
            .timeout(Duration::from_secs(2))
            .send()
            .await
            .is_ok()
    }
}
