//! Embedding drivers for the semantic tier.
//!
//! [`OpenAIEmbeddingDriver`] speaks the `/v1/embeddings` protocol, which
//! OpenAI and Ollama both serve; any other provider name is taken as the host
//! of a compatible endpoint. [`create_embedding_driver`] picks a driver from
//! configuration, and [`UnavailableEmbeddingDriver`] stands in when that
//! fails so callers can keep serving exact-tier hits.

use crate::local::HashEmbeddingDriver;
use async_trait::async_trait;
use murmur_types::embedding::{EmbeddingDriver, EmbeddingError};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use zeroize::Zeroizing;

pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const OLLAMA_BASE_URL: &str = "http://localhost:11434/v1";

/// Configuration for creating an embedding driver.
#[derive(Debug, Clone)]
pub struct EmbeddingConfig {
    /// Provider name (`openai`, `ollama`, or a compatible host).
    pub provider: String,
    /// Model name (e.g., "text-embedding-3-small", "all-MiniLM-L6-v2").
    pub model: String,
    /// API key (resolved from env var).
    pub api_key: String,
    /// Base URL for the API.
    pub base_url: String,
}

/// OpenAI-compatible embedding driver.
pub struct OpenAIEmbeddingDriver {
    api_key: Zeroizing<String>,
    base_url: String,
    model: String,
    client: reqwest::Client,
    dims: usize,
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [&'a str],
}

#[derive(Deserialize)]
struct EmbedResponse {
    data: Vec<EmbedData>,
}

#[derive(Deserialize)]
struct EmbedData {
    embedding: Vec<f32>,
}

impl OpenAIEmbeddingDriver {
    /// Create a new OpenAI-compatible embedding driver.
    pub fn new(config: EmbeddingConfig) -> Result<Self, EmbeddingError> {
        let dims = infer_dimensions(&config.model);

        Ok(Self {
            api_key: Zeroizing::new(config.api_key),
            base_url: config.base_url,
            model: config.model,
            client: reqwest::Client::new(),
            dims,
        })
    }
}

/// Dimensions of the models Murmur is usually pointed at. Unknown models are
/// assumed to be OpenAI-sized.
fn infer_dimensions(model: &str) -> usize {
    match model {
        "text-embedding-3-large" => 3072,
        "all-MiniLM-L6-v2" => 384,
        "nomic-embed-text" => 768,
        _ => 1536,
    }
}

/// Remote endpoint for a provider name.
fn remote_base_url(provider: &str) -> String {
    match provider {
        "openai" => OPENAI_BASE_URL.to_string(),
        "ollama" => OLLAMA_BASE_URL.to_string(),
        host => {
            warn!("Unknown embedding provider '{host}', treating it as an OpenAI-compatible host");
            format!("https://{host}/v1")
        }
    }
}

#[async_trait]
impl EmbeddingDriver for OpenAIEmbeddingDriver {
    async fn embed(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        let url = format!("{}/embeddings", self.base_url);
        let body = EmbedRequest {
            model: &self.model,
            input: texts,
        };

        let mut req = self.client.post(&url).json(&body);
        if !self.api_key.as_str().is_empty() {
            req = req.header("Authorization", format!("Bearer {}", self.api_key.as_str()));
        }

        let resp = req
            .send()
            .await
            .map_err(|e| EmbeddingError::Http(e.to_string()))?;
        let status = resp.status().as_u16();

        if status != 200 {
            let body_text = resp.text().await.unwrap_or_default();
            return Err(EmbeddingError::Api {
                status,
                message: body_text,
            });
        }

        let data: EmbedResponse = resp
            .json()
            .await
            .map_err(|e| EmbeddingError::Parse(e.to_string()))?;

        let embeddings: Vec<Vec<f32>> = data.data.into_iter().map(|d| d.embedding).collect();
        if embeddings.len() != texts.len() {
            return Err(EmbeddingError::Parse(format!(
                "expected {} embeddings, got {}",
                texts.len(),
                embeddings.len()
            )));
        }

        debug!(
            "Embedded {} texts (dims={})",
            embeddings.len(),
            embeddings.first().map(|e| e.len()).unwrap_or(0)
        );

        Ok(embeddings)
    }

    fn dimensions(&self) -> usize {
        self.dims
    }
}

/// Create an embedding driver from config.
///
/// `local` selects the offline hashing driver; anything else is treated as
/// an OpenAI-compatible endpoint.
pub fn create_embedding_driver(
    provider: &str,
    model: &str,
    api_key_env: &str,
) -> Result<Box<dyn EmbeddingDriver + Send + Sync>, EmbeddingError> {
    if provider == "local" {
        return Ok(Box::new(HashEmbeddingDriver::from_model_name(model)));
    }

    let api_key = if api_key_env.is_empty() {
        String::new()
    } else {
        std::env::var(api_key_env).unwrap_or_default()
    };

    let base_url = remote_base_url(provider);

    let is_local = base_url.contains("localhost")
        || base_url.contains("127.0.0.1")
        || base_url.contains("[::1]");
    if !is_local && api_key.is_empty() {
        return Err(EmbeddingError::MissingApiKey(if api_key_env.is_empty() {
            format!("no api_key_env configured for provider '{provider}'")
        } else {
            api_key_env.to_string()
        }));
    }
    if !is_local {
        warn!(
            provider = %provider,
            base_url = %base_url,
            "Embedding driver configured to send data to external API, mention text will leave this machine"
        );
    }

    let config = EmbeddingConfig {
        provider: provider.to_string(),
        model: model.to_string(),
        api_key,
        base_url,
    };

    let driver = OpenAIEmbeddingDriver::new(config)?;
    Ok(Box::new(driver))
}

/// Driver used when the configured one could not be built.
///
/// Every call fails with [`EmbeddingError::Unavailable`], which the tiered
/// cache treats as a semantic miss or a skipped vector write.
#[derive(Debug, Clone)]
pub struct UnavailableEmbeddingDriver {
    reason: String,
}

impl UnavailableEmbeddingDriver {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl EmbeddingDriver for UnavailableEmbeddingDriver {
    async fn embed(&self, _texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        Err(EmbeddingError::Unavailable(self.reason.clone()))
    }

    fn dimensions(&self) -> usize {
        0
    }
}

/// Like [`create_embedding_driver`], but never fails: a driver that cannot be
/// built is logged and replaced with an [`UnavailableEmbeddingDriver`].
pub fn create_embedding_driver_or_unavailable(
    provider: &str,
    model: &str,
    api_key_env: &str,
) -> Box<dyn EmbeddingDriver + Send + Sync> {
    match create_embedding_driver(provider, model, api_key_env) {
        Ok(driver) => driver,
        Err(e) => {
            warn!(
                provider = %provider,
                error = %e,
                "Embedding driver unavailable, semantic tier disabled"
            );
            Box::new(UnavailableEmbeddingDriver::new(e.to_string()))
        }
    }
}
