use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};

use super::provider::{Embedder, Generator};
use super::types::{ChatRequest, LlmError};

/// Client for servers speaking the OpenAI REST dialect
/// (llama.cpp server, LM Studio, vLLM, TGI, OpenAI).
///
/// One instance is bound to one model; the service builds one for the
/// embedder and one for the generator.
#[derive(Clone)]
pub struct OpenAiCompatProvider {
    base_url: String,
    model: String,
    client: Client,
}

impl OpenAiCompatProvider {
    pub fn new(
        base_url: &str,
        model: &str,
        api_key: Option<&str>,
        timeout: Duration,
    ) -> Result<Self, LlmError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(key) = api_key.map(str::trim).filter(|key| !key.is_empty()) {
            let auth = format!("Bearer {}", key);
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&auth)
                    .map_err(|_| LlmError::Config("API key is not a valid header value".into()))?,
            );
        }

        let client = Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .map_err(|err| LlmError::Config(err.to_string()))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            client,
        })
    }

    async fn post_json(&self, path: &str, body: &Value) -> Result<Value, LlmError> {
        let endpoint = format!("{}/{}", self.base_url, path);
        let res = self
            .client
            .post(&endpoint)
            .json(body)
            .send()
            .await
            .map_err(|source| LlmError::Transport {
                endpoint: endpoint.clone(),
                source,
            })?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(LlmError::Status {
                endpoint,
                status,
                body,
            });
        }

        res.json::<Value>()
            .await
            .map_err(|source| LlmError::Transport { endpoint, source })
    }
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    #[serde(default)]
    index: usize,
}

#[async_trait]
impl Embedder for OpenAiCompatProvider {
    fn model(&self) -> &str {
        &self.model
    }

    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, LlmError> {
        if inputs.is_empty() {
            return Ok(Vec::new());
        }

        let body = json!({
            "model": self.model,
            "input": inputs,
        });
        let payload = self.post_json("embeddings", &body).await?;

        let invalid = |reason: String| LlmError::InvalidResponse {
            endpoint: format!("{}/embeddings", self.base_url),
            reason,
        };
        let mut parsed: EmbeddingResponse =
            serde_json::from_value(payload).map_err(|err| invalid(err.to_string()))?;
        parsed.data.sort_by_key(|entry| entry.index);
        if parsed.data.len() != inputs.len() {
            return Err(invalid(format!(
                "{} embeddings for {} inputs",
                parsed.data.len(),
                inputs.len()
            )));
        }

        Ok(parsed.data.into_iter().map(|entry| entry.embedding).collect())
    }
}

#[async_trait]
impl Generator for OpenAiCompatProvider {
    fn model(&self) -> &str {
        &self.model
    }

    async fn generate(&self, request: ChatRequest) -> Result<String, LlmError> {
        let mut body = json!({
            "model": self.model,
            "messages": request.messages,
            "stream": false,
        });

        if let Some(obj) = body.as_object_mut() {
            if let Some(t) = request.temperature { obj.insert("temperature".to_string(), json!(t)); }
            if let Some(t) = request.max_tokens { obj.insert("max_tokens".to_string(), json!(t)); }
        }

        let payload = self.post_json("chat/completions", &body).await?;

        payload["choices"][0]["message"]["content"]
            .as_str()
            .map(|content| content.trim().to_string())
            .ok_or_else(|| LlmError::InvalidResponse {
                endpoint: format!("{}/chat/completions", self.base_url),
                reason: "missing choices[0].message.content".to_string(),
            })
    }
}
