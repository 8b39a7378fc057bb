//! Volcengine Ark service for chat completion, image recognition, and embeddings.
//!
//! Minimal, non-streaming client around the Ark REST API (OpenAI-compatible
//! surface). Endpoints are derived from `ArkModelConfig::endpoint`:
//! - POST {endpoint}/chat/completions — chat completion (text or image+text)
//! - POST {endpoint}/embeddings       — embeddings retrieval
//!
//! Constructor validation:
//! - `cfg.api_key` must be present
//! - `cfg.endpoint` must start with http:// or https://
//!
//! Errors are normalized via unified error types in `error_handler`.

use std::time::{Duration, Instant};

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use reqwest::header;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::{
    config::ark_model_config::ArkModelConfig,
    error_handler::{AiModelError, HttpError, ProviderError, make_snippet},
};

/// Thin client for the Ark API.
///
/// Constructed from a complete [`ArkModelConfig`]. Internally keeps a
/// preconfigured `reqwest::Client` (with timeout and default headers).
///
/// High-level operations:
/// - [`ArkService::generate`]        — single, non-streaming chat completion
/// - [`ArkService::recognize_image`] — chat completion over an inline image
/// - [`ArkService::embeddings`]      — single embeddings vector retrieval
#[derive(Debug)]
pub struct ArkService {
    client: reqwest::Client,
    cfg: ArkModelConfig,
    url_chat: String,
    url_embeddings: String,
}

impl ArkService {
    /// Creates a new [`ArkService`] from the given config.
    ///
    /// Validates the API key and endpoint scheme. Builds an HTTP client with
    /// default headers and a configurable timeout.
    ///
    /// # Errors
    /// - [`AiModelError::Provider`] with `MissingApiKey` if `cfg.api_key` is `None`
    /// - [`AiModelError::Provider`] with `InvalidEndpoint` if `cfg.endpoint` is invalid
    /// - [`AiModelError::HttpTransport`] if the HTTP client cannot be built
    pub fn new(cfg: ArkModelConfig) -> Result<Self, AiModelError> {
        // 1) API key must be present.
        let api_key = cfg
            .api_key
            .clone()
            .ok_or(ProviderError::MissingApiKey)?;

        // 2) Endpoint must use http/https.
        let endpoint = cfg.endpoint.trim();
        if endpoint.is_empty()
            || !(endpoint.starts_with("http://") || endpoint.starts_with("https://"))
        {
            return Err(ProviderError::InvalidEndpoint(cfg.endpoint.clone()).into());
        }

        // 3) HTTP client: timeout + default headers.
        let timeout = cfg
            .timeout_secs
            .map(Duration::from_secs)
            .unwrap_or_else(|| Duration::from_secs(60));

        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            header::HeaderValue::from_str(&format!("Bearer {}", api_key)).map_err(|e| {
                ProviderError::Decode(format!("invalid API key header: {e}"))
            })?,
        );
        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()?;

        let base = endpoint.trim_end_matches('/').to_string();
        let url_chat = format!("{}/chat/completions", base);
        let url_embeddings = format!("{}/embeddings", base);

        info!(
            model = %cfg.model,
            endpoint = %cfg.endpoint,
            timeout_secs = cfg.timeout_secs.unwrap_or(60),
            "ArkService initialized"
        );

        Ok(Self {
            client,
            cfg,
            url_chat,
            url_embeddings,
        })
    }

    /// Performs a **non-streaming** chat completion request (`/chat/completions`).
    ///
    /// Minimal `messages` array:
    /// - optional system message (if provided)
    /// - user message with `prompt`.
    ///
    /// Mapped options from config: `model`, `temperature`, `top_p`, `max_tokens`.
    ///
    /// # Errors
    /// - [`AiModelError::Provider`] with `HttpStatus` for non-2xx responses
    /// - [`AiModelError::HttpTransport`] for client/network failures
    /// - [`AiModelError::Provider`] with `Decode` if the JSON cannot be parsed
    /// - [`AiModelError::Provider`] with `EmptyChoices` if no choices are returned
    pub async fn generate(&self, prompt: &str, system: Option<&str>) -> Result<String, AiModelError> {
        let mut messages = Vec::with_capacity(2);
        if let Some(sys) = system {
            messages.push(ChatMessage {
                role: "system",
                content: MessageContent::Text(sys.to_string()),
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: MessageContent::Text(prompt.to_string()),
        });

        debug!(
            model = %self.cfg.model,
            prompt_len = prompt.len(),
            has_system = system.is_some(),
            "POST {}", self.url_chat
        );

        self.chat(messages).await
    }

    /// Recognizes an image by sending it inline as a base64 data URL together
    /// with a textual instruction, mirroring the Ark vision message shape:
    /// one user message with an `image_url` part followed by a `text` part.
    ///
    /// `mime` is the image MIME type (e.g., `image/png`).
    ///
    /// # Errors
    /// Same surface as [`ArkService::generate`].
    pub async fn recognize_image(
        &self,
        image: &[u8],
        mime: &str,
        instruction: &str,
    ) -> Result<String, AiModelError> {
        let data_url = format!("data:{};base64,{}", mime, BASE64.encode(image));

        let messages = vec![ChatMessage {
            role: "user",
            content: MessageContent::Parts(vec![
                ContentPart::ImageUrl {
                    image_url: ImageUrl { url: data_url },
                },
                ContentPart::Text {
                    text: instruction.to_string(),
                },
            ]),
        }];

        debug!(
            model = %self.cfg.model,
            image_bytes = image.len(),
            %mime,
            "POST {} (vision)", self.url_chat
        );

        self.chat(messages).await
    }

    /// Retrieves a single embeddings vector via `/embeddings`.
    ///
    /// The input is wrapped in a single-element array and the response is
    /// requested as raw floats (`encoding_format: "float"`).
    ///
    /// # Errors
    /// - [`AiModelError::Provider`] with `HttpStatus` for non-2xx responses
    /// - [`AiModelError::HttpTransport`] for client/network failures
    /// - [`AiModelError::Provider`] with `Decode` if the JSON cannot be parsed
    /// - [`AiModelError::Provider`] with `EmptyEmbedding` if `data` is empty
    pub async fn embeddings(&self, input: &str) -> Result<Vec<f32>, AiModelError> {
        let started = Instant::now();
        let body = EmbeddingsRequest {
            model: &self.cfg.model,
            input: [input],
            encoding_format: "float",
        };

        debug!(
            model = %self.cfg.model,
            input_len = input.len(),
            "POST {}", self.url_embeddings
        );

        let resp = self
            .client
            .post(&self.url_embeddings)
            .json(&body)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let url = self.url_embeddings.clone();
            let text = resp.text().await.unwrap_or_default();
            let snippet = make_snippet(&text);

            error!(
                %status,
                %url,
                %snippet,
                model = %self.cfg.model,
                latency_ms = started.elapsed().as_millis(),
                "Ark /embeddings returned non-success status"
            );

            return Err(ProviderError::HttpStatus(HttpError {
                status,
                url,
                snippet,
            })
            .into());
        }

        let out: EmbeddingsResponse = match resp.json().await {
            Ok(v) => v,
            Err(e) => {
                error!(
                    error = %e,
                    model = %self.cfg.model,
                    latency_ms = started.elapsed().as_millis(),
                    "failed to decode /embeddings response"
                );
                return Err(ProviderError::Decode(format!(
                    "serde error: {e}; expected `data[0].embedding`"
                ))
                .into());
            }
        };

        let first = out
            .data
            .into_iter()
            .next()
            .ok_or(ProviderError::EmptyEmbedding)?;

        info!(
            model = %self.cfg.model,
            dim = first.embedding.len(),
            latency_ms = started.elapsed().as_millis(),
            "embeddings completed"
        );

        Ok(first.embedding)
    }

    /// Shared chat completion POST used by both text and vision payloads.
    async fn chat(&self, messages: Vec<ChatMessage>) -> Result<String, AiModelError> {
        let started = Instant::now();
        let body = ChatCompletionRequest {
            model: &self.cfg.model,
            messages,
            temperature: self.cfg.temperature,
            top_p: self.cfg.top_p,
            max_tokens: self.cfg.max_tokens,
        };

        let resp = self.client.post(&self.url_chat).json(&body).send().await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let url = self.url_chat.clone();
            let text = resp.text().await.unwrap_or_default();
            let snippet = make_snippet(&text);

            error!(
                %status,
                %url,
                %snippet,
                model = %self.cfg.model,
                latency_ms = started.elapsed().as_millis(),
                "Ark /chat/completions returned non-success status"
            );

            return Err(ProviderError::HttpStatus(HttpError {
                status,
                url,
                snippet,
            })
            .into());
        }

        let out: ChatCompletionResponse = match resp.json().await {
            Ok(v) => v,
            Err(e) => {
                error!(
                    error = %e,
                    model = %self.cfg.model,
                    latency_ms = started.elapsed().as_millis(),
                    "failed to decode /chat/completions response"
                );
                return Err(ProviderError::Decode(format!(
                    "serde error: {e}; expected `choices[0].message.content`"
                ))
                .into());
            }
        };

        let content = out
            .choices
            .into_iter()
            .find_map(|c| c.message.content)
            .ok_or(ProviderError::EmptyChoices)?;

        info!(
            model = %self.cfg.model,
            latency_ms = started.elapsed().as_millis(),
            "chat completion completed"
        );

        Ok(content)
    }
}

/* ===========================================================================
HTTP payloads & options
======================================================================== */

/// Minimal request body for `/chat/completions` (non-streaming).
#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

/// Chat message for the Ark API.
#[derive(Debug, Serialize)]
struct ChatMessage {
    /// One of: "system" | "user" | "assistant".
    role: &'static str,
    content: MessageContent,
}

/// Either a plain string or an array of typed parts (vision payloads).
#[derive(Debug, Serialize)]
#[serde(untagged)]
enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

/// Typed content part for multimodal messages.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart {
    ImageUrl { image_url: ImageUrl },
    Text { text: String },
}

#[derive(Debug, Serialize)]
struct ImageUrl {
    url: String,
}

/// Minimal response for `/chat/completions`.
#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessageOut,
}

#[derive(Debug, Deserialize)]
struct ChatMessageOut {
    content: Option<String>,
}

/// Request body for `/embeddings`.
#[derive(Debug, Serialize)]
struct EmbeddingsRequest<'a> {
    model: &'a str,
    input: [&'a str; 1],
    encoding_format: &'a str,
}

/// Response body for `/embeddings`.
#[derive(Debug, Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingItem>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingItem {
    embedding: Vec<f32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> ArkModelConfig {
        ArkModelConfig {
            model: "doubao-seed-1-6-vision-250815".into(),
            endpoint: "https://ark.cn-beijing.volces.com/api/v3".into(),
            api_key: Some("test-key".into()),
            max_tokens: Some(1024),
            temperature: Some(0.2),
            top_p: None,
            timeout_secs: Some(5),
        }
    }

    #[test]
    fn constructor_requires_api_key() {
        let mut c = cfg();
        c.api_key = None;
        assert!(matches!(
            ArkService::new(c),
            Err(AiModelError::Provider(ProviderError::MissingApiKey))
        ));
    }

    #[test]
    fn constructor_rejects_bad_endpoint() {
        let mut c = cfg();
        c.endpoint = "ftp://ark".into();
        assert!(matches!(
            ArkService::new(c),
            Err(AiModelError::Provider(ProviderError::InvalidEndpoint(_)))
        ));
    }

    #[test]
    fn urls_are_derived_from_endpoint() {
        let mut c = cfg();
        c.endpoint = "https://ark.cn-beijing.volces.com/api/v3/".into();
        let svc = ArkService::new(c).unwrap();
        assert_eq!(
            svc.url_chat,
            "https://ark.cn-beijing.volces.com/api/v3/chat/completions"
        );
        assert_eq!(
            svc.url_embeddings,
            "https://ark.cn-beijing.volces.com/api/v3/embeddings"
        );
    }

    #[test]
    fn vision_message_serializes_as_typed_parts() {
        let msg = ChatMessage {
            role: "user",
            content: MessageContent::Parts(vec![
                ContentPart::ImageUrl {
                    image_url: ImageUrl {
                        url: "data:image/png;base64,AAAA".into(),
                    },
                },
                ContentPart::Text {
                    text: "识别题目".into(),
                },
            ]),
        };
        let v = serde_json::to_value(&msg).unwrap();
        assert_eq!(v["role"], "user");
        assert_eq!(v["content"][0]["type"], "image_url");
        assert_eq!(v["content"][0]["image_url"]["url"], "data:image/png;base64,AAAA");
        assert_eq!(v["content"][1]["type"], "text");
        assert_eq!(v["content"][1]["text"], "识别题目");
    }

    #[test]
    fn plain_message_serializes_as_string_content() {
        let msg = ChatMessage {
            role: "user",
            content: MessageContent::Text("solve it".into()),
        };
        let v = serde_json::to_value(&msg).unwrap();
        assert_eq!(v["content"], "solve it");
    }

    #[test]
    fn embeddings_request_wraps_input_in_array() {
        let body = EmbeddingsRequest {
            model: "doubao-embedding-text-240715",
            input: ["向量"],
            encoding_format: "float",
        };
        let v = serde_json::to_value(&body).unwrap();
        assert_eq!(v["input"], serde_json::json!(["向量"]));
        assert_eq!(v["encoding_format"], "float");
    }

    #[test]
    fn optional_sampling_fields_are_omitted() {
        let body = ChatCompletionRequest {
            model: "m",
            messages: vec![],
            temperature: None,
            top_p: None,
            max_tokens: None,
        };
        let v = serde_json::to_value(&body).unwrap();
        assert!(v.get("temperature").is_none());
        assert!(v.get("top_p").is_none());
        assert!(v.get("max_tokens").is_none());
    }
}
