//! Health service for the Ark backend.
//!
//! Exposes a lightweight probe: `GET {endpoint}/models` with Bearer auth
//! (best-effort model existence check on the OpenAI-compatible surface).
//!
//! The returned [`HealthStatus`] is JSON-serializable and suitable for a
//! `/health` endpoint. [`HealthService::check`] is resilient and never fails
//! (errors are mapped to `ok=false`). The strict probe (`try_probe_ark`)
//! returns a `Result`.

use std::time::{Duration, Instant};

use reqwest::header;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::config::ark_model_config::ArkModelConfig;
use crate::error_handler::{AiModelError, HealthError, HttpError, make_snippet};

/// A serializable health snapshot for a single profile config.
#[derive(Debug, Clone, Serialize)]
pub struct HealthStatus {
    /// Backend name (always "Ark" for this crate).
    pub provider: String,
    /// Target endpoint base URL.
    pub endpoint: String,
    /// Optional model identifier relevant to the probe (if any).
    pub model: Option<String>,
    /// Overall health flag.
    pub ok: bool,
    /// Measured HTTP latency in milliseconds for the main probe.
    pub latency_ms: u128,
    /// Short human-readable message with details.
    pub message: String,
}

impl HealthStatus {
    #[inline]
    fn ok(
        endpoint: &str,
        model: Option<&str>,
        latency_ms: u128,
        message: impl Into<String>,
    ) -> Self {
        Self {
            provider: "Ark".to_string(),
            endpoint: endpoint.to_string(),
            model: model.map(str::to_string),
            ok: true,
            latency_ms,
            message: message.into(),
        }
    }

    #[inline]
    fn fail(
        endpoint: &str,
        model: Option<&str>,
        latency_ms: u128,
        message: impl Into<String>,
    ) -> Self {
        Self {
            provider: "Ark".to_string(),
            endpoint: endpoint.to_string(),
            model: model.map(str::to_string),
            ok: false,
            latency_ms,
            message: message.into(),
        }
    }
}

/// A health checker that reuses a single HTTP client.
///
/// The client is constructed with a default timeout. Individual probes may
/// override the timeout per request based on the provided config.
#[derive(Debug)]
pub struct HealthService {
    client: reqwest::Client,
    default_timeout: Duration,
}

impl HealthService {
    /// Creates a new health service with an optional client timeout (seconds).
    ///
    /// The internal client is reused across all probes.
    ///
    /// # Errors
    /// Returns [`AiModelError::HttpTransport`] if the HTTP client cannot be built.
    pub fn new(timeout_secs: Option<u64>) -> Result<Self, AiModelError> {
        let timeout = Duration::from_secs(timeout_secs.unwrap_or(10));
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        info!(
            default_timeout_secs = timeout.as_secs(),
            "HealthService initialized"
        );

        Ok(Self {
            client,
            default_timeout: timeout,
        })
    }

    /// Checks health for a single profile config.
    ///
    /// This method is **resilient**: it never returns an error. Any failure is
    /// converted to `HealthStatus { ok: false, message: ... }`, which is
    /// convenient for `/health`.
    pub async fn check(&self, cfg: &ArkModelConfig) -> HealthStatus {
        // Quick endpoint validation to avoid obvious issues.
        let endpoint = cfg.endpoint.trim();
        if endpoint.is_empty()
            || !(endpoint.starts_with("http://") || endpoint.starts_with("https://"))
        {
            warn!(
                endpoint = %cfg.endpoint,
                "invalid endpoint (empty or missing http/https)"
            );
            return HealthStatus::fail(
                endpoint,
                Some(&cfg.model),
                0,
                "endpoint is empty or missing http/https",
            );
        }

        let start = Instant::now();
        match self.try_probe_ark(cfg).await {
            Ok(mut status) => {
                if status.latency_ms == 0 {
                    status.latency_ms = start.elapsed().as_millis();
                }
                info!(
                    endpoint = %status.endpoint,
                    model = %status.model.as_deref().unwrap_or("n/a"),
                    ok = status.ok,
                    latency_ms = status.latency_ms,
                    "health probe completed"
                );
                status
            }
            Err(err) => {
                let status = HealthStatus::fail(
                    &cfg.endpoint,
                    Some(&cfg.model),
                    start.elapsed().as_millis(),
                    err.to_string(),
                );
                warn!(
                    endpoint = %status.endpoint,
                    model = %status.model.as_deref().unwrap_or("n/a"),
                    latency_ms = status.latency_ms,
                    message = %status.message,
                    "health probe failed"
                );
                status
            }
        }
    }

    /// Checks health for multiple configs and returns a vector of statuses.
    ///
    /// This function never returns an error: each failing check is converted
    /// into a `HealthStatus` with `ok = false`.
    pub async fn check_many(&self, configs: &[ArkModelConfig]) -> Vec<HealthStatus> {
        debug!(count = configs.len(), "running batch health probes");
        let mut out = Vec::with_capacity(configs.len());
        for cfg in configs {
            out.push(self.check(cfg).await);
        }
        out
    }

    /// Strict Ark probe. Returns an error on hard failures.
    ///
    /// Probe:
    /// - `GET {endpoint}/models` with `Authorization: Bearer <api_key>`
    /// - Ensure 2xx
    /// - Best-effort: verify `cfg.model` exists in the returned list
    async fn try_probe_ark(&self, cfg: &ArkModelConfig) -> Result<HealthStatus, AiModelError> {
        let base = cfg.endpoint.trim_end_matches('/').to_string();
        let url = format!("{}/models", base);
        let timeout = cfg
            .timeout_secs
            .map(Duration::from_secs)
            .unwrap_or(self.default_timeout);

        let api_key = cfg.api_key.as_ref().ok_or_else(|| {
            AiModelError::Health(HealthError::Decode("missing Ark API key".into()))
        })?;

        let auth_header =
            header::HeaderValue::from_str(&format!("Bearer {}", api_key)).map_err(|e| {
                AiModelError::Health(HealthError::Decode(format!("invalid API key header: {e}")))
            })?;

        let start = Instant::now();
        debug!(
            endpoint = %cfg.endpoint,
            model = %cfg.model,
            "GET {}", url
        );

        let resp = self
            .client
            .get(&url)
            .timeout(timeout)
            .header(header::AUTHORIZATION, auth_header)
            .send()
            .await
            .map_err(AiModelError::from)?;

        let latency = start.elapsed().as_millis();

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            let snippet = make_snippet(&text);

            error!(
                %url,
                %status,
                %snippet,
                latency_ms = latency,
                "health GET /models returned non-success status"
            );

            return Err(AiModelError::Health(HealthError::HttpStatus(HttpError {
                status,
                url,
                snippet,
            })));
        }

        // Expected minimal JSON: { "data": [ { "id": "<model>" }, ... ] }
        #[derive(serde::Deserialize)]
        struct ModelItem {
            id: String,
        }
        #[derive(serde::Deserialize)]
        struct Models {
            data: Vec<ModelItem>,
        }

        match resp.json::<Models>().await {
            Ok(models) => {
                let exists = models.data.iter().any(|m| m.id == cfg.model);
                if exists {
                    Ok(HealthStatus::ok(
                        &cfg.endpoint,
                        Some(&cfg.model),
                        latency,
                        "Ark is healthy; model is available",
                    ))
                } else {
                    Ok(HealthStatus::fail(
                        &cfg.endpoint,
                        Some(&cfg.model),
                        latency,
                        "Ark is up, but model not found in /models",
                    ))
                }
            }
            Err(e) => {
                warn!(
                    endpoint = %cfg.endpoint,
                    model = %cfg.model,
                    error = %e,
                    latency_ms = latency,
                    "failed to decode /models; treating server as reachable"
                );
                Ok(HealthStatus::ok(
                    &cfg.endpoint,
                    Some(&cfg.model),
                    latency,
                    format!("Ark is reachable; failed to decode /models: {e}"),
                ))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn invalid_endpoint_short_circuits() {
        let svc = HealthService::new(Some(1)).unwrap();
        let cfg = ArkModelConfig {
            model: "doubao-embedding-text-240715".into(),
            endpoint: "not-a-url".into(),
            api_key: Some("k".into()),
            max_tokens: None,
            temperature: None,
            top_p: None,
            timeout_secs: None,
        };
        let status = svc.check(&cfg).await;
        assert!(!status.ok);
        assert_eq!(status.provider, "Ark");
        assert!(status.message.contains("http"));
    }

    #[tokio::test]
    async fn missing_api_key_is_reported_not_thrown() {
        let svc = HealthService::new(Some(1)).unwrap();
        let cfg = ArkModelConfig {
            model: "m".into(),
            endpoint: "http://127.0.0.1:9".into(),
            api_key: None,
            max_tokens: None,
            temperature: None,
            top_p: None,
            timeout_secs: Some(1),
        };
        let status = svc.check(&cfg).await;
        assert!(!status.ok);
        assert!(status.message.contains("API key"));
    }
}
