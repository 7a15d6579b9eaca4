//! HTTP client for the training ingestion service.
//!
//! The trainer consumes applied corrections as training samples. Each sample
//! is submitted individually; a rejected or unreachable submission is
//! reported back to the caller so the annotation can be retried later.

use crate::error::{DomainErrorKind, Error, ExternalErrorKind, InternalErrorKind};
use chrono::{DateTime, FixedOffset};
use entity::Id;
use log::*;
use serde::Serialize;
use std::time::Duration;

/// One applied correction in the shape the trainer ingests.
#[derive(Debug, Serialize)]
pub struct TrainingSample {
    pub annotation_id: Id,
    pub conversation_id: Id,
    pub kind: String,
    pub payload: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub applied_at: Option<DateTime<FixedOffset>>,
}

/// Trainer API client
pub struct TrainerClient {
    client: reqwest::Client,
    base_url: String,
}

impl TrainerClient {
    /// Create a new trainer client. The API key is optional for local
    /// deployments that run the trainer unauthenticated.
    pub fn new(base_url: &str, api_key: Option<&str>, timeout: Duration) -> Result<Self, Error> {
        let mut headers = reqwest::header::HeaderMap::new();

        if let Some(api_key) = api_key {
            let mut header_value =
                reqwest::header::HeaderValue::from_str(api_key).map_err(|e| {
                    warn!("Failed to create auth header: {:?}", e);
                    Error {
                        source: Some(Box::new(e)),
                        error_kind: DomainErrorKind::Internal(InternalErrorKind::Other(
                            "Invalid API key format".to_string(),
                        )),
                    }
                })?;
            header_value.set_sensitive(true);
            headers.insert("authorization", header_value);
        }

        let client = reqwest::Client::builder()
            .use_rustls_tls()
            .default_headers(headers)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Submit one training sample. Success is any 2xx response.
    pub async fn submit_sample(&self, sample: &TrainingSample) -> Result<(), Error> {
        let url = format!("{}/v1/training/samples", self.base_url);

        debug!(
            "Submitting {} sample for annotation {}",
            sample.kind, sample.annotation_id
        );

        let response = self
            .client
            .post(&url)
            .json(sample)
            .send()
            .await
            .map_err(|e| {
                warn!("Failed to reach trainer: {:?}", e);
                Error {
                    source: Some(Box::new(e)),
                    error_kind: DomainErrorKind::External(ExternalErrorKind::Network),
                }
            })?;

        if response.status().is_success() {
            Ok(())
        } else {
            let error_text = response.text().await.unwrap_or_default();
            error!("Trainer rejected sample: {}", error_text);
            Err(Error {
                source: None,
                error_kind: DomainErrorKind::External(ExternalErrorKind::Other(error_text)),
            })
        }
    }

    /// Verify the trainer is reachable and the key, if any, is accepted.
    pub async fn health(&self) -> Result<bool, Error> {
        let url = format!("{}/v1/health", self.base_url);

        let response = self.client.get(&url).send().await.map_err(|e| {
            warn!("Trainer health check failed: {:?}", e);
            Error {
                source: Some(Box::new(e)),
                error_kind: DomainErrorKind::External(ExternalErrorKind::Network),
            }
        })?;

        Ok(response.status().is_success())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn sample() -> TrainingSample {
        TrainingSample {
            annotation_id: Uuid::new_v4(),
            conversation_id: Uuid::new_v4(),
            kind: "diarization".to_string(),
            payload: serde_json::json!({
                "type": "diarization",
                "segment_index": 0,
                "original_speaker": "Speaker 1",
                "corrected_speaker": "Alice",
                "segment_start_time": 12.5,
            }),
            applied_at: None,
        }
    }

    #[tokio::test]
    async fn submit_sample_succeeds_on_accepted() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/training/samples")
            .with_status(202)
            .create_async()
            .await;

        let client = TrainerClient::new(&server.url(), None, Duration::from_secs(5))
            .expect("client should build");
        let result = client.submit_sample(&sample()).await;

        assert!(result.is_ok());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn submit_sample_sends_sensitive_auth_header() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/training/samples")
            .match_header("authorization", "secret-key")
            .with_status(200)
            .create_async()
            .await;

        let client = TrainerClient::new(&server.url(), Some("secret-key"), Duration::from_secs(5))
            .expect("client should build");
        let result = client.submit_sample(&sample()).await;

        assert!(result.is_ok());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn submit_sample_surfaces_rejection() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v1/training/samples")
            .with_status(500)
            .with_body("trainer exploded")
            .create_async()
            .await;

        let client = TrainerClient::new(&server.url(), None, Duration::from_secs(5))
            .expect("client should build");
        let result = client.submit_sample(&sample()).await;

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn health_reflects_status() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/v1/health")
            .with_status(200)
            .create_async()
            .await;

        let client = TrainerClient::new(&server.url(), None, Duration::from_secs(5))
            .expect("client should build");
        assert!(client.health().await.expect("health call should succeed"));
    }
}
