//! Producer HTTP client
//!
//! Used by the verifier to request predictions from producer nodes
//! (`POST {base}/v1/predict`). Producer ids are their base URLs.

use async_trait::async_trait;
use std::time::Duration;

use super::{build_http_client, check_status, ProducerSource, SourceKind};
use crate::api::types::{PredictRequest, PredictResponse};
use crate::models::errors::{AppError, AppResult};

pub struct ProducerClient {
    client: reqwest::Client,
    /// Sent as X-API-Key when the producer restricts requesters
    api_key: Option<String>,
}

impl ProducerClient {
    pub fn new(timeout: Duration, api_key: Option<String>) -> AppResult<Self> {
        Ok(Self {
            client: build_http_client(timeout)?,
            api_key,
        })
    }

    pub fn predict_url(producer: &str) -> String {
        format!("{}/v1/predict", producer.trim_end_matches('/'))
    }
}

#[async_trait]
impl ProducerSource for ProducerClient {
    async fn predict(
        &self,
        producer: &str,
        request: &PredictRequest,
    ) -> AppResult<PredictResponse> {
        let mut builder = self.client.post(Self::predict_url(producer)).json(request);
        if let Some(key) = &self.api_key {
            builder = builder.header("X-API-Key", key);
        }

        let response = builder.send().await?;
        check_status(SourceKind::Producer, response.status())?;

        response.json::<PredictResponse>().await.map_err(|e| {
            AppError::invalid_response(format!("Malformed prediction from {}: {}", producer, e))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_predict_url() {
        assert_eq!(
            ProducerClient::predict_url("http://10.0.0.5:8080/"),
            "http://10.0.0.5:8080/v1/predict"
        );
    }
}
