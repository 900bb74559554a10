//! API client for communicating with the forecast service

use anyhow::{Context, Result};
use glucose_core::{ErrorResponse, HealthResponse, PredictionRequest, PredictionResponse};
use reqwest::{Client, Response};
use serde::{de::DeserializeOwned, Serialize};
use url::Url;

/// Forecast requests are short; anything slower is treated as a failure
const REQUEST_TIMEOUT_SECS: u64 = 5;

/// API client for the forecast service
pub struct ApiClient {
    client: Client,
    base_url: Url,
}

impl ApiClient {
    /// Create a new API client
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .context("Failed to create HTTP client")?;

        let base_url = Url::parse(base_url).context("Invalid API URL")?;

        Ok(Self { client, base_url })
    }

    /// `GET /health`
    pub async fn health(&self) -> Result<HealthResponse> {
        self.get("health").await
    }

    /// `POST /predict`, checking that a forecast came back
    pub async fn predict(&self, request: &PredictionRequest) -> Result<PredictionResponse> {
        let response: PredictionResponse = self.post("predict", request).await?;
        if response.prediction.is_empty() {
            anyhow::bail!("Invalid prediction response from API: empty prediction");
        }
        Ok(response)
    }

    /// Make a GET request
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.base_url.join(path).context("Invalid path")?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to send request")?;

        Self::parse(response).await
    }

    /// Make a POST request with JSON body
    pub async fn post<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> Result<T> {
        let url = self.base_url.join(path).context("Invalid path")?;

        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .context("Failed to send request")?;

        Self::parse(response).await
    }

    async fn parse<T: DeserializeOwned>(response: Response) -> Result<T> {
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.error)
                .unwrap_or(body);
            anyhow::bail!("API error ({}): {}", status, message);
        }

        response.json().await.context("Failed to parse response")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> PredictionRequest {
        PredictionRequest {
            x_seq: vec![120.0; 36],
            x_static: vec![30.0, 1.0, 0.0, 5.5, 2.0],
            user_id: "u1".into(),
        }
    }

    #[tokio::test]
    async fn test_predict_parses_response() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/predict")
            .match_header("content-type", "application/json")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"user_id":"u1","prediction":[1,2,3,4,5,6],"timestamp":1700000000.5,
                   "input_summary":{"sequence_mean":120.0,"sequence_std":0.0,
                   "sequence_min":120.0,"sequence_max":120.0,"processing_time_ms":1.25}}"#,
            )
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let response = client.predict(&request()).await.unwrap();

        mock.assert_async().await;
        assert_eq!(response.user_id, "u1");
        assert_eq!(response.prediction.len(), 6);
        assert_eq!(response.input_summary.unwrap().processing_time_ms, 1.25);
    }

    #[tokio::test]
    async fn test_predict_surfaces_server_message() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/predict")
            .with_status(400)
            .with_header("content-type", "application/json")
            .with_body(r#"{"error":"x_seq must contain exactly 36 values, got 35","code":"invalid_shape"}"#)
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let err = client.predict(&request()).await.unwrap_err().to_string();

        assert!(err.contains("400"));
        assert!(err.contains("exactly 36 values"));
    }

    #[tokio::test]
    async fn test_predict_rejects_empty_prediction() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/predict")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"user_id":"u1","prediction":[],"timestamp":1.0}"#)
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        assert!(client.predict(&request()).await.is_err());
    }

    #[tokio::test]
    async fn test_health_parses_error_status() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/health")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"status":"error","version":"1.0.0","timestamp":1700000000.0}"#)
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let health = client.health().await.unwrap();

        assert!(!health.status.is_ok());
        assert_eq!(health.version, "1.0.0");
    }

    #[test]
    fn test_invalid_url_rejected() {
        assert!(ApiClient::new("not a url").is_err());
    }
}
