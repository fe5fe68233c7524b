//! API client for the price prediction service

use anyhow::{Context, Result};
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::collections::HashMap;
use url::Url;

/// API client for the pricing server
pub struct ApiClient {
    client: Client,
    base_url: Url,
}

impl ApiClient {
    /// Create a new API client
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        let base_url = Url::parse(base_url).context("Invalid API URL")?;

        Ok(Self { client, base_url })
    }

    /// Make a GET request.
    ///
    /// Health endpoints answer 503 with a regular body, so any status whose
    /// body parses is accepted.
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.base_url.join(path).context("Invalid path")?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to send request")?;

        let status = response.status();
        let body = response.text().await.context("Failed to read response")?;
        serde_json::from_str(&body).with_context(|| format!("API error ({}): {}", status, body))
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

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| match e.details {
                    Some(details) => format!("{}: {}", e.error, details),
                    None => e.error,
                })
                .unwrap_or(body);
            anyhow::bail!("API error ({}): {}", status, message);
        }

        response.json().await.context("Failed to parse response")
    }

    pub async fn predict(&self, request: &PredictRequest) -> Result<PredictResponse> {
        self.post("predict", request).await
    }

    pub async fn health(&self) -> Result<HealthStatus> {
        self.get("healthz").await
    }
}

// API request and response types

/// Body of `POST /predict`; unset optional fields are left to the server defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictRequest {
    pub yom: i32,
    pub mileage: f64,
    pub engine: f64,
    pub brand: String,
    pub model: String,
    pub gear: String,
    pub fuel: String,
    pub condition: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub town: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aircon: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ps: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pm: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pw: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub leasing: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year_listed: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub month_listed: Option<i32>,
}

impl PredictRequest {
    /// Request with only the required fields set
    #[allow(clippy::too_many_arguments)]
    pub fn basic(
        yom: i32,
        mileage: f64,
        engine: f64,
        brand: &str,
        model: &str,
        gear: &str,
        fuel: &str,
        condition: &str,
    ) -> Self {
        Self {
            yom,
            mileage,
            engine,
            brand: brand.to_string(),
            model: model.to_string(),
            gear: gear.to_string(),
            fuel: fuel.to_string(),
            condition: condition.to_string(),
            town: None,
            aircon: None,
            ps: None,
            pm: None,
            pw: None,
            leasing: None,
            year_listed: None,
            month_listed: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PredictResponse {
    #[serde(rename = "Predicted Price")]
    pub predicted_price: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub components: HashMap<String, ComponentStatus>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentStatus {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub last_check_timestamp: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}
