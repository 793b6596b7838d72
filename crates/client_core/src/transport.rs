use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use shared::{
    domain::{PredictionRequest, PredictionResult},
    protocol::{
        FeatureNamesResponse, PredictResponse, ServiceStatus, FEATURE_NAMES_PATH, PREDICT_PATH,
        STATUS_PATH,
    },
};
use tracing::debug;

use crate::error::RequestError;

/// Network seam of the prediction service.
#[async_trait]
pub trait PredictionTransport: Send + Sync {
    async fn fetch_feature_names(&self) -> Result<FeatureNamesResponse, RequestError>;
    async fn predict(&self, request: &PredictionRequest)
        -> Result<PredictionResult, RequestError>;
    async fn fetch_service_status(&self) -> Result<ServiceStatus, RequestError>;
}

pub struct HttpTransport {
    http: Client,
    base_url: String,
}

impl HttpTransport {
    /// `base_url` is expected without a trailing slash, as produced by
    /// [`crate::config::normalize_base_url`].
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_client(http: Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}

#[async_trait]
impl PredictionTransport for HttpTransport {
    async fn fetch_feature_names(&self) -> Result<FeatureNamesResponse, RequestError> {
        let response = self.http.get(self.endpoint(FEATURE_NAMES_PATH)).send().await?;
        decode_json(response).await
    }

    async fn predict(
        &self,
        request: &PredictionRequest,
    ) -> Result<PredictionResult, RequestError> {
        debug!(feature_count = request.len(), "predict: posting request");
        let response = self
            .http
            .post(self.endpoint(PREDICT_PATH))
            .json(request)
            .send()
            .await?;
        let body: PredictResponse = decode_json(response).await?;
        PredictionResult::try_from(body).map_err(|err| RequestError::Decode(err.to_string()))
    }

    async fn fetch_service_status(&self) -> Result<ServiceStatus, RequestError> {
        let response = self.http.get(self.endpoint(STATUS_PATH)).send().await?;
        decode_json(response).await
    }
}

async fn decode_json<T: DeserializeOwned>(response: Response) -> Result<T, RequestError> {
    let status = response.status();
    if !status.is_success() {
        // An unreadable error body still leaves the status code to report.
        let body = response.text().await.unwrap_or_default();
        return Err(RequestError::Status {
            status: status.as_u16(),
            body,
        });
    }

    let bytes = response.bytes().await?;
    serde_json::from_slice(&bytes).map_err(|err| RequestError::Decode(err.to_string()))
}
