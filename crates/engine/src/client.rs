//! REST client for the engine HTTP API.
//!
//! [`EngineApi`] is the seam between a worker handle and its remote
//! engine; [`HttpEngineClient`] is the production implementation on top
//! of [`reqwest`].

use std::time::Duration;

use async_trait::async_trait;
use mlsk_core::endpoint::Endpoint;
use mlsk_core::models::admin::EngineDetail;
use mlsk_core::models::classifier::{
    ClassifierCancelRequest, ClassifierDataRequest, ClassifierRequest, ClassifierResponse,
    ClassifierStartRequest,
};
use mlsk_core::models::time_series::{TimeSeries, TimeSeriesAnalysisRequest};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Errors from a call to an engine. Never retried by this layer.
#[derive(Debug, thiserror::Error)]
pub enum EngineRequestError {
    /// The engine answered with a non-2xx status.
    #[error("Failed on call {action} to engine: {body}")]
    ApiError {
        action: &'static str,
        status: u16,
        /// Raw response body, usually the engine's error message.
        body: String,
    },

    /// The HTTP request itself failed (connection refused, timeout,
    /// undecodable body, ...).
    #[error("Failed to call {action} to engine")]
    Request {
        action: &'static str,
        #[source]
        source: reqwest::Error,
    },
}

impl EngineRequestError {
    pub fn action(&self) -> &'static str {
        match self {
            EngineRequestError::ApiError { action, .. } => action,
            EngineRequestError::Request { action, .. } => action,
        }
    }
}

/// Operations exposed by an engine.
#[async_trait]
pub trait EngineApi: Send + Sync {
    async fn forecast(
        &self,
        request: &TimeSeriesAnalysisRequest,
    ) -> Result<TimeSeries, EngineRequestError>;

    async fn compute_forecast_accuracy(
        &self,
        request: &TimeSeriesAnalysisRequest,
    ) -> Result<f64, EngineRequestError>;

    async fn predict(
        &self,
        request: &TimeSeriesAnalysisRequest,
    ) -> Result<TimeSeries, EngineRequestError>;

    async fn start_classifier(
        &self,
        request: &ClassifierStartRequest,
    ) -> Result<(), EngineRequestError>;

    async fn classifier_data(&self, request: &ClassifierDataRequest)
        -> Result<(), EngineRequestError>;

    async fn classifier_predict(
        &self,
        request: &ClassifierRequest,
    ) -> Result<ClassifierResponse, EngineRequestError>;

    async fn classifier_predict_accuracy(
        &self,
        request: &ClassifierRequest,
    ) -> Result<f64, EngineRequestError>;

    async fn cancel_classifier(
        &self,
        request: &ClassifierCancelRequest,
    ) -> Result<(), EngineRequestError>;

    /// Admin ping: the engine reports its worker processes and in-flight
    /// requests.
    async fn ping(&self) -> Result<EngineDetail, EngineRequestError>;
}

/// HTTP client for a single engine.
pub struct HttpEngineClient {
    client: reqwest::Client,
    api_url: String,
}

impl HttpEngineClient {
    /// Create a client for `endpoint` whose calls time out after
    /// `request_timeout`.
    pub fn new(endpoint: &Endpoint, request_timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(request_timeout).build()?;
        Ok(Self::with_client(client, endpoint))
    }

    /// Create a client reusing an existing [`reqwest::Client`]
    /// (connection pooling across the engines of a pool).
    pub fn with_client(client: reqwest::Client, endpoint: &Endpoint) -> Self {
        Self {
            client,
            api_url: endpoint.base_url(),
        }
    }

    // ---- private helpers ----

    async fn post_for<B, T>(&self, path: &str, action: &'static str, body: &B) -> Result<T, EngineRequestError>
    where
        B: Serialize + Sync,
        T: DeserializeOwned,
    {
        let response = self
            .client
            .post(format!("{}{}", self.api_url, path))
            .json(body)
            .send()
            .await
            .map_err(|source| EngineRequestError::Request { action, source })?;

        Self::parse_response(response, action).await
    }

    async fn post<B>(&self, path: &str, action: &'static str, body: &B) -> Result<(), EngineRequestError>
    where
        B: Serialize + Sync,
    {
        let response = self
            .client
            .post(format!("{}{}", self.api_url, path))
            .json(body)
            .send()
            .await
            .map_err(|source| EngineRequestError::Request { action, source })?;

        Self::check_status(response, action).await
    }

    /// Return the response unchanged on success, or an
    /// [`EngineRequestError::ApiError`] carrying status and body text.
    async fn ensure_success(
        response: reqwest::Response,
        action: &'static str,
    ) -> Result<reqwest::Response, EngineRequestError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(EngineRequestError::ApiError {
                action,
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    async fn parse_response<T: DeserializeOwned>(
        response: reqwest::Response,
        action: &'static str,
    ) -> Result<T, EngineRequestError> {
        let response = Self::ensure_success(response, action).await?;
        response
            .json::<T>()
            .await
            .map_err(|source| EngineRequestError::Request { action, source })
    }

    async fn check_status(
        response: reqwest::Response,
        action: &'static str,
    ) -> Result<(), EngineRequestError> {
        Self::ensure_success(response, action).await?;
        Ok(())
    }
}

#[async_trait]
impl EngineApi for HttpEngineClient {
    async fn forecast(
        &self,
        request: &TimeSeriesAnalysisRequest,
    ) -> Result<TimeSeries, EngineRequestError> {
        self.post_for("/time-series-analysis/forecast", "forecast", request)
            .await
    }

    async fn compute_forecast_accuracy(
        &self,
        request: &TimeSeriesAnalysisRequest,
    ) -> Result<f64, EngineRequestError> {
        self.post_for(
            "/time-series-analysis/forecast-accuracy",
            "forecast accuracy",
            request,
        )
        .await
    }

    async fn predict(
        &self,
        request: &TimeSeriesAnalysisRequest,
    ) -> Result<TimeSeries, EngineRequestError> {
        self.post_for("/time-series-analysis/predict", "predict", request)
            .await
    }

    async fn start_classifier(
        &self,
        request: &ClassifierStartRequest,
    ) -> Result<(), EngineRequestError> {
        self.post("/classifier/start", "start", request).await
    }

    async fn classifier_data(
        &self,
        request: &ClassifierDataRequest,
    ) -> Result<(), EngineRequestError> {
        self.post("/classifier/data", "data", request).await
    }

    async fn classifier_predict(
        &self,
        request: &ClassifierRequest,
    ) -> Result<ClassifierResponse, EngineRequestError> {
        self.post_for("/classifier/predict", "predict", request)
            .await
    }

    async fn classifier_predict_accuracy(
        &self,
        request: &ClassifierRequest,
    ) -> Result<f64, EngineRequestError> {
        self.post_for("/classifier/predict-accuracy", "predict accuracy", request)
            .await
    }

    async fn cancel_classifier(
        &self,
        request: &ClassifierCancelRequest,
    ) -> Result<(), EngineRequestError> {
        self.post("/classifier/cancel", "cancel", request).await
    }

    async fn ping(&self) -> Result<EngineDetail, EngineRequestError> {
        let action = "ping";
        let response = self
            .client
            .get(format!("{}/admin/ping", self.api_url))
            .send()
            .await
            .map_err(|source| EngineRequestError::Request { action, source })?;

        Self::parse_response(response, action).await
    }
}
