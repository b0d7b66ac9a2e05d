//! HTTP client for the coordinate-set and curve endpoints.
//!
//! Every call returns a typed [`ApiResponse`]; HTTP failures are decoded
//! into [`ApiError::Status`] using the server's JSON error body when one is
//! present, and `success: false` bodies become [`ApiError::Rejected`].

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::header::{COOKIE, HeaderMap, HeaderValue};
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use super::{ApiRequest, ApiResponse};
use crate::config::ApiSettings;
use crate::error::ApiError;
use crate::protocol::{
    DeleteCurveResponse, ErrorBody, ListCurvesResponse, ListSetsResponse, LoadCurveResponse,
    LoadSetResponse, SaveSetRequest, SaveSetResponse, UpdateSetRequest,
};

pub struct PersistenceClient {
    http: reqwest::Client,
    settings: ApiSettings,
}

impl PersistenceClient {
    pub fn new(settings: ApiSettings) -> Result<Self> {
        url::Url::parse(&settings.base_url)
            .with_context(|| format!("Invalid API base URL {:?}", settings.base_url))?;

        let mut headers = HeaderMap::new();
        if let Some(cookie) = settings.session_cookie.as_deref() {
            let value = HeaderValue::from_str(cookie).context("Invalid session cookie")?;
            headers.insert(COOKIE, value);
        }

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .default_headers(headers)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self { http, settings })
    }

    /// Run one request to completion.
    pub async fn execute(&self, request: ApiRequest) -> Result<ApiResponse, ApiError> {
        debug!(target: "api", action = %request.action(), "Sending request");
        match request {
            ApiRequest::ListSets => self.list_sets().await,
            ApiRequest::LoadSet { id } => self.load_set(id, false).await,
            ApiRequest::LoadDemo { id } => self.load_set(id, true).await,
            ApiRequest::SaveSet(body) => self.save_set(&body).await,
            ApiRequest::UpdateSet(body) => self.update_set(&body).await,
            ApiRequest::ListCurves => self.list_curves().await,
            ApiRequest::LoadCurve { filename } => self.load_curve(filename).await,
            ApiRequest::DeleteCurve { filename } => self.delete_curve(filename).await,
            ApiRequest::StashText { text } => self.stash_text(&text).await,
            ApiRequest::ClearStash => self.clear_stash().await,
        }
    }

    async fn list_sets(&self) -> Result<ApiResponse, ApiError> {
        let url = self.settings.url(&self.settings.list_sets_path);
        let body: ListSetsResponse = decode(self.http.get(url).send().await?).await?;
        if !body.success {
            return Err(ApiError::Rejected("Failed to load saved sets".into()));
        }
        Ok(ApiResponse::Sets(body.sets))
    }

    async fn load_set(&self, id: i64, demo: bool) -> Result<ApiResponse, ApiError> {
        let path = if demo {
            &self.settings.load_demo_path
        } else {
            &self.settings.load_set_path
        };
        let response = self
            .http
            .get(self.settings.url(path))
            .query(&[("set_id", id)])
            .send()
            .await?;
        let body: LoadSetResponse = decode(response).await?;
        if !body.success {
            return Err(ApiError::Rejected("Failed to load coordinates".into()));
        }
        info!(
            target: "api",
            set_id = id,
            demo,
            coordinates = body.coordinates.len(),
            chunks = body.chunks.len(),
            "Loaded set"
        );
        Ok(ApiResponse::SetLoaded { demo, body })
    }

    async fn save_set(&self, request: &SaveSetRequest) -> Result<ApiResponse, ApiError> {
        let url = self.settings.url(&self.settings.save_set_path);
        let body: SaveSetResponse = decode(self.http.post(url).json(request).send().await?).await?;
        if !body.success {
            return Err(rejected(body.message.as_deref(), "Failed to save coordinates"));
        }
        Ok(ApiResponse::Saved(body))
    }

    async fn update_set(&self, request: &UpdateSetRequest) -> Result<ApiResponse, ApiError> {
        let url = self.settings.url(&self.settings.update_set_path);
        let body: SaveSetResponse = decode(self.http.post(url).json(request).send().await?).await?;
        if !body.success {
            return Err(rejected(body.message.as_deref(), "Failed to update coordinates"));
        }
        Ok(ApiResponse::Updated(body))
    }

    async fn list_curves(&self) -> Result<ApiResponse, ApiError> {
        let url = self.settings.url(&self.settings.list_curves_path);
        let body: ListCurvesResponse = decode(self.http.get(url).send().await?).await?;
        if !body.success {
            return Err(rejected(body.error.as_deref(), "Failed to list curves"));
        }
        Ok(ApiResponse::Curves(body.curves))
    }

    async fn load_curve(&self, filename: String) -> Result<ApiResponse, ApiError> {
        let response = self
            .http
            .get(self.settings.url(&self.settings.load_curve_path))
            .query(&[("filename", filename.as_str())])
            .send()
            .await?;
        let body: LoadCurveResponse = decode(response).await?;
        if !body.success {
            return Err(rejected(body.error.as_deref(), "Unknown error"));
        }
        Ok(ApiResponse::CurveLoaded {
            filename,
            coordinates: body.coordinates,
        })
    }

    async fn delete_curve(&self, filename: String) -> Result<ApiResponse, ApiError> {
        let response = self
            .http
            .post(self.settings.url(&self.settings.delete_curve_path))
            .form(&[("filename", filename.as_str())])
            .send()
            .await?;
        let body: DeleteCurveResponse = decode(response).await?;
        if !body.success {
            return Err(rejected(body.error.as_deref(), "Unknown error"));
        }
        Ok(ApiResponse::CurveDeleted { filename })
    }

    async fn stash_text(&self, text: &str) -> Result<ApiResponse, ApiError> {
        // The endpoint answers with a redirect to the login page; only the
        // final status matters.
        let response = self
            .http
            .post(self.settings.url(&self.settings.stash_text_path))
            .form(&[("temp_coords", text)])
            .send()
            .await?;
        check_status(response).await?;
        Ok(ApiResponse::Stashed)
    }

    async fn clear_stash(&self) -> Result<ApiResponse, ApiError> {
        let url = self.settings.url(&self.settings.clear_stash_path);
        check_status(self.http.post(url).send().await?).await?;
        Ok(ApiResponse::Stashed)
    }
}

fn rejected(message: Option<&str>, fallback: &str) -> ApiError {
    ApiError::Rejected(message.unwrap_or(fallback).to_string())
}

/// Turn a non-success status into `ApiError::Status`, passing the response
/// through otherwise.
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let text = response.text().await.unwrap_or_default();
    Err(status_error(status.as_u16(), &text))
}

async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiError> {
    let response = check_status(response).await?;
    let text = response.text().await?;
    Ok(serde_json::from_str(&text)?)
}

pub(crate) fn status_error(status: u16, body: &str) -> ApiError {
    let message = serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.best_message());
    ApiError::Status { status, message }
}
