use std::time::Duration;

use async_trait::async_trait;
use auditkit_application::{ApiMethod, ApiTransport};
use auditkit_core::{AppError, AppResult};
use reqwest::header;
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;
use uuid::Uuid;

const ERROR_PREVIEW_CHARS: usize = 256;
const ERROR_MESSAGE_FIELDS: [&str; 4] = ["message", "error_description", "error", "errorMessage"];

/// Connection settings for the platform REST API.
#[derive(Debug, Clone)]
pub struct HttpTransportConfig {
    /// Platform base URL, without the `/api` suffix.
    pub base_url: String,
    /// Pre-issued bearer token.
    pub access_token: String,
    /// User agent sent with every request.
    pub user_agent: String,
    /// Whole-request timeout.
    pub timeout: Duration,
}

/// reqwest-backed implementation of the platform API transport.
pub struct HttpApiTransport {
    http_client: reqwest::Client,
    api_base_url: String,
    access_token: String,
}

impl HttpApiTransport {
    /// Builds the transport and its HTTP client.
    pub fn new(config: HttpTransportConfig) -> AppResult<Self> {
        let base_url = config.base_url.trim().trim_end_matches('/');
        let parsed = Url::parse(base_url).map_err(|error| {
            AppError::Validation(format!("invalid platform base URL '{base_url}': {error}"))
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(AppError::Validation(format!(
                "platform base URL '{base_url}' must use http or https"
            )));
        }
        if config.access_token.trim().is_empty() {
            return Err(AppError::Validation(
                "platform access token must not be empty".to_owned(),
            ));
        }

        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent)
            .build()
            .map_err(|error| AppError::Internal(format!("failed to build HTTP client: {error}")))?;

        Ok(Self {
            http_client,
            api_base_url: format!("{base_url}/api"),
            access_token: config.access_token,
        })
    }
}

#[async_trait]
impl ApiTransport for HttpApiTransport {
    async fn send(
        &self,
        method: ApiMethod,
        path: &str,
        body: Option<Value>,
    ) -> AppResult<Vec<u8>> {
        let request_id = Uuid::new_v4();
        let endpoint = format!("{}{path}", self.api_base_url);

        let mut builder = self
            .http_client
            .request(reqwest_method(method), endpoint)
            .bearer_auth(self.access_token.as_str())
            .header(header::ACCEPT, "application/json")
            .header("x-request-id", request_id.to_string());
        if let Some(body) = &body {
            builder = builder.json(body);
        }

        debug!(method = %method, path, request_id = %request_id, "sending platform request");

        let response = builder.send().await.map_err(|error| {
            AppError::Transport(format!("{method} {path} failed: {error}"))
        })?;
        let status = response.status();
        let bytes = response.bytes().await.map_err(|error| {
            AppError::Transport(format!("failed to read {method} {path} response: {error}"))
        })?;

        if !status.is_success() {
            let message = extract_error_message(&bytes);
            warn!(
                method = %method,
                path,
                request_id = %request_id,
                status = status.as_u16(),
                message = %message,
                "platform request failed"
            );
            return Err(AppError::Http {
                status: status.as_u16(),
                message,
            });
        }

        Ok(bytes.to_vec())
    }
}

fn reqwest_method(method: ApiMethod) -> reqwest::Method {
    match method {
        ApiMethod::Get => reqwest::Method::GET,
        ApiMethod::Post => reqwest::Method::POST,
        ApiMethod::Put => reqwest::Method::PUT,
        ApiMethod::Patch => reqwest::Method::PATCH,
        ApiMethod::Delete => reqwest::Method::DELETE,
    }
}

/// Picks a readable message out of an error response body.
fn extract_error_message(body: &[u8]) -> String {
    if let Ok(Value::Object(fields)) = serde_json::from_slice::<Value>(body) {
        let message = ERROR_MESSAGE_FIELDS
            .iter()
            .filter_map(|field| fields.get(*field).and_then(Value::as_str))
            .find(|message| !message.trim().is_empty());
        if let Some(message) = message {
            return message.to_owned();
        }
    }

    let text = String::from_utf8_lossy(body);
    let text = text.trim();
    if text.is_empty() {
        return "<empty body>".to_owned();
    }

    let preview: String = text.chars().take(ERROR_PREVIEW_CHARS).collect();
    if preview.len() < text.len() {
        format!("{preview}...")
    } else {
        preview
    }
}
