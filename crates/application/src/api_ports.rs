use std::fmt::{Display, Formatter};

use async_trait::async_trait;
use auditkit_core::{AppError, AppResult};
use auditkit_domain::Project;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// HTTP method of a platform API call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApiMethod {
    /// `GET`
    Get,
    /// `POST`
    Post,
    /// `PUT`
    Put,
    /// `PATCH`
    Patch,
    /// `DELETE`
    Delete,
}

impl ApiMethod {
    /// Returns the method verb.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }
}

impl Display for ApiMethod {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Port for authenticated calls against the platform REST API.
///
/// Paths are relative to `{base_url}/api` and start with `/`. Implementations
/// never retry; any non-2xx response is an error.
#[async_trait]
pub trait ApiTransport: Send + Sync {
    /// Sends one request and returns the raw response body.
    async fn send(&self, method: ApiMethod, path: &str, body: Option<Value>)
    -> AppResult<Vec<u8>>;
}

/// Port resolving projects and their owning applications.
#[async_trait]
pub trait ProjectDirectory: Send + Sync {
    /// Loads one project by id.
    async fn project_by_id(&self, project_id: &str) -> AppResult<Project>;
}

/// Polling cadence for async query-editor requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollingSettings {
    /// Seconds to wait between two status checks.
    pub delay_seconds: u64,
    /// Upper bound of accumulated waiting; zero polls without bound.
    pub max_seconds: u64,
}

impl PollingSettings {
    /// Creates polling settings.
    pub fn new(delay_seconds: u64, max_seconds: u64) -> AppResult<Self> {
        if delay_seconds == 0 {
            return Err(AppError::Validation(
                "polling delay must be at least one second".to_owned(),
            ));
        }

        Ok(Self {
            delay_seconds,
            max_seconds,
        })
    }
}

impl Default for PollingSettings {
    fn default() -> Self {
        Self {
            delay_seconds: 15,
            max_seconds: 300,
        }
    }
}

/// Envelope returned by every mutating query-editor call.
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct RequestIdBody {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub message: String,
}

impl RequestIdBody {
    pub fn into_request_id(self, operation: &str) -> AppResult<String> {
        if self.code != 0 && !self.message.is_empty() {
            return Err(AppError::PollingFailed(format!(
                "{operation} returned error {}: {}",
                self.code, self.message
            )));
        }
        if self.id.is_empty() {
            return Err(AppError::Decode(format!(
                "{operation} response carries no request id"
            )));
        }

        Ok(self.id)
    }
}

pub(crate) async fn send_json<T: DeserializeOwned>(
    transport: &dyn ApiTransport,
    method: ApiMethod,
    path: &str,
    body: Option<Value>,
) -> AppResult<T> {
    let bytes = transport.send(method, path, body).await?;
    serde_json::from_slice(&bytes).map_err(|error| {
        AppError::Decode(format!("failed to decode response of {method} {path}: {error}"))
    })
}

pub(crate) fn to_body<T: Serialize>(value: &T) -> AppResult<Value> {
    serde_json::to_value(value)
        .map_err(|error| AppError::Internal(format!("failed to encode request body: {error}")))
}

pub(crate) fn escape_path_segment(segment: &str) -> String {
    url::form_urlencoded::byte_serialize(segment.as_bytes()).collect()
}

#[cfg(test)]
mod tests {
    use super::{PollingSettings, RequestIdBody, escape_path_segment};

    #[test]
    fn path_segments_are_form_encoded() {
        assert_eq!(escape_path_segment("ABC=="), "ABC%3D%3D");
        assert_eq!(escape_path_segment("t:0a1b"), "t%3A0a1b");
        assert_eq!(escape_path_segment("a b"), "a+b");
    }

    #[test]
    fn request_id_envelope_reports_errors() {
        let failed = RequestIdBody {
            id: String::new(),
            code: 7,
            message: "engine busy".to_owned(),
        };
        assert!(failed.into_request_id("scan").is_err());

        let ok = RequestIdBody {
            id: "req-1".to_owned(),
            ..RequestIdBody::default()
        };
        assert_eq!(ok.into_request_id("scan").ok(), Some("req-1".to_owned()));
    }

    #[test]
    fn polling_settings_reject_zero_delay() {
        assert!(PollingSettings::new(0, 10).is_err());
        assert_eq!(PollingSettings::default().delay_seconds, 15);
        assert_eq!(PollingSettings::default().max_seconds, 300);
    }
}
