use std::sync::Arc;
use std::time::Duration;

use auditkit_core::{AppError, AppResult};
use auditkit_domain::{AsyncExpectation, AsyncResult, AuditSession};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::api_ports::{ApiMethod, ApiTransport, PollingSettings, send_json};

#[derive(Debug, Default, Deserialize)]
struct RequestStatusBody {
    #[serde(default)]
    completed: bool,
    #[serde(default)]
    value: Value,
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: String,
}

/// Resolves async query-editor request ids into their terminal result.
#[derive(Clone)]
pub struct RequestPoller {
    transport: Arc<dyn ApiTransport>,
    settings: PollingSettings,
}

impl RequestPoller {
    /// Creates a poller using `settings` for [`Self::poll`].
    #[must_use]
    pub fn new(transport: Arc<dyn ApiTransport>, settings: PollingSettings) -> Self {
        Self {
            transport,
            settings,
        }
    }

    /// Returns the configured polling cadence.
    #[must_use]
    pub fn settings(&self) -> PollingSettings {
        self.settings
    }

    /// Polls `request_id` with the configured cadence.
    pub async fn poll(
        &self,
        session: &AuditSession,
        request_id: &str,
        expectation: AsyncExpectation,
    ) -> AppResult<AsyncResult> {
        self.poll_with_timeout(
            session,
            request_id,
            expectation,
            self.settings.delay_seconds,
            self.settings.max_seconds,
        )
        .await
    }

    /// Polls `request_id` until it completes, fails or `max_seconds` of
    /// waiting accumulate. A `max_seconds` of zero never times out.
    pub async fn poll_with_timeout(
        &self,
        session: &AuditSession,
        request_id: &str,
        expectation: AsyncExpectation,
        delay_seconds: u64,
        max_seconds: u64,
    ) -> AppResult<AsyncResult> {
        if delay_seconds == 0 {
            return Err(AppError::Validation(
                "polling delay must be at least one second".to_owned(),
            ));
        }

        debug!(session = %session, request_id, "polling query editor request");

        let mut elapsed_seconds = 0;
        loop {
            if let Some(value) = self.check_request(session, request_id).await? {
                debug!(request_id, elapsed_seconds, "query editor request completed");
                return AsyncResult::decode(expectation, value);
            }

            tokio::time::sleep(Duration::from_secs(delay_seconds)).await;
            elapsed_seconds += delay_seconds;

            if max_seconds != 0 && elapsed_seconds >= max_seconds {
                return Err(AppError::PollingTimeout {
                    request_id: request_id.to_owned(),
                    elapsed_seconds,
                });
            }
        }
    }

    async fn check_request(
        &self,
        session: &AuditSession,
        request_id: &str,
    ) -> AppResult<Option<Value>> {
        let path = format!(
            "/query-editor/sessions/{}/requests/{request_id}",
            session.id()
        );
        let status: RequestStatusBody =
            send_json(self.transport.as_ref(), ApiMethod::Get, &path, None).await?;

        if status.code != 0 && !status.message.is_empty() {
            return Err(AppError::PollingFailed(format!(
                "query editor returned error code {}: {}",
                status.code, status.message
            )));
        }

        if status.status == "Failed" {
            return Err(AppError::PollingFailed(format!(
                "query editor returned error: {}",
                status.value
            )));
        }

        Ok(status.completed.then_some(status.value))
    }
}
