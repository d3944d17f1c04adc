use std::str::FromStr;
use std::sync::Arc;

use auditkit_core::{AppError, AppResult};
use auditkit_domain::{
    ApplicationOwnership, AsyncExpectation, AsyncResult, AuditEngine, AuditSession,
    ScanSourceNode, ScopeSelector, SessionScope,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::api_ports::{
    ApiMethod, ApiTransport, ProjectDirectory, RequestIdBody, send_json, to_body,
};
use crate::request_poller::RequestPoller;

mod allocation;
mod lifecycle;

const SESSIONS_PATH: &str = "/query-editor/sessions";

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum CreateSessionRequest<'a> {
    Tenant {
        scanner: &'a str,
        filter: &'a str,
    },
    Project {
        #[serde(rename = "projectId")]
        project_id: &'a str,
        #[serde(rename = "scanId")]
        scan_id: &'a str,
        scanner: &'a str,
    },
}

#[derive(Debug, Default, Deserialize)]
struct CreateSessionResponse {
    #[serde(default)]
    id: String,
    #[serde(default)]
    data: CreateSessionData,
}

#[derive(Debug, Default, Deserialize)]
struct CreateSessionData {
    #[serde(default)]
    status: String,
    #[serde(default, rename = "requestId")]
    request_id: String,
    #[serde(default, rename = "queryFilters")]
    query_filters: Option<Vec<String>>,
}

/// Allocates audit sessions and keeps them alive.
#[derive(Clone)]
pub struct AuditSessionService {
    transport: Arc<dyn ApiTransport>,
    project_directory: Arc<dyn ProjectDirectory>,
    poller: RequestPoller,
}

impl AuditSessionService {
    /// Creates a session service.
    #[must_use]
    pub fn new(
        transport: Arc<dyn ApiTransport>,
        project_directory: Arc<dyn ProjectDirectory>,
        poller: RequestPoller,
    ) -> Self {
        Self {
            transport,
            project_directory,
            poller,
        }
    }

    /// Returns the poller used to resolve async requests.
    #[must_use]
    pub fn poller(&self) -> &RequestPoller {
        &self.poller
    }
}

fn session_path(session: &AuditSession) -> String {
    format!("{SESSIONS_PATH}/{}", session.id())
}

#[cfg(test)]
mod tests;
