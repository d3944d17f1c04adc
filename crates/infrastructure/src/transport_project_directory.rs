use std::sync::Arc;

use async_trait::async_trait;
use auditkit_application::{ApiMethod, ApiTransport, ProjectDirectory};
use auditkit_core::{AppError, AppResult};
use auditkit_domain::Project;
use tracing::debug;

/// Project directory reading projects through the platform API.
#[derive(Clone)]
pub struct TransportProjectDirectory {
    transport: Arc<dyn ApiTransport>,
}

impl TransportProjectDirectory {
    /// Creates a project directory over an existing transport.
    #[must_use]
    pub fn new(transport: Arc<dyn ApiTransport>) -> Self {
        Self { transport }
    }
}

#[async_trait]
impl ProjectDirectory for TransportProjectDirectory {
    async fn project_by_id(&self, project_id: &str) -> AppResult<Project> {
        let escaped: String = url::form_urlencoded::byte_serialize(project_id.as_bytes()).collect();
        let body = self
            .transport
            .send(ApiMethod::Get, &format!("/projects/{escaped}"), None)
            .await?;

        let project: Project = serde_json::from_slice(&body).map_err(|error| {
            AppError::Decode(format!("failed to decode project '{project_id}': {error}"))
        })?;
        debug!(
            project_id,
            applications = project.application_ids.len(),
            "loaded project"
        );

        Ok(project)
    }
}
