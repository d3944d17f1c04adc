use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use serde_json::{Value, json};
use tokio::sync::Mutex;

use auditkit_core::{AppError, AppResult};
use auditkit_domain::{ApplicationOwnership, AuditEngine, AuditSession, AsyncResult, Project, SessionScope};

use crate::api_ports::{ApiMethod, ApiTransport, ProjectDirectory};

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct RecordedCall {
    pub method: ApiMethod,
    pub path: String,
    pub body: Option<Value>,
}

/// Transport answering calls from a script, in order, and recording them.
#[derive(Default)]
pub(crate) struct ScriptedTransport {
    responses: Mutex<VecDeque<AppResult<Value>>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedTransport {
    pub fn new(responses: Vec<AppResult<Value>>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.into()),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub async fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().await.clone()
    }

    pub async fn paths(&self) -> Vec<String> {
        self.calls
            .lock()
            .await
            .iter()
            .map(|call| format!("{} {}", call.method, call.path))
            .collect()
    }
}

#[async_trait]
impl ApiTransport for ScriptedTransport {
    async fn send(
        &self,
        method: ApiMethod,
        path: &str,
        body: Option<Value>,
    ) -> AppResult<Vec<u8>> {
        self.calls.lock().await.push(RecordedCall {
            method,
            path: path.to_owned(),
            body,
        });

        let response = self.responses.lock().await.pop_front().ok_or_else(|| {
            AppError::Internal(format!("no scripted response for {method} {path}"))
        })?;
        let value = response?;
        serde_json::to_vec(&value).map_err(|error| AppError::Internal(error.to_string()))
    }
}

/// Project directory backed by an optional fixed project.
pub(crate) struct FakeProjectDirectory {
    project: Option<Project>,
    lookups: Mutex<Vec<String>>,
}

impl FakeProjectDirectory {
    pub fn with_project(project: Project) -> Arc<Self> {
        Arc::new(Self {
            project: Some(project),
            lookups: Mutex::new(Vec::new()),
        })
    }

    pub fn missing() -> Arc<Self> {
        Arc::new(Self {
            project: None,
            lookups: Mutex::new(Vec::new()),
        })
    }

    pub async fn lookups(&self) -> Vec<String> {
        self.lookups.lock().await.clone()
    }
}

#[async_trait]
impl ProjectDirectory for FakeProjectDirectory {
    async fn project_by_id(&self, project_id: &str) -> AppResult<Project> {
        self.lookups.lock().await.push(project_id.to_owned());
        self.project.clone().ok_or_else(|| AppError::Http {
            status: 404,
            message: format!("project {project_id} not found"),
        })
    }
}

pub(crate) fn completed(value: Value) -> AppResult<Value> {
    Ok(json!({"completed": true, "value": value, "code": 0, "message": "", "status": "Completed"}))
}

pub(crate) fn pending() -> AppResult<Value> {
    Ok(json!({"completed": false, "value": null, "code": 0, "message": "", "status": "Running"}))
}

pub(crate) fn request_id(id: &str) -> AppResult<Value> {
    Ok(json!({"id": id, "code": 0, "message": ""}))
}

pub(crate) fn sast_session(application: ApplicationOwnership) -> AuditSession {
    let mut session = AuditSession::new(
        "session-0001-abcd",
        AuditEngine::Sast,
        SessionScope::Project {
            project_id: "project-42".to_owned(),
            project_name: "payments".to_owned(),
            application,
        },
        Utc::now() - Duration::minutes(10),
    );
    let applied = session.apply_capabilities(AsyncResult::Languages(vec!["Java".to_owned()]));
    assert!(applied.is_ok());
    session
}

pub(crate) fn iac_session() -> AuditSession {
    let mut session = AuditSession::new(
        "session-iac-0002",
        AuditEngine::Iac,
        SessionScope::Project {
            project_id: "project-7".to_owned(),
            project_name: "infra".to_owned(),
            application: ApplicationOwnership::Owned("app-9".to_owned()),
        },
        Utc::now() - Duration::minutes(10),
    );
    let applied =
        session.apply_capabilities(AsyncResult::Platforms(vec!["Terraform".to_owned()]));
    assert!(applied.is_ok());
    session
}
