use std::sync::Arc;

use auditkit_core::{AppError, AppResult, QueryFailure};
use auditkit_domain::{
    AsyncExpectation, AsyncResult, AuditEngine, AuditSession, IacQuery, IacQueryCollection,
    IacQueryMetadata, IacQueryRecord, QueryLevel, QueryTreeNode, SastQuery, SastQueryCollection,
    SastQueryMetadata, SastQueryRecord,
};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::api_ports::{
    ApiMethod, ApiTransport, RequestIdBody, escape_path_segment, send_json, to_body,
};
use crate::request_poller::RequestPoller;

mod iac;
mod sast;
mod source;
mod tree;

/// Result of a change that may leave compilation failures behind.
///
/// The change itself is persisted even when `failures` is not empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryChange<Q> {
    /// Query as re-fetched after the change.
    pub query: Q,
    /// Compilation failures reported while saving the source.
    pub failures: Vec<QueryFailure>,
}

impl<Q> QueryChange<Q> {
    fn unchanged(query: Q) -> Self {
        Self {
            query,
            failures: Vec::new(),
        }
    }

    /// Whether the saved source compiled.
    #[must_use]
    pub fn compiled(&self) -> bool {
        self.failures.is_empty()
    }
}

#[derive(Debug, Serialize)]
struct SourceUpdate<'a> {
    id: &'a str,
    source: &'a str,
}

/// Fetches, overrides, edits and probes queries within an audit session.
#[derive(Clone)]
pub struct QueryEditorService {
    transport: Arc<dyn ApiTransport>,
    poller: RequestPoller,
}

impl QueryEditorService {
    /// Creates a query editor service.
    #[must_use]
    pub fn new(transport: Arc<dyn ApiTransport>, poller: RequestPoller) -> Self {
        Self { transport, poller }
    }

    async fn submit(
        &self,
        session: &AuditSession,
        method: ApiMethod,
        path: &str,
        body: Option<Value>,
        operation: &str,
        expectation: AsyncExpectation,
    ) -> AppResult<AsyncResult> {
        let response: RequestIdBody =
            send_json(self.transport.as_ref(), method, path, body).await?;
        let request_id = response.into_request_id(operation)?;
        self.poller.poll(session, &request_id, expectation).await
    }

    async fn submit_new_query(
        &self,
        session: &AuditSession,
        body: Value,
    ) -> AppResult<String> {
        let result = self
            .submit(
                session,
                ApiMethod::Post,
                &queries_path(session),
                Some(body),
                "query creation",
                AsyncExpectation::CreatedQuery,
            )
            .await?;

        match result {
            AsyncResult::CreatedQuery { id } => Ok(id),
            other => Err(AppError::Decode(format!(
                "query creation returned {} instead of a query id",
                other.kind()
            ))),
        }
    }
}

fn queries_path(session: &AuditSession) -> String {
    format!("/query-editor/sessions/{}/queries", session.id())
}

fn query_path(session: &AuditSession, key: &str) -> String {
    format!("{}/{}", queries_path(session), escape_path_segment(key))
}

fn require_engine(session: &AuditSession, engine: AuditEngine) -> AppResult<()> {
    if session.engine() != engine {
        return Err(AppError::Precondition(format!(
            "{session} cannot serve {engine} queries"
        )));
    }
    Ok(())
}

fn require_override_level(session: &AuditSession, level: QueryLevel) -> AppResult<()> {
    if !level.is_override_level() {
        return Err(AppError::Validation(format!(
            "invalid query override level '{level}', use Tenant, Application or Project"
        )));
    }

    if level == QueryLevel::Application && session.application().application_id().is_none() {
        return Err(AppError::Precondition(format!(
            "requested an application-level override but {session} for project '{}' has no single owning application",
            session.project_name()
        )));
    }

    Ok(())
}

fn require_key(key: &str, query: &impl std::fmt::Display) -> AppResult<()> {
    if key.is_empty() {
        return Err(AppError::Precondition(format!(
            "query {query} has no editor key, fetch it through the query editor first"
        )));
    }
    Ok(())
}
