use std::sync::Arc;

use chrono::Utc;
use serde_json::json;

use auditkit_core::AppError;
use auditkit_domain::{
    ApplicationOwnership, AuditEngine, Project, QueryLevel, ScopeSelector, SessionScope,
};

use crate::api_ports::{ApiMethod, PollingSettings};
use crate::request_poller::RequestPoller;
use crate::test_support::{
    FakeProjectDirectory, ScriptedTransport, completed, pending, request_id, sast_session,
};

use super::AuditSessionService;

fn service(
    transport: Arc<ScriptedTransport>,
    directory: Arc<FakeProjectDirectory>,
) -> AuditSessionService {
    let poller = RequestPoller::new(transport.clone(), PollingSettings::default());
    AuditSessionService::new(transport, directory, poller)
}

fn owned_project() -> Project {
    Project {
        id: "project-42".to_owned(),
        name: "payments".to_owned(),
        application_ids: vec!["app-1".to_owned()],
    }
}

fn allocated(id: &str, request: &str) -> auditkit_core::AppResult<serde_json::Value> {
    Ok(json!({"id": id, "data": {"status": "ALLOCATED", "requestId": request}}))
}

#[tokio::test(start_paused = true)]
async fn unknown_engine_is_rejected_before_any_call() {
    let transport = ScriptedTransport::new(Vec::new());
    let directory = FakeProjectDirectory::with_project(owned_project());
    let service = service(transport.clone(), directory.clone());

    let selector = ScopeSelector::project("project-42", "scan-1");
    assert!(selector.is_ok());
    let Ok(selector) = selector else { return };

    let result = service.create_session("sca", selector).await;

    assert!(matches!(result, Err(AppError::Validation(_))));
    assert!(transport.calls().await.is_empty());
    assert!(directory.lookups().await.is_empty());
}

#[tokio::test(start_paused = true)]
async fn sast_project_session_polls_languages_and_resolves_owner() {
    let transport = ScriptedTransport::new(vec![
        allocated("session-1", "req-1"),
        pending(),
        completed(json!(["Java", "Go"])),
    ]);
    let directory = FakeProjectDirectory::with_project(owned_project());
    let service = service(transport.clone(), directory.clone());
    let before = Utc::now();

    let Ok(selector) = ScopeSelector::project("project-42", "scan-1") else {
        panic!("valid selector rejected");
    };
    let session = service.create_session("SAST", selector).await;
    let Ok(session) = session else {
        panic!("session allocation failed: {session:?}");
    };

    assert_eq!(session.id(), "session-1");
    assert_eq!(session.engine(), AuditEngine::Sast);
    assert_eq!(session.languages(), ["Java".to_owned(), "Go".to_owned()]);
    assert!(session.platforms().is_empty());
    assert_eq!(session.resolve_level_id(QueryLevel::Application), "app-1");
    assert_eq!(session.resolve_level_id(QueryLevel::Project), "project-42");
    assert!(session.created_at() >= before);
    assert_eq!(session.created_at(), session.last_heartbeat());

    let calls = transport.calls().await;
    assert_eq!(calls.len(), 3);
    assert_eq!(calls[0].method, ApiMethod::Post);
    assert_eq!(calls[0].path, "/query-editor/sessions");
    assert_eq!(
        calls[0].body,
        Some(json!({"projectId": "project-42", "scanId": "scan-1", "scanner": "sast"}))
    );
    assert_eq!(calls[1].path, "/query-editor/sessions/session-1/requests/req-1");
    assert_eq!(directory.lookups().await, vec!["project-42".to_owned()]);
}

#[tokio::test(start_paused = true)]
async fn tenant_session_sends_filter_without_project_lookup() {
    let transport = ScriptedTransport::new(vec![
        allocated("session-2", "req-2"),
        completed(json!(["CSharp"])),
    ]);
    let directory = FakeProjectDirectory::with_project(owned_project());
    let service = service(transport.clone(), directory.clone());

    let session = service
        .create_session("sast", ScopeSelector::tenant("csharp-key"))
        .await;

    let Ok(session) = session else {
        panic!("tenant session failed: {session:?}");
    };
    assert_eq!(session.scope(), &SessionScope::Tenant);
    assert_eq!(session.resolve_level_id(QueryLevel::Project), "");
    assert_eq!(session.resolve_level_id(QueryLevel::Application), "");
    assert_eq!(
        transport.calls().await[0].body,
        Some(json!({"scanner": "sast", "filter": "csharp-key"}))
    );
    assert!(directory.lookups().await.is_empty());
}

#[tokio::test(start_paused = true)]
async fn sast_session_requires_allocated_status() {
    let transport = ScriptedTransport::new(vec![Ok(json!({
        "id": "session-3",
        "data": {"status": "QUEUED", "requestId": "req-3"}
    }))]);
    let service = service(transport.clone(), FakeProjectDirectory::with_project(owned_project()));

    let result = service
        .create_session("sast", ScopeSelector::tenant("java"))
        .await;

    assert!(matches!(result, Err(AppError::Allocation(message)) if message.contains("QUEUED")));
    assert_eq!(transport.calls().await.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn empty_language_list_is_an_allocation_error() {
    let transport = ScriptedTransport::new(vec![
        allocated("session-4", "req-4"),
        completed(json!([])),
    ]);
    let service = service(transport, FakeProjectDirectory::with_project(owned_project()));

    let result = service
        .create_session("sast", ScopeSelector::tenant("java"))
        .await;

    assert!(matches!(result, Err(AppError::Allocation(_))));
}

#[tokio::test(start_paused = true)]
async fn iac_session_reads_platforms_without_polling() {
    let transport = ScriptedTransport::new(vec![Ok(json!({
        "id": "session-5",
        "data": {"status": "RUNNING", "queryFilters": ["Terraform", "Dockerfile"]}
    }))]);
    let directory = FakeProjectDirectory::missing();
    let service = service(transport.clone(), directory);

    let Ok(selector) = ScopeSelector::project("project-7", "scan-7") else {
        panic!("valid selector rejected");
    };
    let session = service.create_session("iac", selector).await;

    let Ok(session) = session else {
        panic!("iac session failed: {session:?}");
    };
    assert!(session.has_platform("terraform"));
    assert!(session.languages().is_empty());
    assert_eq!(session.application(), &ApplicationOwnership::Unowned);
    assert_eq!(transport.calls().await.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn iac_session_without_platforms_fails() {
    let transport = ScriptedTransport::new(vec![Ok(json!({
        "id": "session-6",
        "data": {"status": "RUNNING", "queryFilters": null}
    }))]);
    let service = service(transport, FakeProjectDirectory::missing());

    let result = service
        .create_session("iac", ScopeSelector::tenant("terraform"))
        .await;

    assert!(matches!(result, Err(AppError::Allocation(_))));
}

#[tokio::test(start_paused = true)]
async fn iac_session_requires_running_status() {
    let transport = ScriptedTransport::new(vec![Ok(json!({
        "id": "session-7",
        "data": {"status": "ALLOCATED", "queryFilters": ["Terraform"]}
    }))]);
    let service = service(transport, FakeProjectDirectory::missing());

    let result = service
        .create_session("iac", ScopeSelector::tenant("terraform"))
        .await;

    assert!(matches!(result, Err(AppError::Allocation(_))));
}

#[tokio::test(start_paused = true)]
async fn ambiguous_ownership_is_kept_as_sentinel() {
    let transport = ScriptedTransport::new(vec![
        allocated("session-8", "req-8"),
        completed(json!(["Java"])),
    ]);
    let directory = FakeProjectDirectory::with_project(Project {
        application_ids: vec!["app-1".to_owned(), "app-2".to_owned()],
        ..owned_project()
    });
    let service = service(transport, directory);

    let Ok(selector) = ScopeSelector::project("project-42", "scan-1") else {
        panic!("valid selector rejected");
    };
    let session = service.create_session("sast", selector).await;

    let Ok(session) = session else {
        panic!("session failed: {session:?}");
    };
    assert_eq!(session.application(), &ApplicationOwnership::Ambiguous);
    assert_eq!(
        session.resolve_level_id(QueryLevel::Application),
        auditkit_domain::AMBIGUOUS_APPLICATION_MARKER
    );
}

#[tokio::test(start_paused = true)]
async fn keep_alive_skips_recent_sessions() {
    let transport = ScriptedTransport::new(vec![
        allocated("session-9", "req-9"),
        completed(json!(["Java"])),
    ]);
    let service = service(transport.clone(), FakeProjectDirectory::missing());
    let Ok(mut session) = service
        .create_session("sast", ScopeSelector::tenant("java"))
        .await
    else {
        panic!("session allocation failed");
    };
    let heartbeat = session.last_heartbeat();

    assert!(service.keep_alive(&mut session).await.is_ok());

    assert_eq!(transport.calls().await.len(), 2);
    assert_eq!(session.last_heartbeat(), heartbeat);
}

#[tokio::test(start_paused = true)]
async fn keep_alive_refreshes_stale_sessions() {
    let transport = ScriptedTransport::new(vec![Ok(json!({}))]);
    let service = service(transport.clone(), FakeProjectDirectory::missing());
    let mut session = sast_session(ApplicationOwnership::Unowned);
    let stale = session.last_heartbeat();

    assert!(service.keep_alive(&mut session).await.is_ok());

    let calls = transport.calls().await;
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].method, ApiMethod::Patch);
    assert_eq!(calls[0].path, "/query-editor/sessions/session-0001-abcd");
    assert!(session.last_heartbeat() > stale);
}

#[tokio::test(start_paused = true)]
async fn repeated_keep_alive_within_interval_patches_once() {
    let transport = ScriptedTransport::new(vec![Ok(json!({}))]);
    let service = service(transport.clone(), FakeProjectDirectory::missing());
    let mut session = sast_session(ApplicationOwnership::Unowned);
    let stale = session.last_heartbeat();

    assert!(service.keep_alive(&mut session).await.is_ok());
    let refreshed = session.last_heartbeat();
    assert!(service.keep_alive(&mut session).await.is_ok());

    assert_eq!(
        transport.paths().await,
        vec!["PATCH /query-editor/sessions/session-0001-abcd".to_owned()]
    );
    assert!(refreshed > stale);
    assert_eq!(session.last_heartbeat(), refreshed);
}

#[tokio::test(start_paused = true)]
async fn failed_keep_alive_leaves_heartbeat_unchanged() {
    let transport = ScriptedTransport::new(vec![Err(AppError::Http {
        status: 404,
        message: "session not found".to_owned(),
    })]);
    let service = service(transport, FakeProjectDirectory::missing());
    let mut session = sast_session(ApplicationOwnership::Unowned);
    let stale = session.last_heartbeat();

    let result = service.keep_alive(&mut session).await;

    assert_eq!(result.err().and_then(|error| error.http_status()), Some(404));
    assert_eq!(session.last_heartbeat(), stale);
}

#[tokio::test(start_paused = true)]
async fn teardown_of_nothing_makes_no_call() {
    let transport = ScriptedTransport::new(Vec::new());
    let service = service(transport.clone(), FakeProjectDirectory::missing());

    assert!(service.teardown(None).await.is_ok());
    assert!(transport.calls().await.is_empty());
}

#[tokio::test(start_paused = true)]
async fn teardown_deletes_the_session() {
    let transport = ScriptedTransport::new(vec![Ok(json!(null))]);
    let service = service(transport.clone(), FakeProjectDirectory::missing());

    let result = service
        .teardown(Some(sast_session(ApplicationOwnership::Unowned)))
        .await;

    assert!(result.is_ok());
    assert_eq!(
        transport.paths().await,
        vec!["DELETE /query-editor/sessions/session-0001-abcd".to_owned()]
    );
}

#[tokio::test(start_paused = true)]
async fn run_scan_rejects_error_envelope() {
    let transport = ScriptedTransport::new(vec![Ok(json!({
        "id": "",
        "code": 3,
        "message": "no sources loaded"
    }))]);
    let service = service(transport.clone(), FakeProjectDirectory::missing());

    let result = service
        .run_scan(&sast_session(ApplicationOwnership::Unowned))
        .await;

    assert!(matches!(result, Err(AppError::PollingFailed(message)) if message.contains("no sources loaded")));
    assert_eq!(transport.calls().await.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn open_project_session_loads_sources_and_scans() {
    let transport = ScriptedTransport::new(vec![
        allocated("session-10", "req-10"),
        completed(json!(["Java"])),
        Ok(json!([{"isLeaf": false, "title": "src", "key": "src", "children": [
            {"isLeaf": true, "title": "A.java", "key": "src/A.java"}
        ]}])),
        request_id("scan-req"),
        pending(),
        completed(json!(null)),
    ]);
    let service = service(
        transport.clone(),
        FakeProjectDirectory::with_project(owned_project()),
    );

    let session = service
        .open_project_session("sast", "project-42", "scan-1")
        .await;

    assert!(session.is_ok());
    assert_eq!(
        transport.paths().await,
        vec![
            "POST /query-editor/sessions".to_owned(),
            "GET /query-editor/sessions/session-10/requests/req-10".to_owned(),
            "GET /query-editor/sessions/session-10/sources".to_owned(),
            "POST /query-editor/sessions/session-10/sources/scan".to_owned(),
            "GET /query-editor/sessions/session-10/requests/scan-req".to_owned(),
            "GET /query-editor/sessions/session-10/requests/scan-req".to_owned(),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn open_project_session_deletes_session_when_scan_fails() {
    let transport = ScriptedTransport::new(vec![
        allocated("session-11", "req-11"),
        completed(json!(["Java"])),
        Ok(json!([])),
        request_id("scan-req"),
        Ok(json!({"completed": true, "value": null, "code": 0, "message": "", "status": "Failed"})),
        Ok(json!(null)),
    ]);
    let service = service(
        transport.clone(),
        FakeProjectDirectory::with_project(owned_project()),
    );

    let result = service
        .open_project_session("sast", "project-42", "scan-1")
        .await;

    assert!(matches!(result, Err(AppError::PollingFailed(_))));
    let paths = transport.paths().await;
    assert_eq!(
        paths.last().map(String::as_str),
        Some("DELETE /query-editor/sessions/session-11")
    );
    assert_eq!(paths.len(), 6);
}

#[tokio::test(start_paused = true)]
async fn open_project_session_returns_setup_error_when_delete_fails() {
    let transport = ScriptedTransport::new(vec![
        allocated("session-12", "req-12"),
        completed(json!(["Java"])),
        Err(AppError::Http {
            status: 500,
            message: "sources unavailable".to_owned(),
        }),
        Err(AppError::Transport("connection reset".to_owned())),
    ]);
    let service = service(transport.clone(), FakeProjectDirectory::missing());

    let result = service
        .open_project_session("sast", "project-42", "scan-1")
        .await;

    assert_eq!(result.err().and_then(|error| error.http_status()), Some(500));
    assert_eq!(
        transport.paths().await.last().map(String::as_str),
        Some("DELETE /query-editor/sessions/session-12")
    );
}

#[tokio::test(start_paused = true)]
async fn open_project_session_rejects_empty_scan_id() {
    let transport = ScriptedTransport::new(Vec::new());
    let service = service(transport.clone(), FakeProjectDirectory::missing());

    let result = service.open_project_session("sast", "project-42", "").await;

    assert!(matches!(result, Err(AppError::Validation(_))));
    assert!(transport.calls().await.is_empty());
}
