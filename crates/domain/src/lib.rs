//! Domain entities and invariants.

#![forbid(unsafe_code)]

mod async_result;
mod collection;
mod editor_key;
mod engine;
mod iac_query;
mod level;
mod project;
mod sast_query;
mod session;

pub use async_result::{AsyncExpectation, AsyncResult};
pub use collection::{IacQueryCollection, QueryTreeData, QueryTreeNode, SastQueryCollection};
pub use editor_key::{EditorKeyParts, calculate_editor_key, calculate_query_id};
pub use engine::AuditEngine;
pub use iac_query::{IacQuery, IacQueryMetadata, IacQueryRecord, split_query_id};
pub use level::QueryLevel;
pub use project::{
    AMBIGUOUS_APPLICATION_MARKER, ApplicationOwnership, Project, ScanSourceNode,
};
pub use sast_query::{SastQuery, SastQueryMetadata, SastQueryRecord};
pub use session::{
    AuditSession, HEARTBEAT_INTERVAL_SECONDS, ScopeSelector, SessionScope, shorten_guid,
};
