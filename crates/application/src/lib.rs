//! Application services and ports.

#![forbid(unsafe_code)]

mod api_ports;
mod query_editor_service;
mod request_poller;
mod session_service;

#[cfg(test)]
mod test_support;

pub use api_ports::{ApiMethod, ApiTransport, PollingSettings, ProjectDirectory};
pub use query_editor_service::{QueryChange, QueryEditorService};
pub use request_poller::RequestPoller;
pub use session_service::AuditSessionService;
