//! Infrastructure adapters for the platform REST API.

#![forbid(unsafe_code)]

mod http_api_transport;
mod transport_project_directory;

pub use http_api_transport::{HttpApiTransport, HttpTransportConfig};
pub use transport_project_directory::TransportProjectDirectory;
