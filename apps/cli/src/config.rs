use std::env;
use std::time::Duration;

use auditkit_application::PollingSettings;
use auditkit_core::{AppError, AppResult};
use auditkit_infrastructure::HttpTransportConfig;

const DEFAULT_HTTP_TIMEOUT_SECONDS: u64 = 60;
const DEFAULT_POLL_DELAY_SECONDS: u64 = 15;
const DEFAULT_POLL_MAX_SECONDS: u64 = 300;

/// Where the CLI should open its audit session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionTarget {
    Tenant { filter: String },
    Project { project_id: String, scan_id: String },
}

#[derive(Debug, Clone)]
pub struct CliConfig {
    pub transport: HttpTransportConfig,
    pub polling: PollingSettings,
    pub engine: String,
    pub target: SessionTarget,
}

impl CliConfig {
    pub fn load() -> AppResult<Self> {
        let base_url = required_env("AUDITKIT_BASE_URL")?;
        let access_token = required_env("AUDITKIT_ACCESS_TOKEN")?;
        let timeout_seconds =
            parse_env_u64("AUDITKIT_HTTP_TIMEOUT_SECONDS", DEFAULT_HTTP_TIMEOUT_SECONDS)?;
        if timeout_seconds == 0 {
            return Err(AppError::Validation(
                "AUDITKIT_HTTP_TIMEOUT_SECONDS must be greater than zero".to_owned(),
            ));
        }

        let polling = PollingSettings::new(
            parse_env_u64("AUDITKIT_POLL_DELAY_SECONDS", DEFAULT_POLL_DELAY_SECONDS)?,
            parse_env_u64("AUDITKIT_POLL_MAX_SECONDS", DEFAULT_POLL_MAX_SECONDS)?,
        )?;
        let engine = optional_env("AUDITKIT_ENGINE").unwrap_or_else(|| "sast".to_owned());
        let target = session_target(
            optional_env("AUDITKIT_PROJECT_ID"),
            optional_env("AUDITKIT_SCAN_ID"),
            optional_env("AUDITKIT_TENANT_FILTER"),
        )?;

        Ok(Self {
            transport: HttpTransportConfig {
                base_url,
                access_token,
                user_agent: format!("auditkit-cli/{}", env!("CARGO_PKG_VERSION")),
                timeout: Duration::from_secs(timeout_seconds),
            },
            polling,
            engine,
            target,
        })
    }
}

fn session_target(
    project_id: Option<String>,
    scan_id: Option<String>,
    tenant_filter: Option<String>,
) -> AppResult<SessionTarget> {
    match (project_id, scan_id) {
        (Some(project_id), Some(scan_id)) => Ok(SessionTarget::Project {
            project_id,
            scan_id,
        }),
        (None, None) => Ok(SessionTarget::Tenant {
            filter: tenant_filter.unwrap_or_default(),
        }),
        _ => Err(AppError::Validation(
            "AUDITKIT_PROJECT_ID and AUDITKIT_SCAN_ID must be set together".to_owned(),
        )),
    }
}

fn optional_env(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
}

fn required_env(name: &str) -> AppResult<String> {
    optional_env(name).ok_or_else(|| AppError::Validation(format!("{name} is required")))
}

fn parse_env_u64(name: &str, default: u64) -> AppResult<u64> {
    match env::var(name) {
        Ok(value) => value.trim().parse::<u64>().map_err(|error| {
            AppError::Validation(format!("invalid {name} value '{value}': {error}"))
        }),
        Err(_) => Ok(default),
    }
}
