//! Audit session handle and scope resolution.
//!
//! An [`AuditSession`] is owned by exactly one caller. Every mutation goes
//! through a `&mut self` method, so concurrent use of the same session needs
//! explicit synchronization by whoever shares it.

use std::fmt::{Display, Formatter};

use auditkit_core::{AppError, AppResult, NonEmptyString};
use chrono::{DateTime, Duration, Utc};

use crate::{ApplicationOwnership, AsyncResult, AuditEngine, QueryLevel};

/// Minimum time between two remote keep-alive calls.
pub const HEARTBEAT_INTERVAL_SECONDS: i64 = 5 * 60;

/// What a new audit session should be scoped to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScopeSelector {
    /// Tenant-wide session narrowed by a language/platform filter key.
    Tenant {
        /// Filter key, for example a language key.
        filter: String,
    },
    /// Session compiled against the sources of one scan.
    Project {
        /// Project the scan belongs to.
        project_id: NonEmptyString,
        /// Scan whose sources are loaded.
        scan_id: NonEmptyString,
    },
}

impl ScopeSelector {
    /// Creates a tenant-scoped selector.
    #[must_use]
    pub fn tenant(filter: impl Into<String>) -> Self {
        Self::Tenant {
            filter: filter.into(),
        }
    }

    /// Creates a project-scoped selector.
    pub fn project(project_id: impl Into<String>, scan_id: impl Into<String>) -> AppResult<Self> {
        let project_id = NonEmptyString::new(project_id)
            .map_err(|_| AppError::Validation("project id must not be empty".to_owned()))?;
        let scan_id = NonEmptyString::new(scan_id)
            .map_err(|_| AppError::Validation("scan id must not be empty".to_owned()))?;

        Ok(Self::Project {
            project_id,
            scan_id,
        })
    }
}

/// Scope of an allocated audit session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionScope {
    /// Tenant-wide session; project and application ids are empty.
    Tenant,
    /// Session bound to a project.
    Project {
        /// Project identifier.
        project_id: String,
        /// Project name, empty when the directory lookup failed.
        project_name: String,
        /// Owning application of the project.
        application: ApplicationOwnership,
    },
}

/// A provisioned remote compilation context.
#[derive(Debug, Clone)]
pub struct AuditSession {
    id: String,
    engine: AuditEngine,
    scope: SessionScope,
    languages: Vec<String>,
    platforms: Vec<String>,
    created_at: DateTime<Utc>,
    last_heartbeat: DateTime<Utc>,
}

impl AuditSession {
    /// Creates a session handle allocated at `created_at`.
    ///
    /// The handle has no capabilities until [`Self::apply_capabilities`]
    /// succeeds.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        engine: AuditEngine,
        scope: SessionScope,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            engine,
            scope,
            languages: Vec::new(),
            platforms: Vec::new(),
            created_at,
            last_heartbeat: created_at,
        }
    }

    /// Returns the opaque session id.
    #[must_use]
    pub fn id(&self) -> &str {
        self.id.as_str()
    }

    /// Returns the engine backing this session.
    #[must_use]
    pub fn engine(&self) -> AuditEngine {
        self.engine
    }

    /// Returns the session scope.
    #[must_use]
    pub fn scope(&self) -> &SessionScope {
        &self.scope
    }

    /// Returns the project id, empty for tenant sessions.
    #[must_use]
    pub fn project_id(&self) -> &str {
        match &self.scope {
            SessionScope::Tenant => "",
            SessionScope::Project { project_id, .. } => project_id.as_str(),
        }
    }

    /// Returns the project name, empty for tenant sessions.
    #[must_use]
    pub fn project_name(&self) -> &str {
        match &self.scope {
            SessionScope::Tenant => "",
            SessionScope::Project { project_name, .. } => project_name.as_str(),
        }
    }

    /// Returns the application owning the session's project.
    #[must_use]
    pub fn application(&self) -> &ApplicationOwnership {
        const UNOWNED: &ApplicationOwnership = &ApplicationOwnership::Unowned;
        match &self.scope {
            SessionScope::Tenant => UNOWNED,
            SessionScope::Project { application, .. } => application,
        }
    }

    /// Languages compiled by a SAST session.
    #[must_use]
    pub fn languages(&self) -> &[String] {
        self.languages.as_slice()
    }

    /// Platforms supported by an IaC session.
    #[must_use]
    pub fn platforms(&self) -> &[String] {
        self.platforms.as_slice()
    }

    /// Languages or platforms, depending on the engine.
    #[must_use]
    pub fn capabilities(&self) -> &[String] {
        match self.engine {
            AuditEngine::Sast => self.languages(),
            AuditEngine::Iac => self.platforms(),
        }
    }

    /// Whether the session has the capabilities its engine requires.
    #[must_use]
    pub fn is_usable(&self) -> bool {
        !self.capabilities().is_empty()
    }

    /// When the session was allocated.
    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// When the session was last refreshed.
    #[must_use]
    pub fn last_heartbeat(&self) -> DateTime<Utc> {
        self.last_heartbeat
    }

    /// Stores the capability list discovered during allocation.
    ///
    /// SAST sessions accept only a language list and IaC sessions only a
    /// platform list. An empty list leaves the session unusable and is
    /// reported as an allocation error.
    pub fn apply_capabilities(&mut self, capabilities: AsyncResult) -> AppResult<()> {
        match (self.engine, capabilities) {
            (AuditEngine::Sast, AsyncResult::Languages(languages)) => {
                if languages.is_empty() {
                    return Err(AppError::Allocation(format!(
                        "session {} reported no languages",
                        self.id
                    )));
                }
                self.languages = languages;
                Ok(())
            }
            (AuditEngine::Iac, AsyncResult::Platforms(platforms)) => {
                if platforms.is_empty() {
                    return Err(AppError::Allocation(format!(
                        "session {} reported no platforms",
                        self.id
                    )));
                }
                self.platforms = platforms;
                Ok(())
            }
            (engine, other) => Err(AppError::Internal(format!(
                "{engine} session cannot take capabilities from {}",
                other.kind()
            ))),
        }
    }

    /// Whether enough time passed since the last heartbeat to refresh again.
    #[must_use]
    pub fn heartbeat_due(&self, now: DateTime<Utc>) -> bool {
        now - self.last_heartbeat >= Duration::seconds(HEARTBEAT_INTERVAL_SECONDS)
    }

    /// Records a successful heartbeat. Earlier timestamps are ignored.
    pub fn record_heartbeat(&mut self, at: DateTime<Utc>) {
        if at > self.last_heartbeat {
            self.last_heartbeat = at;
        }
    }

    /// Resolves the level id of `level` within this session.
    ///
    /// Product and Tenant resolve to their fixed level names, Application to
    /// the owning application and Project to the session's project.
    #[must_use]
    pub fn resolve_level_id(&self, level: QueryLevel) -> String {
        match level {
            QueryLevel::Product | QueryLevel::Tenant => level.as_str().to_owned(),
            QueryLevel::Application => self.application().level_id().to_owned(),
            QueryLevel::Project => self.project_id().to_owned(),
        }
    }

    /// Case-insensitive language membership check.
    #[must_use]
    pub fn has_language(&self, language: &str) -> bool {
        self.languages
            .iter()
            .any(|candidate| candidate.eq_ignore_ascii_case(language))
    }

    /// Case-insensitive platform membership check.
    #[must_use]
    pub fn has_platform(&self, platform: &str) -> bool {
        self.platforms
            .iter()
            .any(|candidate| candidate.eq_ignore_ascii_case(platform))
    }
}

impl Display for AuditSession {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        let now = Utc::now();
        let age = (now - self.created_at).num_seconds().max(0);
        let since_refresh = (now - self.last_heartbeat).num_seconds().max(0);
        let capabilities = self.capabilities().join(",");
        let engine = self.engine.as_str().to_uppercase();

        match &self.scope {
            SessionScope::Tenant => write!(
                formatter,
                "{engine} Audit Session {} (Tenant - {capabilities}) [{age}s/{since_refresh}s]",
                shorten_guid(&self.id)
            ),
            SessionScope::Project {
                project_id,
                application: ApplicationOwnership::Owned(application_id),
                ..
            } => write!(
                formatter,
                "{engine} Audit Session {} (Project {}/Application {} - {capabilities}) [{age}s/{since_refresh}s]",
                shorten_guid(&self.id),
                shorten_guid(project_id),
                shorten_guid(application_id)
            ),
            SessionScope::Project { project_id, .. } => write!(
                formatter,
                "{engine} Audit Session {} (Project {} - {capabilities}) [{age}s/{since_refresh}s]",
                shorten_guid(&self.id),
                shorten_guid(project_id)
            ),
        }
    }
}

/// Shortens an identifier for log output.
#[must_use]
pub fn shorten_guid(guid: &str) -> String {
    let chars: Vec<char> = guid.chars().collect();
    if chars.len() <= 8 {
        return guid.to_owned();
    }

    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}..{tail}")
}
