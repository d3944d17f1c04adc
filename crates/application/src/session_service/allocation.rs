use super::*;

impl AuditSessionService {
    /// Allocates a new audit session and waits until it is usable.
    ///
    /// The engine name is validated before any network call. SAST sessions
    /// resolve their language list through the poller, IaC sessions read
    /// their platforms from the allocation response.
    pub async fn create_session(
        &self,
        engine: &str,
        selector: ScopeSelector,
    ) -> AppResult<AuditSession> {
        let engine = AuditEngine::from_str(engine)?;
        let scope = self.resolve_scope(&selector).await;

        let request = match &selector {
            ScopeSelector::Tenant { filter } => CreateSessionRequest::Tenant {
                scanner: engine.as_str(),
                filter,
            },
            ScopeSelector::Project {
                project_id,
                scan_id,
            } => CreateSessionRequest::Project {
                project_id: project_id.as_str(),
                scan_id: scan_id.as_str(),
                scanner: engine.as_str(),
            },
        };

        debug!(engine = %engine, selector = ?selector, "allocating audit session");

        let response: CreateSessionResponse = send_json(
            self.transport.as_ref(),
            ApiMethod::Post,
            SESSIONS_PATH,
            Some(to_body(&request)?),
        )
        .await?;

        if response.data.status != engine.ready_status() {
            return Err(AppError::Allocation(format!(
                "{engine} session reported status '{}', expected '{}'",
                response.data.status,
                engine.ready_status()
            )));
        }

        let mut session = AuditSession::new(response.id, engine, scope, Utc::now());
        let capabilities = match engine {
            AuditEngine::Sast => {
                self.poller
                    .poll(&session, &response.data.request_id, AsyncExpectation::Languages)
                    .await?
            }
            AuditEngine::Iac => {
                AsyncResult::Platforms(response.data.query_filters.unwrap_or_default())
            }
        };
        session.apply_capabilities(capabilities)?;

        info!(session = %session, "created audit session");
        Ok(session)
    }

    /// Creates a project session, loads its sources and runs the initial
    /// scan, refreshing the session before and after.
    ///
    /// When any step after allocation fails, the remote session is deleted
    /// before the error is returned.
    pub async fn open_project_session(
        &self,
        engine: &str,
        project_id: &str,
        scan_id: &str,
    ) -> AppResult<AuditSession> {
        info!(project_id, scan_id, "opening audit session for scan");

        let selector = ScopeSelector::project(project_id, scan_id)?;
        let mut session = self.create_session(engine, selector).await?;

        if let Err(error) = self.prepare_project_session(&mut session).await {
            warn!(session = %session, error = %error, "audit session setup failed, deleting it");
            if let Err(teardown_error) = self.teardown(Some(session)).await {
                warn!(error = %teardown_error, "failed to delete audit session after setup failure");
            }
            return Err(error);
        }

        Ok(session)
    }

    async fn prepare_project_session(&self, session: &mut AuditSession) -> AppResult<()> {
        self.keep_alive(session).await?;
        let sources = self.scan_sources(session).await?;
        debug!(
            session = %session,
            files = sources.iter().map(ScanSourceNode::file_count).sum::<usize>(),
            "loaded scan sources"
        );
        self.run_scan(session).await?;
        self.keep_alive(session).await
    }

    async fn resolve_scope(&self, selector: &ScopeSelector) -> SessionScope {
        let ScopeSelector::Project { project_id, .. } = selector else {
            return SessionScope::Tenant;
        };

        let (project_name, application) =
            match self.project_directory.project_by_id(project_id.as_str()).await {
                Ok(project) => {
                    let ownership = project.ownership();
                    if ownership == ApplicationOwnership::Ambiguous {
                        warn!(
                            project_id = project_id.as_str(),
                            "project has several owning applications"
                        );
                    }
                    (project.name, ownership)
                }
                Err(error) => {
                    warn!(
                        project_id = project_id.as_str(),
                        error = %error,
                        "project lookup failed, continuing without owning application"
                    );
                    (String::new(), ApplicationOwnership::Unowned)
                }
            };

        SessionScope::Project {
            project_id: project_id.as_str().to_owned(),
            project_name,
            application,
        }
    }
}
