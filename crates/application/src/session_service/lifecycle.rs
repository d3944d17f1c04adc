use super::*;

impl AuditSessionService {
    /// Refreshes the remote session when the last heartbeat is older than
    /// five minutes; otherwise does nothing.
    pub async fn keep_alive(&self, session: &mut AuditSession) -> AppResult<()> {
        let now = Utc::now();
        if !session.heartbeat_due(now) {
            debug!(session = %session, "session refreshed recently, skipping keep-alive");
            return Ok(());
        }

        self.transport
            .send(ApiMethod::Patch, &session_path(session), None)
            .await?;
        session.record_heartbeat(now);
        debug!(session = %session, "refreshed audit session");
        Ok(())
    }

    /// Deletes the remote session. `None` is accepted and makes no call.
    pub async fn teardown(&self, session: Option<AuditSession>) -> AppResult<()> {
        let Some(session) = session else {
            debug!("no audit session to tear down");
            return Ok(());
        };

        self.transport
            .send(ApiMethod::Delete, &session_path(&session), None)
            .await?;
        info!(session = %session, "deleted audit session");
        Ok(())
    }

    /// Lists the scanned sources loaded into the session.
    pub async fn scan_sources(&self, session: &AuditSession) -> AppResult<Vec<ScanSourceNode>> {
        debug!(session = %session, "fetching scan sources");
        let sources: Option<Vec<ScanSourceNode>> = send_json(
            self.transport.as_ref(),
            ApiMethod::Get,
            &format!("{}/sources", session_path(session)),
            None,
        )
        .await?;
        Ok(sources.unwrap_or_default())
    }

    /// Triggers a scan of the loaded sources and waits for it to finish.
    pub async fn run_scan(&self, session: &AuditSession) -> AppResult<()> {
        info!(session = %session, "triggering audit scan");
        let response: RequestIdBody = send_json(
            self.transport.as_ref(),
            ApiMethod::Post,
            &format!("{}/sources/scan", session_path(session)),
            None,
        )
        .await?;
        let request_id = response.into_request_id("audit scan")?;

        self.poller
            .poll(session, &request_id, AsyncExpectation::Completion)
            .await
            .inspect_err(|error| warn!(session = %session, error = %error, "audit scan failed"))?;
        Ok(())
    }
}
