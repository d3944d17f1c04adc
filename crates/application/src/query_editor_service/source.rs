use super::*;

impl QueryEditorService {
    /// Compiles `source` for the query `key` without saving it.
    ///
    /// Compilation errors surface as [`AppError::QueryCompilation`].
    pub async fn validate_source(
        &self,
        session: &AuditSession,
        key: &str,
        source: &str,
    ) -> AppResult<()> {
        debug!(session = %session, key, "validating query source");
        let failures = self
            .probe_source(session, "validate", key, source)
            .await?;
        compilation_result(failures)
    }

    /// Runs `source` for the query `key` against the session's scan
    /// without saving it.
    ///
    /// A run reports at most one failure record; more than one is a
    /// [`AppError::Decode`] error.
    pub async fn run_query(&self, session: &AuditSession, key: &str, source: &str) -> AppResult<()> {
        debug!(session = %session, key, "running query source");
        let mut failures = self.probe_source(session, "run", key, source).await?;
        if failures.len() > 1 {
            return Err(AppError::Decode(format!(
                "query run for '{key}' returned {} failure records, expected at most one",
                failures.len()
            )));
        }

        match failures.pop() {
            Some(failure) => Err(AppError::QueryCompilation(vec![failure])),
            None => Ok(()),
        }
    }

    /// Deletes the override stored under `key`.
    ///
    /// Deleting a key that does not exist fails with the platform's error.
    pub async fn delete_override(&self, session: &AuditSession, key: &str) -> AppResult<()> {
        info!(session = %session, key, "deleting query override");
        self.submit(
            session,
            ApiMethod::Delete,
            &query_path(session, key),
            None,
            "query deletion",
            AsyncExpectation::Completion,
        )
        .await?;
        Ok(())
    }

    pub(super) async fn save_source(
        &self,
        session: &AuditSession,
        key: &str,
        source: &str,
    ) -> AppResult<Vec<QueryFailure>> {
        debug!(session = %session, key, "saving query source");
        let body = to_body(&[SourceUpdate { id: key, source }])?;
        let result = self
            .submit(
                session,
                ApiMethod::Put,
                &format!("{}/source", queries_path(session)),
                Some(body),
                "source update",
                AsyncExpectation::QueryFailures,
            )
            .await?;
        Ok(result.into_failures())
    }

    pub(super) async fn save_metadata(
        &self,
        session: &AuditSession,
        key: &str,
        metadata: Value,
    ) -> AppResult<()> {
        debug!(session = %session, key, "saving query metadata");
        self.submit(
            session,
            ApiMethod::Put,
            &format!("{}/metadata", query_path(session, key)),
            Some(metadata),
            "metadata update",
            AsyncExpectation::Completion,
        )
        .await?;
        Ok(())
    }

    async fn probe_source(
        &self,
        session: &AuditSession,
        action: &str,
        key: &str,
        source: &str,
    ) -> AppResult<Vec<QueryFailure>> {
        let body = to_body(&[SourceUpdate { id: key, source }])?;
        let result = self
            .submit(
                session,
                ApiMethod::Post,
                &format!("{}/{action}", queries_path(session)),
                Some(body),
                action,
                AsyncExpectation::QueryFailures,
            )
            .await?;
        Ok(result.into_failures())
    }
}

fn compilation_result(failures: Vec<QueryFailure>) -> AppResult<()> {
    if failures.is_empty() {
        return Ok(());
    }
    Err(AppError::QueryCompilation(failures))
}
