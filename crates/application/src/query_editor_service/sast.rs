use super::*;

#[derive(Debug, Serialize)]
struct SastOverrideRequest<'a> {
    cwe: i64,
    executable: bool,
    description: i64,
    language: &'a str,
    group: &'a str,
    severity: &'a str,
    #[serde(rename = "sastId")]
    sast_id: u64,
    id: &'a str,
    name: &'a str,
    level: String,
    path: &'a str,
}

#[derive(Debug, Serialize)]
struct NewSastQueryRequest<'a> {
    name: &'a str,
    language: &'a str,
    group: &'a str,
    severity: &'a str,
    executable: bool,
    #[serde(skip_serializing_if = "is_zero")]
    cwe: i64,
    #[serde(skip_serializing_if = "is_zero")]
    description: i64,
}

fn is_zero(value: &i64) -> bool {
    *value == 0
}

impl QueryEditorService {
    /// Fetches a SAST query by editor key.
    pub async fn fetch_sast_query(
        &self,
        session: &AuditSession,
        editor_key: &str,
    ) -> AppResult<SastQuery> {
        debug!(session = %session, editor_key, "fetching sast query");
        let record: SastQueryRecord = send_json(
            self.transport.as_ref(),
            ApiMethod::Get,
            &query_path(session, editor_key),
            None,
        )
        .await?;

        let mut query = record.into_query();
        query.level_id = session.resolve_level_id(query.level);
        Ok(query)
    }

    /// Creates an override of `base` at `level` and returns it.
    ///
    /// Application-level overrides need a session whose project has exactly
    /// one owning application; this is checked before any call.
    pub async fn create_sast_override(
        &self,
        session: &AuditSession,
        level: QueryLevel,
        base: &SastQuery,
    ) -> AppResult<SastQuery> {
        require_engine(session, AuditEngine::Sast)?;
        require_override_level(session, level)?;

        info!(session = %session, query = %base, level = %level, "creating sast override");

        let request = SastOverrideRequest {
            cwe: base.cwe_id,
            executable: base.is_executable,
            description: base.description_id,
            language: &base.language,
            group: &base.group,
            severity: &base.severity,
            sast_id: base.sast_id,
            id: &base.editor_key,
            name: &base.name,
            level: level.request_name(),
            path: &base.path,
        };
        let editor_key = self
            .submit_new_query(session, to_body(&request)?)
            .await?;

        let mut created = self.fetch_sast_query(session, &editor_key).await?;
        created.level_id = session.resolve_level_id(level);
        if created.query_id == 0 {
            created.query_id = base.query_id;
        }
        Ok(created)
    }

    /// Creates a new custom SAST query and saves its source.
    ///
    /// A query whose source fails to compile is kept; the failures are
    /// returned alongside it.
    pub async fn create_sast_query(
        &self,
        session: &AuditSession,
        query: &SastQuery,
    ) -> AppResult<QueryChange<SastQuery>> {
        require_engine(session, AuditEngine::Sast)?;
        info!(session = %session, query = %query, "creating sast query");

        let request = NewSastQueryRequest {
            name: &query.name,
            language: &query.language,
            group: &query.group,
            severity: &query.severity,
            executable: query.is_executable,
            cwe: query.cwe_id.max(0),
            description: query.description_id.max(0),
        };
        let editor_key = self
            .submit_new_query(session, to_body(&request)?)
            .await?;

        let failures = self.save_source(session, &editor_key, &query.source).await?;
        let mut created = self.fetch_sast_query(session, &editor_key).await?;
        created.merge_from(query);
        if created.query_id == 0 {
            created.calculate_query_id();
        }

        Ok(QueryChange {
            query: created,
            failures,
        })
    }

    /// Replaces the source of an existing query. Unchanged source makes no
    /// call.
    pub async fn update_sast_source(
        &self,
        session: &AuditSession,
        query: &SastQuery,
        source: &str,
    ) -> AppResult<QueryChange<SastQuery>> {
        require_key(&query.editor_key, query)?;
        if source == query.source {
            debug!(query = %query, "source unchanged, skipping update");
            return Ok(QueryChange::unchanged(query.clone()));
        }

        let failures = self.save_source(session, &query.editor_key, source).await?;
        let mut updated = self.fetch_sast_query(session, &query.editor_key).await?;
        updated.merge_from(query);

        Ok(QueryChange {
            query: updated,
            failures,
        })
    }

    /// Replaces the metadata of an existing query. Unchanged metadata makes
    /// no call.
    pub async fn update_sast_metadata(
        &self,
        session: &AuditSession,
        query: &SastQuery,
        metadata: &SastQueryMetadata,
    ) -> AppResult<SastQuery> {
        require_key(&query.editor_key, query)?;
        if !query.metadata_differs(metadata) {
            debug!(query = %query, "metadata unchanged, skipping update");
            return Ok(query.clone());
        }

        self.save_metadata(session, &query.editor_key, to_body(metadata)?)
            .await?;
        let mut updated = self.fetch_sast_query(session, &query.editor_key).await?;
        updated.merge_from(query);
        Ok(updated)
    }

    /// Saves the source and metadata carried by `query`.
    pub async fn update_sast_query(
        &self,
        session: &AuditSession,
        query: &SastQuery,
    ) -> AppResult<QueryChange<SastQuery>> {
        require_key(&query.editor_key, query)?;

        let failures = self
            .save_source(session, &query.editor_key, &query.source)
            .await?;
        self.save_metadata(session, &query.editor_key, to_body(&query.metadata())?)
            .await?;

        let mut updated = self.fetch_sast_query(session, &query.editor_key).await?;
        updated.merge_from(query);
        Ok(QueryChange {
            query: updated,
            failures,
        })
    }

    /// Compiles `source` as the body of `query` without saving it.
    pub async fn validate_sast_source(
        &self,
        session: &AuditSession,
        query: &SastQuery,
        source: &str,
    ) -> AppResult<()> {
        require_key(&query.editor_key, query)?;
        self.validate_source(session, &query.editor_key, source)
            .await
    }
}
