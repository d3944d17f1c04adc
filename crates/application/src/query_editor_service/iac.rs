use super::*;

#[derive(Debug, Serialize)]
struct IacOverrideRequest<'a> {
    id: &'a str,
    queryname: &'a str,
    oldseverity: &'a str,
    level: String,
    name: &'a str,
    path: &'a str,
    group: &'a str,
    category: &'a str,
    platform: &'a str,
    severity: &'a str,
    description: &'a str,
    #[serde(rename = "descriptionId")]
    description_id: &'a str,
    #[serde(rename = "descriptionUrl")]
    description_url: &'a str,
    cwe: &'a str,
}

#[derive(Debug, Serialize)]
struct NewIacQueryRequest<'a> {
    category: &'a str,
    cwe: &'a str,
    description: &'a str,
    descriptionurl: &'a str,
    platform: &'a str,
    queryname: &'a str,
    severity: &'a str,
}

impl QueryEditorService {
    /// Fetches an IaC query with metadata and source.
    pub async fn fetch_iac_query(
        &self,
        session: &AuditSession,
        query_id: &str,
    ) -> AppResult<IacQuery> {
        debug!(session = %session, query_id, "fetching iac query");
        let path = format!(
            "{}?includeMetadata=true&includeSource=true",
            query_path(session, query_id)
        );
        let record: IacQueryRecord =
            send_json(self.transport.as_ref(), ApiMethod::Get, &path, None).await?;

        let mut query = record.into_query();
        query.level_id = session.resolve_level_id(query.level);
        Ok(query)
    }

    /// Creates an override of `base` at `level` and returns it.
    ///
    /// A base without description is completed from the query editor first.
    pub async fn create_iac_override(
        &self,
        session: &AuditSession,
        level: QueryLevel,
        base: &IacQuery,
    ) -> AppResult<IacQuery> {
        require_engine(session, AuditEngine::Iac)?;
        require_override_level(session, level)?;

        info!(session = %session, query = %base, level = %level, "creating iac override");

        let mut base = base.clone();
        if base.description.is_empty() {
            debug!(query = %base, "loading base query metadata before override");
            let complete = self.fetch_iac_query(session, &base.query_id).await?;
            base.merge_from(&complete);
        }

        let request = IacOverrideRequest {
            id: &base.query_id,
            queryname: &base.name,
            oldseverity: &base.severity,
            level: level.request_name(),
            name: &base.name,
            path: &base.path,
            group: &base.group,
            category: &base.category,
            platform: &base.platform,
            severity: &base.severity,
            description: &base.description,
            description_id: &base.description_id,
            description_url: &base.description_url,
            cwe: &base.cwe,
        };
        let query_id = self
            .submit_new_query(session, to_body(&request)?)
            .await?;

        let mut created = self.fetch_iac_query(session, &query_id).await?;
        created.level_id = session.resolve_level_id(level);
        if created.query_id.is_empty()
            && let Some(override_id) = base.override_id(level)
        {
            created.query_id = override_id;
        }
        created.merge_from(&base);
        Ok(created)
    }

    /// Creates a new custom IaC query and saves its source.
    pub async fn create_iac_query(
        &self,
        session: &AuditSession,
        query: &IacQuery,
    ) -> AppResult<QueryChange<IacQuery>> {
        require_engine(session, AuditEngine::Iac)?;
        info!(session = %session, query = %query, "creating iac query");

        let request = NewIacQueryRequest {
            category: &query.category,
            cwe: &query.cwe,
            description: &query.description,
            descriptionurl: &query.description_url,
            platform: &query.platform,
            queryname: &query.name,
            severity: &query.severity,
        };
        let query_id = self
            .submit_new_query(session, to_body(&request)?)
            .await?;

        let failures = self.save_source(session, &query_id, &query.source).await?;
        let mut created = self.fetch_iac_query(session, &query_id).await?;
        created.merge_from(query);

        Ok(QueryChange {
            query: created,
            failures,
        })
    }

    /// Replaces the source of an existing query. Unchanged source makes no
    /// call.
    pub async fn update_iac_source(
        &self,
        session: &AuditSession,
        query: &IacQuery,
        source: &str,
    ) -> AppResult<QueryChange<IacQuery>> {
        require_key(&query.query_id, query)?;
        if source == query.source {
            debug!(query = %query, "source unchanged, skipping update");
            return Ok(QueryChange::unchanged(query.clone()));
        }

        let failures = self.save_source(session, &query.query_id, source).await?;
        let mut updated = self.fetch_iac_query(session, &query.query_id).await?;
        updated.merge_from(query);

        Ok(QueryChange {
            query: updated,
            failures,
        })
    }

    /// Replaces the metadata of an existing query. Unchanged metadata makes
    /// no call.
    pub async fn update_iac_metadata(
        &self,
        session: &AuditSession,
        query: &IacQuery,
        metadata: &IacQueryMetadata,
    ) -> AppResult<IacQuery> {
        require_key(&query.query_id, query)?;
        if !query.metadata_differs(metadata) {
            debug!(query = %query, "metadata unchanged, skipping update");
            return Ok(query.clone());
        }

        self.save_metadata(session, &query.query_id, to_body(metadata)?)
            .await?;
        let mut updated = self.fetch_iac_query(session, &query.query_id).await?;
        updated.merge_from(query);
        Ok(updated)
    }

    /// Saves the source and metadata carried by `query`.
    pub async fn update_iac_query(
        &self,
        session: &AuditSession,
        query: &IacQuery,
    ) -> AppResult<QueryChange<IacQuery>> {
        require_key(&query.query_id, query)?;

        let failures = self
            .save_source(session, &query.query_id, &query.source)
            .await?;
        self.save_metadata(session, &query.query_id, to_body(&query.metadata())?)
            .await?;

        let mut updated = self.fetch_iac_query(session, &query.query_id).await?;
        updated.merge_from(query);
        Ok(QueryChange {
            query: updated,
            failures,
        })
    }
}
