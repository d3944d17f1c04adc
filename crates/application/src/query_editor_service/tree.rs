use super::*;

impl QueryEditorService {
    /// Lists the queries visible at `level`.
    ///
    /// Only Tenant and Project listings exist; `level_id` is the project id
    /// for the latter.
    pub async fn fetch_query_tree(
        &self,
        session: &AuditSession,
        level: QueryLevel,
        level_id: &str,
    ) -> AppResult<Vec<QueryTreeNode>> {
        let path = match level {
            QueryLevel::Tenant => queries_path(session),
            QueryLevel::Project => format!(
                "{}?projectId={}",
                queries_path(session),
                escape_path_segment(level_id)
            ),
            QueryLevel::Product | QueryLevel::Application => {
                return Err(AppError::Validation(format!(
                    "invalid listing level '{level}', options are Tenant or Project"
                )));
            }
        };

        debug!(session = %session, level = %level, level_id, "fetching query tree");
        let tree: Option<Vec<QueryTreeNode>> =
            send_json(self.transport.as_ref(), ApiMethod::Get, &path, None).await?;
        Ok(tree.unwrap_or_default())
    }

    /// Lists SAST queries at `level` as a flat collection.
    pub async fn fetch_sast_queries(
        &self,
        session: &AuditSession,
        level: QueryLevel,
        level_id: &str,
    ) -> AppResult<SastQueryCollection> {
        require_engine(session, AuditEngine::Sast)?;
        let tree = self.fetch_query_tree(session, level, level_id).await?;
        Ok(SastQueryCollection::from_tree(
            &tree,
            &session.resolve_level_id(QueryLevel::Application),
            level_id,
        ))
    }

    /// Lists IaC queries at `level` as a flat collection.
    pub async fn fetch_iac_queries(
        &self,
        session: &AuditSession,
        level: QueryLevel,
        level_id: &str,
    ) -> AppResult<IacQueryCollection> {
        require_engine(session, AuditEngine::Iac)?;
        let tree = self.fetch_query_tree(session, level, level_id).await?;
        Ok(IacQueryCollection::from_tree(
            &tree,
            &session.resolve_level_id(QueryLevel::Application),
            level_id,
        ))
    }

    /// Replaces listed IaC queries with their full record, including
    /// metadata and source. Returns the number of refreshed queries.
    pub async fn enrich_iac_collection(
        &self,
        session: &AuditSession,
        collection: &mut IacQueryCollection,
        custom_only: bool,
    ) -> AppResult<usize> {
        let mut refreshed = 0;
        for query in collection.iter_mut() {
            if custom_only && !query.custom {
                continue;
            }

            let mut complete = self.fetch_iac_query(session, &query.query_id).await?;
            complete.merge_from(query);
            complete.query_id.clone_from(&query.query_id);
            *query = complete;
            refreshed += 1;
        }

        debug!(session = %session, refreshed, "enriched iac collection");
        Ok(refreshed)
    }
}
