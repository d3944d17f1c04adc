use auditkit_core::{AppError, AppResult, QueryFailure};
use serde_json::Value;

/// What the caller expects a completed async request to carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AsyncExpectation {
    /// Language detection for a new SAST session.
    Languages,
    /// Creation of a query; the value names the new query id.
    CreatedQuery,
    /// Source save, validation or run; the value may list failed queries.
    QueryFailures,
    /// Only completion matters, the value is ignored.
    Completion,
}

/// Decoded result of a completed async request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AsyncResult {
    /// Languages present in the scanned sources.
    Languages(Vec<String>),
    /// Platforms supported by an IaC session.
    Platforms(Vec<String>),
    /// Identifier of a freshly created query.
    CreatedQuery {
        /// Editor key (SAST) or query id (IaC) of the created query.
        id: String,
    },
    /// Queries that failed to compile; may be empty.
    FailedQueries(Vec<QueryFailure>),
    /// The request completed without a meaningful value.
    Empty,
}

impl AsyncResult {
    /// Decodes a raw completion value according to the caller's expectation.
    pub fn decode(expectation: AsyncExpectation, value: Value) -> AppResult<Self> {
        match expectation {
            AsyncExpectation::Languages => decode_string_list(value)
                .map(Self::Languages)
                .ok_or_else(|| {
                    AppError::Decode("failed to get languages from request value".to_owned())
                }),
            AsyncExpectation::CreatedQuery => value
                .get("id")
                .and_then(Value::as_str)
                .map(|id| Self::CreatedQuery { id: id.to_owned() })
                .ok_or_else(|| {
                    AppError::Decode(format!(
                        "query creation result carries no id: {value}"
                    ))
                }),
            AsyncExpectation::QueryFailures => match value.get("failed_queries") {
                None | Some(Value::Null) => Ok(Self::Empty),
                Some(failures) => serde_json::from_value::<Vec<QueryFailure>>(failures.clone())
                    .map(Self::FailedQueries)
                    .map_err(|error| {
                        AppError::Decode(format!("failed to decode failed_queries: {error}"))
                    }),
            },
            AsyncExpectation::Completion => Ok(Self::Empty),
        }
    }

    /// Returns a short name of the variant for diagnostics.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Languages(_) => "language list",
            Self::Platforms(_) => "platform list",
            Self::CreatedQuery { .. } => "created query id",
            Self::FailedQueries(_) => "failed query list",
            Self::Empty => "empty result",
        }
    }

    /// Takes the failure list out of a source, validate or run result.
    #[must_use]
    pub fn into_failures(self) -> Vec<QueryFailure> {
        match self {
            Self::FailedQueries(failures) => failures,
            _ => Vec::new(),
        }
    }
}

fn decode_string_list(value: Value) -> Option<Vec<String>> {
    let Value::Array(items) = value else {
        return None;
    };

    items
        .into_iter()
        .map(|item| match item {
            Value::String(text) => Some(text),
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{AsyncExpectation, AsyncResult};

    #[test]
    fn languages_decode_from_string_array() {
        let result = AsyncResult::decode(AsyncExpectation::Languages, json!(["Java", "Go"]));
        assert_eq!(
            result.ok(),
            Some(AsyncResult::Languages(vec!["Java".to_owned(), "Go".to_owned()]))
        );
    }

    #[test]
    fn languages_reject_mixed_arrays() {
        assert!(AsyncResult::decode(AsyncExpectation::Languages, json!(["Java", 3])).is_err());
        assert!(AsyncResult::decode(AsyncExpectation::Languages, json!({"a": 1})).is_err());
    }

    #[test]
    fn created_query_needs_an_id() {
        let result = AsyncResult::decode(AsyncExpectation::CreatedQuery, json!({"id": "KEY"}));
        assert_eq!(
            result.ok(),
            Some(AsyncResult::CreatedQuery {
                id: "KEY".to_owned()
            })
        );
        assert!(AsyncResult::decode(AsyncExpectation::CreatedQuery, json!(null)).is_err());
    }

    #[test]
    fn failures_are_optional() {
        let empty = AsyncResult::decode(AsyncExpectation::QueryFailures, json!({}));
        assert_eq!(empty.ok(), Some(AsyncResult::Empty));

        let failed = AsyncResult::decode(
            AsyncExpectation::QueryFailures,
            json!({"failed_queries": [{"query_id": "Q", "error": []}]}),
        );
        let failures = failed.map(AsyncResult::into_failures).unwrap_or_default();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].query_id, "Q");
    }

    #[test]
    fn completion_ignores_value() {
        let result = AsyncResult::decode(AsyncExpectation::Completion, json!([1, 2, 3]));
        assert_eq!(result.ok(), Some(AsyncResult::Empty));
    }
}
