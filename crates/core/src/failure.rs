use std::fmt::{Display, Formatter};

use serde::{Deserialize, Deserializer, Serialize};

/// One compiler diagnostic reported for a submitted query.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryError {
    /// Line of the offending source, 1-based.
    #[serde(default)]
    pub line: u64,
    /// First column of the offending span.
    #[serde(default)]
    pub start_column: u64,
    /// Last column of the offending span.
    #[serde(default)]
    pub end_column: u64,
    /// Compiler diagnostic code; numeric on the wire for most compilers.
    #[serde(default, deserialize_with = "code_as_text")]
    pub code: String,
    /// Human-readable diagnostic.
    #[serde(default)]
    pub message: String,
}

/// Compilation or validation failure for one submitted query.
///
/// Failures never invalidate the audit session they were produced in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryFailure {
    /// Editor key or identifier of the query that failed.
    #[serde(default)]
    pub query_id: String,
    /// Diagnostics produced for the query.
    #[serde(default, rename = "error")]
    pub errors: Vec<QueryError>,
}

impl Display for QueryFailure {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "query {}", self.query_id)?;
        for error in &self.errors {
            write!(
                formatter,
                "; line {} [{}-{}] {}: {}",
                error.line, error.start_column, error.end_column, error.code, error.message
            )?;
        }
        Ok(())
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum DiagnosticCode {
    Text(String),
    Signed(i64),
    Unsigned(u64),
}

fn code_as_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<DiagnosticCode>::deserialize(deserializer)? {
        Some(DiagnosticCode::Text(text)) => text,
        Some(DiagnosticCode::Signed(code)) => code.to_string(),
        Some(DiagnosticCode::Unsigned(code)) => code.to_string(),
        None => String::new(),
    })
}

/// Joins failures into a single diagnostic line.
#[must_use]
pub fn describe_failures(failures: &[QueryFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" | ")
}
