use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::{QueryLevel, calculate_editor_key, calculate_query_id};

/// A SAST detection rule: a vendor base query or a scope-level override.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SastQuery {
    /// Platform-wide numeric id, shared by a base query and its overrides.
    pub query_id: u64,
    /// Scope level of this copy.
    pub level: QueryLevel,
    /// Owning entity of the level (see `AuditSession::resolve_level_id`).
    pub level_id: String,
    /// Virtual source path.
    pub path: String,
    /// Query source code.
    pub source: String,
    /// Query name.
    pub name: String,
    /// Query group.
    pub group: String,
    /// Query language.
    pub language: String,
    /// Result severity.
    pub severity: String,
    /// CWE identifier.
    pub cwe_id: i64,
    /// Whether the query produces results on its own.
    pub is_executable: bool,
    /// Id of the vendor description.
    pub description_id: i64,
    /// Legacy SAST engine id.
    pub sast_id: u64,
    /// True for every level except Product.
    pub custom: bool,
    /// Query-editor key of this copy.
    pub editor_key: String,
}

impl SastQuery {
    /// Returns the editable metadata of this query.
    #[must_use]
    pub fn metadata(&self) -> SastQueryMetadata {
        SastQueryMetadata {
            cwe: self.cwe_id,
            description_id: self.description_id,
            is_executable: self.is_executable,
            group: self.group.clone(),
            language: self.language.clone(),
            severity: self.severity.clone(),
            sast_id: self.sast_id,
            name: self.name.clone(),
        }
    }

    /// Field-wise comparison of the current metadata with `metadata`.
    #[must_use]
    pub fn metadata_differs(&self, metadata: &SastQueryMetadata) -> bool {
        self.metadata() != *metadata
    }

    /// Fills fields left empty by the query editor from another copy of the
    /// same query.
    pub fn merge_from(&mut self, other: &Self) {
        if self.query_id == 0 {
            self.query_id = other.query_id;
        }
        fill_if_empty(&mut self.level_id, &other.level_id);
        fill_if_empty(&mut self.path, &other.path);
        fill_if_empty(&mut self.source, &other.source);
        fill_if_empty(&mut self.name, &other.name);
        fill_if_empty(&mut self.group, &other.group);
        fill_if_empty(&mut self.language, &other.language);
        fill_if_empty(&mut self.severity, &other.severity);
        fill_if_empty(&mut self.editor_key, &other.editor_key);
        if self.cwe_id == 0 {
            self.cwe_id = other.cwe_id;
        }
        if self.description_id == 0 {
            self.description_id = other.description_id;
        }
        if self.sast_id == 0 {
            self.sast_id = other.sast_id;
        }
    }

    /// Recomputes and stores the editor key from level, language, group and
    /// name.
    pub fn calculate_editor_key(&mut self) -> &str {
        self.editor_key = calculate_editor_key(self.level, &self.language, &self.group, &self.name);
        self.editor_key.as_str()
    }

    /// Recomputes and stores the platform-wide query id.
    pub fn calculate_query_id(&mut self) -> u64 {
        self.query_id = calculate_query_id(&self.language, &self.group, &self.name);
        self.query_id
    }
}

impl Display for SastQuery {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            formatter,
            "{} -> {} -> {} ({} {})",
            self.language, self.group, self.name, self.level, self.level_id
        )
    }
}

/// Editable metadata of a SAST query as exchanged with the query editor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SastQueryMetadata {
    /// CWE identifier.
    #[serde(default, skip_serializing_if = "is_zero_i64")]
    pub cwe: i64,
    /// Id of the vendor description.
    #[serde(default, rename = "description", skip_serializing_if = "is_zero_i64")]
    pub description_id: i64,
    /// Whether the query produces results on its own.
    #[serde(default, rename = "executable")]
    pub is_executable: bool,
    /// Query group.
    #[serde(default)]
    pub group: String,
    /// Query language.
    #[serde(default)]
    pub language: String,
    /// Result severity.
    #[serde(default)]
    pub severity: String,
    /// Legacy SAST engine id.
    #[serde(default, rename = "sastId", skip_serializing_if = "is_zero_u64")]
    pub sast_id: u64,
    /// Query name.
    #[serde(default)]
    pub name: String,
}

/// Query record returned by `GET .../queries/{key}`.
#[derive(Debug, Clone, Deserialize)]
pub struct SastQueryRecord {
    /// Editor key.
    #[serde(rename = "id")]
    pub key: String,
    /// Query name.
    #[serde(default)]
    pub name: String,
    /// Scope level.
    pub level: QueryLevel,
    /// Virtual source path.
    #[serde(default)]
    pub path: String,
    /// Query source code.
    #[serde(default)]
    pub source: String,
    /// Query metadata.
    #[serde(default)]
    pub metadata: SastQueryMetadata,
}

impl SastQueryRecord {
    /// Converts the record into a typed query without a level id.
    ///
    /// The query editor does not report the platform query id, it stays zero
    /// until back-filled by the caller.
    #[must_use]
    pub fn into_query(self) -> SastQuery {
        let name = if self.name.is_empty() {
            self.metadata.name.clone()
        } else {
            self.name
        };

        SastQuery {
            query_id: 0,
            level: self.level,
            level_id: String::new(),
            path: self.path,
            source: self.source,
            name,
            group: self.metadata.group,
            language: self.metadata.language,
            severity: self.metadata.severity,
            cwe_id: self.metadata.cwe,
            is_executable: self.metadata.is_executable,
            description_id: self.metadata.description_id,
            sast_id: self.metadata.sast_id,
            custom: self.level != QueryLevel::Product,
            editor_key: self.key,
        }
    }
}

pub(crate) fn fill_if_empty(target: &mut String, fallback: &str) {
    if target.is_empty() {
        fallback.clone_into(target);
    }
}

fn is_zero_i64(value: &i64) -> bool {
    *value == 0
}

fn is_zero_u64(value: &u64) -> bool {
    *value == 0
}
