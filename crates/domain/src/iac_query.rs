use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::QueryLevel;
use crate::sast_query::fill_if_empty;

/// An infrastructure-as-code detection rule.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IacQuery {
    /// Platform query id, `x:<uuid>` where `x` is the level letter.
    pub query_id: String,
    /// Editor key: the query id without its level prefix.
    pub key: String,
    /// Scope level of this copy.
    pub level: QueryLevel,
    /// Owning entity of the level.
    pub level_id: String,
    /// Virtual source path.
    pub path: String,
    /// Rego source of the query.
    pub source: String,
    /// Query name.
    pub name: String,
    /// Query category.
    pub category: String,
    /// Target platform, e.g. `Terraform`.
    pub platform: String,
    /// Query group.
    pub group: String,
    /// Result severity.
    pub severity: String,
    /// True for every level except Product.
    pub custom: bool,
    /// Description text.
    pub description: String,
    /// Description id.
    pub description_id: String,
    /// Link to the vendor documentation.
    pub description_url: String,
    /// CWE identifier.
    pub cwe: String,
}

impl IacQuery {
    /// Returns the editable metadata of this query.
    #[must_use]
    pub fn metadata(&self) -> IacQueryMetadata {
        IacQueryMetadata {
            category: self.category.clone(),
            cwe: self.cwe.clone(),
            description: self.description.clone(),
            description_id: self.description_id.clone(),
            description_url: self.description_url.clone(),
            platform: self.platform.clone(),
            severity: self.severity.clone(),
        }
    }

    /// Field-wise comparison of the current metadata with `metadata`.
    #[must_use]
    pub fn metadata_differs(&self, metadata: &IacQueryMetadata) -> bool {
        self.metadata() != *metadata
    }

    /// Fills fields left empty by the query editor from another copy of the
    /// same query.
    pub fn merge_from(&mut self, other: &Self) {
        fill_if_empty(&mut self.query_id, &other.query_id);
        fill_if_empty(&mut self.key, &other.key);
        fill_if_empty(&mut self.level_id, &other.level_id);
        fill_if_empty(&mut self.path, &other.path);
        fill_if_empty(&mut self.source, &other.source);
        fill_if_empty(&mut self.name, &other.name);
        fill_if_empty(&mut self.category, &other.category);
        fill_if_empty(&mut self.platform, &other.platform);
        fill_if_empty(&mut self.group, &other.group);
        fill_if_empty(&mut self.severity, &other.severity);
        fill_if_empty(&mut self.description, &other.description);
        fill_if_empty(&mut self.description_id, &other.description_id);
        fill_if_empty(&mut self.description_url, &other.description_url);
        fill_if_empty(&mut self.cwe, &other.cwe);
    }

    /// Derives the id an override of this query gets at `level`.
    ///
    /// Returns `None` for the Product level, which has no overrides.
    #[must_use]
    pub fn override_id(&self, level: QueryLevel) -> Option<String> {
        let prefix = level.iac_prefix()?;
        Some(format!("{prefix}:{}", split_query_id(&self.query_id)))
    }
}

impl Display for IacQuery {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            formatter,
            "{} -> {} -> {} ({} {})",
            self.platform, self.group, self.name, self.level, self.level_id
        )
    }
}

/// Returns the editor key part of an IaC query id (`t:abc` → `abc`).
#[must_use]
pub fn split_query_id(query_id: &str) -> &str {
    match query_id.as_bytes() {
        [_, b':', ..] => &query_id[2..],
        _ => query_id,
    }
}

/// Editable metadata of an IaC query.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IacQueryMetadata {
    /// Query category.
    #[serde(default)]
    pub category: String,
    /// CWE identifier.
    #[serde(default)]
    pub cwe: String,
    /// Description text.
    #[serde(default)]
    pub description: String,
    /// Description id.
    #[serde(default, rename = "descriptionId")]
    pub description_id: String,
    /// Link to the vendor documentation.
    #[serde(default, rename = "descriptionUrl")]
    pub description_url: String,
    /// Target platform.
    #[serde(default)]
    pub platform: String,
    /// Result severity.
    #[serde(default)]
    pub severity: String,
}

/// Query record returned by `GET .../queries/{id}?includeMetadata=true`.
#[derive(Debug, Clone, Deserialize)]
pub struct IacQueryRecord {
    /// Platform query id; omitted by some query-editor versions.
    #[serde(default, rename = "id")]
    pub query_id: String,
    /// Query name.
    #[serde(default)]
    pub name: String,
    /// Scope level.
    pub level: QueryLevel,
    /// Virtual source path.
    #[serde(default)]
    pub path: String,
    /// Rego source.
    #[serde(default)]
    pub source: String,
    /// Query group.
    #[serde(default)]
    pub group: String,
    /// Query metadata.
    #[serde(default)]
    pub metadata: IacQueryMetadata,
}

impl IacQueryRecord {
    /// Converts the record into a typed query without a level id.
    #[must_use]
    pub fn into_query(self) -> IacQuery {
        IacQuery {
            key: split_query_id(&self.query_id).to_owned(),
            query_id: self.query_id,
            level: self.level,
            level_id: String::new(),
            path: self.path,
            source: self.source,
            name: self.name,
            category: self.metadata.category,
            platform: self.metadata.platform,
            group: self.group,
            severity: self.metadata.severity,
            custom: self.level != QueryLevel::Product,
            description: self.metadata.description,
            description_id: self.metadata.description_id,
            description_url: self.metadata.description_url,
            cwe: self.metadata.cwe,
        }
    }
}
