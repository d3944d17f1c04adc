use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::project::null_as_empty;
use crate::{IacQuery, QueryLevel, SastQuery, split_query_id};

/// Node of the query listing returned by `GET .../queries`.
///
/// Root nodes are languages (SAST) or platforms (IaC), their children are
/// groups and the leaves are queries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryTreeNode {
    /// Whether this node is a query.
    #[serde(default, rename = "isLeaf")]
    pub is_leaf: bool,
    /// Language, group or query name.
    #[serde(default)]
    pub title: String,
    /// Editor key (SAST) or query id (IaC) for leaves.
    #[serde(default)]
    pub key: String,
    /// Query attributes for leaves.
    #[serde(default)]
    pub data: QueryTreeData,
    /// Child nodes.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub children: Vec<QueryTreeNode>,
}

/// Attributes attached to a query leaf.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryTreeData {
    /// Scope level of the listed copy.
    #[serde(default)]
    pub level: QueryLevel,
    /// Result severity.
    #[serde(default)]
    pub severity: String,
    /// CWE identifier; numeric for SAST, textual for IaC.
    #[serde(default, deserialize_with = "cwe_as_text")]
    pub cwe: String,
    /// Whether the listed copy is an override.
    #[serde(default)]
    pub custom: bool,
}

/// Flattened view over SAST query listings, keyed by editor key.
#[derive(Debug, Clone, Default)]
pub struct SastQueryCollection {
    queries: BTreeMap<String, SastQuery>,
}

impl SastQueryCollection {
    /// Builds a collection from a single listing.
    #[must_use]
    pub fn from_tree(tree: &[QueryTreeNode], application_id: &str, level_id: &str) -> Self {
        let mut collection = Self::default();
        collection.add_query_tree(tree, application_id, level_id);
        collection
    }

    /// Adds the leaves of `tree`, replacing queries already present under the
    /// same editor key.
    pub fn add_query_tree(&mut self, tree: &[QueryTreeNode], application_id: &str, level_id: &str) {
        for language in tree {
            for group in &language.children {
                for leaf in group.children.iter().filter(|node| node.is_leaf) {
                    let query = sast_leaf(leaf, &language.title, &group.title, application_id, level_id);
                    self.upsert(query);
                }
            }
        }
    }

    /// Inserts `query` or replaces the entry with the same editor key.
    pub fn upsert(&mut self, query: SastQuery) {
        self.queries.insert(query.editor_key.clone(), query);
    }

    /// Finds a query by editor key.
    #[must_use]
    pub fn get_by_key(&self, editor_key: &str) -> Option<&SastQuery> {
        self.queries.get(editor_key)
    }

    /// Finds a query by level, level id and identity.
    #[must_use]
    pub fn get(
        &self,
        level: QueryLevel,
        level_id: &str,
        language: &str,
        group: &str,
        name: &str,
    ) -> Option<&SastQuery> {
        self.queries.values().find(|query| {
            query.level == level
                && query.level_id == level_id
                && query.language.eq_ignore_ascii_case(language)
                && query.group.eq_ignore_ascii_case(group)
                && query.name.eq_ignore_ascii_case(name)
        })
    }

    /// Iterates all queries.
    pub fn iter(&self) -> impl Iterator<Item = &SastQuery> {
        self.queries.values()
    }

    /// Number of queries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.queries.len()
    }

    /// Whether the collection holds no query.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queries.is_empty()
    }

    /// Counts queries per scope level.
    #[must_use]
    pub fn count_by_level(&self) -> BTreeMap<QueryLevel, usize> {
        count_levels(self.queries.values().map(|query| query.level))
    }
}

/// Flattened view over IaC query listings, keyed by query id.
#[derive(Debug, Clone, Default)]
pub struct IacQueryCollection {
    queries: BTreeMap<String, IacQuery>,
}

impl IacQueryCollection {
    /// Builds a collection from a single listing.
    #[must_use]
    pub fn from_tree(tree: &[QueryTreeNode], application_id: &str, level_id: &str) -> Self {
        let mut collection = Self::default();
        collection.add_query_tree(tree, application_id, level_id);
        collection
    }

    /// Adds the leaves of `tree`, replacing queries already present under the
    /// same query id.
    pub fn add_query_tree(&mut self, tree: &[QueryTreeNode], application_id: &str, level_id: &str) {
        for platform in tree {
            for group in &platform.children {
                for leaf in group.children.iter().filter(|node| node.is_leaf) {
                    let query = iac_leaf(leaf, &platform.title, &group.title, application_id, level_id);
                    self.upsert(query);
                }
            }
        }
    }

    /// Inserts `query` or replaces the entry with the same query id.
    pub fn upsert(&mut self, query: IacQuery) {
        self.queries.insert(query.query_id.clone(), query);
    }

    /// Finds a query by full query id, falling back to its editor key.
    #[must_use]
    pub fn get_by_key(&self, key: &str) -> Option<&IacQuery> {
        self.queries
            .get(key)
            .or_else(|| self.queries.values().find(|query| query.key == key))
    }

    /// Finds a query by level, level id and identity.
    #[must_use]
    pub fn get(
        &self,
        level: QueryLevel,
        level_id: &str,
        platform: &str,
        group: &str,
        name: &str,
    ) -> Option<&IacQuery> {
        self.queries.values().find(|query| {
            query.level == level
                && query.level_id == level_id
                && query.platform.eq_ignore_ascii_case(platform)
                && query.group.eq_ignore_ascii_case(group)
                && query.name.eq_ignore_ascii_case(name)
        })
    }

    /// Iterates all queries.
    pub fn iter(&self) -> impl Iterator<Item = &IacQuery> {
        self.queries.values()
    }

    /// Iterates all queries mutably. Query ids must stay unchanged.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut IacQuery> {
        self.queries.values_mut()
    }

    /// Number of queries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.queries.len()
    }

    /// Whether the collection holds no query.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queries.is_empty()
    }

    /// Counts queries per scope level.
    #[must_use]
    pub fn count_by_level(&self) -> BTreeMap<QueryLevel, usize> {
        count_levels(self.queries.values().map(|query| query.level))
    }
}

fn leaf_level_id(level: QueryLevel, application_id: &str, level_id: &str) -> String {
    match level {
        QueryLevel::Product | QueryLevel::Tenant => level.as_str().to_owned(),
        QueryLevel::Application => application_id.to_owned(),
        QueryLevel::Project => level_id.to_owned(),
    }
}

fn sast_leaf(
    leaf: &QueryTreeNode,
    language: &str,
    group: &str,
    application_id: &str,
    level_id: &str,
) -> SastQuery {
    let level = leaf.data.level;
    let mut query = SastQuery {
        level,
        level_id: leaf_level_id(level, application_id, level_id),
        path: format!("queries/{language}/{group}/{0}/{0}.cs", leaf.title),
        name: leaf.title.clone(),
        group: group.to_owned(),
        language: language.to_owned(),
        severity: leaf.data.severity.clone(),
        cwe_id: leaf.data.cwe.parse().unwrap_or_default(),
        custom: leaf.data.custom || level != QueryLevel::Product,
        editor_key: leaf.key.clone(),
        ..SastQuery::default()
    };
    query.calculate_query_id();
    if query.editor_key.is_empty() {
        query.calculate_editor_key();
    }
    query
}

fn iac_leaf(
    leaf: &QueryTreeNode,
    platform: &str,
    group: &str,
    application_id: &str,
    level_id: &str,
) -> IacQuery {
    let level = leaf.data.level;
    IacQuery {
        query_id: leaf.key.clone(),
        key: split_query_id(&leaf.key).to_owned(),
        level,
        level_id: leaf_level_id(level, application_id, level_id),
        name: leaf.title.clone(),
        platform: platform.to_owned(),
        group: group.to_owned(),
        severity: leaf.data.severity.clone(),
        custom: leaf.data.custom || level != QueryLevel::Product,
        cwe: leaf.data.cwe.clone(),
        ..IacQuery::default()
    }
}

fn count_levels(levels: impl Iterator<Item = QueryLevel>) -> BTreeMap<QueryLevel, usize> {
    levels.fold(BTreeMap::new(), |mut counts, level| {
        *counts.entry(level).or_insert(0) += 1;
        counts
    })
}

fn cwe_as_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(text) => text,
        Value::Number(number) => number.to_string(),
        _ => String::new(),
    })
}
