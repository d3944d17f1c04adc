use serde::{Deserialize, Serialize};

/// Marker used as the application level id when a project has more than one
/// owning application.
pub const AMBIGUOUS_APPLICATION_MARKER: &str = "Error: multiple owning applications";

/// Project as returned by the project directory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    /// Project identifier.
    pub id: String,
    /// Human-readable project name.
    #[serde(default)]
    pub name: String,
    /// Applications that own this project.
    #[serde(default, rename = "applicationIds", deserialize_with = "null_as_empty")]
    pub application_ids: Vec<String>,
}

impl Project {
    /// Resolves the owning application of this project.
    #[must_use]
    pub fn ownership(&self) -> ApplicationOwnership {
        match self.application_ids.as_slice() {
            [] => ApplicationOwnership::Unowned,
            [application_id] => ApplicationOwnership::Owned(application_id.clone()),
            _ => ApplicationOwnership::Ambiguous,
        }
    }
}

/// Application owning the project of an audit session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ApplicationOwnership {
    /// The project belongs to no application.
    #[default]
    Unowned,
    /// The project belongs to exactly one application.
    Owned(String),
    /// The project belongs to several applications; application-level
    /// overrides cannot be targeted unambiguously.
    Ambiguous,
}

impl ApplicationOwnership {
    /// Returns the owning application id when there is exactly one.
    #[must_use]
    pub fn application_id(&self) -> Option<&str> {
        match self {
            Self::Owned(application_id) => Some(application_id.as_str()),
            Self::Unowned | Self::Ambiguous => None,
        }
    }

    /// Returns the application level id, which is empty when unowned and the
    /// ambiguity marker when several applications own the project.
    #[must_use]
    pub fn level_id(&self) -> &str {
        match self {
            Self::Unowned => "",
            Self::Owned(application_id) => application_id.as_str(),
            Self::Ambiguous => AMBIGUOUS_APPLICATION_MARKER,
        }
    }
}

/// Node of the scanned source tree exposed by an audit session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanSourceNode {
    /// Whether this node is a file.
    #[serde(default, rename = "isLeaf")]
    pub is_leaf: bool,
    /// File or directory name.
    #[serde(default)]
    pub title: String,
    /// Path key of the node.
    #[serde(default)]
    pub key: String,
    /// Child nodes for directories.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub children: Vec<ScanSourceNode>,
}

impl ScanSourceNode {
    /// Counts the files below (and including) this node.
    #[must_use]
    pub fn file_count(&self) -> usize {
        if self.is_leaf {
            return 1;
        }
        self.children.iter().map(Self::file_count).sum()
    }
}

pub(crate) fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}
