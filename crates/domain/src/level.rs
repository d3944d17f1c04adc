use std::fmt::{Display, Formatter};
use std::str::FromStr;

use auditkit_core::AppError;
use serde::{Deserialize, Serialize};

/// Scope level of a query, ordered from least to most specific.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(try_from = "String", into = "String")]
pub enum QueryLevel {
    /// Vendor-provided base query.
    #[default]
    Product,
    /// Override applying to the whole tenant.
    Tenant,
    /// Override applying to every project owned by an application.
    Application,
    /// Override applying to a single project.
    Project,
}

impl QueryLevel {
    /// Returns the level name reported by the query editor.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Product => "Cx",
            Self::Tenant => "Tenant",
            Self::Application => "Application",
            Self::Project => "Project",
        }
    }

    /// Level name sent when creating an override.
    #[must_use]
    pub fn request_name(&self) -> String {
        self.as_str().to_lowercase()
    }

    /// Whether overrides may be created at this level.
    #[must_use]
    pub fn is_override_level(&self) -> bool {
        !matches!(self, Self::Product)
    }

    /// One-letter prefix the platform puts in front of IaC override ids.
    #[must_use]
    pub fn iac_prefix(&self) -> Option<char> {
        match self {
            Self::Product => None,
            Self::Tenant => Some('t'),
            Self::Application => Some('a'),
            Self::Project => Some('p'),
        }
    }
}

impl Display for QueryLevel {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl FromStr for QueryLevel {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        // "Corp" and "Team" are reported by platform releases before 3.12.7.
        match value.trim().to_ascii_lowercase().as_str() {
            "cx" | "product" => Ok(Self::Product),
            "tenant" | "corp" => Ok(Self::Tenant),
            "application" | "team" => Ok(Self::Application),
            "project" => Ok(Self::Project),
            _ => Err(AppError::Validation(format!(
                "invalid query level '{value}', options are Cx, Tenant, Application or Project"
            ))),
        }
    }
}

impl TryFrom<String> for QueryLevel {
    type Error = AppError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_str(value.as_str())
    }
}

impl From<QueryLevel> for String {
    fn from(value: QueryLevel) -> Self {
        value.as_str().to_owned()
    }
}
