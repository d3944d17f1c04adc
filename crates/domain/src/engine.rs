use std::fmt::{Display, Formatter};
use std::str::FromStr;

use auditkit_core::AppError;
use serde::{Deserialize, Serialize};

/// Detection engines that can back an audit session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditEngine {
    /// Static analysis of application source code.
    Sast,
    /// Infrastructure-as-code scanning.
    Iac,
}

impl AuditEngine {
    /// Returns the scanner name used on the wire.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sast => "sast",
            Self::Iac => "iac",
        }
    }

    /// Session status the platform reports once a session of this engine is
    /// ready for use.
    #[must_use]
    pub fn ready_status(&self) -> &'static str {
        match self {
            Self::Sast => "ALLOCATED",
            Self::Iac => "RUNNING",
        }
    }

    /// Returns all supported engines.
    #[must_use]
    pub fn all() -> &'static [Self] {
        const ALL: &[AuditEngine] = &[AuditEngine::Sast, AuditEngine::Iac];

        ALL
    }
}

impl Display for AuditEngine {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl FromStr for AuditEngine {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "sast" => Ok(Self::Sast),
            "iac" => Ok(Self::Iac),
            _ => Err(AppError::Validation(format!("unknown engine '{value}'"))),
        }
    }
}
