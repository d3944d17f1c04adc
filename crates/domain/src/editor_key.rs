use std::str::FromStr;

use auditkit_core::{AppError, AppResult};
use data_encoding::BASE32;

use crate::QueryLevel;

const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// Derives the query-editor key of a SAST query.
///
/// The key is the padded base32 encoding of `level-language-group-name`, so
/// it can be decoded back with [`EditorKeyParts::decode`].
#[must_use]
pub fn calculate_editor_key(level: QueryLevel, language: &str, group: &str, name: &str) -> String {
    let plain = format!("{}-{language}-{group}-{name}", level.as_str());
    BASE32.encode(plain.as_bytes())
}

/// Components encoded in an editor key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditorKeyParts {
    /// Scope level of the query.
    pub level: QueryLevel,
    /// Query language.
    pub language: String,
    /// Query group.
    pub group: String,
    /// Query name; the only component that may contain `-`.
    pub name: String,
}

impl EditorKeyParts {
    /// Decodes an editor key produced by [`calculate_editor_key`].
    pub fn decode(key: &str) -> AppResult<Self> {
        let bytes = BASE32
            .decode(key.as_bytes())
            .map_err(|error| AppError::Validation(format!("invalid editor key '{key}': {error}")))?;
        let plain = String::from_utf8(bytes)
            .map_err(|error| AppError::Validation(format!("invalid editor key '{key}': {error}")))?;

        let mut parts = plain.splitn(4, '-');
        let (Some(level), Some(language), Some(group), Some(name)) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(AppError::Validation(format!(
                "editor key '{key}' does not encode level, language, group and name"
            )));
        };

        Ok(Self {
            level: QueryLevel::from_str(level)?,
            language: language.to_owned(),
            group: group.to_owned(),
            name: name.to_owned(),
        })
    }

    /// Re-encodes the parts into an editor key.
    #[must_use]
    pub fn encode(&self) -> String {
        calculate_editor_key(self.level, &self.language, &self.group, &self.name)
    }
}

/// Computes the numeric id the platform assigns to a SAST query.
///
/// The query editor does not report this id, so it is recomputed as the
/// 64-bit FNV-1 hash of the query's virtual source path.
#[must_use]
pub fn calculate_query_id(language: &str, group: &str, name: &str) -> u64 {
    fnv1_64(format!("queries/{language}/{group}/{name}/{name}.cs").as_bytes())
}

fn fnv1_64(bytes: &[u8]) -> u64 {
    bytes.iter().fold(FNV_OFFSET_BASIS, |hash, byte| {
        hash.wrapping_mul(FNV_PRIME) ^ u64::from(*byte)
    })
}
