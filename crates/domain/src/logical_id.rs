use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use stackforge_core::{AppError, AppResult};

/// Path component dropped from both the readable part and the hash.
pub const HIDDEN_COMPONENT: &str = "Default";

/// Path component dropped from the readable part only.
pub const HIDDEN_FROM_HUMAN_COMPONENT: &str = "Resource";

const MAX_LOGICAL_ID_LENGTH: usize = 255;
const HASH_LENGTH: usize = 8;

/// Template-unique identifier of a synthesized resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LogicalId(String);

impl LogicalId {
    /// Derives a logical id from a construct path relative to its stack.
    ///
    /// A single component maps to itself with non-alphanumerics removed.
    /// Longer paths get a readable prefix plus eight hex characters of the
    /// path hash, so distinct paths never collapse onto the same id.
    pub fn from_path<S: AsRef<str>>(components: &[S]) -> AppResult<Self> {
        let components: Vec<&str> = components
            .iter()
            .map(|component| component.as_ref())
            .filter(|component| *component != HIDDEN_COMPONENT)
            .collect();

        if components.is_empty() {
            return Err(AppError::Validation(
                "logical id requires at least one path component".to_owned(),
            ));
        }

        if let [single] = components.as_slice() {
            let candidate = remove_non_alphanumeric(single);
            if candidate.is_empty() {
                return Err(AppError::Validation(format!(
                    "path component '{single}' has no alphanumeric characters"
                )));
            }
            if candidate.len() <= MAX_LOGICAL_ID_LENGTH {
                return Ok(Self(candidate));
            }
        }

        let hash = path_hash(&components);
        let human: String = readable_components(&components)
            .into_iter()
            .map(remove_non_alphanumeric)
            .collect();
        let human: String = human
            .chars()
            .take(MAX_LOGICAL_ID_LENGTH - HASH_LENGTH)
            .collect();

        Ok(Self(format!("{human}{hash}")))
    }

    /// Returns the identifier text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl Display for LogicalId {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.0.as_str())
    }
}

fn path_hash(components: &[&str]) -> String {
    let digest = Sha256::digest(components.join("/").as_bytes());
    let hex: String = digest.iter().map(|byte| format!("{byte:02X}")).collect();
    hex.chars().take(HASH_LENGTH).collect()
}

// Drops hidden components and collapses consecutive repeats ("Bucket/Bucket").
fn readable_components<'a>(components: &[&'a str]) -> Vec<&'a str> {
    let mut readable: Vec<&str> = Vec::with_capacity(components.len());
    for component in components {
        if *component == HIDDEN_FROM_HUMAN_COMPONENT {
            continue;
        }
        if readable.last() == Some(component) {
            continue;
        }
        readable.push(component);
    }
    readable
}

fn remove_non_alphanumeric(value: &str) -> String {
    value
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .collect()
}
