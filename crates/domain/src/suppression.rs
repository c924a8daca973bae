use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use stackforge_core::{AppResult, NonEmptyString};

/// Metadata key holding the construct path of a synthesized resource.
pub const CONSTRUCT_PATH_METADATA_KEY: &str = "aws:cdk:path";

/// A waived security-linter finding with its justification.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SuppressionRule {
    id: NonEmptyString,
    reason: NonEmptyString,
}

impl SuppressionRule {
    /// Creates a validated suppression rule.
    pub fn new(id: impl Into<String>, reason: impl Into<String>) -> AppResult<Self> {
        Ok(Self {
            id: NonEmptyString::named("suppression rule id", id)?,
            reason: NonEmptyString::named("suppression rule reason", reason)?,
        })
    }

    /// Returns the linter rule id.
    #[must_use]
    pub fn id(&self) -> &str {
        self.id.as_str()
    }

    /// Returns the justification text.
    #[must_use]
    pub fn reason(&self) -> &str {
        self.reason.as_str()
    }
}

/// Data-only metadata attached to a synthesized resource.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ResourceMetadata {
    construct_path: Option<String>,
    suppressions: Vec<SuppressionRule>,
}

impl ResourceMetadata {
    /// Creates metadata recording the construct path.
    #[must_use]
    pub fn for_path(construct_path: impl Into<String>) -> Self {
        Self {
            construct_path: Some(construct_path.into()),
            suppressions: Vec::new(),
        }
    }

    /// Appends suppression rules after any already present.
    pub fn add_suppress_rules(&mut self, rules: impl IntoIterator<Item = SuppressionRule>) {
        self.suppressions.extend(rules);
    }

    /// Returns the suppression rules in insertion order.
    #[must_use]
    pub fn suppressions(&self) -> &[SuppressionRule] {
        &self.suppressions
    }

    /// Renders the template `Metadata` block.
    #[must_use]
    pub fn to_template_value(&self) -> Map<String, Value> {
        let mut metadata = Map::new();

        if let Some(path) = &self.construct_path {
            metadata.insert(
                CONSTRUCT_PATH_METADATA_KEY.to_owned(),
                Value::String(path.clone()),
            );
        }

        if !self.suppressions.is_empty() {
            let rules: Vec<Value> = self
                .suppressions
                .iter()
                .map(|rule| json!({ "id": rule.id(), "reason": rule.reason() }))
                .collect();
            metadata.insert(
                "cfn_nag".to_owned(),
                json!({ "rules_to_suppress": rules }),
            );
        }

        metadata
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{ResourceMetadata, SuppressionRule};

    #[test]
    fn rules_require_id_and_reason() {
        assert!(SuppressionRule::new("", "reason").is_err());
        assert!(SuppressionRule::new("W35", " ").is_err());
    }

    #[test]
    fn suppressions_append_and_render_in_order() {
        let mut metadata = ResourceMetadata::for_path("Stack/Bucket/Resource");
        metadata.add_suppress_rules([SuppressionRule::new("W35", "first")
            .unwrap_or_else(|_| unreachable!())]);
        metadata.add_suppress_rules([SuppressionRule::new("W51", "second")
            .unwrap_or_else(|_| unreachable!())]);

        let rendered = metadata.to_template_value();
        assert_eq!(rendered["aws:cdk:path"], json!("Stack/Bucket/Resource"));
        assert_eq!(
            rendered["cfn_nag"],
            json!({
                "rules_to_suppress": [
                    { "id": "W35", "reason": "first" },
                    { "id": "W51", "reason": "second" }
                ]
            })
        );
    }

    #[test]
    fn empty_metadata_renders_nothing() {
        assert!(ResourceMetadata::default().to_template_value().is_empty());
    }
}
