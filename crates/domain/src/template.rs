use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{LogicalId, ResourceMetadata};

/// Template format version written into every synthesized document.
pub const TEMPLATE_FORMAT_VERSION: &str = "2010-09-09";

/// What the provisioning engine does with a resource when its template is destroyed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RemovalPolicy {
    /// Keep the resource.
    Retain,
    /// Delete the resource.
    #[serde(rename = "Delete")]
    Destroy,
    /// Snapshot, then delete. Only some resource types support it.
    Snapshot,
}

impl RemovalPolicy {
    /// Returns the template value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Retain => "Retain",
            Self::Destroy => "Delete",
            Self::Snapshot => "Snapshot",
        }
    }
}

/// One entry of the template `Resources` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ResourceDefinition {
    #[serde(rename = "Type")]
    resource_type: String,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    properties: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    deletion_policy: Option<RemovalPolicy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    update_replace_policy: Option<RemovalPolicy>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    metadata: Map<String, Value>,
}

impl ResourceDefinition {
    /// Creates a resource of `resource_type` with rendered properties.
    #[must_use]
    pub fn new(resource_type: impl Into<String>, properties: Map<String, Value>) -> Self {
        Self {
            resource_type: resource_type.into(),
            properties,
            deletion_policy: None,
            update_replace_policy: None,
            metadata: Map::new(),
        }
    }

    /// Applies a removal policy to both deletion and replacement.
    #[must_use]
    pub fn with_removal_policy(mut self, removal_policy: RemovalPolicy) -> Self {
        self.deletion_policy = Some(removal_policy);
        self.update_replace_policy = Some(removal_policy);
        self
    }

    /// Attaches rendered metadata.
    #[must_use]
    pub fn with_metadata(mut self, metadata: &ResourceMetadata) -> Self {
        self.metadata = metadata.to_template_value();
        self
    }

    /// Returns the resource type, for example `AWS::S3::Bucket`.
    #[must_use]
    pub fn resource_type(&self) -> &str {
        self.resource_type.as_str()
    }

    /// Returns the rendered properties.
    #[must_use]
    pub fn properties(&self) -> &Map<String, Value> {
        &self.properties
    }

    /// Returns the deletion policy.
    #[must_use]
    pub fn deletion_policy(&self) -> Option<RemovalPolicy> {
        self.deletion_policy
    }

    /// Returns the replacement policy.
    #[must_use]
    pub fn update_replace_policy(&self) -> Option<RemovalPolicy> {
        self.update_replace_policy
    }

    /// Returns the rendered metadata.
    #[must_use]
    pub fn metadata(&self) -> &Map<String, Value> {
        &self.metadata
    }
}

/// Resources a destroy of the template deletes and keeps.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DestroyPlan {
    /// Resources removed with the template.
    pub deleted: Vec<LogicalId>,
    /// Resources left in place.
    pub retained: Vec<LogicalId>,
}

/// Synthesized deployment plan document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Template {
    #[serde(rename = "AWSTemplateFormatVersion")]
    format_version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(default)]
    resources: BTreeMap<LogicalId, ResourceDefinition>,
}

impl Template {
    /// Creates an empty template.
    #[must_use]
    pub fn new(description: Option<String>) -> Self {
        Self {
            format_version: TEMPLATE_FORMAT_VERSION.to_owned(),
            description,
            resources: BTreeMap::new(),
        }
    }

    /// Inserts a resource; returns `false` when the logical id is taken.
    pub fn insert_resource(&mut self, logical_id: LogicalId, resource: ResourceDefinition) -> bool {
        if self.resources.contains_key(&logical_id) {
            return false;
        }

        self.resources.insert(logical_id, resource);
        true
    }

    /// Returns the template description.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Returns all resources keyed by logical id, sorted by logical id.
    #[must_use]
    pub fn resources(&self) -> &BTreeMap<LogicalId, ResourceDefinition> {
        &self.resources
    }

    /// Returns one resource.
    #[must_use]
    pub fn resource(&self, logical_id: &LogicalId) -> Option<&ResourceDefinition> {
        self.resources.get(logical_id)
    }

    /// Returns resources of `resource_type`.
    #[must_use]
    pub fn resources_of_type(&self, resource_type: &str) -> Vec<(&LogicalId, &ResourceDefinition)> {
        self.resources
            .iter()
            .filter(|(_, resource)| resource.resource_type() == resource_type)
            .collect()
    }

    /// Splits resources by what destroying the template does to them.
    #[must_use]
    pub fn destroy_plan(&self) -> DestroyPlan {
        let mut plan = DestroyPlan::default();
        for (logical_id, resource) in &self.resources {
            match resource.deletion_policy() {
                Some(RemovalPolicy::Retain) => plan.retained.push(logical_id.clone()),
                _ => plan.deleted.push(logical_id.clone()),
            }
        }
        plan
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{Map, json};

    use super::{RemovalPolicy, ResourceDefinition, Template};
    use crate::LogicalId;

    fn id(value: &str) -> LogicalId {
        LogicalId::from_path(&[value]).unwrap_or_else(|_| unreachable!())
    }

    #[test]
    fn retained_resources_survive_destroy() {
        let mut template = Template::new(None);
        assert!(template.insert_resource(
            id("Kept"),
            ResourceDefinition::new("AWS::S3::Bucket", Map::new())
                .with_removal_policy(RemovalPolicy::Retain),
        ));
        assert!(template.insert_resource(
            id("Gone"),
            ResourceDefinition::new("AWS::IAM::Policy", Map::new()),
        ));

        let plan = template.destroy_plan();
        assert_eq!(plan.retained, vec![id("Kept")]);
        assert_eq!(plan.deleted, vec![id("Gone")]);
    }

    #[test]
    fn resources_render_sorted_by_logical_id() {
        let mut template = Template::new(None);
        for name in ["Zeta", "Alpha", "Mid"] {
            assert!(template.insert_resource(
                id(name),
                ResourceDefinition::new("AWS::S3::Bucket", Map::new()),
            ));
        }

        let rendered = serde_json::to_value(&template).unwrap_or_else(|_| unreachable!());
        let keys: Vec<&String> = rendered["Resources"]
            .as_object()
            .map(|resources| resources.keys().collect())
            .unwrap_or_default();
        assert_eq!(keys, ["Alpha", "Mid", "Zeta"]);
    }

    #[test]
    fn duplicate_logical_id_is_refused() {
        let mut template = Template::new(None);
        let resource = ResourceDefinition::new("AWS::S3::Bucket", Map::new());
        assert!(template.insert_resource(id("Bucket"), resource.clone()));
        assert!(!template.insert_resource(id("Bucket"), resource));
    }

    #[test]
    fn template_serializes_in_provisioning_engine_shape() {
        let mut template = Template::new(Some("common resources".to_owned()));
        template.insert_resource(
            id("LogBucket"),
            ResourceDefinition::new("AWS::S3::Bucket", Map::new())
                .with_removal_policy(RemovalPolicy::Retain),
        );

        let rendered = serde_json::to_value(&template).unwrap_or_else(|_| unreachable!());
        assert_eq!(
            rendered,
            json!({
                "AWSTemplateFormatVersion": "2010-09-09",
                "Description": "common resources",
                "Resources": {
                    "LogBucket": {
                        "Type": "AWS::S3::Bucket",
                        "DeletionPolicy": "Retain",
                        "UpdateReplacePolicy": "Retain"
                    }
                }
            })
        );

        let restored: Template =
            serde_json::from_value(rendered).unwrap_or_else(|_| unreachable!());
        assert_eq!(restored, template);
    }
}
