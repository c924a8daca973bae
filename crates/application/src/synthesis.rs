use serde_json::{Map, Value, json};
use stackforge_core::{AppError, AppResult};
use stackforge_domain::{
    Arn, LogicalId, PolicyDocument, ResourceDefinition, ResourceMetadata, Template,
    tls_enforcement_statement,
};
use tracing::{debug, info};

use crate::stack::{BUCKET_POLICY_CHILD_ID, Declaration, Stack};

/// Renders every declaration of `stack` into a template.
///
/// Imported buckets and grouping constructs emit nothing. Policies with no
/// attached role are skipped because the provisioning engine rejects them.
pub fn synthesize(stack: &Stack) -> AppResult<Template> {
    let mut template = Template::new(stack.description().map(str::to_owned));

    for node in stack.nodes() {
        match &node.declaration {
            Declaration::Construct | Declaration::ImportedBucket(_) => {}
            Declaration::Policy {
                handle,
                roles,
                metadata,
            } => {
                if roles.is_empty() {
                    debug!(
                        stack = %stack.name(),
                        path = %node.path,
                        "skipping policy with no attached role"
                    );
                    continue;
                }

                let mut properties = Map::new();
                properties.insert(
                    "PolicyDocument".to_owned(),
                    handle.document().to_template_value(),
                );
                properties.insert(
                    "PolicyName".to_owned(),
                    Value::String(handle.policy_name()),
                );
                properties.insert(
                    "Roles".to_owned(),
                    Value::Array(
                        roles
                            .iter()
                            .map(|role| Value::String(role.as_str().to_owned()))
                            .collect(),
                    ),
                );

                insert(
                    &mut template,
                    handle.logical_id().clone(),
                    ResourceDefinition::new("AWS::IAM::Policy", properties).with_metadata(metadata),
                )?;
            }
            Declaration::Bucket {
                bucket,
                policy_logical_id,
                metadata,
            } => {
                insert(
                    &mut template,
                    bucket.logical_id().clone(),
                    ResourceDefinition::new(
                        "AWS::S3::Bucket",
                        bucket.definition().to_template_properties(),
                    )
                    .with_removal_policy(bucket.removal_policy())
                    .with_metadata(metadata),
                )?;

                if let Some(policy_logical_id) = policy_logical_id {
                    let bucket_arn = Arn::attribute_of(bucket.logical_id().clone());
                    let document =
                        PolicyDocument::new(vec![tls_enforcement_statement(&bucket_arn)]);
                    let mut properties = Map::new();
                    properties.insert(
                        "Bucket".to_owned(),
                        json!({ "Ref": bucket.logical_id().as_str() }),
                    );
                    properties.insert("PolicyDocument".to_owned(), document.to_template_value());
                    let policy_metadata = ResourceMetadata::for_path(
                        stack.construct_path(&node.path, &[BUCKET_POLICY_CHILD_ID]),
                    );

                    insert(
                        &mut template,
                        policy_logical_id.clone(),
                        ResourceDefinition::new("AWS::S3::BucketPolicy", properties)
                            .with_metadata(&policy_metadata),
                    )?;
                }
            }
        }
    }

    info!(
        stack = %stack.name(),
        resource_count = template.resources().len(),
        "stack synthesized"
    );

    Ok(template)
}

fn insert(
    template: &mut Template,
    logical_id: LogicalId,
    resource: ResourceDefinition,
) -> AppResult<()> {
    if template.insert_resource(logical_id.clone(), resource) {
        return Ok(());
    }

    Err(AppError::Conflict(format!(
        "logical id '{logical_id}' is used by more than one resource"
    )))
}
