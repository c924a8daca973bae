use std::collections::BTreeSet;

use serde_json::json;
use stackforge_core::{AppError, DeploymentEnvironment};
use stackforge_domain::{Arn, BucketRef, Effect, RemovalPolicy};

use super::{CommonResources, CommonResourcesProps, LOG_BUCKET_ID};
use crate::{DeclarationKind, Stack, synthesize};

fn concrete_environment() -> DeploymentEnvironment {
    DeploymentEnvironment::from_parts(
        Some("aws".to_owned()),
        Some("us-west-2".to_owned()),
        Some("111122223333".to_owned()),
    )
    .unwrap_or_else(|_| unreachable!())
}

fn props(name: &str) -> CommonResourcesProps {
    CommonResourcesProps {
        source_code_bucket_name: name.to_owned(),
    }
}

fn declare(stack: &mut Stack, name: &str) -> CommonResources {
    let root = stack.root();
    CommonResources::new(stack, &root, "CommonResources", props(name))
        .unwrap_or_else(|_| unreachable!())
}

fn new_stack(environment: DeploymentEnvironment) -> Stack {
    Stack::new("IotSimulatorStack", environment).unwrap_or_else(|_| unreachable!())
}

#[test]
fn declares_one_policy_one_bucket_and_one_reference() {
    let mut stack = new_stack(DeploymentEnvironment::agnostic());
    let block = declare(&mut stack, "my-existing-bucket");

    let kinds: Vec<DeclarationKind> = stack
        .children(block.path())
        .into_iter()
        .map(|summary| summary.kind)
        .collect();
    assert_eq!(
        kinds,
        vec![
            DeclarationKind::Policy,
            DeclarationKind::Bucket,
            DeclarationKind::ImportedBucket
        ]
    );
    assert_eq!(stack.declarations().len(), 4);
}

#[test]
fn policy_grants_exactly_the_log_write_actions() {
    let mut stack = new_stack(DeploymentEnvironment::agnostic());
    let block = declare(&mut stack, "artifacts");

    let document = block.cloud_watch_logs_policy().document();
    assert_eq!(document.statements().len(), 1);
    assert_eq!(document.statements()[0].effect(), Effect::Allow);

    let actions: BTreeSet<&str> = document.actions().into_iter().collect();
    let expected: BTreeSet<&str> = [
        "logs:CreateLogGroup",
        "logs:CreateLogStream",
        "logs:PutLogEvents",
    ]
    .into_iter()
    .collect();
    assert_eq!(actions, expected);
}

#[test]
fn policy_resource_follows_deployment_environment() {
    let mut concrete = new_stack(concrete_environment());
    let block = declare(&mut concrete, "artifacts");
    assert_eq!(
        block.cloud_watch_logs_policy().document().statements()[0].resources(),
        &[Arn::Literal(
            "arn:aws:logs:us-west-2:111122223333:log-group:/aws/lambda/*".to_owned()
        )]
    );

    let mut agnostic = new_stack(DeploymentEnvironment::agnostic());
    let block = declare(&mut agnostic, "artifacts");
    assert_eq!(
        block.cloud_watch_logs_policy().document().statements()[0].resources(),
        &[Arn::Sub(
            "arn:${AWS::Partition}:logs:${AWS::Region}:${AWS::AccountId}:log-group:/aws/lambda/*"
                .to_owned()
        )]
    );
}

#[test]
fn log_bucket_is_locked_down_for_any_input() {
    for name in ["a", "my-existing-bucket", "artifacts.example.com"] {
        let mut stack = new_stack(DeploymentEnvironment::agnostic());
        let block = declare(&mut stack, name);
        let definition = block.s3_logging_bucket().definition();

        assert!(
            definition
                .block_public_access()
                .is_some_and(|block_public_access| block_public_access.blocks_all())
        );
        assert!(definition.enforce_ssl());
        assert!(definition.encryption().is_some());
        assert_eq!(block.s3_logging_bucket().removal_policy(), RemovalPolicy::Retain);
    }
}

#[test]
fn log_bucket_survives_template_destroy() {
    for _ in 0..2 {
        let mut stack = new_stack(DeploymentEnvironment::agnostic());
        let block = declare(&mut stack, "artifacts");
        let template = synthesize(&stack).unwrap_or_else(|_| unreachable!());

        let plan = template.destroy_plan();
        assert!(plan.retained.contains(block.s3_logging_bucket().logical_id()));
        assert!(!plan.deleted.contains(block.s3_logging_bucket().logical_id()));
    }
}

#[test]
fn source_bucket_reference_keeps_name_verbatim() {
    let mut stack = new_stack(concrete_environment());
    let block = declare(&mut stack, "my-existing-bucket");

    match block.source_code_bucket() {
        BucketRef::Referenced(bucket) => assert_eq!(bucket.name(), "my-existing-bucket"),
        BucketRef::Owned(_) => unreachable!(),
    }
    assert!(block.source_code_bucket().as_owned().is_none());
    assert_eq!(
        block.source_code_bucket().bucket_arn(),
        Arn::Literal("arn:aws:s3:::my-existing-bucket".to_owned())
    );
}

#[test]
fn empty_bucket_name_is_rejected_without_side_effects() {
    for name in ["", "   "] {
        let mut stack = new_stack(DeploymentEnvironment::agnostic());
        let root = stack.root();
        let result = CommonResources::new(&mut stack, &root, "CommonResources", props(name));

        assert!(matches!(
            result,
            Err(AppError::Validation(message)) if message.contains("source_code_bucket_name")
        ));
        assert!(stack.declarations().is_empty());
    }
}

#[test]
fn redeclaring_same_id_in_scope_conflicts() {
    let mut stack = new_stack(DeploymentEnvironment::agnostic());
    let first = declare(&mut stack, "artifacts");
    let root = stack.root();

    let second = CommonResources::new(&mut stack, &root, "CommonResources", props("other"));
    assert!(matches!(second, Err(AppError::Conflict(_))));
    assert_eq!(stack.declarations().len(), 4);

    let template = synthesize(&stack).unwrap_or_else(|_| unreachable!());
    assert!(
        template
            .resource(first.s3_logging_bucket().logical_id())
            .is_some()
    );
}

#[test]
fn two_blocks_with_distinct_ids_do_not_collide() {
    let mut stack = new_stack(DeploymentEnvironment::agnostic());
    let root = stack.root();
    let first = CommonResources::new(&mut stack, &root, "Primary", props("artifacts"))
        .unwrap_or_else(|_| unreachable!());
    let second = CommonResources::new(&mut stack, &root, "Secondary", props("artifacts"))
        .unwrap_or_else(|_| unreachable!());

    assert_ne!(
        first.s3_logging_bucket().logical_id(),
        second.s3_logging_bucket().logical_id()
    );
    let template = synthesize(&stack).unwrap_or_else(|_| unreachable!());
    assert_eq!(template.resources_of_type("AWS::S3::Bucket").len(), 2);
}

#[test]
fn log_bucket_carries_suppression_metadata() {
    let mut stack = new_stack(DeploymentEnvironment::agnostic());
    let block = declare(&mut stack, "artifacts");
    let template = synthesize(&stack).unwrap_or_else(|_| unreachable!());

    let bucket = template
        .resource(block.s3_logging_bucket().logical_id())
        .unwrap_or_else(|| unreachable!());
    assert_eq!(
        bucket.metadata()["cfn_nag"],
        json!({
            "rules_to_suppress": [
                {
                    "id": "W35",
                    "reason": "This bucket is to store S3 logs, so it does not require access logs."
                },
                {
                    "id": "W51",
                    "reason": "This bucket is to store S3 logs, so it does not require S3 policy."
                }
            ]
        })
    );
    assert_eq!(
        bucket.metadata()["aws:cdk:path"],
        json!(format!("IotSimulatorStack/CommonResources/{LOG_BUCKET_ID}/Resource"))
    );
}

#[test]
fn synthesized_bucket_matches_declared_shape() {
    let mut stack = new_stack(DeploymentEnvironment::agnostic());
    let block = declare(&mut stack, "artifacts");
    let template = synthesize(&stack).unwrap_or_else(|_| unreachable!());

    let bucket = template
        .resource(block.s3_logging_bucket().logical_id())
        .unwrap_or_else(|| unreachable!());
    assert_eq!(bucket.resource_type(), "AWS::S3::Bucket");
    assert_eq!(bucket.deletion_policy(), Some(RemovalPolicy::Retain));
    assert_eq!(bucket.update_replace_policy(), Some(RemovalPolicy::Retain));
    assert_eq!(
        bucket.properties()["PublicAccessBlockConfiguration"],
        json!({
            "BlockPublicAcls": true,
            "BlockPublicPolicy": true,
            "IgnorePublicAcls": true,
            "RestrictPublicBuckets": true
        })
    );

    let bucket_policies = template.resources_of_type("AWS::S3::BucketPolicy");
    assert_eq!(bucket_policies.len(), 1);
    let (_, bucket_policy) = bucket_policies[0];
    assert_eq!(
        bucket_policy.properties()["Bucket"],
        json!({ "Ref": block.s3_logging_bucket().logical_id().as_str() })
    );
    assert_eq!(
        bucket_policy.properties()["PolicyDocument"]["Statement"][0]["Condition"],
        json!({ "Bool": { "aws:SecureTransport": "false" } })
    );
}

#[test]
fn log_policy_is_emitted_only_once_attached() {
    let mut stack = new_stack(DeploymentEnvironment::agnostic());
    let block = declare(&mut stack, "artifacts");

    let unattached = synthesize(&stack).unwrap_or_else(|_| unreachable!());
    assert!(unattached.resources_of_type("AWS::IAM::Policy").is_empty());

    let policy = block.cloud_watch_logs_policy().clone();
    assert!(stack.attach_policy(&policy, "SimulatorEngineRole").is_ok());
    let attached = synthesize(&stack).unwrap_or_else(|_| unreachable!());

    let resource = attached
        .resource(policy.logical_id())
        .unwrap_or_else(|| unreachable!());
    assert_eq!(resource.properties()["Roles"], json!(["SimulatorEngineRole"]));
    assert_eq!(
        resource.properties()["PolicyDocument"]["Statement"][0]["Action"],
        json!([
            "logs:CreateLogGroup",
            "logs:CreateLogStream",
            "logs:PutLogEvents"
        ])
    );
}

#[test]
fn deeply_nested_policy_name_fits_iam_limit() {
    let mut stack = new_stack(DeploymentEnvironment::agnostic());
    let mut scope = stack.root();
    for level in 0..8 {
        scope = stack
            .add_construct(&scope, &format!("DeeplyNestedApplicationLayer{level}"))
            .unwrap_or_else(|_| unreachable!());
    }
    let block = CommonResources::new(&mut stack, &scope, "CommonResources", props("artifacts"))
        .unwrap_or_else(|_| unreachable!());
    let policy = block.cloud_watch_logs_policy().clone();
    assert!(policy.logical_id().as_str().len() > 128);
    assert!(stack.attach_policy(&policy, "SimulatorEngineRole").is_ok());

    let template = synthesize(&stack).unwrap_or_else(|_| unreachable!());
    let resource = template
        .resource(policy.logical_id())
        .unwrap_or_else(|| unreachable!());
    let name = resource.properties()["PolicyName"]
        .as_str()
        .unwrap_or_default();
    assert_eq!(name.len(), 128);
    assert!(policy.logical_id().as_str().ends_with(name));
}

#[test]
fn source_bucket_reference_emits_no_resource() {
    let mut stack = new_stack(DeploymentEnvironment::agnostic());
    let block = declare(&mut stack, "artifacts");
    let template = synthesize(&stack).unwrap_or_else(|_| unreachable!());

    assert_eq!(template.resources().len(), 2);
    let grant = block.source_code_bucket().grant_read();
    assert_eq!(
        grant.resources()[0].to_template_value(),
        json!({ "Fn::Sub": "arn:${AWS::Partition}:s3:::artifacts" })
    );
}
