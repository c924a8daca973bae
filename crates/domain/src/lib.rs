//! Declarable resource types and their template rendering.

#![forbid(unsafe_code)]

mod arn;
mod iam;
mod logical_id;
mod s3;
mod suppression;
mod template;

pub use arn::{Arn, ArnComponents, ArnFormat, format_arn};
pub use iam::{
    Effect, LogAction, POLICY_LANGUAGE_VERSION, PolicyDocument, PolicyHandle, PolicyStatement,
    Principal, StatementCondition,
};
pub use logical_id::{HIDDEN_COMPONENT, HIDDEN_FROM_HUMAN_COMPONENT, LogicalId};
pub use s3::{
    BUCKET_READ_ACTIONS, BUCKET_WRITE_ACTIONS, BlockPublicAccess, BucketAccessControl,
    BucketDefinition, BucketEncryption, BucketProps, BucketRef, ExternalBucket, ObjectOwnership,
    OwnedBucket, tls_enforcement_statement,
};
pub use suppression::{CONSTRUCT_PATH_METADATA_KEY, ResourceMetadata, SuppressionRule};
pub use template::{
    DestroyPlan, RemovalPolicy, ResourceDefinition, TEMPLATE_FORMAT_VERSION, Template,
};
