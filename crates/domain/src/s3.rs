use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use stackforge_core::{AppError, AppResult, DeploymentEnvironment, NonEmptyString};

use crate::{
    Arn, ArnComponents, Effect, LogicalId, PolicyStatement, Principal, RemovalPolicy,
    StatementCondition, format_arn,
};

/// Actions granted by `grant_read`.
pub const BUCKET_READ_ACTIONS: &[&str] = &["s3:GetObject*", "s3:GetBucket*", "s3:List*"];

/// Actions granted by `grant_write`.
pub const BUCKET_WRITE_ACTIONS: &[&str] = &[
    "s3:DeleteObject*",
    "s3:PutObject",
    "s3:PutObjectLegalHold",
    "s3:PutObjectRetention",
    "s3:PutObjectTagging",
    "s3:PutObjectVersionTagging",
    "s3:Abort*",
];

/// Who owns objects written into a bucket by other accounts or services.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ObjectOwnership {
    /// The writer keeps ownership; ACLs stay enabled.
    ObjectWriter,
    /// The bucket owner takes ownership when the writer grants full control.
    BucketOwnerPreferred,
    /// ACLs are disabled and the bucket owner owns everything.
    BucketOwnerEnforced,
}

impl ObjectOwnership {
    /// Returns the template value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ObjectWriter => "ObjectWriter",
            Self::BucketOwnerPreferred => "BucketOwnerPreferred",
            Self::BucketOwnerEnforced => "BucketOwnerEnforced",
        }
    }
}

/// Canned bucket ACL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BucketAccessControl {
    /// Owner-only access.
    Private,
    /// Lets the log delivery group write access logs.
    LogDeliveryWrite,
    /// Grants the bucket owner full control of written objects.
    BucketOwnerFullControl,
}

impl BucketAccessControl {
    /// Returns the template value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Private => "Private",
            Self::LogDeliveryWrite => "LogDeliveryWrite",
            Self::BucketOwnerFullControl => "BucketOwnerFullControl",
        }
    }
}

/// Public-access block flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockPublicAccess {
    /// Rejects new public ACLs.
    pub block_public_acls: bool,
    /// Rejects public bucket policies.
    pub block_public_policy: bool,
    /// Ignores existing public ACLs.
    pub ignore_public_acls: bool,
    /// Restricts access under public policies to the owning account.
    pub restrict_public_buckets: bool,
}

impl BlockPublicAccess {
    /// Enables all four flags.
    #[must_use]
    pub fn block_all() -> Self {
        Self {
            block_public_acls: true,
            block_public_policy: true,
            ignore_public_acls: true,
            restrict_public_buckets: true,
        }
    }

    /// Returns whether every flag is enabled.
    #[must_use]
    pub fn blocks_all(&self) -> bool {
        self.block_public_acls
            && self.block_public_policy
            && self.ignore_public_acls
            && self.restrict_public_buckets
    }

    fn to_template_value(self) -> Value {
        json!({
            "BlockPublicAcls": self.block_public_acls,
            "BlockPublicPolicy": self.block_public_policy,
            "IgnorePublicAcls": self.ignore_public_acls,
            "RestrictPublicBuckets": self.restrict_public_buckets,
        })
    }
}

/// Server-side encryption mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BucketEncryption {
    /// Keys managed by the storage service (SSE-S3).
    S3Managed,
    /// Keys managed by the key management service (SSE-KMS).
    KmsManaged,
}

impl BucketEncryption {
    /// Returns the SSE algorithm name.
    #[must_use]
    pub fn algorithm(&self) -> &'static str {
        match self {
            Self::S3Managed => "AES256",
            Self::KmsManaged => "aws:kms",
        }
    }
}

/// Declarative bucket settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketProps {
    bucket_name: Option<NonEmptyString>,
    object_ownership: Option<ObjectOwnership>,
    access_control: Option<BucketAccessControl>,
    block_public_access: Option<BlockPublicAccess>,
    encryption: Option<BucketEncryption>,
    removal_policy: RemovalPolicy,
    enforce_ssl: bool,
}

impl Default for BucketProps {
    fn default() -> Self {
        Self {
            bucket_name: None,
            object_ownership: None,
            access_control: None,
            block_public_access: None,
            encryption: None,
            removal_policy: RemovalPolicy::Retain,
            enforce_ssl: false,
        }
    }
}

impl BucketProps {
    /// Settings for a bucket that receives access logs from other resources.
    ///
    /// Ownership, ACL, public-access block, encryption, retention and TLS
    /// enforcement are set together.
    #[must_use]
    pub fn access_log_destination() -> Self {
        Self::default()
            .with_object_ownership(ObjectOwnership::ObjectWriter)
            .with_access_control(BucketAccessControl::LogDeliveryWrite)
            .with_block_public_access(BlockPublicAccess::block_all())
            .with_encryption(BucketEncryption::S3Managed)
            .with_removal_policy(RemovalPolicy::Retain)
            .with_enforce_ssl(true)
    }

    /// Sets an explicit physical bucket name.
    pub fn with_bucket_name(mut self, bucket_name: impl Into<String>) -> AppResult<Self> {
        self.bucket_name = Some(NonEmptyString::named("bucket name", bucket_name)?);
        Ok(self)
    }

    /// Sets object ownership.
    #[must_use]
    pub fn with_object_ownership(mut self, object_ownership: ObjectOwnership) -> Self {
        self.object_ownership = Some(object_ownership);
        self
    }

    /// Sets the canned ACL.
    #[must_use]
    pub fn with_access_control(mut self, access_control: BucketAccessControl) -> Self {
        self.access_control = Some(access_control);
        self
    }

    /// Sets the public-access block.
    #[must_use]
    pub fn with_block_public_access(mut self, block_public_access: BlockPublicAccess) -> Self {
        self.block_public_access = Some(block_public_access);
        self
    }

    /// Sets server-side encryption.
    #[must_use]
    pub fn with_encryption(mut self, encryption: BucketEncryption) -> Self {
        self.encryption = Some(encryption);
        self
    }

    /// Sets what happens to the bucket when the template is destroyed.
    #[must_use]
    pub fn with_removal_policy(mut self, removal_policy: RemovalPolicy) -> Self {
        self.removal_policy = removal_policy;
        self
    }

    /// Requires TLS for every request.
    #[must_use]
    pub fn with_enforce_ssl(mut self, enforce_ssl: bool) -> Self {
        self.enforce_ssl = enforce_ssl;
        self
    }
}

/// Validated bucket declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketDefinition {
    props: BucketProps,
}

impl BucketDefinition {
    /// Validates bucket settings.
    pub fn new(props: BucketProps) -> AppResult<Self> {
        if props.access_control == Some(BucketAccessControl::LogDeliveryWrite)
            && props.object_ownership == Some(ObjectOwnership::BucketOwnerEnforced)
        {
            return Err(AppError::Validation(
                "log delivery write access control requires ACLs; object ownership must not be BucketOwnerEnforced"
                    .to_owned(),
            ));
        }

        if props.removal_policy == RemovalPolicy::Snapshot {
            return Err(AppError::Validation(
                "buckets do not support the snapshot removal policy".to_owned(),
            ));
        }

        Ok(Self { props })
    }

    /// Returns the physical bucket name, if one was set.
    #[must_use]
    pub fn bucket_name(&self) -> Option<&NonEmptyString> {
        self.props.bucket_name.as_ref()
    }

    /// Returns object ownership.
    #[must_use]
    pub fn object_ownership(&self) -> Option<ObjectOwnership> {
        self.props.object_ownership
    }

    /// Returns the canned ACL.
    #[must_use]
    pub fn access_control(&self) -> Option<BucketAccessControl> {
        self.props.access_control
    }

    /// Returns the public-access block.
    #[must_use]
    pub fn block_public_access(&self) -> Option<BlockPublicAccess> {
        self.props.block_public_access
    }

    /// Returns server-side encryption.
    #[must_use]
    pub fn encryption(&self) -> Option<BucketEncryption> {
        self.props.encryption
    }

    /// Returns the removal policy.
    #[must_use]
    pub fn removal_policy(&self) -> RemovalPolicy {
        self.props.removal_policy
    }

    /// Returns whether TLS is required.
    #[must_use]
    pub fn enforce_ssl(&self) -> bool {
        self.props.enforce_ssl
    }

    /// Renders `AWS::S3::Bucket` properties.
    #[must_use]
    pub fn to_template_properties(&self) -> Map<String, Value> {
        let mut properties = Map::new();

        if let Some(access_control) = self.props.access_control {
            properties.insert(
                "AccessControl".to_owned(),
                Value::String(access_control.as_str().to_owned()),
            );
        }

        if let Some(encryption) = self.props.encryption {
            properties.insert(
                "BucketEncryption".to_owned(),
                json!({
                    "ServerSideEncryptionConfiguration": [
                        { "ServerSideEncryptionByDefault": { "SSEAlgorithm": encryption.algorithm() } }
                    ]
                }),
            );
        }

        if let Some(bucket_name) = &self.props.bucket_name {
            properties.insert(
                "BucketName".to_owned(),
                Value::String(bucket_name.as_str().to_owned()),
            );
        }

        if let Some(object_ownership) = self.props.object_ownership {
            properties.insert(
                "OwnershipControls".to_owned(),
                json!({ "Rules": [{ "ObjectOwnership": object_ownership.as_str() }] }),
            );
        }

        if let Some(block_public_access) = self.props.block_public_access {
            properties.insert(
                "PublicAccessBlockConfiguration".to_owned(),
                block_public_access.to_template_value(),
            );
        }

        properties
    }
}

/// Statement denying every request that does not use TLS.
#[must_use]
pub fn tls_enforcement_statement(bucket_arn: &Arn) -> PolicyStatement {
    PolicyStatement::from_parts(
        Effect::Deny,
        vec!["s3:*".to_owned()],
        vec![bucket_arn.clone(), bucket_arn.with_suffix("/*")],
    )
    .with_principal(Principal::Any)
    .with_condition(StatementCondition::new(
        "Bool",
        "aws:SecureTransport",
        Value::String("false".to_owned()),
    ))
}

/// Bucket declared and lifecycle-managed by the template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnedBucket {
    logical_id: LogicalId,
    definition: BucketDefinition,
}

impl OwnedBucket {
    /// Creates a handle for a declared bucket.
    #[must_use]
    pub fn new(logical_id: LogicalId, definition: BucketDefinition) -> Self {
        Self {
            logical_id,
            definition,
        }
    }

    /// Returns the logical id of the bucket resource.
    #[must_use]
    pub fn logical_id(&self) -> &LogicalId {
        &self.logical_id
    }

    /// Returns the declared settings.
    #[must_use]
    pub fn definition(&self) -> &BucketDefinition {
        &self.definition
    }

    /// Returns what happens to the bucket when the template is destroyed.
    #[must_use]
    pub fn removal_policy(&self) -> RemovalPolicy {
        self.definition.removal_policy()
    }
}

/// Bucket that exists outside the template and is only referenced by name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalBucket {
    name: NonEmptyString,
    arn: Arn,
}

impl ExternalBucket {
    /// Resolves a bucket by name. Existence is only checked at deploy time.
    pub fn from_bucket_name(
        name: NonEmptyString,
        environment: &DeploymentEnvironment,
    ) -> AppResult<Self> {
        let components = ArnComponents::new("s3", name.as_str())?
            .with_region("")
            .with_account("");
        let arn = format_arn(&components, environment)?;

        Ok(Self { name, arn })
    }

    /// Returns the bucket name exactly as supplied.
    #[must_use]
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Returns the bucket ARN.
    #[must_use]
    pub fn arn(&self) -> &Arn {
        &self.arn
    }
}

/// A bucket handle, either owned by the template or referenced by name.
///
/// Only [`OwnedBucket`] exposes lifecycle settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BucketRef {
    /// Declared by this template.
    Owned(OwnedBucket),
    /// Managed elsewhere.
    Referenced(ExternalBucket),
}

impl BucketRef {
    /// Returns the bucket name as a template value.
    #[must_use]
    pub fn bucket_name(&self) -> Value {
        match self {
            Self::Owned(bucket) => json!({ "Ref": bucket.logical_id().as_str() }),
            Self::Referenced(bucket) => Value::String(bucket.name().to_owned()),
        }
    }

    /// Returns the bucket ARN.
    #[must_use]
    pub fn bucket_arn(&self) -> Arn {
        match self {
            Self::Owned(bucket) => Arn::attribute_of(bucket.logical_id().clone()),
            Self::Referenced(bucket) => bucket.arn().clone(),
        }
    }

    /// Returns the ARN of objects matching `key_pattern`.
    #[must_use]
    pub fn arn_for_objects(&self, key_pattern: &str) -> Arn {
        self.bucket_arn().with_suffix(&format!("/{key_pattern}"))
    }

    /// Returns the owned bucket, if this template manages it.
    #[must_use]
    pub fn as_owned(&self) -> Option<&OwnedBucket> {
        match self {
            Self::Owned(bucket) => Some(bucket),
            Self::Referenced(_) => None,
        }
    }

    /// Statement granting read access to the bucket and its objects.
    #[must_use]
    pub fn grant_read(&self) -> PolicyStatement {
        self.grant(BUCKET_READ_ACTIONS.iter().copied())
    }

    /// Statement granting write access to the bucket's objects.
    #[must_use]
    pub fn grant_write(&self) -> PolicyStatement {
        self.grant(BUCKET_WRITE_ACTIONS.iter().copied())
    }

    /// Statement granting read and write access.
    #[must_use]
    pub fn grant_read_write(&self) -> PolicyStatement {
        self.grant(
            BUCKET_READ_ACTIONS
                .iter()
                .chain(BUCKET_WRITE_ACTIONS.iter())
                .copied(),
        )
    }

    fn grant<'a>(&self, actions: impl Iterator<Item = &'a str>) -> PolicyStatement {
        PolicyStatement::from_parts(
            Effect::Allow,
            actions.map(str::to_owned).collect(),
            vec![self.bucket_arn(), self.arn_for_objects("*")],
        )
    }
}

impl From<OwnedBucket> for BucketRef {
    fn from(bucket: OwnedBucket) -> Self {
        Self::Owned(bucket)
    }
}

impl From<ExternalBucket> for BucketRef {
    fn from(bucket: ExternalBucket) -> Self {
        Self::Referenced(bucket)
    }
}
