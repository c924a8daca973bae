use stackforge_core::{AppResult, NonEmptyString};
use stackforge_domain::{
    ArnComponents, ArnFormat, BucketProps, BucketRef, Effect, LogAction, OwnedBucket,
    PolicyDocument, PolicyHandle, PolicyStatement, SuppressionRule, format_arn,
};
use tracing::info;

use crate::{ScopePath, Stack};

/// Id of the log-write policy inside the block.
pub const CLOUD_WATCH_LOGS_POLICY_ID: &str = "CloudWatchLogsPolicy";
/// Id of the access-log bucket inside the block.
pub const LOG_BUCKET_ID: &str = "LogBucket";
/// Id of the source bucket reference inside the block.
pub const SOURCE_CODE_BUCKET_ID: &str = "SourceCodeBucket";
/// Log groups the log-write policy covers.
pub const LAMBDA_LOG_GROUP_PATTERN: &str = "/aws/lambda/*";

/// Input for [`CommonResources`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommonResourcesProps {
    /// Name of an existing bucket holding deployment artifacts.
    pub source_code_bucket_name: String,
}

/// Shared resources every function in a deployment relies on.
///
/// Declares a write-only log policy, a bucket that receives access logs and a
/// reference to the existing source artifact bucket.
#[derive(Debug, Clone)]
pub struct CommonResources {
    path: ScopePath,
    cloud_watch_logs_policy: PolicyHandle,
    s3_logging_bucket: OwnedBucket,
    source_code_bucket: BucketRef,
}

impl CommonResources {
    /// Declares the block as `id` inside `scope`.
    ///
    /// An empty bucket name is rejected before anything is registered, so a
    /// failed call leaves the stack untouched.
    pub fn new(
        stack: &mut Stack,
        scope: &ScopePath,
        id: &str,
        props: CommonResourcesProps,
    ) -> AppResult<Self> {
        let source_code_bucket_name =
            NonEmptyString::named("source_code_bucket_name", props.source_code_bucket_name)?;
        let log_write_document = log_write_policy_document(stack)?;
        let suppressions = log_bucket_suppressions()?;

        let path = stack.add_construct(scope, id)?;
        let cloud_watch_logs_policy =
            stack.add_policy(&path, CLOUD_WATCH_LOGS_POLICY_ID, log_write_document)?;

        let s3_logging_bucket =
            stack.add_bucket(&path, LOG_BUCKET_ID, BucketProps::access_log_destination())?;
        stack.add_suppress_rules(s3_logging_bucket.logical_id(), suppressions)?;

        let source_code_bucket = BucketRef::Referenced(stack.import_bucket(
            &path,
            SOURCE_CODE_BUCKET_ID,
            source_code_bucket_name,
        )?);

        info!(
            stack = %stack.name(),
            path = %path,
            log_bucket = %s3_logging_bucket.logical_id(),
            "common resources declared"
        );

        Ok(Self {
            path,
            cloud_watch_logs_policy,
            s3_logging_bucket,
            source_code_bucket,
        })
    }

    /// Returns the block's scope.
    #[must_use]
    pub fn path(&self) -> &ScopePath {
        &self.path
    }

    /// Returns the write-only log policy.
    #[must_use]
    pub fn cloud_watch_logs_policy(&self) -> &PolicyHandle {
        &self.cloud_watch_logs_policy
    }

    /// Returns the access-log bucket.
    #[must_use]
    pub fn s3_logging_bucket(&self) -> &OwnedBucket {
        &self.s3_logging_bucket
    }

    /// Returns the source artifact bucket reference.
    #[must_use]
    pub fn source_code_bucket(&self) -> &BucketRef {
        &self.source_code_bucket
    }
}

fn log_write_policy_document(stack: &Stack) -> AppResult<PolicyDocument> {
    let log_groups = ArnComponents::new("logs", "log-group")?
        .with_resource_name(LAMBDA_LOG_GROUP_PATTERN, ArnFormat::ColonResourceName);
    let resource = format_arn(&log_groups, stack.environment())?;
    let statement = PolicyStatement::new(
        Effect::Allow,
        LogAction::write_actions().iter().map(LogAction::as_str),
        vec![resource],
    )?;

    Ok(PolicyDocument::new(vec![statement]))
}

fn log_bucket_suppressions() -> AppResult<Vec<SuppressionRule>> {
    Ok(vec![
        SuppressionRule::new(
            "W35",
            "This bucket is to store S3 logs, so it does not require access logs.",
        )?,
        SuppressionRule::new(
            "W51",
            "This bucket is to store S3 logs, so it does not require S3 policy.",
        )?,
    ])
}

#[cfg(test)]
mod tests;
