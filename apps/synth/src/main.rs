//! Stackforge template synthesizer.

#![forbid(unsafe_code)]

mod synth_config;

use std::sync::Arc;

use stackforge_application::{CommonResources, CommonResourcesProps, Stack, SynthesisService};
use stackforge_core::AppError;
use stackforge_infrastructure::FileTemplateRepository;
use tracing::info;

use crate::synth_config::{SynthConfig, init_tracing};

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = SynthConfig::load()?;
    info!(
        stack = %config.stack_name,
        output_dir = %config.output_dir.display(),
        environment_is_concrete = config.environment.is_concrete(),
        "stackforge-synth started"
    );

    let mut stack = Stack::new(config.stack_name.as_str(), config.environment.clone())?
        .with_description("Shared log policy, access-log bucket and source artifact bucket");
    let root = stack.root();
    let common_resources = CommonResources::new(
        &mut stack,
        &root,
        config.common_resources_id.as_str(),
        CommonResourcesProps {
            source_code_bucket_name: config.source_code_bucket_name.clone(),
        },
    )?;

    for role_name in &config.log_policy_role_names {
        stack.attach_policy(common_resources.cloud_watch_logs_policy(), role_name)?;
    }

    let repository = Arc::new(FileTemplateRepository::new(config.output_dir.clone()));
    let service = SynthesisService::new(repository);
    let template = service.synthesize_and_store(&stack).await?;

    info!(
        stack = %stack.name(),
        resource_count = template.resources().len(),
        retained = template.destroy_plan().retained.len(),
        "synthesis finished"
    );

    Ok(())
}
