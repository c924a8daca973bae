use std::env;
use std::path::PathBuf;

use stackforge_core::{AppError, AppResult, DeploymentEnvironment};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone)]
pub struct SynthConfig {
    pub stack_name: String,
    pub common_resources_id: String,
    pub source_code_bucket_name: String,
    pub environment: DeploymentEnvironment,
    pub log_policy_role_names: Vec<String>,
    pub output_dir: PathBuf,
}

impl SynthConfig {
    pub fn load() -> AppResult<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> AppResult<Self> {
        let optional = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_owned())
                .filter(|value| !value.is_empty())
        };

        let source_code_bucket_name = lookup("SOURCE_CODE_BUCKET_NAME")
            .ok_or_else(|| AppError::Validation("SOURCE_CODE_BUCKET_NAME is required".to_owned()))?;
        let stack_name =
            optional("STACK_NAME").unwrap_or_else(|| "CommonResourcesStack".to_owned());
        let common_resources_id =
            optional("COMMON_RESOURCES_ID").unwrap_or_else(|| "CommonResources".to_owned());
        let environment = DeploymentEnvironment::from_parts(
            optional("DEPLOY_PARTITION"),
            optional("DEPLOY_REGION"),
            optional("DEPLOY_ACCOUNT"),
        )?;

        if let Some(account) = environment.account().concrete()
            && (account.len() != 12 || !account.chars().all(|character| character.is_ascii_digit()))
        {
            return Err(AppError::Validation(format!(
                "invalid DEPLOY_ACCOUNT value '{account}': expected 12 digits"
            )));
        }

        let log_policy_role_names = optional("LOG_POLICY_ROLE_NAMES")
            .map(|value| {
                value
                    .split(',')
                    .map(str::trim)
                    .filter(|role| !role.is_empty())
                    .map(str::to_owned)
                    .collect()
            })
            .unwrap_or_default();
        let output_dir = optional("SYNTH_OUTPUT_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("stackforge.out"));

        Ok(Self {
            stack_name,
            common_resources_id,
            source_code_bucket_name,
            environment,
            log_policy_role_names,
            output_dir,
        })
    }
}

pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}
