//! Declaration scopes, reusable blocks and synthesis services.

#![forbid(unsafe_code)]

mod common_resources;
mod stack;
mod synthesis;
mod synthesis_service;
mod template_ports;

pub use common_resources::{
    CLOUD_WATCH_LOGS_POLICY_ID, CommonResources, CommonResourcesProps, LAMBDA_LOG_GROUP_PATTERN,
    LOG_BUCKET_ID, SOURCE_CODE_BUCKET_ID,
};
pub use stack::{BUCKET_POLICY_CHILD_ID, DeclarationKind, DeclarationSummary, ScopePath, Stack};
pub use synthesis::synthesize;
pub use synthesis_service::SynthesisService;
pub use template_ports::TemplateRepository;
