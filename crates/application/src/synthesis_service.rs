use std::sync::Arc;

use stackforge_core::{AppError, AppResult};
use stackforge_domain::Template;
use tracing::info;

use crate::Stack;
use crate::synthesis::synthesize;
use crate::template_ports::TemplateRepository;

/// Application service that synthesizes stacks and stores the result.
#[derive(Clone)]
pub struct SynthesisService {
    repository: Arc<dyn TemplateRepository>,
}

impl SynthesisService {
    /// Creates a new synthesis service from a repository implementation.
    #[must_use]
    pub fn new(repository: Arc<dyn TemplateRepository>) -> Self {
        Self { repository }
    }

    /// Synthesizes `stack` and stores the template under the stack name.
    pub async fn synthesize_and_store(&self, stack: &Stack) -> AppResult<Template> {
        let template = synthesize(stack)?;
        self.repository
            .save_template(stack.name(), &template)
            .await?;

        info!(
            stack = %stack.name(),
            resource_count = template.resources().len(),
            "template stored"
        );

        Ok(template)
    }

    /// Loads a previously stored template.
    pub async fn load_template(&self, stack_name: &str) -> AppResult<Template> {
        self.repository
            .find_template(stack_name)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("no template stored for stack '{stack_name}'")))
    }
}
