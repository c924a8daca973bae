use async_trait::async_trait;
use stackforge_core::AppResult;
use stackforge_domain::Template;

/// Repository port for synthesized templates.
#[async_trait]
pub trait TemplateRepository: Send + Sync {
    /// Stores the template for a stack, replacing any previous synthesis.
    async fn save_template(&self, stack_name: &str, template: &Template) -> AppResult<()>;

    /// Loads the last stored template for a stack.
    async fn find_template(&self, stack_name: &str) -> AppResult<Option<Template>>;
}
