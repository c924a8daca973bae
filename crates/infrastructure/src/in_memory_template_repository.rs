use std::collections::HashMap;

use async_trait::async_trait;
use stackforge_application::TemplateRepository;
use stackforge_core::AppResult;
use stackforge_domain::Template;
use tokio::sync::RwLock;

/// In-memory template repository implementation.
#[derive(Debug, Default)]
pub struct InMemoryTemplateRepository {
    templates: RwLock<HashMap<String, Template>>,
}

impl InMemoryTemplateRepository {
    /// Creates an empty in-memory repository.
    #[must_use]
    pub fn new() -> Self {
        Self {
            templates: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the names of stacks with a stored template, sorted.
    pub async fn stack_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.templates.read().await.keys().cloned().collect();
        names.sort();
        names
    }
}

#[async_trait]
impl TemplateRepository for InMemoryTemplateRepository {
    async fn save_template(&self, stack_name: &str, template: &Template) -> AppResult<()> {
        self.templates
            .write()
            .await
            .insert(stack_name.to_owned(), template.clone());
        Ok(())
    }

    async fn find_template(&self, stack_name: &str) -> AppResult<Option<Template>> {
        Ok(self.templates.read().await.get(stack_name).cloned())
    }
}
