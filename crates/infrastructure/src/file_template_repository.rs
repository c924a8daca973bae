use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use stackforge_application::TemplateRepository;
use stackforge_core::{AppError, AppResult};
use stackforge_domain::Template;
use tracing::info;

/// File name suffix of synthesized templates.
pub const TEMPLATE_FILE_SUFFIX: &str = ".template.json";

/// Template repository writing one pretty-printed JSON file per stack.
#[derive(Debug, Clone)]
pub struct FileTemplateRepository {
    output_dir: PathBuf,
}

impl FileTemplateRepository {
    /// Creates a repository rooted at `output_dir`. The directory is created on first save.
    #[must_use]
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    /// Returns the file a stack's template is written to.
    pub fn template_path(&self, stack_name: &str) -> AppResult<PathBuf> {
        if stack_name.is_empty()
            || stack_name
                .chars()
                .any(|character| matches!(character, '/' | '\\') || character.is_control())
            || stack_name == "."
            || stack_name == ".."
        {
            return Err(AppError::Validation(format!(
                "stack name '{stack_name}' cannot be used as a file name"
            )));
        }

        Ok(self
            .output_dir
            .join(format!("{stack_name}{TEMPLATE_FILE_SUFFIX}")))
    }

    /// Returns the output directory.
    #[must_use]
    pub fn output_dir(&self) -> &Path {
        self.output_dir.as_path()
    }
}

#[async_trait]
impl TemplateRepository for FileTemplateRepository {
    async fn save_template(&self, stack_name: &str, template: &Template) -> AppResult<()> {
        let path = self.template_path(stack_name)?;
        let body = serde_json::to_vec_pretty(template).map_err(|error| {
            AppError::Internal(format!(
                "failed to serialize template for stack '{stack_name}': {error}"
            ))
        })?;

        tokio::fs::create_dir_all(&self.output_dir)
            .await
            .map_err(|error| {
                AppError::Internal(format!(
                    "failed to create output directory '{}': {error}",
                    self.output_dir.display()
                ))
            })?;
        tokio::fs::write(&path, body).await.map_err(|error| {
            AppError::Internal(format!(
                "failed to write template '{}': {error}",
                path.display()
            ))
        })?;

        info!(
            stack = stack_name,
            path = %path.display(),
            "template written"
        );

        Ok(())
    }

    async fn find_template(&self, stack_name: &str) -> AppResult<Option<Template>> {
        let path = self.template_path(stack_name)?;
        let body = match tokio::fs::read(&path).await {
            Ok(body) => body,
            Err(error) if error.kind() == ErrorKind::NotFound => return Ok(None),
            Err(error) => {
                return Err(AppError::Internal(format!(
                    "failed to read template '{}': {error}",
                    path.display()
                )));
            }
        };

        serde_json::from_slice(&body).map(Some).map_err(|error| {
            AppError::Internal(format!(
                "failed to parse template '{}': {error}",
                path.display()
            ))
        })
    }
}
