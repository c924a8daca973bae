//! Infrastructure adapters for application ports.

#![forbid(unsafe_code)]

mod file_template_repository;
mod in_memory_template_repository;

pub use file_template_repository::{FileTemplateRepository, TEMPLATE_FILE_SUFFIX};
pub use in_memory_template_repository::InMemoryTemplateRepository;
