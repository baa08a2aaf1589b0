//! Loading pre-parsed templates for `include`.

use std::fs;
use std::io;
use std::path::Path;
use thiserror::Error;

use crate::ast::Template;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read template: {0}")]
    Io(#[from] io::Error),
    #[error("invalid template AST: {0}")]
    Json(#[from] serde_json::Error),
}

pub trait TemplateLoader {
    fn load(&self, path: &Path) -> Result<Template, LoadError>;
}

/// Reads AST JSON files written by the parser.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonFileLoader;

impl TemplateLoader for JsonFileLoader {
    fn load(&self, path: &Path) -> Result<Template, LoadError> {
        let source = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&source)?)
    }
}
