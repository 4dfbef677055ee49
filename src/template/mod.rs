//! Template collaborator.
//!
//! The dispatcher only hands a template its content and reads the rendered
//! string back; how rendering works is up to the implementation.

pub mod placeholder;

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde_json::Value;
use thiserror::Error;

pub use placeholder::PlaceholderTemplate;

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("failed to read template {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("template {0:?} not found")]
    NotFound(String),

    #[error("render content must be a JSON object")]
    InvalidContent,
}

/// A loaded template.
pub trait Template: Send {
    fn from_file(path: &Path) -> Result<Self, TemplateError>
    where
        Self: Sized;

    fn from_string(source: &str) -> Self
    where
        Self: Sized;

    /// Render the template with `content` (a JSON object). The result is
    /// available from [`Template::get_string`].
    fn render_with(&mut self, content: &Value) -> Result<(), TemplateError>;

    /// The rendered output, or the raw source if nothing was rendered yet.
    fn get_string(&self) -> String;
}

/// Named template lookup used by the dispatcher and handlers.
pub trait TemplateSource: Send + Sync {
    fn load(&self, name: &str) -> Result<Box<dyn Template>, TemplateError>;
}

/// Name of the template used for error responses.
pub const ERROR_TEMPLATE: &str = "error";

/// Built-in error page.
pub const DEFAULT_ERROR_TEMPLATE: &str = "<!DOCTYPE html>\n<html><head><title>{{code}} {{title}}</title></head>\n<body><h1>{{code}} {{title}}</h1><p>{{detail}}</p></body></html>\n";

/// [`TemplateSource`] producing [`PlaceholderTemplate`]s from inline sources
/// first, then from `<directory>/<name>.html`.
#[derive(Debug, Clone)]
pub struct PlaceholderTemplates {
    inline: HashMap<String, String>,
    directory: Option<PathBuf>,
}

impl PlaceholderTemplates {
    /// A source that knows only the built-in error page.
    pub fn new() -> Self {
        let mut inline = HashMap::new();
        inline.insert(ERROR_TEMPLATE.to_string(), DEFAULT_ERROR_TEMPLATE.to_string());
        Self {
            inline,
            directory: None,
        }
    }

    pub fn with_inline(mut self, name: impl Into<String>, source: impl Into<String>) -> Self {
        self.inline.insert(name.into(), source.into());
        self
    }

    /// Look up templates missing from the inline set under `directory`.
    pub fn with_directory(mut self, directory: impl Into<PathBuf>) -> Self {
        self.directory = Some(directory.into());
        self
    }
}

impl Default for PlaceholderTemplates {
    fn default() -> Self {
        Self::new()
    }
}

impl TemplateSource for PlaceholderTemplates {
    fn load(&self, name: &str) -> Result<Box<dyn Template>, TemplateError> {
        if let Some(source) = self.inline.get(name) {
            return Ok(Box::new(PlaceholderTemplate::from_string(source)));
        }
        match &self.directory {
            Some(dir) => {
                let path = dir.join(format!("{}.html", name));
                if !path.exists() {
                    return Err(TemplateError::NotFound(name.to_string()));
                }
                Ok(Box::new(PlaceholderTemplate::from_file(&path)?))
            }
            None => Err(TemplateError::NotFound(name.to_string())),
        }
    }
}
