//! `{{name}}` substitution templates.

use std::fs;
use std::path::Path;

use serde_json::Value;

use crate::template::{Template, TemplateError};

/// Replaces `{{ key }}` markers with values from the render content.
///
/// String values are HTML-escaped, other JSON values are written in their
/// JSON form, and unknown keys render as nothing. An unterminated marker is
/// copied through unchanged.
#[derive(Debug, Clone)]
pub struct PlaceholderTemplate {
    source: String,
    rendered: Option<String>,
}

impl Template for PlaceholderTemplate {
    fn from_file(path: &Path) -> Result<Self, TemplateError> {
        let source = fs::read_to_string(path).map_err(|source| TemplateError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::from_string(&source))
    }

    fn from_string(source: &str) -> Self {
        Self {
            source: source.to_string(),
            rendered: None,
        }
    }

    fn render_with(&mut self, content: &Value) -> Result<(), TemplateError> {
        let content = content.as_object().ok_or(TemplateError::InvalidContent)?;

        let mut out = String::with_capacity(self.source.len());
        let mut rest = self.source.as_str();
        while let Some(start) = rest.find("{{") {
            out.push_str(&rest[..start]);
            let after = &rest[start + 2..];
            let Some(end) = after.find("}}") else {
                out.push_str(&rest[start..]);
                rest = "";
                break;
            };
            match content.get(after[..end].trim()) {
                Some(Value::String(s)) => out.push_str(&escape_html(s)),
                Some(Value::Null) | None => {}
                Some(other) => out.push_str(&other.to_string()),
            }
            rest = &after[end + 2..];
        }
        out.push_str(rest);

        self.rendered = Some(out);
        Ok(())
    }

    fn get_string(&self) -> String {
        self.rendered.clone().unwrap_or_else(|| self.source.clone())
    }
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
