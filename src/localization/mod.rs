//! Localization collaborator.

use std::collections::HashMap;

use crate::dispatch::Dispatcher;
use crate::http::Request;

/// Supplies user-facing strings and locale-aware paths.
pub trait Localizer: Send + Sync {
    /// The localized string for `key`, if the catalog has one.
    fn get_string(&self, key: &str) -> Option<String>;

    /// The canonical, locale-qualified path of `request` within `app`.
    fn get_canonical_path(&self, request: &Request, app: &Dispatcher) -> String;
}

/// Single-locale in-memory catalog.
///
/// Canonical paths take the form `<base path>/<locale><path>`, with any
/// locale prefix already present on the request path kept as-is.
#[derive(Debug, Clone)]
pub struct MapLocalizer {
    locale: String,
    strings: HashMap<String, String>,
}

impl MapLocalizer {
    pub fn new(locale: impl Into<String>) -> Self {
        Self {
            locale: locale.into(),
            strings: HashMap::new(),
        }
    }

    pub fn with_strings(mut self, strings: HashMap<String, String>) -> Self {
        self.strings.extend(strings);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.strings.insert(key.into(), value.into());
    }

    pub fn locale(&self) -> &str {
        &self.locale
    }
}

impl Default for MapLocalizer {
    fn default() -> Self {
        Self::new("en")
    }
}

impl Localizer for MapLocalizer {
    fn get_string(&self, key: &str) -> Option<String> {
        self.strings.get(key).cloned()
    }

    fn get_canonical_path(&self, request: &Request, app: &Dispatcher) -> String {
        let base = app.base_path().trim_end_matches('/');
        let path = request.uri().path();
        let relative = path.strip_prefix(base).filter(|p| p.starts_with('/')).unwrap_or(path);

        let prefix = format!("/{}", self.locale);
        if relative == prefix || relative.starts_with(&format!("{}/", prefix)) {
            format!("{}{}", base, relative)
        } else {
            format!("{}{}{}", base, prefix, relative)
        }
    }
}
