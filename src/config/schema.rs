//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from TOML. Every
//! section is optional; an empty file yields a server with no routes.

use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::template::ERROR_TEMPLATE;

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Listener configuration (bind address, limits).
    pub listener: ListenerConfig,

    /// Dispatcher behavior and the static route table.
    pub dispatch: DispatchConfig,

    /// Template lookup.
    pub templates: TemplateConfig,

    /// String catalog for the localizer.
    pub localization: LocalizationConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Whole-request timeout in seconds.
    pub request_timeout_secs: u64,

    /// Largest request body buffered for form parsing.
    pub max_body_bytes: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            request_timeout_secs: 30,
            max_body_bytes: 1024 * 1024,
        }
    }
}

/// What happens when a request carries credentials that do not verify.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthPolicy {
    /// Continue as the anonymous user.
    #[default]
    Anonymous,
    /// Abort with 401.
    Reject,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DispatchConfig {
    pub auth_policy: AuthPolicy,

    /// Path prefix the application is mounted under ("" for the root).
    pub base_path: String,

    /// Template name used for error pages.
    pub error_template: String,

    /// Static-response routes, matched in order.
    pub routes: Vec<RouteConfig>,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            auth_policy: AuthPolicy::Anonymous,
            base_path: String::new(),
            error_template: ERROR_TEMPLATE.to_string(),
            routes: Vec::new(),
        }
    }
}

/// A route answering with a fixed, placeholder-rendered body.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RouteConfig {
    /// Route identifier for logging/metrics.
    pub name: String,

    /// Path template, e.g. "/users/{id}".
    pub template: String,

    /// Allowed methods. Empty allows all.
    pub methods: Vec<String>,

    /// Minimum role code required.
    pub min_role: Option<i32>,

    pub status: u16,

    /// Body template; `{{name}}` markers take query values, route
    /// parameters, `path` and `user`.
    pub body: String,

    /// Overrides the `text/html` content type of the rendered body.
    pub content_type: Option<String>,
}

impl Default for RouteConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            template: "/".to_string(),
            methods: Vec::new(),
            min_role: None,
            status: 200,
            body: String::new(),
            content_type: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct TemplateConfig {
    /// Directory searched for `<name>.html`.
    pub directory: Option<PathBuf>,

    /// Named template sources; these win over the directory.
    pub inline: HashMap<String, String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LocalizationConfig {
    pub locale: String,
    pub strings: HashMap<String, String>,
}

impl Default for LocalizationConfig {
    fn default() -> Self {
        Self {
            locale: "en".to_string(),
            strings: HashMap::new(),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error). `RUST_LOG` wins when set.
    pub log_level: String,

    /// Emit logs as JSON lines.
    pub json_logs: bool,

    /// Enable the Prometheus endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_defaults() {
        let config: AppConfig = toml::from_str("").unwrap();
        assert_eq!(config.listener.bind_address, "0.0.0.0:8080");
        assert_eq!(config.dispatch.auth_policy, AuthPolicy::Anonymous);
        assert_eq!(config.dispatch.error_template, "error");
        assert_eq!(config.localization.locale, "en");
        assert!(config.dispatch.routes.is_empty());
    }

    #[test]
    fn test_full_config() {
        let config: AppConfig = toml::from_str(
            r#"
            [listener]
            bind_address = "127.0.0.1:3000"

            [dispatch]
            auth_policy = "reject"
            base_path = "/app"

            [[dispatch.routes]]
            name = "user"
            template = "/users/{id}"
            methods = ["GET"]
            min_role = 10
            body = "user {{id}}"

            [localization]
            locale = "de"
            strings = { "error.404" = "Nicht gefunden" }

            [templates.inline]
            error = "{{code}}"
            "#,
        )
        .unwrap();

        assert_eq!(config.dispatch.auth_policy, AuthPolicy::Reject);
        assert_eq!(config.dispatch.routes[0].status, 200);
        assert_eq!(config.dispatch.routes[0].min_role, Some(10));
        assert_eq!(config.localization.strings["error.404"], "Nicht gefunden");
        assert_eq!(config.templates.inline["error"], "{{code}}");
    }
}
