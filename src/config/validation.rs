//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, addresses parse)
//! - Check every route compiles: template, methods, status
//! - Detect duplicate route names
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: AppConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::net::SocketAddr;

use axum::http::{Method, StatusCode};
use thiserror::Error;

use crate::config::schema::AppConfig;
use crate::routing::RouteTemplate;

/// One semantic problem in a configuration.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new("listener.bind_address", "not a socket address"));
    }
    if config.listener.request_timeout_secs == 0 {
        errors.push(ValidationError::new("listener.request_timeout_secs", "must be > 0"));
    }
    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new("observability.metrics_address", "not a socket address"));
    }

    let base = &config.dispatch.base_path;
    if !base.is_empty() && (!base.starts_with('/') || base.ends_with('/')) {
        errors.push(ValidationError::new(
            "dispatch.base_path",
            "must be empty or start with '/' without a trailing '/'",
        ));
    }
    if config.dispatch.error_template.is_empty() {
        errors.push(ValidationError::new("dispatch.error_template", "must not be empty"));
    }

    let mut names = HashSet::new();
    for (i, route) in config.dispatch.routes.iter().enumerate() {
        let field = |name: &str| format!("dispatch.routes[{}].{}", i, name);

        if route.name.is_empty() {
            errors.push(ValidationError::new(field("name"), "must not be empty"));
        } else if !names.insert(route.name.as_str()) {
            errors.push(ValidationError::new(field("name"), format!("duplicate route {:?}", route.name)));
        }
        if let Err(e) = RouteTemplate::parse(&route.template) {
            errors.push(ValidationError::new(field("template"), e.reason));
        }
        for method in &route.methods {
            if Method::from_bytes(method.to_ascii_uppercase().as_bytes()).is_err() {
                errors.push(ValidationError::new(field("methods"), format!("invalid method {:?}", method)));
            }
        }
        if StatusCode::from_u16(route.status).is_err() {
            errors.push(ValidationError::new(field("status"), format!("invalid status {}", route.status)));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RouteConfig;

    #[test]
    fn test_default_is_valid() {
        assert_eq!(validate_config(&AppConfig::default()), Ok(()));
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = AppConfig::default();
        config.listener.bind_address = "nowhere".into();
        config.listener.request_timeout_secs = 0;
        config.dispatch.base_path = "app/".into();
        config.dispatch.routes = vec![
            RouteConfig {
                name: "a".into(),
                template: "users/{id".into(),
                ..RouteConfig::default()
            },
            RouteConfig {
                name: "a".into(),
                methods: vec!["BAD METHOD".into()],
                status: 42,
                ..RouteConfig::default()
            },
        ];

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(
            fields,
            vec![
                "listener.bind_address",
                "listener.request_timeout_secs",
                "dispatch.base_path",
                "dispatch.routes[0].template",
                "dispatch.routes[1].name",
                "dispatch.routes[1].methods",
                "dispatch.routes[1].status",
            ]
        );
    }
}
