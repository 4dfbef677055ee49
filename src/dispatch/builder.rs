//! Dispatcher construction.
//!
//! Collaborators left unset fall back to in-memory defaults: [`MemoryDb`],
//! [`PlaceholderTemplates`] with the built-in error page, and an English
//! [`MapLocalizer`] with no strings.

use std::sync::Arc;

use axum::http::{header, HeaderValue, Method, StatusCode};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::auth::Role;
use crate::config::{AppConfig, DispatchConfig, RouteConfig};
use crate::db::{Db, MemoryDb};
use crate::dispatch::{Context, Dispatcher};
use crate::events::ListenerRegistry;
use crate::http::Request;
use crate::localization::{Localizer, MapLocalizer};
use crate::routing::{Route, Router, TemplateSyntaxError};
use crate::template::{PlaceholderTemplates, TemplateSource};

/// A configured route that cannot be built.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error(transparent)]
    Template(#[from] TemplateSyntaxError),

    #[error("route {route}: invalid method {method:?}")]
    Method { route: String, method: String },

    #[error("route {route}: invalid status {status}")]
    Status { route: String, status: u16 },

    #[error("route {route}: invalid content type {content_type:?}")]
    ContentType { route: String, content_type: String },
}

#[derive(Default)]
pub struct DispatcherBuilder {
    router: Router,
    db: Option<Arc<dyn Db>>,
    templates: Option<Arc<dyn TemplateSource>>,
    localizer: Option<Arc<dyn Localizer>>,
    config: DispatchConfig,
}

impl DispatcherBuilder {
    /// Build everything the binary serves from `config`: templates, the
    /// localizer and the static-response route table.
    pub fn from_config(config: &AppConfig) -> Result<Self, BuildError> {
        let mut templates = PlaceholderTemplates::new();
        if let Some(dir) = &config.templates.directory {
            templates = templates.with_directory(dir);
        }
        for (name, source) in &config.templates.inline {
            templates = templates.with_inline(name, source);
        }

        let localizer = MapLocalizer::new(config.localization.locale.as_str())
            .with_strings(config.localization.strings.clone());

        let mut builder = Self::default()
            .localizer(Arc::new(localizer))
            .config(config.dispatch.clone());
        for route in &config.dispatch.routes {
            let template_name = format!("route.{}", route.name);
            templates = templates.with_inline(template_name.as_str(), route.body.as_str());
            builder = builder.route(static_route(route, template_name)?);
        }

        tracing::info!(routes = builder.router.len(), "Dispatcher configured");
        Ok(builder.templates(Arc::new(templates)))
    }

    pub fn router(mut self, router: Router) -> Self {
        self.router = router;
        self
    }

    /// Append a route after those already registered.
    pub fn route(mut self, route: Route) -> Self {
        self.router.add(route);
        self
    }

    pub fn db(mut self, db: Arc<dyn Db>) -> Self {
        self.db = Some(db);
        self
    }

    pub fn templates(mut self, templates: Arc<dyn TemplateSource>) -> Self {
        self.templates = Some(templates);
        self
    }

    pub fn localizer(mut self, localizer: Arc<dyn Localizer>) -> Self {
        self.localizer = Some(localizer);
        self
    }

    pub fn config(mut self, config: DispatchConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> Dispatcher {
        Dispatcher {
            router: self.router,
            listeners: ListenerRegistry::new(),
            db: self.db.unwrap_or_else(|| Arc::new(MemoryDb::new())),
            templates: self.templates.unwrap_or_else(|| Arc::new(PlaceholderTemplates::new())),
            localizer: self.localizer.unwrap_or_else(|| Arc::new(MapLocalizer::default())),
            config: self.config,
        }
    }
}

/// A route answering with its configured body, rendered with the request's
/// top-level query values and attributes.
fn static_route(config: &RouteConfig, template_name: String) -> Result<Route, BuildError> {
    let status = StatusCode::from_u16(config.status).map_err(|_| BuildError::Status {
        route: config.name.clone(),
        status: config.status,
    })?;
    let content_type = match &config.content_type {
        Some(ct) => Some(HeaderValue::from_str(ct).map_err(|_| BuildError::ContentType {
            route: config.name.clone(),
            content_type: ct.clone(),
        })?),
        None => None,
    };
    let methods = config
        .methods
        .iter()
        .map(|m| {
            Method::from_bytes(m.to_ascii_uppercase().as_bytes()).map_err(|_| BuildError::Method {
                route: config.name.clone(),
                method: m.clone(),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let route = Route::new(config.name.as_str(), &config.template, move |ctx: &mut Context<'_>| {
        let mut response = ctx.render(&template_name, &render_content(ctx.request()))?.with_status(status);
        if let Some(ct) = &content_type {
            response = response.with_header(header::CONTENT_TYPE, ct.clone());
        }
        Ok(response)
    })?
    .methods(methods);

    Ok(match config.min_role {
        Some(code) => route.min_role(Role(code)),
        None => route,
    })
}

fn render_content(request: &Request) -> Value {
    let mut content = Map::new();
    if let Some(query) = request.query().as_branch() {
        for (key, node) in query.iter() {
            if let Some(value) = node.as_leaf() {
                content.insert(key.to_string(), Value::String(value.to_string()));
            }
        }
    }
    for (key, value) in request.attributes() {
        content.insert(key.clone(), Value::String(value.clone()));
    }
    content.insert("path".into(), Value::String(request.uri().path().to_string()));
    content.insert(
        "user".into(),
        request.user().username().map_or(Value::Null, |u| Value::String(u.to_string())),
    );
    Value::Object(content)
}
