//! Route lookup.
//!
//! # Responsibilities
//! - Store routes in registration order
//! - Look up the route for a method and path
//! - Return the matched route with its bound parameters, or an explicit miss
//!
//! # Design Decisions
//! - First match wins in registration order; register specific templates
//!   before general ones (`/users/active` before `/users/{id}`)
//! - A path that matches but with the wrong method is a 405, not a 404
//! - Immutable after the dispatcher is built (thread-safe without locks)

use std::fmt;
use std::sync::Arc;

use axum::http::Method;
use thiserror::Error;

use crate::auth::Role;
use crate::dispatch::{Context, Handler, HandlerResult};
use crate::routing::template::{RouteTemplate, TemplateSyntaxError};

/// Why no route was selected.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RouteError {
    #[error("no route matches {path}")]
    NotFound { path: String },

    #[error("{method} not allowed for {path}")]
    MethodNotAllowed {
        path: String,
        method: Method,
        allowed: Vec<Method>,
    },
}

/// A template bound to a handler.
#[derive(Clone)]
pub struct Route {
    name: String,
    template: RouteTemplate,
    methods: Vec<Method>,
    min_role: Option<Role>,
    handler: Arc<dyn Handler>,
}

impl Route {
    /// A route answering any method with a closure handler.
    pub fn new<F>(name: impl Into<String>, template: &str, handler: F) -> Result<Self, TemplateSyntaxError>
    where
        F: Fn(&mut Context<'_>) -> HandlerResult + Send + Sync + 'static,
    {
        Self::from_handler(name, template, Arc::new(handler))
    }

    /// A route answering any method with a shared handler.
    pub fn from_handler(
        name: impl Into<String>,
        template: &str,
        handler: Arc<dyn Handler>,
    ) -> Result<Self, TemplateSyntaxError> {
        Ok(Self {
            name: name.into(),
            template: RouteTemplate::parse(template)?,
            methods: Vec::new(),
            min_role: None,
            handler,
        })
    }

    /// Restrict the route to `methods`.
    pub fn methods(mut self, methods: impl IntoIterator<Item = Method>) -> Self {
        self.methods = methods.into_iter().collect();
        self
    }

    /// Require the user to hold at least `role`.
    pub fn min_role(mut self, role: Role) -> Self {
        self.min_role = Some(role);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn template(&self) -> &RouteTemplate {
        &self.template
    }

    pub fn required_role(&self) -> Option<Role> {
        self.min_role
    }

    pub fn handler(&self) -> &Arc<dyn Handler> {
        &self.handler
    }

    fn allows(&self, method: &Method) -> bool {
        self.methods.is_empty()
            || self.methods.contains(method)
            || (*method == Method::HEAD && self.methods.contains(&Method::GET))
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("name", &self.name)
            .field("template", &self.template.as_str())
            .field("methods", &self.methods)
            .field("min_role", &self.min_role)
            .finish_non_exhaustive()
    }
}

/// A successful lookup.
#[derive(Debug)]
pub struct RouteMatch<'a> {
    pub route: &'a Route,
    pub params: Vec<(String, String)>,
}

/// Ordered route table.
#[derive(Debug, Default)]
pub struct Router {
    routes: Vec<Route>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a route. Earlier routes take precedence.
    pub fn add(&mut self, route: Route) {
        let shadowed_by = self.routes.iter().find(|r| {
            r.template.wildcard_count() > route.template.wildcard_count()
                && r.template.matches(route.template.as_str()).is_some()
        });
        if let Some(existing) = shadowed_by {
            tracing::warn!(
                route = %route.name,
                shadowed_by = %existing.name,
                "Route registered after a more general template that already matches it"
            );
        }
        self.routes.push(route);
    }

    pub fn with_route(mut self, route: Route) -> Self {
        self.add(route);
        self
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Find the first route whose template matches `path` and which accepts
    /// `method`.
    pub fn match_path(&self, method: &Method, path: &str) -> Result<RouteMatch<'_>, RouteError> {
        let mut allowed = Vec::new();
        for route in &self.routes {
            let Some(params) = route.template.matches(path) else {
                continue;
            };
            if route.allows(method) {
                return Ok(RouteMatch { route, params });
            }
            for m in &route.methods {
                if !allowed.contains(m) {
                    allowed.push(m.clone());
                }
            }
        }

        if allowed.is_empty() {
            Err(RouteError::NotFound {
                path: path.to_string(),
            })
        } else {
            Err(RouteError::MethodNotAllowed {
                path: path.to_string(),
                method: method.clone(),
                allowed,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::Response;

    fn route(name: &'static str, template: &str) -> Route {
        Route::new(name, template, move |_| Ok(Response::ok(name))).unwrap()
    }

    #[test]
    fn test_registration_order_wins() {
        let router = Router::new()
            .with_route(route("by_id", "/users/{id}"))
            .with_route(route("active", "/users/active"));

        let m = router.match_path(&Method::GET, "/users/active").unwrap();
        assert_eq!(m.route.name(), "by_id");
        assert_eq!(m.params, vec![("id".to_string(), "active".to_string())]);
    }

    #[test]
    fn test_specific_first() {
        let router = Router::new()
            .with_route(route("active", "/users/active"))
            .with_route(route("by_id", "/users/{id}"));

        assert_eq!(router.match_path(&Method::GET, "/users/active").unwrap().route.name(), "active");
        assert_eq!(router.match_path(&Method::GET, "/users/9").unwrap().route.name(), "by_id");
    }

    #[test]
    fn test_not_found() {
        let router = Router::new().with_route(route("root", "/"));
        assert_eq!(
            router.match_path(&Method::GET, "/missing").unwrap_err(),
            RouteError::NotFound { path: "/missing".into() }
        );
    }

    #[test]
    fn test_method_filtering() {
        let router = Router::new()
            .with_route(route("read", "/items/{id}").methods([Method::GET]))
            .with_route(route("write", "/items/{id}").methods([Method::PUT]));

        assert_eq!(router.match_path(&Method::PUT, "/items/1").unwrap().route.name(), "write");
        assert_eq!(router.match_path(&Method::HEAD, "/items/1").unwrap().route.name(), "read");

        match router.match_path(&Method::DELETE, "/items/1") {
            Err(RouteError::MethodNotAllowed { allowed, .. }) => {
                assert_eq!(allowed, vec![Method::GET, Method::PUT]);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_allowed_methods_listed_once() {
        let router = Router::new()
            .with_route(route("read", "/items/{id}").methods([Method::GET]))
            .with_route(route("write", "/items/{id}").methods([Method::PUT]))
            .with_route(route("read_again", "/items/{id}").methods([Method::GET]));

        match router.match_path(&Method::DELETE, "/items/1") {
            Err(RouteError::MethodNotAllowed { allowed, .. }) => {
                assert_eq!(allowed, vec![Method::GET, Method::PUT]);
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
