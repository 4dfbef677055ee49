//! Request dispatch.
//!
//! # Data Flow
//! ```text
//! Request
//!     → Router::match_path (404 / 405 abort on miss)
//!     → bind {params} as attributes, attach user (401 under Reject policy)
//!     → PRE_DISPATCH listeners (may mutate attributes and user)
//!     → min_role guard (403)
//!     → Handler::handle → Ok(Response) | Err(Abort)
//!     → POST_DISPATCH listeners (always, exactly once)
//!     → Response
//! ```
//!
//! # Design Decisions
//! - The dispatcher is immutable once built and shared behind `Arc`;
//!   per-request state lives in a [`Dispatch`] value
//! - Every user-facing failure becomes a Response through
//!   [`Dispatcher::abort`]; nothing is propagated to the transport
//! - Listener failures are logged and counted, never fatal
//! - A panicking handler is caught and answered with a 500 abort

pub mod builder;
pub mod context;
pub mod lifecycle;

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;

use axum::http::{header, HeaderValue, StatusCode};
use serde_json::json;

use crate::auth::{AuthError, AuthenticatedUser};
use crate::config::{AuthPolicy, DispatchConfig};
use crate::db::Db;
use crate::events::registry::panic_message;
use crate::events::{
    BoxError, EventData, ListenerError, ListenerRegistry, Observable, POST_DISPATCH, PRE_DISPATCH,
};
use crate::http::{Request, Response};
use crate::localization::Localizer;
use crate::observability::metrics;
use crate::routing::{RouteError, Router};
use crate::template::TemplateSource;

pub use builder::{BuildError, DispatcherBuilder};
pub use context::{Abort, Context, Handler, HandlerResult};
pub use lifecycle::{Dispatch, DispatchState};

/// Attribute holding the name of the matched route.
pub const ROUTE_ATTRIBUTE: &str = "_route";

/// Routes requests to handlers and turns every outcome into a Response.
pub struct Dispatcher {
    router: Router,
    listeners: ListenerRegistry,
    db: Arc<dyn Db>,
    templates: Arc<dyn TemplateSource>,
    localizer: Arc<dyn Localizer>,
    config: DispatchConfig,
}

impl Dispatcher {
    pub fn builder() -> DispatcherBuilder {
        DispatcherBuilder::default()
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    pub fn listeners(&self) -> &ListenerRegistry {
        &self.listeners
    }

    pub fn db(&self) -> &dyn Db {
        self.db.as_ref()
    }

    pub fn templates(&self) -> &dyn TemplateSource {
        self.templates.as_ref()
    }

    pub fn localizer(&self) -> &dyn Localizer {
        self.localizer.as_ref()
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    /// Path prefix the application is mounted under.
    pub fn base_path(&self) -> &str {
        &self.config.base_path
    }

    /// Dispatch `request` and return its response.
    pub fn route_request(&self, request: Request) -> Response {
        self.dispatch(request).into_response()
    }

    /// Dispatch `request`, keeping the request and state history for
    /// inspection.
    pub fn dispatch(&self, request: Request) -> Dispatch {
        let start = Instant::now();
        let mut dispatch = Dispatch::new(request);
        let span = tracing::debug_span!(
            "dispatch",
            request_id = %dispatch.request.id(),
            method = %dispatch.request.method(),
            path = %dispatch.request.uri().path(),
        );
        let _guard = span.enter();

        let response = match self.run(&mut dispatch) {
            Ok(response) => {
                dispatch.advance(DispatchState::Handled);
                response
            }
            Err(abort) => {
                dispatch.advance(DispatchState::Aborted);
                abort.into_response()
            }
        };
        let status = response.status();

        let mut completed = EventData::Completed {
            request: &dispatch.request,
            response: &response,
            state: dispatch.state(),
        };
        self.notify_listeners(POST_DISPATCH, &mut completed);
        dispatch.response = Some(response);
        dispatch.advance(DispatchState::Responded);

        metrics::record_dispatch(dispatch.request.method().as_str(), status.as_u16(), start.elapsed());
        tracing::debug!(
            route = dispatch.route().unwrap_or("-"),
            status = status.as_u16(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Dispatch complete"
        );
        dispatch
    }

    fn run(&self, dispatch: &mut Dispatch) -> HandlerResult {
        let route_match = self
            .router
            .match_path(dispatch.request.method(), dispatch.request.uri().path())
            .map_err(|e| self.route_failure(e))?;
        let route = route_match.route;

        dispatch.set_route(route.name());
        let request = &mut dispatch.request;
        for (name, value) in route_match.params {
            request.set_attribute(name, value);
        }
        request.set_attribute(ROUTE_ATTRIBUTE, route.name());
        self.attach_user(request)?;
        dispatch.advance(DispatchState::Routed);

        self.notify_listeners(PRE_DISPATCH, &mut EventData::Request(&mut dispatch.request));

        if let Some(required) = route.required_role() {
            let user = dispatch.request.user();
            if !user.has_role(required) {
                tracing::warn!(
                    route = %route.name(),
                    required = %required,
                    actual = %user.role(),
                    "Insufficient role"
                );
                return Err(self.abort(self.get_error_response(StatusCode::FORBIDDEN, None)));
            }
        }

        let mut ctx = Context::new(self, &mut dispatch.request);
        match panic::catch_unwind(AssertUnwindSafe(|| route.handler().handle(&mut ctx))) {
            Ok(result) => result,
            Err(payload) => {
                tracing::error!(
                    route = %route.name(),
                    panic = %panic_message(payload.as_ref()),
                    "Handler panicked"
                );
                Err(self.abort(self.get_error_response(StatusCode::INTERNAL_SERVER_ERROR, None)))
            }
        }
    }

    fn route_failure(&self, error: RouteError) -> Abort {
        tracing::warn!(error = %error, "No route");
        match error {
            RouteError::NotFound { .. } => self.abort(self.get_error_response(StatusCode::NOT_FOUND, None)),
            RouteError::MethodNotAllowed { allowed, .. } => {
                let allow = allowed.iter().map(|m| m.as_str()).collect::<Vec<_>>().join(", ");
                let mut response = self.get_error_response(StatusCode::METHOD_NOT_ALLOWED, None);
                if let Ok(value) = HeaderValue::from_str(&allow) {
                    response = response.with_header(header::ALLOW, value);
                }
                self.abort(response)
            }
        }
    }

    fn attach_user(&self, request: &mut Request) -> Result<(), Abort> {
        let Some(credentials) = request.credentials().cloned() else {
            return Ok(());
        };
        match AuthenticatedUser::create_from_credentials(self.db(), &credentials) {
            Ok(user) => {
                tracing::debug!(username = %credentials.username(), role = %user.role(), "User authenticated");
                request.set_user(user);
                Ok(())
            }
            Err(AuthError::InvalidCredentials(username)) => match self.config.auth_policy {
                AuthPolicy::Anonymous => {
                    tracing::warn!(username = %username, "Invalid credentials, continuing as anonymous");
                    request.set_user(AuthenticatedUser::anonymous());
                    Ok(())
                }
                AuthPolicy::Reject => {
                    tracing::warn!(username = %username, "Invalid credentials, rejecting");
                    let response = self
                        .get_error_response(StatusCode::UNAUTHORIZED, None)
                        .with_header(header::WWW_AUTHENTICATE, HeaderValue::from_static("Basic"));
                    Err(self.abort(response))
                }
            },
            Err(e) => {
                tracing::error!(error = %e, "Authentication backend failed");
                Err(self.abort(self.get_error_response(StatusCode::INTERNAL_SERVER_ERROR, None)))
            }
        }
    }

    /// End the current dispatch with `response`. The post-dispatch
    /// notification still runs.
    pub fn abort(&self, response: Response) -> Abort {
        let status = response.status().as_u16();
        tracing::warn!(status, "Dispatch aborted");
        metrics::record_abort(status);
        Abort::new(response)
    }

    /// Render the error page for `status`.
    ///
    /// The title comes from the localizer key `error.<code>`, falling back
    /// to the canonical reason phrase. If the error template cannot be
    /// rendered the page degrades to plain text.
    pub fn get_error_response(&self, status: StatusCode, detail: Option<&str>) -> Response {
        let code = status.as_u16();
        let title = self
            .localizer
            .get_string(&format!("error.{}", code))
            .unwrap_or_else(|| status.canonical_reason().unwrap_or("Error").to_string());
        let content = json!({
            "code": code,
            "title": title,
            "detail": detail.unwrap_or(""),
        });

        let rendered = self.templates.load(&self.config.error_template).and_then(|mut t| {
            t.render_with(&content)?;
            Ok(t.get_string())
        });
        match rendered {
            Ok(body) => Response::html(status, body),
            Err(e) => {
                tracing::error!(template = %self.config.error_template, error = %e, "Error template failed");
                let body = match detail {
                    Some(detail) => format!("{} {}\n{}\n", code, title, detail),
                    None => format!("{} {}\n", code, title),
                };
                Response::new(status, body)
            }
        }
    }
}

impl Observable for Dispatcher {
    fn register_listener<O, F>(&self, event: &str, observer: &Arc<O>, handler_name: &str, handler: F)
    where
        O: Send + Sync + 'static,
        F: Fn(&O, &mut EventData<'_>) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        self.listeners.register_listener(event, observer, handler_name, handler);
    }

    fn remove_listener<O: ?Sized>(&self, event: &str, observer: &Arc<O>, handler_name: &str) -> bool {
        self.listeners.remove_listener(event, observer, handler_name)
    }

    fn notify_listeners(&self, event: &str, data: &mut EventData<'_>) -> Vec<ListenerError> {
        self.listeners.notify_listeners(event, data)
    }
}
