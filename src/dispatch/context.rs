//! Handler-facing surface of a dispatch.

use axum::http::StatusCode;
use serde_json::Value;

use crate::auth::AuthenticatedUser;
use crate::db::Db;
use crate::dispatch::Dispatcher;
use crate::http::{Request, Response};
use crate::localization::Localizer;
use crate::template::TemplateSource;

/// What a handler returns: a response, or an abort carrying the response
/// that ends the dispatch.
pub type HandlerResult = Result<Response, Abort>;

/// Application logic bound to a route.
pub trait Handler: Send + Sync {
    fn handle(&self, ctx: &mut Context<'_>) -> HandlerResult;
}

impl<F> Handler for F
where
    F: Fn(&mut Context<'_>) -> HandlerResult + Send + Sync,
{
    fn handle(&self, ctx: &mut Context<'_>) -> HandlerResult {
        self(ctx)
    }
}

/// Terminal short-circuit of a dispatch.
///
/// Only the dispatcher creates these (see [`Dispatcher::abort`]), so every
/// abort is logged and counted the same way.
#[derive(Debug, Clone, PartialEq)]
#[must_use = "an abort only takes effect when returned from the handler"]
pub struct Abort {
    response: Response,
}

impl Abort {
    pub(crate) fn new(response: Response) -> Self {
        Self { response }
    }

    pub fn response(&self) -> &Response {
        &self.response
    }

    pub fn into_response(self) -> Response {
        self.response
    }
}

/// Per-call view handed to a [`Handler`].
pub struct Context<'a> {
    dispatcher: &'a Dispatcher,
    request: &'a mut Request,
}

impl<'a> Context<'a> {
    pub(crate) fn new(dispatcher: &'a Dispatcher, request: &'a mut Request) -> Self {
        Self { dispatcher, request }
    }

    pub fn request(&self) -> &Request {
        self.request
    }

    pub fn user(&self) -> &AuthenticatedUser {
        self.request.user()
    }

    /// Shorthand for a request attribute (route parameters land here).
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.request.attribute(name)
    }

    pub fn set_attribute(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.request.set_attribute(name, value);
    }

    pub fn dispatcher(&self) -> &'a Dispatcher {
        self.dispatcher
    }

    pub fn db(&self) -> &'a dyn Db {
        self.dispatcher.db()
    }

    pub fn templates(&self) -> &'a dyn TemplateSource {
        self.dispatcher.templates()
    }

    pub fn localizer(&self) -> &'a dyn Localizer {
        self.dispatcher.localizer()
    }

    /// End the dispatch with `response`.
    pub fn abort(&self, response: Response) -> Abort {
        self.dispatcher.abort(response)
    }

    /// End the dispatch with a rendered error page.
    pub fn fail(&self, status: StatusCode, detail: Option<&str>) -> Abort {
        self.dispatcher.abort(self.dispatcher.get_error_response(status, detail))
    }

    /// Render the named template into a `200` HTML response. Rendering
    /// failures abort with a 500.
    pub fn render(&self, template: &str, content: &Value) -> HandlerResult {
        let rendered = self.templates().load(template).and_then(|mut t| {
            t.render_with(content)?;
            Ok(t.get_string())
        });
        match rendered {
            Ok(body) => Ok(Response::html(StatusCode::OK, body)),
            Err(e) => {
                tracing::error!(template = %template, error = %e, "Template rendering failed");
                Err(self.fail(StatusCode::INTERNAL_SERVER_ERROR, None))
            }
        }
    }
}
