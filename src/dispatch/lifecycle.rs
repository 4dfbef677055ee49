//! Dispatch lifecycle.
//!
//! # States
//! - Received: request accepted, nothing resolved yet
//! - Routed: route matched, parameters bound, user attached
//! - Handled: handler returned a response
//! - Aborted: routing, authentication or the handler forced a response
//! - Responded: post-dispatch listeners ran, response is final
//!
//! # State Transitions
//! ```text
//! Received → Routed → Handled → Responded
//! Received → Aborted → Responded          (route miss, auth failure)
//! Routed   → Aborted → Responded          (role check, handler abort)
//! ```

use axum::http::StatusCode;
use serde::Serialize;

use crate::http::{Request, Response};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchState {
    Received,
    Routed,
    Handled,
    Aborted,
    Responded,
}

impl DispatchState {
    fn can_advance_to(self, next: DispatchState) -> bool {
        use DispatchState::*;
        matches!(
            (self, next),
            (Received, Routed)
                | (Received, Aborted)
                | (Routed, Handled)
                | (Routed, Aborted)
                | (Handled, Responded)
                | (Aborted, Responded)
        )
    }
}

/// One request's trip through the dispatcher.
#[derive(Debug)]
pub struct Dispatch {
    pub(crate) request: Request,
    pub(crate) response: Option<Response>,
    route: Option<String>,
    history: Vec<DispatchState>,
}

impl Dispatch {
    pub(crate) fn new(request: Request) -> Self {
        Self {
            request,
            response: None,
            route: None,
            history: vec![DispatchState::Received],
        }
    }

    pub(crate) fn advance(&mut self, next: DispatchState) {
        let current = self.state();
        if current.can_advance_to(next) {
            self.history.push(next);
        } else {
            tracing::error!(from = ?current, to = ?next, "Invalid dispatch transition ignored");
        }
    }

    pub(crate) fn set_route(&mut self, name: &str) {
        self.route = Some(name.to_string());
    }

    pub fn state(&self) -> DispatchState {
        self.history.last().copied().unwrap_or(DispatchState::Received)
    }

    /// Every state visited, in order.
    pub fn history(&self) -> &[DispatchState] {
        &self.history
    }

    pub fn was_aborted(&self) -> bool {
        self.history.contains(&DispatchState::Aborted)
    }

    /// Name of the matched route, if routing succeeded.
    pub fn route(&self) -> Option<&str> {
        self.route.as_deref()
    }

    pub fn request(&self) -> &Request {
        &self.request
    }

    pub fn response(&self) -> Option<&Response> {
        self.response.as_ref()
    }

    pub fn into_response(self) -> Response {
        self.response.unwrap_or_else(|| {
            tracing::error!("Dispatch finished without a response");
            Response::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_path() {
        let mut d = Dispatch::new(Request::get("/").unwrap());
        d.advance(DispatchState::Routed);
        d.advance(DispatchState::Aborted);
        d.advance(DispatchState::Responded);
        assert_eq!(
            d.history(),
            &[
                DispatchState::Received,
                DispatchState::Routed,
                DispatchState::Aborted,
                DispatchState::Responded
            ]
        );
        assert!(d.was_aborted());
    }

    #[test]
    fn test_invalid_transition_ignored() {
        let mut d = Dispatch::new(Request::get("/").unwrap());
        d.advance(DispatchState::Handled);
        assert_eq!(d.state(), DispatchState::Received);

        d.advance(DispatchState::Aborted);
        d.advance(DispatchState::Routed);
        assert_eq!(d.state(), DispatchState::Aborted);
    }

    #[test]
    fn test_missing_response_becomes_500() {
        let d = Dispatch::new(Request::get("/").unwrap());
        assert_eq!(d.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
