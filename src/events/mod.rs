//! Event notification.
//!
//! # Data Flow
//! ```text
//! Startup:
//!     register_listener(event, observer, handler_name, callable)
//!     → copy-on-write swap of the registry map
//!
//! Dispatch:
//!     notify_listeners(event, data)
//!     → load snapshot (lock-free)
//!     → call each listener in registration order
//!     → collect failures, never stop early
//! ```
//!
//! # Design Decisions
//! - Listeners are closures bound to their observer at registration
//! - Identity for removal is (event, observer allocation, handler name)
//! - Notification iterates an immutable snapshot, so concurrent
//!   registration never tears, skips or repeats an entry
//! - A panicking listener is reported like a failing one

pub mod registry;

use crate::dispatch::DispatchState;
use crate::http::{Request, Response};

pub use registry::{BoxError, ListenerError, ListenerRegistry, Observable, ObserverId};

/// Fired after routing and user attachment, before the handler runs.
pub const PRE_DISPATCH: &str = "dispatch.pre";

/// Fired once per dispatch after the response is fixed, success or abort.
pub const POST_DISPATCH: &str = "dispatch.post";

/// Payload handed to listeners.
#[derive(Debug)]
pub enum EventData<'a> {
    /// The request about to be handled. Listeners may change attributes and
    /// the attached user.
    Request(&'a mut Request),

    /// A finished dispatch.
    Completed {
        request: &'a Request,
        response: &'a Response,
        state: DispatchState,
    },

    /// Application-defined payload.
    Custom(&'a mut serde_json::Value),
}

impl EventData<'_> {
    /// The request carried by this event, if any.
    pub fn request(&self) -> Option<&Request> {
        match self {
            EventData::Request(r) => Some(r),
            EventData::Completed { request, .. } => Some(request),
            EventData::Custom(_) => None,
        }
    }

    /// Mutable access to the request, only before the handler runs.
    pub fn request_mut(&mut self) -> Option<&mut Request> {
        match self {
            EventData::Request(r) => Some(r),
            _ => None,
        }
    }
}
