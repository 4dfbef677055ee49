//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (method, path)
//!     → router.rs (ordered route scan)
//!     → template.rs (segment-by-segment match, bind {params})
//!     → Return: RouteMatch { route, params } or RouteError
//!
//! Route Compilation (at startup):
//!     "/users/{id}" strings
//!     → RouteTemplate (literal / param segments)
//!     → Router (registration order preserved)
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable at runtime
//! - Deterministic: same input always matches same route
//! - First match wins (registration order)

pub mod router;
pub mod template;

pub use router::{Route, RouteError, RouteMatch, Router};
pub use template::{RouteTemplate, TemplateSyntaxError};
