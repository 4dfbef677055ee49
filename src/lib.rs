//! Request dispatch core for web applications.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──────────────▶ http::server (axum, request ID, timeout)
//!                         │
//!                         ▼
//!                     http::Request ── uri::Uri ── query::QueryNode
//!                         │
//!                         ▼
//!                     dispatch::Dispatcher
//!                       ├─ routing::Router      (first match, {params})
//!                       ├─ auth                 (credentials → user, roles)
//!                       ├─ events               (pre/post dispatch listeners)
//!                       ├─ db / template / localization collaborators
//!                         │
//!                         ▼
//!     Client Response ◀── http::Response
//! ```

pub mod auth;
pub mod config;
pub mod db;
pub mod dispatch;
pub mod events;
pub mod http;
pub mod localization;
pub mod observability;
pub mod query;
pub mod routing;
pub mod template;
pub mod uri;

pub use config::AppConfig;
pub use dispatch::{Dispatcher, DispatcherBuilder};
pub use http::{HttpServer, Request, Response};
pub use query::QueryNode;
pub use uri::Uri;
