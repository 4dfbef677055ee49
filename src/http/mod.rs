//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, timeout, body limit)
//!     → request.rs (Uri, cookies, credentials, form body)
//!     → Dispatcher::route_request (blocking pool)
//!     → response.rs (status, headers, rendered body)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::{Request, UploadedFile, X_REQUEST_ID};
pub use response::Response;
pub use server::{shutdown_signal, HttpServer};
