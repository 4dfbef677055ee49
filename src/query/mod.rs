//! Nested query-parameter trees.
//!
//! # Data Flow
//! ```text
//! "user[alias]=mr.pete&toc=1"
//!     → parse.rs (split pairs, decode, bracket paths)
//!     → QueryNode tree
//!     → paths.rs (remove / merge by structural path)
//!     → serialize.rs (depth-first, insertion order)
//!     → "user[alias]=mr.pete&toc=1"
//! ```
//!
//! # Design Decisions
//! - Leaf vs branch is an enum tag, never a runtime type check
//! - Removal and merge specs are trees of the same type as the query
//! - Operations return new trees; the input is never mutated

pub mod node;
pub mod parse;
pub mod paths;
pub mod serialize;

pub use node::{Branch, QueryNode};
pub use parse::parse;
pub use paths::{merge_at_paths, remove_at_paths};
pub use serialize::serialize;
