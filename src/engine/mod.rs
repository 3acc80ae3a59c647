//! # Engine Module
//!
//! The machinery the scheduler drives during a run.
//!
//! ## Key Components
//!
//! - **Multiplexer**: Attaches transfers, advances their I/O with a bounded
//!   wait and hands back finished transfers
//! - **Middleware Manager**: Dispatches admission and completion hooks in order
//! - **Response Parser**: Splits raw payloads into header and body, extracts
//!   redirect targets and folds `Set-Cookie` chains

mod middleware_manager;
mod multiplexer;
pub mod response_parser;

pub use middleware_manager::MiddlewareManager;
pub use multiplexer::{Multiplexer, DEFAULT_POLL_INTERVAL};
