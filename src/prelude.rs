//! A "prelude" for users of the `spider-multi` crate.
//!
//! This prelude re-exports the most commonly used traits and structs so that
//! they can be easily imported.
//!
//! # Example
//!
//! ```
//! use spider_multi::prelude::*;
//! ```

pub use crate::{
    // Core structs
    Client,
    RequestConfig,
    ResultRecord,
    TransferInfo,
    // Core traits
    IntoUrls,
    Middleware,
    Transport,
    // Errors
    HttpError,
    TransportError,
    // Essential re-exports for trait implementation
    async_trait,
};

pub use crate::response::{CookieMap, CookieValue, RawTransfer};

#[cfg(feature = "reqwest-transport")]
pub use crate::ReqwestTransport;
