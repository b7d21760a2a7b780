//! # file-tokens
//!
//! Short-lived access tokens binding a (user, file) pair to cached view/edit
//! permissions, for hosts that embed an external document editor.
//!
//! ## Components
//!
//! - **Registry:** [`TokenRegistry`] issues tokens, shares them between the
//!   editor windows a user has open on the same file, and retires them when
//!   the last window closes or the token expires.
//! - **Access:** [`AuthorizationOracle`] and [`ReferenceResolver`] are the
//!   host's permission and reference services. [`InMemoryAccess`] implements
//!   both over an in-process grant table.
//! - **Config:** [`TokenConfig`] holds the token timeout and the guest identity,
//!   loaded from `FILE_TOKENS_*` environment variables.
//!
//! Permissions are cached on each token and rechecked whenever the token is
//! looked up again, so a right revoked mid-session takes effect on the next
//! lookup without issuing a new token.

pub mod access;
pub mod clock;
pub mod config;
pub mod error;
pub mod registry;
pub mod token;

pub use crate::access::memory::InMemoryAccess;
pub use crate::access::{
    AuthorizationOracle, DocumentReference, ReferenceResolver, Right, UserReference,
};
pub use crate::clock::{Clock, ManualClock, SystemClock};
pub use crate::config::TokenConfig;
pub use crate::error::{AccessError, TokenError};
pub use crate::registry::TokenRegistry;
pub use crate::token::FileToken;
