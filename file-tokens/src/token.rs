//! The token record shared by every editor window a user has open on a file.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fmt;

/// Access token for one (user, file) editing session
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileToken {
    identity: String,
    user: String,
    file_id: String,
    issued_at: DateTime<Utc>,
    timeout_secs: u64,
    usage: u32,
    can_view: bool,
    can_edit: bool,
}

impl FileToken {
    /// Create a token with a single usage.
    pub(crate) fn new(
        user: &str,
        file_id: &str,
        issued_at: DateTime<Utc>,
        timeout_secs: u64,
        can_view: bool,
        can_edit: bool,
    ) -> Self {
        Self {
            identity: derive_identity(user, file_id, issued_at, timeout_secs),
            user: user.to_string(),
            file_id: file_id.to_string(),
            issued_at,
            timeout_secs,
            usage: 1,
            can_view,
            can_edit,
        }
    }

    /// The opaque value handed to editors and used for later lookups
    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn file_id(&self) -> &str {
        &self.file_id
    }

    pub fn issued_at(&self) -> DateTime<Utc> {
        self.issued_at
    }

    pub fn timeout_secs(&self) -> u64 {
        self.timeout_secs
    }

    /// Number of consumers currently sharing this token
    pub fn usage(&self) -> u32 {
        self.usage
    }

    pub fn can_view(&self) -> bool {
        self.can_view
    }

    pub fn can_edit(&self) -> bool {
        self.can_edit
    }

    /// The instant after which the token is no longer valid.
    ///
    /// Saturates at the maximum representable time for absurdly large timeouts.
    pub fn expires_at(&self) -> DateTime<Utc> {
        i64::try_from(self.timeout_secs)
            .ok()
            .and_then(TimeDelta::try_seconds)
            .and_then(|timeout| self.issued_at.checked_add_signed(timeout))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    /// Whether `now` is past the expiration instant
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at()
    }

    pub(crate) fn set_usage(&mut self, usage: u32) {
        self.usage = usage;
    }

    pub(crate) fn set_can_view(&mut self, can_view: bool) {
        self.can_view = can_view;
    }

    pub(crate) fn set_can_edit(&mut self, can_edit: bool) {
        self.can_edit = can_edit;
    }
}

impl fmt::Display for FileToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.identity)
    }
}

/// Derive the token identity from everything that makes a token unique.
///
/// Fields are length-prefixed so that `("ab", "c")` and `("a", "bc")` never
/// hash the same input.
fn derive_identity(
    user: &str,
    file_id: &str,
    issued_at: DateTime<Utc>,
    timeout_secs: u64,
) -> String {
    let mut hasher = Sha256::new();
    for field in [user.as_bytes(), file_id.as_bytes()] {
        hasher.update((field.len() as u64).to_be_bytes());
        hasher.update(field);
    }
    hasher.update(issued_at.timestamp().to_be_bytes());
    hasher.update(issued_at.timestamp_subsec_nanos().to_be_bytes());
    hasher.update(timeout_secs.to_be_bytes());
    URL_SAFE_NO_PAD.encode(hasher.finalize())
}
