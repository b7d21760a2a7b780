//! Interfaces to the host application's authorization and reference services.
//!
//! The registry never decides permissions on its own. It asks an
//! [`AuthorizationOracle`] about documents that a [`ReferenceResolver`]
//! derives from file identifiers, and caches the answers on each token.

use crate::error::AccessError;
use serde::Serialize;
use std::fmt;

pub mod memory;

/// Rights the registry checks for every token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Right {
    View,
    Edit,
}

impl fmt::Display for Right {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Right::View => f.write_str("view"),
            Right::Edit => f.write_str("edit"),
        }
    }
}

/// A user handle resolved by the host application
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct UserReference(String);

impl UserReference {
    pub fn new<S: Into<String>>(reference: S) -> Self {
        Self(reference.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The document that owns a file
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct DocumentReference(String);

impl DocumentReference {
    pub fn new<S: Into<String>>(reference: S) -> Self {
        Self(reference.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Answers whether a user holds a right on a document.
///
/// Implementations are called synchronously while the registry lock is held,
/// so they must be fast and must not call back into the registry.
pub trait AuthorizationOracle: Send + Sync {
    fn has_access(
        &self,
        right: Right,
        user: &UserReference,
        document: &DocumentReference,
    ) -> Result<bool, AccessError>;
}

/// Maps opaque identifiers to handles the oracle understands
pub trait ReferenceResolver: Send + Sync {
    /// Resolve the document owning the file identified by `file_id`
    fn resolve_attachment(&self, file_id: &str) -> Result<DocumentReference, AccessError>;

    /// Resolve a serialized user identity
    fn resolve_user(&self, user: &str) -> Result<UserReference, AccessError>;

    /// Serialize a user handle into the string stored on tokens
    fn serialize_user(&self, user: &UserReference) -> String {
        user.as_str().to_string()
    }
}
