use super::{AuthorizationOracle, DocumentReference, ReferenceResolver, Right, UserReference};
use crate::error::AccessError;
use log::debug;
use std::collections::HashSet;
use std::sync::{PoisonError, RwLock};

/// Separates the owning document from the file name in a file identifier
pub const ATTACHMENT_SEPARATOR: char = '@';

/// In-process grant table acting as both oracle and resolver.
///
/// File identifiers take the form `<document>@<file name>`. Users resolve to
/// themselves. Grants can be changed at any time and are observed by the next
/// registry lookup.
#[derive(Debug, Default)]
pub struct InMemoryAccess {
    grants: RwLock<HashSet<(Right, String, String)>>,
}

impl InMemoryAccess {
    pub fn new() -> Self {
        Self::default()
    }

    /// Grant `right` on `document` to `user`
    pub fn grant(&self, right: Right, user: &str, document: &str) {
        debug!("Granting {} on [{}] to [{}]", right, document, user);
        self.grants
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert((right, user.to_string(), document.to_string()));
    }

    /// Revoke `right` on `document` from `user`
    pub fn revoke(&self, right: Right, user: &str, document: &str) {
        debug!("Revoking {} on [{}] from [{}]", right, document, user);
        self.grants
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&(right, user.to_string(), document.to_string()));
    }
}

impl AuthorizationOracle for InMemoryAccess {
    fn has_access(
        &self,
        right: Right,
        user: &UserReference,
        document: &DocumentReference,
    ) -> Result<bool, AccessError> {
        let grants = self.grants.read().unwrap_or_else(PoisonError::into_inner);
        Ok(grants.contains(&(
            right,
            user.as_str().to_string(),
            document.as_str().to_string(),
        )))
    }
}

impl ReferenceResolver for InMemoryAccess {
    fn resolve_attachment(&self, file_id: &str) -> Result<DocumentReference, AccessError> {
        match file_id.split_once(ATTACHMENT_SEPARATOR) {
            Some((document, name)) if !document.is_empty() && !name.is_empty() => {
                Ok(DocumentReference::new(document))
            }
            _ => Err(AccessError::Resolve {
                reference: file_id.to_string(),
                reason: format!("expected <document>{ATTACHMENT_SEPARATOR}<file name>"),
            }),
        }
    }

    fn resolve_user(&self, user: &str) -> Result<UserReference, AccessError> {
        Ok(UserReference::new(user))
    }
}
