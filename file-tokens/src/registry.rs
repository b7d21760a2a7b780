//! Registry of live file tokens.

use crate::access::{AuthorizationOracle, ReferenceResolver, Right, UserReference};
use crate::clock::{Clock, SystemClock};
use crate::config::TokenConfig;
use crate::error::TokenError;
use crate::token::FileToken;
use log::{debug, warn};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Tokens keyed by identity, plus an index from (user, file id) to identity.
///
/// Both maps are only touched together under the registry lock.
#[derive(Debug, Default)]
struct RegistryState {
    tokens: HashMap<String, FileToken>,
    by_owner: HashMap<(String, String), String>,
}

impl RegistryState {
    fn insert(&mut self, token: FileToken) {
        self.by_owner.insert(
            (token.user().to_string(), token.file_id().to_string()),
            token.identity().to_string(),
        );
        self.tokens.insert(token.identity().to_string(), token);
    }

    fn remove(&mut self, identity: &str) -> Option<FileToken> {
        let token = self.tokens.remove(identity)?;
        self.by_owner
            .remove(&(token.user().to_string(), token.file_id().to_string()));
        Some(token)
    }

    fn identity_for(&self, user: &str, file_id: &str) -> Option<String> {
        self.by_owner
            .get(&(user.to_string(), file_id.to_string()))
            .cloned()
    }
}

/// Issues, shares and retires file tokens.
///
/// Each logical operation holds a single lock for its whole duration,
/// including the calls to the authorization collaborators.
pub struct TokenRegistry {
    state: Mutex<RegistryState>,
    config: TokenConfig,
    oracle: Arc<dyn AuthorizationOracle>,
    resolver: Arc<dyn ReferenceResolver>,
    clock: Arc<dyn Clock>,
}

impl TokenRegistry {
    /// Create an empty registry using the system clock
    pub fn new(
        config: TokenConfig,
        oracle: Arc<dyn AuthorizationOracle>,
        resolver: Arc<dyn ReferenceResolver>,
    ) -> Self {
        Self {
            state: Mutex::new(RegistryState::default()),
            config,
            oracle,
            resolver,
            clock: Arc::new(SystemClock),
        }
    }

    /// Replace the time source
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &TokenConfig {
        &self.config
    }

    /// Get the token for the given user and file, or create one if there is
    /// no token yet or the existing one expired.
    ///
    /// Anonymous callers (`None`) share the configured guest identity, and the
    /// configured timeout applies to new tokens.
    pub fn get_token(
        &self,
        user: Option<&UserReference>,
        file_id: &str,
    ) -> Result<FileToken, TokenError> {
        let user = self.serialize_user(user);
        self.acquire(&user, file_id, self.config.timeout)
    }

    /// Get the token for `user` and `file_id`, adding one usage, or create a
    /// new token valid for `timeout_secs`.
    ///
    /// Existing tokens get their permissions rechecked before anything else.
    /// An expired token is dropped and replaced.
    pub fn acquire(
        &self,
        user: &str,
        file_id: &str,
        timeout_secs: u64,
    ) -> Result<FileToken, TokenError> {
        let mut state = self.lock();
        let now = self.clock.now();

        if let Some(identity) = self.find_existing(&mut state, user, file_id)? {
            let expired = state
                .tokens
                .get(&identity)
                .is_some_and(|token| token.is_expired_at(now));
            if expired {
                state.remove(&identity);
                debug!("Dropped expired token for file [{}] and user [{}]", file_id, user);
            } else if let Some(token) = state.tokens.get_mut(&identity) {
                token.set_usage(token.usage().saturating_add(1));
                debug!(
                    "Reusing token for file [{}] and user [{}]. Number of usages: [{}]",
                    file_id,
                    user,
                    token.usage()
                );
                return Ok(token.clone());
            }
        }

        let document = self.resolver.resolve_attachment(file_id)?;
        let user_ref = self.resolver.resolve_user(user)?;
        let can_view = self.oracle.has_access(Right::View, &user_ref, &document)?;
        let can_edit = self.oracle.has_access(Right::Edit, &user_ref, &document)?;

        let token = FileToken::new(user, file_id, now, timeout_secs, can_view, can_edit);
        state.insert(token.clone());
        debug!("New token created for file [{}] and user [{}]", file_id, user);

        Ok(token)
    }

    /// Check whether `token` is unknown or expired.
    ///
    /// Neither mutates the registry nor rechecks permissions.
    pub fn is_invalid(&self, token: &str) -> bool {
        let state = self.lock();
        match state.tokens.get(token) {
            Some(found) => found.is_expired_at(self.clock.now()),
            None => true,
        }
    }

    /// Remove one usage of the token for the given user and file.
    ///
    /// See [`TokenRegistry::release`].
    pub fn clear_token(
        &self,
        user: Option<&UserReference>,
        file_id: &str,
    ) -> Result<u32, TokenError> {
        let user = self.serialize_user(user);
        self.release(&user, file_id)
    }

    /// Remove one usage of the token for `user` and `file_id`, deleting the
    /// token once nobody uses it.
    ///
    /// Returns the number of remaining usages, which is 0 both when the token
    /// was deleted and when there was no token to begin with.
    pub fn release(&self, user: &str, file_id: &str) -> Result<u32, TokenError> {
        let mut state = self.lock();
        let Some(identity) = self.find_existing(&mut state, user, file_id)? else {
            return Ok(0);
        };

        let remaining = match state.tokens.get_mut(&identity) {
            Some(token) if token.usage() > 1 => {
                let usage = token.usage() - 1;
                token.set_usage(usage);
                usage
            }
            _ => 0,
        };

        if remaining > 0 {
            debug!(
                "Cleared token for file [{}] and user [{}]. Number of remaining usages: [{}]",
                file_id, user, remaining
            );
        } else {
            state.remove(&identity);
            debug!("Deleted token for file [{}] and user [{}]", file_id, user);
        }

        Ok(remaining)
    }

    /// The serialized user identity the token was issued for.
    ///
    /// Callers should check [`TokenRegistry::is_invalid`] first; an unknown
    /// token yields [`TokenError::NotFound`].
    pub fn user_identity(&self, token: &str) -> Result<String, TokenError> {
        self.with_token(token, |found| found.user().to_string())
    }

    /// The resolved user the token was issued for, or `None` for guests
    pub fn user_reference(&self, token: &str) -> Result<Option<UserReference>, TokenError> {
        let user = self.user_identity(token)?;
        if user == self.config.guest_user {
            return Ok(None);
        }
        Ok(Some(self.resolver.resolve_user(&user)?))
    }

    /// Whether the token carries edit rights, as of its last lookup
    pub fn has_write_access(&self, token: &str) -> Result<bool, TokenError> {
        self.with_token(token, FileToken::can_edit)
    }

    /// Whether the token carries view or edit rights, as of its last lookup
    pub fn has_any_access(&self, token: &str) -> Result<bool, TokenError> {
        self.with_token(token, |found| found.can_view() || found.can_edit())
    }

    /// Snapshot of a token, expired or not
    pub fn get(&self, token: &str) -> Option<FileToken> {
        self.lock().tokens.get(token).cloned()
    }

    /// Number of tokens held, including expired ones not yet reaped
    pub fn len(&self) -> usize {
        self.lock().tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, RegistryState> {
        // Nothing panics between mutations of the two maps, so a poisoned
        // state is still consistent.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn serialize_user(&self, user: Option<&UserReference>) -> String {
        match user {
            Some(user) => self.resolver.serialize_user(user),
            None => self.config.guest_user.clone(),
        }
    }

    fn with_token<T>(
        &self,
        token: &str,
        read: impl FnOnce(&FileToken) -> T,
    ) -> Result<T, TokenError> {
        self.lock()
            .tokens
            .get(token)
            .map(read)
            .ok_or_else(|| TokenError::NotFound(token.to_string()))
    }

    /// Find the token for (user, file id) and bring its permissions up to date
    fn find_existing(
        &self,
        state: &mut RegistryState,
        user: &str,
        file_id: &str,
    ) -> Result<Option<String>, TokenError> {
        let Some(identity) = state.identity_for(user, file_id) else {
            return Ok(None);
        };
        if let Some(token) = state.tokens.get_mut(&identity) {
            if let Err(e) = self.update_access_rights(token) {
                warn!(
                    "Failed to refresh access rights for file [{}] and user [{}]: {}",
                    file_id, user, e
                );
                return Err(e);
            }
        }
        Ok(Some(identity))
    }

    /// Recheck the cached rights against the oracle, in case they changed
    /// since the token was issued.
    fn update_access_rights(&self, token: &mut FileToken) -> Result<(), TokenError> {
        let document = self.resolver.resolve_attachment(token.file_id())?;
        let user = self.resolver.resolve_user(token.user())?;

        let can_view = self.oracle.has_access(Right::View, &user, &document)?;
        if can_view != token.can_view() {
            token.set_can_view(can_view);
            debug!("View right changed for existing token of file [{}]", token.file_id());
        }

        let can_edit = self.oracle.has_access(Right::Edit, &user, &document)?;
        if can_edit != token.can_edit() {
            token.set_can_edit(can_edit);
            debug!("Edit right changed for existing token of file [{}]", token.file_id());
        }

        Ok(())
    }
}

impl std::fmt::Debug for TokenRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenRegistry")
            .field("tokens", &self.len())
            .field("config", &self.config)
            .field("clock", &self.clock)
            .finish()
    }
}
