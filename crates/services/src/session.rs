use std::sync::{Arc, PoisonError, RwLock};

use folio_core::model::UserId;

/// Source of the authenticated identity for the current caller.
pub trait SessionProvider: Send + Sync {
    fn current_user_id(&self) -> Option<UserId>;
}

/// Shared, mutable session slot.
///
/// Clones observe the same sign-in state.
#[derive(Debug, Clone, Default)]
pub struct SessionHandle {
    user: Arc<RwLock<Option<UserId>>>,
}

impl SessionHandle {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn signed_in(user_id: UserId) -> Self {
        let handle = Self::new();
        handle.sign_in(user_id);
        handle
    }

    pub fn sign_in(&self, user_id: UserId) {
        *self.user.write().unwrap_or_else(PoisonError::into_inner) = Some(user_id);
    }

    pub fn sign_out(&self) {
        *self.user.write().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

impl SessionProvider for SessionHandle {
    fn current_user_id(&self) -> Option<UserId> {
        *self.user.read().unwrap_or_else(PoisonError::into_inner)
    }
}
