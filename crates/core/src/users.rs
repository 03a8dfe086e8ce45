//! Account records and the store they live in.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use crate::error::{ConflictError, CoreError};
use crate::types::{DbId, Timestamp};

/// A registered account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserAccount {
    pub id: DbId,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub is_banned: bool,
    pub is_admin: bool,
    pub created_at: Timestamp,
    pub last_login_at: Option<Timestamp>,
}

/// Everything needed to insert a new account.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub id: DbId,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub created_at: Timestamp,
}

pub trait UserStore: Send + Sync {
    /// Insert a new account.
    ///
    /// Username uniqueness is checked before email uniqueness.
    fn insert(&self, user: NewUser) -> Result<UserAccount, CoreError>;

    fn find_by_id(&self, id: DbId) -> Result<Option<UserAccount>, CoreError>;

    fn find_by_username(&self, username: &str) -> Result<Option<UserAccount>, CoreError>;

    /// Lookup is case-insensitive.
    fn find_by_email(&self, email: &str) -> Result<Option<UserAccount>, CoreError>;

    fn record_login(&self, id: DbId, at: Timestamp) -> Result<(), CoreError>;

    fn set_banned(&self, id: DbId, banned: bool) -> Result<(), CoreError>;
}

// ---------------------------------------------------------------------------
// In-memory store
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct MemoryUserStore {
    users: RwLock<HashMap<DbId, UserAccount>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn update(&self, id: DbId, f: impl FnOnce(&mut UserAccount)) -> Result<(), CoreError> {
        let mut users = self.users.write().unwrap_or_else(PoisonError::into_inner);
        let user = users.get_mut(&id).ok_or_else(|| CoreError::NotFound {
            entity: "user",
            id: id.to_string(),
        })?;
        f(user);
        Ok(())
    }

    fn find(&self, predicate: impl Fn(&UserAccount) -> bool) -> Option<UserAccount> {
        self.users
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .find(|user| predicate(user))
            .cloned()
    }
}

impl UserStore for MemoryUserStore {
    fn insert(&self, user: NewUser) -> Result<UserAccount, CoreError> {
        let mut users = self.users.write().unwrap_or_else(PoisonError::into_inner);

        if users.values().any(|u| u.username == user.username) {
            return Err(ConflictError::DuplicateUsername.into());
        }
        if users
            .values()
            .any(|u| u.email.eq_ignore_ascii_case(&user.email))
        {
            return Err(ConflictError::DuplicateEmail.into());
        }
        if users.contains_key(&user.id) {
            return Err(CoreError::Internal(format!("Duplicate user id {}", user.id)));
        }

        let account = UserAccount {
            id: user.id,
            username: user.username,
            email: user.email,
            password_hash: user.password_hash,
            is_banned: false,
            is_admin: false,
            created_at: user.created_at,
            last_login_at: None,
        };
        users.insert(account.id, account.clone());
        Ok(account)
    }

    fn find_by_id(&self, id: DbId) -> Result<Option<UserAccount>, CoreError> {
        Ok(self
            .users
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
            .cloned())
    }

    fn find_by_username(&self, username: &str) -> Result<Option<UserAccount>, CoreError> {
        Ok(self.find(|u| u.username == username))
    }

    fn find_by_email(&self, email: &str) -> Result<Option<UserAccount>, CoreError> {
        Ok(self.find(|u| u.email.eq_ignore_ascii_case(email)))
    }

    fn record_login(&self, id: DbId, at: Timestamp) -> Result<(), CoreError> {
        self.update(id, |user| user.last_login_at = Some(at))
    }

    fn set_banned(&self, id: DbId, banned: bool) -> Result<(), CoreError> {
        self.update(id, |user| user.is_banned = banned)
    }
}
