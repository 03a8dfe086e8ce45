//! Registration, login and session checks.
//!
//! [`AccountService`] is the only place the credential, token and session
//! components meet. Every successful login or registration mints a fresh
//! client id and records the issued token under it, so one account can hold
//! several concurrent device sessions.

use std::sync::Arc;

use mockable::Clock;
use validator::Validate;

use crate::credentials::CredentialService;
use crate::error::{AuthError, CoreError, CoreResult};
use crate::ids::{random_alphanumeric, SnowflakeIds};
use crate::sessions::SessionStore;
use crate::token::{TokenClaims, TokenCodec};
use crate::types::DbId;
use crate::users::{NewUser, UserAccount, UserStore};

/// Length of generated client (device) ids.
pub const CLIENT_ID_LEN: usize = 64;

// ---------------------------------------------------------------------------
// Inputs / outputs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Validate)]
pub struct RegisterInput {
    #[validate(length(min = 1, max = 64))]
    pub username: String,
    #[validate(email, length(max = 255))]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
}

/// How a login names the account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginIdentifier {
    Email(String),
    UserId(DbId),
}

impl LoginIdentifier {
    /// Interpret `input` according to `input_type` (`"email"` or `"userid"`).
    pub fn parse(input_type: &str, input: &str) -> CoreResult<Self> {
        match input_type {
            "email" => Ok(LoginIdentifier::Email(input.to_string())),
            "userid" => input
                .trim()
                .parse::<DbId>()
                .map(LoginIdentifier::UserId)
                .map_err(|_| CoreError::Validation("user id must be numeric".into())),
            other => Err(CoreError::Validation(format!(
                "Unknown input type {other:?}, expected \"email\" or \"userid\""
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LoginInput {
    pub identifier: LoginIdentifier,
    pub password: String,
}

/// A freshly established device session.
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub token: String,
    pub client_id: String,
    pub user: UserAccount,
}

// ---------------------------------------------------------------------------
// Service
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct AccountService {
    users: Arc<dyn UserStore>,
    credentials: CredentialService,
    tokens: TokenCodec,
    sessions: SessionStore,
    ids: Arc<SnowflakeIds>,
    clock: Arc<dyn Clock>,
}

impl AccountService {
    pub fn new(
        users: Arc<dyn UserStore>,
        credentials: CredentialService,
        tokens: TokenCodec,
        sessions: SessionStore,
        ids: Arc<SnowflakeIds>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            users,
            credentials,
            tokens,
            sessions,
            ids,
            clock,
        }
    }

    pub fn users(&self) -> &Arc<dyn UserStore> {
        &self.users
    }

    pub fn register(&self, input: RegisterInput) -> CoreResult<AuthSession> {
        input.validate()?;

        let password_hash = self.credentials.hash(&input.password)?;
        let user = self.users.insert(NewUser {
            id: self.ids.next_id(),
            username: input.username,
            email: input.email,
            password_hash,
            created_at: self.clock.utc(),
        })?;

        tracing::info!(user_id = user.id, username = %user.username, "Account registered");
        self.open_session(user)
    }

    /// Authenticate with a password and open a new device session.
    ///
    /// A banned account is refused before its password is checked. An
    /// unknown account still costs one Argon2 hash.
    pub fn login(&self, input: LoginInput) -> CoreResult<AuthSession> {
        let found = match &input.identifier {
            LoginIdentifier::Email(email) => self.users.find_by_email(email)?,
            LoginIdentifier::UserId(id) => self.users.find_by_id(*id)?,
        };
        let Some(mut user) = found else {
            self.credentials.verify_missing(&input.password);
            return Err(AuthError::InvalidCredentials.into());
        };
        if user.is_banned {
            tracing::warn!(user_id = user.id, "Login refused for banned account");
            return Err(AuthError::AccountBanned.into());
        }
        if !self.credentials.verify(&user.password_hash, &input.password) {
            tracing::debug!(user_id = user.id, "Password mismatch");
            return Err(AuthError::InvalidCredentials.into());
        }

        let now = self.clock.utc();
        self.users.record_login(user.id, now)?;
        user.last_login_at = Some(now);

        tracing::info!(user_id = user.id, "Login succeeded");
        self.open_session(user)
    }

    fn open_session(&self, user: UserAccount) -> CoreResult<AuthSession> {
        let token = self.tokens.issue(&user.username, &user.id.to_string())?;
        let client_id = random_alphanumeric(CLIENT_ID_LEN);
        self.sessions.record(&user.username, &client_id, &token)?;
        Ok(AuthSession {
            token,
            client_id,
            user,
        })
    }

    /// Validate `token` and require it to be the current session of
    /// `client_id`.
    pub fn authenticate(&self, token: &str, client_id: &str) -> CoreResult<TokenClaims> {
        let claims = self.tokens.validate(token)?;
        if !self.sessions.is_current(&claims.sub, client_id, token)? {
            return Err(AuthError::StaleSession.into());
        }
        Ok(claims)
    }

    /// End the session of `client_id`. Other devices stay logged in.
    pub fn logout(&self, token: &str, client_id: &str) -> CoreResult<()> {
        let claims = self.authenticate(token, client_id)?;
        self.sessions.forget(&claims.sub, client_id)?;
        self.tokens.revoke(token);
        tracing::info!(username = %claims.sub, "Logged out");
        Ok(())
    }

    /// The account a validated token belongs to.
    pub fn resolve_owner(&self, claims: &TokenClaims) -> CoreResult<UserAccount> {
        self.users
            .find_by_username(&claims.sub)?
            .ok_or_else(|| CoreError::NotFound {
                entity: "user",
                id: claims.sub.clone(),
            })
    }
}
