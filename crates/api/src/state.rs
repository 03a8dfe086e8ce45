use std::sync::Arc;

use aurim_core::accounts::AccountService;
use aurim_core::avatar::AvatarResolver;
use aurim_core::captcha::CaptchaService;
use aurim_core::credentials::CredentialService;
use aurim_core::error::CoreError;
use aurim_core::ids::SnowflakeIds;
use aurim_core::kv::{KvStore, MemoryKvStore};
use aurim_core::rate_counter::RateCounter;
use aurim_core::sessions::SessionStore;
use aurim_core::token::TokenCodec;
use aurim_core::users::{MemoryUserStore, UserStore};
use mockable::Clock;

use crate::config::ServerConfig;

/// Snowflake node assignment for this service.
const DATACENTER_ID: i64 = 1;
const WORKER_ID: i64 = 1;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Registration, login and session checks.
    pub accounts: AccountService,
    /// Verification codes per client IP.
    pub captcha: CaptchaService,
    /// Avatar files on disk.
    pub avatars: AvatarResolver,
}

impl AppState {
    /// Wire every component against in-process stores.
    pub fn new(config: ServerConfig, clock: Arc<dyn Clock>) -> Result<Self, CoreError> {
        let kv: Arc<dyn KvStore> = Arc::new(MemoryKvStore::new(Arc::clone(&clock)));
        let users: Arc<dyn UserStore> = Arc::new(MemoryUserStore::new());
        Self::with_stores(config, clock, kv, users)
    }

    /// Wire every component against the given stores.
    pub fn with_stores(
        config: ServerConfig,
        clock: Arc<dyn Clock>,
        kv: Arc<dyn KvStore>,
        users: Arc<dyn UserStore>,
    ) -> Result<Self, CoreError> {
        let credentials = CredentialService::new(config.argon2)?;
        let tokens = TokenCodec::new(&config.token, Arc::clone(&clock));
        let sessions = SessionStore::new(Arc::clone(&kv));
        let ids = Arc::new(SnowflakeIds::new(DATACENTER_ID, WORKER_ID, Arc::clone(&clock))?);

        let accounts = AccountService::new(users, credentials, tokens, sessions, ids, clock);
        let captcha = CaptchaService::new(
            RateCounter::verification_codes(Arc::clone(&kv)),
            RateCounter::account_operations(kv),
        );
        let avatars = AvatarResolver::new(config.avatar_dir.clone());
        avatars.ensure_root()?;

        Ok(Self {
            config: Arc::new(config),
            accounts,
            captcha,
            avatars,
        })
    }
}
