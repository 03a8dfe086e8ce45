//! Account core for the messaging backend.
//!
//! Framework-free building blocks that the HTTP layer wires together:
//!
//! - [`credentials`] -- Argon2id password hashing and verification.
//! - [`token`] -- HS256 session token issuance and validation.
//! - [`sessions`] -- per-user device → token bookkeeping.
//! - [`rate_counter`] -- ephemeral per-IP codes and counters.
//! - [`image_codec`] -- magic-byte detection and lossless WebP transcoding.
//! - [`avatar`] -- on-disk avatar probing and canonical replacement.
//! - [`accounts`] / [`captcha`] -- the login, registration and
//!   verification-code flows built on the pieces above.

pub mod accounts;
pub mod avatar;
pub mod captcha;
pub mod clock;
pub mod credentials;
pub mod error;
pub mod ids;
pub mod image_codec;
pub mod kv;
pub mod rate_counter;
pub mod sessions;
pub mod token;
pub mod types;
pub mod users;
