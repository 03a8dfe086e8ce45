//! Request extractors shared by handlers.
//!
//! - [`session::SessionUser`] -- Requires the caller's current device token.
//! - [`client_ip::ClientIp`] -- The caller's IP, proxy headers first.

pub mod client_ip;
pub mod session;
