//! Verification-code requests keyed by client IP.

use crate::error::CoreResult;
use crate::rate_counter::RateCounter;

/// What a verification-code request produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptchaOutcome {
    /// No code was live for this IP; a new one was issued.
    Issued(String),
    /// A code is already live. Carries the IP's request count in the current
    /// window, not the code.
    Repeat(String),
}

impl CaptchaOutcome {
    /// The value returned to the caller under `code`.
    pub fn value(&self) -> &str {
        match self {
            CaptchaOutcome::Issued(code) | CaptchaOutcome::Repeat(code) => code,
        }
    }
}

#[derive(Clone)]
pub struct CaptchaService {
    codes: RateCounter,
    requests: RateCounter,
}

impl CaptchaService {
    pub fn new(codes: RateCounter, requests: RateCounter) -> Self {
        Self { codes, requests }
    }

    pub fn request(&self, ip: &str) -> CoreResult<CaptchaOutcome> {
        let count = self.requests.increment(ip)?;

        if !self.codes.has_entry(ip)? {
            let code = self.codes.issue_code(ip)?;
            return Ok(CaptchaOutcome::Issued(code));
        }

        tracing::debug!(ip, count, "Verification code already live");
        let repeat = self
            .requests
            .read_entry(ip)?
            .unwrap_or_else(|| count.to_string());
        Ok(CaptchaOutcome::Repeat(repeat))
    }
}
