//! Session-bound CSRF tokens.

use dashmap::DashMap;
use rand::rngs::OsRng;
use rand::RngCore;
use serde::Serialize;
use subtle::ConstantTimeEq;

use crate::events::types::CsrfFailure;
use crate::time::SharedClock;

/// 32 bytes = 256 bits of entropy.
const TOKEN_BYTES: usize = 32;

#[derive(Debug, Clone, Serialize)]
pub struct CsrfToken {
    #[serde(skip_serializing)]
    value: String,
    pub session_id: String,
    pub issued_at: u64,
}

/// Issues and checks one live token per session.
pub struct CsrfGuard {
    tokens: DashMap<String, CsrfToken>,
    clock: SharedClock,
    single_use: bool,
    ttl_ms: Option<u64>,
}

impl CsrfGuard {
    /// `ttl_ms` of `None` keeps a token valid for the whole session.
    pub fn new(clock: SharedClock, single_use: bool, ttl_ms: Option<u64>) -> Self {
        Self {
            tokens: DashMap::new(),
            clock,
            single_use,
            ttl_ms,
        }
    }

    /// Issue a fresh token, replacing any earlier one for the session.
    pub fn issue(&self, session_id: &str) -> String {
        let value = generate_token();
        self.tokens.insert(
            session_id.to_string(),
            CsrfToken {
                value: value.clone(),
                session_id: session_id.to_string(),
                issued_at: self.clock.now_ms(),
            },
        );
        value
    }

    /// Compare `presented` with the session's token in constant time.
    pub fn validate(&self, session_id: &str, presented: &str) -> Result<(), CsrfFailure> {
        let now = self.clock.now_ms();

        if self.single_use {
            let mut failure = CsrfFailure::Missing;
            let consumed = self.tokens.remove_if(session_id, |_, token| {
                match self.check(token, presented, now) {
                    Ok(()) => true,
                    Err(f) => {
                        failure = f;
                        false
                    }
                }
            });
            return match consumed {
                Some(_) => Ok(()),
                None => Err(failure),
            };
        }

        match self.tokens.get(session_id) {
            Some(token) => self.check(&token, presented, now),
            None => Err(CsrfFailure::Missing),
        }
    }

    /// Forget the session's token (e.g. on logout).
    pub fn revoke(&self, session_id: &str) -> bool {
        self.tokens.remove(session_id).is_some()
    }

    /// Drop expired tokens. Returns how many were removed.
    pub fn sweep(&self) -> usize {
        let Some(ttl) = self.ttl_ms else { return 0 };
        let now = self.clock.now_ms();
        let before = self.tokens.len();
        self.tokens
            .retain(|_, token| now < token.issued_at.saturating_add(ttl));
        before.saturating_sub(self.tokens.len())
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    fn check(&self, token: &CsrfToken, presented: &str, now: u64) -> Result<(), CsrfFailure> {
        if let Some(ttl) = self.ttl_ms {
            if now >= token.issued_at.saturating_add(ttl) {
                return Err(CsrfFailure::Expired);
            }
        }
        if bool::from(token.value.as_bytes().ct_eq(presented.as_bytes())) {
            Ok(())
        } else {
            Err(CsrfFailure::Mismatch)
        }
    }
}

fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}
