use std::collections::HashSet;
use std::sync::Mutex;

use serde::Serialize;
use subtle::ConstantTimeEq;
use uuid::Uuid;

/// Header carrying the session id issued at login.
pub const SESSION_HEADER: &str = "x-intake-session";

/// Opaque id handed to a client after a successful login.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn parse(raw: &str) -> Option<Self> {
        Uuid::parse_str(raw.trim()).ok().map(Self)
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Per-request view of the caller's authentication, passed explicitly to handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionContext {
    pub session: Option<SessionId>,
    pub authenticated: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AccessError {
    #[error("incorrect passphrase")]
    WrongPassphrase,
    #[error("a valid session is required")]
    Unauthenticated,
    #[error("session registry unavailable")]
    Poisoned,
}

/// Shared-passphrase gate plus the set of sessions it has admitted.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    passphrase: Option<String>,
    sessions: Mutex<HashSet<SessionId>>,
}

impl SessionRegistry {
    pub fn new(passphrase: Option<String>) -> Self {
        Self {
            passphrase,
            sessions: Mutex::new(HashSet::new()),
        }
    }

    /// A registry without a passphrase admits every request.
    pub fn open() -> Self {
        Self::default()
    }

    pub fn is_gated(&self) -> bool {
        self.passphrase.is_some()
    }

    pub fn login(&self, attempt: &str) -> Result<SessionId, AccessError> {
        if let Some(expected) = &self.passphrase {
            let matches: bool = expected.as_bytes().ct_eq(attempt.as_bytes()).into();
            if !matches {
                return Err(AccessError::WrongPassphrase);
            }
        }

        let id = SessionId(Uuid::new_v4());
        self.sessions
            .lock()
            .map_err(|_| AccessError::Poisoned)?
            .insert(id);
        Ok(id)
    }

    pub fn logout(&self, id: SessionId) -> Result<bool, AccessError> {
        Ok(self
            .sessions
            .lock()
            .map_err(|_| AccessError::Poisoned)?
            .remove(&id))
    }

    /// Build the context for a request carrying `presented` (the raw header value).
    pub fn context(&self, presented: Option<&str>) -> Result<SessionContext, AccessError> {
        let session = presented.and_then(SessionId::parse);
        let known = match session {
            Some(id) => self
                .sessions
                .lock()
                .map_err(|_| AccessError::Poisoned)?
                .contains(&id),
            None => false,
        };

        Ok(SessionContext {
            session: session.filter(|_| known),
            authenticated: known || !self.is_gated(),
        })
    }

    pub fn authorize(&self, presented: Option<&str>) -> Result<SessionContext, AccessError> {
        let context = self.context(presented)?;
        if context.authenticated {
            Ok(context)
        } else {
            Err(AccessError::Unauthenticated)
        }
    }
}
