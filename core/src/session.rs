//! Session cookie storage.
//!
//! The store is owned by exactly one client. It is written on two events
//! only: a successful bootstrap (set) and any 401 response (cleared).
//! Requests already built against an old value are not affected.

use std::sync::{PoisonError, RwLock};

/// Substring that identifies the server's session cookie.
pub const SESSION_COOKIE_MARKER: &str = "JSESSIONID";

/// A session cookie as received from the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionCookie {
    pub name: String,
    pub value: String,
}

impl SessionCookie {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    /// Value for a request `Cookie` header.
    pub fn header_value(&self) -> String {
        format!("{}={}", self.name, self.value)
    }
}

/// Pick the first cookie whose name contains [`SESSION_COOKIE_MARKER`].
pub fn find_session_cookie<I, N, V>(cookies: I) -> Option<SessionCookie>
where
    I: IntoIterator<Item = (N, V)>,
    N: AsRef<str>,
    V: AsRef<str>,
{
    cookies
        .into_iter()
        .find(|(name, _)| name.as_ref().contains(SESSION_COOKIE_MARKER))
        .map(|(name, value)| SessionCookie::new(name.as_ref(), value.as_ref()))
}

#[derive(Debug, Default)]
pub struct SessionStore {
    cookie: RwLock<Option<SessionCookie>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> Option<SessionCookie> {
        self.cookie
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replace the stored cookie. `None` leaves the store empty.
    pub fn set(&self, cookie: Option<SessionCookie>) {
        *self.cookie.write().unwrap_or_else(PoisonError::into_inner) = cookie;
    }

    pub fn clear(&self) {
        self.set(None);
    }

    pub fn is_empty(&self) -> bool {
        self.cookie
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }
}
