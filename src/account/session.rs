use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Sessions kept per account, the oldest is dropped first.
const CAPACITY: usize = 16;

/// A simple session token manager.
#[derive(Serialize, Deserialize, Debug, Default, Clone)]
pub struct Sessions {
    inner: Vec<(Option<DateTime<Utc>>, String)>,
}

impl Sessions {
    pub fn new() -> Self {
        Self {
            inner: Vec::with_capacity(CAPACITY),
        }
    }

    /// Create a new token, returning it with its expiration time.
    ///
    /// `expire_days` of `0` means never expire.
    #[must_use]
    pub fn new_token(
        &mut self,
        // The user id.
        id: u64,
        expire_days: u16,
        now: DateTime<Utc>,
    ) -> (String, Option<DateTime<Utc>>) {
        let expire_at = if expire_days == 0 {
            None
        } else {
            Some(now + Duration::days(expire_days as i64))
        };
        let token = sha256::digest(format!(
            "{}-{:?}-{}",
            id,
            expire_at,
            rand::random::<u64>()
        ));
        if self.inner.len() >= CAPACITY {
            self.inner.remove(0);
        }
        self.inner.push((expire_at, token.clone()));
        (token, expire_at)
    }

    /// Remove a target token and return whether the token was removed successfully.
    pub fn remove(&mut self, token: &str) -> bool {
        let l = self.inner.len();
        self.inner.retain(|e| e.1 != token);
        l > self.inner.len()
    }

    /// Check if a token is usable.
    pub fn token_usable(&self, token: &str, now: DateTime<Utc>) -> bool {
        self.inner
            .iter()
            .any(|e| e.1 == token && e.0.map_or(true, |exp| exp > now))
    }

    /// Remove expired tokens.
    pub fn refresh(&mut self, now: DateTime<Utc>) {
        self.inner.retain(|e| e.0.map_or(true, |exp| exp > now));
    }

    /// Log out everywhere.
    pub fn clear(&mut self) {
        self.inner.clear()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issue_and_remove() {
        let mut sessions = Sessions::new();
        let now = Utc::now();
        let (token, expire_at) = sessions.new_token(1, 7, now);
        assert_eq!(expire_at, Some(now + Duration::days(7)));
        assert!(sessions.token_usable(&token, now));
        assert!(!sessions.token_usable("nope", now));
        assert!(sessions.remove(&token));
        assert!(!sessions.remove(&token));
        assert!(!sessions.token_usable(&token, now));
    }

    #[test]
    fn expiry() {
        let mut sessions = Sessions::new();
        let now = Utc::now();
        let (short, _) = sessions.new_token(1, 1, now);
        let (forever, expire_at) = sessions.new_token(1, 0, now);
        assert!(expire_at.is_none());

        let later = now + Duration::days(2);
        assert!(!sessions.token_usable(&short, later));
        assert!(sessions.token_usable(&forever, later));

        sessions.refresh(later);
        assert_eq!(sessions.len(), 1);
    }

    #[test]
    fn capacity() {
        let mut sessions = Sessions::new();
        let now = Utc::now();
        let (first, _) = sessions.new_token(1, 0, now);
        for _ in 0..CAPACITY {
            let _ = sessions.new_token(1, 0, now);
        }
        assert_eq!(sessions.len(), CAPACITY);
        assert!(!sessions.token_usable(&first, now));
    }
}
