//! Account activation tokens.
//!
//! A token is `<issued at, base36>-<mac>`. The mac is a truncated
//! HMAC-SHA256 over the user id, the user's
//! [state version](super::User::state_version) and the issue time, keyed
//! with the server secret. A token dies when the state version moves (any
//! login) or when the timeout elapses. Nothing is stored.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use super::User;

/// Bytes of the mac kept in a token.
const MAC_LENGTH: usize = 16;

/// Makes and checks activation tokens.
pub struct TokenGenerator {
    secret: String,
    timeout: Duration,
}

impl TokenGenerator {
    pub fn new(secret: String, timeout: Duration) -> Self {
        Self { secret, timeout }
    }

    /// Makes a token for the current state of `user`.
    pub fn make_token(&self, user: &User, now: DateTime<Utc>) -> String {
        let timestamp = now.timestamp().max(0) as u64;
        let mac = self.mac(user, timestamp).finalize().into_bytes();
        format!(
            "{}-{}",
            to_base36(timestamp),
            URL_SAFE_NO_PAD.encode(&mac[..MAC_LENGTH])
        )
    }

    /// Checks a token against the current state of `user`.
    ///
    /// Fails for malformed tokens, tokens of another user or state version,
    /// and expired tokens alike.
    pub fn check_token(&self, user: &User, token: &str, now: DateTime<Utc>) -> bool {
        let Some((timestamp, mac)) = token.split_once('-') else {
            return false;
        };
        let Ok(timestamp) = u64::from_str_radix(timestamp, 36) else {
            return false;
        };
        let Ok(mac) = URL_SAFE_NO_PAD.decode(mac) else {
            return false;
        };
        if mac.len() != MAC_LENGTH
            || self
                .mac(user, timestamp)
                .verify_truncated_left(&mac)
                .is_err()
        {
            return false;
        }

        let Ok(issued_at) = i64::try_from(timestamp) else {
            return false;
        };
        let age = now.timestamp() - issued_at;
        age >= 0 && age <= self.timeout.num_seconds()
    }

    fn mac(&self, user: &User, timestamp: u64) -> Hmac<Sha256> {
        let mut mac = <Hmac<Sha256>>::new_from_slice(self.secret.as_bytes())
            .expect("hmac takes keys of any length");
        mac.update(&user.id.to_be_bytes());
        mac.update(&user.state_version.to_be_bytes());
        mac.update(&timestamp.to_be_bytes());
        mac
    }
}

/// Base36 keeps the issue time short in links.
fn to_base36(mut n: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if n == 0 {
        return "0".to_owned();
    }
    let mut buf = Vec::new();
    while n > 0 {
        buf.push(DIGITS[(n % 36) as usize]);
        n /= 36;
    }
    buf.iter().rev().map(|&b| b as char).collect()
}

/// Encodes a user id for links.
pub fn encode_uid(id: u64) -> String {
    URL_SAFE_NO_PAD.encode(id.to_string())
}

/// Decodes a user id from a link, `None` if it's garbage.
pub fn decode_uid(uid: &str) -> Option<u64> {
    let bytes = URL_SAFE_NO_PAD.decode(uid).ok()?;
    std::str::from_utf8(&bytes).ok()?.parse().ok()
}

/// The activation link of a user.
pub fn activation_link(site: &str, user: &User, token: &str) -> String {
    format!("{site}/activate/{}/{token}", encode_uid(user.id))
}

/// The link to request a new activation link with an old one.
pub fn resend_link(site: &str, user: &User, token: &str) -> String {
    format!("{site}/resend-activation/{}/{token}", encode_uid(user.id))
}
