//! Challenge/salt authentication for obs-websocket.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use sha2::{Digest, Sha256};

/// Derives the `authentication` string for an Identify message.
///
/// `secret = base64(sha256(password + salt))`, then
/// `response = base64(sha256(secret + challenge))`. The salt and challenge are used exactly as
/// the server sent them (base64 text), never decoded.
pub fn authentication_response(password: &str, salt: &str, challenge: &str) -> String {
    let secret = STANDARD.encode(sha256(&[password, salt]));
    STANDARD.encode(sha256(&[&secret, challenge]))
}

fn sha256(parts: &[&str]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part.as_bytes());
    }
    hasher.finalize().into()
}
