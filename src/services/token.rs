use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use std::sync::Arc;
use tracing::debug;

use crate::utils::{clock::Clock, signing::Signer};

/// Reversible transform of a session key into the opaque value embedded in moderation links.
pub trait SessionTokenCodec: Send + Sync {
    fn encode(&self, session_key: &str) -> String;

    /// Recovers the session key, or `None` for a malformed, forged or expired token.
    fn decode(&self, token: &str) -> Option<String>;
}

/// Signed token: `base64url("{issued_at}:{session_key}").{hex hmac}`.
///
/// The token is not bound to an action, so approve and reject links share it.
/// A `max_age_secs` of zero disables expiry.
pub struct HmacTokenCodec {
    signer: Signer,
    max_age_secs: u64,
    clock: Arc<dyn Clock>,
}

impl HmacTokenCodec {
    pub fn new(secret: &str, max_age_secs: u64, clock: Arc<dyn Clock>) -> Self {
        Self {
            signer: Signer::new(secret),
            max_age_secs,
            clock,
        }
    }
}

impl SessionTokenCodec for HmacTokenCodec {
    fn encode(&self, session_key: &str) -> String {
        let payload = format!("{}:{}", self.clock.now().timestamp(), session_key);
        let signature = self.signer.sign(payload.as_bytes());
        format!("{}.{}", URL_SAFE_NO_PAD.encode(payload.as_bytes()), signature)
    }

    fn decode(&self, token: &str) -> Option<String> {
        let (encoded, signature) = token.split_once('.')?;
        let payload = URL_SAFE_NO_PAD.decode(encoded).ok()?;

        if !self.signer.verify(&payload, signature) {
            debug!("Rejected moderation token with bad signature");
            return None;
        }

        let payload = String::from_utf8(payload).ok()?;
        let (issued_at, session_key) = payload.split_once(':')?;
        let issued_at: i64 = issued_at.parse().ok()?;

        if self.max_age_secs > 0 {
            let age = self.clock.now().timestamp() - issued_at;
            if age < 0 || age as u64 > self.max_age_secs {
                debug!("Rejected expired moderation token (age {}s)", age);
                return None;
            }
        }

        Some(session_key.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::clock::ManualClock;
    use chrono::Duration;
    use proptest::prelude::*;

    fn codec(max_age_secs: u64) -> (HmacTokenCodec, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::default());
        (HmacTokenCodec::new("token-secret", max_age_secs, clock.clone()), clock)
    }

    #[test]
    fn test_round_trip() {
        let (codec, _) = codec(0);
        let token = codec.encode("4f1c2a9e-session");
        assert_eq!(codec.decode(&token).as_deref(), Some("4f1c2a9e-session"));
    }

    #[test]
    fn test_token_is_url_safe() {
        let (codec, _) = codec(0);
        let token = codec.encode("a/b+c=d?e#f g");
        assert!(token
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.'));
    }

    #[test]
    fn test_tampered_token_is_rejected() {
        let (codec, _) = codec(0);
        let token = codec.encode("session-a");
        let (_, signature) = token.split_once('.').unwrap();
        let forged = format!("{}.{}", URL_SAFE_NO_PAD.encode("0:session-b"), signature);
        assert_eq!(codec.decode(&forged), None);
        assert_eq!(codec.decode("garbage"), None);
        assert_eq!(codec.decode(""), None);
    }

    #[test]
    fn test_token_from_other_secret_is_rejected() {
        let clock = Arc::new(ManualClock::default());
        let ours = HmacTokenCodec::new("ours", 0, clock.clone());
        let theirs = HmacTokenCodec::new("theirs", 0, clock);
        assert_eq!(ours.decode(&theirs.encode("session")), None);
    }

    #[test]
    fn test_expiry() {
        let (codec, clock) = codec(3600);
        let token = codec.encode("session");

        clock.advance(Duration::seconds(3600));
        assert_eq!(codec.decode(&token).as_deref(), Some("session"));

        clock.advance(Duration::seconds(1));
        assert_eq!(codec.decode(&token), None);
    }

    #[test]
    fn test_zero_max_age_never_expires() {
        let (codec, clock) = codec(0);
        let token = codec.encode("session");
        clock.advance(Duration::days(365));
        assert_eq!(codec.decode(&token).as_deref(), Some("session"));
    }

    proptest! {
        #[test]
        fn prop_decode_inverts_encode(session_key in ".*") {
            let (codec, _) = codec(0);
            let token = codec.encode(&session_key);
            prop_assert_eq!(codec.decode(&token), Some(session_key));
        }
    }
}
