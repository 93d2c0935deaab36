use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use parking_lot::Mutex;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use crate::utils::{clock::Clock, signing::Signer};

/// Challenges older than this are refused.
const CHALLENGE_TTL_SECS: i64 = 600;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptchaChallenge {
    pub question: String,
    pub token: String,
}

/// Arithmetic bot challenge for anonymous submissions.
///
/// The signed token carries `issued_at:nonce:answer`. Each nonce can be
/// checked once: the first verification spends it, whatever the answer, so a
/// token can neither be replayed nor brute-forced. Spent nonces are kept
/// until their challenge would have expired anyway.
#[derive(Clone)]
pub struct CaptchaService {
    signer: Signer,
    clock: Arc<dyn Clock>,
    spent: Arc<Mutex<HashMap<String, i64>>>,
}

impl CaptchaService {
    pub fn new(secret: &str, clock: Arc<dyn Clock>) -> Self {
        Self {
            signer: Signer::new(format!("captcha:{}", secret)),
            clock,
            spent: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn issue(&self) -> CaptchaChallenge {
        let mut rng = rand::thread_rng();
        let a = rng.gen_range(1..=9);
        let b = rng.gen_range(1..=9);
        self.issue_for(a, b)
    }

    pub fn issue_for(&self, a: u32, b: u32) -> CaptchaChallenge {
        let nonce = hex::encode(rand::thread_rng().gen::<[u8; 16]>());
        let payload = format!("{}:{}:{}", self.clock.now().timestamp(), nonce, a + b);
        let signature = self.signer.sign(payload.as_bytes());
        CaptchaChallenge {
            question: format!("{} + {}", a, b),
            token: format!("{}.{}", URL_SAFE_NO_PAD.encode(payload.as_bytes()), signature),
        }
    }

    pub fn verify(&self, token: &str, answer: &str) -> bool {
        let Some((encoded, signature)) = token.split_once('.') else {
            return false;
        };
        let Ok(payload) = URL_SAFE_NO_PAD.decode(encoded) else {
            return false;
        };
        if !self.signer.verify(&payload, signature) {
            return false;
        }
        let Ok(payload) = String::from_utf8(payload) else {
            return false;
        };
        let mut parts = payload.splitn(3, ':');
        let (Some(issued_at), Some(nonce), Some(expected)) = (parts.next(), parts.next(), parts.next())
        else {
            return false;
        };
        let Ok(issued_at) = issued_at.parse::<i64>() else {
            return false;
        };

        let now = self.clock.now().timestamp();
        let age = now - issued_at;
        if !(0..=CHALLENGE_TTL_SECS).contains(&age) {
            return false;
        }

        if !self.spend(nonce, issued_at, now) {
            debug!("Rejected reused captcha challenge");
            return false;
        }

        answer.trim() == expected
    }

    /// Marks `nonce` as used; false when it already was.
    fn spend(&self, nonce: &str, issued_at: i64, now: i64) -> bool {
        let mut spent = self.spent.lock();
        spent.retain(|_, issued| now - *issued <= CHALLENGE_TTL_SECS);
        if spent.contains_key(nonce) {
            return false;
        }
        spent.insert(nonce.to_string(), issued_at);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::clock::ManualClock;
    use chrono::Duration;

    fn service() -> (CaptchaService, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::default());
        (CaptchaService::new("secret", clock.clone()), clock)
    }

    #[test]
    fn test_correct_answer_passes() {
        let (captcha, _) = service();
        let challenge = captcha.issue_for(2, 5);
        assert_eq!(challenge.question, "2 + 5");
        assert!(captcha.verify(&challenge.token, " 7 "));

        let other = captcha.issue_for(2, 5);
        assert_ne!(other.token, challenge.token);
        assert!(!captcha.verify(&other.token, "8"));
    }

    #[test]
    fn test_challenge_is_spent_on_first_check() {
        let (captcha, _) = service();
        let solved = captcha.issue_for(2, 3);
        assert!(captcha.verify(&solved.token, "5"));
        assert!(!captcha.verify(&solved.token, "5"));

        // 答错也会消耗令牌，不能逐个尝试答案
        let guessed = captcha.issue_for(4, 4);
        assert!(!captcha.verify(&guessed.token, "7"));
        assert!(!captcha.verify(&guessed.token, "8"));
    }

    #[test]
    fn test_clones_share_spent_challenges() {
        let (captcha, _) = service();
        let copy = captcha.clone();
        let challenge = captcha.issue_for(1, 2);
        assert!(copy.verify(&challenge.token, "3"));
        assert!(!captcha.verify(&challenge.token, "3"));
    }

    #[test]
    fn test_spent_nonces_are_pruned_after_expiry() {
        let (captcha, clock) = service();
        let challenge = captcha.issue_for(1, 1);
        assert!(captcha.verify(&challenge.token, "2"));
        assert_eq!(captcha.spent.lock().len(), 1);

        clock.advance(Duration::seconds(CHALLENGE_TTL_SECS + 1));
        let fresh = captcha.issue_for(3, 3);
        assert!(captcha.verify(&fresh.token, "6"));
        assert_eq!(captcha.spent.lock().len(), 1);
    }

    #[test]
    fn test_random_challenge_is_answerable() {
        let (captcha, _) = service();
        let challenge = captcha.issue();
        let (a, b) = challenge.question.split_once(" + ").unwrap();
        let answer = a.parse::<u32>().unwrap() + b.parse::<u32>().unwrap();
        assert!(captcha.verify(&challenge.token, &answer.to_string()));
    }

    #[test]
    fn test_expired_challenge_fails() {
        let (captcha, clock) = service();
        let challenge = captcha.issue_for(1, 1);
        clock.advance(Duration::seconds(CHALLENGE_TTL_SECS + 1));
        assert!(!captcha.verify(&challenge.token, "2"));
    }

    #[test]
    fn test_forged_token_fails() {
        let (captcha, _) = service();
        let forged = format!("{}.{}", URL_SAFE_NO_PAD.encode("0:abcd:5"), "00");
        assert!(!captcha.verify(&forged, "5"));
        assert!(!captcha.verify("", "5"));
    }
}
