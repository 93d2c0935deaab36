#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use rainbow_comments::{
    config::Config,
    services::{
        comment::CommentService,
        database::Database,
        mailer::{Mailer, OutgoingMail},
    },
    state::AppState,
    utils::clock::ManualClock,
    Result,
};

/// Mailer that keeps every message instead of sending it.
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<OutgoingMail>>,
}

impl RecordingMailer {
    pub fn sent(&self) -> Vec<OutgoingMail> {
        self.sent.lock().clone()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, mail: OutgoingMail) -> Result<()> {
        self.sent.lock().push(mail);
        Ok(())
    }
}

pub struct TestApp {
    pub state: Arc<AppState>,
    pub mailer: Arc<RecordingMailer>,
    pub clock: Arc<ManualClock>,
    pub db: Arc<Database>,
}

pub fn test_config(moderating: bool, anonymous: bool) -> Config {
    Config {
        anonymous_access_enabled: anonymous,
        moderation_enabled: moderating,
        moderation_email_to: vec!["moderator@example.com".to_string()],
        public_base_url: "https://comments.example.com".to_string(),
        locale_map: "en=eng-GB,fr=fre-FR".to_string(),
        ..Config::default()
    }
}

pub async fn test_app(config: Config) -> TestApp {
    let db = Arc::new(Database::connect("sqlite::memory:", 1).await.unwrap());
    let clock = Arc::new(ManualClock::default());
    let mailer = Arc::new(RecordingMailer::default());

    let languages = CommentService::new(db.clone(), clock.clone());
    languages.register_language("eng-GB").await.unwrap();
    languages.register_language("fre-FR").await.unwrap();

    let state = AppState::build(config, db.clone(), mailer.clone(), clock.clone()).unwrap();

    TestApp {
        state: Arc::new(state),
        mailer,
        clock,
        db,
    }
}

/// Pulls the `{content}/{token}/{action}/{comment}` segments out of a moderation URL.
pub fn moderation_segments(url: &str) -> (i64, String, String, i64) {
    let path = url
        .split("/api/comments/moderation/")
        .nth(1)
        .expect("not a moderation url");
    let parts: Vec<&str> = path.split('/').collect();
    assert_eq!(parts.len(), 4, "unexpected moderation url {}", url);
    (
        parts[0].parse().unwrap(),
        parts[1].to_string(),
        parts[2].to_string(),
        parts[3].parse().unwrap(),
    )
}

/// Every moderation URL found in a mail body, in order.
pub fn moderation_urls(body: &str) -> Vec<String> {
    body.split_whitespace()
        .filter(|word| word.contains("/api/comments/moderation/"))
        .map(String::from)
        .collect()
}
