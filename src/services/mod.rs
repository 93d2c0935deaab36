pub mod auth;
pub mod captcha;
pub mod comment;
pub mod database;
pub mod links;
pub mod locale;
pub mod mailer;
pub mod moderation;
pub mod template;
pub mod token;

// 重新导出常用类型
pub use auth::AuthService;
pub use captcha::CaptchaService;
pub use comment::CommentService;
pub use database::Database;
pub use mailer::{Mailer, SmtpMailer};
pub use moderation::ModerationService;
