use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    // Server configuration
    pub server_host: String,
    pub server_port: u16,
    pub environment: String,
    pub log_level: String,

    // Database configuration
    pub database_url: String,
    pub database_max_connections: u32,
    pub content_languages: Vec<String>,

    // Authentication configuration
    pub jwt_secret: String,

    // Public URLs
    pub public_base_url: String,
    pub cors_allowed_origins: String,

    // Email configuration
    pub smtp_host: String,
    pub smtp_port: u16,
    pub smtp_username: String,
    pub smtp_password: String,

    // Comment settings
    pub anonymous_access_enabled: bool,
    pub moderation_enabled: bool,
    pub moderation_email_subject: String,
    pub moderation_email_from: String,
    pub moderation_email_to: Vec<String>,
    pub moderation_email_template: Option<String>,
    pub moderation_token_secret: String,
    pub moderation_token_ttl_secs: u64,
    pub captcha_enabled: bool,

    // Localization
    pub default_locale: String,
    pub locale_map: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Config {
            server_host: env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            server_port: env::var("SERVER_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()?,
            environment: env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
            log_level: env::var("LOG_LEVEL")
                .unwrap_or_else(|_| "rainbow_comments=debug,tower_http=debug".to_string()),

            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite://data/comments.db".to_string()),
            database_max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                .unwrap_or_else(|_| "5".to_string())
                .parse()?,
            content_languages: split_list(
                &env::var("CONTENT_LANGUAGES").unwrap_or_else(|_| "eng-GB".to_string()),
            ),

            jwt_secret: env::var("JWT_SECRET")
                .map_err(|_| anyhow::anyhow!("JWT_SECRET must be set"))?,

            public_base_url: env::var("PUBLIC_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
            cors_allowed_origins: env::var("CORS_ALLOWED_ORIGINS")
                .unwrap_or_else(|_| "http://localhost:3001".to_string()),

            smtp_host: env::var("SMTP_HOST")
                .unwrap_or_else(|_| "localhost".to_string()),
            smtp_port: env::var("SMTP_PORT")
                .unwrap_or_else(|_| "587".to_string())
                .parse()?,
            smtp_username: env::var("SMTP_USERNAME")
                .unwrap_or_default(),
            smtp_password: env::var("SMTP_PASSWORD")
                .unwrap_or_default(),

            anonymous_access_enabled: env::var("ANONYMOUS_ACCESS_ENABLED")
                .unwrap_or_else(|_| "false".to_string())
                .parse()?,
            moderation_enabled: env::var("MODERATION_ENABLED")
                .unwrap_or_else(|_| "false".to_string())
                .parse()?,
            moderation_email_subject: env::var("MODERATION_EMAIL_SUBJECT")
                .unwrap_or_else(|_| "New comment awaiting moderation".to_string()),
            moderation_email_from: env::var("MODERATION_EMAIL_FROM")
                .unwrap_or_else(|_| "noreply@rainbow-comments.com".to_string()),
            moderation_email_to: split_list(
                &env::var("MODERATION_EMAIL_TO").unwrap_or_default(),
            ),
            moderation_email_template: env::var("MODERATION_EMAIL_TEMPLATE")
                .ok()
                .filter(|path| !path.trim().is_empty()),
            moderation_token_secret: env::var("MODERATION_TOKEN_SECRET")
                .map_err(|_| anyhow::anyhow!("MODERATION_TOKEN_SECRET must be set"))?,
            moderation_token_ttl_secs: env::var("MODERATION_TOKEN_TTL_SECS")
                .unwrap_or_else(|_| "0".to_string())
                .parse()?,
            captcha_enabled: env::var("CAPTCHA_ENABLED")
                .unwrap_or_else(|_| "true".to_string())
                .parse()?,

            default_locale: env::var("DEFAULT_LOCALE").unwrap_or_else(|_| "en".to_string()),
            locale_map: env::var("LOCALE_MAP")
                .unwrap_or_else(|_| "en=eng-GB,en-US=eng-US,fr=fre-FR,de=ger-DE".to_string()),
        })
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

impl Default for Config {
    /// Development settings; secrets are placeholders.
    fn default() -> Self {
        Self {
            server_host: "127.0.0.1".to_string(),
            server_port: 3000,
            environment: "development".to_string(),
            log_level: "rainbow_comments=debug,tower_http=debug".to_string(),
            database_url: "sqlite::memory:".to_string(),
            database_max_connections: 1,
            content_languages: vec!["eng-GB".to_string()],
            jwt_secret: "development-jwt-secret".to_string(),
            public_base_url: "http://localhost:3000".to_string(),
            cors_allowed_origins: "http://localhost:3001".to_string(),
            smtp_host: "localhost".to_string(),
            smtp_port: 25,
            smtp_username: String::new(),
            smtp_password: String::new(),
            anonymous_access_enabled: false,
            moderation_enabled: false,
            moderation_email_subject: "New comment awaiting moderation".to_string(),
            moderation_email_from: "noreply@rainbow-comments.com".to_string(),
            moderation_email_to: Vec::new(),
            moderation_email_template: None,
            moderation_token_secret: "development-token-secret".to_string(),
            moderation_token_ttl_secs: 0,
            captcha_enabled: true,
            default_locale: "en".to_string(),
            locale_map: "en=eng-GB".to_string(),
        }
    }
}

/// 解析逗号分隔的配置项，忽略空白条目
pub fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|item| item.trim())
        .filter(|item| !item.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_list() {
        assert_eq!(
            split_list("mod@example.com, admin@example.com"),
            vec!["mod@example.com".to_string(), "admin@example.com".to_string()]
        );
        assert_eq!(split_list("single@example.com"), vec!["single@example.com".to_string()]);
        assert!(split_list("").is_empty());
        assert!(split_list(" , ,").is_empty());
    }
}
