use crate::{
    error::AppError,
    services::{auth::User, locale::preferred_locale, moderation::SubmissionContext},
    state::AppState,
    utils::validation::is_valid_session_key,
};
use axum::{
    async_trait,
    extract::{ConnectInfo, FromRequestParts},
    headers::{authorization::Bearer, Authorization, Cookie, HeaderMapExt},
    http::{header, request::Parts, HeaderMap, HeaderValue},
    response::Response,
};
use std::{net::SocketAddr, sync::Arc};
use tracing::debug;
use uuid::Uuid;

/// Cookie carrying the visitor's comment session key.
pub const SESSION_COOKIE: &str = "comment_session";

/// 评论请求上下文：当前用户、会话、客户端 IP 和语言
#[derive(Debug, Clone)]
pub struct CommentRequestContext {
    pub user: Option<User>,
    pub session_key: String,
    pub new_session: bool,
    pub client_ip: String,
    pub locale: Option<String>,
}

impl CommentRequestContext {
    pub fn submission(&self) -> SubmissionContext {
        SubmissionContext {
            user: self.user.clone(),
            session_key: self.session_key.clone(),
            client_ip: self.client_ip.clone(),
            locale: self.locale.clone(),
        }
    }

    /// Adds the session cookie to `response` when the session was created by this request.
    pub fn attach_session(&self, mut response: Response) -> Response {
        if self.new_session {
            let cookie = format!(
                "{}={}; Path=/; HttpOnly; SameSite=Lax",
                SESSION_COOKIE, self.session_key
            );
            if let Ok(value) = HeaderValue::from_str(&cookie) {
                response.headers_mut().append(header::SET_COOKIE, value);
            }
        }
        response
    }
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for CommentRequestContext {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        // 无效令牌按匿名访问处理
        let user = parts
            .headers
            .typed_get::<Authorization<Bearer>>()
            .and_then(|auth| match state.auth_service.authenticate(auth.token()) {
                Ok(user) => Some(user),
                Err(e) => {
                    debug!("Ignoring bearer token: {}", e);
                    None
                }
            });

        let existing_session = parts
            .headers
            .typed_get::<Cookie>()
            .and_then(|cookie| cookie.get(SESSION_COOKIE).map(String::from))
            .filter(|key| is_valid_session_key(key));

        let (session_key, new_session) = match existing_session {
            Some(key) => (key, false),
            None => (Uuid::new_v4().to_string(), true),
        };

        let locale = parts
            .headers
            .get(header::ACCEPT_LANGUAGE)
            .and_then(|value| value.to_str().ok())
            .and_then(preferred_locale)
            .or_else(|| Some(state.config.default_locale.clone()));

        Ok(CommentRequestContext {
            user,
            session_key,
            new_session,
            client_ip: get_client_ip(parts),
            locale,
        })
    }
}

/// 获取客户端 IP 地址
fn get_client_ip(parts: &Parts) -> String {
    if let Some(ip) = forwarded_ip(&parts.headers) {
        return ip;
    }

    parts
        .extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

fn forwarded_ip(headers: &HeaderMap) -> Option<String> {
    if let Some(forwarded_for) = headers.get("x-forwarded-for") {
        if let Ok(ip_str) = forwarded_for.to_str() {
            if let Some(ip) = ip_str.split(',').next() {
                let ip = ip.trim();
                if !ip.is_empty() {
                    return Some(ip.to_string());
                }
            }
        }
    }

    headers
        .get("x-real-ip")
        .and_then(|real_ip| real_ip.to_str().ok())
        .map(|ip| ip.trim().to_string())
        .filter(|ip| !ip.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forwarded_ip() {
        let mut headers = HeaderMap::new();
        assert_eq!(forwarded_ip(&headers), None);

        headers.insert("x-real-ip", HeaderValue::from_static("10.0.0.9"));
        assert_eq!(forwarded_ip(&headers).as_deref(), Some("10.0.0.9"));

        headers.insert("x-forwarded-for", HeaderValue::from_static("203.0.113.5, 10.0.0.1"));
        assert_eq!(forwarded_ip(&headers).as_deref(), Some("203.0.113.5"));
    }
}
