use crate::error::{AppError, Result};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Clone)]
pub struct AuthService {
    decoding_key: DecodingKey,
    validation: Validation,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,        // 用户ID
    pub exp: i64,           // 过期时间
    pub name: String,       // 显示名称
    pub email: String,      // 邮箱
}

/// Signed-in visitor, as carried by the bearer token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
}

impl AuthService {
    pub fn new(jwt_secret: &str) -> Self {
        Self {
            decoding_key: DecodingKey::from_secret(jwt_secret.as_bytes()),
            validation: Validation::new(Algorithm::HS256),
        }
    }

    /// 验证 JWT
    pub fn verify_jwt(&self, token: &str) -> Result<Claims> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation)?;
        Ok(data.claims)
    }

    /// Resolves the user behind a bearer token.
    pub fn authenticate(&self, token: &str) -> Result<User> {
        let claims = self.verify_jwt(token)?;
        let id = claims
            .sub
            .parse::<i64>()
            .map_err(|_| AppError::unauthorized("Token subject is not a user id"))?;

        debug!("Authenticated user {}", id);
        Ok(User {
            id,
            name: claims.name,
            email: claims.email,
        })
    }
}
