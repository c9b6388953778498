use actix_web::cookie::{Cookie, SameSite};
use actix_web::{HttpMessage, HttpRequest};
use argon2::{self, Config as ArgonConfig};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::Rng;

use crate::error::AppError;
use crate::models::{Claims, Role, User};

pub const COOKIE_NAME: &str = "token";

pub fn hash_password(password: &str) -> Result<String, argon2::Error> {
    let salt: [u8; 16] = rand::thread_rng().gen();
    argon2::hash_encoded(password.as_bytes(), &salt, &ArgonConfig::default())
}

pub fn verify_password(hash: &str, password: &str) -> bool {
    argon2::verify_encoded(hash, password.as_bytes()).unwrap_or(false)
}

/// `FRM-123456` style identifier for sellers; `None` for roles without one.
pub fn generate_user_id(role: Role) -> Option<String> {
    role.id_prefix()
        .map(|prefix| format!("{}-{}", prefix, rand::thread_rng().gen_range(100000..=999999)))
}

/// Signs and verifies session tokens.
#[derive(Clone)]
pub struct SessionKeys {
    secret: String,
    ttl_hours: i64,
}

impl SessionKeys {
    pub fn new(secret: impl Into<String>, ttl_hours: i64) -> Self {
        SessionKeys { secret: secret.into(), ttl_hours }
    }

    pub fn issue(&self, user: &User) -> Result<String, jsonwebtoken::errors::Error> {
        let expiration = chrono::Utc::now()
            .checked_add_signed(chrono::Duration::hours(self.ttl_hours))
            .unwrap_or_else(chrono::Utc::now)
            .timestamp() as usize;

        let claims = Claims {
            sub: user.email.clone(),
            name: user.name.clone(),
            role: user.role,
            user_id: user.user_id.clone(),
            exp: expiration,
        };
        encode(&Header::default(), &claims, &EncodingKey::from_secret(self.secret.as_ref()))
    }

    pub fn decode(&self, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_ref()),
            &Validation::new(Algorithm::HS256),
        )
        .map(|data| data.claims)
    }
}

pub fn session_cookie(token: String) -> Cookie<'static> {
    Cookie::build(COOKIE_NAME, token)
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .finish()
}

pub fn removal_cookie() -> Cookie<'static> {
    let mut cookie = Cookie::build(COOKIE_NAME, "").path("/").finish();
    cookie.make_removal();
    cookie
}

/// The logged-in account, as attached by the auth middleware.
pub fn current(req: &HttpRequest) -> Option<Claims> {
    req.extensions().get::<Claims>().cloned()
}

pub fn require_login(req: &HttpRequest) -> Result<Claims, AppError> {
    current(req).ok_or(AppError::NotLoggedIn)
}

pub fn require_admin(req: &HttpRequest) -> Result<Claims, AppError> {
    let claims = require_login(req)?;
    if claims.role != Role::Admin {
        return Err(AppError::forbidden("/dashboard", "Unauthorized access!"));
    }
    Ok(claims)
}
