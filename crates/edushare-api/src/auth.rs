use std::sync::Arc;

use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::{SaltString, rand_core::OsRng}};
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use axum_extra::extract::{
    WithRejection,
    cookie::{Cookie, CookieJar, SameSite},
};
use jsonwebtoken::{EncodingKey, Header, encode};
use tracing::info;
use uuid::Uuid;

use edushare_db::Database;
use edushare_db::models::CreateUserOutcome;
use edushare_types::api::{Claims, LoginRequest, LoginResponse, RegisterRequest, RegisterResponse};

use crate::db_call;
use crate::error::ApiError;

pub const SESSION_COOKIE: &str = "edushare_session";

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub jwt_secret: String,
    pub economy: Economy,
}

/// Point values of the question/sign-in economy.
#[derive(Debug, Clone, Copy)]
pub struct Economy {
    pub initial_points: i64,
    pub question_cost: i64,
    pub daily_sign_reward: i64,
}

impl Default for Economy {
    fn default() -> Self {
        Self {
            initial_points: 100,
            question_cost: 20,
            daily_sign_reward: 10,
        }
    }
}

pub async fn register(
    State(state): State<AppState>,
    WithRejection(Json(req), _): WithRejection<Json<RegisterRequest>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    let email = req.email.trim().to_lowercase();
    let name = req.name.trim().to_string();

    // Validate input
    if !email.contains('@') || email.len() > 254 {
        return Err(ApiError::Validation("invalid email".into()));
    }
    if name.is_empty() || name.chars().count() > 50 {
        return Err(ApiError::Validation("name must be 1-50 characters".into()));
    }
    if req.password.len() < 8 {
        return Err(ApiError::Validation("password must be at least 8 characters".into()));
    }

    // Check if email is taken
    let lookup = email.clone();
    if db_call(&state, move |db| db.get_user_by_email(&lookup)).await?.is_some() {
        return Err(ApiError::Conflict("email already registered".into()));
    }

    // Hash password with Argon2id
    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
        .hash_password(req.password.as_bytes(), &salt)
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("password hash failed: {e}")))?
        .to_string();

    let user_id = Uuid::new_v4();
    let points = state.economy.initial_points;
    let (uid, user_email, user_name) = (user_id.to_string(), email.clone(), name.clone());
    let outcome = db_call(&state, move |db| {
        db.create_user(&uid, &user_email, &user_name, &password_hash, points)
    })
    .await?;

    // A concurrent registration can claim the email after the check above.
    if outcome == CreateUserOutcome::EmailTaken {
        return Err(ApiError::Conflict("email already registered".into()));
    }

    let token = create_token(&state.jwt_secret, user_id, &name)?;
    info!("registered user {}", user_id);

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            user_id,
            token,
        }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    WithRejection(Json(req), _): WithRejection<Json<LoginRequest>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    let email = req.email.trim().to_lowercase();
    let user = db_call(&state, move |db| db.get_user_by_email(&email))
        .await?
        .ok_or(ApiError::Unauthorized)?;

    // Verify password
    let parsed_hash = PasswordHash::new(&user.password)
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("stored hash unreadable: {e}")))?;

    Argon2::default()
        .verify_password(req.password.as_bytes(), &parsed_hash)
        .map_err(|_| ApiError::Unauthorized)?;

    let user_id: Uuid = user
        .id
        .parse()
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("corrupt user id '{}': {e}", user.id)))?;

    let token = create_token(&state.jwt_secret, user_id, &user.name)?;

    let cookie = Cookie::build((SESSION_COOKIE, token.clone()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax);

    Ok((
        jar.add(cookie),
        Json(LoginResponse {
            user_id,
            name: user.name,
            token,
        }),
    ))
}

pub fn create_token(secret: &str, user_id: Uuid, name: &str) -> anyhow::Result<String> {
    let claims = Claims {
        sub: user_id,
        name: name.to_string(),
        exp: (chrono::Utc::now() + chrono::Duration::days(30)).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}
