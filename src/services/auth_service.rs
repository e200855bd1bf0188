use argon2::{
    Argon2, PasswordHasher,
    password_hash::{PasswordHash, PasswordVerifier, SaltString},
};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{EncodingKey, Header, encode};
use password_hash::rand_core::OsRng;
use sqlx::FromRow;
use uuid::Uuid;

use crate::dto::auth::{Claims, LoginRequest, LoginResponse, RegisterRequest};
use crate::{
    audit,
    config::AppConfig,
    db::DbPool,
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::User,
    response::{ApiResponse, Meta},
};

#[derive(Debug, FromRow)]
struct UserRow {
    id: Uuid,
    username: String,
    email: String,
    password_hash: String,
    phone: String,
    role: String,
    blocked: bool,
    online: bool,
    last_active_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: row.id,
            username: row.username,
            email: row.email,
            phone: row.phone,
            role: row.role,
            blocked: row.blocked,
            online: row.online,
            last_active_at: row.last_active_at,
            created_at: row.created_at,
        }
    }
}

pub async fn register_user(
    pool: &DbPool,
    payload: RegisterRequest,
) -> AppResult<ApiResponse<User>> {
    let RegisterRequest {
        username,
        email,
        password,
        phone,
    } = payload;
    let username = username.trim().to_string();
    let email = email.trim().to_lowercase();

    if username.is_empty() || email.is_empty() || password.is_empty() {
        return Err(AppError::BadRequest(
            "username, email and password are required".into(),
        ));
    }

    let exist: Option<(Uuid,)> =
        sqlx::query_as("SELECT id FROM users WHERE email = $1 OR username = $2")
            .bind(email.as_str())
            .bind(username.as_str())
            .fetch_optional(pool)
            .await?;

    if exist.is_some() {
        return Err(AppError::BadRequest(
            "Email or username is already taken".to_string(),
        ));
    }

    let password_hash = hash_password(&password)?;

    let row: UserRow = sqlx::query_as(
        r#"
        INSERT INTO users (id, username, email, password_hash, phone, role)
        VALUES ($1, $2, $3, $4, $5, 'user')
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(username.as_str())
    .bind(email.as_str())
    .bind(password_hash)
    .bind(phone.trim())
    .fetch_one(pool)
    .await?;
    let user = User::from(row);

    audit::record(
        pool,
        Some(user.id),
        "user_register",
        "users",
        serde_json::json!({ "user_id": user.id }),
    )
    .await;

    Ok(ApiResponse::success("User created", user, None))
}

pub async fn login_user(
    pool: &DbPool,
    config: &AppConfig,
    payload: LoginRequest,
) -> AppResult<ApiResponse<LoginResponse>> {
    let LoginRequest { email, password } = payload;
    let row: Option<UserRow> = sqlx::query_as("SELECT * FROM users WHERE email = $1")
        .bind(email.trim().to_lowercase())
        .fetch_optional(pool)
        .await?;

    let row = match row {
        Some(r) => r,
        None => return Err(AppError::BadRequest("Invalid email or password".into())),
    };

    let parsed_hash = PasswordHash::new(&row.password_hash)
        .map_err(|_| AppError::Internal(anyhow::anyhow!("Invalid password hash")))?;

    let argon2 = Argon2::default();
    if argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_err()
    {
        return Err(AppError::BadRequest("Invalid email or password".into()));
    }

    if row.blocked {
        return Err(AppError::Forbidden);
    }

    let row: UserRow = sqlx::query_as(
        "UPDATE users SET online = TRUE, last_active_at = NOW() WHERE id = $1 RETURNING *",
    )
    .bind(row.id)
    .fetch_one(pool)
    .await?;
    let user = User::from(row);

    let token = issue_token(&user, config)?;

    audit::record(
        pool,
        Some(user.id),
        "user_login",
        "users",
        serde_json::json!({ "user_id": user.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Logged in",
        LoginResponse { token, user },
        Some(Meta::empty()),
    ))
}

pub async fn logout(pool: &DbPool, auth: &AuthUser) -> AppResult<ApiResponse<serde_json::Value>> {
    sqlx::query("UPDATE users SET online = FALSE WHERE id = $1")
        .bind(auth.user_id)
        .execute(pool)
        .await?;

    audit::record(
        pool,
        Some(auth.user_id),
        "user_logout",
        "users",
        serde_json::json!({ "user_id": auth.user_id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Logged out",
        serde_json::json!({ "success": true }),
        Some(Meta::empty()),
    ))
}

/// Refreshes the caller's presence.
pub async fn ping(pool: &DbPool, auth: &AuthUser) -> AppResult<ApiResponse<User>> {
    let row: Option<UserRow> = sqlx::query_as(
        "UPDATE users SET online = TRUE, last_active_at = NOW() WHERE id = $1 AND blocked = FALSE RETURNING *",
    )
    .bind(auth.user_id)
    .fetch_optional(pool)
    .await?;

    let row = row.ok_or_else(|| AppError::Unauthorized("Account unavailable".into()))?;
    Ok(ApiResponse::success("Pong", User::from(row), Some(Meta::empty())))
}

pub async fn me(pool: &DbPool, auth: &AuthUser) -> AppResult<ApiResponse<User>> {
    let row: Option<UserRow> = sqlx::query_as("SELECT * FROM users WHERE id = $1")
        .bind(auth.user_id)
        .fetch_optional(pool)
        .await?;

    let row = row.ok_or_else(|| AppError::not_found("User"))?;
    Ok(ApiResponse::success("OK", User::from(row), Some(Meta::empty())))
}

pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))?
        .to_string();
    Ok(hash)
}

fn issue_token(user: &User, config: &AppConfig) -> AppResult<String> {
    let expiration = Utc::now()
        .checked_add_signed(Duration::hours(config.jwt_ttl_hours))
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("Failed to set expiration")))?;

    let claims = Claims {
        sub: user.id.to_string(),
        role: user.role.clone(),
        exp: expiration.timestamp() as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))
}
