//! Credential checks and session bookkeeping.
//!
//! Session tokens are HS256 JWTs, and each one is also recorded in
//! `t_session` so logging out can revoke it before it expires.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use log::{debug, error, info};
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use serde::{Deserialize, Serialize};

use crate::auth::AuthUser;
use crate::config::AppConfig;
use crate::entity::{session, user};
use crate::error::AccountError;
use crate::{password, token, users};

const DEVICE_WEB: &str = "WEB";

/// An established login. The token is what the client presents back.
#[derive(Clone, Debug, PartialEq)]
pub struct Session {
    pub token: String,
    pub user_id: i32,
    pub remember: bool,
    pub expires_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize)]
struct Claims {
    #[serde(rename = "loginId")]
    login_id: i32,
    device: String,
    jti: String,
    exp: usize,
}

/// Checks email and password and opens a session for an active account.
///
/// An unknown email and a wrong password both yield
/// [`AccountError::InvalidCredentials`]. A correct password on a pending
/// account yields [`AccountError::AccountNotActivated`] and no session.
pub async fn authenticate(
    db: &DatabaseConnection,
    config: &AppConfig,
    email: &str,
    raw_password: &str,
    remember: bool,
) -> Result<Session, AccountError> {
    let Some(user) = users::find_by_email(db, email).await? else {
        password::verify_absent(raw_password, config.bcrypt_cost);
        return Err(AccountError::InvalidCredentials);
    };
    if !password::verify(raw_password, &user.password_hash) {
        return Err(AccountError::InvalidCredentials);
    }
    if !user.activated {
        return Err(AccountError::AccountNotActivated);
    }
    start(db, config, &user, remember).await
}

/// Opens a session for a user already known to be active.
pub async fn start(
    db: &DatabaseConnection,
    config: &AppConfig,
    user: &user::Model,
    remember: bool,
) -> Result<Session, AccountError> {
    if !user.activated {
        return Err(AccountError::AccountNotActivated);
    }
    let now = Utc::now();
    let expires_at = now + lifetime(config, remember);
    let token = sign(config, user.id, expires_at)?;

    let row = session::ActiveModel {
        user_id: Set(user.id),
        token: Set(token.clone()),
        remember: Set(remember),
        expires_at: Set(expires_at),
        created: Set(Some(now)),
        ..Default::default()
    };
    row.insert(db).await?;

    info!("user {} logged in (remember={})", user.id, remember);
    Ok(Session {
        token,
        user_id: user.id,
        remember,
        expires_at,
    })
}

fn lifetime(config: &AppConfig, remember: bool) -> Duration {
    if remember {
        Duration::days(config.remember_ttl_days)
    } else {
        Duration::minutes(config.session_ttl_minutes)
    }
}

fn sign(config: &AppConfig, user_id: i32, expires_at: DateTime<Utc>) -> Result<String, AccountError> {
    let claims = Claims {
        login_id: user_id,
        device: DEVICE_WEB.to_string(),
        jti: token::generate()?,
        exp: expires_at.timestamp().max(0) as usize,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )
    .map_err(|e| {
        error!("session token encode failed: {}", e);
        AccountError::Internal(e.to_string())
    })
}

/// Revokes the session. Unknown or already revoked tokens are fine.
pub async fn logout(db: &DatabaseConnection, token: &str) -> Result<(), AccountError> {
    let res = session::Entity::delete_many()
        .filter(session::Column::Token.eq(token))
        .exec(db)
        .await?;
    debug!("logout removed {} session(s)", res.rows_affected);
    Ok(())
}

/// Maps a presented token back to the user it was issued for.
pub async fn resolve(
    db: &DatabaseConnection,
    config: &AppConfig,
    token: &str,
) -> Result<AuthUser, AccountError> {
    let key = DecodingKey::from_secret(config.jwt_secret.as_bytes());
    let validation = Validation::new(Algorithm::HS256);
    let claims = decode::<Claims>(token, &key, &validation)
        .map_err(|_| AccountError::NeedLogin)?
        .claims;

    let row = session::Entity::find()
        .filter(session::Column::Token.eq(token))
        .filter(session::Column::ExpiresAt.gt(Utc::now()))
        .one(db)
        .await?
        .ok_or(AccountError::NeedLogin)?;
    if row.user_id != claims.login_id {
        return Err(AccountError::NeedLogin);
    }

    Ok(AuthUser {
        user_id: row.user_id,
        token: token.to_string(),
    })
}

pub async fn purge_expired(db: &DatabaseConnection) -> Result<u64, AccountError> {
    let res = session::Entity::delete_many()
        .filter(session::Column::ExpiresAt.lte(Utc::now()))
        .exec(db)
        .await?;
    Ok(res.rows_affected)
}
