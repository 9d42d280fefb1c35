//! Forgotten-password flow.
//!
//! A reset request stores a fresh single-use token on the account and mails
//! a link carrying it. Redeeming the token within its lifetime replaces the
//! password hash, clears the token and ends every open session.

use askama::Template;
use chrono::{Duration, Utc};
use log::{debug, error, info};
use sea_orm::sea_query::Expr;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};

use crate::config::AppConfig;
use crate::entity::{session, user};
use crate::error::AccountError;
use crate::mailer::{MailMessage, Mailer};
use crate::{token, users};

pub const RESET_SUBJECT: &str = "Reset your password";

#[derive(Template)]
#[template(path = "mail/password_reset.html")]
struct ResetMail<'a> {
    name: &'a str,
    url: &'a str,
    ttl_minutes: i64,
}

/// Stores a new reset token on the account registered under `email`,
/// replacing any earlier one. Returns `None` when no account matches.
pub async fn issue_reset_token(
    db: &DatabaseConnection,
    email: &str,
) -> Result<Option<user::Model>, AccountError> {
    let Some(found) = users::find_by_email(db, email).await? else {
        debug!("password reset requested for unknown address");
        return Ok(None);
    };

    let mut active: user::ActiveModel = found.into();
    active.reset_token = Set(Some(token::generate()?));
    active.reset_sent_at = Set(Some(Utc::now()));
    let updated = active.update(db).await?;

    info!("password reset token issued for user {}", updated.id);
    Ok(Some(updated))
}

/// Mails the reset link. Nothing is sent when the account holds no token.
pub async fn send_reset_email(
    mailer: &dyn Mailer,
    config: &AppConfig,
    user: &user::Model,
) -> Result<(), AccountError> {
    let Some(token) = user.reset_token.as_deref() else {
        debug!("user {} has no reset token, no mail", user.id);
        return Ok(());
    };
    let message = reset_message(config, user, token)?;
    mailer.send(&message).await?;
    info!("password reset mail sent to user {}", user.id);
    Ok(())
}

pub fn reset_message(config: &AppConfig, user: &user::Model, token: &str) -> Result<MailMessage, AccountError> {
    let url = config.reset_url(token);
    let body = ResetMail {
        name: &user.name,
        url: &url,
        ttl_minutes: config.reset_ttl_minutes,
    }
    .render()
    .map_err(|e| {
        error!("reset mail render failed: {}", e);
        AccountError::Internal(e.to_string())
    })?;
    Ok(MailMessage {
        to: user.email.clone(),
        subject: RESET_SUBJECT.to_string(),
        body,
    })
}

/// Sets a new password for the account holding `token`.
///
/// Unknown and already used tokens yield [`AccountError::TokenNotFound`];
/// tokens older than `reset_ttl_minutes` yield [`AccountError::TokenExpired`].
/// Like activation, the update only matches while the token is still in
/// place, so one of several racing callers wins.
pub async fn reset_password(
    db: &DatabaseConnection,
    config: &AppConfig,
    token: &str,
    password_hash: String,
) -> Result<user::Model, AccountError> {
    if token.is_empty() {
        return Err(AccountError::TokenNotFound);
    }

    let found = user::Entity::find()
        .filter(user::Column::ResetToken.eq(token))
        .one(db)
        .await?
        .ok_or(AccountError::TokenNotFound)?;

    let now = Utc::now();
    let ttl = Duration::minutes(config.reset_ttl_minutes);
    match found.reset_sent_at {
        Some(sent) if sent + ttl > now => {}
        _ => return Err(AccountError::TokenExpired),
    }

    let res = user::Entity::update_many()
        .col_expr(user::Column::PasswordHash, Expr::value(password_hash.clone()))
        .col_expr(user::Column::ResetToken, Expr::value(Option::<String>::None))
        .col_expr(
            user::Column::ResetSentAt,
            Expr::value(Option::<chrono::DateTime<Utc>>::None),
        )
        .col_expr(user::Column::Updated, Expr::value(now))
        .filter(user::Column::Id.eq(found.id))
        .filter(user::Column::ResetToken.eq(token))
        .exec(db)
        .await?;
    if res.rows_affected == 0 {
        return Err(AccountError::TokenNotFound);
    }

    let revoked = session::Entity::delete_many()
        .filter(session::Column::UserId.eq(found.id))
        .exec(db)
        .await?;
    info!(
        "user {} reset password, {} session(s) revoked",
        found.id, revoked.rows_affected
    );

    Ok(user::Model {
        password_hash,
        reset_token: None,
        reset_sent_at: None,
        updated: Some(now),
        ..found
    })
}
