//! Pending → active account lifecycle.
//!
//! A user is created pending with a fresh activation token, the token is
//! mailed out, and redeeming it flips the account to active exactly once.

use askama::Template;
use chrono::Utc;
use log::{debug, error, info};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, Set, SqlErr,
};

use crate::config::AppConfig;
use crate::entity::user;
use crate::error::AccountError;
use crate::mailer::{MailMessage, Mailer};
use crate::token;
use crate::users::{self, validate_email, validate_name};

pub const PASSWORD_MIN_CHARS: usize = 6;

pub const ACTIVATION_SUBJECT: &str = "Thanks for registering, please confirm your email";

#[derive(Template)]
#[template(path = "mail/activation.html")]
struct ActivationMail<'a> {
    name: &'a str,
    url: &'a str,
}

/// Raw sign-up form input.
#[derive(Clone, Debug)]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub password: String,
    pub password_confirmation: String,
}

impl Registration {
    pub fn validate(&self) -> Result<(), AccountError> {
        validate_name(&self.name)?;
        validate_email(&self.email)?;
        validate_password(&self.password, &self.password_confirmation)
    }
}

/// Length and confirmation rules shared by sign-up, profile edits and
/// password resets.
pub fn validate_password(password: &str, confirmation: &str) -> Result<(), AccountError> {
    if password.is_empty() {
        return Err(AccountError::validation("password is required"));
    }
    if password.chars().count() < PASSWORD_MIN_CHARS {
        return Err(AccountError::validation(format!(
            "password must be at least {} characters",
            PASSWORD_MIN_CHARS
        )));
    }
    if password != confirmation {
        return Err(AccountError::validation("password confirmation does not match"));
    }
    Ok(())
}

/// Creates a pending user holding a freshly generated activation token.
///
/// The unique index on `email` decides duplicates, so two racing sign-ups
/// with the same address end with one row and one [`AccountError::DuplicateEmail`].
pub async fn register_pending(
    db: &DatabaseConnection,
    name: &str,
    email: &str,
    password_hash: String,
) -> Result<user::Model, AccountError> {
    let name = validate_name(name)?;
    let email = validate_email(email)?;
    let activation_token = token::generate()?;

    let now = Utc::now();
    let model = user::ActiveModel {
        name: Set(name),
        email: Set(email.clone()),
        password_hash: Set(password_hash),
        activated: Set(false),
        activation_token: Set(Some(activation_token)),
        reset_token: Set(None),
        reset_sent_at: Set(None),
        created: Set(Some(now)),
        updated: Set(Some(now)),
        ..Default::default()
    };
    let created = match model.insert(db).await {
        Ok(created) => created,
        Err(err) if is_unique_violation(&err) => {
            if users::find_by_email(db, &email).await?.is_some() {
                return Err(AccountError::DuplicateEmail);
            }
            return Err(AccountError::Storage(err));
        }
        Err(err) => return Err(err.into()),
    };

    info!("user {} registered, pending activation", created.id);
    Ok(created)
}

fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

/// Hands the activation mail for a pending user to the mailer. Nothing is
/// sent for an account that is already active.
pub async fn request_activation_email(
    mailer: &dyn Mailer,
    config: &AppConfig,
    user: &user::Model,
) -> Result<(), AccountError> {
    let Some(token) = user.activation_token.as_deref() else {
        debug!("user {} already active, no activation mail", user.id);
        return Ok(());
    };
    let message = activation_message(config, user, token)?;
    mailer.send(&message).await?;
    info!("activation mail sent to user {}", user.id);
    Ok(())
}

pub fn activation_message(
    config: &AppConfig,
    user: &user::Model,
    token: &str,
) -> Result<MailMessage, AccountError> {
    let url = config.activation_url(token);
    let body = ActivationMail {
        name: &user.name,
        url: &url,
    }
    .render()
    .map_err(|e| {
        error!("activation mail render failed: {}", e);
        AccountError::Internal(e.to_string())
    })?;
    Ok(MailMessage {
        to: user.email.clone(),
        subject: ACTIVATION_SUBJECT.to_string(),
        body,
    })
}

/// Activates the account holding `token` and clears the token.
///
/// Each statement commits on its own. The update only matches while the
/// token is still in place, so when callers race on the same token exactly
/// one of them wins and the rest see [`AccountError::TokenNotFound`].
pub async fn redeem_token(db: &DatabaseConnection, token: &str) -> Result<user::Model, AccountError> {
    if token.is_empty() {
        return Err(AccountError::TokenNotFound);
    }

    let found = user::Entity::find()
        .filter(user::Column::ActivationToken.eq(token))
        .one(db)
        .await?
        .ok_or(AccountError::TokenNotFound)?;

    let now = Utc::now();
    let res = user::Entity::update_many()
        .col_expr(user::Column::Activated, Expr::value(true))
        .col_expr(user::Column::ActivationToken, Expr::value(Option::<String>::None))
        .col_expr(user::Column::Updated, Expr::value(now))
        .filter(user::Column::Id.eq(found.id))
        .filter(user::Column::ActivationToken.eq(token))
        .filter(user::Column::Activated.eq(false))
        .exec(db)
        .await?;
    if res.rows_affected == 0 {
        return Err(AccountError::TokenNotFound);
    }

    info!("user {} activated", found.id);
    Ok(user::Model {
        activated: true,
        activation_token: None,
        updated: Some(now),
        ..found
    })
}
