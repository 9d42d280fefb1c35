use chrono::{SecondsFormat, Utc};
use log::{info, warn};
use md5::{Digest, Md5};
use once_cell::sync::Lazy;
use regex::Regex;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, EntityTrait,
    QueryFilter, Set, TransactionTrait,
};
use serde::Serialize;

use crate::entity::{follower, session, user};
use crate::error::AccountError;
use crate::policy::UserPolicy;
use crate::post_store;

pub const NAME_MAX_CHARS: usize = 50;
pub const EMAIL_MAX_CHARS: usize = 255;

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email pattern"));

/// Outward view of a user. Never carries the password hash or the
/// activation token.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDto {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub avatar: String,
    pub activated: bool,
    pub created: Option<String>,
}

impl From<&user::Model> for UserDto {
    fn from(model: &user::Model) -> Self {
        Self {
            id: model.id,
            name: model.name.clone(),
            email: model.email.clone(),
            avatar: gravatar(&model.email, 100),
            activated: model.activated,
            created: model
                .created
                .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Millis, false)),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct UserUpdate {
    pub name: Option<String>,
    pub password_hash: Option<String>,
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub fn validate_name(name: &str) -> Result<String, AccountError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AccountError::validation("name is required"));
    }
    if name.chars().count() > NAME_MAX_CHARS {
        return Err(AccountError::validation(format!(
            "name may not be greater than {} characters",
            NAME_MAX_CHARS
        )));
    }
    Ok(name.to_string())
}

/// Returns the normalized address on success.
pub fn validate_email(email: &str) -> Result<String, AccountError> {
    let email = normalize_email(email);
    if email.is_empty() {
        return Err(AccountError::validation("email is required"));
    }
    if email.chars().count() > EMAIL_MAX_CHARS {
        return Err(AccountError::validation(format!(
            "email may not be greater than {} characters",
            EMAIL_MAX_CHARS
        )));
    }
    if !EMAIL_RE.is_match(&email) {
        return Err(AccountError::validation("email must be a valid email address"));
    }
    Ok(email)
}

pub fn gravatar(email: &str, size: u32) -> String {
    let hash = Md5::digest(normalize_email(email).as_bytes());
    format!("https://www.gravatar.com/avatar/{:x}?s={}", hash, size)
}

pub async fn find_by_id<C: ConnectionTrait>(db: &C, id: i32) -> Result<Option<user::Model>, AccountError> {
    Ok(user::Entity::find_by_id(id).one(db).await?)
}

pub async fn require<C: ConnectionTrait>(db: &C, id: i32) -> Result<user::Model, AccountError> {
    find_by_id(db, id).await?.ok_or(AccountError::UserNotFound)
}

pub async fn find_by_email<C: ConnectionTrait>(
    db: &C,
    email: &str,
) -> Result<Option<user::Model>, AccountError> {
    Ok(user::Entity::find()
        .filter(user::Column::Email.eq(normalize_email(email)))
        .one(db)
        .await?)
}

pub async fn update_profile(
    db: &DatabaseConnection,
    acting_user_id: i32,
    target_id: i32,
    update: UserUpdate,
) -> Result<user::Model, AccountError> {
    let target = require(db, target_id).await?;
    if let Err(e) = UserPolicy::can_update(acting_user_id, &target).authorize() {
        warn!("user {} denied update of user {}", acting_user_id, target_id);
        return Err(e);
    }

    let name = update.name.as_deref().map(validate_name).transpose()?;
    let mut active: user::ActiveModel = target.into();
    if let Some(name) = name {
        active.name = Set(name);
    }
    if let Some(hash) = update.password_hash {
        active.password_hash = Set(hash);
    }
    active.updated = Set(Some(Utc::now()));
    Ok(active.update(db).await?)
}

/// Deletes the account together with its follow edges (both directions),
/// posts and sessions in one transaction.
pub async fn destroy(
    db: &DatabaseConnection,
    acting_user_id: i32,
    target_id: i32,
) -> Result<(), AccountError> {
    let target = require(db, target_id).await?;
    if let Err(e) = UserPolicy::can_destroy(acting_user_id, &target).authorize() {
        warn!("user {} denied deletion of user {}", acting_user_id, target_id);
        return Err(e);
    }

    db.transaction::<_, (), AccountError>(|txn| {
        Box::pin(async move {
            follower::Entity::delete_many()
                .filter(
                    Condition::any()
                        .add(follower::Column::FollowerId.eq(target_id))
                        .add(follower::Column::FollowedId.eq(target_id)),
                )
                .exec(txn)
                .await?;
            post_store::delete_by_owner(txn, target_id).await?;
            session::Entity::delete_many()
                .filter(session::Column::UserId.eq(target_id))
                .exec(txn)
                .await?;
            let res = user::Entity::delete_by_id(target_id).exec(txn).await?;
            if res.rows_affected == 0 {
                return Err(AccountError::UserNotFound);
            }
            Ok(())
        })
    })
    .await?;

    info!("user {} deleted", target_id);
    Ok(())
}
