use actix_web::{web, HttpResponse};
use chrono::SecondsFormat;
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};

use crate::auth::AuthUser;
use crate::config::AppConfig;
use crate::entity::user;
use crate::error::AppError;
use crate::response::{ok, ok_empty};
use crate::session::{self, Session};
use crate::users;

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/login").route(web::post().to(login)))
        .service(web::resource("/logout").route(web::post().to(logout)));
}

#[derive(Deserialize)]
struct LoginRequest {
    email: Option<String>,
    password: Option<String>,
    remember: Option<bool>,
    intended: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    token: String,
    user_id: i32,
    name: String,
    remember: bool,
    expires_at: String,
    redirect_to: String,
}

impl LoginResponse {
    pub fn new(user: &user::Model, session: Session, intended: Option<String>) -> Self {
        Self {
            token: session.token,
            user_id: user.id,
            name: user.name.clone(),
            remember: session.remember,
            expires_at: session.expires_at.to_rfc3339_opts(SecondsFormat::Secs, true),
            redirect_to: redirect_target(user.id, intended),
        }
    }
}

/// The page the user originally asked for, or their own profile. Only
/// same-site paths are honoured.
fn redirect_target(user_id: i32, intended: Option<String>) -> String {
    intended
        .filter(|p| p.starts_with('/') && !p.starts_with("//"))
        .unwrap_or_else(|| format!("/users/{}", user_id))
}

async fn login(
    db: web::Data<DatabaseConnection>,
    config: web::Data<AppConfig>,
    payload: web::Json<LoginRequest>,
) -> Result<HttpResponse, AppError> {
    let email = payload.email.clone().unwrap_or_default();
    let password = payload.password.clone().unwrap_or_default();
    if email.trim().is_empty() {
        return Err(AppError::param_error("email is required"));
    }
    if password.is_empty() {
        return Err(AppError::param_error("password is required"));
    }

    let remember = payload.remember.unwrap_or(false);
    let started = session::authenticate(db.get_ref(), &config, &email, &password, remember).await?;
    let user = users::require(db.get_ref(), started.user_id).await?;
    Ok(ok(LoginResponse::new(&user, started, payload.intended.clone())))
}

async fn logout(
    db: web::Data<DatabaseConnection>,
    auth: AuthUser,
) -> Result<HttpResponse, AppError> {
    session::logout(db.get_ref(), &auth.token).await?;
    Ok(ok_empty())
}
