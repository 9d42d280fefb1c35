use actix_web::{web, HttpResponse};
use sea_orm::DatabaseConnection;
use serde::Deserialize;

use crate::activation;
use crate::config::AppConfig;
use crate::error::AppError;
use crate::mailer::Mailer;
use crate::password;
use crate::password_reset;
use crate::response::ok_empty;

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/forgot").route(web::post().to(forgot)))
        .service(web::resource("/reset").route(web::post().to(reset)));
}

#[derive(Deserialize)]
struct ForgotRequest {
    email: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResetRequest {
    token: Option<String>,
    password: Option<String>,
    password_confirmation: Option<String>,
}

async fn forgot(
    db: web::Data<DatabaseConnection>,
    config: web::Data<AppConfig>,
    mailer: web::Data<dyn Mailer>,
    payload: web::Json<ForgotRequest>,
) -> Result<HttpResponse, AppError> {
    let email = payload.email.clone().unwrap_or_default();
    if email.trim().is_empty() {
        return Err(AppError::param_error("email is required"));
    }
    // Same answer whether or not the address is registered.
    if let Some(found) = password_reset::issue_reset_token(db.get_ref(), &email).await? {
        password_reset::send_reset_email(mailer.get_ref(), &config, &found).await?;
    }
    Ok(ok_empty())
}

async fn reset(
    db: web::Data<DatabaseConnection>,
    config: web::Data<AppConfig>,
    payload: web::Json<ResetRequest>,
) -> Result<HttpResponse, AppError> {
    let token = payload.token.clone().unwrap_or_default();
    if token.is_empty() {
        return Err(AppError::param_error("token is required"));
    }
    let raw = payload.password.clone().unwrap_or_default();
    let confirmation = payload.password_confirmation.clone().unwrap_or_default();
    activation::validate_password(&raw, &confirmation)?;

    let password_hash = password::hash(&raw, config.bcrypt_cost)?;
    password_reset::reset_password(db.get_ref(), &config, &token, password_hash).await?;
    Ok(ok_empty())
}
