use actix_web::{web, HttpResponse};
use log::{error, info};
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};

use crate::activation::{self, Registration};
use crate::auth::{AuthUser, OptionalAuthUser};
use crate::config::AppConfig;
use crate::entity::user;
use crate::error::AppError;
use crate::follow::{self, FollowCounts};
use crate::mailer::Mailer;
use crate::password;
use crate::response::{ok, ok_empty};
use crate::routes::session::LoginResponse;
use crate::session;
use crate::users::{self, UserDto, UserUpdate};

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/register").route(web::post().to(register)))
        .service(web::resource("/activate/{token}").route(web::post().to(activate)))
        .service(web::resource("/activation/resend").route(web::post().to(resend_activation)))
        .service(web::resource("/{id:\\d+}").route(web::post().to(show)))
        .service(web::resource("/{id:\\d+}/update").route(web::post().to(update)))
        .service(web::resource("/{id:\\d+}/destroy").route(web::post().to(destroy)))
        .service(web::resource("/{id:\\d+}/followers").route(web::post().to(followers)))
        .service(web::resource("/{id:\\d+}/followings").route(web::post().to(followings)));
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RegisterRequest {
    name: Option<String>,
    email: Option<String>,
    password: Option<String>,
    password_confirmation: Option<String>,
}

#[derive(Deserialize)]
struct ResendRequest {
    email: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateUserRequest {
    name: Option<String>,
    password: Option<String>,
    password_confirmation: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ProfileDto {
    user: UserDto,
    counts: FollowCounts,
    following: bool,
}

async fn register(
    db: web::Data<DatabaseConnection>,
    config: web::Data<AppConfig>,
    mailer: web::Data<dyn Mailer>,
    payload: web::Json<RegisterRequest>,
) -> Result<HttpResponse, AppError> {
    let registration = Registration {
        name: payload.name.clone().unwrap_or_default(),
        email: payload.email.clone().unwrap_or_default(),
        password: payload.password.clone().unwrap_or_default(),
        password_confirmation: payload.password_confirmation.clone().unwrap_or_default(),
    };
    registration.validate()?;

    let password_hash = password::hash(&registration.password, config.bcrypt_cost)?;
    let created = activation::register_pending(
        db.get_ref(),
        &registration.name,
        &registration.email,
        password_hash,
    )
    .await?;

    send_activation_async(mailer, config, created.clone());
    Ok(ok(UserDto::from(&created)))
}

// Registration already succeeded; a failed mail is only logged.
fn send_activation_async(mailer: web::Data<dyn Mailer>, config: web::Data<AppConfig>, user: user::Model) {
    actix_rt::spawn(async move {
        if let Err(e) = activation::request_activation_email(mailer.get_ref(), &config, &user).await {
            error!("activation mail for user {} failed: {}", user.id, e);
        }
    });
}

async fn activate(
    db: web::Data<DatabaseConnection>,
    config: web::Data<AppConfig>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let activated = activation::redeem_token(db.get_ref(), &path).await?;
    let started = session::start(db.get_ref(), &config, &activated, false).await?;
    Ok(ok(LoginResponse::new(&activated, started, None)))
}

async fn resend_activation(
    db: web::Data<DatabaseConnection>,
    config: web::Data<AppConfig>,
    mailer: web::Data<dyn Mailer>,
    payload: web::Json<ResendRequest>,
) -> Result<HttpResponse, AppError> {
    let email = payload.email.clone().unwrap_or_default();
    if email.trim().is_empty() {
        return Err(AppError::param_error("email is required"));
    }
    // Same answer whether or not the address is registered.
    if let Some(found) = users::find_by_email(db.get_ref(), &email).await? {
        if found.is_pending() {
            activation::request_activation_email(mailer.get_ref(), &config, &found).await?;
        }
    }
    Ok(ok_empty())
}

async fn show(
    db: web::Data<DatabaseConnection>,
    auth: OptionalAuthUser,
    path: web::Path<i32>,
) -> Result<HttpResponse, AppError> {
    let target = users::require(db.get_ref(), *path).await?;
    let counts = follow::counts(db.get_ref(), target.id).await?;
    let following = match auth.0 {
        Some(viewer) => follow::is_following(db.get_ref(), viewer.user_id, target.id).await?,
        None => false,
    };
    Ok(ok(ProfileDto {
        user: UserDto::from(&target),
        counts,
        following,
    }))
}

async fn update(
    db: web::Data<DatabaseConnection>,
    config: web::Data<AppConfig>,
    auth: AuthUser,
    path: web::Path<i32>,
    payload: web::Json<UpdateUserRequest>,
) -> Result<HttpResponse, AppError> {
    let mut update = UserUpdate {
        name: payload.name.clone(),
        password_hash: None,
    };
    if let Some(raw) = payload.password.clone().filter(|p| !p.is_empty()) {
        let confirmation = payload.password_confirmation.clone().unwrap_or_default();
        activation::validate_password(&raw, &confirmation)?;
        update.password_hash = Some(password::hash(&raw, config.bcrypt_cost)?);
    }

    let updated = users::update_profile(db.get_ref(), auth.user_id, *path, update).await?;
    info!("user {} updated profile", updated.id);
    Ok(ok(UserDto::from(&updated)))
}

async fn destroy(
    db: web::Data<DatabaseConnection>,
    auth: AuthUser,
    path: web::Path<i32>,
) -> Result<HttpResponse, AppError> {
    users::destroy(db.get_ref(), auth.user_id, *path).await?;
    Ok(ok_empty())
}

async fn followers(
    db: web::Data<DatabaseConnection>,
    path: web::Path<i32>,
) -> Result<HttpResponse, AppError> {
    let target = users::require(db.get_ref(), *path).await?;
    let list = follow::followers(db.get_ref(), target.id).await?;
    Ok(ok(list.iter().map(UserDto::from).collect::<Vec<_>>()))
}

async fn followings(
    db: web::Data<DatabaseConnection>,
    path: web::Path<i32>,
) -> Result<HttpResponse, AppError> {
    let target = users::require(db.get_ref(), *path).await?;
    let list = follow::followings(db.get_ref(), target.id).await?;
    Ok(ok(list.iter().map(UserDto::from).collect::<Vec<_>>()))
}
