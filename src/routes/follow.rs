use actix_web::{web, HttpResponse};
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};

use crate::auth::AuthUser;
use crate::error::AppError;
use crate::follow::{self, FollowCounts};
use crate::response::ok;

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/add").route(web::post().to(add)))
        .service(web::resource("/remove").route(web::post().to(remove)))
        .service(web::resource("/check/{id:\\d+}").route(web::post().to(check)));
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct FollowRequest {
    user_ids: Option<Vec<i32>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FollowResult {
    changed: u64,
    counts: FollowCounts,
}

fn target_ids(payload: &FollowRequest) -> Result<Vec<i32>, AppError> {
    match payload.user_ids.clone() {
        Some(ids) if !ids.is_empty() => Ok(ids),
        _ => Err(AppError::param_error("userIds cannot be empty")),
    }
}

async fn add(
    db: web::Data<DatabaseConnection>,
    auth: AuthUser,
    payload: web::Json<FollowRequest>,
) -> Result<HttpResponse, AppError> {
    let ids = target_ids(&payload)?;
    let changed = follow::follow(db.get_ref(), auth.user_id, ids).await?;
    let counts = follow::counts(db.get_ref(), auth.user_id).await?;
    Ok(ok(FollowResult { changed, counts }))
}

async fn remove(
    db: web::Data<DatabaseConnection>,
    auth: AuthUser,
    payload: web::Json<FollowRequest>,
) -> Result<HttpResponse, AppError> {
    let ids = target_ids(&payload)?;
    let changed = follow::unfollow(db.get_ref(), auth.user_id, ids).await?;
    let counts = follow::counts(db.get_ref(), auth.user_id).await?;
    Ok(ok(FollowResult { changed, counts }))
}

async fn check(
    db: web::Data<DatabaseConnection>,
    auth: AuthUser,
    path: web::Path<i32>,
) -> Result<HttpResponse, AppError> {
    let following = follow::is_following(db.get_ref(), auth.user_id, *path).await?;
    Ok(ok(following))
}
