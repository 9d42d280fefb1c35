use actix_web::{web, HttpResponse};
use chrono::SecondsFormat;
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};

use crate::auth::AuthUser;
use crate::entity::post;
use crate::error::AppError;
use crate::post_store;
use crate::response::ok;

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/save").route(web::post().to(save)));
}

#[derive(Deserialize)]
struct SavePostRequest {
    content: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostDto {
    pub id: i32,
    pub user_id: i32,
    pub content: String,
    pub created: String,
    pub author_name: Option<String>,
    pub author_avatar: Option<String>,
}

impl From<&post::Model> for PostDto {
    fn from(model: &post::Model) -> Self {
        Self {
            id: model.id,
            user_id: model.user_id,
            content: model.content.clone(),
            created: model.created.to_rfc3339_opts(SecondsFormat::Millis, false),
            author_name: None,
            author_avatar: None,
        }
    }
}

async fn save(
    db: web::Data<DatabaseConnection>,
    auth: AuthUser,
    payload: web::Json<SavePostRequest>,
) -> Result<HttpResponse, AppError> {
    let content = payload.content.clone().unwrap_or_default();
    let created = post_store::create(db.get_ref(), auth.user_id, &content).await?;
    Ok(ok(PostDto::from(&created)))
}
