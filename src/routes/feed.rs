use std::collections::HashMap;

use actix_web::{web, HttpResponse};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use serde::{Deserialize, Serialize};

use crate::auth::AuthUser;
use crate::entity::user;
use crate::error::{AccountError, AppError};
use crate::feed;
use crate::post_store::PageRequest;
use crate::response::ok;
use crate::routes::post::PostDto;
use crate::users;

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("").route(web::post().to(list)));
}

#[derive(Deserialize, Default)]
struct FeedRequest {
    page: Option<u64>,
    size: Option<u64>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FeedResponse {
    items: Vec<PostDto>,
    total: u64,
    total_page: u64,
}

async fn list(
    db: web::Data<DatabaseConnection>,
    auth: AuthUser,
    payload: Option<web::Json<FeedRequest>>,
) -> Result<HttpResponse, AppError> {
    let payload = payload.map(|p| p.into_inner()).unwrap_or_default();
    let page = PageRequest::new(payload.page, payload.size);

    let viewer_feed = feed::feed_for(db.get_ref(), auth.user_id, page.size()).await?;
    let result = viewer_feed.page(db.get_ref(), page).await?;

    let mut owner_ids: Vec<i32> = result.items.iter().map(|p| p.user_id).collect();
    owner_ids.sort_unstable();
    owner_ids.dedup();
    let authors: HashMap<i32, user::Model> = user::Entity::find()
        .filter(user::Column::Id.is_in(owner_ids))
        .all(db.get_ref())
        .await
        .map_err(AccountError::from)?
        .into_iter()
        .map(|u| (u.id, u))
        .collect();

    let items = result
        .items
        .iter()
        .map(|p| {
            let mut dto = PostDto::from(p);
            if let Some(author) = authors.get(&p.user_id) {
                dto.author_name = Some(author.name.clone());
                dto.author_avatar = Some(users::gravatar(&author.email, 48));
            }
            dto
        })
        .collect();

    Ok(ok(FeedResponse {
        items,
        total: result.total,
        total_page: result.total_page,
    }))
}
