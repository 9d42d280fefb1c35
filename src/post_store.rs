//! Posts as seen by the account side: created by their owner, read back by
//! owner set for feeds, removed when the owner is deleted.

use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Select, Set,
};

use crate::entity::post;
use crate::error::AccountError;

pub const CONTENT_MAX_CHARS: usize = 140;
pub const DEFAULT_PAGE_SIZE: u64 = 20;
pub const MAX_PAGE_SIZE: u64 = 100;

/// A numbered page, starting at 1. Built through [`PageRequest::new`] so
/// the size is always within `1..=MAX_PAGE_SIZE`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PageRequest {
    page: u64,
    size: u64,
}

impl PageRequest {
    pub fn new(page: Option<u64>, size: Option<u64>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            size: size.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE),
        }
    }

    pub fn page(&self) -> u64 {
        self.page
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    /// Rows to skip. Pages past the end saturate instead of overflowing and
    /// stay within what the database accepts as an offset.
    pub fn offset(&self) -> u64 {
        (self.page - 1)
            .saturating_mul(self.size)
            .min(i64::MAX as u64)
    }

    pub fn total_pages(&self, total: u64) -> u64 {
        total.div_ceil(self.size)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(None, None)
    }
}

/// Position after the last post of a page, in feed order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FeedCursor {
    pub created: DateTime<Utc>,
    pub id: i32,
}

impl From<&post::Model> for FeedCursor {
    fn from(p: &post::Model) -> Self {
        Self {
            created: p.created,
            id: p.id,
        }
    }
}

pub async fn create<C: ConnectionTrait>(db: &C, owner_id: i32, content: &str) -> Result<post::Model, AccountError> {
    create_at(db, owner_id, content, Utc::now()).await
}

pub async fn create_at<C: ConnectionTrait>(
    db: &C,
    owner_id: i32,
    content: &str,
    created: DateTime<Utc>,
) -> Result<post::Model, AccountError> {
    let content = content.trim();
    if content.is_empty() {
        return Err(AccountError::validation("content is required"));
    }
    if content.chars().count() > CONTENT_MAX_CHARS {
        return Err(AccountError::validation(format!(
            "content may not be greater than {} characters",
            CONTENT_MAX_CHARS
        )));
    }
    let model = post::ActiveModel {
        user_id: Set(owner_id),
        content: Set(content.to_string()),
        created: Set(created),
        ..Default::default()
    };
    Ok(model.insert(db).await?)
}

// Newest first; the id breaks ties between equal timestamps.
fn by_owners(owner_ids: &[i32]) -> Select<post::Entity> {
    post::Entity::find()
        .filter(post::Column::UserId.is_in(owner_ids.iter().copied()))
        .order_by_desc(post::Column::Created)
        .order_by_desc(post::Column::Id)
}

pub async fn posts_by_owners<C: ConnectionTrait>(
    db: &C,
    owner_ids: &[i32],
    page: PageRequest,
) -> Result<Vec<post::Model>, AccountError> {
    if owner_ids.is_empty() {
        return Ok(Vec::new());
    }
    Ok(by_owners(owner_ids)
        .offset(page.offset())
        .limit(page.size())
        .all(db)
        .await?)
}

/// Up to `limit` posts strictly after `cursor` in feed order, or from the
/// newest post when there is no cursor.
pub async fn posts_by_owners_before<C: ConnectionTrait>(
    db: &C,
    owner_ids: &[i32],
    cursor: Option<FeedCursor>,
    limit: u64,
) -> Result<Vec<post::Model>, AccountError> {
    if owner_ids.is_empty() || limit == 0 {
        return Ok(Vec::new());
    }
    let mut query = by_owners(owner_ids);
    if let Some(c) = cursor {
        query = query.filter(
            Condition::any()
                .add(post::Column::Created.lt(c.created))
                .add(
                    Condition::all()
                        .add(post::Column::Created.eq(c.created))
                        .add(post::Column::Id.lt(c.id)),
                ),
        );
    }
    Ok(query.limit(limit).all(db).await?)
}

pub async fn count_by_owners<C: ConnectionTrait>(db: &C, owner_ids: &[i32]) -> Result<u64, AccountError> {
    if owner_ids.is_empty() {
        return Ok(0);
    }
    Ok(post::Entity::find()
        .filter(post::Column::UserId.is_in(owner_ids.iter().copied()))
        .count(db)
        .await?)
}

pub async fn delete_by_owner<C: ConnectionTrait>(db: &C, owner_id: i32) -> Result<u64, AccountError> {
    let res = post::Entity::delete_many()
        .filter(post::Column::UserId.eq(owner_id))
        .exec(db)
        .await?;
    Ok(res.rows_affected)
}
