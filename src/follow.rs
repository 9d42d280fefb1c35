use std::collections::BTreeSet;

use chrono::Utc;
use log::debug;
use sea_orm::sea_query::{OnConflict, Query};
use sea_orm::{
    ColumnTrait, ConnectionTrait, DbErr, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use serde::Serialize;

use crate::entity::{follower, user};
use crate::error::AccountError;
use crate::users;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct FollowCounts {
    pub followers: u64,
    pub followings: u64,
}

/// Adds an edge from `acting_user_id` to every target not followed yet.
///
/// Edges already present are left alone and nothing is ever removed, so
/// repeating the call with the same targets changes nothing. Self-follows
/// and ids of users that do not exist are dropped. Returns how many edges
/// were created.
pub async fn follow<C, I>(db: &C, acting_user_id: i32, targets: I) -> Result<u64, AccountError>
where
    C: ConnectionTrait,
    I: IntoIterator<Item = i32>,
{
    let wanted: BTreeSet<i32> = targets
        .into_iter()
        .filter(|id| *id != acting_user_id)
        .collect();
    if wanted.is_empty() {
        return Ok(0);
    }
    users::require(db, acting_user_id).await?;

    let existing: Vec<i32> = user::Entity::find()
        .select_only()
        .column(user::Column::Id)
        .filter(user::Column::Id.is_in(wanted))
        .into_tuple()
        .all(db)
        .await?;
    if existing.is_empty() {
        return Ok(0);
    }

    let now = Utc::now();
    let edges = existing.into_iter().map(|followed_id| follower::ActiveModel {
        follower_id: Set(acting_user_id),
        followed_id: Set(followed_id),
        created: Set(Some(now)),
        ..Default::default()
    });
    let inserted = match follower::Entity::insert_many(edges)
        .on_conflict(
            OnConflict::columns([follower::Column::FollowerId, follower::Column::FollowedId])
                .do_nothing()
                .to_owned(),
        )
        .exec_without_returning(db)
        .await
    {
        Ok(n) => n,
        Err(DbErr::RecordNotInserted) => 0,
        Err(e) => return Err(e.into()),
    };

    debug!("user {} followed {} new user(s)", acting_user_id, inserted);
    Ok(inserted)
}

/// Removes the edges from `acting_user_id` to the targets. Missing edges
/// are ignored.
pub async fn unfollow<C, I>(db: &C, acting_user_id: i32, targets: I) -> Result<u64, AccountError>
where
    C: ConnectionTrait,
    I: IntoIterator<Item = i32>,
{
    let targets: BTreeSet<i32> = targets.into_iter().collect();
    if targets.is_empty() {
        return Ok(0);
    }
    let res = follower::Entity::delete_many()
        .filter(follower::Column::FollowerId.eq(acting_user_id))
        .filter(follower::Column::FollowedId.is_in(targets))
        .exec(db)
        .await?;

    debug!("user {} unfollowed {} user(s)", acting_user_id, res.rows_affected);
    Ok(res.rows_affected)
}

pub async fn is_following<C: ConnectionTrait>(
    db: &C,
    acting_user_id: i32,
    target_user_id: i32,
) -> Result<bool, AccountError> {
    if acting_user_id == target_user_id {
        return Ok(false);
    }
    let n = follower::Entity::find()
        .filter(follower::Column::FollowerId.eq(acting_user_id))
        .filter(follower::Column::FollowedId.eq(target_user_id))
        .count(db)
        .await?;
    Ok(n > 0)
}

/// Users following `user_id`.
pub async fn followers<C: ConnectionTrait>(db: &C, user_id: i32) -> Result<Vec<user::Model>, AccountError> {
    let ids = Query::select()
        .column(follower::Column::FollowerId)
        .from(follower::Entity)
        .and_where(follower::Column::FollowedId.eq(user_id))
        .to_owned();
    Ok(user::Entity::find()
        .filter(user::Column::Id.in_subquery(ids))
        .order_by_asc(user::Column::Id)
        .all(db)
        .await?)
}

/// Users `user_id` follows.
pub async fn followings<C: ConnectionTrait>(db: &C, user_id: i32) -> Result<Vec<user::Model>, AccountError> {
    let ids = Query::select()
        .column(follower::Column::FollowedId)
        .from(follower::Entity)
        .and_where(follower::Column::FollowerId.eq(user_id))
        .to_owned();
    Ok(user::Entity::find()
        .filter(user::Column::Id.in_subquery(ids))
        .order_by_asc(user::Column::Id)
        .all(db)
        .await?)
}

pub async fn following_ids<C: ConnectionTrait>(db: &C, user_id: i32) -> Result<Vec<i32>, AccountError> {
    Ok(follower::Entity::find()
        .select_only()
        .column(follower::Column::FollowedId)
        .filter(follower::Column::FollowerId.eq(user_id))
        .into_tuple()
        .all(db)
        .await?)
}

pub async fn counts<C: ConnectionTrait>(db: &C, user_id: i32) -> Result<FollowCounts, AccountError> {
    let followers = follower::Entity::find()
        .filter(follower::Column::FollowedId.eq(user_id))
        .count(db)
        .await?;
    let followings = follower::Entity::find()
        .filter(follower::Column::FollowerId.eq(user_id))
        .count(db)
        .await?;
    Ok(FollowCounts { followers, followings })
}
