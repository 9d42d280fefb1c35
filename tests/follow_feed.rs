mod common;

use chrono::{Duration, TimeZone, Utc};
use sea_orm::{EntityTrait, PaginatorTrait};

use weibo_backend::entity::{follower, post};
use weibo_backend::error::AccountError;
use weibo_backend::post_store::{self, PageRequest};
use weibo_backend::users::{self, UserUpdate};
use weibo_backend::{feed, follow, session};

use common::{register_active, setup_db, test_config, PASSWORD};

fn at(seconds: i64) -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::seconds(seconds)
}

fn ids(users: &[weibo_backend::entity::user::Model]) -> Vec<i32> {
    users.iter().map(|u| u.id).collect()
}

#[actix_web::test]
async fn follow_is_idempotent() {
    let db = setup_db().await;
    let ada = register_active(&db, "Ada", "ada@example.com").await;
    let bob = register_active(&db, "Bob", "bob@example.com").await;

    assert_eq!(follow::follow(&db, ada.id, [bob.id]).await.unwrap(), 1);
    assert_eq!(follow::follow(&db, ada.id, [bob.id]).await.unwrap(), 0);

    assert_eq!(follower::Entity::find().count(&db).await.unwrap(), 1);
    assert!(follow::is_following(&db, ada.id, bob.id).await.unwrap());
    assert!(!follow::is_following(&db, bob.id, ada.id).await.unwrap());

    follow::unfollow(&db, ada.id, [bob.id]).await.unwrap();
    assert!(!follow::is_following(&db, ada.id, bob.id).await.unwrap());
}

#[actix_web::test]
async fn follow_adds_without_removing() {
    let db = setup_db().await;
    let ada = register_active(&db, "Ada", "ada@example.com").await;
    let bob = register_active(&db, "Bob", "bob@example.com").await;
    let cat = register_active(&db, "Cat", "cat@example.com").await;

    follow::follow(&db, ada.id, [bob.id]).await.unwrap();
    follow::follow(&db, ada.id, [cat.id]).await.unwrap();

    let followings = follow::followings(&db, ada.id).await.unwrap();
    assert_eq!(ids(&followings), vec![bob.id, cat.id]);
}

#[actix_web::test]
async fn self_follow_is_dropped() {
    let db = setup_db().await;
    let ada = register_active(&db, "Ada", "ada@example.com").await;
    let bob = register_active(&db, "Bob", "bob@example.com").await;

    assert_eq!(follow::follow(&db, ada.id, [ada.id]).await.unwrap(), 0);
    assert!(!follow::is_following(&db, ada.id, ada.id).await.unwrap());

    assert_eq!(follow::follow(&db, ada.id, [ada.id, bob.id]).await.unwrap(), 1);
    assert_eq!(ids(&follow::followings(&db, ada.id).await.unwrap()), vec![bob.id]);
}

#[actix_web::test]
async fn unknown_targets_are_ignored() {
    let db = setup_db().await;
    let ada = register_active(&db, "Ada", "ada@example.com").await;

    assert_eq!(follow::follow(&db, ada.id, [9999]).await.unwrap(), 0);
    assert_eq!(follower::Entity::find().count(&db).await.unwrap(), 0);
}

#[actix_web::test]
async fn unfollow_of_missing_edge_is_a_no_op() {
    let db = setup_db().await;
    let ada = register_active(&db, "Ada", "ada@example.com").await;
    let bob = register_active(&db, "Bob", "bob@example.com").await;

    assert_eq!(follow::unfollow(&db, ada.id, [bob.id]).await.unwrap(), 0);
    assert_eq!(follow::unfollow(&db, ada.id, Vec::new()).await.unwrap(), 0);
}

#[actix_web::test]
async fn followers_and_followings_are_mirrored() {
    let db = setup_db().await;
    let ada = register_active(&db, "Ada", "ada@example.com").await;
    let bob = register_active(&db, "Bob", "bob@example.com").await;
    let cat = register_active(&db, "Cat", "cat@example.com").await;

    follow::follow(&db, ada.id, [bob.id, cat.id]).await.unwrap();
    follow::follow(&db, cat.id, [bob.id]).await.unwrap();

    assert_eq!(ids(&follow::followers(&db, bob.id).await.unwrap()), vec![ada.id, cat.id]);
    assert_eq!(ids(&follow::followings(&db, ada.id).await.unwrap()), vec![bob.id, cat.id]);
    assert_eq!(ids(&follow::followers(&db, ada.id).await.unwrap()), Vec::<i32>::new());

    let counts = follow::counts(&db, bob.id).await.unwrap();
    assert_eq!(counts.followers, 2);
    assert_eq!(counts.followings, 0);
}

#[actix_web::test]
async fn feed_merges_own_and_followed_posts_newest_first() {
    let db = setup_db().await;
    let viewer = register_active(&db, "Viewer", "viewer@example.com").await;
    let followed = register_active(&db, "Followed", "followed@example.com").await;
    let stranger = register_active(&db, "Stranger", "stranger@example.com").await;
    follow::follow(&db, viewer.id, [followed.id]).await.unwrap();

    let p1 = post_store::create_at(&db, followed.id, "P1", at(10)).await.unwrap();
    let p2 = post_store::create_at(&db, followed.id, "P2", at(20)).await.unwrap();
    let p3 = post_store::create_at(&db, viewer.id, "P3", at(15)).await.unwrap();
    post_store::create_at(&db, stranger.id, "not followed", at(30)).await.unwrap();

    let viewer_feed = feed::feed_for(&db, viewer.id, 20).await.unwrap();
    let page = viewer_feed.page(&db, PageRequest::default()).await.unwrap();
    let got: Vec<i32> = page.items.iter().map(|p| p.id).collect();
    assert_eq!(got, vec![p2.id, p3.id, p1.id]);
    assert_eq!(page.total, 3);
    assert_eq!(page.total_page, 1);
}

#[actix_web::test]
async fn equal_timestamps_order_by_id_descending() {
    let db = setup_db().await;
    let viewer = register_active(&db, "Viewer", "viewer@example.com").await;
    let a = post_store::create_at(&db, viewer.id, "a", at(5)).await.unwrap();
    let b = post_store::create_at(&db, viewer.id, "b", at(5)).await.unwrap();

    let viewer_feed = feed::feed_for(&db, viewer.id, 20).await.unwrap();
    let page = viewer_feed.page(&db, PageRequest::default()).await.unwrap();
    let got: Vec<i32> = page.items.iter().map(|p| p.id).collect();
    assert_eq!(got, vec![b.id, a.id]);
}

#[actix_web::test]
async fn page_far_past_the_end_is_empty() {
    let db = setup_db().await;
    let viewer = register_active(&db, "Viewer", "viewer@example.com").await;
    post_store::create_at(&db, viewer.id, "only", at(1)).await.unwrap();

    let viewer_feed = feed::feed_for(&db, viewer.id, 20).await.unwrap();
    let page = viewer_feed
        .page(&db, PageRequest::new(Some(u64::MAX), Some(100)))
        .await
        .unwrap();
    assert!(page.items.is_empty());
    assert_eq!(page.total, 1);
    assert_eq!(page.total_page, 1);
}

#[actix_web::test]
async fn feed_pages_lazily_without_gaps_or_repeats() {
    let db = setup_db().await;
    let viewer = register_active(&db, "Viewer", "viewer@example.com").await;
    let mut created = Vec::new();
    for i in 0..7 {
        // two posts share each timestamp to exercise the tie-breaker
        let p = post_store::create_at(&db, viewer.id, &format!("post {}", i), at(i / 2))
            .await
            .unwrap();
        created.push(p);
    }

    let mut viewer_feed = feed::feed_for(&db, viewer.id, 3).await.unwrap();
    let first = viewer_feed.next_page(&db).await.unwrap();
    // a newer post arriving mid-read does not shift later pages
    post_store::create_at(&db, viewer.id, "late", at(100)).await.unwrap();
    let second = viewer_feed.next_page(&db).await.unwrap();
    let third = viewer_feed.next_page(&db).await.unwrap();
    let fourth = viewer_feed.next_page(&db).await.unwrap();

    assert_eq!(first.len(), 3);
    assert_eq!(second.len(), 3);
    assert_eq!(third.len(), 1);
    assert!(fourth.is_empty());

    let seen: Vec<i32> = first
        .iter()
        .chain(second.iter())
        .chain(third.iter())
        .map(|p| p.id)
        .collect();
    let mut expected = created.clone();
    expected.sort_by(|a, b| b.created.cmp(&a.created).then(b.id.cmp(&a.id)));
    assert_eq!(seen, expected.iter().map(|p| p.id).collect::<Vec<_>>());
}

#[actix_web::test]
async fn recomputed_feed_reflects_unfollow() {
    let db = setup_db().await;
    let viewer = register_active(&db, "Viewer", "viewer@example.com").await;
    let bob = register_active(&db, "Bob", "bob@example.com").await;
    follow::follow(&db, viewer.id, [bob.id]).await.unwrap();
    post_store::create_at(&db, bob.id, "hello", at(1)).await.unwrap();

    let before = feed::feed_for(&db, viewer.id, 20).await.unwrap();
    assert_eq!(before.page(&db, PageRequest::default()).await.unwrap().total, 1);

    follow::unfollow(&db, viewer.id, [bob.id]).await.unwrap();
    let after = feed::feed_for(&db, viewer.id, 20).await.unwrap();
    assert_eq!(after.owner_ids(), &[viewer.id]);
    assert!(after.page(&db, PageRequest::default()).await.unwrap().items.is_empty());
}

#[actix_web::test]
async fn deleting_a_user_removes_edges_posts_and_sessions() {
    let db = setup_db().await;
    let config = test_config();
    let ada = register_active(&db, "Ada", "ada@example.com").await;
    let bob = register_active(&db, "Bob", "bob@example.com").await;
    let cat = register_active(&db, "Cat", "cat@example.com").await;
    follow::follow(&db, ada.id, [bob.id, cat.id]).await.unwrap();
    follow::follow(&db, bob.id, [ada.id]).await.unwrap();
    follow::follow(&db, cat.id, [ada.id, bob.id]).await.unwrap();
    post_store::create_at(&db, ada.id, "bye", at(1)).await.unwrap();
    post_store::create_at(&db, bob.id, "stay", at(2)).await.unwrap();
    let started = session::authenticate(&db, &config, "ada@example.com", PASSWORD, false)
        .await
        .unwrap();

    users::destroy(&db, ada.id, ada.id).await.unwrap();

    assert!(users::find_by_id(&db, ada.id).await.unwrap().is_none());
    assert_eq!(ids(&follow::followers(&db, bob.id).await.unwrap()), vec![cat.id]);
    assert_eq!(ids(&follow::followings(&db, bob.id).await.unwrap()), Vec::<i32>::new());
    assert_eq!(ids(&follow::followings(&db, cat.id).await.unwrap()), vec![bob.id]);
    assert_eq!(follower::Entity::find().count(&db).await.unwrap(), 1);
    let remaining: Vec<String> = post::Entity::find()
        .all(&db)
        .await
        .unwrap()
        .into_iter()
        .map(|p| p.content)
        .collect();
    assert_eq!(remaining, vec!["stay".to_string()]);
    assert!(session::resolve(&db, &config, &started.token).await.is_err());
}

#[actix_web::test]
async fn only_the_owner_may_delete_or_update() {
    let db = setup_db().await;
    let ada = register_active(&db, "Ada", "ada@example.com").await;
    let bob = register_active(&db, "Bob", "bob@example.com").await;

    let result = users::destroy(&db, bob.id, ada.id).await;
    assert!(matches!(result, Err(AccountError::Forbidden)));
    assert!(users::find_by_id(&db, ada.id).await.unwrap().is_some());

    let update = UserUpdate {
        name: Some("Mallory".to_string()),
        password_hash: None,
    };
    let result = users::update_profile(&db, bob.id, ada.id, update.clone()).await;
    assert!(matches!(result, Err(AccountError::Forbidden)));

    let updated = users::update_profile(&db, ada.id, ada.id, update).await.unwrap();
    assert_eq!(updated.name, "Mallory");
}

#[actix_web::test]
async fn deleting_a_missing_user_is_not_found() {
    let db = setup_db().await;
    let result = users::destroy(&db, 1, 1).await;
    assert!(matches!(result, Err(AccountError::UserNotFound)));
}
