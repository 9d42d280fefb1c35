//! Reverse-chronological feed: the viewer's own posts plus the posts of
//! everyone the viewer follows.

use sea_orm::ConnectionTrait;

use crate::entity::post;
use crate::error::AccountError;
use crate::follow;
use crate::post_store::{self, FeedCursor, PageRequest};

#[derive(Clone, Debug, PartialEq)]
pub struct PostPage {
    pub items: Vec<post::Model>,
    pub total: u64,
    pub total_page: u64,
}

/// A viewer's feed, read page by page.
///
/// The set of authors is fixed when the feed is built; call [`feed_for`]
/// again to pick up follow-graph changes.
#[derive(Clone, Debug)]
pub struct Feed {
    viewer_id: i32,
    owner_ids: Vec<i32>,
    page_size: u64,
    cursor: Option<FeedCursor>,
    exhausted: bool,
}

pub async fn feed_for<C: ConnectionTrait>(
    db: &C,
    viewer_id: i32,
    page_size: u64,
) -> Result<Feed, AccountError> {
    let mut owner_ids = follow::following_ids(db, viewer_id).await?;
    owner_ids.push(viewer_id);
    owner_ids.sort_unstable();
    owner_ids.dedup();

    Ok(Feed {
        viewer_id,
        owner_ids,
        page_size: page_size.clamp(1, post_store::MAX_PAGE_SIZE),
        cursor: None,
        exhausted: false,
    })
}

impl Feed {
    pub fn viewer_id(&self) -> i32 {
        self.viewer_id
    }

    pub fn owner_ids(&self) -> &[i32] {
        &self.owner_ids
    }

    /// Next batch of posts after the ones already returned. Empty once the
    /// history is exhausted. Posts published after the first page was read
    /// do not shift later pages.
    pub async fn next_page<C: ConnectionTrait>(&mut self, db: &C) -> Result<Vec<post::Model>, AccountError> {
        if self.exhausted {
            return Ok(Vec::new());
        }
        let items =
            post_store::posts_by_owners_before(db, &self.owner_ids, self.cursor, self.page_size).await?;
        if (items.len() as u64) < self.page_size {
            self.exhausted = true;
        }
        if let Some(last) = items.last() {
            self.cursor = Some(FeedCursor::from(last));
        }
        Ok(items)
    }

    /// A numbered page with totals, in the same order as [`Feed::next_page`].
    pub async fn page<C: ConnectionTrait>(&self, db: &C, page: PageRequest) -> Result<PostPage, AccountError> {
        let total = post_store::count_by_owners(db, &self.owner_ids).await?;
        let items = post_store::posts_by_owners(db, &self.owner_ids, page).await?;
        let total_page = page.total_pages(total);
        Ok(PostPage {
            items,
            total,
            total_page,
        })
    }
}
