use teahouse_types::{Bucket, Post, User};

use crate::api::{ApiError, ApiResult, Repository};
use crate::app::gate::Session;
use crate::cancel::{CancelToken, ViewScope};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommentCount {
    NotRequested,
    Loading,
    Loaded(usize),
    Failed,
}

impl CommentCount {
    pub fn value(&self) -> Option<usize> {
        match self {
            CommentCount::Loaded(n) => Some(*n),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LikeOutcome {
    Liked,
    /// Already locked this session; no call was made
    AlreadyLiked,
}

/// A comment-count fetch owed to a post unit
#[derive(Debug, Clone)]
pub struct CountRequest {
    pub post_id: i64,
    pub token: CancelToken,
}

/// One rendered post with its like, delete and comment-count behavior
#[derive(Debug)]
pub struct PostUnit {
    pub post: Post,
    pub comment_count: CommentCount,
    scope: ViewScope,
}

impl PostUnit {
    pub fn new(post: Post) -> Self {
        Self {
            post,
            comment_count: CommentCount::NotRequested,
            scope: ViewScope::new(),
        }
    }

    pub fn id(&self) -> i64 {
        self.post.id
    }

    pub fn token(&self) -> CancelToken {
        self.scope.token()
    }

    pub fn is_liked(&self, session: Option<&Session>) -> bool {
        session.is_some_and(|s| s.has_liked(self.post.id))
    }

    pub fn can_delete(&self, user: Option<&User>) -> bool {
        self.post.is_owned_by(user)
    }

    /// Mark the count as requested and hand out the fetch to run
    pub fn request_count(&mut self) -> Option<CountRequest> {
        if self.comment_count != CommentCount::NotRequested {
            return None;
        }
        self.comment_count = CommentCount::Loading;
        Some(CountRequest {
            post_id: self.post.id,
            token: self.token(),
        })
    }

    pub fn apply_count(&mut self, result: ApiResult<usize>) {
        match result {
            Ok(n) => self.comment_count = CommentCount::Loaded(n),
            Err(ApiError::Cancelled) => {}
            Err(e) => {
                log::warn!("Comment count for post {} failed: {}", self.post.id, e);
                self.comment_count = CommentCount::Failed;
            }
        }
    }

    /// Fetch the comment count inline, scoped to this unit
    pub async fn load_comment_count(&mut self, repo: &Repository) -> ApiResult<usize> {
        self.comment_count = CommentCount::Loading;
        match self.token().run(repo.count_comments(self.post.id)).await {
            Ok(n) => {
                self.comment_count = CommentCount::Loaded(n);
                Ok(n)
            }
            Err(e) => {
                if !e.is_cancelled() {
                    log::warn!("Comment count for post {} failed: {}", self.post.id, e);
                    self.comment_count = CommentCount::Failed;
                }
                Err(e)
            }
        }
    }

    /// One-directional like: a single increment per post per session.
    /// The lock is released if the increment fails.
    pub async fn like(&mut self, repo: &Repository, session: &mut Session) -> ApiResult<LikeOutcome> {
        let post_id = self.post.id;
        if !session.lock_like(post_id) {
            return Ok(LikeOutcome::AlreadyLiked);
        }

        match self.token().run(repo.increment_likes(post_id)).await {
            Ok(()) => {
                self.post.likes_count += 1;
                Ok(LikeOutcome::Liked)
            }
            Err(e) => {
                session.release_like(post_id);
                Err(e)
            }
        }
    }

    /// Delete the post and its comments. Owner only.
    ///
    /// The post row must actually disappear; a delete the store silently
    /// refuses is reported as a permission failure. The stored image is
    /// removed afterwards on a best-effort basis.
    pub async fn delete(&self, repo: &Repository, session: &Session) -> ApiResult<()> {
        if !self.can_delete(Some(&session.user)) {
            return Err(ApiError::Forbidden(
                "only the author can delete this post".to_string(),
            ));
        }
        let token = self.token();
        let post_id = self.post.id;

        token.run(repo.delete_comments_for_post(post_id)).await?;
        let removed = token.run(repo.delete_post(post_id)).await?;
        if removed == 0 {
            return Err(ApiError::Forbidden(format!(
                "post {} was not deleted; you may not have permission",
                post_id
            )));
        }

        repo.remove_image_best_effort(Bucket::PostImages, &self.post.image_url)
            .await;
        Ok(())
    }

    pub fn open_image(&self) -> std::io::Result<()> {
        webbrowser::open(&self.post.image_url)
    }
}

/// Ordered post units. Reloading keeps units whose post survived, along with
/// their comment counts.
#[derive(Debug, Default)]
pub struct PostList {
    units: Vec<PostUnit>,
}

impl PostList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the list with freshly loaded posts
    pub fn replace(&mut self, posts: Vec<Post>) {
        let mut old = std::mem::take(&mut self.units);
        self.units = posts
            .into_iter()
            .map(|post| match old.iter().position(|u| u.post.id == post.id) {
                Some(i) => {
                    let mut unit = old.swap_remove(i);
                    unit.post = post;
                    unit
                }
                None => PostUnit::new(post),
            })
            .collect();
        // Units left in `old` drop here, cancelling their requests
    }

    pub fn units(&self) -> &[PostUnit] {
        &self.units
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn get(&self, post_id: i64) -> Option<&PostUnit> {
        self.units.iter().find(|u| u.post.id == post_id)
    }

    pub fn get_mut(&mut self, post_id: i64) -> Option<&mut PostUnit> {
        self.units.iter_mut().find(|u| u.post.id == post_id)
    }

    pub fn clear(&mut self) {
        self.units.clear();
    }

    pub fn take_count_requests(&mut self) -> Vec<CountRequest> {
        self.units
            .iter_mut()
            .filter_map(PostUnit::request_count)
            .collect()
    }

    pub fn apply_count(&mut self, post_id: i64, result: ApiResult<usize>) {
        if let Some(unit) = self.get_mut(post_id) {
            unit.apply_count(result);
        }
    }

    pub fn count_failed(&mut self, post_id: i64) {
        if let Some(unit) = self.get_mut(post_id) {
            unit.comment_count = CommentCount::Failed;
        }
    }
}
