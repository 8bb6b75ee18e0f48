//! Typed access to the backend. Rows are validated as they cross into the
//! client: a bad row in a list is skipped and logged, a bad single row is an
//! error.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use uuid::Uuid;

use teahouse_types::{
    Bucket, Comment, FeedFilter, NewComment, NewPost, NewProfile, Post, Profile, ProfileUpdate,
    Validate, ValidationError,
};

use super::backend::SharedBackend;
use super::query::{Query, Table};
use super::{ApiError, ApiResult};

/// Maximum number of profiles returned by a name search
pub const SEARCH_LIMIT: usize = 10;

#[derive(Clone)]
pub struct Repository {
    backend: SharedBackend,
}

fn decode<T: DeserializeOwned + Validate>(row: Value) -> ApiResult<T> {
    let record: T = serde_json::from_value(row)?;
    record.validate()?;
    Ok(record)
}

fn decode_list<T: DeserializeOwned + Validate>(table: Table, rows: Vec<Value>) -> Vec<T> {
    rows.into_iter()
        .filter_map(|row| match decode::<T>(row) {
            Ok(record) => Some(record),
            Err(e) => {
                log::warn!("Skipping invalid {} row: {}", table, e);
                None
            }
        })
        .collect()
}

fn decode_first<T: DeserializeOwned + Validate>(table: Table, rows: Vec<Value>) -> ApiResult<T> {
    let row = rows
        .into_iter()
        .next()
        .ok_or_else(|| ApiError::Api(format!("{} write returned no row", table)))?;
    decode(row)
}

fn to_row<T: Serialize>(record: &T) -> ApiResult<Value> {
    Ok(serde_json::to_value(record)?)
}

impl Repository {
    pub fn new(backend: SharedBackend) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &SharedBackend {
        &self.backend
    }

    // Profiles

    pub async fn fetch_profile(&self, id: Uuid) -> ApiResult<Option<Profile>> {
        let rows = self
            .backend
            .select(Table::Profiles, &Query::new().eq("id", id).limit(1))
            .await?;
        rows.into_iter().next().map(decode).transpose()
    }

    pub async fn create_profile(&self, profile: &NewProfile) -> ApiResult<Profile> {
        if profile.full_name.trim().is_empty() {
            return Err(ValidationError::Empty { field: "full_name" }.into());
        }
        let rows = self.backend.insert(Table::Profiles, to_row(profile)?).await?;
        decode_first(Table::Profiles, rows)
    }

    /// Patch the caller's own profile. A patch that reaches no row means the
    /// write was refused.
    pub async fn update_profile(&self, id: Uuid, patch: &ProfileUpdate) -> ApiResult<Profile> {
        if let Some(name) = &patch.full_name {
            if name.trim().is_empty() {
                return Err(ValidationError::Empty { field: "full_name" }.into());
            }
        }
        let rows = self
            .backend
            .update(Table::Profiles, &Query::new().eq("id", id), to_row(patch)?)
            .await?;
        if rows.is_empty() {
            return Err(ApiError::Forbidden(
                "profile update affected no rows".to_string(),
            ));
        }
        decode_first(Table::Profiles, rows)
    }

    pub async fn search_profiles(&self, term: &str) -> ApiResult<Vec<Profile>> {
        let query = Query::new()
            .contains("full_name", term.trim())
            .limit(SEARCH_LIMIT);
        let rows = self.backend.select(Table::Profiles, &query).await?;
        Ok(decode_list(Table::Profiles, rows))
    }

    // Posts

    pub async fn fetch_posts(&self, filter: FeedFilter) -> ApiResult<Vec<Post>> {
        let query = match filter {
            FeedFilter::Recency => Query::new().order("created_at", false),
            FeedFilter::Trending => Query::new()
                .order("likes_count", false)
                .order("created_at", false),
        };
        let rows = self.backend.select(Table::Posts, &query).await?;
        Ok(decode_list(Table::Posts, rows))
    }

    pub async fn fetch_posts_by_user(&self, user_id: Uuid) -> ApiResult<Vec<Post>> {
        let query = Query::new()
            .eq("user_id", user_id)
            .order("created_at", false);
        let rows = self.backend.select(Table::Posts, &query).await?;
        Ok(decode_list(Table::Posts, rows))
    }

    pub async fn create_post(&self, post: &NewPost) -> ApiResult<Post> {
        post.validate()?;
        let rows = self.backend.insert(Table::Posts, to_row(post)?).await?;
        decode_first(Table::Posts, rows)
    }

    /// Number of post rows actually removed. Zero means the store refused or
    /// the post was already gone.
    pub async fn delete_post(&self, id: i64) -> ApiResult<usize> {
        let removed = self
            .backend
            .delete(Table::Posts, &Query::new().eq("id", id))
            .await?;
        Ok(removed.len())
    }

    pub async fn increment_likes(&self, id: i64) -> ApiResult<()> {
        self.backend
            .rpc("increment_likes", json!({ "p_id": id }))
            .await?;
        Ok(())
    }

    // Comments

    pub async fn count_comments(&self, post_id: i64) -> ApiResult<usize> {
        self.backend
            .count(Table::Comments, &Query::new().eq("post_id", post_id))
            .await
    }

    pub async fn fetch_comments(&self, post_id: i64) -> ApiResult<Vec<Comment>> {
        let query = Query::new()
            .eq("post_id", post_id)
            .order("created_at", true);
        let rows = self.backend.select(Table::Comments, &query).await?;
        Ok(decode_list(Table::Comments, rows))
    }

    pub async fn create_comment(&self, comment: &NewComment) -> ApiResult<Comment> {
        comment.validate()?;
        let rows = self
            .backend
            .insert(Table::Comments, to_row(comment)?)
            .await?;
        decode_first(Table::Comments, rows)
    }

    pub async fn delete_comments_for_post(&self, post_id: i64) -> ApiResult<usize> {
        let removed = self
            .backend
            .delete(Table::Comments, &Query::new().eq("post_id", post_id))
            .await?;
        Ok(removed.len())
    }

    // Images

    /// Upload an object and return its public URL
    pub async fn upload_image(
        &self,
        bucket: Bucket,
        name: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> ApiResult<String> {
        self.backend.upload(bucket, name, bytes, content_type).await?;
        Ok(self.backend.public_url(bucket, name))
    }

    /// Remove the object behind `url` if it lives in `bucket`. Failures are
    /// logged, never returned. Returns whether an object was removed.
    pub async fn remove_image_best_effort(&self, bucket: Bucket, url: &str) -> bool {
        let Some(name) = self.backend.object_name(bucket, url) else {
            log::debug!("Not a {} object, leaving it alone: {}", bucket.as_str(), url);
            return false;
        };

        match self.backend.remove(bucket, &[name.clone()]).await {
            Ok(()) => {
                log::info!("Removed {}/{}", bucket.as_str(), name);
                true
            }
            Err(e) => {
                log::warn!("Failed to remove {}/{}: {}", bucket.as_str(), name, e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::MemoryBackend;
    use std::sync::Arc;

    fn setup() -> (Arc<MemoryBackend>, Repository) {
        let backend = Arc::new(MemoryBackend::new());
        let repo = Repository::new(backend.clone());
        (backend, repo)
    }

    #[tokio::test]
    async fn test_invalid_rows_are_skipped_in_lists() {
        let (backend, repo) = setup();
        let user = backend.register_user("sara@example.com", None);
        let profile = backend.seed_profile(&user, "Sara");
        backend.seed_post(&profile, "memory://x", "ok", 1);
        backend.seed_row(
            Table::Posts,
            json!({ "user_id": user.id, "author_name": "", "image_url": "memory://y" }),
        );
        backend.seed_row(Table::Posts, json!({ "garbage": true }));

        let posts = repo.fetch_posts(FeedFilter::Recency).await.unwrap();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].caption.as_deref(), Some("ok"));
    }

    #[tokio::test]
    async fn test_invalid_single_row_is_an_error() {
        let (backend, repo) = setup();
        let user = backend.register_user("sara@example.com", None);
        backend.seed_row(Table::Profiles, json!({ "id": user.id, "full_name": " " }));

        let err = repo.fetch_profile(user.id).await.unwrap_err();
        assert!(matches!(err, ApiError::InvalidRecord(_)));
    }

    #[tokio::test]
    async fn test_missing_profile_is_none() {
        let (_backend, repo) = setup();
        assert!(repo.fetch_profile(Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_profile_refused_for_other_user() {
        let (backend, repo) = setup();
        let sara = backend.register_user("sara@example.com", None);
        let omar = backend.register_user("omar@example.com", None);
        backend.seed_profile(&sara, "Sara");
        backend.sign_in_as(Some(&omar));

        let err = repo
            .update_profile(sara.id, &ProfileUpdate::details("Hacked", ""))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(_)));
    }

    #[tokio::test]
    async fn test_blank_name_rejected_before_network() {
        let (backend, repo) = setup();
        let sara = backend.register_user("sara@example.com", None);
        backend.sign_in_as(Some(&sara));

        let err = repo
            .create_profile(&NewProfile {
                id: sara.id,
                full_name: "   ".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::InvalidRecord(_)));
        assert!(backend.rows(Table::Profiles).is_empty());
    }

    #[tokio::test]
    async fn test_remove_image_skips_foreign_urls_and_swallows_failures() {
        let (backend, repo) = setup();
        let url = backend.seed_object(Bucket::PostImages, "1.jpg", b"x");

        assert!(
            !repo
                .remove_image_best_effort(Bucket::PostImages, "https://ui-avatars.com/api/?name=S")
                .await
        );

        backend.fail_on("remove");
        assert!(!repo.remove_image_best_effort(Bucket::PostImages, &url).await);
        assert!(backend.has_object(Bucket::PostImages, "1.jpg"));

        backend.clear_failures();
        assert!(repo.remove_image_best_effort(Bucket::PostImages, &url).await);
        assert!(!backend.has_object(Bucket::PostImages, "1.jpg"));
    }
}
