use chrono::Utc;
use tui_textarea::TextArea;
use uuid::Uuid;

use teahouse_types::{Bucket, ImageSlot, Profile, ProfileUpdate, User};

use crate::api::{ApiError, ApiResult, Repository};
use crate::app::post::PostList;
use crate::app::upload::{expand_path, read_image, text_area};
use crate::cancel::ViewScope;

/// A profile with its posts, newest first
#[derive(Debug)]
pub struct ProfileView {
    pub profile_id: Uuid,
    pub profile: Option<Profile>,
    pub posts: PostList,
    pub selected: usize,
    pub loading: bool,
    pub error: Option<String>,
    scope: ViewScope,
}

impl ProfileView {
    pub fn new(profile_id: Uuid) -> Self {
        Self {
            profile_id,
            profile: None,
            posts: PostList::new(),
            selected: 0,
            loading: false,
            error: None,
            scope: ViewScope::new(),
        }
    }

    /// Load the profile and its posts independently. Either half may land
    /// even if the other fails; the first error is returned.
    pub async fn load(&mut self, repo: &Repository) -> ApiResult<()> {
        let token = self.scope.token();
        self.loading = true;
        let (profile, posts) = tokio::join!(
            token.run(repo.fetch_profile(self.profile_id)),
            token.run(repo.fetch_posts_by_user(self.profile_id)),
        );
        self.loading = false;

        let mut first_error = None;
        match profile {
            Ok(Some(profile)) => self.profile = Some(profile),
            Ok(None) => {
                first_error = Some(ApiError::NotFound(format!(
                    "profile {} does not exist",
                    self.profile_id
                )))
            }
            Err(e) => first_error = Some(e),
        }
        match posts {
            Ok(posts) => self.posts.replace(posts),
            Err(e) => {
                first_error.get_or_insert(e);
            }
        }
        if self.selected >= self.posts.len() {
            self.selected = self.posts.len().saturating_sub(1);
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    pub fn post_count(&self) -> usize {
        self.posts.len()
    }

    /// Followers are not modelled yet
    pub fn follower_count(&self) -> usize {
        0
    }

    pub fn is_own(&self, user: Option<&User>) -> bool {
        user.is_some_and(|u| u.id == self.profile_id)
    }

    pub fn selected_id(&self) -> Option<i64> {
        self.posts.units().get(self.selected).map(|u| u.id())
    }

    pub fn select_next(&mut self) {
        if self.selected + 1 < self.posts.len() {
            self.selected += 1;
        }
    }

    pub fn select_previous(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorField {
    Name,
    Bio,
    ImagePath,
}

/// Owner-only profile editor
pub struct ProfileEditor {
    pub profile: Profile,
    pub name: String,
    pub bio: TextArea<'static>,
    pub image_path: String,
    pub field: EditorField,
    pub slot: ImageSlot,
    pub confirm_remove: bool,
    pub busy: bool,
    pub error: Option<String>,
}

impl ProfileEditor {
    pub fn new(profile: Profile) -> Self {
        let bio_lines = profile
            .bio
            .as_deref()
            .map(|b| b.lines().map(str::to_string).collect())
            .unwrap_or_default();
        Self {
            name: profile.full_name.clone(),
            bio: text_area(bio_lines),
            image_path: String::new(),
            field: EditorField::Name,
            slot: ImageSlot::Avatar,
            confirm_remove: false,
            busy: false,
            error: None,
            profile,
        }
    }

    pub fn bio_text(&self) -> String {
        self.bio.lines().join("\n")
    }

    pub fn next_field(&mut self) {
        self.field = match self.field {
            EditorField::Name => EditorField::Bio,
            EditorField::Bio => EditorField::ImagePath,
            EditorField::ImagePath => EditorField::Name,
        };
    }

    /// Save name and bio
    pub async fn save_details(&mut self, repo: &Repository) -> ApiResult<Profile> {
        let name = self.name.trim().to_string();
        let patch = ProfileUpdate::details(name, &self.bio_text());
        self.apply(repo, patch).await
    }

    /// Upload a new image for `slot` and point the profile at it. The
    /// previous object is then removed best-effort.
    pub async fn replace_image(&mut self, repo: &Repository, slot: ImageSlot) -> ApiResult<Profile> {
        if self.image_path.trim().is_empty() {
            return Err(ApiError::InvalidRecord("choose an image file".to_string()));
        }
        let image = read_image(&expand_path(&self.image_path)).await?;
        let previous = self.profile.image(slot).map(str::to_string);

        let name = format!(
            "{}/{}-{}.{}",
            self.profile.id,
            slot.as_str(),
            Utc::now().timestamp_millis(),
            image.extension
        );
        let url = repo
            .upload_image(Bucket::ProfileImages, &name, image.bytes, image.content_type)
            .await?;

        let updated = self.apply(repo, ProfileUpdate::image(slot, Some(url))).await?;
        if let Some(previous) = previous {
            repo.remove_image_best_effort(Bucket::ProfileImages, &previous)
                .await;
        }
        self.image_path.clear();
        Ok(updated)
    }

    /// Clear the image of `slot`, then remove its object best-effort
    pub async fn remove_image(&mut self, repo: &Repository, slot: ImageSlot) -> ApiResult<Profile> {
        self.confirm_remove = false;
        let previous = self.profile.image(slot).map(str::to_string);

        let updated = self.apply(repo, ProfileUpdate::image(slot, None)).await?;
        if let Some(previous) = previous {
            repo.remove_image_best_effort(Bucket::ProfileImages, &previous)
                .await;
        }
        Ok(updated)
    }

    async fn apply(&mut self, repo: &Repository, patch: ProfileUpdate) -> ApiResult<Profile> {
        self.busy = true;
        let result = repo.update_profile(self.profile.id, &patch).await;
        self.busy = false;

        let updated = result?;
        self.profile = updated.clone();
        Ok(updated)
    }
}
