use teahouse_types::FeedFilter;

use crate::api::{ApiResult, Repository};
use crate::app::post::{PostList, PostUnit};
use crate::content;

/// Main feed: the full post collection in the active order, with an optional
/// local hashtag focus.
#[derive(Debug, Default)]
pub struct FeedController {
    filter: FeedFilter,
    pub posts: PostList,
    hashtag_focus: Option<String>,
    pub selected: usize,
    pub loading: bool,
    pub error: Option<String>,
}

impl FeedController {
    pub fn new(filter: FeedFilter) -> Self {
        Self {
            filter,
            ..Default::default()
        }
    }

    pub fn filter(&self) -> FeedFilter {
        self.filter
    }

    /// Load the whole collection for the active filter, replacing the list
    pub async fn load(&mut self, repo: &Repository) -> ApiResult<usize> {
        self.loading = true;
        let result = repo.fetch_posts(self.filter).await;
        self.loading = false;

        let posts = result?;
        log::debug!("Loaded {} posts ({})", posts.len(), self.filter.as_str());
        self.posts.replace(posts);
        self.error = None;
        self.clamp_selection();
        Ok(self.posts.len())
    }

    /// Switch filters and reload. Returns false if the filter was already
    /// active.
    pub async fn set_filter(&mut self, repo: &Repository, filter: FeedFilter) -> ApiResult<bool> {
        if filter == self.filter {
            return Ok(false);
        }
        self.filter = filter;
        self.selected = 0;
        self.load(repo).await?;
        Ok(true)
    }

    pub fn hashtag_focus(&self) -> Option<&str> {
        self.hashtag_focus.as_deref()
    }

    /// Narrow the visible list to posts carrying `tag`. No query is issued.
    pub fn focus_hashtag(&mut self, tag: &str) {
        self.hashtag_focus = Some(tag.to_string());
        self.selected = 0;
    }

    pub fn clear_focus(&mut self) {
        self.hashtag_focus = None;
        self.selected = 0;
    }

    /// Posts currently shown, honoring the hashtag focus
    pub fn visible(&self) -> Vec<&PostUnit> {
        self.posts
            .units()
            .iter()
            .filter(|unit| match &self.hashtag_focus {
                Some(tag) => unit
                    .post
                    .caption
                    .as_deref()
                    .is_some_and(|c| content::has_hashtag(c, tag)),
                None => true,
            })
            .collect()
    }

    pub fn selected_unit(&self) -> Option<&PostUnit> {
        self.visible().get(self.selected).copied()
    }

    pub fn selected_id(&self) -> Option<i64> {
        self.selected_unit().map(PostUnit::id)
    }

    pub fn select_next(&mut self) {
        let len = self.visible().len();
        if len > 0 && self.selected + 1 < len {
            self.selected += 1;
        }
    }

    pub fn select_previous(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    fn clamp_selection(&mut self) {
        let len = self.visible().len();
        if self.selected >= len {
            self.selected = len.saturating_sub(1);
        }
    }
}
