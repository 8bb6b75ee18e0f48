use teahouse_types::{Comment, NewComment, Rank, User};

use crate::api::{ApiError, ApiResult, Repository};
use crate::cancel::ViewScope;
use crate::emoji::EmojiEntry;

/// Author name used when the poster has no profile name
pub const FALLBACK_AUTHOR: &str = "Member";

/// Comments of one post, oldest first, with the compose buffer
#[derive(Debug)]
pub struct CommentThread {
    pub post_id: i64,
    pub comments: Vec<Comment>,
    pub buffer: String,
    pub selected: Option<usize>,
    pub emoji_index: usize,
    pub loading: bool,
    pub sending: bool,
    pub error: Option<String>,
    scope: ViewScope,
}

impl CommentThread {
    pub fn new(post_id: i64) -> Self {
        Self {
            post_id,
            comments: Vec::new(),
            buffer: String::new(),
            selected: None,
            emoji_index: 0,
            loading: false,
            sending: false,
            error: None,
            scope: ViewScope::new(),
        }
    }

    /// Fetch the thread. Returns the comment count.
    pub async fn load(&mut self, repo: &Repository) -> ApiResult<usize> {
        self.loading = true;
        let result = self.scope.token().run(repo.fetch_comments(self.post_id)).await;
        self.loading = false;

        self.comments = result?;
        if let Some(i) = self.selected {
            if i >= self.comments.len() {
                self.selected = self.comments.len().checked_sub(1);
            }
        }
        Ok(self.comments.len())
    }

    /// Comments with their 1-based position and rank
    pub fn entries(&self) -> impl Iterator<Item = (usize, Rank, &Comment)> {
        self.comments
            .iter()
            .enumerate()
            .map(|(i, c)| (i + 1, Rank::for_position(i), c))
    }

    pub fn append_emoji(&mut self, entry: &EmojiEntry) {
        self.buffer.push_str(entry.code);
    }

    /// Prefill a mention of `author`; replies are not nested
    pub fn reply_to(&mut self, author: &str) {
        self.buffer.push('@');
        self.buffer.push_str(author);
        self.buffer.push(' ');
    }

    pub fn reply_to_selected(&mut self) -> bool {
        let Some(author) = self
            .selected
            .and_then(|i| self.comments.get(i))
            .map(|c| c.author_name.clone())
        else {
            return false;
        };
        self.reply_to(&author);
        true
    }

    pub fn select_next(&mut self) {
        if self.comments.is_empty() {
            return;
        }
        self.selected = Some(match self.selected {
            Some(i) if i + 1 < self.comments.len() => i + 1,
            Some(i) => i,
            None => 0,
        });
    }

    pub fn select_previous(&mut self) {
        self.selected = match self.selected {
            Some(0) | None => None,
            Some(i) => Some(i - 1),
        };
    }

    /// Send the buffer as a comment by `user`.
    ///
    /// The author name is resolved from the poster's profile at send time.
    /// On success the thread is re-fetched and the buffer cleared.
    pub async fn submit(&mut self, repo: &Repository, user: Option<&User>) -> ApiResult<Comment> {
        if self.buffer.trim().is_empty() {
            return Err(ApiError::InvalidRecord("comment is empty".to_string()));
        }
        let Some(user) = user else {
            return Err(ApiError::Unauthorized("sign in first".to_string()));
        };

        let token = self.scope.token();
        self.sending = true;
        let result = async {
            let author_name = token
                .run(repo.fetch_profile(user.id))
                .await?
                .map(|p| p.full_name)
                .unwrap_or_else(|| FALLBACK_AUTHOR.to_string());

            let comment = NewComment {
                post_id: self.post_id,
                user_id: user.id,
                author_name,
                content: self.buffer.clone(),
            };
            token.run(repo.create_comment(&comment)).await
        }
        .await;
        self.sending = false;

        let comment = result?;
        self.buffer.clear();
        if let Err(e) = self.load(repo).await {
            if !e.is_cancelled() {
                log::warn!("Reloading comments for post {} failed: {}", self.post_id, e);
            }
            self.comments.push(comment.clone());
        }
        Ok(comment)
    }
}
