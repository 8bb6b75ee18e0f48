use anyhow::Result;
use crossterm::event::KeyEvent;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use uuid::Uuid;

use teahouse_types::{FeedFilter, ImageSlot, User};

use crate::api::{ApiError, ErrorCategory, IdentityProvider, Repository, SharedBackend};
use crate::config::{ConfigManager, UserPreferences};
use crate::logging::LogConfig;
use crate::{log_api_call, log_screen_state};

pub mod comments;
pub mod feed;
pub mod gate;
pub mod handlers;
pub mod post;
pub mod profile;
pub mod search;
pub mod state;
pub mod upload;

pub use state::*;

use comments::CommentThread;
use feed::FeedController;
use gate::{Gate, GateState, SignInForm};
use post::{CountRequest, LikeOutcome, PostUnit};
use profile::{ProfileEditor, ProfileView};

/// How long a status message stays on screen
const MESSAGE_TTL: Duration = Duration::from_secs(3);

impl App {
    /// Build the app around a backend. `None` means the backend settings are
    /// missing and only the misconfiguration screen is reachable.
    pub fn new(
        backend: Option<SharedBackend>,
        config_manager: Option<ConfigManager>,
    ) -> (Self, mpsc::UnboundedReceiver<AppEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        let gate = match backend {
            Some(_) => Gate::new(),
            None => Gate::misconfigured(),
        };
        let app = Self {
            running: true,
            gate,
            repo: backend.map(Repository::new),
            config_manager,
            log_config: LogConfig::default(),
            sign_in: SignInForm::default(),
            profile_setup: ProfileSetupForm::default(),
            feed: FeedController::default(),
            pending_load: false,
            hashtag_cursor: 0,
            profile_view: None,
            thread: None,
            search: None,
            composer: None,
            editor: None,
            confirm_delete: None,
            alert: None,
            show_help: false,
            message: None,
            events,
        };
        (app, rx)
    }

    pub fn screen(&self) -> GateState {
        self.gate.state()
    }

    pub fn handle_key_event(&mut self, key: KeyEvent) -> Result<Option<Action>> {
        handlers::handle_key_event(self, key)
    }

    pub fn toggle_help(&mut self) {
        self.show_help = !self.show_help;
    }

    pub fn set_message(&mut self, text: impl Into<String>) {
        self.message = Some((text.into(), Instant::now()));
    }

    /// Clear the status message once it has been shown long enough
    pub fn clear_expired_messages(&mut self) {
        if let Some((_, shown_at)) = &self.message {
            if shown_at.elapsed() > MESSAGE_TTL {
                self.message = None;
            }
        }
    }

    /// Surface an error as an alert. Cancelled work stays silent.
    pub fn raise(&mut self, error: &ApiError) {
        if error.is_cancelled() {
            return;
        }
        log::warn!("Operation failed: {}", error);
        self.alert = Some(alert_for(error));
    }

    /// Post id under the cursor in the view that has focus
    pub fn selected_post_id(&self) -> Option<i64> {
        match &self.profile_view {
            Some(view) => view.selected_id(),
            None => self.feed.selected_id(),
        }
    }

    pub fn selected_unit(&self) -> Option<&PostUnit> {
        self.selected_post_id().and_then(|id| self.unit(id))
    }

    /// A post unit by id, preferring the open profile view
    pub fn unit(&self, post_id: i64) -> Option<&PostUnit> {
        self.profile_view
            .as_ref()
            .and_then(|v| v.posts.get(post_id))
            .or_else(|| self.feed.posts.get(post_id))
    }

    /// Re-run the gate for the identity the provider now reports
    pub async fn on_identity_change(&mut self, user: Option<User>) {
        let Some(repo) = self.repo.clone() else {
            return;
        };
        log_screen_state!(
            self.log_config,
            "Identity changed: {:?}",
            user.as_ref().map(|u| u.id)
        );

        let result = self.gate.evaluate(&repo, user).await;
        match result {
            Ok(GateState::Ready) => self.enter_ready().await,
            Ok(GateState::NeedsProfileSetup) => {
                self.profile_setup = ProfileSetupForm {
                    name: self.gate.suggested_name(),
                    ..Default::default()
                };
            }
            Ok(GateState::Unauthenticated) => {
                self.reset_views();
                self.sign_in.reset();
            }
            Ok(_) => {}
            Err(e) => self.raise(&e),
        }
        log_screen_state!(self.log_config, "Gate state: {:?}", self.gate.state());
    }

    /// Restore the saved feed filter and load the feed
    async fn enter_ready(&mut self) {
        let filter = self.load_filter_preference();
        if filter != self.feed.filter() {
            self.feed = FeedController::new(filter);
        }
        self.reload().await;
    }

    /// Move the selection down in the active list. The hashtag cursor starts
    /// over on the newly selected post.
    pub fn select_next_post(&mut self) {
        match self.profile_view.as_mut() {
            Some(view) => view.select_next(),
            None => self.feed.select_next(),
        }
        self.hashtag_cursor = 0;
    }

    pub fn select_previous_post(&mut self) {
        match self.profile_view.as_mut() {
            Some(view) => view.select_previous(),
            None => self.feed.select_previous(),
        }
        self.hashtag_cursor = 0;
    }

    fn reset_views(&mut self) {
        self.feed = FeedController::default();
        self.pending_load = false;
        self.profile_view = None;
        self.thread = None;
        self.search = None;
        self.composer = None;
        self.editor = None;
        self.confirm_delete = None;
        self.hashtag_cursor = 0;
    }

    fn load_filter_preference(&self) -> FeedFilter {
        let (Some(manager), Some(user)) = (&self.config_manager, self.gate.user()) else {
            return FeedFilter::default();
        };
        match manager.load_preferences(user.id) {
            Ok(Some(prefs)) => prefs.feed_filter,
            Ok(None) => FeedFilter::default(),
            Err(e) => {
                log::warn!("Failed to load preferences: {}", e);
                FeedFilter::default()
            }
        }
    }

    fn save_filter_preference(&self) {
        let (Some(manager), Some(user)) = (&self.config_manager, self.gate.user()) else {
            return;
        };
        let prefs = UserPreferences {
            feed_filter: self.feed.filter(),
        };
        if let Err(e) = manager.save_preferences(user.id, &prefs) {
            log::warn!("Failed to save preferences: {}", e);
        }
    }

    /// Reload the feed and the open profile view, then fetch missing counts
    pub async fn reload(&mut self) {
        let Some(repo) = self.repo.clone() else {
            return;
        };
        log_api_call!(self.log_config, "Loading feed ({})", self.feed.filter().as_str());
        let result = self.feed.load(&repo).await;
        if let Err(e) = result {
            self.feed.error = Some(alert_for(&e));
            self.raise(&e);
        }

        if let Some(view) = self.profile_view.as_mut() {
            let result = view.load(&repo).await;
            if let Err(e) = result {
                if !e.is_cancelled() {
                    view.error = Some(alert_for(&e));
                }
            }
        }
        self.spawn_count_requests();
    }

    /// Fetch comment counts for units that have none yet, off the main loop
    pub fn spawn_count_requests(&mut self) {
        let Some(repo) = self.repo.clone() else {
            return;
        };
        let mut requests = self.feed.posts.take_count_requests();
        if let Some(view) = self.profile_view.as_mut() {
            requests.extend(view.posts.take_count_requests());
        }

        for CountRequest { post_id, token } in requests {
            let repo = repo.clone();
            let events = self.events.clone();
            tokio::spawn(async move {
                let result = token.run(repo.count_comments(post_id)).await;
                if !matches!(result, Err(ApiError::Cancelled)) {
                    let _ = events.send(AppEvent::CommentCount { post_id, result });
                }
            });
        }
    }

    /// Start a profile search for the current query, off the main loop
    pub fn spawn_search(&mut self) {
        let (Some(repo), Some(search)) = (self.repo.clone(), self.search.as_mut()) else {
            return;
        };
        let Some(request) = search.begin() else {
            return;
        };
        log_api_call!(self.log_config, "Searching profiles for {:?}", request.term);

        let events = self.events.clone();
        tokio::spawn(async move {
            let result = request.token.run(repo.search_profiles(&request.term)).await;
            if !matches!(result, Err(ApiError::Cancelled)) {
                let _ = events.send(AppEvent::SearchResults {
                    generation: request.generation,
                    result,
                });
            }
        });
    }

    /// Apply a result delivered by a background task
    pub fn handle_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::CommentCount { post_id, result } => match result {
                Ok(n) => self.update_comment_count(post_id, n),
                Err(ApiError::Cancelled) => {}
                Err(e) => {
                    log::warn!("Comment count for post {} failed: {}", post_id, e);
                    self.feed.posts.count_failed(post_id);
                    if let Some(view) = self.profile_view.as_mut() {
                        view.posts.count_failed(post_id);
                    }
                }
            },
            AppEvent::SearchResults { generation, result } => {
                if let Some(search) = self.search.as_mut() {
                    search.apply(generation, result);
                }
            }
        }
    }

    fn update_comment_count(&mut self, post_id: i64, count: usize) {
        self.feed.posts.apply_count(post_id, Ok(count));
        if let Some(view) = self.profile_view.as_mut() {
            view.posts.apply_count(post_id, Ok(count));
        }
    }

    /// Carry out an action produced by the key handlers
    pub async fn perform(&mut self, action: Action) -> Result<()> {
        log_api_call!(self.log_config, "Performing {:?}", action);
        let Some(repo) = self.repo.clone() else {
            return Ok(());
        };

        match action {
            Action::SendSignInCode => self.send_sign_in_code(&repo).await,
            Action::VerifySignInCode => self.verify_sign_in_code(&repo).await,
            Action::SubmitProfileSetup => self.submit_profile_setup(&repo).await,
            Action::RetryGate => {
                let user = repo.backend().current_user();
                self.on_identity_change(user).await;
            }
            Action::Reload => self.reload().await,
            Action::SetFilter(filter) => {
                let result = self.feed.set_filter(&repo, filter).await;
                match result {
                    Ok(true) => {
                        self.save_filter_preference();
                        self.spawn_count_requests();
                    }
                    Ok(false) => {}
                    Err(e) => self.raise(&e),
                }
            }
            Action::Like(post_id) => self.like(&repo, post_id).await,
            Action::DeletePost(post_id) => self.delete_post(&repo, post_id).await,
            Action::OpenComments(post_id) => {
                let mut thread = CommentThread::new(post_id);
                let result = thread.load(&repo).await;
                match result {
                    Ok(n) => self.update_comment_count(post_id, n),
                    Err(e) if !e.is_cancelled() => thread.error = Some(alert_for(&e)),
                    Err(_) => {}
                }
                self.thread = Some(thread);
            }
            Action::SendComment => self.send_comment(&repo).await,
            Action::OpenProfile(profile_id) => self.open_profile(&repo, profile_id).await,
            Action::RunSearch => self.spawn_search(),
            Action::SubmitPost => self.submit_post(&repo).await,
            Action::SaveProfile => self.save_profile(&repo).await,
            Action::ReplaceImage(slot) => self.replace_image(&repo, slot).await,
            Action::RemoveImage(slot) => self.remove_image(&repo, slot).await,
            Action::OpenImage(post_id) => {
                if let Some(unit) = self.unit(post_id) {
                    if let Err(e) = unit.open_image() {
                        log::warn!("Failed to open {}: {}", unit.post.image_url, e);
                        self.set_message("Could not open the image in a browser");
                    }
                }
            }
            Action::Logout => {
                // The identity watch re-evaluates the gate once the provider
                // reports the signed-out state
                if let Err(e) = repo.backend().sign_out().await {
                    self.raise(&e);
                }
            }
        }
        Ok(())
    }

    async fn send_sign_in_code(&mut self, repo: &Repository) {
        let email = self.sign_in.email.trim().to_string();
        if email.is_empty() || !email.contains('@') {
            self.sign_in.error = Some("Enter the email address you sign in with".to_string());
            return;
        }
        self.sign_in.busy = true;
        self.sign_in.error = None;
        let result = repo.backend().start_sign_in(&email).await;
        self.sign_in.busy = false;

        match result {
            Ok(()) => {
                self.sign_in.code_sent = true;
                self.sign_in.message = Some(format!("A sign-in code was sent to {}", email));
            }
            Err(e) => self.sign_in.error = Some(alert_for(&e)),
        }
    }

    async fn verify_sign_in_code(&mut self, repo: &Repository) {
        let code = self.sign_in.code.trim().to_string();
        if code.is_empty() {
            return;
        }
        self.sign_in.busy = true;
        self.sign_in.error = None;
        let result = repo
            .backend()
            .complete_sign_in(self.sign_in.email.trim(), &code)
            .await;
        self.sign_in.busy = false;

        match result {
            Ok(user) => log::info!("Signed in as {}", user.id),
            Err(ApiError::Unauthorized(_)) => {
                self.sign_in.code.clear();
                self.sign_in.error = Some("That code is invalid or has expired".to_string());
            }
            Err(e) => {
                self.sign_in.code.clear();
                self.sign_in.error = Some(alert_for(&e));
            }
        }
    }

    async fn submit_profile_setup(&mut self, repo: &Repository) {
        if self.profile_setup.name.trim().is_empty() {
            self.profile_setup.error = Some("Please enter your name".to_string());
            return;
        }
        self.profile_setup.busy = true;
        let name = self.profile_setup.name.clone();
        let result = self.gate.complete_profile_setup(repo, &name).await;
        self.profile_setup.busy = false;

        match result {
            Ok(()) if self.gate.state() == GateState::Ready => {
                self.profile_setup = ProfileSetupForm::default();
                self.enter_ready().await;
            }
            Ok(()) => {}
            Err(e) => self.profile_setup.error = Some(alert_for(&e)),
        }
    }

    async fn like(&mut self, repo: &Repository, post_id: i64) {
        let Some(session) = self.gate.session_mut() else {
            self.alert = Some(alert_for(&ApiError::Unauthorized("sign in first".to_string())));
            return;
        };
        let unit = match self
            .profile_view
            .as_mut()
            .and_then(|v| v.posts.get_mut(post_id))
        {
            Some(unit) => unit,
            None => match self.feed.posts.get_mut(post_id) {
                Some(unit) => unit,
                None => return,
            },
        };

        let result = unit.like(repo, session).await;
        match result {
            Ok(LikeOutcome::Liked) => self.reload().await,
            Ok(LikeOutcome::AlreadyLiked) => {}
            Err(e) => self.raise(&e),
        }
    }

    async fn delete_post(&mut self, repo: &Repository, post_id: i64) {
        self.confirm_delete = None;
        let Some(session) = self.gate.session() else {
            return;
        };
        let Some(unit) = self
            .profile_view
            .as_ref()
            .and_then(|v| v.posts.get(post_id))
            .or_else(|| self.feed.posts.get(post_id))
        else {
            return;
        };

        let result = unit.delete(repo, session).await;
        match result {
            Ok(()) => {
                log::info!("Deleted post {}", post_id);
                self.set_message("Post deleted");
                self.reload().await;
            }
            Err(e) => self.raise(&e),
        }
    }

    async fn send_comment(&mut self, repo: &Repository) {
        let user = self.gate.user().cloned();
        let Some(thread) = self.thread.as_mut() else {
            return;
        };
        if thread.buffer.trim().is_empty() {
            return;
        }

        let result = thread.submit(repo, user.as_ref()).await;
        match result {
            Ok(_) => {
                let (post_id, count) = (thread.post_id, thread.comments.len());
                self.update_comment_count(post_id, count);
            }
            Err(e) => self.raise(&e),
        }
    }

    async fn open_profile(&mut self, repo: &Repository, profile_id: Uuid) {
        self.search = None;
        self.thread = None;
        let mut view = ProfileView::new(profile_id);
        let result = view.load(repo).await;
        if let Err(e) = result {
            if !e.is_cancelled() {
                view.error = Some(alert_for(&e));
            }
        }
        self.profile_view = Some(view);
        self.spawn_count_requests();
    }

    async fn submit_post(&mut self, repo: &Repository) {
        let Some(session) = self.gate.session() else {
            return;
        };
        let Some(composer) = self.composer.as_mut() else {
            return;
        };
        composer.error = None;

        let result = composer.submit(repo, session).await;
        match result {
            Ok(post) => {
                log::info!("Created post {}", post.id);
                self.composer = None;
                self.set_message("Posted");
                self.reload().await;
            }
            Err(e) => composer.error = Some(alert_for(&e)),
        }
    }

    async fn save_profile(&mut self, repo: &Repository) {
        let Some(editor) = self.editor.as_mut() else {
            return;
        };
        editor.error = None;
        let result = editor.save_details(repo).await;
        self.after_profile_edit(result, "Profile saved").await;
    }

    async fn replace_image(&mut self, repo: &Repository, slot: ImageSlot) {
        let Some(editor) = self.editor.as_mut() else {
            return;
        };
        editor.error = None;
        let result = editor.replace_image(repo, slot).await;
        self.after_profile_edit(result, "Image updated").await;
    }

    async fn remove_image(&mut self, repo: &Repository, slot: ImageSlot) {
        let Some(editor) = self.editor.as_mut() else {
            return;
        };
        editor.error = None;
        let result = editor.remove_image(repo, slot).await;
        self.after_profile_edit(result, "Image removed").await;
    }

    /// Refresh the viewer and the gate's snapshot after an edit
    async fn after_profile_edit(
        &mut self,
        result: crate::api::ApiResult<teahouse_types::Profile>,
        done: &str,
    ) {
        match result {
            Ok(profile) => {
                self.gate.set_profile(profile);
                self.set_message(done);
                self.reload().await;
            }
            Err(e) => {
                if let Some(editor) = self.editor.as_mut() {
                    editor.error = Some(alert_for(&e));
                }
            }
        }
    }

    /// Open the editor for the signed-in user's own profile
    pub fn open_editor(&mut self) {
        let own = self
            .profile_view
            .as_ref()
            .is_some_and(|v| v.is_own(self.gate.user()));
        if !own {
            return;
        }
        if let Some(profile) = self.profile_view.as_ref().and_then(|v| v.profile.clone()) {
            self.editor = Some(ProfileEditor::new(profile));
        }
    }
}

/// User-facing alert text for a failed operation
pub fn alert_for(error: &ApiError) -> String {
    let modifier = get_modifier_key_name();
    match error.category() {
        ErrorCategory::Permission => match error {
            ApiError::Unauthorized(_) => "Please sign in first".to_string(),
            _ => "Action failed: you may not have permission".to_string(),
        },
        ErrorCategory::Network => format!(
            "Network Error: Connection failed. Check your network and try again (Press {}+R to retry)",
            modifier
        ),
        ErrorCategory::Validation => match error {
            ApiError::InvalidRecord(msg) | ApiError::BadRequest(msg) => {
                format!("Validation Error: {}", msg)
            }
            other => format!("Validation Error: {}", other),
        },
        ErrorCategory::Backend => format!(
            "Something went wrong: {} (Press {}+R to retry)",
            error, modifier
        ),
        ErrorCategory::Cancelled => String::new(),
    }
}

#[cfg(test)]
mod tests;
