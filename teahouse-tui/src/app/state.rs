use std::time::Instant;

use tokio::sync::mpsc;
use uuid::Uuid;

use teahouse_types::{ImageSlot, Profile};

use crate::api::{ApiResult, Repository};
use crate::app::comments::CommentThread;
use crate::app::feed::FeedController;
use crate::app::gate::{Gate, SignInForm};
use crate::app::profile::{ProfileEditor, ProfileView};
use crate::app::search::SearchController;
use crate::app::upload::PostComposer;
use crate::config::ConfigManager;
use crate::logging::LogConfig;

/// Get platform-appropriate modifier key name for display
/// Returns "Cmd" on macOS, "Ctrl" on other platforms
#[cfg(target_os = "macos")]
pub fn get_modifier_key_name() -> &'static str {
    "Cmd"
}

#[cfg(not(target_os = "macos"))]
pub fn get_modifier_key_name() -> &'static str {
    "Ctrl"
}

/// Work a key press asks for. Handlers only touch local state; anything that
/// talks to the backend comes back as an action for the main loop to await.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    SendSignInCode,
    VerifySignInCode,
    SubmitProfileSetup,
    /// Re-check the session after a failed gate evaluation
    RetryGate,
    Reload,
    SetFilter(teahouse_types::FeedFilter),
    Like(i64),
    DeletePost(i64),
    OpenComments(i64),
    SendComment,
    OpenProfile(Uuid),
    RunSearch,
    SubmitPost,
    SaveProfile,
    ReplaceImage(ImageSlot),
    RemoveImage(ImageSlot),
    OpenImage(i64),
    Logout,
}

/// Results of work spawned off the main loop
#[derive(Debug)]
pub enum AppEvent {
    CommentCount {
        post_id: i64,
        result: ApiResult<usize>,
    },
    SearchResults {
        generation: u64,
        result: ApiResult<Vec<Profile>>,
    },
}

/// Profile setup form shown on first login
#[derive(Debug, Clone, Default)]
pub struct ProfileSetupForm {
    pub name: String,
    pub busy: bool,
    pub error: Option<String>,
}

/// Pending delete confirmation for a post
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeleteConfirmation {
    pub post_id: i64,
}

pub struct App {
    pub running: bool,
    pub gate: Gate,
    pub repo: Option<Repository>,
    pub config_manager: Option<ConfigManager>,
    pub log_config: LogConfig,

    pub sign_in: SignInForm,
    pub profile_setup: ProfileSetupForm,

    pub feed: FeedController,
    /// Set when the feed should reload after the next draw
    pub pending_load: bool,
    /// Hashtag cycled to by the last `h` press on the selected post
    pub hashtag_cursor: usize,

    pub profile_view: Option<ProfileView>,
    pub thread: Option<CommentThread>,
    pub search: Option<SearchController>,
    pub composer: Option<PostComposer>,
    pub editor: Option<ProfileEditor>,
    pub confirm_delete: Option<DeleteConfirmation>,
    pub alert: Option<String>,
    pub show_help: bool,
    /// Transient status line, cleared after a few seconds
    pub message: Option<(String, Instant)>,

    pub(crate) events: mpsc::UnboundedSender<AppEvent>,
}
