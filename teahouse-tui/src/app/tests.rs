use super::*;
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use std::sync::Arc;

use teahouse_types::{Post, Profile};

use crate::api::MemoryBackend;

/// Helper to create a KeyEvent
fn key_event(code: KeyCode) -> KeyEvent {
    let mut event = KeyEvent::new(code, KeyModifiers::empty());
    event.kind = KeyEventKind::Press;
    event
}

fn ctrl_event(c: char) -> KeyEvent {
    KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL)
}

fn type_text(app: &mut App, text: &str) -> Option<Action> {
    let mut last = None;
    for c in text.chars() {
        last = app.handle_key_event(key_event(KeyCode::Char(c))).unwrap();
    }
    last
}

struct Fixture {
    app: App,
    backend: Arc<MemoryBackend>,
    sara: Profile,
    own_post: Post,
    other_post: Post,
    _events: mpsc::UnboundedReceiver<AppEvent>,
}

/// Sara signed in with a profile; Omar's post is older than Sara's
async fn ready_app() -> Fixture {
    let backend = Arc::new(MemoryBackend::new());
    let sara_user = backend.register_user("sara@example.com", Some("Sara"));
    let omar_user = backend.register_user("omar@example.com", Some("Omar"));
    let sara = backend.seed_profile(&sara_user, "Sara");
    let omar = backend.seed_profile(&omar_user, "Omar");
    let other_post = backend.seed_post(&omar, "memory://omar", "cardamom #coffee", 3);
    let own_post = backend.seed_post(&sara, "memory://sara", "mint #tea and #rain", 0);
    backend.sign_in_as(Some(&sara_user));

    let shared: SharedBackend = backend.clone();
    let (mut app, events) = App::new(Some(shared), None);
    app.on_identity_change(Some(sara_user)).await;
    assert_eq!(app.screen(), GateState::Ready);

    Fixture {
        app,
        backend,
        sara,
        own_post,
        other_post,
        _events: events,
    }
}

#[test]
fn test_misconfigured_only_quits() {
    let (mut app, _events) = App::new(None, None);
    assert_eq!(app.screen(), GateState::Misconfigured);

    let action = app.handle_key_event(key_event(KeyCode::Char('/'))).unwrap();
    assert_eq!(action, None);
    assert!(app.search.is_none());
    assert!(app.running);

    app.handle_key_event(key_event(KeyCode::Char('q'))).unwrap();
    assert!(!app.running);
}

#[test]
fn test_release_events_are_ignored() {
    let (mut app, _events) = App::new(None, None);
    let mut event = key_event(KeyCode::Char('q'));
    event.kind = KeyEventKind::Release;
    app.handle_key_event(event).unwrap();
    assert!(app.running);
}

#[tokio::test]
async fn test_sign_in_then_profile_setup() {
    let backend = Arc::new(MemoryBackend::new());
    let shared: SharedBackend = backend.clone();
    let (mut app, _events) = App::new(Some(shared), None);
    app.on_identity_change(None).await;
    assert_eq!(app.screen(), GateState::Unauthenticated);

    type_text(&mut app, "nadia@example.com");
    let action = app.handle_key_event(key_event(KeyCode::Enter)).unwrap();
    assert_eq!(action, Some(Action::SendSignInCode));
    app.perform(Action::SendSignInCode).await.unwrap();
    assert!(app.sign_in.code_sent);

    type_text(&mut app, "123456");
    assert_eq!(app.sign_in.code, "123456");
    let action = app.handle_key_event(key_event(KeyCode::Enter)).unwrap();
    assert_eq!(action, Some(Action::VerifySignInCode));
    app.perform(Action::VerifySignInCode).await.unwrap();

    let user = backend.current_user();
    assert!(user.is_some());
    app.on_identity_change(user).await;
    assert_eq!(app.screen(), GateState::NeedsProfileSetup);
    assert_eq!(app.profile_setup.name, "nadia");

    type_text(&mut app, " K");
    let action = app.handle_key_event(key_event(KeyCode::Enter)).unwrap();
    assert_eq!(action, Some(Action::SubmitProfileSetup));
    app.perform(Action::SubmitProfileSetup).await.unwrap();
    assert_eq!(app.screen(), GateState::Ready);
    assert_eq!(app.gate.profile().unwrap().full_name, "nadia K");
}

#[tokio::test]
async fn test_wrong_code_shows_error_and_stays_signed_out() {
    let backend = Arc::new(MemoryBackend::new());
    let shared: SharedBackend = backend.clone();
    let (mut app, _events) = App::new(Some(shared), None);
    app.on_identity_change(None).await;

    app.sign_in.email = "nadia@example.com".to_string();
    app.perform(Action::SendSignInCode).await.unwrap();
    app.sign_in.code = "000000".to_string();
    app.perform(Action::VerifySignInCode).await.unwrap();

    assert!(app.sign_in.error.is_some());
    assert!(app.sign_in.code.is_empty());
    assert!(backend.current_user().is_none());

    // Esc goes back to the email field
    app.handle_key_event(key_event(KeyCode::Esc)).unwrap();
    assert!(!app.sign_in.code_sent);
    assert!(app.running);
}

#[tokio::test]
async fn test_help_blocks_other_keys() {
    let mut f = ready_app().await;
    f.app.handle_key_event(key_event(KeyCode::Char('?'))).unwrap();
    assert!(f.app.show_help);

    f.app.handle_key_event(key_event(KeyCode::Char('q'))).unwrap();
    assert!(f.app.running, "q is swallowed while help is open");

    f.app.handle_key_event(key_event(KeyCode::Esc)).unwrap();
    assert!(!f.app.show_help);
}

#[tokio::test]
async fn test_like_sends_one_increment() {
    let mut f = ready_app().await;
    assert_eq!(f.app.feed.selected_id(), Some(f.own_post.id));

    f.app.handle_key_event(key_event(KeyCode::Char('j'))).unwrap();
    let action = f.app.handle_key_event(key_event(KeyCode::Char('l'))).unwrap();
    assert_eq!(action, Some(Action::Like(f.other_post.id)));
    f.app.perform(Action::Like(f.other_post.id)).await.unwrap();

    assert_eq!(f.backend.rpc_calls(), 1);
    let unit = f.app.feed.posts.get(f.other_post.id).unwrap();
    assert_eq!(unit.post.likes_count, 4);
    assert!(unit.is_liked(f.app.gate.session()));

    let action = f.app.handle_key_event(key_event(KeyCode::Char('l'))).unwrap();
    assert_eq!(action, None);
    assert_eq!(f.backend.rpc_calls(), 1);
}

#[tokio::test]
async fn test_failed_like_raises_alert_and_unlocks() {
    let mut f = ready_app().await;
    f.backend.fail_on("rpc");
    f.app.perform(Action::Like(f.other_post.id)).await.unwrap();

    assert!(f.app.alert.is_some());
    let unit = f.app.feed.posts.get(f.other_post.id).unwrap();
    assert!(!unit.is_liked(f.app.gate.session()));

    // Alert swallows navigation until dismissed
    f.app.handle_key_event(key_event(KeyCode::Char('j'))).unwrap();
    assert_eq!(f.app.feed.selected, 0);
    f.app.handle_key_event(key_event(KeyCode::Esc)).unwrap();
    assert!(f.app.alert.is_none());
}

#[tokio::test]
async fn test_delete_requires_ownership_and_confirmation() {
    let mut f = ready_app().await;

    // Someone else's post: no confirmation offered
    f.app.handle_key_event(key_event(KeyCode::Char('j'))).unwrap();
    f.app.handle_key_event(key_event(KeyCode::Char('d'))).unwrap();
    assert!(f.app.confirm_delete.is_none());
    assert!(f.app.message.is_some());

    f.app.handle_key_event(key_event(KeyCode::Char('k'))).unwrap();
    f.app.handle_key_event(key_event(KeyCode::Char('d'))).unwrap();
    assert_eq!(
        f.app.confirm_delete,
        Some(DeleteConfirmation {
            post_id: f.own_post.id
        })
    );

    f.app.handle_key_event(key_event(KeyCode::Char('n'))).unwrap();
    assert!(f.app.confirm_delete.is_none());

    f.app.handle_key_event(key_event(KeyCode::Char('d'))).unwrap();
    let action = f.app.handle_key_event(key_event(KeyCode::Char('y'))).unwrap();
    assert_eq!(action, Some(Action::DeletePost(f.own_post.id)));
    f.app.perform(Action::DeletePost(f.own_post.id)).await.unwrap();

    assert!(f.app.confirm_delete.is_none());
    assert!(f.app.feed.posts.get(f.own_post.id).is_none());
    assert_eq!(f.app.feed.posts.len(), 1);
}

#[tokio::test]
async fn test_tab_switches_filter() {
    let mut f = ready_app().await;
    let action = f.app.handle_key_event(key_event(KeyCode::Tab)).unwrap();
    assert_eq!(action, Some(Action::SetFilter(FeedFilter::Trending)));
    f.app.perform(Action::SetFilter(FeedFilter::Trending)).await.unwrap();

    assert_eq!(f.app.feed.filter(), FeedFilter::Trending);
    assert_eq!(f.app.feed.selected_id(), Some(f.other_post.id));
}

#[tokio::test]
async fn test_filter_preference_persists_per_user() {
    let dir = tempfile::TempDir::new().unwrap();
    let mut f = ready_app().await;
    f.app.config_manager = Some(ConfigManager::with_dir(dir.path()).unwrap());
    f.app.perform(Action::SetFilter(FeedFilter::Trending)).await.unwrap();

    let prefs = f
        .app
        .config_manager
        .as_ref()
        .unwrap()
        .load_preferences(f.sara.id)
        .unwrap()
        .unwrap();
    assert_eq!(prefs.feed_filter, FeedFilter::Trending);
}

#[tokio::test]
async fn test_short_search_never_reaches_backend() {
    let mut f = ready_app().await;
    f.app.handle_key_event(key_event(KeyCode::Char('/'))).unwrap();
    assert!(f.app.search.is_some());

    let selects = f.backend.select_calls();
    let action = type_text(&mut f.app, "s");
    assert_eq!(action, Some(Action::RunSearch));
    f.app.perform(Action::RunSearch).await.unwrap();
    tokio::task::yield_now().await;

    assert_eq!(f.backend.select_calls(), selects);
    assert!(f.app.search.as_ref().unwrap().results.is_empty());

    f.app.handle_key_event(key_event(KeyCode::Esc)).unwrap();
    assert!(f.app.search.is_none());
}

#[tokio::test]
async fn test_search_results_open_profile() {
    let mut f = ready_app().await;
    f.app.handle_key_event(key_event(KeyCode::Char('/'))).unwrap();
    type_text(&mut f.app, "om");

    let search = f.app.search.as_mut().unwrap();
    search.search(f.app.repo.as_ref().unwrap()).await.unwrap();
    assert_eq!(search.results.len(), 1);

    let action = f.app.handle_key_event(key_event(KeyCode::Enter)).unwrap();
    let Some(Action::OpenProfile(id)) = action else {
        panic!("expected OpenProfile, got {:?}", action);
    };
    f.app.perform(Action::OpenProfile(id)).await.unwrap();

    assert!(f.app.search.is_none());
    let view = f.app.profile_view.as_ref().unwrap();
    assert_eq!(view.profile.as_ref().unwrap().full_name, "Omar");
    assert_eq!(view.post_count(), 1);
    assert!(!view.is_own(f.app.gate.user()));

    // Editing is owner-only
    f.app.handle_key_event(key_event(KeyCode::Char('e'))).unwrap();
    assert!(f.app.editor.is_none());

    f.app.handle_key_event(key_event(KeyCode::Esc)).unwrap();
    assert!(f.app.profile_view.is_none());
}

#[tokio::test]
async fn test_comment_thread_compose_and_send() {
    let mut f = ready_app().await;
    let action = f.app.handle_key_event(key_event(KeyCode::Char('c'))).unwrap();
    assert_eq!(action, Some(Action::OpenComments(f.own_post.id)));
    f.app.perform(Action::OpenComments(f.own_post.id)).await.unwrap();
    assert!(f.app.thread.as_ref().unwrap().comments.is_empty());

    // Keys go to the buffer while the thread is open
    type_text(&mut f.app, "lovely q");
    assert!(f.app.running);
    f.app.handle_key_event(key_event(KeyCode::Char(' '))).unwrap();
    f.app.handle_key_event(ctrl_event('e')).unwrap();
    assert_eq!(f.app.thread.as_ref().unwrap().buffer, "lovely q :)");

    let action = f.app.handle_key_event(key_event(KeyCode::Enter)).unwrap();
    assert_eq!(action, Some(Action::SendComment));
    f.app.perform(Action::SendComment).await.unwrap();

    let thread = f.app.thread.as_ref().unwrap();
    assert_eq!(thread.comments.len(), 1);
    assert_eq!(thread.comments[0].author_name, "Sara");
    assert!(thread.buffer.is_empty());
    assert_eq!(
        f.app.feed.posts.get(f.own_post.id).unwrap().comment_count.value(),
        Some(1)
    );

    // Reply prefills a mention
    f.app.handle_key_event(key_event(KeyCode::Down)).unwrap();
    f.app.handle_key_event(key_event(KeyCode::Tab)).unwrap();
    assert_eq!(f.app.thread.as_ref().unwrap().buffer, "@Sara ");

    f.app.handle_key_event(key_event(KeyCode::Esc)).unwrap();
    assert!(f.app.thread.is_none());
}

#[tokio::test]
async fn test_empty_comment_is_not_sent() {
    let mut f = ready_app().await;
    f.app.perform(Action::OpenComments(f.own_post.id)).await.unwrap();
    type_text(&mut f.app, "   ");
    f.app.perform(Action::SendComment).await.unwrap();

    assert!(f.app.alert.is_none());
    assert!(f.backend.rows(crate::api::Table::Comments).is_empty());
}

#[tokio::test]
async fn test_hashtag_key_cycles_focus() {
    let mut f = ready_app().await;
    f.app.handle_key_event(key_event(KeyCode::Char('h'))).unwrap();
    assert_eq!(f.app.feed.hashtag_focus(), Some("#tea"));
    assert_eq!(f.app.feed.visible().len(), 1);

    f.app.handle_key_event(key_event(KeyCode::Char('h'))).unwrap();
    assert_eq!(f.app.feed.hashtag_focus(), Some("#rain"));

    f.app.handle_key_event(key_event(KeyCode::Esc)).unwrap();
    assert_eq!(f.app.feed.hashtag_focus(), None);
    assert_eq!(f.app.feed.visible().len(), 2);
}

#[tokio::test]
async fn test_composer_rejects_missing_file_locally() {
    let mut f = ready_app().await;
    f.app.handle_key_event(key_event(KeyCode::Char('n'))).unwrap();
    assert!(f.app.composer.is_some());

    type_text(&mut f.app, "/definitely/not/here.jpg");
    let action = f.app.handle_key_event(key_event(KeyCode::Enter)).unwrap();
    assert_eq!(action, Some(Action::SubmitPost));
    f.app.perform(Action::SubmitPost).await.unwrap();

    let composer = f.app.composer.as_ref().unwrap();
    assert!(composer.error.is_some());
    assert!(f.backend.object_names(teahouse_types::Bucket::PostImages).is_empty());
}

#[tokio::test]
async fn test_failed_insert_keeps_upload_and_shows_error() {
    let mut f = ready_app().await;
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("steam.jpg");
    std::fs::write(&path, [0xff, 0xd8, 0xff]).unwrap();

    f.app.handle_key_event(key_event(KeyCode::Char('n'))).unwrap();
    type_text(&mut f.app, &path.display().to_string());
    f.backend.fail_on("insert:posts");
    f.app.perform(Action::SubmitPost).await.unwrap();

    let composer = f.app.composer.as_ref().unwrap();
    assert!(composer.error.is_some());
    assert!(!composer.busy);
    // Nothing compensates for the upload
    assert_eq!(
        f.backend.object_names(teahouse_types::Bucket::PostImages).len(),
        1
    );
    assert_eq!(f.backend.rows(crate::api::Table::Posts).len(), 2);
}

#[tokio::test]
async fn test_count_error_reaches_feed_while_profile_is_open() {
    use crate::app::post::CommentCount;

    let mut f = ready_app().await;
    f.app.perform(Action::OpenProfile(f.sara.id)).await.unwrap();
    assert!(f.app.profile_view.is_some());

    f.app.handle_event(AppEvent::CommentCount {
        post_id: f.own_post.id,
        result: Err(ApiError::Api("count failed".to_string())),
    });

    let feed_unit = f.app.feed.posts.get(f.own_post.id).unwrap();
    assert_eq!(feed_unit.comment_count, CommentCount::Failed);
    let view = f.app.profile_view.as_ref().unwrap();
    let view_unit = view.posts.get(f.own_post.id).unwrap();
    assert_eq!(view_unit.comment_count, CommentCount::Failed);

    // A late result still lands in both lists
    f.app.handle_event(AppEvent::CommentCount {
        post_id: f.own_post.id,
        result: Ok(2),
    });
    assert_eq!(
        f.app.feed.posts.get(f.own_post.id).unwrap().comment_count.value(),
        Some(2)
    );
}

#[tokio::test]
async fn test_moving_selection_restarts_hashtag_cycle() {
    let mut f = ready_app().await;
    f.app.handle_key_event(key_event(KeyCode::Char('h'))).unwrap();
    assert_eq!(f.app.feed.hashtag_focus(), Some("#tea"));
    assert_eq!(f.app.hashtag_cursor, 1);

    f.app.handle_key_event(key_event(KeyCode::Char('j'))).unwrap();
    assert_eq!(f.app.hashtag_cursor, 0);

    // The first tag again, not the second
    f.app.handle_key_event(key_event(KeyCode::Char('h'))).unwrap();
    assert_eq!(f.app.feed.hashtag_focus(), Some("#tea"));
}

#[tokio::test]
async fn test_logout_returns_to_sign_in() {
    let mut f = ready_app().await;
    let action = f.app.handle_key_event(key_event(KeyCode::Char('L'))).unwrap();
    assert_eq!(action, Some(Action::Logout));
    f.app.perform(Action::Logout).await.unwrap();

    let user = f.backend.current_user();
    assert!(user.is_none());
    f.app.on_identity_change(user).await;
    assert_eq!(f.app.screen(), GateState::Unauthenticated);
    assert!(f.app.feed.posts.is_empty());
}

#[test]
fn test_alert_text_by_category() {
    assert_eq!(
        alert_for(&ApiError::Unauthorized("sign in first".to_string())),
        "Please sign in first"
    );
    assert!(alert_for(&ApiError::Forbidden("x".to_string())).contains("permission"));
    assert!(alert_for(&ApiError::InvalidRecord("comment is empty".to_string()))
        .starts_with("Validation Error"));
    assert!(alert_for(&ApiError::Api("boom".to_string())).contains("boom"));
    assert!(alert_for(&ApiError::Cancelled).is_empty());
}
