use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use teahouse_types::FeedFilter;

use crate::app::gate::GateState;
use crate::app::profile::EditorField;
use crate::app::search::SearchController;
use crate::app::state::{Action, App, DeleteConfirmation};
use crate::app::upload::{ComposerField, PostComposer};
use crate::content::{self, Segment};
use crate::emoji;
use crate::{log_key_event, log_screen_state};

fn ctrl(key: &KeyEvent, c: char) -> bool {
    key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char(c)
}

/// Map a key press to local state changes, returning the backend work it
/// asks for, if any
pub fn handle_key_event(app: &mut App, key: KeyEvent) -> Result<Option<Action>> {
    if key.kind != KeyEventKind::Press {
        return Ok(None);
    }
    if ctrl(&key, 'c') {
        app.running = false;
        return Ok(None);
    }

    match app.screen() {
        GateState::Misconfigured => {
            if matches!(key.code, KeyCode::Char('q') | KeyCode::Esc) {
                app.running = false;
            }
            Ok(None)
        }
        GateState::Loading => Ok(handle_loading_keys(app, key)),
        GateState::Unauthenticated => Ok(handle_sign_in_keys(app, key)),
        GateState::NeedsProfileSetup => Ok(handle_profile_setup_keys(app, key)),
        GateState::Ready => handle_main_keys(app, key),
    }
}

fn handle_loading_keys(app: &mut App, key: KeyEvent) -> Option<Action> {
    if ctrl(&key, 'r') {
        app.alert = None;
        return Some(Action::RetryGate);
    }
    match key.code {
        KeyCode::Char('q') => app.running = false,
        KeyCode::Esc => app.alert = None,
        _ => {}
    }
    None
}

fn handle_sign_in_keys(app: &mut App, key: KeyEvent) -> Option<Action> {
    let form = &mut app.sign_in;
    if form.busy {
        return None;
    }
    match key.code {
        KeyCode::Enter if form.code_sent => Some(Action::VerifySignInCode),
        KeyCode::Enter => Some(Action::SendSignInCode),
        KeyCode::Esc if form.code_sent => {
            // Back to the email field
            form.code_sent = false;
            form.code.clear();
            form.message = None;
            form.error = None;
            None
        }
        KeyCode::Esc => {
            app.running = false;
            None
        }
        KeyCode::Backspace => {
            form.active_field().pop();
            None
        }
        KeyCode::Char(c) => {
            form.active_field().push(c);
            None
        }
        _ => None,
    }
}

fn handle_profile_setup_keys(app: &mut App, key: KeyEvent) -> Option<Action> {
    let form = &mut app.profile_setup;
    if form.busy {
        return None;
    }
    match key.code {
        KeyCode::Enter => Some(Action::SubmitProfileSetup),
        KeyCode::Esc => Some(Action::Logout),
        KeyCode::Backspace => {
            form.name.pop();
            None
        }
        KeyCode::Char(c) => {
            form.name.push(c);
            form.error = None;
            None
        }
        _ => None,
    }
}

fn handle_main_keys(app: &mut App, key: KeyEvent) -> Result<Option<Action>> {
    // Priority 1: Help
    if app.show_help {
        if matches!(key.code, KeyCode::Esc | KeyCode::Char('?')) {
            app.toggle_help();
        }
        return Ok(None);
    }

    // Priority 2: Alert
    if app.alert.is_some() {
        if ctrl(&key, 'r') {
            app.alert = None;
            return Ok(Some(Action::Reload));
        }
        if matches!(key.code, KeyCode::Esc | KeyCode::Enter) {
            app.alert = None;
        }
        return Ok(None);
    }

    // Priority 3: Delete confirmation
    if let Some(DeleteConfirmation { post_id }) = app.confirm_delete {
        return Ok(match key.code {
            KeyCode::Char('y') | KeyCode::Char('Y') => Some(Action::DeletePost(post_id)),
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                app.confirm_delete = None;
                None
            }
            _ => None,
        });
    }

    // Priority 4: Profile editor
    if app.editor.is_some() {
        return Ok(handle_editor_keys(app, key));
    }

    // Priority 5: Composer
    if app.composer.is_some() {
        return Ok(handle_composer_keys(app, key));
    }

    // Priority 6: Search
    if app.search.is_some() {
        return Ok(handle_search_keys(app, key));
    }

    // Priority 7: Comment thread
    if app.thread.is_some() {
        return Ok(handle_thread_keys(app, key));
    }

    Ok(handle_view_keys(app, key))
}

fn handle_editor_keys(app: &mut App, key: KeyEvent) -> Option<Action> {
    let editor = app.editor.as_mut()?;
    if editor.busy {
        return None;
    }

    if editor.confirm_remove {
        match key.code {
            KeyCode::Char('y') | KeyCode::Char('Y') => return Some(Action::RemoveImage(editor.slot)),
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                editor.confirm_remove = false;
            }
            _ => {}
        }
        return None;
    }

    if ctrl(&key, 's') {
        return Some(Action::SaveProfile);
    }
    if ctrl(&key, 't') {
        editor.slot = editor.slot.toggle();
        return None;
    }
    if ctrl(&key, 'u') {
        return Some(Action::ReplaceImage(editor.slot));
    }
    if ctrl(&key, 'd') {
        if editor.profile.image(editor.slot).is_some() {
            editor.confirm_remove = true;
        } else {
            editor.error = Some(format!("No {} image to remove", editor.slot.as_str()));
        }
        return None;
    }

    match key.code {
        KeyCode::Esc => {
            app.editor = None;
            log_screen_state!(app.log_config, "Closed profile editor");
        }
        KeyCode::Tab => editor.next_field(),
        _ => match editor.field {
            EditorField::Name => edit_line(&mut editor.name, key),
            EditorField::ImagePath => {
                if key.code == KeyCode::Enter {
                    return Some(Action::ReplaceImage(editor.slot));
                }
                edit_line(&mut editor.image_path, key);
            }
            EditorField::Bio => {
                editor.bio.input(key);
            }
        },
    }
    None
}

fn handle_composer_keys(app: &mut App, key: KeyEvent) -> Option<Action> {
    let composer = app.composer.as_mut()?;
    if composer.busy {
        return None;
    }
    if ctrl(&key, 's') {
        return Some(Action::SubmitPost);
    }

    match key.code {
        KeyCode::Esc => {
            app.composer = None;
            log_screen_state!(app.log_config, "Closed composer");
        }
        KeyCode::Tab => composer.toggle_field(),
        KeyCode::Enter if composer.field == ComposerField::Path => {
            return Some(Action::SubmitPost);
        }
        _ => match composer.field {
            ComposerField::Path => edit_line(&mut composer.path, key),
            ComposerField::Caption => {
                composer.caption.input(key);
            }
        },
    }
    None
}

fn handle_search_keys(app: &mut App, key: KeyEvent) -> Option<Action> {
    let search = app.search.as_mut()?;
    match key.code {
        KeyCode::Esc => {
            app.search = None;
            None
        }
        KeyCode::Down => {
            search.select_next();
            None
        }
        KeyCode::Up => {
            search.select_previous();
            None
        }
        KeyCode::Enter => {
            let id = search.choose()?;
            Some(Action::OpenProfile(id))
        }
        KeyCode::Backspace => {
            search.pop_char();
            Some(Action::RunSearch)
        }
        KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
            search.push_char(c);
            Some(Action::RunSearch)
        }
        _ => None,
    }
}

fn handle_thread_keys(app: &mut App, key: KeyEvent) -> Option<Action> {
    let thread = app.thread.as_mut()?;
    if thread.sending {
        return None;
    }
    if ctrl(&key, 'r') {
        return Some(Action::OpenComments(thread.post_id));
    }
    if ctrl(&key, 'e') {
        let catalog = emoji::catalog();
        if let Some(entry) = catalog.get(thread.emoji_index % catalog.len()) {
            thread.append_emoji(entry);
        }
        return None;
    }

    match key.code {
        KeyCode::Esc => {
            app.thread = None;
            log_screen_state!(app.log_config, "Closed comment thread");
            None
        }
        KeyCode::Enter => Some(Action::SendComment),
        KeyCode::Up => {
            thread.select_previous();
            None
        }
        KeyCode::Down => {
            thread.select_next();
            None
        }
        KeyCode::Left => {
            let len = emoji::catalog().len();
            thread.emoji_index = (thread.emoji_index + len - 1) % len;
            None
        }
        KeyCode::Right => {
            thread.emoji_index = (thread.emoji_index + 1) % emoji::catalog().len();
            None
        }
        KeyCode::Tab => {
            thread.reply_to_selected();
            None
        }
        KeyCode::Backspace => {
            thread.buffer.pop();
            None
        }
        KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
            thread.buffer.push(c);
            None
        }
        _ => None,
    }
}

/// Feed or profile view, no overlay open
fn handle_view_keys(app: &mut App, key: KeyEvent) -> Option<Action> {
    log_key_event!(app.log_config, "view key={:?}", key.code);
    if ctrl(&key, 'r') {
        return Some(Action::Reload);
    }

    let in_profile = app.profile_view.is_some();
    match key.code {
        KeyCode::Char('q') => app.running = false,
        KeyCode::Char('?') => app.toggle_help(),
        KeyCode::Char('j') | KeyCode::Down => app.select_next_post(),
        KeyCode::Char('k') | KeyCode::Up => app.select_previous_post(),
        KeyCode::Tab if !in_profile => {
            return Some(Action::SetFilter(app.feed.filter().toggle()));
        }
        KeyCode::Char('1') if !in_profile => return Some(Action::SetFilter(FeedFilter::Recency)),
        KeyCode::Char('2') if !in_profile => return Some(Action::SetFilter(FeedFilter::Trending)),
        KeyCode::Char('r') => {
            app.feed.loading = true;
            app.pending_load = true;
        }
        KeyCode::Char('l') => {
            let unit = app.selected_unit()?;
            if unit.is_liked(app.gate.session()) {
                app.set_message("Already liked");
                return None;
            }
            return Some(Action::Like(unit.id()));
        }
        KeyCode::Char('c') | KeyCode::Enter => {
            return app.selected_post_id().map(Action::OpenComments);
        }
        KeyCode::Char('d') => {
            let unit = app.selected_unit()?;
            if unit.can_delete(app.gate.user()) {
                app.confirm_delete = Some(DeleteConfirmation { post_id: unit.id() });
            } else {
                app.set_message("Only the author can delete this post");
            }
        }
        KeyCode::Char('o') => return app.selected_post_id().map(Action::OpenImage),
        KeyCode::Char('p') => {
            let author = app.selected_unit()?.post.user_id;
            return Some(Action::OpenProfile(author));
        }
        KeyCode::Char('P') => return app.gate.user().map(|u| Action::OpenProfile(u.id)),
        KeyCode::Char('e') if in_profile => app.open_editor(),
        KeyCode::Char('n') => {
            if app.gate.profile().is_some() {
                app.composer = Some(PostComposer::new());
            }
        }
        KeyCode::Char('/') => app.search = Some(SearchController::new()),
        KeyCode::Char('h') => cycle_hashtag(app),
        KeyCode::Esc => {
            if in_profile {
                app.profile_view = None;
            } else if app.feed.hashtag_focus().is_some() {
                app.feed.clear_focus();
                app.hashtag_cursor = 0;
            }
        }
        KeyCode::Char('L') => return Some(Action::Logout),
        _ => {}
    }
    None
}

/// Activate the next hashtag of the selected post, focusing the feed on it
fn cycle_hashtag(app: &mut App) {
    let tags: Vec<Segment> = app
        .selected_unit()
        .map(|unit| content::parse(unit.post.caption.as_deref()))
        .unwrap_or_default()
        .into_iter()
        .filter(Segment::is_interactive)
        .collect();
    if tags.is_empty() {
        app.set_message("No hashtags on this post");
        return;
    }

    let segment = &tags[app.hashtag_cursor % tags.len()];
    app.hashtag_cursor += 1;

    let mut focus = None;
    let mut on_click = |tag: &str| focus = Some(tag.to_string());
    segment.activate(Some(&mut on_click as &mut dyn FnMut(&str)));
    if let Some(tag) = focus {
        app.profile_view = None;
        app.feed.focus_hashtag(&tag);
    }
}

fn edit_line(line: &mut String, key: KeyEvent) {
    match key.code {
        KeyCode::Backspace => {
            line.pop();
        }
        KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => line.push(c),
        _ => {}
    }
}
