use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};
use tui_textarea::TextArea;

use super::super::theme::{get_theme_colors, ThemeColors};
use super::components::*;
use crate::app::profile::EditorField;
use crate::app::state::get_modifier_key_name;
use crate::app::upload::ComposerField;
use crate::app::App;

/// Bordered box holding a multi-line textarea
fn render_textarea_box(
    frame: &mut Frame,
    area: Rect,
    title: &str,
    textarea: &TextArea<'static>,
    active: bool,
    theme: &ThemeColors,
) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(title.to_string())
        .border_style(Style::default().fg(if active {
            theme.primary
        } else {
            theme.border
        }));
    let inner = block.inner(area);
    frame.render_widget(block, area);
    frame.render_widget(textarea, inner);
}

/// New post: image file path and optional caption
pub fn render_composer_modal(frame: &mut Frame, app: &App, area: Rect) {
    let theme = get_theme_colors();
    let Some(composer) = app.composer.as_ref() else {
        return;
    };

    let inner = create_modal_container(
        frame,
        area,
        &ModalConfig {
            title: "Share a moment",
            width_percent: 70,
            height_percent: 70,
        },
        &theme,
    );

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Image path
            Constraint::Min(3),    // Caption
            Constraint::Length(1), // Status
            Constraint::Length(3), // Instructions
        ])
        .split(inner);

    render_input_box(
        frame,
        chunks[0],
        "Image file (jpg, png, gif, webp)",
        &composer.path,
        composer.field == ComposerField::Path,
        &theme,
    );
    render_textarea_box(
        frame,
        chunks[1],
        "Caption (emoji codes and #hashtags welcome)",
        &composer.caption,
        composer.field == ComposerField::Caption,
        &theme,
    );
    render_form_status(
        frame,
        chunks[2],
        composer.busy,
        composer.error.as_deref(),
        &theme,
    );
    render_modal_footer(
        frame,
        chunks[3],
        &format!(
            "{}+S: Post | Tab: Switch field | Esc: Cancel",
            get_modifier_key_name()
        ),
        &theme,
    );
}

/// Owner profile editor: name, bio and the two replaceable images
pub fn render_editor_modal(frame: &mut Frame, app: &App, area: Rect) {
    let theme = get_theme_colors();
    let Some(editor) = app.editor.as_ref() else {
        return;
    };

    let inner = create_modal_container(
        frame,
        area,
        &ModalConfig {
            title: "Edit profile",
            width_percent: 70,
            height_percent: 80,
        },
        &theme,
    );

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Name
            Constraint::Min(4),    // Bio
            Constraint::Length(2), // Image slot summary
            Constraint::Length(3), // Image path
            Constraint::Length(1), // Status
            Constraint::Length(3), // Instructions
        ])
        .split(inner);

    render_input_box(
        frame,
        chunks[0],
        "Name",
        &editor.name,
        editor.field == EditorField::Name,
        &theme,
    );
    render_textarea_box(
        frame,
        chunks[1],
        "Bio",
        &editor.bio,
        editor.field == EditorField::Bio,
        &theme,
    );

    let current = editor.profile.image(editor.slot).unwrap_or("none");
    let slot_lines = vec![
        Line::from(vec![
            Span::styled("Image: ", Style::default().fg(theme.text_dim)),
            Span::styled(
                editor.slot.as_str(),
                Style::default()
                    .fg(theme.secondary)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(format!("  (current: {})", current), Style::default().fg(theme.text_dim)),
        ]),
        if editor.confirm_remove {
            Line::from(Span::styled(
                format!("Remove the {} image? (y/n)", editor.slot.as_str()),
                Style::default()
                    .fg(theme.warning)
                    .add_modifier(Modifier::BOLD),
            ))
        } else {
            Line::from("")
        },
    ];
    frame.render_widget(Paragraph::new(slot_lines), chunks[2]);

    render_input_box(
        frame,
        chunks[3],
        &format!("New {} image file", editor.slot.as_str()),
        &editor.image_path,
        editor.field == EditorField::ImagePath,
        &theme,
    );
    render_form_status(
        frame,
        chunks[4],
        editor.busy,
        editor.error.as_deref(),
        &theme,
    );

    let m = get_modifier_key_name();
    let instructions = Paragraph::new(format!(
        "{m}+S: Save | {m}+T: Avatar/Cover | {m}+U: Upload | {m}+D: Remove | Tab: Next | Esc: Close"
    ))
    .style(Style::default().fg(theme.text))
    .alignment(Alignment::Center)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(theme.border)),
    );
    frame.render_widget(instructions, chunks[5]);
}
