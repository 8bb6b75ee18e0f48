use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
    Frame,
};

use super::super::formatting::{format_content_with_width, format_timestamp, rank_style};
use super::super::theme::get_theme_colors;
use super::components::*;
use crate::app::state::get_modifier_key_name;
use crate::app::App;
use crate::emoji;

/// Comment thread for a single post, with the emoji picker under the input
pub fn render_thread_modal(frame: &mut Frame, app: &App, area: Rect) {
    let theme = get_theme_colors();
    let Some(thread) = app.thread.as_ref() else {
        return;
    };

    let title = match app.unit(thread.post_id) {
        Some(unit) => format!("Comments on {}'s moment", unit.post.author_name),
        None => "Comments".to_string(),
    };
    let inner = create_modal_container(
        frame,
        area,
        &ModalConfig {
            title: &title,
            width_percent: 75,
            height_percent: 85,
        },
        &theme,
    );

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Caption
            Constraint::Min(0),    // Comments
            Constraint::Length(3), // Input
            Constraint::Length(1), // Emoji picker
            Constraint::Length(1), // Status
            Constraint::Length(3), // Footer
        ])
        .split(inner);

    let width = chunks[1].width as usize;
    let caption = app
        .unit(thread.post_id)
        .and_then(|u| u.post.caption.as_deref());
    let context = Paragraph::new(match caption {
        Some(caption) => format_content_with_width(Some(caption), false, &theme, width),
        None => vec![Line::from(Span::styled(
            "  (no caption)",
            Style::default().fg(theme.text_dim),
        ))],
    })
    .block(
        Block::default()
            .borders(Borders::BOTTOM)
            .border_style(Style::default().fg(theme.border)),
    );
    frame.render_widget(context, chunks[0]);

    if thread.loading && thread.comments.is_empty() {
        render_loading_state(frame, chunks[1], "⟳ Loading comments...", &theme);
    } else if thread.comments.is_empty() {
        render_empty_state(
            frame,
            chunks[1],
            "No comments yet. Start the conversation!",
            &theme,
        );
    } else {
        let items: Vec<ListItem> = thread
            .entries()
            .map(|(position, rank, comment)| {
                let is_selected = thread.selected == Some(position - 1);
                let mut lines = vec![Line::from(vec![
                    Span::styled(
                        format!("#{} ", position),
                        Style::default().fg(theme.text_dim),
                    ),
                    Span::styled(format!("[{}] ", rank.label()), rank_style(rank, &theme)),
                    Span::styled(
                        comment.author_name.clone(),
                        Style::default()
                            .fg(theme.primary)
                            .add_modifier(Modifier::BOLD),
                    ),
                    Span::raw(" • "),
                    Span::styled(
                        format_timestamp(&comment.created_at),
                        Style::default().fg(theme.text_dim),
                    ),
                ])];
                lines.extend(format_content_with_width(
                    Some(&comment.content),
                    is_selected,
                    &theme,
                    width,
                ));
                ListItem::new(lines)
            })
            .collect();

        let mut state = ListState::default();
        state.select(thread.selected);
        let list = List::new(items)
            .highlight_style(Style::default().bg(theme.highlight_bg))
            .highlight_symbol("▶ ");
        frame.render_stateful_widget(list, chunks[1], &mut state);
    }

    render_input_box(frame, chunks[2], "Your comment", &thread.buffer, true, &theme);

    let mut picker = vec![Span::styled("Emoji: ", Style::default().fg(theme.text_dim))];
    for (i, entry) in emoji::catalog().iter().enumerate() {
        let style = if i == thread.emoji_index {
            Style::default()
                .bg(theme.highlight_bg)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default()
        };
        picker.push(Span::styled(format!(" {} ", entry.glyph()), style));
    }
    frame.render_widget(Paragraph::new(Line::from(picker)), chunks[3]);

    render_form_status(
        frame,
        chunks[4],
        thread.sending,
        thread.error.as_deref(),
        &theme,
    );

    let modifier = get_modifier_key_name();
    render_modal_footer(
        frame,
        chunks[5],
        &format!(
            "Enter: Send | ←/→ + {m}+E: Emoji | Tab: Reply | ↑/↓: Select | {m}+R: Refresh | Esc: Close",
            m = modifier
        ),
        &theme,
    );
}
