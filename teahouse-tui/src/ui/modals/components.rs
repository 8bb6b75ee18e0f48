//! Building blocks shared by the overlay modals
use ratatui::{
    layout::{Alignment, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};

use super::super::theme::ThemeColors;
use super::utils::centered_rect;

pub struct ModalConfig<'a> {
    pub title: &'a str,
    pub width_percent: u16,
    pub height_percent: u16,
}

/// Clear the modal area, draw its frame and return the inner rect
pub fn create_modal_container(
    frame: &mut Frame,
    area: Rect,
    config: &ModalConfig,
    theme: &ThemeColors,
) -> Rect {
    let modal_area = centered_rect(config.width_percent, config.height_percent, area);

    frame.render_widget(Clear, modal_area);

    let block = Block::default()
        .title(format!(" {} ", config.title))
        .title_alignment(Alignment::Center)
        .borders(Borders::ALL)
        .border_style(
            Style::default()
                .fg(theme.accent)
                .add_modifier(Modifier::BOLD),
        )
        .style(Style::default().bg(theme.background));

    let inner = block.inner(modal_area);
    frame.render_widget(block, modal_area);

    inner
}

pub fn render_loading_state(frame: &mut Frame, area: Rect, message: &str, theme: &ThemeColors) {
    let loading = Paragraph::new(message)
        .alignment(Alignment::Center)
        .style(Style::default().fg(theme.warning));
    frame.render_widget(loading, area);
}

pub fn render_empty_state(frame: &mut Frame, area: Rect, message: &str, theme: &ThemeColors) {
    let empty = Paragraph::new(message)
        .alignment(Alignment::Center)
        .style(Style::default().fg(theme.text_dim));
    frame.render_widget(empty, area);
}

/// Single-line input box; the active one gets a cursor and a bright border
pub fn render_input_box(
    frame: &mut Frame,
    area: Rect,
    title: &str,
    value: &str,
    active: bool,
    theme: &ThemeColors,
) {
    let cursor = if active { "█" } else { "" };
    let input = Paragraph::new(format!("{}{}", value, cursor))
        .style(Style::default().fg(if active { theme.text } else { theme.text_dim }))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(title.to_string())
                .border_style(Style::default().fg(if active {
                    theme.primary
                } else {
                    theme.border
                })),
        );
    frame.render_widget(input, area);
}

/// Busy indicator and error line under a form
pub fn render_form_status(
    frame: &mut Frame,
    area: Rect,
    busy: bool,
    error: Option<&str>,
    theme: &ThemeColors,
) {
    let line = if busy {
        Line::from(Span::styled(
            "⟳ Working...",
            Style::default().fg(theme.warning),
        ))
    } else if let Some(error) = error {
        Line::from(Span::styled(
            error.to_string(),
            Style::default()
                .fg(theme.error)
                .add_modifier(Modifier::BOLD),
        ))
    } else {
        Line::from("")
    };
    frame.render_widget(Paragraph::new(line).alignment(Alignment::Center), area);
}

pub fn render_modal_footer(frame: &mut Frame, area: Rect, shortcuts: &str, theme: &ThemeColors) {
    let footer = Paragraph::new(shortcuts)
        .alignment(Alignment::Center)
        .style(Style::default().fg(theme.text))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(theme.border)),
        );
    frame.render_widget(footer, area);
}
