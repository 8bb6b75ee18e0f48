use ratatui::{
    layout::{Alignment, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

use super::super::theme::get_theme_colors;
use super::utils::centered_rect;

pub fn render_delete_confirmation_modal(frame: &mut Frame, area: Rect) {
    let theme = get_theme_colors();

    let modal_area = centered_rect(50, 25, area);
    frame.render_widget(Clear, modal_area);

    let content = vec![
        Line::from(""),
        Line::from(Span::styled(
            "Delete this moment?",
            Style::default().fg(theme.text).add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(
            "Its comments go with it. This cannot be undone.",
            Style::default().fg(theme.text_dim),
        )),
        Line::from(""),
        Line::from(vec![
            Span::styled(
                "Y",
                Style::default()
                    .fg(theme.error)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(": Delete  ", Style::default().fg(theme.text)),
            Span::styled(
                "N",
                Style::default()
                    .fg(theme.success)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(": Keep", Style::default().fg(theme.text)),
        ]),
    ];

    let modal = Paragraph::new(content).alignment(Alignment::Center).block(
        Block::default()
            .title(" Confirm Delete ")
            .borders(Borders::ALL)
            .border_style(
                Style::default()
                    .fg(theme.warning)
                    .add_modifier(Modifier::BOLD),
            )
            .style(Style::default().bg(theme.background)),
    );
    frame.render_widget(modal, modal_area);
}

/// Blocking alert; dismissed with Enter or Esc
pub fn render_alert_modal(frame: &mut Frame, alert: &str, area: Rect) {
    let theme = get_theme_colors();

    let modal_area = centered_rect(60, 30, area);
    frame.render_widget(Clear, modal_area);

    let content = vec![
        Line::from(""),
        Line::from(Span::styled(
            alert.to_string(),
            Style::default().fg(theme.text),
        )),
        Line::from(""),
        Line::from(Span::styled(
            "Enter/Esc: Dismiss",
            Style::default().fg(theme.text_dim),
        )),
    ];

    let modal = Paragraph::new(content)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .block(
            Block::default()
                .title(" ⚠ Alert ")
                .borders(Borders::ALL)
                .border_style(
                    Style::default()
                        .fg(theme.error)
                        .add_modifier(Modifier::BOLD),
                )
                .style(Style::default().bg(theme.background)),
        );
    frame.render_widget(modal, modal_area);
}
