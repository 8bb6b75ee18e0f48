use ratatui::{
    layout::{Alignment, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

use super::super::theme::get_theme_colors;
use super::utils::centered_rect;
use crate::app::App;

type Shortcuts = Vec<(&'static str, Vec<(&'static str, &'static str)>)>;

pub fn render_help_modal(frame: &mut Frame, app: &App, area: Rect) {
    let theme = get_theme_colors();

    let modal_area = centered_rect(80, 85, area);
    frame.render_widget(Clear, modal_area);

    let mut lines = vec![Line::from("")];
    for (category, items) in get_shortcuts_for_context(app) {
        lines.push(Line::from(Span::styled(
            category,
            Style::default()
                .fg(theme.accent)
                .add_modifier(Modifier::BOLD),
        )));
        lines.push(Line::from(""));

        for (key, description) in items {
            lines.push(Line::from(vec![
                Span::styled(format!("  {:<15}", key), Style::default().fg(theme.success)),
                Span::styled(description, Style::default().fg(theme.text)),
            ]));
        }

        lines.push(Line::from(""));
    }

    let help_content = Paragraph::new(lines)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(
                    Style::default()
                        .fg(theme.accent)
                        .add_modifier(Modifier::BOLD),
                )
                .title(" Keyboard Shortcuts ")
                .title_alignment(Alignment::Center)
                .style(Style::default().bg(theme.background)),
        )
        .wrap(Wrap { trim: false });

    frame.render_widget(help_content, modal_area);
}

pub fn get_shortcuts_for_context(app: &App) -> Shortcuts {
    let mut shortcuts: Shortcuts = vec![(
        "Global",
        vec![
            ("?", "Toggle this help"),
            ("Ctrl+R", "Reload"),
            ("q / Ctrl+C", "Quit"),
            ("Shift+L", "Sign out"),
        ],
    )];

    shortcuts.push((
        "Moments",
        vec![
            ("↑/↓ or j/k", "Select moment"),
            ("l", "Like (once per session)"),
            ("c / Enter", "Open comments"),
            ("o", "Open image in browser"),
            ("p", "Author's profile"),
            ("d", "Delete your moment"),
            ("h", "Cycle hashtags in the selected caption"),
        ],
    ));

    if app.profile_view.is_some() {
        shortcuts.push((
            "Profile",
            vec![("e", "Edit your profile"), ("Esc", "Back to the feed")],
        ));
    } else {
        shortcuts.push((
            "Feed",
            vec![
                ("Tab / 1 / 2", "Switch between All and Trending"),
                ("n", "Share a new moment"),
                ("/", "Find people"),
                ("P", "Your profile"),
                ("r", "Refresh"),
                ("Esc", "Clear hashtag focus"),
            ],
        ));
    }

    shortcuts.push((
        "Comments",
        vec![
            ("Enter", "Send comment"),
            ("←/→", "Pick an emoji"),
            ("Ctrl+E", "Insert picked emoji"),
            ("Tab", "Reply to selected comment"),
        ],
    ));

    shortcuts
}
