use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap},
    Frame,
};

use teahouse_types::FeedFilter;

use super::formatting::*;
use super::theme::{get_theme_colors, ThemeColors};
use crate::app::gate::Session;
use crate::app::post::{CommentCount, PostUnit};
use crate::app::state::get_modifier_key_name;
use crate::app::App;

const LOGO_LINES: &[&str] = &[
    "  _____          _                          ",
    " |_   _|__  __ _| |__   ___  _   _ ___  ___ ",
    "   | |/ _ \\/ _` | '_ \\ / _ \\| | | / __|/ _ \\",
    "   | |  __/ (_| | | | | (_) | |_| \\__ \\  __/",
    "   |_|\\___|\\__,_|_| |_|\\___/ \\__,_|___/\\___|",
];

fn logo_lines(theme: &ThemeColors) -> Vec<Line<'static>> {
    let mut lines = vec![Line::from("")];
    for logo_line in LOGO_LINES {
        lines.push(Line::from(Span::styled(
            *logo_line,
            Style::default()
                .fg(theme.primary)
                .add_modifier(Modifier::BOLD),
        )));
    }
    lines.push(Line::from(""));
    lines
}

fn framed(title: &str, theme: &ThemeColors) -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .title(format!(" {} ", title))
        .title_alignment(Alignment::Center)
        .border_style(Style::default().fg(theme.border))
        .style(Style::default().bg(theme.background))
}

/// Fixed screen for missing backend settings. There is no way forward from
/// here except restarting with the settings in place.
pub fn render_misconfigured_screen(frame: &mut Frame, area: Rect) {
    let theme = get_theme_colors();
    let mut lines = logo_lines(&theme);
    lines.extend([
        Line::from(Span::styled(
            "Backend not configured",
            Style::default().fg(theme.error).add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(Span::styled(
            "Set TEAHOUSE_BACKEND_URL and TEAHOUSE_ANON_KEY (or pass --backend-url",
            Style::default().fg(theme.text),
        )),
        Line::from(Span::styled(
            "and --anon-key), or run with --demo to try the app offline.",
            Style::default().fg(theme.text),
        )),
        Line::from(""),
        Line::from(Span::styled(
            "Press q to quit",
            Style::default().fg(theme.text_dim),
        )),
    ]);

    let paragraph = Paragraph::new(lines)
        .alignment(Alignment::Center)
        .block(framed("Teahouse", &theme));
    frame.render_widget(paragraph, area);
}

pub fn render_loading_screen(frame: &mut Frame, app: &App, area: Rect) {
    let theme = get_theme_colors();
    let mut lines = logo_lines(&theme);
    lines.push(Line::from(Span::styled(
        "⟳ Brewing...",
        Style::default()
            .fg(theme.warning)
            .add_modifier(Modifier::BOLD),
    )));
    if app.gate.user().is_some() {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            format!(
                "Could not check your profile. Press {}+R to retry, q to quit.",
                get_modifier_key_name()
            ),
            Style::default().fg(theme.text_dim),
        )));
    }

    let paragraph = Paragraph::new(lines)
        .alignment(Alignment::Center)
        .block(framed("Teahouse", &theme));
    frame.render_widget(paragraph, area);
}

fn input_line(label: &str, value: &str, active: bool, theme: &ThemeColors) -> Line<'static> {
    let value_style = if active {
        Style::default()
            .fg(theme.text)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(theme.text_dim)
    };
    let cursor = if active { "█" } else { "" };
    Line::from(vec![
        Span::styled(format!("{:>8}: ", label), Style::default().fg(theme.secondary)),
        Span::styled(format!("{}{}", value, cursor), value_style),
    ])
}

fn status_lines(
    busy: bool,
    message: Option<&str>,
    error: Option<&str>,
    theme: &ThemeColors,
) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    if busy {
        lines.push(Line::from(Span::styled(
            "⟳ Working...",
            Style::default().fg(theme.warning),
        )));
    }
    if let Some(message) = message {
        lines.push(Line::from(Span::styled(
            message.to_string(),
            Style::default().fg(theme.success),
        )));
    }
    if let Some(error) = error {
        lines.push(Line::from(Span::styled(
            error.to_string(),
            Style::default().fg(theme.error).add_modifier(Modifier::BOLD),
        )));
    }
    lines
}

pub fn render_sign_in_screen(frame: &mut Frame, app: &App, area: Rect) {
    let theme = get_theme_colors();
    let form = &app.sign_in;

    let mut lines = logo_lines(&theme);
    lines.push(Line::from(Span::styled(
        "Sign in with your email",
        Style::default().fg(theme.text).add_modifier(Modifier::BOLD),
    )));
    lines.push(Line::from(""));
    lines.push(input_line("Email", &form.email, !form.code_sent, &theme));
    if form.code_sent {
        lines.push(input_line("Code", &form.code, true, &theme));
    }
    lines.push(Line::from(""));
    lines.extend(status_lines(
        form.busy,
        form.message.as_deref(),
        form.error.as_deref(),
        &theme,
    ));
    lines.push(Line::from(""));
    let hint = if form.code_sent {
        "Enter: Verify code | Esc: Change email"
    } else {
        "Enter: Send sign-in code | Esc: Quit"
    };
    lines.push(Line::from(Span::styled(hint, Style::default().fg(theme.text_dim))));

    let paragraph = Paragraph::new(lines)
        .alignment(Alignment::Center)
        .block(framed("Welcome to the Teahouse", &theme));
    frame.render_widget(paragraph, area);
}

pub fn render_profile_setup_screen(frame: &mut Frame, app: &App, area: Rect) {
    let theme = get_theme_colors();
    let form = &app.profile_setup;

    let mut lines = logo_lines(&theme);
    lines.push(Line::from(Span::styled(
        "One last step: what should we call you?",
        Style::default().fg(theme.text).add_modifier(Modifier::BOLD),
    )));
    lines.push(Line::from(""));
    lines.push(input_line("Name", &form.name, true, &theme));
    lines.push(Line::from(""));
    lines.extend(status_lines(form.busy, None, form.error.as_deref(), &theme));
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        "Enter: Save | Esc: Sign out",
        Style::default().fg(theme.text_dim),
    )));

    let paragraph = Paragraph::new(lines)
        .alignment(Alignment::Center)
        .block(framed("Profile setup", &theme));
    frame.render_widget(paragraph, area);
}

pub fn render_main_screen(frame: &mut Frame, app: &mut App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(0),    // Feed or profile
            Constraint::Length(1), // Page-specific actions
            Constraint::Length(3), // Footer
        ])
        .split(area);

    render_header(frame, app, chunks[0]);
    if app.profile_view.is_some() {
        render_profile_view(frame, app, chunks[1]);
    } else {
        render_feed(frame, app, chunks[1]);
    }
    render_page_actions(frame, app, chunks[2]);
    render_footer(frame, app, chunks[3]);
}

fn render_header(frame: &mut Frame, app: &App, area: Rect) {
    let theme = get_theme_colors();
    let mut spans = vec![Span::styled(
        "☕ Teahouse   ",
        Style::default()
            .fg(theme.primary)
            .add_modifier(Modifier::BOLD),
    )];

    for (i, filter) in [FeedFilter::Recency, FeedFilter::Trending].iter().enumerate() {
        let style = if *filter == app.feed.filter() && app.profile_view.is_none() {
            Style::default()
                .fg(theme.success)
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
        } else {
            Style::default().fg(theme.text_dim)
        };
        spans.push(Span::styled(format!(" {} {} ", i + 1, filter.label()), style));
        if i == 0 {
            spans.push(Span::raw(" | "));
        }
    }

    if let Some(tag) = app.feed.hashtag_focus() {
        spans.push(Span::styled(
            format!("   focus: {} (Esc to clear)", tag),
            Style::default().fg(theme.secondary),
        ));
    }

    let header = Paragraph::new(Line::from(spans))
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(theme.border)),
        );
    frame.render_widget(header, area);
}

fn comment_count_label(count: CommentCount) -> String {
    match count {
        CommentCount::Loaded(n) => n.to_string(),
        CommentCount::Failed => "?".to_string(),
        CommentCount::NotRequested | CommentCount::Loading => "…".to_string(),
    }
}

fn post_item(
    unit: &PostUnit,
    is_selected: bool,
    session: Option<&Session>,
    theme: &ThemeColors,
    width: usize,
) -> ListItem<'static> {
    let post = &unit.post;
    let header_style = if is_selected {
        Style::default()
            .fg(theme.success)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(theme.primary)
    };
    let prefix = if is_selected { "▶ " } else { "  " };

    let mut header = vec![
        Span::styled(prefix, header_style),
        Span::styled(
            format!("{} ", avatar_placeholder(&post.author_name)),
            Style::default().fg(theme.secondary),
        ),
        Span::styled(post.author_name.clone(), header_style),
        Span::raw(" • "),
        Span::styled(
            format_timestamp(&post.created_at),
            Style::default().fg(theme.text_dim),
        ),
    ];
    if unit.can_delete(session.map(|s| &s.user)) {
        header.push(Span::styled("  (yours)", Style::default().fg(theme.text_dim)));
    }

    let mut lines = vec![Line::from(header)];
    lines.push(Line::from(Span::styled(
        format!("  🖼  {}", truncate_to_width(&post.image_url, width.saturating_sub(6))),
        Style::default()
            .fg(theme.text_dim)
            .add_modifier(Modifier::ITALIC),
    )));
    lines.extend(format_content_with_width(
        post.caption.as_deref(),
        is_selected,
        theme,
        width,
    ));

    let liked = unit.is_liked(session);
    let like_style = if liked {
        Style::default()
            .fg(theme.primary)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(theme.text_dim)
    };
    lines.push(Line::from(vec![
        Span::raw("  "),
        Span::styled(
            format!("{} {}  ", if liked { "♥" } else { "♡" }, post.likes_count),
            like_style,
        ),
        Span::styled(
            format!("💬 {}", comment_count_label(unit.comment_count)),
            Style::default().fg(theme.text_dim),
        ),
    ]));
    lines.push(Line::from(""));

    ListItem::new(lines)
}

fn render_post_list(
    frame: &mut Frame,
    units: &[&PostUnit],
    selected: usize,
    session: Option<&Session>,
    block: Block<'static>,
    area: Rect,
) {
    let theme = get_theme_colors();
    let width = area.width.saturating_sub(BORDER_PADDING) as usize;
    let items: Vec<ListItem> = units
        .iter()
        .enumerate()
        .map(|(i, unit)| post_item(unit, i == selected, session, &theme, width))
        .collect();

    let mut state = ListState::default();
    if !units.is_empty() {
        state.select(Some(selected.min(units.len() - 1)));
    }
    let list = List::new(items)
        .block(block)
        .highlight_style(Style::default().bg(theme.highlight_bg));
    frame.render_stateful_widget(list, area, &mut state);
}

fn render_empty(frame: &mut Frame, title: &str, message: &str, hint: &str, area: Rect) {
    let theme = get_theme_colors();
    let empty = Paragraph::new(vec![
        Line::from(""),
        Line::from(Span::styled(
            message.to_string(),
            Style::default()
                .fg(theme.warning)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(Span::styled(hint.to_string(), Style::default().fg(theme.text_dim))),
    ])
    .alignment(Alignment::Center)
    .block(framed(title, &theme));
    frame.render_widget(empty, area);
}

fn render_feed(frame: &mut Frame, app: &App, area: Rect) {
    let theme = get_theme_colors();
    let title = match app.feed.hashtag_focus() {
        Some(tag) => format!("{} · {}", app.feed.filter().label(), tag),
        None => format!("{} moments", app.feed.filter().label()),
    };

    let visible = app.feed.visible();
    if visible.is_empty() {
        if app.feed.loading {
            render_empty(frame, &title, "⟳ Loading posts...", "Please wait", area);
        } else if let Some(error) = &app.feed.error {
            render_empty(
                frame,
                &title,
                error,
                &format!("Press {}+R to retry", get_modifier_key_name()),
                area,
            );
        } else {
            render_empty(
                frame,
                &title,
                "No moments yet",
                "Press 'n' to share the first one!",
                area,
            );
        }
        return;
    }

    let block = framed(&title, &theme);
    render_post_list(
        frame,
        &visible,
        app.feed.selected,
        app.gate.session(),
        block,
        area,
    );
}

fn render_profile_view(frame: &mut Frame, app: &App, area: Rect) {
    let theme = get_theme_colors();
    let Some(view) = app.profile_view.as_ref() else {
        return;
    };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(8), Constraint::Min(0)])
        .split(area);

    let mut lines = Vec::new();
    match &view.profile {
        Some(profile) => {
            lines.push(Line::from(vec![
                Span::styled(
                    format!("{} ", avatar_placeholder(&profile.full_name)),
                    Style::default().fg(theme.secondary),
                ),
                Span::styled(
                    profile.full_name.clone(),
                    Style::default()
                        .fg(theme.primary)
                        .add_modifier(Modifier::BOLD),
                ),
            ]));
            let bio = profile.bio.as_deref().filter(|b| !b.trim().is_empty());
            lines.push(Line::from(Span::styled(
                bio.unwrap_or("No bio yet").to_string(),
                Style::default().fg(theme.text),
            )));
            lines.push(Line::from(vec![
                Span::styled(
                    format!("{} posts", view.post_count()),
                    Style::default().fg(theme.text).add_modifier(Modifier::BOLD),
                ),
                Span::raw(" · "),
                Span::styled(
                    format!("{} followers", view.follower_count()),
                    Style::default().fg(theme.text).add_modifier(Modifier::BOLD),
                ),
            ]));
            for (label, url) in [("avatar", &profile.avatar_url), ("cover", &profile.cover_url)] {
                lines.push(Line::from(Span::styled(
                    format!("{}: {}", label, url.as_deref().unwrap_or("none")),
                    Style::default().fg(theme.text_dim),
                )));
            }
        }
        None if view.loading => lines.push(Line::from("⟳ Loading profile...")),
        None => lines.push(Line::from(Span::styled(
            view.error.clone().unwrap_or_else(|| "Profile not found".to_string()),
            Style::default().fg(theme.error),
        ))),
    }

    let title = if view.is_own(app.gate.user()) {
        "Your profile"
    } else {
        "Profile"
    };
    let card = Paragraph::new(lines)
        .wrap(Wrap { trim: true })
        .block(framed(title, &theme));
    frame.render_widget(card, chunks[0]);

    let units: Vec<&PostUnit> = view.posts.units().iter().collect();
    if units.is_empty() {
        render_empty(frame, "Posts", "No moments shared yet", "", chunks[1]);
        return;
    }
    render_post_list(
        frame,
        &units,
        view.selected,
        app.gate.session(),
        framed("Posts", &theme),
        chunks[1],
    );
}

fn render_page_actions(frame: &mut Frame, app: &App, area: Rect) {
    let theme = get_theme_colors();
    let text = if let Some(view) = &app.profile_view {
        if view.is_own(app.gate.user()) {
            "e: Edit profile | l: Like | c: Comments | d: Delete | o: Open image | Esc: Back"
        } else {
            "l: Like | c: Comments | o: Open image | Esc: Back"
        }
    } else {
        "n: New post | l: Like | c: Comments | d: Delete | p: Author | h: Hashtag | /: Search | Tab: Filter"
    };
    let actions = Paragraph::new(text)
        .style(Style::default().fg(theme.secondary))
        .alignment(Alignment::Center);
    frame.render_widget(actions, area);
}

fn render_footer(frame: &mut Frame, app: &App, area: Rect) {
    let theme = get_theme_colors();
    frame.render_widget(Clear, area);

    let line = match &app.message {
        Some((message, _)) => Line::from(Span::styled(
            message.clone(),
            Style::default()
                .fg(theme.success)
                .add_modifier(Modifier::BOLD),
        )),
        None => {
            let who = app
                .gate
                .profile()
                .map(|p| p.full_name.clone())
                .unwrap_or_default();
            Line::from(vec![
                Span::styled(format!("{}  ", who), Style::default().fg(theme.primary)),
                Span::styled(
                    "P: My profile | r: Refresh | Shift+L: Logout | ?: Help | q: Quit | ↑/↓/j/k: Navigate",
                    Style::default().fg(theme.text_dim),
                ),
            ])
        }
    };

    let footer = Paragraph::new(line)
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(theme.border)),
        );
    frame.render_widget(footer, area);
}
