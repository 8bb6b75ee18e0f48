use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{List, ListItem, ListState},
    Frame,
};

use super::super::formatting::{avatar_placeholder, truncate_to_width};
use super::super::theme::get_theme_colors;
use super::components::*;
use crate::app::search::MIN_QUERY_LEN;
use crate::app::App;

pub fn render_search_modal(frame: &mut Frame, app: &App, area: Rect) {
    let theme = get_theme_colors();
    let Some(search) = app.search.as_ref() else {
        return;
    };

    let inner = create_modal_container(
        frame,
        area,
        &ModalConfig {
            title: "Find people",
            width_percent: 60,
            height_percent: 70,
        },
        &theme,
    );

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Query
            Constraint::Min(0),    // Results
            Constraint::Length(1), // Status
            Constraint::Length(3), // Footer
        ])
        .split(inner);

    render_input_box(frame, chunks[0], "Name", &search.query, true, &theme);

    let typed = search.query.trim().chars().count();
    if typed < MIN_QUERY_LEN {
        render_empty_state(
            frame,
            chunks[1],
            &format!("Type at least {} characters to search", MIN_QUERY_LEN),
            &theme,
        );
    } else if search.loading && search.results.is_empty() {
        render_loading_state(frame, chunks[1], "⟳ Searching...", &theme);
    } else if search.results.is_empty() {
        render_empty_state(frame, chunks[1], "No one found", &theme);
    } else {
        let width = chunks[1].width.saturating_sub(12) as usize;
        let items: Vec<ListItem> = search
            .results
            .iter()
            .map(|profile| {
                let mut spans = vec![
                    Span::styled(
                        format!("{} ", avatar_placeholder(&profile.full_name)),
                        Style::default().fg(theme.secondary),
                    ),
                    Span::styled(
                        profile.full_name.clone(),
                        Style::default()
                            .fg(theme.text)
                            .add_modifier(Modifier::BOLD),
                    ),
                ];
                if let Some(bio) = profile.bio.as_deref().filter(|b| !b.is_empty()) {
                    let bio = bio.lines().next().unwrap_or_default();
                    spans.push(Span::styled(
                        format!("  {}", truncate_to_width(bio, width)),
                        Style::default().fg(theme.text_dim),
                    ));
                }
                ListItem::new(Line::from(spans))
            })
            .collect();

        let mut state = ListState::default();
        state.select(Some(search.selected.min(search.results.len() - 1)));
        let list = List::new(items)
            .highlight_style(
                Style::default()
                    .bg(theme.highlight_bg)
                    .add_modifier(Modifier::BOLD),
            )
            .highlight_symbol(">> ");
        frame.render_stateful_widget(list, chunks[1], &mut state);
    }

    render_form_status(frame, chunks[2], false, search.error.as_deref(), &theme);
    render_modal_footer(
        frame,
        chunks[3],
        "Type to search | ↑/↓: Select | Enter: Open profile | Esc: Close",
        &theme,
    );
}
