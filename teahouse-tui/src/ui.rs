// UI module - split into cohesive submodules for maintainability
pub mod theme;
mod formatting;
mod modals;
mod screens;

// Re-export main render function
pub use self::render_main::render;

// Main render logic
mod render_main {
    use ratatui::{
        layout::Alignment,
        style::{Modifier, Style},
        text::{Line, Span},
        widgets::{Block, Borders, Clear, Paragraph},
        Frame,
    };

    use super::modals::*;
    use super::screens::*;
    use super::theme::get_theme_colors;
    use crate::app::gate::GateState;
    use crate::app::App;

    const MIN_WIDTH: u16 = 60;
    const MIN_HEIGHT: u16 = 20;

    /// Render the UI
    pub fn render(app: &mut App, frame: &mut Frame) {
        let area = frame.area();
        let theme = get_theme_colors();

        frame.render_widget(Clear, area);
        let background = Block::default().style(Style::default().bg(theme.background));
        frame.render_widget(background, area);

        if area.width < MIN_WIDTH || area.height < MIN_HEIGHT {
            let warning = Paragraph::new(vec![
                Line::from(""),
                Line::from(Span::styled(
                    "Terminal Too Small",
                    Style::default()
                        .fg(theme.error)
                        .add_modifier(Modifier::BOLD),
                )),
                Line::from(""),
                Line::from(Span::styled(
                    format!("Minimum size: {}x{}", MIN_WIDTH, MIN_HEIGHT),
                    Style::default().fg(theme.text),
                )),
                Line::from(Span::styled(
                    format!("Current size: {}x{}", area.width, area.height),
                    Style::default().fg(theme.warning),
                )),
            ])
            .alignment(Alignment::Center)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(theme.error)),
            );

            frame.render_widget(warning, area);
            return;
        }

        match app.screen() {
            GateState::Misconfigured => render_misconfigured_screen(frame, area),
            GateState::Loading => render_loading_screen(frame, app, area),
            GateState::Unauthenticated => render_sign_in_screen(frame, app, area),
            GateState::NeedsProfileSetup => render_profile_setup_screen(frame, app, area),
            GateState::Ready => {
                render_main_screen(frame, app, area);

                // Overlays, bottom to top: later renders appear on top
                if app.thread.is_some() {
                    render_thread_modal(frame, app, area);
                }
                if app.search.is_some() {
                    render_search_modal(frame, app, area);
                }
                if app.composer.is_some() {
                    render_composer_modal(frame, app, area);
                }
                if app.editor.is_some() {
                    render_editor_modal(frame, app, area);
                }
                if app.confirm_delete.is_some() {
                    render_delete_confirmation_modal(frame, area);
                }
                if app.show_help {
                    render_help_modal(frame, app, area);
                }
            }
        }

        // Alerts sit above everything, including the loading screen
        if let Some(alert) = &app.alert {
            render_alert_modal(frame, alert, area);
        }
    }
}
