use chrono::{DateTime, Utc};
use ratatui::{
    style::{Modifier, Style},
    text::{Line, Span},
};
use unicode_width::UnicodeWidthStr;

use teahouse_types::Rank;

use super::theme::ThemeColors;
use crate::content::{self, Segment};

// Layout constants
pub const BORDER_PADDING: u16 = 4; // Total horizontal padding from borders (2 per side)

/// Relative time for recent moments, the calendar date otherwise
pub fn format_timestamp(timestamp: &DateTime<Utc>) -> String {
    format_timestamp_at(timestamp, Utc::now())
}

pub fn format_timestamp_at(timestamp: &DateTime<Utc>, now: DateTime<Utc>) -> String {
    let seconds = (now - *timestamp).num_seconds().max(0);
    match seconds {
        0..=59 => "now".to_string(),
        60..=3599 => format!("{}m ago", seconds / 60),
        3600..=86399 => format!("{}h ago", seconds / 3600),
        _ => timestamp.format("%Y-%m-%d").to_string(),
    }
}

/// Initials stand in for avatars the terminal cannot draw
pub fn avatar_placeholder(name: &str) -> String {
    let initials: String = name
        .split_whitespace()
        .filter_map(|word| word.chars().next())
        .take(2)
        .flat_map(char::to_uppercase)
        .collect();
    if initials.is_empty() {
        "[?]".to_string()
    } else {
        format!("[{}]", initials)
    }
}

pub fn rank_style(rank: Rank, theme: &ThemeColors) -> Style {
    match rank {
        Rank::Mayor => Style::default()
            .fg(theme.secondary)
            .add_modifier(Modifier::BOLD),
        Rank::Regular => Style::default().fg(theme.accent),
        Rank::Member => Style::default().fg(theme.text_dim),
    }
}

fn segment_span(segment: Segment, is_selected: bool, theme: &ThemeColors) -> Span<'static> {
    match segment {
        Segment::Text(text) => {
            let style = if is_selected {
                Style::default().fg(theme.text).add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(theme.text)
            };
            Span::styled(text, style)
        }
        Segment::Emoji { glyph, .. } => Span::raw(glyph),
        Segment::Hashtag(tag) => Span::styled(
            tag,
            Style::default()
                .fg(if is_selected {
                    theme.accent
                } else {
                    theme.secondary
                })
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED),
        ),
        Segment::Mention(mention) => Span::styled(
            mention,
            Style::default()
                .fg(theme.primary)
                .add_modifier(Modifier::BOLD),
        ),
    }
}

/// Render user text as styled, wrapped lines: emoji codes become glyphs,
/// hashtags and mentions are highlighted
pub fn format_content_with_width(
    text: Option<&str>,
    is_selected: bool,
    theme: &ThemeColors,
    max_width: usize,
) -> Vec<Line<'static>> {
    let Some(text) = text else {
        return Vec::new();
    };
    let wrap_width = max_width.saturating_sub(BORDER_PADDING as usize).max(10);

    let mut lines = Vec::new();
    for line in text.lines() {
        for wrapped in textwrap::wrap(line, wrap_width) {
            let mut spans = vec![Span::raw("  ")];
            spans.extend(
                content::parse(Some(wrapped.as_ref()))
                    .into_iter()
                    .map(|segment| segment_span(segment, is_selected, theme)),
            );
            lines.push(Line::from(spans));
        }
    }
    lines
}

/// Truncate to a display width, marking the cut with an ellipsis
pub fn truncate_to_width(text: &str, max_width: usize) -> String {
    if text.width() <= max_width {
        return text.to_string();
    }
    let mut out = String::new();
    let mut width = 0;
    for c in text.chars() {
        let w = unicode_width::UnicodeWidthChar::width(c).unwrap_or(0);
        if width + w + 1 > max_width {
            break;
        }
        width += w;
        out.push(c);
    }
    out.push('…');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_relative_timestamps() {
        let now = Utc::now();
        assert_eq!(format_timestamp_at(&(now - Duration::seconds(5)), now), "now");
        assert_eq!(format_timestamp_at(&(now - Duration::minutes(7)), now), "7m ago");
        assert_eq!(format_timestamp_at(&(now - Duration::hours(3)), now), "3h ago");
        let old = now - Duration::days(3);
        assert_eq!(
            format_timestamp_at(&old, now),
            old.format("%Y-%m-%d").to_string()
        );
    }

    #[test]
    fn test_avatar_placeholder() {
        assert_eq!(avatar_placeholder("layla hassan"), "[LH]");
        assert_eq!(avatar_placeholder("Omar"), "[O]");
        assert_eq!(avatar_placeholder("  "), "[?]");
    }

    #[test]
    fn test_content_lines_replace_emoji_codes() {
        let theme = super::super::theme::get_theme_colors();
        let lines = format_content_with_width(Some("great! :) #coffee"), false, &theme, 80);
        assert_eq!(lines.len(), 1);
        let text: String = lines[0].spans.iter().map(|s| s.content.as_ref()).collect();
        assert!(!text.contains(":)"));
        assert!(text.contains("#coffee"));
        assert!(format_content_with_width(None, false, &theme, 80).is_empty());
    }

    #[test]
    fn test_truncate_to_width() {
        assert_eq!(truncate_to_width("short", 10), "short");
        assert_eq!(truncate_to_width("a longer name", 6), "a lon…");
    }
}
