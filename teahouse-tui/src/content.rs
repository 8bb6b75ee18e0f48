//! Tokenizer for user text: emoji codes, hashtags and mentions.
//!
//! Text is split on whitespace runs and on `:word:` codes. Separators are
//! kept, so concatenating the raw text of every segment gives back the input.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::emoji;

static SEPARATOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\s+|:\w+:)").expect("separator pattern is valid"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Text(String),
    Emoji { code: String, glyph: &'static str },
    /// Interactive; the raw token including `#`
    Hashtag(String),
    /// Styled only; the raw token including `@`
    Mention(String),
}

impl Segment {
    /// Source text this segment was parsed from
    pub fn raw(&self) -> &str {
        match self {
            Segment::Text(s) | Segment::Hashtag(s) | Segment::Mention(s) => s,
            Segment::Emoji { code, .. } => code,
        }
    }

    /// Activate ("click") the segment. Only hashtags react: the handler gets
    /// the raw token. Returns whether the handler was invoked.
    pub fn activate(&self, handler: Option<&mut dyn FnMut(&str)>) -> bool {
        match (self, handler) {
            (Segment::Hashtag(tag), Some(handler)) => {
                handler(tag);
                true
            }
            _ => false,
        }
    }

    pub fn is_interactive(&self) -> bool {
        matches!(self, Segment::Hashtag(_))
    }
}

fn classify(token: &str) -> Segment {
    if let Some(entry) = emoji::lookup(token) {
        return Segment::Emoji {
            code: token.to_string(),
            glyph: entry.glyph(),
        };
    }
    if token.starts_with('#') {
        Segment::Hashtag(token.to_string())
    } else if token.starts_with('@') {
        Segment::Mention(token.to_string())
    } else {
        Segment::Text(token.to_string())
    }
}

fn tokens(text: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut last = 0;
    for m in SEPARATOR.find_iter(text) {
        if m.start() > last {
            out.push(&text[last..m.start()]);
        }
        out.push(m.as_str());
        last = m.end();
    }
    if last < text.len() {
        out.push(&text[last..]);
    }
    out
}

/// Parse text into segments. `None` or empty input yields no segments.
pub fn parse(text: Option<&str>) -> Vec<Segment> {
    let Some(text) = text else {
        return Vec::new();
    };
    tokens(text)
        .into_iter()
        .map(|token| {
            if token.chars().all(char::is_whitespace) {
                Segment::Text(token.to_string())
            } else {
                classify(token)
            }
        })
        .collect()
}

/// Hashtag tokens of `text`, in order of appearance
pub fn hashtags(text: &str) -> Vec<String> {
    parse(Some(text))
        .into_iter()
        .filter_map(|segment| match segment {
            Segment::Hashtag(tag) => Some(tag),
            _ => None,
        })
        .collect()
}

/// Whether `text` carries `tag` as a hashtag, ignoring case
pub fn has_hashtag(text: &str, tag: &str) -> bool {
    hashtags(text).iter().any(|t| t.eq_ignore_ascii_case(tag))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn rebuild(segments: &[Segment]) -> String {
        segments.iter().map(Segment::raw).collect()
    }

    #[test]
    fn test_empty_input() {
        assert!(parse(None).is_empty());
        assert!(parse(Some("")).is_empty());
    }

    #[test]
    fn test_comment_example() {
        let segments = parse(Some("great! :) #coffee"));
        assert_eq!(
            segments,
            vec![
                Segment::Text("great!".into()),
                Segment::Text(" ".into()),
                Segment::Emoji {
                    code: ":)".into(),
                    glyph: "😄"
                },
                Segment::Text(" ".into()),
                Segment::Hashtag("#coffee".into()),
            ]
        );
    }

    #[test]
    fn test_colon_codes_split_inside_words() {
        let segments = parse(Some("hi:smile:there"));
        assert_eq!(segments.len(), 3);
        assert_eq!(segments[0], Segment::Text("hi".into()));
        assert!(matches!(segments[1], Segment::Emoji { .. }));
        assert_eq!(segments[2], Segment::Text("there".into()));
    }

    #[test]
    fn test_unregistered_code_is_text() {
        assert_eq!(
            parse(Some(":rain:")),
            vec![Segment::Text(":rain:".into())]
        );
    }

    #[test]
    fn test_mentions_are_not_interactive() {
        let segments = parse(Some("@sara"));
        assert_eq!(segments, vec![Segment::Mention("@sara".into())]);

        let mut calls = 0;
        let mut handler = |_: &str| calls += 1;
        assert!(!segments[0].activate(Some(&mut handler)));
        assert_eq!(calls, 0);
    }

    #[test]
    fn test_hashtag_click_passes_literal_token() {
        let segments = parse(Some("cup of #Tea."));
        let tag = segments.iter().find(|s| s.is_interactive()).unwrap();

        let mut seen = Vec::new();
        let mut handler = |t: &str| seen.push(t.to_string());
        assert!(tag.activate(Some(&mut handler)));
        assert_eq!(seen, vec!["#Tea.".to_string()]);

        assert!(!tag.activate(None));
    }

    #[test]
    fn test_hashtags_and_focus_match() {
        let caption = "morning #tea and #Coffee";
        assert_eq!(hashtags(caption), vec!["#tea", "#Coffee"]);
        assert!(has_hashtag(caption, "#coffee"));
        assert!(!has_hashtag(caption, "#te"));
    }

    proptest! {
        #[test]
        fn prop_segments_rebuild_input(text in "[ a-z#@:)(<3\\n]{0,40}") {
            prop_assert_eq!(rebuild(&parse(Some(&text))), text);
        }

        #[test]
        fn prop_registered_codes_become_glyphs(
            words in prop::collection::vec("[a-z]{1,6}", 0..5),
            idx in 0usize..10,
        ) {
            let entry = emoji::catalog()[idx];
            let mut parts = words.clone();
            parts.insert(words.len() / 2, entry.code.to_string());
            let text = parts.join(" ");

            let segments = parse(Some(&text));
            let emoji_segments: Vec<_> = segments
                .iter()
                .filter(|s| matches!(s, Segment::Emoji { .. }))
                .collect();
            prop_assert_eq!(emoji_segments.len(), 1);
            prop_assert_eq!(
                emoji_segments[0],
                &Segment::Emoji { code: entry.code.to_string(), glyph: entry.glyph() }
            );

            // Everything else is untouched, in order
            let others: Vec<String> = segments
                .iter()
                .filter(|s| !matches!(s, Segment::Emoji { .. }) && !s.raw().trim().is_empty())
                .map(|s| s.raw().to_string())
                .collect();
            prop_assert_eq!(others, words);
        }

        #[test]
        fn prop_hashtag_is_marked_exactly(
            before in "[a-z]{1,8}",
            tag in "[a-z]{1,8}",
            after in "[a-z]{1,8}",
        ) {
            let text = format!("{} #{} {}", before, tag, after);
            let segments = parse(Some(&text));
            let tags: Vec<_> = segments.iter().filter(|s| s.is_interactive()).collect();
            prop_assert_eq!(tags.len(), 1);

            let mut clicked = None;
            let mut handler = |t: &str| clicked = Some(t.to_string());
            tags[0].activate(Some(&mut handler));
            prop_assert_eq!(clicked, Some(format!("#{}", tag)));
        }
    }
}
