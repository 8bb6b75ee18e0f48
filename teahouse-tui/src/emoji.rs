//! Emoji catalog: short textual codes typed by users mapped to glyphs.
//! Glyphs are resolved through the `emojis` shortcode table.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmojiEntry {
    /// Stable identifier, also accepted in `:id:` form
    pub id: &'static str,
    /// Short code as typed, e.g. `:)`
    pub code: &'static str,
    shortcode: &'static str,
}

impl EmojiEntry {
    /// Unicode glyph for this entry
    pub fn glyph(&self) -> &'static str {
        emojis::get_by_shortcode(self.shortcode)
            .map(|e| e.as_str())
            .unwrap_or(self.code)
    }

    fn matches(&self, code: &str) -> bool {
        if code == self.code {
            return true;
        }
        code.strip_prefix(':')
            .and_then(|c| c.strip_suffix(':'))
            .is_some_and(|id| id == self.id)
    }
}

const fn entry(id: &'static str, code: &'static str, shortcode: &'static str) -> EmojiEntry {
    EmojiEntry {
        id,
        code,
        shortcode,
    }
}

static CATALOG: [EmojiEntry; 10] = [
    entry("smile", ":)", "smile"),
    entry("grin", ":D", "grin"),
    entry("wink", ";)", "wink"),
    entry("tongue", ":p", "stuck_out_tongue"),
    entry("cool", "8)", "sunglasses"),
    entry("love", "<3", "heart"),
    entry("shock", ":o", "open_mouth"),
    entry("sad", ":(", "disappointed"),
    entry("angry", ":@", "angry"),
    entry("confused", ":?", "confused"),
];

/// All entries, in picker order
pub fn catalog() -> &'static [EmojiEntry] {
    &CATALOG
}

/// Entry for a short code (`:)`) or its `:id:` form (`:smile:`)
pub fn lookup(code: &str) -> Option<&'static EmojiEntry> {
    CATALOG.iter().find(|e| e.matches(code))
}

pub fn by_id(id: &str) -> Option<&'static EmojiEntry> {
    CATALOG.iter().find(|e| e.id == id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_entry_has_a_unicode_glyph() {
        for entry in catalog() {
            assert_ne!(entry.glyph(), entry.code, "no glyph for {}", entry.id);
        }
    }

    #[test]
    fn test_lookup_by_code_and_id() {
        assert_eq!(lookup(":)").map(|e| e.id), Some("smile"));
        assert_eq!(lookup(":smile:").map(|e| e.code), Some(":)"));
        assert_eq!(lookup("<3").map(|e| e.glyph()), Some("❤️"));
        assert_eq!(lookup(":rain:"), None);
        assert_eq!(lookup("smile"), None);
    }

    #[test]
    fn test_by_id() {
        assert_eq!(by_id("cool").map(|e| e.glyph()), Some("😎"));
        assert!(by_id("nope").is_none());
    }
}
