//! Structural content cleaning before DOM snapshots reach the model.

use once_cell::sync::Lazy;
use regex::Regex;

/// Strips non-interactive and noisy nodes from raw markup.
pub trait ContentCleaner: Send + Sync {
    fn clean(&self, raw: &str) -> String;
}

static BLOCK_TAGS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?is)<script\b[^>]*>.*?</script\s*>|<style\b[^>]*>.*?</style\s*>|<svg\b[^>]*>.*?</svg\s*>|<noscript\b[^>]*>.*?</noscript\s*>",
    )
    .expect("static pattern")
});
static VOID_TAGS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<(meta|link)\b[^>]*/?>").expect("static pattern"));
static COMMENTS: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<!--.*?-->").expect("static pattern"));
static HIDDEN_INPUTS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)<input\b[^>]*type\s*=\s*["']?hidden["']?[^>]*/?>"#).expect("static pattern")
});
static BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").expect("static pattern"));

/// Default cleaner: drops script/style/svg/noscript subtrees, meta and link
/// tags, comments, and hidden inputs, then collapses the leftover blank
/// lines. Keeps everything selector logic could still target.
#[derive(Debug, Default, Clone, Copy)]
pub struct MarkupCleaner;

impl ContentCleaner for MarkupCleaner {
    fn clean(&self, raw: &str) -> String {
        let cleaned = BLOCK_TAGS.replace_all(raw, "");
        let cleaned = VOID_TAGS.replace_all(&cleaned, "");
        let cleaned = COMMENTS.replace_all(&cleaned, "");
        let cleaned = HIDDEN_INPUTS.replace_all(&cleaned, "");
        BLANK_LINES.replace_all(&cleaned, "\n\n").trim().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_scripts_styles_and_comments() {
        let raw = r#"<html><head><meta charset="utf-8"><style>body{}</style></head>
<body><!-- hint --><script type="text/javascript">alert(1)</script>
<button id="go">Go</button></body></html>"#;
        let cleaned = MarkupCleaner.clean(raw);
        assert!(!cleaned.contains("script"));
        assert!(!cleaned.contains("style"));
        assert!(!cleaned.contains("hint"));
        assert!(!cleaned.contains("meta"));
        assert!(cleaned.contains(r#"<button id="go">Go</button>"#));
    }

    #[test]
    fn strips_hidden_inputs_but_keeps_visible_ones() {
        let raw = r#"<form><input type="hidden" name="csrf" value="x">
<input type="text" name="q"></form>"#;
        let cleaned = MarkupCleaner.clean(raw);
        assert!(!cleaned.contains("csrf"));
        assert!(cleaned.contains(r#"name="q""#));
    }

    #[test]
    fn multiline_script_bodies_are_removed() {
        let raw = "<body><script>\nlet a = 1;\nlet b = 2;\n</script><p>keep</p></body>";
        let cleaned = MarkupCleaner.clean(raw);
        assert!(!cleaned.contains("let a"));
        assert!(cleaned.contains("<p>keep</p>"));
    }
}
