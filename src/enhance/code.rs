// src/enhance/code.rs
//
// Code-block widening.
//
// A highlighted block's inner markup is split on <br>; each line has its tags
// stripped, every character reference (&lt;, &hellip;, &#39;, &#x27;, ...) counted
// as one character, and surrounding whitespace trimmed. The block is wide when the
// longest non-empty line is longer than the threshold. Line content is only
// measured, never changed.

use std::sync::OnceLock;

use regex::Regex;

use crate::filters::utf16_len;
use crate::html::Tag;

/// Stands in for a collapsed entity while measuring.
const ENTITY_PLACEHOLDER: &str = "$";

struct Patterns {
    line_break: Regex,
    tag: Regex,
    entity: Regex,
}

fn patterns() -> &'static Patterns {
    static P: OnceLock<Patterns> = OnceLock::new();
    P.get_or_init(|| Patterns {
        line_break: Regex::new(r"(?i)<br\s*/?>").expect("static regex"),
        tag: Regex::new(r"<[^>]+>").expect("static regex"),
        entity: Regex::new(r"&(?:#[0-9]+|#[xX][0-9a-fA-F]+|[A-Za-z][A-Za-z0-9]*);")
            .expect("static regex"),
    })
}

/// Language named by a `<pre>`'s class attribute, when the attribute starts with `prefix`.
///
/// A block without that metadata is not a highlighted block and is skipped.
pub fn language<'a>(pre: &Tag<'a>, prefix: &str) -> Option<&'a str> {
    let class = pre.attr_str("class")?;
    let rest = class.strip_prefix(prefix)?;
    Some(rest.split_ascii_whitespace().next().unwrap_or(""))
}

/// Visible length of one line of highlighted markup.
pub fn visible_len(line: &str) -> usize {
    let p = patterns();
    let stripped = p.tag.replace_all(line, "");
    let collapsed = p.entity.replace_all(&stripped, ENTITY_PLACEHOLDER);
    utf16_len(collapsed.trim())
}

/// Longest visible line in a block's inner markup; 0 for an empty block.
pub fn longest_line(inner: &str) -> usize {
    patterns()
        .line_break
        .split(inner)
        .map(visible_len)
        .filter(|&len| len > 0)
        .max()
        .unwrap_or(0)
}

pub fn is_wide(inner: &str, threshold: usize) -> bool {
    longest_line(inner) > threshold
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_tags_and_entities() {
        let line = r#"<span class="token keyword">let</span> x &lt;&amp; y;"#;
        assert_eq!(visible_len(line), "let x $$ y;".len());
    }

    #[test]
    fn every_character_reference_counts_once() {
        for entity in ["&#39;", "&#x27;", "&hellip;", "&AMP;", "&nbsp;"] {
            assert_eq!(visible_len(entity), 1, "{entity}");
        }
        assert_eq!(visible_len("& b;"), 4);
        assert_eq!(visible_len("&#;"), 3);
    }

    #[test]
    fn numeric_references_at_the_threshold() {
        let at = format!("{}{}", "x".repeat(58), "&#39;".repeat(4));
        let over = format!("{}{}", "x".repeat(59), "&#x27;".repeat(4));
        assert_eq!(longest_line(&at), 62);
        assert!(!is_wide(&at, 62));
        assert!(is_wide(&over, 62));
    }

    #[test]
    fn measures_longest_line() {
        let inner = "short<br>a bit longer line<BR/>   <br />mid line  ";
        assert_eq!(longest_line(inner), "a bit longer line".len());
        assert_eq!(longest_line(""), 0);
        assert_eq!(longest_line("<br><br>"), 0);
    }

    #[test]
    fn threshold_is_exclusive() {
        let at = "x".repeat(62);
        let over = "x".repeat(63);
        assert!(!is_wide(&format!("a<br>{at}"), 62));
        assert!(is_wide(&format!("a<br>{over}"), 62));
    }

    #[test]
    fn language_from_class() {
        let pre = Tag::parse(br#"<pre class="language-rust line-numbers">"#);
        assert_eq!(language(&pre, "language-"), Some("rust"));

        let plain = Tag::parse(br#"<pre class="output language-rust">"#);
        assert_eq!(language(&plain, "language-"), None);
        assert_eq!(language(&Tag::parse(b"<pre>"), "language-"), None);
    }
}
