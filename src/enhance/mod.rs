// src/enhance/mod.rs
//
// Post-render enhancement of a rendered post page.
//
// - Images: `<body-selector> p > img`. The direct parent <p> gains the wide-image class
//   when the image is at least `image_threshold` px wide. Widths missing from the markup
//   are looked up after the scan, once per image.
// - Code: `<body-selector> pre[class^="language-"]`. The <pre> gains the wide-pre class
//   when its longest visible line is longer than `code_threshold` characters.
// - Only start tags are rewritten, and only by adding a class that is not already there,
//   so running the enhancer on its own output changes nothing.
// - An open <p> is closed implicitly by a block-level start tag, as browsers do; stray
//   end tags with no matching open element are ignored.

pub mod code;
pub mod images;

use std::collections::BTreeMap;
use std::ops::Range;

use tracing::{debug, trace};

use crate::config::{BodySelector, EnhanceSettings};
use crate::html::{self, Tag, Token, Tokenizer};
use crate::probe::WidthSource;

use images::{Candidate, ImageWidth};

/// What one pass over a page did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PageReport {
    pub images_seen: usize,
    pub images_deferred: usize,
    pub images_widened: usize,
    pub code_blocks_seen: usize,
    pub code_blocks_skipped: usize,
    pub code_blocks_widened: usize,
}

impl PageReport {
    pub fn changed(&self) -> bool {
        self.images_widened > 0 || self.code_blocks_widened > 0
    }
}

#[derive(Debug)]
pub struct Enhanced {
    pub html: Vec<u8>,
    pub report: PageReport,
}

impl BodySelector {
    pub fn matches(&self, tag: &Tag<'_>) -> bool {
        match self {
            BodySelector::Class(c) => tag.has_class(c),
            BodySelector::Id(id) => tag.attr_str("id") == Some(id.as_str()),
        }
    }
}

/// An element still open at the current point of the scan.
struct Open<'a> {
    tag: Tag<'a>,
    span: Range<usize>,
    /// Some strict ancestor is the post body.
    inside_body: bool,
    is_body: bool,
}

impl Open<'_> {
    fn contains_body_content(&self) -> bool {
        self.inside_body || self.is_body
    }
}

/// A `<pre>` whose content is the next raw-text token.
struct PendingPre<'a> {
    tag: Tag<'a>,
    span: Range<usize>,
}

/// Classify images and code blocks in `src` and return the rewritten page.
pub fn enhance_document(
    src: &[u8],
    settings: &EnhanceSettings,
    widths: &mut dyn WidthSource,
) -> Enhanced {
    let mut report = PageReport::default();
    let mut stack: Vec<Open<'_>> = Vec::new();
    let mut candidates: Vec<Candidate> = Vec::new();
    let mut pending_pre: Option<PendingPre<'_>> = None;
    // start-tag offset -> (span, tag, classes to add)
    let mut edits: BTreeMap<usize, (Range<usize>, Tag<'_>, Vec<&str>)> = BTreeMap::new();

    for token in Tokenizer::new(src) {
        match token {
            Token::Start { span, tag } => {
                if html::closes_paragraph(tag.name)
                    && stack.last().is_some_and(|o| o.tag.is("p"))
                {
                    stack.pop();
                }

                let inside_body = stack.last().is_some_and(Open::contains_body_content);

                if tag.is("img") {
                    if let Some(parent) = stack.last() {
                        if parent.tag.is("p") && parent.inside_body {
                            report.images_seen += 1;
                            let width = ImageWidth::of(&tag);
                            trace!("image candidate {:?}", width);
                            candidates.push(Candidate::new(parent.span.clone(), width));
                        }
                    }
                }

                if tag.is("pre") && inside_body && !tag.self_closing {
                    pending_pre = Some(PendingPre {
                        tag,
                        span: span.clone(),
                    });
                }

                if !tag.self_closing && !html::is_void(tag.name) {
                    let is_body = settings.body.matches(&tag);
                    stack.push(Open {
                        tag,
                        span,
                        inside_body,
                        is_body,
                    });
                }
            }
            Token::End { tag, .. } => {
                let open = stack
                    .iter()
                    .rposition(|o| o.tag.name.eq_ignore_ascii_case(tag.name));
                if let Some(pos) = open {
                    stack.truncate(pos);
                }
            }
            Token::RawText { name, content } => {
                let Some(pre) = pending_pre.take() else {
                    continue;
                };
                if !name.eq_ignore_ascii_case(b"pre") {
                    continue;
                }
                let Some(threshold) = settings.code_threshold else {
                    continue;
                };
                report.code_blocks_seen += 1;
                let Some(lang) = code::language(&pre.tag, &settings.language_prefix) else {
                    report.code_blocks_skipped += 1;
                    continue;
                };
                let inner = String::from_utf8_lossy(&src[content]);
                if code::is_wide(&inner, threshold) {
                    debug!("wide {lang} block at byte {}", pre.span.start);
                    push_edit(&mut edits, pre.span, pre.tag, &settings.wide_pre_class);
                }
            }
            Token::Text(_) | Token::Comment(_) | Token::Declaration(_) => {}
        }
    }

    // Deferred checks: each candidate resolves exactly once.
    for mut candidate in candidates {
        if candidate.is_deferred() {
            report.images_deferred += 1;
        }
        let Some(width) = candidate.resolve(widths) else {
            continue;
        };
        if images::is_wide(width, settings.image_threshold) {
            let parent = candidate.parent;
            let tag = Tag::parse(&src[parent.clone()]);
            push_edit(&mut edits, parent, tag, &settings.wide_image_class);
        }
    }

    let mut replacements: Vec<(Range<usize>, Vec<u8>)> = Vec::with_capacity(edits.len());
    for (_, (span, tag, classes)) in edits {
        let mut rewritten: Option<Vec<u8>> = None;
        for class in classes {
            let current = rewritten.as_deref().map_or(tag, Tag::parse);
            if let Some(bytes) = html::add_class(&current, class) {
                rewritten = Some(bytes);
                if class == settings.wide_image_class {
                    report.images_widened += 1;
                } else {
                    report.code_blocks_widened += 1;
                }
            }
        }
        if let Some(bytes) = rewritten {
            replacements.push((span, bytes));
        }
    }

    Enhanced {
        html: html::apply_edits(src, &replacements),
        report,
    }
}

fn push_edit<'a, 'c>(
    edits: &mut BTreeMap<usize, (Range<usize>, Tag<'a>, Vec<&'c str>)>,
    span: Range<usize>,
    tag: Tag<'a>,
    class: &'c str,
) {
    let entry = edits
        .entry(span.start)
        .or_insert_with(|| (span, tag, Vec::new()));
    if !entry.2.contains(&class) {
        entry.2.push(class);
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::config::Profile;
    use crate::probe::NoProbe;

    fn run(src: &str) -> (String, PageReport) {
        let out = enhance_document(src.as_bytes(), &EnhanceSettings::default(), &mut NoProbe);
        (String::from_utf8(out.html).unwrap(), out.report)
    }

    #[test]
    fn widens_paragraph_of_wide_image() {
        let (html, report) = run(r#"<div class="post__body"><p><img src="a.png" width="800"></p></div>"#);
        assert_eq!(
            html,
            r#"<div class="post__body"><p class="post__wide-image"><img src="a.png" width="800"></p></div>"#
        );
        assert_eq!(report.images_widened, 1);
    }

    #[test]
    fn leaves_narrow_image_alone() {
        let src = r#"<div class="post__body"><p><img src="a.png" width="400"></p></div>"#;
        let (html, report) = run(src);
        assert_eq!(html, src);
        assert!(!report.changed());
    }

    #[test]
    fn only_direct_paragraph_parent() {
        let src = r#"<div class="post__body"><p><a href="x"><img width="900"></a></p><figure><img width="900"></figure></div>"#;
        let (html, _) = run(src);
        assert_eq!(html, src);
    }

    #[test]
    fn ignores_images_outside_post_body() {
        let src = r#"<header><p><img width="900"></p></header><div class="post__body"></div>"#;
        assert_eq!(run(src).0, src);
    }

    #[test]
    fn implicit_paragraph_close() {
        // The <div> closes the open <p>, so the image's parent is the div.
        let src = r#"<div class="post__body"><p>text<div><img width="900"></div></div>"#;
        assert_eq!(run(src).0, src);
    }

    #[test]
    fn deferred_width_from_source() {
        let src = r#"<main class="post__body"><p><img src="/big.png"></p><p><img src="/small.png"></p></main>"#;
        let mut widths: HashMap<String, u32> = HashMap::new();
        widths.insert("/big.png".into(), 1200);
        widths.insert("/small.png".into(), 300);
        let out = enhance_document(src.as_bytes(), &EnhanceSettings::default(), &mut widths);
        assert_eq!(
            String::from_utf8(out.html).unwrap(),
            r#"<main class="post__body"><p class="post__wide-image"><img src="/big.png"></p><p><img src="/small.png"></p></main>"#
        );
        assert_eq!(out.report.images_deferred, 2);
        assert_eq!(out.report.images_widened, 1);
    }

    #[test]
    fn natural_width_overrides_width_attribute() {
        let src = r#"<div class="post__body"><p><img src="big.png" width="400"></p><p><img src="small.png" width="900"></p></div>"#;
        let mut widths: HashMap<String, u32> = HashMap::new();
        widths.insert("big.png".into(), 1200);
        widths.insert("small.png".into(), 300);
        let out = enhance_document(src.as_bytes(), &EnhanceSettings::default(), &mut widths);
        assert_eq!(
            String::from_utf8(out.html).unwrap(),
            r#"<div class="post__body"><p class="post__wide-image"><img src="big.png" width="400"></p><p><img src="small.png" width="900"></p></div>"#
        );
        assert_eq!(out.report.images_deferred, 2);
        assert_eq!(out.report.images_widened, 1);
    }

    #[test]
    fn two_wide_images_in_one_paragraph() {
        let src = r#"<div class="post__body"><p><img width="800"><img width="900"></p></div>"#;
        let (html, report) = run(src);
        assert_eq!(html.matches("post__wide-image").count(), 1);
        assert_eq!(report.images_widened, 1);
    }

    #[test]
    fn widens_long_code_blocks() {
        let long = "x".repeat(63);
        let src = format!(
            r#"<div class="post__body"><pre class="language-js"><code>a<br>{long}</code></pre></div>"#
        );
        let (html, report) = run(&src);
        assert!(html.contains(r#"<pre class="language-js post__wide-pre">"#));
        assert!(html.contains(&long));
        assert_eq!(report.code_blocks_widened, 1);
    }

    #[test]
    fn keeps_short_code_blocks() {
        let line = "x".repeat(62);
        let src = format!(r#"<div class="post__body"><pre class="language-js">{line}</pre></div>"#);
        assert_eq!(run(&src).0, src);
    }

    #[test]
    fn numeric_references_count_as_one_character() {
        let line = format!("{}{}", "x".repeat(58), "&#39;&#x27;&hellip;&#8217;");
        let src = format!(r#"<div class="post__body"><pre class="language-js">{line}</pre></div>"#);
        let (html, report) = run(&src);
        assert_eq!(html, src);
        assert_eq!(report.code_blocks_widened, 0);
    }

    #[test]
    fn skips_pre_without_language() {
        let src = format!(r#"<div class="post__body"><pre>{}</pre></div>"#, "y".repeat(80));
        let (html, report) = run(&src);
        assert_eq!(html, src);
        assert_eq!(report.code_blocks_skipped, 1);
    }

    #[test]
    fn markup_inside_pre_does_not_open_elements() {
        let src = r#"<div class="post__body"><pre class="language-html">&lt;p&gt;<p><img width="999"></pre></div>"#;
        assert_eq!(run(src).0, src);
    }

    #[test]
    fn second_pass_is_a_no_op() {
        let src = format!(
            r#"<article id="post-body"><div class="post__body"><p class="lead"><img width="800"></p><pre class="language-rs">{}</pre></div></article>"#,
            "z".repeat(70)
        );
        let (once, _) = run(&src);
        let (twice, report) = run(&once);
        assert_eq!(once, twice);
        assert!(!report.changed());
        assert!(once.contains(r#"<p class="lead post__wide-image">"#));
    }

    #[test]
    fn legacy_profile() {
        let settings = EnhanceSettings::for_profile(Profile::Legacy);
        let src = r#"<div id="post-body"><p><img width="520"></p><pre class="language-c">"#.to_string()
            + &"q".repeat(90)
            + "</pre></div>";
        let out = enhance_document(src.as_bytes(), &settings, &mut NoProbe);
        let html = String::from_utf8(out.html).unwrap();
        assert!(html.contains(r#"<p class="img-wrap">"#));
        assert!(!html.contains("post__wide-pre"));
    }
}
