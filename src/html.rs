// src/html.rs
//
// Byte-level HTML tokenizer and start-tag rewriter.
//
// - Tags: '<' followed by a name char, '/', '!' or '?' starts markup; the tag runs to
//   the first '>' outside quotes. A '<' followed by anything else is text.
// - Comments: "<!--" up to the next "-->"; unterminated comments run to EOF.
// - RAW-TEXT tags (pre, textarea, script, style, xmp): everything up to the matching
//   end tag is a single RawText token, so markup inside <pre> never opens elements.
// - Declarations (<!DOCTYPE ...>, <?xml ...?>) are reported as such.
// - Nothing here allocates per token; tokens borrow from the source.
//
// Rewriting only ever touches start tags: `add_class` returns a new tag with one more
// class token, or None when the token is already present.

use std::ops::Range;

use memchr::memchr;

/* =============================== Core sets =============================== */

pub fn is_void(name: &[u8]) -> bool {
    matches_ignore_ascii_case(
        name,
        &[
            b"area", b"base", b"br", b"col", b"embed", b"hr", b"img", b"input", b"link", b"meta",
            b"param", b"source", b"track", b"wbr",
        ],
    )
}

pub fn is_raw_text(name: &[u8]) -> bool {
    matches_ignore_ascii_case(name, &[b"pre", b"textarea", b"script", b"style", b"xmp"])
}

/// Start tags that implicitly close an open `<p>`.
pub fn closes_paragraph(name: &[u8]) -> bool {
    matches_ignore_ascii_case(
        name,
        &[
            b"address", b"article", b"aside", b"blockquote", b"details", b"dialog", b"div",
            b"dl", b"fieldset", b"figcaption", b"figure", b"footer", b"form", b"h1", b"h2",
            b"h3", b"h4", b"h5", b"h6", b"header", b"hgroup", b"hr", b"main", b"menu", b"nav",
            b"ol", b"p", b"pre", b"search", b"section", b"table", b"ul",
        ],
    )
}

/* ============================ Utility predicates ========================= */

#[inline]
fn is_name_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'-' || b == b'_' || b == b':'
}

#[inline]
fn is_ws(b: u8) -> bool {
    b == b' ' || b == b'\t' || b == b'\n' || b == b'\r' || b == b'\x0c'
}

#[inline]
fn is_markup_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'/' || b == b'!' || b == b'?'
}

fn matches_ignore_ascii_case(name: &[u8], set: &[&[u8]]) -> bool {
    set.iter().any(|&s| name.eq_ignore_ascii_case(s))
}

/* =============================== Tag parsing ============================= */

/// A single tag, borrowed from the document.
#[derive(Clone, Copy, Debug)]
pub struct Tag<'a> {
    /// The whole `<...>` including brackets.
    pub raw: &'a [u8],
    pub name: &'a [u8],
    pub is_end: bool,
    pub self_closing: bool,
    /// Offset in `raw` just past the name, where attributes begin.
    attrs_start: usize,
}

/// One attribute of a start tag. Spans are relative to `Tag::raw`.
#[derive(Clone, Debug)]
pub struct Attr<'a> {
    pub name: &'a [u8],
    pub value: Option<&'a [u8]>,
    /// Span of the value, without quotes.
    pub value_span: Range<usize>,
    pub quoted: bool,
}

impl<'a> Tag<'a> {
    /// Extract tag name, end/self-closing flags from raw `<...>` bytes.
    pub fn parse(raw: &'a [u8]) -> Tag<'a> {
        let n = raw.len();
        let mut i = 1;

        let mut is_end = false;
        if i < n && raw[i] == b'/' {
            is_end = true;
            i += 1;
        }
        while i < n && is_ws(raw[i]) {
            i += 1;
        }
        let start = i;
        while i < n && is_name_char(raw[i]) {
            i += 1;
        }
        let name = &raw[start..i];

        // self-closing? check before '>'
        let mut j = n.saturating_sub(1);
        while j > 0 && is_ws(raw[j - 1]) {
            j -= 1;
        }
        let self_closing = j >= 2 && raw[j - 1] == b'/';

        Tag {
            raw,
            name,
            is_end,
            self_closing,
            attrs_start: i,
        }
    }

    pub fn is(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name.as_bytes())
    }

    pub fn attrs(&self) -> Attrs<'a> {
        Attrs {
            raw: self.raw,
            i: if self.is_end { self.raw.len() } else { self.attrs_start },
        }
    }

    /// First attribute named `name` (ASCII case-insensitive).
    pub fn attr(&self, name: &str) -> Option<Attr<'a>> {
        self.attrs()
            .find(|a| a.name.eq_ignore_ascii_case(name.as_bytes()))
    }

    pub fn attr_str(&self, name: &str) -> Option<&'a str> {
        self.attr(name)
            .and_then(|a| a.value)
            .and_then(|v| std::str::from_utf8(v).ok())
    }

    pub fn classes(&self) -> impl Iterator<Item = &'a str> {
        self.attr_str("class")
            .unwrap_or("")
            .split_ascii_whitespace()
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes().any(|c| c == class)
    }
}

/// Attribute scanner: [name] ( '=' [value] )?, value quoted or unquoted.
pub struct Attrs<'a> {
    raw: &'a [u8],
    i: usize,
}

impl<'a> Iterator for Attrs<'a> {
    type Item = Attr<'a>;

    fn next(&mut self) -> Option<Attr<'a>> {
        let tag = self.raw;
        let len = tag.len();

        while self.i < len && tag[self.i] != b'>' {
            let mut i = self.i;
            // skip whitespace and slashes
            while i < len && (is_ws(tag[i]) || tag[i] == b'/') {
                i += 1;
            }
            if i >= len || tag[i] == b'>' {
                self.i = len;
                return None;
            }

            if !is_name_char(tag[i]) {
                // Not a valid name start; advance to avoid infinite loops.
                self.i = i + 1;
                continue;
            }
            let name_start = i;
            i += 1;
            while i < len && is_name_char(tag[i]) {
                i += 1;
            }
            let name = &tag[name_start..i];

            let mut j = i;
            while j < len && is_ws(tag[j]) {
                j += 1;
            }

            // optional "= value"
            if j < len && tag[j] == b'=' {
                j += 1;
                while j < len && is_ws(tag[j]) {
                    j += 1;
                }
                if j < len && (tag[j] == b'"' || tag[j] == b'\'') {
                    let q = tag[j];
                    let v_start = j + 1;
                    let v_end = memchr(q, &tag[v_start..]).map_or(len, |o| v_start + o);
                    self.i = (v_end + 1).min(len);
                    return Some(Attr {
                        name,
                        value: Some(&tag[v_start..v_end]),
                        value_span: v_start..v_end,
                        quoted: true,
                    });
                }
                let v_start = j;
                while j < len && !is_ws(tag[j]) && tag[j] != b'>' {
                    j += 1;
                }
                self.i = j;
                return Some(Attr {
                    name,
                    value: Some(&tag[v_start..j]),
                    value_span: v_start..j,
                    quoted: false,
                });
            }

            self.i = i;
            return Some(Attr {
                name,
                value: None,
                value_span: i..i,
                quoted: false,
            });
        }
        None
    }
}

/// Find the '>' for a tag starting at `i` (s[i] == '<'), being quote-aware.
fn find_tag_end(s: &[u8], mut i: usize) -> Option<usize> {
    let n = s.len();
    i += 1;
    let mut quote: u8 = 0;
    while i < n {
        let b = s[i];
        if quote != 0 {
            if b == quote {
                quote = 0;
            }
        } else if b == b'"' || b == b'\'' {
            quote = b;
        } else if b == b'>' {
            return Some(i);
        }
        i += 1;
    }
    None
}

/// Index just past the "-->" closing a comment that starts at `i`.
fn find_comment_end(s: &[u8], i: usize) -> Option<usize> {
    let mut k = i + 4;
    while k < s.len() {
        let j = k + memchr(b'-', &s[k..])?;
        if s[j..].starts_with(b"-->") {
            return Some(j + 3);
        }
        k = j + 1;
    }
    None
}

/// Start of the end tag `</name>` that closes a raw-text element, searching from `i`.
fn find_raw_text_end(src: &[u8], i: usize, name: &[u8]) -> Option<usize> {
    let n = src.len();
    let mut j = i;
    while j < n {
        let pos = j + memchr(b'<', &src[j..])?;
        if pos + 2 >= n || src[pos + 1] != b'/' {
            j = pos + 1;
            continue;
        }
        let end = find_tag_end(src, pos)?;
        if Tag::parse(&src[pos..=end]).name.eq_ignore_ascii_case(name) {
            return Some(pos);
        }
        j = end + 1;
    }
    None
}

/* ============================== Tokenizer =============================== */

#[derive(Clone, Debug)]
pub enum Token<'a> {
    Text(Range<usize>),
    Comment(Range<usize>),
    Declaration(Range<usize>),
    Start { span: Range<usize>, tag: Tag<'a> },
    End { span: Range<usize>, tag: Tag<'a> },
    /// Content of a raw-text element; always directly follows its start tag.
    RawText { name: &'a [u8], content: Range<usize> },
}

pub struct Tokenizer<'a> {
    src: &'a [u8],
    pos: usize,
    raw: Option<&'a [u8]>,
}

impl<'a> Tokenizer<'a> {
    pub fn new(src: &'a [u8]) -> Self {
        Tokenizer { src, pos: 0, raw: None }
    }
}

impl<'a> Iterator for Tokenizer<'a> {
    type Item = Token<'a>;

    fn next(&mut self) -> Option<Token<'a>> {
        let src = self.src;
        let n = src.len();
        let i = self.pos;

        // Inside a RAW-TEXT element: everything up to the matching end tag.
        if let Some(name) = self.raw.take() {
            let content_end = find_raw_text_end(src, i, name).unwrap_or(n);
            self.pos = content_end;
            return Some(Token::RawText {
                name,
                content: i..content_end,
            });
        }

        if i >= n {
            return None;
        }

        if src[i..].starts_with(b"<!--") {
            let end = find_comment_end(src, i).unwrap_or(n);
            self.pos = end;
            return Some(Token::Comment(i..end));
        }

        if src[i] == b'<' && i + 1 < n && is_markup_start(src[i + 1]) {
            let Some(j) = find_tag_end(src, i) else {
                self.pos = n;
                return Some(Token::Text(i..n));
            };
            let span = i..j + 1;
            self.pos = j + 1;
            let tag = Tag::parse(&src[span.clone()]);

            if tag.name.is_empty() {
                return Some(Token::Declaration(span));
            }
            if tag.is_end {
                return Some(Token::End { span, tag });
            }
            if is_raw_text(tag.name) && !tag.self_closing {
                self.raw = Some(tag.name);
            }
            return Some(Token::Start { span, tag });
        }

        // Text run
        let next_lt = memchr(b'<', &src[i + 1..]).map_or(n, |off| i + 1 + off);
        self.pos = next_lt;
        Some(Token::Text(i..next_lt))
    }
}

/* ============================== Rewriting =============================== */

/// Return `tag` with `class` appended to its class list, or None if already present.
pub fn add_class(tag: &Tag<'_>, class: &str) -> Option<Vec<u8>> {
    if tag.has_class(class) {
        return None;
    }
    let raw = tag.raw;
    let mut out = Vec::with_capacity(raw.len() + class.len() + 10);

    match tag.attr("class") {
        Some(attr) if attr.value.is_some() => {
            let span = attr.value_span;
            let current = &raw[span.clone()];
            let needs_sep = current.last().is_some_and(|b| !is_ws(*b));
            if attr.quoted {
                out.extend_from_slice(&raw[..span.end]);
                if needs_sep {
                    out.push(b' ');
                }
                out.extend_from_slice(class.as_bytes());
                out.extend_from_slice(&raw[span.end..]);
            } else {
                // Unquoted values cannot hold a space; quote the new list.
                out.extend_from_slice(&raw[..span.start]);
                out.push(b'"');
                out.extend_from_slice(current);
                if needs_sep {
                    out.push(b' ');
                }
                out.extend_from_slice(class.as_bytes());
                out.push(b'"');
                out.extend_from_slice(&raw[span.end..]);
            }
        }
        Some(attr) => {
            // Bare `class` attribute with no value.
            let at = attr.value_span.end;
            out.extend_from_slice(&raw[..at]);
            out.extend_from_slice(b"=\"");
            out.extend_from_slice(class.as_bytes());
            out.push(b'"');
            out.extend_from_slice(&raw[at..]);
        }
        None => {
            let mut at = raw.len() - 1;
            if tag.self_closing {
                while at > 0 && raw[at - 1] != b'/' {
                    at -= 1;
                }
                at -= 1;
                while at > 0 && is_ws(raw[at - 1]) {
                    at -= 1;
                }
            }
            out.extend_from_slice(&raw[..at]);
            out.extend_from_slice(b" class=\"");
            out.extend_from_slice(class.as_bytes());
            out.push(b'"');
            out.extend_from_slice(&raw[at..]);
        }
    }
    Some(out)
}

/// Splice replacement tags into `src`. `edits` must be sorted and non-overlapping.
pub fn apply_edits(src: &[u8], edits: &[(Range<usize>, Vec<u8>)]) -> Vec<u8> {
    let extra: usize = edits.iter().map(|(_, b)| b.len()).sum();
    let mut out = Vec::with_capacity(src.len() + extra);
    let mut at = 0usize;
    for (span, bytes) in edits {
        out.extend_from_slice(&src[at..span.start]);
        out.extend_from_slice(bytes);
        at = span.end;
    }
    out.extend_from_slice(&src[at..]);
    out
}
