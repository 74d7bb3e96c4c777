// src/enhance/images.rs
//
// Image widening.
//
// - Candidate: an <img> whose direct parent is a <p> inside the post body.
// - Width: the natural width of the file named by `src`, looked up once through a
//   WidthSource after the page has been scanned. The `width` attribute is only the
//   fallback when the natural width cannot be resolved.
// - Wide: width >= threshold (inclusive).

use std::ops::Range;

use crate::html::Tag;
use crate::probe::WidthSource;

/// What the markup says about an image's width.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageWidth {
    /// Looked up for the natural width after the scan.
    pub src: Option<String>,
    /// The `width` attribute, used when no natural width is found.
    pub stated: Option<u32>,
}

impl ImageWidth {
    pub fn of(img: &Tag<'_>) -> Self {
        let src = img
            .attr_str("src")
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);
        let stated = img.attr_str("width").and_then(parse_pixels);
        Self { src, stated }
    }
}

/// `width` attribute values are non-negative integers, optionally with `px`.
fn parse_pixels(v: &str) -> Option<u32> {
    let v = v.trim();
    let v = v.strip_suffix("px").unwrap_or(v);
    v.parse().ok()
}

/// A candidate image and the paragraph that would receive the class.
#[derive(Debug)]
pub struct Candidate {
    /// Span of the parent `<p>` start tag in the document.
    pub parent: Range<usize>,
    width: Option<ImageWidth>,
}

impl Candidate {
    pub fn new(parent: Range<usize>, width: ImageWidth) -> Self {
        Self {
            parent,
            width: Some(width),
        }
    }

    pub fn is_deferred(&self) -> bool {
        self.width.as_ref().is_some_and(|w| w.src.is_some())
    }

    /// Resolve the width, natural width first. The stored width is consumed, so a
    /// candidate is only ever checked once; later calls return `None`.
    pub fn resolve(&mut self, widths: &mut dyn WidthSource) -> Option<u32> {
        let width = self.width.take()?;
        width
            .src
            .as_deref()
            .and_then(|src| widths.natural_width(src))
            .or(width.stated)
    }
}

pub fn is_wide(width: u32, threshold: u32) -> bool {
    width >= threshold
}
