// src/probe.rs
//
// Natural image widths.
//
// - An image candidate with a `src` is checked through a WidthSource once the
//   whole page has been scanned.
// - FileProbe reads the image file's header from disk (PNG, GIF, JPEG, WebP).
// - NoProbe never resolves; the `width` attribute is then the only width.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Resolves an image `src` to its natural width in pixels.
pub trait WidthSource {
    fn natural_width(&mut self, src: &str) -> Option<u32>;
}

/// Never knows a width; deferred images stay unclassified.
pub struct NoProbe;

impl WidthSource for NoProbe {
    fn natural_width(&mut self, _src: &str) -> Option<u32> {
        None
    }
}

impl WidthSource for HashMap<String, u32> {
    fn natural_width(&mut self, src: &str) -> Option<u32> {
        self.get(src).copied()
    }
}

/// Reads PNG, GIF, JPEG and WebP headers from the rendered site on disk.
pub struct FileProbe {
    page_dir: PathBuf,
    site_root: PathBuf,
}

impl FileProbe {
    /// `page_dir` resolves relative URLs; `site_root` resolves `/`-rooted ones.
    pub fn new(page_dir: impl Into<PathBuf>, site_root: impl Into<PathBuf>) -> Self {
        Self {
            page_dir: page_dir.into(),
            site_root: site_root.into(),
        }
    }

    fn resolve(&self, src: &str) -> Option<PathBuf> {
        let src = src.trim();
        if src.is_empty() || src.starts_with("//") || has_scheme(src) {
            return None;
        }
        let path = src.split(['?', '#']).next().unwrap_or(src);
        match path.strip_prefix('/') {
            Some(rooted) => Some(self.site_root.join(rooted)),
            None => Some(self.page_dir.join(path)),
        }
    }
}

impl WidthSource for FileProbe {
    fn natural_width(&mut self, src: &str) -> Option<u32> {
        let path = self.resolve(src)?;
        match read_width(&path) {
            Some(w) => Some(w),
            None => {
                tracing::debug!("no width for {src} ({})", path.display());
                None
            }
        }
    }
}

fn has_scheme(src: &str) -> bool {
    match src.find(':') {
        Some(colon) => src[..colon]
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '+' || c == '-' || c == '.'),
        None => false,
    }
}

fn read_width(path: &Path) -> Option<u32> {
    let bytes = fs::read(path).ok()?;
    image_width(&bytes)
}

/* ============================ Header parsing ============================= */

/// Width from an image header, if the format is recognized.
pub fn image_width(b: &[u8]) -> Option<u32> {
    if b.starts_with(b"\x89PNG\r\n\x1a\n") {
        // IHDR is always first.
        return b.get(16..20).map(|w| u32::from_be_bytes([w[0], w[1], w[2], w[3]]));
    }
    if b.starts_with(b"GIF87a") || b.starts_with(b"GIF89a") {
        return b.get(6..8).map(|w| u32::from(u16::from_le_bytes([w[0], w[1]])));
    }
    if b.starts_with(&[0xff, 0xd8]) {
        return jpeg_width(b);
    }
    if b.len() >= 12 && &b[0..4] == b"RIFF" && &b[8..12] == b"WEBP" {
        return webp_width(b);
    }
    None
}

fn jpeg_width(b: &[u8]) -> Option<u32> {
    let mut i = 2usize;
    while i + 4 <= b.len() {
        if b[i] != 0xff {
            return None;
        }
        let marker = b[i + 1];
        // Fill bytes and standalone markers carry no length.
        if marker == 0xff {
            i += 1;
            continue;
        }
        if marker == 0x01 || (0xd0..=0xd7).contains(&marker) {
            i += 2;
            continue;
        }
        let len = usize::from(u16::from_be_bytes([b[i + 2], b[i + 3]]));
        let is_sof = (0xc0..=0xcf).contains(&marker) && !matches!(marker, 0xc4 | 0xc8 | 0xcc);
        if is_sof {
            // length(2) precision(1) height(2) width(2)
            let w = b.get(i + 7..i + 9)?;
            return Some(u32::from(u16::from_be_bytes([w[0], w[1]])));
        }
        if len < 2 {
            return None;
        }
        i += 2 + len;
    }
    None
}

fn webp_width(b: &[u8]) -> Option<u32> {
    let chunk = b.get(12..16)?;
    match chunk {
        b"VP8X" => {
            let w = b.get(24..27)?;
            Some((u32::from(w[0]) | u32::from(w[1]) << 8 | u32::from(w[2]) << 16) + 1)
        }
        b"VP8 " => {
            let w = b.get(26..28)?;
            Some(u32::from(u16::from_le_bytes([w[0], w[1]]) & 0x3fff))
        }
        b"VP8L" => {
            let w = b.get(21..23)?;
            Some((u32::from(w[0]) | (u32::from(w[1]) & 0x3f) << 8) + 1)
        }
        _ => None,
    }
}
