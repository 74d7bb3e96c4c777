// src/build.rs
//
// Build driver: passthrough copies first, then every rendered page in the
// output tree is enhanced in place. Unchanged pages are not rewritten.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::config::{EnhanceSettings, SiteConfig};
use crate::enhance::{enhance_document, PageReport};
use crate::error::{PolishError, Result};
use crate::passthrough;
use crate::probe::FileProbe;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildReport {
    pub files_copied: usize,
    pub pages_scanned: usize,
    pub pages_changed: usize,
    pub images_widened: usize,
    pub code_blocks_widened: usize,
}

impl BuildReport {
    fn add_page(&mut self, page: &PageReport) {
        self.pages_scanned += 1;
        if page.changed() {
            self.pages_changed += 1;
        }
        self.images_widened += page.images_widened;
        self.code_blocks_widened += page.code_blocks_widened;
    }
}

pub fn build(config: &SiteConfig) -> Result<BuildReport> {
    let output = config.output_dir();
    let settings = config.enhance_settings();
    let mut report = BuildReport {
        files_copied: passthrough::copy_all(&config.passthrough, &config.root, &output)?,
        ..BuildReport::default()
    };

    if !output.is_dir() {
        info!("output directory {} does not exist; nothing to enhance", output.display());
        return Ok(report);
    }

    let mut pages = Vec::new();
    collect_pages(&output, &mut pages)?;
    pages.sort();

    for page in &pages {
        let page_report = enhance_file(page, None, &settings, &output)?;
        report.add_page(&page_report);
    }

    info!(
        "enhanced {} of {} pages ({} images, {} code blocks widened)",
        report.pages_changed, report.pages_scanned, report.images_widened, report.code_blocks_widened
    );
    Ok(report)
}

/// Enhance one page. Writes to `output`, or back to `input` when it changed.
pub fn enhance_file(
    input: &Path,
    output: Option<&Path>,
    settings: &EnhanceSettings,
    site_root: &Path,
) -> Result<PageReport> {
    let src = fs::read(input).map_err(|e| PolishError::io(input, e))?;
    let page_dir = input.parent().unwrap_or(Path::new("."));
    let mut widths = FileProbe::new(page_dir, site_root);
    let enhanced = enhance_document(&src, settings, &mut widths);

    match output {
        Some(out) => fs::write(out, &enhanced.html).map_err(|e| PolishError::io(out, e))?,
        None if enhanced.report.changed() => {
            fs::write(input, &enhanced.html).map_err(|e| PolishError::io(input, e))?
        }
        None => {}
    }
    debug!("{}: {:?}", input.display(), enhanced.report);
    Ok(enhanced.report)
}

fn collect_pages(dir: &Path, pages: &mut Vec<PathBuf>) -> Result<()> {
    let entries = fs::read_dir(dir).map_err(|e| PolishError::io(dir, e))?;
    for entry in entries {
        let path = entry.map_err(|e| PolishError::io(dir, e))?.path();
        if path.is_dir() {
            collect_pages(&path, pages)?;
        } else if path
            .extension()
            .is_some_and(|e| e.to_string_lossy().eq_ignore_ascii_case("html"))
        {
            pages.push(path);
        }
    }
    Ok(())
}
