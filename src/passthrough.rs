// src/passthrough.rs
//
// Passthrough copies: files and directories copied into the output tree byte
// for byte, never parsed.

use std::fs;
use std::path::Path;

use tracing::{debug, info, warn};

use crate::config::PassthroughCopy;
use crate::error::{PolishError, Result};

/// Copy every mapping from `root` into `output`. Returns the number of files written.
///
/// A missing source is skipped with a warning.
pub fn copy_all(copies: &[PassthroughCopy], root: &Path, output: &Path) -> Result<usize> {
    let mut files = 0usize;
    for copy in copies {
        let from = root.join(&copy.from);
        let to = output.join(copy.destination());
        if !from.exists() {
            warn!("passthrough source {} does not exist; skipping", from.display());
            continue;
        }
        let n = copy_path(&from, &to)?;
        info!("copied {} -> {} ({n} files)", from.display(), to.display());
        files += n;
    }
    Ok(files)
}

/// Copy a file or a directory tree. Returns the number of files written.
pub fn copy_path(from: &Path, to: &Path) -> Result<usize> {
    let meta = fs::metadata(from).map_err(|e| PolishError::io(from, e))?;
    if meta.is_dir() {
        return copy_dir(from, to);
    }
    if let Some(parent) = to.parent() {
        fs::create_dir_all(parent).map_err(|e| PolishError::io(parent, e))?;
    }
    fs::copy(from, to).map_err(|e| PolishError::io(from, e))?;
    debug!("copied {}", to.display());
    Ok(1)
}

fn copy_dir(from: &Path, to: &Path) -> Result<usize> {
    fs::create_dir_all(to).map_err(|e| PolishError::io(to, e))?;
    let mut files = 0usize;
    let entries = fs::read_dir(from).map_err(|e| PolishError::io(from, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| PolishError::io(from, e))?;
        files += copy_path(&entry.path(), &to.join(entry.file_name()))?;
    }
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn copies_files_and_trees() {
        let site = tempfile::tempdir().unwrap();
        let root = site.path();
        fs::create_dir_all(root.join("assets/fonts/sub")).unwrap();
        fs::write(root.join("assets/fonts/a.woff2"), b"\x00font").unwrap();
        fs::write(root.join("assets/fonts/sub/b.woff2"), b"b").unwrap();
        fs::create_dir_all(root.join("_tmp")).unwrap();
        fs::write(root.join("_tmp/style.css"), "body{}").unwrap();

        let copies = vec![
            PassthroughCopy::same("assets/fonts"),
            PassthroughCopy::renamed("_tmp/style.css", "assets/css/style.css"),
            PassthroughCopy::same("assets/missing"),
        ];
        let out = root.join("_site");
        let n = copy_all(&copies, root, &out).unwrap();

        assert_eq!(n, 3);
        assert_eq!(fs::read(out.join("assets/fonts/a.woff2")).unwrap(), b"\x00font");
        assert!(out.join("assets/fonts/sub/b.woff2").is_file());
        assert_eq!(fs::read_to_string(out.join("assets/css/style.css")).unwrap(), "body{}");
        assert!(!out.join("assets/missing").exists());
    }
}
