// src/config.rs
//
// Site configuration, loaded from a JSON file (`site.json` by default).
//
// - Every field has a default; an empty object or no file at all gives the
//   stock blog layout.
// - Enhancer selectors, classes and thresholds come in named profiles that
//   track the page markup. Individual fields can be overridden on top.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{PolishError, Result};

/// Default config file name, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "site.json";

/// Images at least this wide (px) get the wide-image class.
pub const WIDE_IMAGE_THRESHOLD: u32 = 760;
pub const LEGACY_WIDE_IMAGE_THRESHOLD: u32 = 518;

/// Code blocks whose longest line is longer than this get the wide-pre class.
pub const WIDE_PRE_THRESHOLD: usize = 62;

pub const POST_BODY_SELECTOR: &str = ".post__body";
pub const LEGACY_POST_BODY_SELECTOR: &str = "#post-body";
pub const WIDE_IMAGE_CLASS: &str = "post__wide-image";
pub const LEGACY_WIDE_IMAGE_CLASS: &str = "img-wrap";
pub const WIDE_PRE_CLASS: &str = "post__wide-pre";
pub const LANGUAGE_CLASS_PREFIX: &str = "language-";

/* ============================== Selectors ================================ */

/// The element holding a post's body: `.class` or `#id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum BodySelector {
    Class(String),
    Id(String),
}

impl FromStr for BodySelector {
    type Err = PolishError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let mut chars = s.chars();
        let kind = chars.next();
        let name = chars.as_str();
        if name.is_empty() || name.contains(char::is_whitespace) {
            return Err(PolishError::config(format!("invalid body selector {s:?}")));
        }
        match kind {
            Some('.') => Ok(Self::Class(name.to_string())),
            Some('#') => Ok(Self::Id(name.to_string())),
            _ => Err(PolishError::config(format!(
                "body selector {s:?} must start with '.' or '#'"
            ))),
        }
    }
}

impl TryFrom<String> for BodySelector {
    type Error = PolishError;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<BodySelector> for String {
    fn from(sel: BodySelector) -> String {
        sel.to_string()
    }
}

impl fmt::Display for BodySelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Class(c) => write!(f, ".{c}"),
            Self::Id(id) => write!(f, "#{id}"),
        }
    }
}

/* =============================== Profiles ================================ */

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Profile {
    /// `.post__body`, 760px images, code widening on.
    #[default]
    Current,
    /// `#post-body`, 518px images into `img-wrap`, no code widening.
    Legacy,
}

/// Everything the enhancer needs to know about the page markup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnhanceSettings {
    pub body: BodySelector,
    pub image_threshold: u32,
    pub wide_image_class: String,
    /// `None` disables code-block widening.
    pub code_threshold: Option<usize>,
    pub wide_pre_class: String,
    pub language_prefix: String,
}

impl EnhanceSettings {
    pub fn for_profile(profile: Profile) -> Self {
        match profile {
            Profile::Current => Self {
                body: BodySelector::Class(POST_BODY_SELECTOR[1..].to_string()),
                image_threshold: WIDE_IMAGE_THRESHOLD,
                wide_image_class: WIDE_IMAGE_CLASS.to_string(),
                code_threshold: Some(WIDE_PRE_THRESHOLD),
                wide_pre_class: WIDE_PRE_CLASS.to_string(),
                language_prefix: LANGUAGE_CLASS_PREFIX.to_string(),
            },
            Profile::Legacy => Self {
                body: BodySelector::Id(LEGACY_POST_BODY_SELECTOR[1..].to_string()),
                image_threshold: LEGACY_WIDE_IMAGE_THRESHOLD,
                wide_image_class: LEGACY_WIDE_IMAGE_CLASS.to_string(),
                code_threshold: None,
                wide_pre_class: WIDE_PRE_CLASS.to_string(),
                language_prefix: LANGUAGE_CLASS_PREFIX.to_string(),
            },
        }
    }
}

impl Default for EnhanceSettings {
    fn default() -> Self {
        Self::for_profile(Profile::Current)
    }
}

/// Per-field overrides applied on top of a profile.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EnhanceOverrides {
    pub body_selector: Option<BodySelector>,
    pub image_threshold: Option<u32>,
    pub wide_image_class: Option<String>,
    pub code_threshold: Option<usize>,
    pub wide_pre_class: Option<String>,
    pub language_prefix: Option<String>,
}

/* ============================== Passthrough ============================== */

/// One verbatim copy: `from` (relative to the site root) into `to` (relative to output).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassthroughCopy {
    pub from: PathBuf,
    /// Defaults to the same relative path as `from`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<PathBuf>,
}

impl PassthroughCopy {
    pub fn same(path: &str) -> Self {
        Self {
            from: PathBuf::from(path),
            to: None,
        }
    }

    pub fn renamed(from: &str, to: &str) -> Self {
        Self {
            from: PathBuf::from(from),
            to: Some(PathBuf::from(to)),
        }
    }

    pub fn destination(&self) -> &Path {
        self.to.as_deref().unwrap_or(&self.from)
    }
}

fn default_passthrough() -> Vec<PassthroughCopy> {
    vec![
        PassthroughCopy::same("assets/fonts"),
        PassthroughCopy::same("assets/images"),
        PassthroughCopy::same("assets/js"),
        // Compiled stylesheet from the CSS pipeline.
        PassthroughCopy::renamed("_tmp/style.css", "assets/css/style.css"),
        // Syntax-highlighting theme.
        PassthroughCopy::same("assets/css/prism-material-oceanic.css"),
    ]
}

/* ================================ Config ================================= */

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteConfig {
    /// Site source root; passthrough sources resolve against it.
    pub root: PathBuf,
    /// Rendered output directory, relative to `root` unless absolute.
    pub output: PathBuf,
    pub profile: Profile,
    pub enhance: EnhanceOverrides,
    pub passthrough: Vec<PassthroughCopy>,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            output: PathBuf::from("_site"),
            profile: Profile::default(),
            enhance: EnhanceOverrides::default(),
            passthrough: default_passthrough(),
        }
    }
}

impl SiteConfig {
    /// Load a config file. Relative `root` values resolve against the file's directory.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| PolishError::io(path, e))?;
        let mut config: SiteConfig = serde_json::from_str(&text)?;
        if config.root.is_relative() {
            if let Some(dir) = path.parent() {
                config.root = dir.join(&config.root);
            }
        }
        config.validate()?;
        Ok(config)
    }

    /// Load `path` if given, else `site.json` if present, else defaults.
    pub fn discover(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::load(p),
            None => {
                let fallback = Path::new(DEFAULT_CONFIG_FILE);
                if fallback.is_file() {
                    Self::load(fallback)
                } else {
                    tracing::debug!("no {DEFAULT_CONFIG_FILE}; using defaults");
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        for class in [&self.enhance.wide_image_class, &self.enhance.wide_pre_class]
            .into_iter()
            .flatten()
        {
            if class.is_empty() || class.contains(char::is_whitespace) {
                return Err(PolishError::config(format!("invalid class name {class:?}")));
            }
        }
        if self.enhance.language_prefix.as_deref() == Some("") {
            return Err(PolishError::config("language_prefix must not be empty"));
        }
        for copy in &self.passthrough {
            if copy.from.is_absolute() || copy.destination().is_absolute() {
                return Err(PolishError::config(format!(
                    "passthrough paths must be relative: {}",
                    copy.from.display()
                )));
            }
        }
        Ok(())
    }

    pub fn output_dir(&self) -> PathBuf {
        self.root.join(&self.output)
    }

    /// Profile settings with this config's overrides applied.
    pub fn enhance_settings(&self) -> EnhanceSettings {
        let mut s = EnhanceSettings::for_profile(self.profile);
        let o = &self.enhance;
        if let Some(body) = &o.body_selector {
            s.body = body.clone();
        }
        if let Some(t) = o.image_threshold {
            s.image_threshold = t;
        }
        if let Some(c) = &o.wide_image_class {
            s.wide_image_class = c.clone();
        }
        if let Some(t) = o.code_threshold {
            s.code_threshold = Some(t);
        }
        if let Some(c) = &o.wide_pre_class {
            s.wide_pre_class = c.clone();
        }
        if let Some(p) = &o.language_prefix {
            s.language_prefix = p.clone();
        }
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_is_the_default() {
        let config: SiteConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, SiteConfig::default());
        assert_eq!(config.enhance_settings(), EnhanceSettings::default());
        assert_eq!(config.passthrough.len(), 5);
    }

    #[test]
    fn parses_selectors() {
        assert_eq!(
            ".post__body".parse::<BodySelector>().unwrap(),
            BodySelector::Class("post__body".into())
        );
        assert_eq!(
            "#post-body".parse::<BodySelector>().unwrap(),
            BodySelector::Id("post-body".into())
        );
        assert!("post".parse::<BodySelector>().is_err());
        assert!(".".parse::<BodySelector>().is_err());
        assert!("".parse::<BodySelector>().is_err());
    }

    #[test]
    fn legacy_profile_with_overrides() {
        let config: SiteConfig = serde_json::from_str(
            r#"{
                "profile": "legacy",
                "enhance": { "image_threshold": 520, "body_selector": ".content" },
                "passthrough": [{ "from": "static" }]
            }"#,
        )
        .unwrap();
        let s = config.enhance_settings();
        assert_eq!(s.image_threshold, 520);
        assert_eq!(s.body, BodySelector::Class("content".into()));
        assert_eq!(s.wide_image_class, LEGACY_WIDE_IMAGE_CLASS);
        assert_eq!(s.code_threshold, None);
        assert_eq!(config.passthrough[0].destination(), Path::new("static"));
    }

    #[test]
    fn rejects_unknown_fields_and_bad_classes() {
        assert!(serde_json::from_str::<SiteConfig>(r#"{"outptu": "x"}"#).is_err());

        let mut config = SiteConfig::default();
        config.enhance.wide_pre_class = Some("two words".into());
        assert!(config.validate().is_err());
    }
}
