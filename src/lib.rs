//! Build-side helpers for a static blog.
//!
//! - [`filters`]: the `toDateString` and `removeWidows` template filters.
//! - [`enhance`]: post-render classification of wide images and wide code
//!   blocks in a rendered post page.
//! - [`passthrough`] and [`build`]: verbatim asset copies and the build pass
//!   that enhances every rendered page.

pub mod build;
pub mod config;
pub mod enhance;
pub mod error;
pub mod filters;
pub mod html;
pub mod passthrough;
pub mod probe;

pub use config::{EnhanceSettings, Profile, SiteConfig};
pub use error::{PolishError, Result};
