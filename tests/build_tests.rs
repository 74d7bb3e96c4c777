//! End-to-end build tests over a temporary site tree.

use std::fs;
use std::path::Path;

use postpolish::build::build;
use postpolish::config::{PassthroughCopy, SiteConfig};

fn png(width: u32) -> Vec<u8> {
    let mut b = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR".to_vec();
    b.extend_from_slice(&width.to_be_bytes());
    b.extend_from_slice(&200u32.to_be_bytes());
    b
}

fn write(path: &Path, contents: impl AsRef<[u8]>) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

const POST: &str = r#"<!DOCTYPE html>
<html>
<body>
  <article class="post">
    <div class="post__body">
      <p><img src="/assets/images/wide.png" alt=""></p>
      <p><img src="narrow.png" alt=""></p>
      <pre class="language-js"><code><span class="token keyword">const</span> veryLongIdentifierName <span class="token operator">=</span> anotherQuiteLongFunctionNameHere<span class="token punctuation">(</span><span class="token punctuation">)</span></code></pre>
      <pre class="language-js"><code>short<br>lines</code></pre>
    </div>
  </article>
</body>
</html>
"#;

#[test]
fn build_copies_assets_and_enhances_pages() {
    let site = tempfile::tempdir().unwrap();
    let root = site.path();

    write(&root.join("assets/images/wide.png"), png(1024));
    write(&root.join("assets/js/main.js"), "// noop");
    write(&root.join("_tmp/style.css"), "body { margin: 0 }");
    write(&root.join("_site/posts/hello/narrow.png"), png(320));
    write(&root.join("_site/posts/hello/index.html"), POST);
    write(&root.join("_site/index.html"), "<p><img width=\"2000\"></p>");

    let config = SiteConfig {
        root: root.to_path_buf(),
        ..SiteConfig::default()
    };
    let report = build(&config).unwrap();

    assert_eq!(report.files_copied, 3);
    assert!(root.join("_site/assets/css/style.css").is_file());
    assert!(root.join("_site/assets/images/wide.png").is_file());

    assert_eq!(report.pages_scanned, 2);
    assert_eq!(report.pages_changed, 1);
    assert_eq!(report.images_widened, 1);
    assert_eq!(report.code_blocks_widened, 1);

    let html = fs::read_to_string(root.join("_site/posts/hello/index.html")).unwrap();
    assert!(html.contains(r#"<p class="post__wide-image"><img src="/assets/images/wide.png""#));
    assert!(html.contains(r#"<p><img src="narrow.png""#));
    assert_eq!(html.matches(r#"<pre class="language-js post__wide-pre">"#).count(), 1);
    assert!(html.contains(r#"<pre class="language-js"><code>short"#));

    // Pages outside a post body are untouched.
    let index = fs::read_to_string(root.join("_site/index.html")).unwrap();
    assert_eq!(index, "<p><img width=\"2000\"></p>");

    // A second build changes nothing.
    let again = build(&config).unwrap();
    assert_eq!(again.pages_changed, 0);
    assert_eq!(
        fs::read_to_string(root.join("_site/posts/hello/index.html")).unwrap(),
        html
    );
}

#[test]
fn config_file_selects_profile_and_copies() {
    let site = tempfile::tempdir().unwrap();
    let root = site.path();
    write(&root.join("static/robots.txt"), "User-agent: *");
    write(
        &root.join("public/post.html"),
        r#"<div id="post-body"><p><img width="600"></p></div>"#,
    );
    write(
        &root.join("site.json"),
        r#"{
            "output": "public",
            "profile": "legacy",
            "passthrough": [{ "from": "static", "to": "." }]
        }"#,
    );

    let config = SiteConfig::load(&root.join("site.json")).unwrap();
    assert_eq!(config.passthrough, vec![PassthroughCopy::renamed("static", ".")]);

    let report = build(&config).unwrap();
    assert_eq!(report.files_copied, 1);
    assert!(root.join("public/robots.txt").is_file());
    assert_eq!(
        fs::read_to_string(root.join("public/post.html")).unwrap(),
        r#"<div id="post-body"><p class="img-wrap"><img width="600"></p></div>"#
    );
}

#[test]
fn missing_output_directory_is_not_an_error() {
    let site = tempfile::tempdir().unwrap();
    let config = SiteConfig {
        root: site.path().to_path_buf(),
        passthrough: Vec::new(),
        ..SiteConfig::default()
    };
    let report = build(&config).unwrap();
    assert_eq!(report.pages_scanned, 0);
}
