use std::fs;
use std::path::{Path, PathBuf};

use minijinja::syntax::SyntaxConfig;
use minijinja::value::Value;
use minijinja::{AutoEscape, Environment, Error, ErrorKind, UndefinedBehavior};
use serde::Serialize;
use tracing::{error, info};

use crate::types::{BundleError, BundleManifest, ResourceRecord, Result, TemplateSource};

/// Delimiters of the meta-template. They must not overlap with the page
/// template syntax, which stays on the minijinja defaults.
pub const META_BLOCK: (&str, &str) = ("<%", "%>");
pub const META_VARIABLE: (&str, &str) = ("<?", "?>");
pub const META_COMMENT: (&str, &str) = ("<#", "#>");

#[derive(Serialize)]
struct BundleContext<'a> {
    files: Vec<&'a ResourceRecord>,
    templates: Vec<&'a TemplateSource>,
}

/// Renders `meta_template` with the manifest bound as `files` and `templates`.
pub fn render_bundle(manifest: &BundleManifest, name: &str, meta_template: &str) -> Result<String> {
    let mut env = Environment::new();
    env.set_syntax(meta_syntax()?);
    env.set_auto_escape_callback(|_| AutoEscape::None);
    env.set_undefined_behavior(UndefinedBehavior::Strict);
    env.set_keep_trailing_newline(true);
    env.add_filter("rust_str", rust_str);
    env.add_filter("rust_bytes", rust_bytes);

    env.add_template(name, meta_template)?;
    let context = BundleContext {
        files: manifest.files.values().collect(),
        templates: manifest.templates.values().collect(),
    };
    let rendered = env.get_template(name)?.render(context)?;
    Ok(rendered)
}

/// Reads the meta-template at `source`, renders it and replaces `target`.
/// The target is only touched once rendering fully succeeded.
pub fn generate(manifest: &BundleManifest, source: &Path, target: &Path) -> Result<()> {
    info!(source = %source.display(), "loading meta-template");
    let meta_template = fs::read_to_string(source).map_err(|err| BundleError::Io {
        path: source.to_path_buf(),
        source: err,
    })?;
    let name = source
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "bundle".to_string());

    let rendered = render_bundle(manifest, &name, &meta_template).inspect_err(|err| {
        error!(source = %source.display(), error = %err, "failed to render meta-template");
    })?;

    write_replacing(target, rendered.as_bytes())?;
    info!(
        target = %target.display(),
        files = manifest.files.len(),
        templates = manifest.templates.len(),
        "generated bundle"
    );
    Ok(())
}

fn meta_syntax() -> std::result::Result<SyntaxConfig, Error> {
    SyntaxConfig::builder()
        .block_delimiters(META_BLOCK.0, META_BLOCK.1)
        .variable_delimiters(META_VARIABLE.0, META_VARIABLE.1)
        .comment_delimiters(META_COMMENT.0, META_COMMENT.1)
        .build()
}

fn write_replacing(target: &Path, contents: &[u8]) -> Result<()> {
    let staging = staging_path(target);
    if let Err(source) = fs::write(&staging, contents) {
        let _ = fs::remove_file(&staging);
        return Err(BundleError::Io {
            path: staging,
            source,
        });
    }
    if let Err(source) = fs::rename(&staging, target) {
        let _ = fs::remove_file(&staging);
        return Err(BundleError::Io {
            path: target.to_path_buf(),
            source,
        });
    }
    Ok(())
}

fn staging_path(target: &Path) -> PathBuf {
    let name = target
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    target.with_file_name(format!(".{name}.partial"))
}

fn rust_str(value: String) -> String {
    format!("{value:?}")
}

fn rust_bytes(value: Value) -> std::result::Result<String, Error> {
    let bytes = value.as_bytes().ok_or_else(|| {
        Error::new(
            ErrorKind::InvalidOperation,
            "rust_bytes expects a byte or string value",
        )
    })?;
    let mut literal = String::with_capacity(bytes.len() + 3);
    literal.push_str("b\"");
    for byte in bytes {
        literal.extend(std::ascii::escape_default(*byte).map(char::from));
    }
    literal.push('"');
    Ok(literal)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ResourceRecord;

    fn manifest() -> BundleManifest {
        let mut manifest = BundleManifest::default();
        manifest.insert_file(ResourceRecord::new(
            "/js/app.js".into(),
            "text/javascript".into(),
            b"say(\"hi\")\n".to_vec(),
        ));
        manifest.insert_template(TemplateSource {
            alias: "pages/index.html".into(),
            content: b"<h1>{{ title }}</h1>".to_vec(),
        });
        manifest
    }

    #[test]
    fn renders_with_meta_delimiters_and_leaves_page_syntax_alone() {
        let meta = "<# header #>\
<% for file in files %><? file.path|rust_str ?> <? file.size ?> <? file.content_type ?>\n<% endfor %>\
<% for tpl in templates %><? tpl.alias ?>={{ kept }}\n<% endfor %>";

        let rendered = render_bundle(&manifest(), "meta", meta).expect("render");

        assert_eq!(
            rendered,
            "\"/js/app.js\" 10 text/javascript\npages/index.html={{ kept }}\n"
        );
    }

    #[test]
    fn rust_bytes_escapes_quotes_and_control_bytes() {
        let meta = "<% for file in files %><? file.content|rust_bytes ?><% endfor %>";
        let rendered = render_bundle(&manifest(), "meta", meta).expect("render");
        assert_eq!(rendered, r#"b"say(\"hi\")\n""#);

        let value = Value::from_bytes(vec![0u8, 0xff, b'\'']);
        assert_eq!(rust_bytes(value).expect("bytes"), r#"b"\x00\xff\'""#);
    }

    #[test]
    fn malformed_meta_template_is_an_error() {
        let err = render_bundle(&manifest(), "meta", "<% for file in files %>oops")
            .expect_err("unterminated block");
        assert!(matches!(err, BundleError::Template(_)));
    }

    #[test]
    fn missing_field_is_an_execution_error() {
        let err = render_bundle(&manifest(), "meta", "<% for f in files %><? f.nope ?><% endfor %>")
            .expect_err("strict undefined");
        assert!(matches!(err, BundleError::Template(_)));
    }

    #[test]
    fn failed_generation_keeps_previous_target() {
        let dir = tempfile::tempdir().expect("tempdir");
        let source = dir.path().join("bundle.rs.tmpl");
        let target = dir.path().join("bundle.rs");
        fs::write(&source, "<? files|length").expect("write source");
        fs::write(&target, "previous").expect("write target");

        assert!(generate(&manifest(), &source, &target).is_err());
        assert_eq!(fs::read_to_string(&target).expect("read target"), "previous");
        assert!(!staging_path(&target).exists());
    }

    #[test]
    fn generation_writes_full_output() {
        let dir = tempfile::tempdir().expect("tempdir");
        let source = dir.path().join("bundle.rs.tmpl");
        let target = dir.path().join("bundle.rs");
        fs::write(&source, "files=<? files|length ?> templates=<? templates|length ?>\n")
            .expect("write source");

        generate(&manifest(), &source, &target).expect("generate");
        assert_eq!(
            fs::read_to_string(&target).expect("read target"),
            "files=1 templates=1\n"
        );
    }
}
