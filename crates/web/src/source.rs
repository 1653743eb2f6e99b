use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use axum::body::Bytes;
use tracing::{debug, info, warn};
use tvmagic_bundle::{BundleManifest, content_type_for, list_files};

use crate::embedded::{EmbeddedFile, EmbeddedTemplate, linked_bundle};

/// One servable static file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticResource {
    pub path: String,
    pub content_type: String,
    pub size: usize,
    pub content: Bytes,
}

impl StaticResource {
    fn new(path: impl Into<String>, content_type: impl Into<String>, content: Bytes) -> Self {
        Self {
            path: path.into(),
            content_type: content_type.into(),
            size: content.len(),
            content,
        }
    }
}

/// Lookups every resource backend answers. A `None` is a miss, not a failure.
pub trait ResourceLookup {
    fn resource(&self, path: &str) -> Option<StaticResource>;
    fn template(&self, alias: &str) -> Option<Bytes>;
    /// Paths that get a static route at startup.
    fn static_paths(&self) -> Vec<String>;
}

/// Resources compiled into the binary. Never touches the filesystem.
#[derive(Debug, Default, Clone)]
pub struct EmbeddedSource {
    files: HashMap<String, StaticResource>,
    templates: HashMap<String, Bytes>,
}

impl EmbeddedSource {
    pub fn from_static(files: &'static [EmbeddedFile], templates: &'static [EmbeddedTemplate]) -> Self {
        let files = files
            .iter()
            .map(|file| {
                debug_assert_eq!(
                    file.size,
                    file.content.len(),
                    "embedded size mismatch for {}",
                    file.path
                );
                let resource = StaticResource::new(
                    file.path,
                    file.content_type,
                    Bytes::from_static(file.content),
                );
                (file.path.to_string(), resource)
            })
            .collect();
        let templates = templates
            .iter()
            .map(|tpl| (tpl.alias.to_string(), Bytes::from_static(tpl.content)))
            .collect();
        Self { files, templates }
    }

    pub fn from_manifest(manifest: BundleManifest) -> Self {
        let files = manifest
            .files
            .into_iter()
            .map(|(key, record)| {
                let resource =
                    StaticResource::new(record.path, record.content_type, Bytes::from(record.content));
                (key, resource)
            })
            .collect();
        let templates = manifest
            .templates
            .into_iter()
            .map(|(alias, source)| (alias, Bytes::from(source.content)))
            .collect();
        Self { files, templates }
    }
}

impl ResourceLookup for EmbeddedSource {
    fn resource(&self, path: &str) -> Option<StaticResource> {
        self.files.get(path).cloned()
    }

    fn template(&self, alias: &str) -> Option<Bytes> {
        self.templates.get(alias).cloned()
    }

    fn static_paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self.files.keys().cloned().collect();
        paths.sort();
        paths
    }
}

/// Development backend: every lookup reads the file again.
#[derive(Debug, Clone)]
pub struct FilesystemSource {
    static_root: PathBuf,
    template_root: PathBuf,
}

impl FilesystemSource {
    /// `web_root/static` holds static files; templates resolve against `web_root`.
    pub fn new(web_root: impl Into<PathBuf>) -> Self {
        let web_root = web_root.into();
        Self {
            static_root: web_root.join("static"),
            template_root: web_root,
        }
    }

    pub fn static_root(&self) -> &Path {
        &self.static_root
    }

    pub fn template_root(&self) -> &Path {
        &self.template_root
    }
}

impl ResourceLookup for FilesystemSource {
    fn resource(&self, path: &str) -> Option<StaticResource> {
        let file = resolve(&self.static_root, path)?;
        let content = read_optional(&file)?;
        Some(StaticResource::new(path, content_type_for(&file), content))
    }

    fn template(&self, alias: &str) -> Option<Bytes> {
        let file = resolve(&self.template_root, alias)?;
        read_optional(&file)
    }

    fn static_paths(&self) -> Vec<String> {
        list_files(&self.static_root)
            .into_iter()
            .filter(|path| is_static_asset(path))
            .collect()
    }
}

/// The registry backend, picked once at startup.
#[derive(Debug, Clone)]
pub enum ResourceSource {
    Embedded(EmbeddedSource),
    Filesystem(FilesystemSource),
}

impl ResourceSource {
    /// Embedded when the build linked a bundle in, otherwise reads below `web_root`.
    pub fn detect(web_root: impl Into<PathBuf>) -> Self {
        match linked_bundle() {
            Some((files, templates)) => {
                info!(files = files.len(), templates = templates.len(), "serving embedded resources");
                Self::Embedded(EmbeddedSource::from_static(files, templates))
            }
            None => {
                let source = FilesystemSource::new(web_root);
                info!(
                    root = %source.template_root().display(),
                    "serving resources from the filesystem"
                );
                Self::Filesystem(source)
            }
        }
    }

    pub fn is_embedded(&self) -> bool {
        matches!(self, Self::Embedded(_))
    }

    fn backend(&self) -> &dyn ResourceLookup {
        match self {
            Self::Embedded(source) => source,
            Self::Filesystem(source) => source,
        }
    }
}

impl ResourceLookup for ResourceSource {
    fn resource(&self, path: &str) -> Option<StaticResource> {
        self.backend().resource(path)
    }

    fn template(&self, alias: &str) -> Option<Bytes> {
        self.backend().template(alias)
    }

    fn static_paths(&self) -> Vec<String> {
        self.backend().static_paths()
    }
}

/// Filesystem mode only routes fonts, scripts, stylesheets and images.
pub fn is_static_asset(path: &str) -> bool {
    let path = Path::new(path);
    let in_fonts = path
        .parent()
        .and_then(|parent| parent.file_name())
        .is_some_and(|name| name == "fonts");
    let known_extension = matches!(
        path.extension().and_then(|ext| ext.to_str()),
        Some("js" | "css" | "png" | "jpg" | "jpeg" | "gif" | "svg" | "ico")
    );
    in_fonts || known_extension
}

fn resolve(root: &Path, key: &str) -> Option<PathBuf> {
    let rel = Path::new(key.trim_start_matches('/'));
    if rel.as_os_str().is_empty()
        || rel
            .components()
            .any(|component| !matches!(component, Component::Normal(_)))
    {
        return None;
    }
    Some(root.join(rel))
}

fn read_optional(path: &Path) -> Option<Bytes> {
    match fs::read(path) {
        Ok(content) => Some(Bytes::from(content)),
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "no such file");
            None
        }
        Err(err) => {
            warn!(path = %path.display(), error = %err, "failed to read file");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    static FILES: &[EmbeddedFile] = &[EmbeddedFile {
        path: "/css/app.css",
        content_type: "text/css",
        size: 6,
        content: b"body{}",
    }];
    static TEMPLATES: &[EmbeddedTemplate] = &[EmbeddedTemplate {
        alias: "pages/index.html",
        content: b"<p>{{ name }}</p>",
    }];

    fn write(path: &Path, content: &[u8]) {
        fs::create_dir_all(path.parent().expect("parent")).expect("create dirs");
        fs::write(path, content).expect("write file");
    }

    #[test]
    fn embedded_lookups_hit_and_miss() {
        let source = EmbeddedSource::from_static(FILES, TEMPLATES);

        let css = source.resource("/css/app.css").expect("css");
        assert_eq!(css.content_type, "text/css");
        assert_eq!(css.size, css.content.len());
        assert_eq!(&css.content[..], b"body{}");
        assert!(source.resource("/css/missing.css").is_none());
        assert!(source.resource("").is_none());

        assert_eq!(
            source.template("pages/index.html").as_deref(),
            Some(&b"<p>{{ name }}</p>"[..])
        );
        assert!(source.template("pages/other.html").is_none());
        assert_eq!(source.static_paths(), vec!["/css/app.css"]);
    }

    #[test]
    fn filesystem_reads_on_every_lookup() {
        let dir = tempfile::tempdir().expect("tempdir");
        let css = dir.path().join("static/css/app.css");
        write(&css, b"a{}");
        let source = FilesystemSource::new(dir.path());

        assert_eq!(&source.resource("/css/app.css").expect("first").content[..], b"a{}");
        write(&css, b"b{}");
        let second = source.resource("/css/app.css").expect("second");
        assert_eq!(&second.content[..], b"b{}");
        assert_eq!(second.content_type, "text/css");
        assert!(source.resource("/css/gone.css").is_none());
    }

    #[test]
    fn filesystem_rejects_paths_outside_the_roots() {
        let dir = tempfile::tempdir().expect("tempdir");
        write(&dir.path().join("secret.txt"), b"nope");
        write(&dir.path().join("web/static/ok.css"), b"ok");
        let source = FilesystemSource::new(dir.path().join("web"));

        assert!(source.resource("/../../secret.txt").is_none());
        assert!(source.template("../secret.txt").is_none());
        assert!(source.resource("/ok.css").is_some());
    }

    #[test]
    fn filesystem_templates_resolve_against_the_web_root() {
        let dir = tempfile::tempdir().expect("tempdir");
        write(&dir.path().join("pages/index.html"), b"hello");
        let source = FilesystemSource::new(dir.path());

        assert_eq!(source.template("pages/index.html").as_deref(), Some(&b"hello"[..]));
        assert!(source.template("pages/missing.html").is_none());
    }

    #[test]
    fn filesystem_routes_only_known_asset_kinds() {
        let dir = tempfile::tempdir().expect("tempdir");
        for path in [
            "static/css/app.css",
            "static/js/app.js",
            "static/img/logo.png",
            "static/fonts/icons.woff2",
            "static/notes.txt",
        ] {
            write(&dir.path().join(path), b"x");
        }
        let source = ResourceSource::Filesystem(FilesystemSource::new(dir.path()));

        assert_eq!(
            source.static_paths(),
            vec!["/css/app.css", "/fonts/icons.woff2", "/img/logo.png", "/js/app.js"]
        );
    }

    #[test]
    fn manifest_round_trips_into_the_embedded_backend() {
        let dir = tempfile::tempdir().expect("tempdir");
        let original = b"\x00\x01binary\xffdata".to_vec();
        write(&dir.path().join("static/blob.bin"), &original);
        let manifest = tvmagic_bundle::scan(dir.path(), &[], &["static".to_string()]);

        let source = EmbeddedSource::from_manifest(manifest);
        let resource = source.resource("/blob.bin").expect("blob");
        assert_eq!(&resource.content[..], &original[..]);
        assert_eq!(resource.size, original.len());
    }

    #[cfg(debug_assertions)]
    #[test]
    #[should_panic(expected = "embedded size mismatch for /css/app.css")]
    fn embedded_size_must_match_content() {
        static BAD: &[EmbeddedFile] = &[EmbeddedFile {
            path: "/css/app.css",
            content_type: "text/css",
            size: 99,
            content: b"body{}",
        }];
        let _ = EmbeddedSource::from_static(BAD, &[]);
    }

    #[cfg(not(feature = "embedded"))]
    #[test]
    fn detect_without_bundle_uses_filesystem() {
        let source = ResourceSource::detect("web");
        assert!(!source.is_embedded());
    }
}
