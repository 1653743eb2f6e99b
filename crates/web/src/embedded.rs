/// Static file compiled into the binary by the bundle generator.
pub struct EmbeddedFile {
    pub path: &'static str,
    pub content_type: &'static str,
    pub size: usize,
    pub content: &'static [u8],
}

/// Page template source compiled into the binary.
pub struct EmbeddedTemplate {
    pub alias: &'static str,
    pub content: &'static [u8],
}

#[cfg(all(bundle_generated, any(feature = "embedded", test)))]
mod bundle {
    use super::{EmbeddedFile, EmbeddedTemplate};

    include!(concat!(env!("OUT_DIR"), "/bundle.rs"));
}

/// The generated bundle, when this build linked one in.
#[cfg(feature = "embedded")]
pub fn linked_bundle() -> Option<(&'static [EmbeddedFile], &'static [EmbeddedTemplate])> {
    Some((bundle::EMBEDDED_FILES, bundle::EMBEDDED_TEMPLATES))
}

#[cfg(not(feature = "embedded"))]
pub fn linked_bundle() -> Option<(&'static [EmbeddedFile], &'static [EmbeddedTemplate])> {
    None
}

#[cfg(all(test, bundle_generated))]
mod tests {
    use std::fs;
    use std::path::PathBuf;

    use super::bundle::{EMBEDDED_FILES, EMBEDDED_TEMPLATES};

    fn web_dir() -> PathBuf {
        PathBuf::from(env!("TVMAGIC_BUNDLE_WEB_DIR"))
    }

    #[test]
    fn generated_bundle_matches_web_sources() {
        assert!(!EMBEDDED_FILES.is_empty());
        for file in EMBEDDED_FILES {
            let original = fs::read(web_dir().join("static").join(file.path.trim_start_matches('/')))
                .expect("original file");
            assert_eq!(file.content, &original[..], "{}", file.path);
            assert_eq!(file.size, original.len(), "{}", file.path);
        }
        let css = EMBEDDED_FILES
            .iter()
            .find(|file| file.path == "/css/app.css")
            .expect("stylesheet");
        assert_eq!(css.content_type, "text/css");

        assert!(EMBEDDED_TEMPLATES.iter().any(|tpl| tpl.alias == "layout/main.html"));
        for tpl in EMBEDDED_TEMPLATES {
            let original = fs::read(web_dir().join(tpl.alias)).expect("original template");
            assert_eq!(tpl.content, &original[..], "{}", tpl.alias);
        }
    }
}
