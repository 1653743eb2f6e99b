use std::fs;
use std::path::{Component, Path, PathBuf};

use tracing::{info, warn};
use walkdir::WalkDir;

use crate::types::{BundleManifest, ResourceRecord, ScanIssue, TemplateSource};

/// Splits a comma-delimited directory list. Blank segments are dropped, so an
/// empty flag value yields no roots at all.
pub fn split_dirs(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|dir| !dir.is_empty())
        .map(str::to_string)
        .collect()
}

/// Content type from the file extension; unknown extensions give an empty string.
pub fn content_type_for(path: &Path) -> String {
    mime_guess::from_path(path)
        .first_raw()
        .map(str::to_string)
        .unwrap_or_default()
}

/// Scans both kinds of roots into a fresh manifest.
pub fn scan(base: &Path, template_roots: &[String], file_roots: &[String]) -> BundleManifest {
    let mut manifest = BundleManifest::default();
    if !template_roots.is_empty() {
        info!(roots = ?template_roots, "mapping templates");
        scan_templates(base, template_roots, &mut manifest);
    }
    if !file_roots.is_empty() {
        info!(roots = ?file_roots, "mapping static files");
        scan_files(base, file_roots, &mut manifest);
    }
    manifest
}

/// File mode: keys are `/`-prefixed paths relative to each root.
pub fn scan_files(base: &Path, roots: &[String], manifest: &mut BundleManifest) {
    for root in roots {
        info!(root = %root, "loading files");
        let root_path = base.join(root);
        for (rel, path) in walk_root(&root_path, &mut manifest.issues) {
            let Some(content) = read_entry(&path, &mut manifest.issues) else {
                continue;
            };
            let key = format!("/{rel}");
            let record = ResourceRecord::new(key, content_type_for(&path), content);
            info!(path = %record.path, size = record.size, "mapped file");
            manifest.insert_file(record);
        }
    }
}

/// Template mode: keys keep the root in front (`pages/index.html`), which is
/// the alias callers render by.
pub fn scan_templates(base: &Path, roots: &[String], manifest: &mut BundleManifest) {
    for root in roots {
        info!(root = %root, "loading templates");
        let root_path = base.join(root);
        let prefix = root.trim_end_matches('/');
        for (rel, path) in walk_root(&root_path, &mut manifest.issues) {
            let Some(content) = read_entry(&path, &mut manifest.issues) else {
                continue;
            };
            let alias = format!("{prefix}/{rel}");
            info!(alias = %alias, "mapped template");
            manifest.insert_template(TemplateSource { alias, content });
        }
    }
}

/// Lists regular files below `root` as `/`-prefixed relative paths without
/// reading them.
pub fn list_files(root: &Path) -> Vec<String> {
    let mut issues = Vec::new();
    walk_root(root, &mut issues)
        .into_iter()
        .map(|(rel, _)| format!("/{rel}"))
        .collect()
}

fn walk_root(root: &Path, issues: &mut Vec<ScanIssue>) -> Vec<(String, PathBuf)> {
    let mut found = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                let path = err
                    .path()
                    .unwrap_or(root)
                    .display()
                    .to_string();
                warn!(path = %path, error = %err, "skipping unreadable entry");
                issues.push(ScanIssue {
                    path,
                    message: err.to_string(),
                });
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let Ok(rel) = entry.path().strip_prefix(root) else {
            continue;
        };
        let key = relative_key(rel);
        found.push((key, entry.into_path()));
    }
    found
}

fn read_entry(path: &Path, issues: &mut Vec<ScanIssue>) -> Option<Vec<u8>> {
    match fs::read(path) {
        Ok(content) => Some(content),
        Err(err) => {
            warn!(path = %path.display(), error = %err, "skipping unreadable file");
            issues.push(ScanIssue {
                path: path.display().to_string(),
                message: err.to_string(),
            });
            None
        }
    }
}

fn relative_key(rel: &Path) -> String {
    rel.components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}
