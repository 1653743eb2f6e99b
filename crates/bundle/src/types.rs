use std::collections::BTreeMap;
use std::io;
use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

/// One static file discovered under a `--files` root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceRecord {
    pub path: String,
    pub content_type: String,
    pub size: usize,
    #[serde(with = "serde_bytes")]
    pub content: Vec<u8>,
}

impl ResourceRecord {
    pub fn new(path: String, content_type: String, content: Vec<u8>) -> Self {
        Self {
            path,
            content_type,
            size: content.len(),
            content,
        }
    }
}

/// Raw source of one page template, keyed by the alias used to render it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TemplateSource {
    pub alias: String,
    #[serde(with = "serde_bytes")]
    pub content: Vec<u8>,
}

/// Non-fatal problems hit while scanning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanIssue {
    pub path: String,
    pub message: String,
}

/// Everything one generator run discovered. Keys are unique; a later insert
/// under an existing key replaces the earlier entry and records an issue.
#[derive(Debug, Clone, Default)]
pub struct BundleManifest {
    pub files: BTreeMap<String, ResourceRecord>,
    pub templates: BTreeMap<String, TemplateSource>,
    pub issues: Vec<ScanIssue>,
}

impl BundleManifest {
    pub fn insert_file(&mut self, record: ResourceRecord) {
        let key = record.path.clone();
        if self.files.insert(key.clone(), record).is_some() {
            tracing::warn!(path = %key, "duplicate resource key, later file replaces earlier one");
            self.issues.push(ScanIssue {
                path: key,
                message: "duplicate resource key replaced".to_string(),
            });
        }
    }

    pub fn insert_template(&mut self, source: TemplateSource) {
        let key = source.alias.clone();
        if self.templates.insert(key.clone(), source).is_some() {
            tracing::warn!(alias = %key, "duplicate template alias, later file replaces earlier one");
            self.issues.push(ScanIssue {
                path: key,
                message: "duplicate template alias replaced".to_string(),
            });
        }
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty() && self.templates.is_empty()
    }
}

/// Errors that abort a generator run.
#[derive(Debug, Error)]
pub enum BundleError {
    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("meta-template error: {0}")]
    Template(#[from] minijinja::Error),
}

pub type Result<T> = std::result::Result<T, BundleError>;
