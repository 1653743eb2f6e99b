//! Build-time half of the asset pipeline: walks template and static
//! directories into a [`BundleManifest`] and renders it through a
//! meta-template into a source file that can be compiled into a binary.

mod generate;
mod scan;
mod types;

pub use generate::{META_BLOCK, META_COMMENT, META_VARIABLE, generate, render_bundle};
pub use scan::{content_type_for, list_files, scan, scan_files, scan_templates, split_dirs};
pub use types::{BundleError, BundleManifest, ResourceRecord, Result, ScanIssue, TemplateSource};
