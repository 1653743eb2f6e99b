use std::io;

use axum::response::Html;
use serde::Serialize;

use crate::errors::HttpError;
use crate::templates::{TemplateCache, TemplateError, TemplateFunctions};

pub const MAIN_LAYOUT: &str = "layout/main.html";

/// Per-request values every page can read as `request.*`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RequestContext {
    pub path: String,
    pub authenticated: bool,
}

impl RequestContext {
    pub fn new(path: impl Into<String>, authenticated: bool) -> Self {
        Self {
            path: path.into(),
            authenticated,
        }
    }
}

#[derive(Serialize)]
struct WithRequest<'a, S> {
    request: &'a RequestContext,
    #[serde(flatten)]
    data: S,
}

#[derive(Serialize)]
struct MainPageData<'a> {
    main_page: bool,
    heading: &'a str,
    content: String,
    path: &'a str,
    authenticated: bool,
}

/// `"active"` when `current` is inside the section rooted at `prefix`.
/// The root section only matches itself.
pub fn selected(current: String, prefix: String) -> String {
    let active = if prefix == "/" {
        current == "/"
    } else {
        current.starts_with(&prefix)
    };
    if active { "active".to_string() } else { String::new() }
}

pub fn layout_functions() -> TemplateFunctions {
    TemplateFunctions::new().with("selected", selected)
}

/// Renders `alias` with `data` plus a `request` object into `out`.
pub fn render_template<W: io::Write, S: Serialize>(
    templates: &TemplateCache,
    alias: &str,
    out: W,
    ctx: &RequestContext,
    data: S,
) -> Result<(), TemplateError> {
    let data = WithRequest { request: ctx, data };
    templates.render_to(alias, data, out, &layout_functions())
}

/// Renders the page and wraps it in [`MAIN_LAYOUT`].
pub fn main_layout<S: Serialize>(
    templates: &TemplateCache,
    ctx: &RequestContext,
    heading: &str,
    alias: &str,
    data: S,
) -> Result<Html<String>, HttpError> {
    let mut content = Vec::new();
    render_template(templates, alias, &mut content, ctx, data)?;
    let content =
        String::from_utf8(content).map_err(|_| TemplateError::Encoding(alias.to_string()))?;

    let page = MainPageData {
        main_page: ctx.path == "/",
        heading,
        content,
        path: &ctx.path,
        authenticated: ctx.authenticated,
    };
    let html = templates.render(MAIN_LAYOUT, page, &layout_functions())?;
    Ok(Html(html))
}
