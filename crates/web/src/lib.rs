//! Runtime half of the asset pipeline: resource lookups in embedded or
//! filesystem mode, a compile-once template cache, and conditional static
//! file responses.

mod assets;
mod embedded;
mod errors;
mod layout;
mod middleware;
mod source;
mod state;
mod templates;

use axum::{
    Router,
    http::StatusCode,
    middleware as axum_middleware,
};
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::compression::CompressionLayer;

pub use assets::{LastModified, conditional_response, format_http_date, parse_http_date};
pub use embedded::{EmbeddedFile, EmbeddedTemplate, linked_bundle};
pub use errors::HttpError;
pub use layout::{MAIN_LAYOUT, RequestContext, layout_functions, main_layout, render_template, selected};
pub use source::{
    EmbeddedSource, FilesystemSource, ResourceLookup, ResourceSource, StaticResource,
    is_static_asset,
};
pub use state::WebState;
pub use templates::{CompiledTemplate, TemplateCache, TemplateError, TemplateFunctions};

/// Static routes for every known resource merged with the application's
/// `pages`, wrapped in request logging and panic recovery. Only pages are
/// gzip-compressed.
pub fn router(state: WebState, pages: Router<WebState>) -> Router<()> {
    assets::routes(&state)
        .merge(pages.layer(CompressionLayer::new()))
        .fallback(not_found)
        .layer(CatchPanicLayer::new())
        .layer(axum_middleware::from_fn(middleware::log_requests))
        .with_state(state)
}

async fn not_found() -> HttpError {
    HttpError::new(StatusCode::NOT_FOUND, "not found", Some("not_found".to_string()))
}
