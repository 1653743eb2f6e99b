use std::sync::Arc;

use axum::{
    Extension, Router,
    extract::State,
    http::Uri,
    response::Html,
    routing::get,
};
use serde::Serialize;
use tvmagic_web::{HttpError, RequestContext, WebState, main_layout};

use crate::config::UiConfig;

#[derive(Serialize)]
struct IndexPage<'a> {
    intro_sub_title: &'a str,
}

pub fn routes(ui: UiConfig) -> Router<WebState> {
    Router::new()
        .route("/", get(index))
        .route("/login.do", get(login))
        .layer(Extension(Arc::new(ui)))
}

async fn index(
    State(state): State<WebState>,
    Extension(ui): Extension<Arc<UiConfig>>,
    uri: Uri,
) -> Result<Html<String>, HttpError> {
    let page = IndexPage {
        intro_sub_title: &ui.intro_sub_title,
    };
    main_layout(
        &state.templates,
        &RequestContext::new(uri.path(), false),
        "",
        "pages/index.html",
        page,
    )
}

async fn login(State(state): State<WebState>, uri: Uri) -> Result<Html<String>, HttpError> {
    main_layout(
        &state.templates,
        &RequestContext::new(uri.path(), false),
        "User Login",
        "pages/login.html",
        serde_json::json!({}),
    )
}
