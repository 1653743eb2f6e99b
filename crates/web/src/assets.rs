use axum::{
    Router,
    body::Body,
    extract::State,
    http::{HeaderMap, HeaderValue, StatusCode, Uri, header},
    response::{IntoResponse, Response},
    routing::get,
};
use chrono::{DateTime, NaiveDateTime, SubsecRound, Utc};
use percent_encoding::{AsciiSet, CONTROLS, percent_decode_str, utf8_percent_encode};
use tracing::{debug, info, warn};

use crate::errors::HttpError;
use crate::source::{ResourceLookup, StaticResource};
use crate::state::WebState;

const HTTP_DATE: &str = "%a, %d %b %Y %H:%M:%S GMT";
const RFC850_DATE: &str = "%A, %d-%b-%y %H:%M:%S GMT";
const ASCTIME_DATE: &str = "%a %b %e %H:%M:%S %Y";
const KEEP_ALIVE: &str = "timeout=5, max=100";

/// Bytes that cannot appear raw in a request path segment.
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Last-modified stamp shared by every resource: the second the server
/// started. A client holding a copy from this run or later gets a 304.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LastModified(DateTime<Utc>);

impl LastModified {
    pub fn now() -> Self {
        Self::at(Utc::now())
    }

    pub fn at(time: DateTime<Utc>) -> Self {
        Self(time.round_subsecs(0))
    }

    pub fn time(&self) -> DateTime<Utc> {
        self.0
    }

    pub fn http_date(&self) -> String {
        format_http_date(self.0)
    }

    /// True when `since` is at or after the stamp.
    pub fn is_fresh(&self, since: DateTime<Utc>) -> bool {
        since.trunc_subsecs(0) >= self.0
    }
}

pub fn format_http_date(time: DateTime<Utc>) -> String {
    time.format(HTTP_DATE).to_string()
}

/// Accepts IMF-fixdate plus the obsolete RFC 850 and asctime forms.
pub fn parse_http_date(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(time) = DateTime::parse_from_rfc2822(value) {
        return Some(time.with_timezone(&Utc));
    }
    [RFC850_DATE, ASCTIME_DATE]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .map(|naive| naive.and_utc())
}

/// One GET route per known static path, all served by [`serve_asset`].
/// Routes match the percent-encoded form a client puts on the wire.
pub fn routes(state: &WebState) -> Router<WebState> {
    let mut router = Router::new();
    for path in state.source.static_paths() {
        if !is_routable(&path) {
            warn!(path = %path, "skipping static path that cannot be routed");
            continue;
        }
        let route = encode_path(&path);
        info!(path = %path, route = %route, "mapped static resource");
        router = router.route(&route, get(serve_asset));
    }
    router
}

fn encode_path(path: &str) -> String {
    path.split('/')
        .map(|segment| utf8_percent_encode(segment, PATH_SEGMENT).to_string())
        .collect::<Vec<_>>()
        .join("/")
}

pub async fn serve_asset(
    State(state): State<WebState>,
    uri: Uri,
    headers: HeaderMap,
) -> Result<Response, HttpError> {
    let resource = percent_decode_str(uri.path())
        .decode_utf8()
        .ok()
        .and_then(|path| state.source.resource(&path));
    match resource {
        Some(resource) => {
            debug!(path = %resource.path, "serving static resource");
            Ok(conditional_response(&resource, &headers, state.last_modified))
        }
        None => {
            debug!(path = uri.path(), "static resource not found");
            Err(HttpError::new(
                StatusCode::NOT_FOUND,
                "not found",
                Some("not_found".to_string()),
            ))
        }
    }
}

/// 304 when the client's `If-Modified-Since` is not older than the stamp,
/// otherwise the full resource.
pub fn conditional_response(
    resource: &StaticResource,
    headers: &HeaderMap,
    last_modified: LastModified,
) -> Response {
    let since = headers
        .get(header::IF_MODIFIED_SINCE)
        .and_then(|value| value.to_str().ok());
    if let Some(since) = since {
        match parse_http_date(since) {
            Some(time) if last_modified.is_fresh(time) => {
                return StatusCode::NOT_MODIFIED.into_response();
            }
            Some(time) => debug!(since = %time, actual = %last_modified.time(), "stale copy"),
            None => debug!(since, "unparseable If-Modified-Since"),
        }
    }

    let mut response = Response::new(Body::from(resource.content.clone()));
    let response_headers = response.headers_mut();
    if let Ok(value) = HeaderValue::from_str(&last_modified.http_date()) {
        response_headers.insert(header::LAST_MODIFIED, value);
    }
    response_headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
    response_headers.insert("keep-alive", HeaderValue::from_static(KEEP_ALIVE));
    if !resource.content_type.is_empty() {
        if let Ok(value) = HeaderValue::from_str(&resource.content_type) {
            response_headers.insert(header::CONTENT_TYPE, value);
        }
    }
    response_headers.insert(header::CONTENT_LENGTH, HeaderValue::from(resource.content.len()));
    response
}

fn is_routable(path: &str) -> bool {
    path.starts_with('/') && !path.contains([':', '*'])
}
