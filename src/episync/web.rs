//! Web surface of the worked example: one API endpoint, one page.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::header;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;

use crate::magick;
use crate::plugin::{PluginContext, WebSite};
use crate::records::LocalSource;
use crate::web::{escape_html, layout, AuthPolicy, MenuEntry, RouteBinding};

use super::{thumb_path_for, LOCAL_PATH, THUMB_HEIGHT, THUMB_WIDTH};

/// Shown when the requested index has no photo behind it.
const NO_PHOTO: &str = "No Photo!";

#[derive(Clone)]
struct SyncPages {
    local_path: PathBuf,
    thumb_width: i64,
    thumb_height: i64,
}

fn pages_state(ctx: &PluginContext) -> Arc<SyncPages> {
    Arc::new(SyncPages {
        local_path: ctx
            .settings
            .get_path(LOCAL_PATH)
            .cloned()
            .unwrap_or_default(),
        thumb_width: ctx.settings.get_int(THUMB_WIDTH).unwrap_or(0),
        thumb_height: ctx.settings.get_int(THUMB_HEIGHT).unwrap_or(0),
    })
}

/// `GET /api/get_sync_image?file=<n>[&thumb]`
pub fn api_routes(ctx: &PluginContext) -> Vec<RouteBinding> {
    let state = pages_state(ctx);
    vec![RouteBinding::new(
        "/api/get_sync_image",
        AuthPolicy::RequiresLogin,
        get(move |query: Query<HashMap<String, String>>| get_sync_image(State(state), query)),
    )]
}

/// `GET /episync` plus the main-menu entry.
pub fn website(ctx: &PluginContext) -> WebSite {
    let state = pages_state(ctx);
    WebSite {
        routes: vec![RouteBinding::new(
            "/episync",
            AuthPolicy::RequiresLogin,
            get(move || show_page(State(state))),
        )],
        menus: vec![MenuEntry::new(
            "ePiSync",
            "/episync",
            "episync-menu",
            "bi bi-image",
        )],
    }
}

/// Pick the file (or its thumbnail) for a requested index.
///
/// Indexes at or past the end select nothing; the caller falls back to the
/// plain-text message.
#[must_use]
pub fn select_photo_file(files: &[PathBuf], index: usize, thumb: bool) -> Option<PathBuf> {
    let original = files.get(index)?;
    if thumb {
        Some(thumb_path_for(original))
    } else {
        Some(original.clone())
    }
}

/// Parse the `file` query parameter: digits only, anything else reads 0.
#[must_use]
pub fn file_index(params: &HashMap<String, String>) -> usize {
    params
        .get("file")
        .filter(|raw| !raw.is_empty() && raw.chars().all(|c| c.is_ascii_digit()))
        .and_then(|raw| raw.parse().ok())
        .unwrap_or(0)
}

async fn get_sync_image(
    State(state): State<Arc<SyncPages>>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let index = file_index(&params);
    let thumb = params.contains_key("thumb");
    let files = LocalSource::new(&state.local_path, false)
        .files()
        .unwrap_or_default();

    let Some(path) = select_photo_file(&files, index, thumb) else {
        return NO_PHOTO.into_response();
    };
    match tokio::fs::read(&path).await {
        Ok(bytes) => {
            let mime = magick::mime_for_path(&path).unwrap_or("application/octet-stream");
            ([(header::CONTENT_TYPE, mime)], bytes).into_response()
        }
        // Missing thumbnail or vanished file: same fallback as a bad index.
        Err(_) => NO_PHOTO.into_response(),
    }
}

async fn show_page(State(state): State<Arc<SyncPages>>) -> Html<String> {
    let count = LocalSource::new(&state.local_path, false)
        .files()
        .map(|files| files.len())
        .unwrap_or(0);
    let body = format!(
        "<h1>ePiSync</h1>\
         <p>{count} synced photo(s) in <code>{path}</code>.</p>\
         <p>Thumbnails are {width}&times;{height} px.</p>\
         <p><a href=\"/api/get_sync_image?file=0\">First photo</a> \
         &middot; <a href=\"/api/get_sync_image?file=0&amp;thumb\">first thumbnail</a></p>",
        count = count,
        path = escape_html(&state.local_path.display().to_string()),
        width = state.thumb_width,
        height = state.thumb_height,
    );
    Html(layout(&body))
}
