//! Web surface plugins contribute to the host.
//!
//! Plugins stay declarative: they hand back route bindings, menu entries,
//! and action buttons, and the host (or the development harness) owns the
//! server. Each binding carries an auth policy marker; enforcement is the
//! host's job, the harness only logs it.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Html;
use axum::routing::{post, MethodRouter};
use axum::{Json, Router};
use tracing::{info, warn};

use crate::plugin::PluginInfo;

/// Whether the host should require a logged-in user for a binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthPolicy {
    Public,
    RequiresLogin,
}

/// One route a plugin contributes: URL path plus a ready axum handler.
pub struct RouteBinding {
    pub path: String,
    pub auth: AuthPolicy,
    pub route: MethodRouter,
}

impl RouteBinding {
    pub fn new(path: impl Into<String>, auth: AuthPolicy, route: MethodRouter) -> Self {
        Self {
            path: path.into(),
            auth,
            route,
        }
    }
}

/// A main-menu entry pointing at a plugin page.
#[derive(Debug, Clone)]
pub struct MenuEntry {
    /// Label shown in the menu, e.g. "ePiSync".
    pub title: String,
    /// Link path, e.g. "/episync".
    pub url: String,
    /// Element id for styling the active entry, e.g. "episync-menu".
    pub element_id: String,
    /// Bootstrap icon name, e.g. "bi bi-image".
    pub icon: String,
}

impl MenuEntry {
    pub fn new(
        title: impl Into<String>,
        url: impl Into<String>,
        element_id: impl Into<String>,
        icon: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
            element_id: element_id.into(),
            icon: icon.into(),
        }
    }
}

/// Callback fired when an action button is pressed.
pub type ActionCallback = Arc<dyn Fn() -> anyhow::Result<()> + Send + Sync>;

/// An action button for the host's tools section.
#[derive(Clone)]
pub struct ActionEntry {
    /// Key the action is registered under, e.g. "sync-now".
    pub key: String,
    /// Button label.
    pub title: String,
    /// Bootstrap icon name.
    pub icon: String,
    /// Action name posted by the UI.
    pub action: String,
    pub run: ActionCallback,
}

impl ActionEntry {
    pub fn new(
        key: impl Into<String>,
        title: impl Into<String>,
        icon: impl Into<String>,
        action: impl Into<String>,
        run: ActionCallback,
    ) -> Self {
        Self {
            key: key.into(),
            title: title.into(),
            icon: icon.into(),
            action: action.into(),
            run,
        }
    }
}

/// Everything one or more plugins contribute to the web layer.
#[derive(Default)]
pub struct WebExtensions {
    pub routes: Vec<RouteBinding>,
    pub menus: Vec<MenuEntry>,
    pub actions: Vec<ActionEntry>,
}

impl WebExtensions {
    pub fn merge(&mut self, other: WebExtensions) {
        self.routes.extend(other.routes);
        self.menus.extend(other.menus);
        self.actions.extend(other.actions);
    }
}

#[derive(Clone)]
struct AppState {
    actions: Arc<BTreeMap<String, ActionEntry>>,
    menus: Arc<Vec<MenuEntry>>,
    plugins: Arc<Vec<PluginInfo>>,
}

/// Assemble the merged plugin contributions into one router.
///
/// Besides the plugin routes this mounts the harness stand-ins for host
/// surfaces: an index page listing menu entries, `GET /api/plugins`, and
/// `POST /api/actions/:key` firing action callbacks.
#[must_use]
pub fn build_router(extensions: WebExtensions, plugins: Vec<PluginInfo>) -> Router {
    let WebExtensions {
        routes,
        menus,
        actions,
    } = extensions;

    let mut plugin_router = Router::new();
    for binding in routes {
        if binding.auth == AuthPolicy::RequiresLogin {
            info!(path = %binding.path, "route requires login; harness serves it ungated");
        }
        plugin_router = plugin_router.route(&binding.path, binding.route);
    }

    let actions: BTreeMap<String, ActionEntry> = actions
        .into_iter()
        .map(|entry| (entry.key.clone(), entry))
        .collect();
    let state = AppState {
        actions: Arc::new(actions),
        menus: Arc::new(menus),
        plugins: Arc::new(plugins),
    };
    let host_router = Router::new()
        .route("/", axum::routing::get(index_page))
        .route("/api/plugins", axum::routing::get(list_plugins))
        .route("/api/actions/:key", post(fire_action))
        .with_state(state);

    plugin_router.merge(host_router)
}

async fn index_page(State(state): State<AppState>) -> Html<String> {
    let mut body = String::from("<h1>Plugin harness</h1><ul>");
    for menu in state.menus.iter() {
        body.push_str(&format!(
            "<li id=\"{}\"><a href=\"{}\">{}</a> <span class=\"icon\">{}</span></li>",
            escape_html(&menu.element_id),
            escape_html(&menu.url),
            escape_html(&menu.title),
            escape_html(&menu.icon),
        ));
    }
    body.push_str("</ul><h2>Actions</h2><ul>");
    for action in state.actions.values() {
        body.push_str(&format!(
            "<li><form method=\"post\" action=\"/api/actions/{key}\"><button type=\"submit\">{title}</button></form></li>",
            key = escape_html(&action.key),
            title = escape_html(&action.title),
        ));
    }
    body.push_str("</ul>");
    Html(layout(&body))
}

async fn list_plugins(State(state): State<AppState>) -> Json<serde_json::Value> {
    let plugins: Vec<_> = state
        .plugins
        .iter()
        .map(|p| {
            serde_json::json!({
                "name": p.name,
                "author": p.author,
                "description": p.description,
                "enabled": p.enabled,
            })
        })
        .collect();
    Json(serde_json::json!({ "plugins": plugins }))
}

async fn fire_action(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<serde_json::Value>, (StatusCode, String)> {
    let Some(entry) = state.actions.get(&key) else {
        return Err((StatusCode::NOT_FOUND, format!("no action '{key}'")));
    };
    let run = entry.run.clone();
    let action = entry.action.clone();
    let outcome = tokio::task::spawn_blocking(move || run())
        .await
        .map_err(|err| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("action task failed: {err}"),
            )
        })?;
    match outcome {
        Ok(()) => Ok(Json(serde_json::json!({ "action": action, "ok": true }))),
        Err(err) => {
            warn!(action = %action, error = %err, "action callback failed");
            Err((StatusCode::INTERNAL_SERVER_ERROR, err.to_string()))
        }
    }
}

/// Wrap a page body in the shared HTML shell.
#[must_use]
pub fn layout(body: &str) -> String {
    format!(
        "<!DOCTYPE html><html lang=\"en\"><head><meta charset=\"utf-8\">\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\
         <title>Photo Frame Plugins</title><style>{}</style></head>\
         <body><main>{}</main></body></html>",
        styles(),
        body
    )
}

fn styles() -> &'static str {
    "body { font-family: sans-serif; margin: 0; background: #f5f5f5; color: #222; }\n\
     main { max-width: 720px; margin: 0 auto; padding: 24px; background: #fff; min-height: 100vh; box-sizing: border-box; }\n\
     h1, h2 { margin-top: 0; }\n\
     ul { padding-left: 20px; }\n\
     form { display: inline-block; margin: 0; }\n\
     form button { padding: 6px 12px; border-radius: 4px; border: 1px solid #1976d2; background: #2196f3; color: #fff; cursor: pointer; }\n\
     .icon { color: #777; font-size: 0.85rem; }"
}

#[must_use]
pub fn escape_html(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '&' => escaped.push_str("&amp;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_html_metacharacters() {
        assert_eq!(escape_html("<a href=\"x\">&'"), "&lt;a href=&quot;x&quot;&gt;&amp;&#39;");
    }

    #[test]
    fn merge_concatenates_contributions() {
        let mut a = WebExtensions::default();
        a.menus.push(MenuEntry::new("A", "/a", "a-menu", "bi bi-a"));
        let mut b = WebExtensions::default();
        b.menus.push(MenuEntry::new("B", "/b", "b-menu", "bi bi-b"));
        a.merge(b);
        assert_eq!(a.menus.len(), 2);
    }
}
