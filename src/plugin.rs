//! The plugin extension contract.
//!
//! The host drives a plugin through a fixed set of callbacks: declare a
//! settings schema, collect photo records, materialize a picked record to a
//! local file, transform the combined photo list, mutate images before and
//! after display conversion, contribute web routes/menus/actions, and
//! optionally run a long-lived service loop. Every hook except the schema
//! declaration has a default, so a plugin implements only what it needs.
//!
//! Hooks are called synchronously, one at a time; no hook is re-entrant and
//! no two hooks run concurrently within one plugin instance. The service
//! loop is the exception: the host runs it on a dedicated worker and only
//! asks it to stop via the cancellation token.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::config::{Settings, SettingsSchema};
use crate::error::{ConfigError, PluginError};
use crate::magick;
use crate::process::CommandRunner;
use crate::records::PhotoRecord;
use crate::web::{ActionEntry, MenuEntry, RouteBinding, WebExtensions};

/// Read-only view of the host configuration a plugin may consult.
#[derive(Debug, Clone)]
pub struct GlobalView {
    /// Path to the ImageMagick-style convert binary.
    pub convert_bin: PathBuf,
    /// Frame rotation in degrees when mounted vertically (90 or 270).
    pub rotation_degrees: u16,
    /// Whether the frame is mounted horizontally.
    pub horizontal: bool,
    /// Directory the host materializes picked photos into.
    pub photo_target_dir: PathBuf,
}

/// Everything the host hands a plugin on every hook call.
#[derive(Clone)]
pub struct PluginContext {
    /// The plugin's own base directory (assets live here).
    pub base_path: PathBuf,
    /// The plugin's validated settings.
    pub settings: Settings,
    /// Host configuration view.
    pub global: GlobalView,
    /// Runner for external tool invocations; injectable in tests.
    pub runner: CommandRunner,
}

impl std::fmt::Debug for PluginContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginContext")
            .field("base_path", &self.base_path)
            .field("settings", &self.settings)
            .field("global", &self.global)
            .finish()
    }
}

/// Routes and menu entries contributed by [`FramePlugin::add_website`].
#[derive(Default)]
pub struct WebSite {
    pub routes: Vec<RouteBinding>,
    pub menus: Vec<MenuEntry>,
}

/// Descriptor for listing registered plugins.
#[derive(Debug, Clone)]
pub struct PluginInfo {
    pub name: String,
    pub author: String,
    pub description: String,
    pub site: String,
    pub info: String,
    pub enabled: bool,
}

impl PluginInfo {
    #[must_use]
    pub fn describe(plugin: &dyn FramePlugin, settings: &Settings) -> Self {
        Self {
            name: plugin.name().to_string(),
            author: plugin.author().to_string(),
            description: plugin.description().to_string(),
            site: plugin.site().to_string(),
            info: plugin.info().to_string(),
            enabled: settings.enabled(),
        }
    }
}

/// The extension points a photo-frame plugin may implement.
pub trait FramePlugin: Send + Sync {
    fn name(&self) -> &str;

    fn author(&self) -> &str {
        ""
    }

    fn description(&self) -> &str {
        ""
    }

    fn site(&self) -> &str {
        ""
    }

    fn info(&self) -> &str {
        ""
    }

    /// The settings this plugin understands. Must declare `is_enabled`.
    fn settings_schema(&self) -> Result<SettingsSchema, ConfigError>;

    /// Backward-compatibility escape hatch: rewrite raw settings from an
    /// older plugin version before validation. No further contract.
    fn legacy_convert(&self, _raw: &mut BTreeMap<String, String>) {}

    /// Tag stamped on records this plugin collects.
    fn source_tag(&self) -> String {
        format!("'{}' plugin source", self.name())
    }

    /// Photo source hook: collect fresh records for the host to merge with
    /// other sources.
    fn collect_photos(&self, _ctx: &PluginContext) -> Result<Vec<PhotoRecord>, PluginError> {
        Ok(Vec::new())
    }

    /// Materialize the picked record as a local file in `target_dir` and
    /// return its final path (best with an extension).
    ///
    /// The default probes the image format of the file named by the record
    /// id, appends the matching extension to `stem`, and copies.
    fn fetch_photo(
        &self,
        ctx: &PluginContext,
        record: &PhotoRecord,
        target_dir: &Path,
        stem: &str,
    ) -> Result<PathBuf, PluginError> {
        default_fetch(ctx, record, target_dir, stem)
    }

    /// Rework the host's combined photo list (sort, filter, annotate).
    /// Implementations must keep id, creation time, and source intact.
    fn transform_photo_list(
        &self,
        _ctx: &PluginContext,
        records: Vec<PhotoRecord>,
    ) -> Result<Vec<PhotoRecord>, PluginError> {
        Ok(records)
    }

    /// Mutate the original-quality image in place before host conversion.
    fn preprocess_photo(
        &self,
        _ctx: &PluginContext,
        _photo: &Path,
        _record: &PhotoRecord,
    ) -> Result<(), PluginError> {
        Ok(())
    }

    /// Mutate the display-ready image in place. `width`/`height` are the
    /// converted photo's pixel dimensions.
    fn postprocess_photo(
        &self,
        _ctx: &PluginContext,
        _photo: &Path,
        _width: u32,
        _height: u32,
        _record: &PhotoRecord,
    ) -> Result<(), PluginError> {
        Ok(())
    }

    /// API routes to add under the host web layer.
    fn extend_api(&self, _ctx: &PluginContext) -> Vec<RouteBinding> {
        Vec::new()
    }

    /// A website (page routes plus optional menu entries) to add.
    fn add_website(&self, _ctx: &PluginContext) -> Option<WebSite> {
        None
    }

    /// Action buttons for the host's tools section.
    fn add_actions(&self, _ctx: &PluginContext) -> Vec<ActionEntry> {
        Vec::new()
    }

    /// Optional long-running cooperative loop. Poll `cancel` between units
    /// of work; the host gives no other stop signal before shutdown.
    fn service_loop(
        &self,
        _ctx: &PluginContext,
        _cancel: &CancellationToken,
    ) -> Result<(), PluginError> {
        Ok(())
    }
}

/// Run the legacy conversion then validate `raw` against the plugin schema.
pub fn validate_settings(
    plugin: &dyn FramePlugin,
    raw: &BTreeMap<String, String>,
) -> Result<Settings, ConfigError> {
    let mut raw = raw.clone();
    plugin.legacy_convert(&mut raw);
    plugin.settings_schema()?.validate(&raw)
}

/// Gather all web contributions of one plugin.
#[must_use]
pub fn web_extensions(plugin: &dyn FramePlugin, ctx: &PluginContext) -> WebExtensions {
    let mut extensions = WebExtensions {
        routes: plugin.extend_api(ctx),
        ..WebExtensions::default()
    };
    if let Some(site) = plugin.add_website(ctx) {
        extensions.routes.extend(site.routes);
        extensions.menus.extend(site.menus);
    }
    extensions.actions = plugin.add_actions(ctx);
    extensions
}

fn default_fetch(
    ctx: &PluginContext,
    record: &PhotoRecord,
    target_dir: &Path,
    stem: &str,
) -> Result<PathBuf, PluginError> {
    let source = Path::new(&record.id);
    if !source.is_file() {
        return Err(PluginError::MissingPhoto(source.to_path_buf()));
    }
    let filename = match magick::probe_format(&ctx.runner, &ctx.global.convert_bin, source) {
        Ok(format) => match magick::extension_for_format(&format) {
            Some(ext) => format!("{stem}.{ext}"),
            None => {
                warn!(format = %format, "unknown image format; keeping bare stem");
                stem.to_string()
            }
        },
        Err(err) => {
            warn!(error = %err, photo = %record.id, "format probe failed; keeping bare stem");
            stem.to_string()
        }
    };
    let dest = target_dir.join(filename);
    fs::copy(source, &dest)?;
    Ok(dest)
}
