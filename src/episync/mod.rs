//! The worked example plugin.
//!
//! ePiSync pulls photos from a remote host with rsync, publishes them as a
//! photo source, keeps a thumbnail per synced photo, watermarks its photos
//! after display conversion, and contributes an API endpoint, a status page,
//! a menu entry, and a sync-now action button. The service loop re-runs the
//! sync on a configurable interval.

pub mod sync;
pub mod thumbs;
pub mod watermark;
pub mod web;

use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::{self, PropertyKind, PropertySpec, SettingsSchema, ENABLE_PROPERTY};
use crate::error::{ConfigError, PluginError};
use crate::plugin::{FramePlugin, PluginContext, WebSite};
use crate::records::{LocalSource, PhotoRecord};
use crate::web::{ActionCallback, ActionEntry, RouteBinding};

/// Prefix of both the thumbnail subdirectory and each thumbnail file.
pub const THUMB_PREFIX: &str = "thumb_";

pub const LOCAL_PATH: &str = "local_path";
pub const REMOTE_PATH: &str = "remote_path";
pub const REMOTE_HOST: &str = "remote_host";
pub const REMOTE_USER: &str = "remote_user";
pub const SYNC_TIMEOUT: &str = "sync_timeout";
pub const SYNC_INTERVAL: &str = "sync_interval";
pub const THUMB_WIDTH: &str = "thumb_width";
pub const THUMB_HEIGHT: &str = "thumb_height";
pub const WATERMARK_FILE: &str = "watermark_file";

/// Thumbnail path for an original: `<dir>/thumb_/thumb_<basename>`.
#[must_use]
pub fn thumb_path_for(original: &Path) -> PathBuf {
    let dir = original.parent().unwrap_or_else(|| Path::new(""));
    let name = original
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    dir.join(THUMB_PREFIX).join(format!("{THUMB_PREFIX}{name}"))
}

pub struct EpiSync;

impl EpiSync {
    fn watermark_path(&self, ctx: &PluginContext) -> PathBuf {
        match ctx.settings.get_str(WATERMARK_FILE) {
            Ok(rel) => ctx.base_path.join(rel),
            Err(_) => ctx.base_path.join("static/watermark.png"),
        }
    }
}

impl FramePlugin for EpiSync {
    fn name(&self) -> &str {
        "ePiSync"
    }

    fn author(&self) -> &str {
        "photoframe-plugin tutorial"
    }

    fn description(&self) -> &str {
        "Sync photos with rsync from a remote host, generate thumbnails, \
         watermark synced photos, and expose a status page and API endpoint"
    }

    fn info(&self) -> &str {
        "Worked example exercising every extension point"
    }

    fn settings_schema(&self) -> Result<SettingsSchema, ConfigError> {
        SettingsSchema::new(vec![
            // absent reads as disabled so a bare harness config still validates
            PropertySpec::new(ENABLE_PROPERTY, PropertyKind::Boolean).default_value("0"),
            // validation materializes the sync directory
            PropertySpec::new(LOCAL_PATH, PropertyKind::Path)
                .depends_on(ENABLE_PROPERTY)
                .convert(config::create_directory),
            PropertySpec::new(REMOTE_PATH, PropertyKind::String).depends_on(ENABLE_PROPERTY),
            PropertySpec::new(REMOTE_HOST, PropertyKind::String).depends_on(ENABLE_PROPERTY),
            PropertySpec::new(REMOTE_USER, PropertyKind::String).depends_on(ENABLE_PROPERTY),
            PropertySpec::new(SYNC_TIMEOUT, PropertyKind::Integer)
                .bounds(2, 10)
                .depends_on(ENABLE_PROPERTY),
            PropertySpec::new(SYNC_INTERVAL, PropertyKind::Integer)
                .bounds(10, 86_400)
                .default_value("300")
                .depends_on(ENABLE_PROPERTY),
            PropertySpec::new(THUMB_WIDTH, PropertyKind::Integer)
                .bounds(100, 400)
                .depends_on(ENABLE_PROPERTY),
            PropertySpec::new(THUMB_HEIGHT, PropertyKind::Integer)
                .bounds(100, 300)
                .depends_on(ENABLE_PROPERTY),
            PropertySpec::new(WATERMARK_FILE, PropertyKind::String)
                .default_value("static/watermark.png")
                .depends_on(ENABLE_PROPERTY),
        ])
    }

    fn collect_photos(&self, ctx: &PluginContext) -> Result<Vec<PhotoRecord>, PluginError> {
        if !ctx.settings.enabled() {
            return Ok(Vec::new());
        }
        // A failed sync is logged, not fatal: already-synced photos still serve.
        match sync::sync_once(ctx) {
            Ok(report) => info!(command = %report.command, "remote sync finished"),
            Err(err) => warn!(error = %err, "remote sync failed; serving existing files"),
        }
        let local_path = ctx.settings.get_path(LOCAL_PATH)?;
        LocalSource::new(local_path, false).collect(&self.source_tag())
    }

    fn transform_photo_list(
        &self,
        ctx: &PluginContext,
        records: Vec<PhotoRecord>,
    ) -> Result<Vec<PhotoRecord>, PluginError> {
        if !ctx.settings.enabled() {
            return Ok(records);
        }
        let generated = thumbs::ensure_thumbnails(ctx, &records, &self.source_tag())?;
        if generated > 0 {
            info!(generated, "thumbnails created");
        }
        // The list itself is returned untouched.
        Ok(records)
    }

    fn postprocess_photo(
        &self,
        ctx: &PluginContext,
        photo: &Path,
        width: u32,
        height: u32,
        record: &PhotoRecord,
    ) -> Result<(), PluginError> {
        if !ctx.settings.enabled() || record.source != self.source_tag() {
            return Ok(());
        }
        watermark::apply(
            photo,
            &self.watermark_path(ctx),
            width,
            height,
            ctx.global.horizontal,
            ctx.global.rotation_degrees,
        )
    }

    fn extend_api(&self, ctx: &PluginContext) -> Vec<RouteBinding> {
        if !ctx.settings.enabled() {
            return Vec::new();
        }
        web::api_routes(ctx)
    }

    fn add_website(&self, ctx: &PluginContext) -> Option<WebSite> {
        if !ctx.settings.enabled() {
            return None;
        }
        Some(web::website(ctx))
    }

    fn add_actions(&self, ctx: &PluginContext) -> Vec<ActionEntry> {
        if !ctx.settings.enabled() {
            return Vec::new();
        }
        let sync_ctx = ctx.clone();
        let run: ActionCallback = std::sync::Arc::new(move || {
            sync::sync_once(&sync_ctx)?;
            Ok(())
        });
        vec![ActionEntry::new(
            "sync-now",
            "Sync Photos Now",
            "bi bi-arrow-repeat",
            "sync-now",
            run,
        )]
    }

    fn service_loop(
        &self,
        ctx: &PluginContext,
        cancel: &CancellationToken,
    ) -> Result<(), PluginError> {
        if !ctx.settings.enabled() {
            return Ok(());
        }
        let interval = ctx.settings.get_int(SYNC_INTERVAL).unwrap_or(300) as u64;
        info!(interval_secs = interval, "sync service started");
        while !cancel.is_cancelled() {
            match sync::sync_once(ctx) {
                Ok(_) => info!("periodic sync finished"),
                Err(err) => warn!(error = %err, "periodic sync failed"),
            }
            sleep_until_cancelled(cancel, Duration::from_secs(interval));
        }
        info!("sync service stopped");
        Ok(())
    }
}

fn sleep_until_cancelled(cancel: &CancellationToken, total: Duration) {
    let step = Duration::from_millis(250);
    let mut slept = Duration::ZERO;
    while slept < total && !cancel.is_cancelled() {
        std::thread::sleep(step.min(total - slept));
        slept += step;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thumb_path_nests_under_prefixed_dir() {
        let thumb = thumb_path_for(Path::new("/sync/photo 1.jpg"));
        assert_eq!(thumb, PathBuf::from("/sync/thumb_/thumb_photo 1.jpg"));
    }

    #[test]
    fn schema_declares_every_setting_gated_on_enable() {
        let schema = EpiSync.settings_schema().unwrap();
        let names: Vec<&str> = schema.properties().iter().map(|p| p.name()).collect();
        assert_eq!(
            names,
            vec![
                ENABLE_PROPERTY,
                LOCAL_PATH,
                REMOTE_PATH,
                REMOTE_HOST,
                REMOTE_USER,
                SYNC_TIMEOUT,
                SYNC_INTERVAL,
                THUMB_WIDTH,
                THUMB_HEIGHT,
                WATERMARK_FILE,
            ]
        );
        for prop in schema.properties().iter().skip(1) {
            assert!(
                prop.dependency().is_some(),
                "{} must be gated on the enable flag",
                prop.name()
            );
        }
    }

    #[test]
    fn source_tag_quotes_the_plugin_name() {
        assert_eq!(EpiSync.source_tag(), "'ePiSync' plugin source");
    }
}
