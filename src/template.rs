//! Plugin starting point.
//!
//! [`TemplatePlugin`] compiles as a no-op: it declares the mandatory enable
//! flag and leaves every other hook at its default. Copy this file, rename
//! the type, and fill in the hooks your plugin needs; each override below
//! shows an illustrative body in its documentation.

use std::collections::BTreeMap;

use crate::config::{PropertyKind, PropertySpec, SettingsSchema, ENABLE_PROPERTY};
use crate::error::ConfigError;
use crate::plugin::FramePlugin;

/// A plugin that does nothing until you override its hooks.
pub struct TemplatePlugin;

impl FramePlugin for TemplatePlugin {
    fn name(&self) -> &str {
        "Plugin Name"
    }

    fn author(&self) -> &str {
        "Author Name"
    }

    fn description(&self) -> &str {
        "One sentence about what this plugin does"
    }

    /// Declare the settings this plugin understands. The boolean
    /// `is_enabled` property is required; everything else is up to you.
    ///
    /// ```ignore
    /// SettingsSchema::new(vec![
    ///     PropertySpec::new(ENABLE_PROPERTY, PropertyKind::Boolean),
    ///     // an integer with inclusive bounds
    ///     PropertySpec::new("some_integer_value", PropertyKind::Integer).bounds(1, 1080),
    ///     // a string that may stay empty, active only while enabled
    ///     PropertySpec::new("optional_label", PropertyKind::String)
    ///         .allow_empty()
    ///         .depends_on(ENABLE_PROPERTY),
    ///     // a value restricted to a fixed set
    ///     PropertySpec::new("position", PropertyKind::Integer).possible(["1", "2", "3", "4"]),
    ///     // a comma-delimited list with a fixed length
    ///     PropertySpec::new("weekday_flags", PropertyKind::IntegerList).length(7),
    ///     // gate on another property's value rather than a boolean
    ///     PropertySpec::new("endpoint", PropertyKind::String)
    ///         .depends_on_value("mode", "remote"),
    ///     // a path materialized during validation
    ///     PropertySpec::new("cache_dir", PropertyKind::Path).convert(config::create_directory),
    ///     // a custom predicate
    ///     PropertySpec::new("listen_ip", PropertyKind::String).check(|raw| {
    ///         raw.parse::<std::net::IpAddr>()
    ///             .map(|_| ())
    ///             .map_err(|_| format!("'{raw}' is not an IP address"))
    ///     }),
    /// ])
    /// ```
    fn settings_schema(&self) -> Result<SettingsSchema, ConfigError> {
        SettingsSchema::new(vec![PropertySpec::new(
            ENABLE_PROPERTY,
            PropertyKind::Boolean,
        )])
    }

    /// Rename or rewrite raw settings saved by an older plugin version,
    /// before validation. Keep configuration backward compatible across
    /// plugin updates.
    ///
    /// ```ignore
    /// fn legacy_convert(&self, raw: &mut BTreeMap<String, String>) {
    ///     // "thumbnail_size" used to hold what "thumb_width" holds now
    ///     if let Some(old) = raw.remove("thumbnail_size") {
    ///         raw.entry("thumb_width".to_string()).or_insert(old);
    ///     }
    /// }
    /// ```
    fn legacy_convert(&self, _raw: &mut BTreeMap<String, String>) {}
}

// The hooks below keep their trait defaults. Override them as needed:
//
// collect_photos — add a photo source (sync a remote location, query a
// hosting site, ...). Return one record per photo; id, creation time and
// source make host-side sorting and filtering work out of the box:
//
//     fn collect_photos(&self, ctx: &PluginContext) -> Result<Vec<PhotoRecord>, PluginError> {
//         let source = LocalSource::new(ctx.settings.get_path("photos_dir")?, false);
//         source.collect(&self.source_tag())
//     }
//
// fetch_photo — materialize the picked record when a plain copy is not
// enough, e.g. a source that carries a download URL in an extra column:
//
//     fn fetch_photo(&self, ctx, record, target_dir, stem) -> Result<PathBuf, PluginError> {
//         let url = record.extra.get("url").ok_or_else(|| ...)?;
//         let dest = target_dir.join(format!("{stem}.jpg"));
//         download(url, &dest)?;
//         Ok(dest)
//     }
//
// transform_photo_list — reshape the host's combined list, e.g. newest
// photos first:
//
//     fn transform_photo_list(&self, _ctx, mut records) -> Result<Vec<PhotoRecord>, PluginError> {
//         records::sort_by_creation(&mut records, false);
//         Ok(records)
//     }
//
// preprocess_photo / postprocess_photo — mutate the image file in place
// before conversion (oil paint, frames, stamps) or after (text, overlays):
//
//     fn postprocess_photo(&self, ctx, photo, width, height, _record) -> Result<(), PluginError> {
//         let img = image::open(photo)?;
//         // draw on it, then save over the original
//         img.save(photo)?;
//         Ok(())
//     }
//
// extend_api / add_website / add_actions — contribute web surface. Routes
// are plain axum handlers; menu entries and action buttons carry the names
// and Bootstrap icons the host UI shows:
//
//     fn extend_api(&self, ctx: &PluginContext) -> Vec<RouteBinding> {
//         vec![RouteBinding::new(
//             "/api/get_text",
//             AuthPolicy::Public,
//             get(|| async { Json(serde_json::json!({ "text": "hello" })) }),
//         )]
//     }
//
// service_loop — long-running work on a host-managed worker. Poll the
// cancel token between units of work and sleep cooperatively:
//
//     fn service_loop(&self, ctx, cancel) -> Result<(), PluginError> {
//         while !cancel.is_cancelled() {
//             feed_statistics(ctx)?;
//             sleep_a_minute(cancel);
//         }
//         Ok(())
//     }
