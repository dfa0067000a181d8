//! Idempotent thumbnail generation for synced photos.

use std::fs;
use std::path::Path;

use tracing::debug;

use crate::error::PluginError;
use crate::magick;
use crate::plugin::PluginContext;
use crate::records::{filter_by_source, PhotoRecord};

use super::{thumb_path_for, THUMB_HEIGHT, THUMB_WIDTH};

/// Ensure every record from `source_tag` has a thumbnail on disk.
///
/// The thumbnail path is derived from the original path, so a second pass
/// over the same files invokes the image tool zero times. The first tool
/// failure aborts the whole batch; there is no partial-success bookkeeping
/// and no retry.
///
/// Returns how many thumbnails were generated.
pub fn ensure_thumbnails(
    ctx: &PluginContext,
    records: &[PhotoRecord],
    source_tag: &str,
) -> Result<usize, PluginError> {
    let width = ctx.settings.get_int(THUMB_WIDTH)? as u32;
    let height = ctx.settings.get_int(THUMB_HEIGHT)? as u32;

    let mut generated = 0;
    for record in filter_by_source(records, source_tag) {
        let original = Path::new(&record.id);
        let thumb = thumb_path_for(original);
        if thumb.exists() {
            debug!(thumb = %thumb.display(), "thumbnail present; skipping");
            continue;
        }
        if let Some(parent) = thumb.parent() {
            fs::create_dir_all(parent)?;
        }
        magick::make_thumbnail(
            &ctx.runner,
            &ctx.global.convert_bin,
            original,
            &thumb,
            width,
            height,
        )?;
        generated += 1;
    }
    Ok(generated)
}
