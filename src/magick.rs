//! External image tool invocations and image type tables.
//!
//! Format and size probing plus thumbnail generation shell out to an
//! ImageMagick-style `convert` binary configured by the host. Probes read
//! only the first frame so animated GIFs stay cheap.

use std::path::Path;

use crate::error::PluginError;
use crate::process::{run_checked, CommandRunner, CommandSpec};

/// Image extensions collected by default (lowercase, without dot).
pub const EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp", "bmp", "tif", "tiff"];

/// MIME content type for a file extension.
#[must_use]
pub fn mime_for_extension(ext: &str) -> Option<&'static str> {
    match ext.to_ascii_lowercase().as_str() {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        "bmp" => Some("image/bmp"),
        "tif" | "tiff" => Some("image/tiff"),
        _ => None,
    }
}

/// MIME content type for a path, from its extension.
#[must_use]
pub fn mime_for_path(path: &Path) -> Option<&'static str> {
    path.extension()
        .and_then(|e| e.to_str())
        .and_then(mime_for_extension)
}

/// Canonical extension for a format word as the image tool reports it
/// (`JPEG`, `PNG`, ...).
#[must_use]
pub fn extension_for_format(format: &str) -> Option<&'static str> {
    match format.trim().to_ascii_uppercase().as_str() {
        "JPEG" | "JPG" => Some("jpg"),
        "PNG" => Some("png"),
        "GIF" => Some("gif"),
        "WEBP" => Some("webp"),
        "BMP" => Some("bmp"),
        "TIFF" => Some("tif"),
        _ => None,
    }
}

fn first_frame(path: &Path) -> String {
    format!("{}[0]", path.display())
}

/// Probe the image format word of `path` (first frame only).
pub fn probe_format(
    runner: &CommandRunner,
    bin: &Path,
    path: &Path,
) -> Result<String, PluginError> {
    let spec = CommandSpec::new(
        bin.display().to_string(),
        [first_frame(path), "-format".into(), "%m".into(), "info:".into()],
    );
    let report = run_checked(runner, &spec, "image tool")?;
    Ok(report.stdout.trim().to_string())
}

/// Probe `(width, height)` of `path` (first frame only).
pub fn probe_size(
    runner: &CommandRunner,
    bin: &Path,
    path: &Path,
) -> Result<(u32, u32), PluginError> {
    let spec = CommandSpec::new(
        bin.display().to_string(),
        [first_frame(path), "-format".into(), "%wx%h".into(), "info:".into()],
    );
    let report = run_checked(runner, &spec, "image tool")?;
    parse_size(report.stdout.trim()).ok_or_else(|| PluginError::Tool {
        tool: "image tool".to_string(),
        message: format!("unparsable size output '{}'", report.stdout.trim()),
    })
}

fn parse_size(raw: &str) -> Option<(u32, u32)> {
    let (w, h) = raw.split_once('x')?;
    Some((w.trim().parse().ok()?, h.trim().parse().ok()?))
}

/// Generate a `width`x`height` thumbnail of `src` at `dst`: white
/// background, centered, sampled then padded to the exact extent.
pub fn make_thumbnail(
    runner: &CommandRunner,
    bin: &Path,
    src: &Path,
    dst: &Path,
    width: u32,
    height: u32,
) -> Result<(), PluginError> {
    let size = format!("{width}x{height}");
    let spec = CommandSpec::new(
        bin.display().to_string(),
        [
            src.display().to_string(),
            "-background".into(),
            "white".into(),
            "-gravity".into(),
            "center".into(),
            "-sample".into(),
            size.clone(),
            "-extent".into(),
            size,
            dst.display().to_string(),
        ],
    );
    run_checked(runner, &spec, "image tool")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::CommandReport;
    use std::path::PathBuf;
    use std::sync::Arc;

    #[test]
    fn mime_and_extension_tables_agree() {
        for ext in EXTENSIONS {
            assert!(
                mime_for_extension(ext).is_some(),
                "no MIME type for extension {ext}"
            );
        }
        assert_eq!(mime_for_extension("txt"), None);
        assert_eq!(extension_for_format("jpeg"), Some("jpg"));
        assert_eq!(extension_for_format("TIFF"), Some("tif"));
        assert_eq!(extension_for_format("raw"), None);
    }

    #[test]
    fn probe_format_reads_first_frame() {
        let runner: CommandRunner = Arc::new(|spec: &CommandSpec| {
            assert!(spec.args[0].ends_with(".gif[0]"), "args: {:?}", spec.args);
            Ok(CommandReport {
                command: spec.to_string(),
                success: true,
                exit_code: Some(0),
                stdout: "GIF\n".to_string(),
                stderr: String::new(),
            })
        });
        let format = probe_format(
            &runner,
            &PathBuf::from("convert"),
            &PathBuf::from("/photos/anim.gif"),
        )
        .unwrap();
        assert_eq!(format, "GIF");
        assert_eq!(extension_for_format(&format), Some("gif"));
    }

    #[test]
    fn probe_size_parses_dimensions() {
        let runner: CommandRunner = Arc::new(|spec: &CommandSpec| {
            Ok(CommandReport {
                command: spec.to_string(),
                success: true,
                exit_code: Some(0),
                stdout: "800x480".to_string(),
                stderr: String::new(),
            })
        });
        let size = probe_size(
            &runner,
            &PathBuf::from("convert"),
            &PathBuf::from("/photos/a.jpg"),
        )
        .unwrap();
        assert_eq!(size, (800, 480));
    }

    #[test]
    fn thumbnail_command_pads_to_extent() {
        let runner: CommandRunner = Arc::new(|spec: &CommandSpec| {
            let args: Vec<&str> = spec.args.iter().map(String::as_str).collect();
            assert_eq!(
                &args[1..9],
                &[
                    "-background",
                    "white",
                    "-gravity",
                    "center",
                    "-sample",
                    "200x150",
                    "-extent",
                    "200x150",
                ]
            );
            Ok(CommandReport {
                command: spec.to_string(),
                success: true,
                exit_code: Some(0),
                stdout: String::new(),
                stderr: String::new(),
            })
        });
        make_thumbnail(
            &runner,
            &PathBuf::from("convert"),
            &PathBuf::from("/photos/a.jpg"),
            &PathBuf::from("/photos/thumb_/thumb_a.jpg"),
            200,
            150,
        )
        .unwrap();
    }
}
