use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use photoframe_plugin::episync::{self, watermark, EpiSync};
use photoframe_plugin::process::{CommandReport, CommandRunner, CommandSpec};
use photoframe_plugin::{
    validate_settings, FramePlugin, GlobalView, PluginContext, PluginError, ENABLE_PROPERTY,
};

fn enabled_raw(local_path: &Path) -> BTreeMap<String, String> {
    [
        (ENABLE_PROPERTY, "1"),
        (episync::LOCAL_PATH, local_path.to_str().unwrap()),
        (episync::REMOTE_PATH, "/photos/frame"),
        (episync::REMOTE_HOST, "frame.local"),
        (episync::REMOTE_USER, "pi"),
        (episync::SYNC_TIMEOUT, "5"),
        (episync::THUMB_WIDTH, "200"),
        (episync::THUMB_HEIGHT, "150"),
    ]
    .iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

fn episync_ctx(local_path: &Path, base_path: &Path, runner: CommandRunner) -> PluginContext {
    let settings = validate_settings(&EpiSync, &enabled_raw(local_path)).unwrap();
    PluginContext {
        base_path: base_path.to_path_buf(),
        settings,
        global: GlobalView {
            convert_bin: PathBuf::from("convert"),
            rotation_degrees: 90,
            horizontal: true,
            photo_target_dir: local_path.join("target"),
        },
        runner,
    }
}

/// Counts invocations; creates the destination file of thumbnail commands
/// so the on-disk existence check sees its output.
fn counting_runner(count: Arc<AtomicUsize>, commands: Arc<Mutex<Vec<String>>>) -> CommandRunner {
    Arc::new(move |spec: &CommandSpec| {
        count.fetch_add(1, Ordering::SeqCst);
        commands.lock().unwrap().push(spec.to_string());
        if spec.args.iter().any(|a| a.as_str() == "-extent") {
            if let Some(dst) = spec.args.last() {
                std::fs::write(dst, b"thumb").unwrap();
            }
        }
        Ok(CommandReport {
            command: spec.to_string(),
            success: true,
            exit_code: Some(0),
            stdout: String::new(),
            stderr: String::new(),
        })
    })
}

fn failing_runner() -> CommandRunner {
    Arc::new(|spec: &CommandSpec| {
        Ok(CommandReport {
            command: spec.to_string(),
            success: false,
            exit_code: Some(1),
            stdout: String::new(),
            stderr: "convert: unable to open image".to_string(),
        })
    })
}

#[test]
fn collection_syncs_then_scans_local_files() {
    let dir = tempfile::tempdir().unwrap();
    let local = dir.path().join("sync");
    std::fs::create_dir(&local).unwrap();
    std::fs::write(local.join("b.jpg"), b"x").unwrap();
    std::fs::write(local.join("a.jpg"), b"x").unwrap();
    std::fs::write(local.join("notes.txt"), b"x").unwrap();

    let count = Arc::new(AtomicUsize::new(0));
    let commands = Arc::new(Mutex::new(Vec::new()));
    let ctx = episync_ctx(&local, dir.path(), counting_runner(count.clone(), commands.clone()));

    let records = EpiSync.collect_photos(&ctx).unwrap();

    // one rsync invocation, with the trailing slash added to the remote path
    assert_eq!(count.load(Ordering::SeqCst), 1);
    let commands = commands.lock().unwrap();
    assert!(commands[0].starts_with("rsync --timeout=5 --ignore-existing"));
    assert!(commands[0].contains("pi@frame.local:/photos/frame/"));

    // records carry the plugin source tag; the text file is ignored
    assert_eq!(records.len(), 2);
    assert!(records.iter().all(|r| r.source == "'ePiSync' plugin source"));
    assert!(records[0].id.ends_with("a.jpg"));
}

#[test]
fn collection_survives_a_failed_sync() {
    let dir = tempfile::tempdir().unwrap();
    let local = dir.path().join("sync");
    std::fs::create_dir(&local).unwrap();
    std::fs::write(local.join("kept.jpg"), b"x").unwrap();

    let ctx = episync_ctx(&local, dir.path(), failing_runner());
    let records = EpiSync.collect_photos(&ctx).unwrap();
    assert_eq!(records.len(), 1);
}

#[test]
fn thumbnail_generation_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let local = dir.path().join("sync");
    std::fs::create_dir(&local).unwrap();
    std::fs::write(local.join("a.jpg"), b"x").unwrap();
    std::fs::write(local.join("b.jpg"), b"x").unwrap();

    let count = Arc::new(AtomicUsize::new(0));
    let commands = Arc::new(Mutex::new(Vec::new()));
    let ctx = episync_ctx(&local, dir.path(), counting_runner(count.clone(), commands));

    let records = photoframe_plugin::LocalSource::new(&local, false)
        .collect(&EpiSync.source_tag())
        .unwrap();

    let first = EpiSync.transform_photo_list(&ctx, records.clone()).unwrap();
    assert_eq!(first.len(), records.len());
    assert_eq!(count.load(Ordering::SeqCst), 2);
    assert!(local.join("thumb_/thumb_a.jpg").is_file());

    // second pass: every thumbnail exists, the tool is never invoked
    EpiSync.transform_photo_list(&ctx, records).unwrap();
    assert_eq!(count.load(Ordering::SeqCst), 2);
}

#[test]
fn thumbnail_batch_aborts_on_tool_failure() {
    let dir = tempfile::tempdir().unwrap();
    let local = dir.path().join("sync");
    std::fs::create_dir(&local).unwrap();
    std::fs::write(local.join("a.jpg"), b"x").unwrap();

    let ctx = episync_ctx(&local, dir.path(), failing_runner());
    let records = photoframe_plugin::LocalSource::new(&local, false)
        .collect(&EpiSync.source_tag())
        .unwrap();

    let err = EpiSync.transform_photo_list(&ctx, records).unwrap_err();
    match err {
        PluginError::Tool { message, .. } => assert!(message.contains("unable to open image")),
        other => panic!("expected tool error, got {other}"),
    }
}

#[test]
fn records_from_other_sources_get_no_thumbnails() {
    let dir = tempfile::tempdir().unwrap();
    let local = dir.path().join("sync");
    std::fs::create_dir(&local).unwrap();

    let count = Arc::new(AtomicUsize::new(0));
    let commands = Arc::new(Mutex::new(Vec::new()));
    let ctx = episync_ctx(&local, dir.path(), counting_runner(count.clone(), commands));

    let foreign = vec![photoframe_plugin::PhotoRecord::new(
        "/elsewhere/x.jpg",
        chrono::Utc::now(),
        "'Other' plugin source",
    )];
    EpiSync.transform_photo_list(&ctx, foreign).unwrap();
    assert_eq!(count.load(Ordering::SeqCst), 0);
}

fn write_png(path: &Path, width: u32, height: u32, color: [u8; 3]) {
    let img = image::RgbImage::from_pixel(width, height, image::Rgb(color));
    img.save(path).unwrap();
}

fn assert_red(pixel: &image::Rgb<u8>) {
    assert!(
        pixel[0] > 240 && pixel[1] < 16 && pixel[2] < 16,
        "expected red, got {pixel:?}"
    );
}

#[test]
fn watermark_lands_bottom_right_at_one_tenth_scale() {
    let dir = tempfile::tempdir().unwrap();
    let photo = dir.path().join("photo.png");
    let mark = dir.path().join("mark.png");
    write_png(&photo, 100, 80, [255, 255, 255]);
    write_png(&mark, 20, 20, [255, 0, 0]);

    watermark::apply(&photo, &mark, 100, 80, true, 90).unwrap();

    let result = image::open(&photo).unwrap();
    // color mode restored to the original's
    assert_eq!(result.color(), image::ColorType::Rgb8);
    let rgb = result.to_rgb8();
    let geom = watermark::watermark_geometry(100, 80);
    assert_eq!((geom.width, geom.height), (10, 8));
    assert_eq!((geom.x, geom.y), (80, 62));
    // inside the overlay: red; outside: untouched white
    assert_red(rgb.get_pixel(84, 65));
    assert_eq!(rgb.get_pixel(10, 10), &image::Rgb([255, 255, 255]));
    assert_eq!(rgb.get_pixel(79, 61), &image::Rgb([255, 255, 255]));
}

#[test]
fn vertical_frame_restores_orientation_after_compositing() {
    let dir = tempfile::tempdir().unwrap();
    let photo = dir.path().join("photo.png");
    let mark = dir.path().join("mark.png");
    // stored rotated for a vertical frame: 80 wide, 100 tall
    write_png(&photo, 80, 100, [255, 255, 255]);
    write_png(&mark, 20, 20, [255, 0, 0]);

    watermark::apply(&photo, &mark, 100, 80, false, 90).unwrap();

    let result = image::open(&photo).unwrap();
    // stored geometry unchanged
    assert_eq!((result.width(), result.height()), (80, 100));
    // turning it upright shows the overlay at the same spot as horizontal
    let upright = watermark::rotate_upright(result, 90).to_rgb8();
    assert_red(upright.get_pixel(84, 65));
    assert_eq!(upright.get_pixel(10, 10), &image::Rgb([255, 255, 255]));
}

#[test]
fn disabled_plugin_contributes_no_web_surface() {
    let dir = tempfile::tempdir().unwrap();
    let raw: BTreeMap<String, String> =
        [(ENABLE_PROPERTY.to_string(), "0".to_string())].into_iter().collect();
    let settings = validate_settings(&EpiSync, &raw).unwrap();
    let ctx = PluginContext {
        base_path: dir.path().to_path_buf(),
        settings,
        global: GlobalView {
            convert_bin: PathBuf::from("convert"),
            rotation_degrees: 90,
            horizontal: true,
            photo_target_dir: dir.path().join("target"),
        },
        runner: photoframe_plugin::process::system_runner(),
    };
    assert!(EpiSync.extend_api(&ctx).is_empty());
    assert!(EpiSync.add_website(&ctx).is_none());
    assert!(EpiSync.add_actions(&ctx).is_empty());
    assert!(EpiSync.collect_photos(&ctx).unwrap().is_empty());
}

#[test]
fn postprocess_ignores_foreign_records() {
    let dir = tempfile::tempdir().unwrap();
    let local = dir.path().join("sync");
    std::fs::create_dir(&local).unwrap();
    let ctx = episync_ctx(&local, dir.path(), failing_runner());

    // bogus paths everywhere: the early return must keep this a no-op
    let foreign = photoframe_plugin::PhotoRecord::new(
        "/elsewhere/x.jpg",
        chrono::Utc::now(),
        "'Other' plugin source",
    );
    EpiSync
        .postprocess_photo(&ctx, Path::new("/missing/photo.jpg"), 800, 480, &foreign)
        .unwrap();
}

#[test]
fn enabled_plugin_contributes_routes_menu_and_action() {
    let dir = tempfile::tempdir().unwrap();
    let local = dir.path().join("sync");
    std::fs::create_dir(&local).unwrap();
    let ctx = episync_ctx(&local, dir.path(), failing_runner());

    let api = EpiSync.extend_api(&ctx);
    assert_eq!(api.len(), 1);
    assert_eq!(api[0].path, "/api/get_sync_image");

    let site = EpiSync.add_website(&ctx).unwrap();
    assert_eq!(site.routes[0].path, "/episync");
    assert_eq!(site.menus[0].element_id, "episync-menu");
    assert_eq!(site.menus[0].icon, "bi bi-image");

    let actions = EpiSync.add_actions(&ctx);
    assert_eq!(actions.len(), 1);
    assert_eq!(actions[0].key, "sync-now");
    // the button fires a sync; with the failing runner it reports the error
    assert!((actions[0].run)().is_err());
}
