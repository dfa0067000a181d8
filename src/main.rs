//! Development harness for the plugin kit.
//!
//! Drives the worked example through the callback contract the way the host
//! would: validate settings, run one collection pass through the pipeline
//! hooks, serve the contributed web surface, and keep the service loop
//! running until ctrl-c. This is a stand-in for development, not the host.

use std::collections::BTreeMap;
use std::fs;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{ensure, Context, Result};
use clap::{ArgAction, Parser};
use serde::Deserialize;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{info, Level};
use tracing_subscriber::{fmt, EnvFilter};

use photoframe_plugin::episync::EpiSync;
use photoframe_plugin::{
    magick, validate_settings, web_extensions, FramePlugin, GlobalView, PluginContext, PluginInfo,
};

#[derive(Debug, Parser)]
#[command(name = "episync-harness", about = "drive a photo-frame plugin standalone")]
struct Cli {
    /// Path to YAML config file
    #[arg(short, long, value_name = "FILE", default_value = "config.yaml")]
    config: PathBuf,

    /// Skip the one-shot pipeline demo and only serve the web surface
    #[arg(long)]
    no_pipeline: bool,

    /// Increase log verbosity (repeatable)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    verbose: u8,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct HarnessConfig {
    #[serde(default)]
    global: GlobalSection,
    /// Raw plugin settings, keyed by plugin section name.
    #[serde(default)]
    plugins: BTreeMap<String, BTreeMap<String, serde_yaml::Value>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct GlobalSection {
    #[serde(default = "GlobalSection::default_convert_bin")]
    convert_bin_path: PathBuf,
    #[serde(default = "GlobalSection::default_rotation")]
    rotation: u16,
    #[serde(default = "GlobalSection::default_horizontal")]
    horizontal: bool,
    #[serde(default = "GlobalSection::default_photo_target_dir")]
    photo_target_dir: PathBuf,
    #[serde(default = "GlobalSection::default_plugin_path")]
    plugin_path: PathBuf,
    #[serde(default = "GlobalSection::default_web_bind")]
    web_bind: SocketAddr,
}

impl Default for GlobalSection {
    fn default() -> Self {
        Self {
            convert_bin_path: Self::default_convert_bin(),
            rotation: Self::default_rotation(),
            horizontal: Self::default_horizontal(),
            photo_target_dir: Self::default_photo_target_dir(),
            plugin_path: Self::default_plugin_path(),
            web_bind: Self::default_web_bind(),
        }
    }
}

impl GlobalSection {
    fn default_convert_bin() -> PathBuf {
        PathBuf::from("convert")
    }

    fn default_rotation() -> u16 {
        90
    }

    fn default_horizontal() -> bool {
        true
    }

    fn default_photo_target_dir() -> PathBuf {
        PathBuf::from("frame-photo")
    }

    fn default_plugin_path() -> PathBuf {
        PathBuf::from(".")
    }

    fn default_web_bind() -> SocketAddr {
        SocketAddr::from(([127, 0, 0, 1], 8675))
    }

    fn validated(self) -> Result<Self> {
        ensure!(
            self.rotation == 90 || self.rotation == 270,
            "rotation must be 90 or 270, got {}",
            self.rotation
        );
        Ok(self)
    }
}

fn init_tracing(verbosity: u8) -> Result<()> {
    // map -v to log level
    let level = match verbosity {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("photoframe_plugin={level},episync_harness={level}"))
    });
    fmt().with_env_filter(filter).with_target(false).compact().init();
    Ok(())
}

/// Flatten the YAML plugin section into the raw string map the schema
/// engine validates.
fn raw_settings(section: &BTreeMap<String, serde_yaml::Value>) -> BTreeMap<String, String> {
    section
        .iter()
        .map(|(key, value)| {
            let raw = match value {
                serde_yaml::Value::String(s) => s.clone(),
                serde_yaml::Value::Bool(b) => b.to_string(),
                serde_yaml::Value::Number(n) => n.to_string(),
                other => serde_yaml::to_string(other).unwrap_or_default().trim().to_string(),
            };
            (key.clone(), raw)
        })
        .collect()
}

/// One pass through the pipeline hooks: collect, transform, fetch the first
/// record, preprocess, postprocess.
fn run_collection_pass(plugin: &dyn FramePlugin, ctx: &PluginContext) -> Result<()> {
    let records = plugin
        .collect_photos(ctx)
        .context("photo source hook failed")?;
    info!(count = records.len(), "collected photo records");

    let records = plugin
        .transform_photo_list(ctx, records)
        .context("list transformation hook failed")?;

    let Some(record) = records.first() else {
        info!("no records collected; nothing to materialize");
        return Ok(());
    };

    fs::create_dir_all(&ctx.global.photo_target_dir).with_context(|| {
        format!(
            "creating photo target dir {}",
            ctx.global.photo_target_dir.display()
        )
    })?;
    let fetched = plugin
        .fetch_photo(ctx, record, &ctx.global.photo_target_dir, "photo_0")
        .context("file materialization hook failed")?;
    info!(photo = %fetched.display(), "materialized photo");

    plugin
        .preprocess_photo(ctx, &fetched, record)
        .context("preprocess hook failed")?;

    let (width, height) = magick::probe_size(&ctx.runner, &ctx.global.convert_bin, &fetched)
        .context("probing materialized photo size")?;
    plugin
        .postprocess_photo(ctx, &fetched, width, height, record)
        .context("postprocess hook failed")?;
    info!(width, height, "pipeline pass complete");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose)?;

    let cfg: HarnessConfig = match fs::read_to_string(&cli.config) {
        Ok(text) => serde_yaml::from_str(&text)
            .with_context(|| format!("parsing config {}", cli.config.display()))?,
        Err(err) => {
            info!(
                config = %cli.config.display(),
                error = %err,
                "config file unreadable; using defaults"
            );
            HarnessConfig::default()
        }
    };
    let global = cfg.global.validated()?;

    let plugin = Arc::new(EpiSync);
    let section = cfg.plugins.get("episync").cloned().unwrap_or_default();
    let settings = validate_settings(plugin.as_ref(), &raw_settings(&section))
        .context("validating ePiSync settings")?;
    let plugin_info = PluginInfo::describe(plugin.as_ref(), &settings);
    info!(
        plugin = %plugin_info.name,
        enabled = plugin_info.enabled,
        "plugin settings validated"
    );

    let ctx = PluginContext {
        base_path: global.plugin_path.clone(),
        settings,
        global: GlobalView {
            convert_bin: global.convert_bin_path.clone(),
            rotation_degrees: global.rotation,
            horizontal: global.horizontal,
            photo_target_dir: global.photo_target_dir.clone(),
        },
        runner: photoframe_plugin::process::system_runner(),
    };

    if !cli.no_pipeline && ctx.settings.enabled() {
        let pass_plugin = plugin.clone();
        let pass_ctx = ctx.clone();
        let outcome =
            tokio::task::spawn_blocking(move || run_collection_pass(pass_plugin.as_ref(), &pass_ctx))
                .await
                .context("pipeline pass panicked")?;
        if let Err(err) = outcome {
            tracing::error!("pipeline pass failed: {err:?}");
        }
    }

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if let Err(err) = tokio::signal::ctrl_c().await {
                tracing::warn!("ctrl-c handler failed: {err}");
                return;
            }
            info!("ctrl-c received; shutting down");
            cancel.cancel();
        });
    }

    let service = tokio::task::spawn_blocking({
        let plugin = plugin.clone();
        let ctx = ctx.clone();
        let cancel = cancel.clone();
        move || plugin.service_loop(&ctx, &cancel)
    });

    let extensions = web_extensions(plugin.as_ref(), &ctx);
    let router = photoframe_plugin::web::build_router(extensions, vec![plugin_info]);
    let listener = TcpListener::bind(global.web_bind)
        .await
        .with_context(|| format!("binding web server to {}", global.web_bind))?;
    info!(bind = %global.web_bind, "serving plugin web surface");
    let shutdown = cancel.clone();
    axum::serve(listener, router)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .context("web server failed")?;

    cancel.cancel();
    match service.await {
        Ok(Ok(())) => {}
        Ok(Err(err)) => tracing::error!("service loop error: {err}"),
        Err(err) => tracing::error!("service join error: {err}"),
    }
    Ok(())
}
