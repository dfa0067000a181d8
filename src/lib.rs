//! Extension kit for a photo-frame host application.
//!
//! A plugin implements [`plugin::FramePlugin`]: it declares a settings
//! schema and fills in only the hooks it needs — photo source, file
//! materialization, list transformation, pre/post image processing, web/API
//! surface, and an optional service loop. The host owns configuration
//! loading, the photo pipeline, scheduling, and the web server; plugins are
//! driven through this fixed callback contract.
//!
//! Two plugins ship with the kit: [`template::TemplatePlugin`], a documented
//! no-op starting point, and [`episync::EpiSync`], a worked example that
//! syncs photos from a remote host, keeps thumbnails, watermarks its photos,
//! and contributes a page, an API endpoint, and an action button.

pub mod config;
pub mod episync;
pub mod error;
pub mod magick;
pub mod plugin;
pub mod process;
pub mod records;
pub mod template;
pub mod web;

pub use crate::config::{PropertyKind, PropertySpec, Settings, SettingsSchema, ENABLE_PROPERTY};
pub use crate::error::{ConfigError, PluginError};
pub use crate::plugin::{
    validate_settings, web_extensions, FramePlugin, GlobalView, PluginContext, PluginInfo, WebSite,
};
pub use crate::records::{LocalSource, PhotoRecord};
pub use crate::web::{ActionEntry, AuthPolicy, MenuEntry, RouteBinding, WebExtensions};
