//! Plugin settings schema: declaration and validation.
//!
//! A plugin declares its configuration as an ordered list of typed
//! properties. The host validates raw key/value input against the schema
//! before any hook runs; this module carries the same semantics so schemas
//! are testable and the development harness can run standalone.
//!
//! Property semantics: type parsing, integer bounds, allowed-value lists,
//! delimited lists with optional fixed length, dependency gating on an
//! earlier property (boolean true, or equality with a literal), plus
//! plugin-supplied check and convert functions. A dependency-gated property
//! whose gate is off is skipped entirely.

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use crate::error::ConfigError;

/// Every plugin schema must declare this boolean property.
pub const ENABLE_PROPERTY: &str = "is_enabled";

/// Predicate over the raw string value; error message on rejection.
pub type CheckFn = fn(&str) -> Result<(), String>;

/// Rewrites the raw string value before validation (e.g. path fixup).
pub type ConvertFn = fn(&str) -> Result<String, String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyKind {
    Boolean,
    Integer,
    String,
    /// A filesystem path. Existence is not required; use a convert
    /// function such as [`create_directory`] to materialize one.
    Path,
    IntegerList,
    StringList,
}

/// Gates a property on the value of an earlier-declared property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dependency {
    /// Active only while the named boolean property is true.
    Enabled(String),
    /// Active only while the named property equals the literal value.
    Equals { property: String, value: String },
}

impl Dependency {
    fn property(&self) -> &str {
        match self {
            Dependency::Enabled(name) => name,
            Dependency::Equals { property, .. } => property,
        }
    }
}

/// One declared setting.
#[derive(Clone)]
pub struct PropertySpec {
    name: String,
    kind: PropertyKind,
    default: Option<String>,
    allow_empty: bool,
    min: Option<i64>,
    max: Option<i64>,
    possible: Option<Vec<String>>,
    delimiter: char,
    length: Option<usize>,
    dependency: Option<Dependency>,
    check: Option<CheckFn>,
    convert: Option<ConvertFn>,
}

impl std::fmt::Debug for PropertySpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PropertySpec")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("default", &self.default)
            .field("dependency", &self.dependency)
            .field("has_check", &self.check.is_some())
            .field("has_convert", &self.convert.is_some())
            .finish()
    }
}

impl PropertySpec {
    pub fn new(name: impl Into<String>, kind: PropertyKind) -> Self {
        Self {
            name: name.into(),
            kind,
            default: None,
            allow_empty: false,
            min: None,
            max: None,
            possible: None,
            delimiter: ',',
            length: None,
            dependency: None,
            check: None,
            convert: None,
        }
    }

    #[must_use]
    pub fn default_value(mut self, value: impl Into<String>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Allow the property to be absent or empty; reads then fall through
    /// to the default, if any.
    #[must_use]
    pub fn allow_empty(mut self) -> Self {
        self.allow_empty = true;
        self
    }

    /// Inclusive bounds for integer properties.
    #[must_use]
    pub fn bounds(mut self, min: i64, max: i64) -> Self {
        self.min = Some(min);
        self.max = Some(max);
        self
    }

    #[must_use]
    pub fn possible(mut self, values: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.possible = Some(values.into_iter().map(Into::into).collect());
        self
    }

    /// Delimiter for list properties (default `,`).
    #[must_use]
    pub fn delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Require exactly `length` entries in a list property.
    #[must_use]
    pub fn length(mut self, length: usize) -> Self {
        self.length = Some(length);
        self
    }

    /// Gate on an earlier boolean property being true.
    #[must_use]
    pub fn depends_on(mut self, property: impl Into<String>) -> Self {
        self.dependency = Some(Dependency::Enabled(property.into()));
        self
    }

    /// Gate on an earlier property equalling a literal value.
    #[must_use]
    pub fn depends_on_value(
        mut self,
        property: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.dependency = Some(Dependency::Equals {
            property: property.into(),
            value: value.into(),
        });
        self
    }

    #[must_use]
    pub fn check(mut self, check: CheckFn) -> Self {
        self.check = Some(check);
        self
    }

    #[must_use]
    pub fn convert(mut self, convert: ConvertFn) -> Self {
        self.convert = Some(convert);
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn kind(&self) -> PropertyKind {
        self.kind
    }

    #[must_use]
    pub fn dependency(&self) -> Option<&Dependency> {
        self.dependency.as_ref()
    }
}

/// A validated, typed setting value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Str(String),
    Path(PathBuf),
    IntList(Vec<i64>),
    StrList(Vec<String>),
}

/// Validated settings, keyed by property name.
///
/// Properties whose dependency gate was off are absent; typed accessors
/// report [`ConfigError::Missing`] for them.
#[derive(Debug, Clone, Default)]
pub struct Settings {
    values: BTreeMap<String, Value>,
}

impl Settings {
    fn get(&self, name: &str) -> Result<&Value, ConfigError> {
        self.values
            .get(name)
            .ok_or_else(|| ConfigError::Missing(name.to_string()))
    }

    pub fn get_bool(&self, name: &str) -> Result<bool, ConfigError> {
        match self.get(name)? {
            Value::Bool(v) => Ok(*v),
            other => Err(type_mismatch(name, "a boolean", other)),
        }
    }

    pub fn get_int(&self, name: &str) -> Result<i64, ConfigError> {
        match self.get(name)? {
            Value::Int(v) => Ok(*v),
            other => Err(type_mismatch(name, "an integer", other)),
        }
    }

    pub fn get_str(&self, name: &str) -> Result<&str, ConfigError> {
        match self.get(name)? {
            Value::Str(v) => Ok(v.as_str()),
            other => Err(type_mismatch(name, "a string", other)),
        }
    }

    pub fn get_path(&self, name: &str) -> Result<&PathBuf, ConfigError> {
        match self.get(name)? {
            Value::Path(v) => Ok(v),
            other => Err(type_mismatch(name, "a path", other)),
        }
    }

    pub fn get_int_list(&self, name: &str) -> Result<&[i64], ConfigError> {
        match self.get(name)? {
            Value::IntList(v) => Ok(v.as_slice()),
            other => Err(type_mismatch(name, "an integer list", other)),
        }
    }

    pub fn get_str_list(&self, name: &str) -> Result<&[String], ConfigError> {
        match self.get(name)? {
            Value::StrList(v) => Ok(v.as_slice()),
            other => Err(type_mismatch(name, "a string list", other)),
        }
    }

    /// The required enable flag; absent reads as disabled.
    #[must_use]
    pub fn enabled(&self) -> bool {
        self.get_bool(ENABLE_PROPERTY).unwrap_or(false)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }
}

fn type_mismatch(name: &str, expected: &'static str, got: &Value) -> ConfigError {
    ConfigError::Type {
        name: name.to_string(),
        expected,
        value: format!("{got:?}"),
    }
}

/// A plugin's declared settings, in declaration order.
#[derive(Debug, Clone)]
pub struct SettingsSchema {
    props: Vec<PropertySpec>,
}

impl SettingsSchema {
    /// Build a schema. Rejects duplicate names, a missing
    /// [`ENABLE_PROPERTY`], and dependencies on later or unknown properties.
    pub fn new(props: Vec<PropertySpec>) -> Result<Self, ConfigError> {
        let mut seen: Vec<&str> = Vec::with_capacity(props.len());
        for spec in &props {
            if seen.contains(&spec.name.as_str()) {
                return Err(ConfigError::Schema(format!(
                    "duplicate property '{}'",
                    spec.name
                )));
            }
            if let Some(dep) = &spec.dependency {
                if !seen.contains(&dep.property()) {
                    return Err(ConfigError::UnknownDependency {
                        name: spec.name.clone(),
                        dependency: dep.property().to_string(),
                    });
                }
            }
            seen.push(spec.name.as_str());
        }
        if !seen.contains(&ENABLE_PROPERTY) {
            return Err(ConfigError::Schema(format!(
                "schema must declare the boolean '{ENABLE_PROPERTY}' property"
            )));
        }
        Ok(Self { props })
    }

    #[must_use]
    pub fn properties(&self) -> &[PropertySpec] {
        &self.props
    }

    /// Validate raw key/value input into typed [`Settings`].
    ///
    /// Properties are processed in declaration order; a gated property whose
    /// gate resolves false is skipped without validation.
    pub fn validate(&self, raw: &BTreeMap<String, String>) -> Result<Settings, ConfigError> {
        let mut settings = Settings::default();
        let mut resolved_raw: BTreeMap<String, String> = BTreeMap::new();

        for spec in &self.props {
            if let Some(dep) = &spec.dependency {
                let active = match dep {
                    Dependency::Enabled(name) => {
                        settings.get_bool(name).unwrap_or(false)
                    }
                    Dependency::Equals { property, value } => resolved_raw
                        .get(property)
                        .is_some_and(|actual| actual == value),
                };
                if !active {
                    continue;
                }
            }

            let raw_value = match raw.get(&spec.name) {
                Some(v) => v.clone(),
                None => match &spec.default {
                    Some(d) => d.clone(),
                    None if spec.allow_empty => continue,
                    None => return Err(ConfigError::Missing(spec.name.clone())),
                },
            };
            if raw_value.trim().is_empty() {
                if spec.allow_empty {
                    continue;
                }
                return Err(ConfigError::Empty(spec.name.clone()));
            }

            let raw_value = match &spec.convert {
                Some(convert) => convert(&raw_value).map_err(|message| ConfigError::Check {
                    name: spec.name.clone(),
                    message,
                })?,
                None => raw_value,
            };

            if let Some(possible) = &spec.possible {
                if !possible.iter().any(|p| p == &raw_value) {
                    return Err(ConfigError::NotAllowed {
                        name: spec.name.clone(),
                        value: raw_value,
                    });
                }
            }

            let value = parse_value(spec, &raw_value)?;

            if let Some(check) = &spec.check {
                check(&raw_value).map_err(|message| ConfigError::Check {
                    name: spec.name.clone(),
                    message,
                })?;
            }

            resolved_raw.insert(spec.name.clone(), raw_value);
            settings.values.insert(spec.name.clone(), value);
        }

        Ok(settings)
    }
}

fn parse_value(spec: &PropertySpec, raw: &str) -> Result<Value, ConfigError> {
    match spec.kind {
        PropertyKind::Boolean => parse_bool(raw)
            .map(Value::Bool)
            .ok_or_else(|| type_error(spec, "a boolean", raw)),
        PropertyKind::Integer => {
            let value: i64 = raw
                .trim()
                .parse()
                .map_err(|_| type_error(spec, "an integer", raw))?;
            check_bounds(spec, value)?;
            Ok(Value::Int(value))
        }
        PropertyKind::String => Ok(Value::Str(raw.to_string())),
        PropertyKind::Path => Ok(Value::Path(PathBuf::from(raw))),
        PropertyKind::IntegerList => {
            let entries = split_list(spec, raw)?;
            let mut values = Vec::with_capacity(entries.len());
            for entry in entries {
                let value: i64 = entry
                    .parse()
                    .map_err(|_| type_error(spec, "an integer list", raw))?;
                check_bounds(spec, value)?;
                values.push(value);
            }
            Ok(Value::IntList(values))
        }
        PropertyKind::StringList => {
            let entries = split_list(spec, raw)?;
            Ok(Value::StrList(entries))
        }
    }
}

fn split_list(spec: &PropertySpec, raw: &str) -> Result<Vec<String>, ConfigError> {
    let entries: Vec<String> = raw
        .split(spec.delimiter)
        .map(|e| e.trim().to_string())
        .filter(|e| !e.is_empty())
        .collect();
    if let Some(expected) = spec.length {
        if entries.len() != expected {
            return Err(ConfigError::Length {
                name: spec.name.clone(),
                expected,
                actual: entries.len(),
            });
        }
    }
    Ok(entries)
}

fn check_bounds(spec: &PropertySpec, value: i64) -> Result<(), ConfigError> {
    let min = spec.min.unwrap_or(i64::MIN);
    let max = spec.max.unwrap_or(i64::MAX);
    if value < min || value > max {
        return Err(ConfigError::Bounds {
            name: spec.name.clone(),
            min,
            max,
            value,
        });
    }
    Ok(())
}

fn type_error(spec: &PropertySpec, expected: &'static str, raw: &str) -> ConfigError {
    ConfigError::Type {
        name: spec.name.clone(),
        expected,
        value: raw.to_string(),
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Convert helper: create the directory named by the value if missing.
///
/// Declared as a property convert function so a path setting materializes
/// its directory during validation, the way the worked example's local sync
/// path does.
pub fn create_directory(value: &str) -> Result<String, String> {
    fs::create_dir_all(value).map_err(|err| format!("cannot create directory '{value}': {err}"))?;
    Ok(value.to_string())
}
