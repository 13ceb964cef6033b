use crate::bucket::paths::MyrmPaths;
use crate::bucket::util::{BYTES_IN_MEGABYTE, SECONDS_IN_DAY, expand_tilde};
use crate::error::{SettingsError, ValidationError};
use serde::Serialize;
use serde_json::Value;
use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

pub const DEFAULT_BUCKET_SIZE: u64 = 100 * BYTES_IN_MEGABYTE;
pub const DEFAULT_STORETIME: u64 = 20 * SECONDS_IN_DAY;

const PATH_ENV_VARS: [(&str, &str); 2] = [
    ("bucket_path", "MYRM_BUCKET_PATH"),
    ("bucket_history_path", "MYRM_BUCKET_HISTORY_PATH"),
];
const SIZE_ENV_VARS: [(&str, &str); 2] = [
    ("bucket_size", "MYRM_BUCKET_SIZE"),
    ("bucket_timeout_cleanup", "MYRM_BUCKET_TIMEOUT_CLEANUP"),
];

/// Validated configuration consumed by the bucket engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppSettings {
    pub bucket_path: PathBuf,
    pub bucket_history_path: PathBuf,
    /// Maximum bucket size in bytes.
    pub bucket_size: u64,
    /// Retention in seconds.
    pub bucket_timeout_cleanup: u64,
}

impl AppSettings {
    pub fn with_defaults(paths: &MyrmPaths) -> Self {
        Self {
            bucket_path: paths.bucket_dir.clone(),
            bucket_history_path: paths.history_file.clone(),
            bucket_size: DEFAULT_BUCKET_SIZE,
            bucket_timeout_cleanup: DEFAULT_STORETIME,
        }
    }

    /// Overlay the fields present in `value` on top of `self`.
    pub fn merge_value(&mut self, value: &Value) -> Result<(), ValidationError> {
        let Some(object) = value.as_object() else {
            return Err(ValidationError {
                field: "<root>".to_string(),
                expected: "an object",
                found: type_name(value).to_string(),
            });
        };

        for (field, raw) in object {
            match field.as_str() {
                "bucket_path" => self.bucket_path = path_field(field, raw)?,
                "bucket_history_path" => self.bucket_history_path = path_field(field, raw)?,
                "bucket_size" => self.bucket_size = size_field(field, raw)?,
                "bucket_timeout_cleanup" => self.bucket_timeout_cleanup = size_field(field, raw)?,
                _ => {
                    return Err(ValidationError {
                        field: field.clone(),
                        expected: "one of bucket_path, bucket_history_path, bucket_size, bucket_timeout_cleanup",
                        found: "an unknown field".to_string(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Fails only for paths that are not valid UTF-8.
    pub fn to_pretty_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Command-line overrides; `None` leaves the loaded value in place.
#[derive(Debug, Clone, Default)]
pub struct SettingsOverrides {
    pub settings_file: Option<PathBuf>,
    pub bucket_path: Option<PathBuf>,
    pub bucket_history_path: Option<PathBuf>,
    pub bucket_size_mb: Option<u64>,
    pub bucket_timeout_days: Option<u64>,
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(n) if n.is_i64() || n.is_u64() => "an integer",
        Value::Number(_) => "a float",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn path_field(field: &str, raw: &Value) -> Result<PathBuf, ValidationError> {
    match raw.as_str() {
        Some(s) if !s.trim().is_empty() => Ok(expand_tilde(s.trim())),
        Some(_) => Err(ValidationError {
            field: field.to_string(),
            expected: "a non-empty path string",
            found: "an empty string".to_string(),
        }),
        None => Err(ValidationError {
            field: field.to_string(),
            expected: "a path string",
            found: type_name(raw).to_string(),
        }),
    }
}

fn size_field(field: &str, raw: &Value) -> Result<u64, ValidationError> {
    if let Some(n) = raw.as_u64() {
        return Ok(n);
    }
    let found = match raw.as_i64() {
        Some(n) => format!("negative value {n}"),
        None => type_name(raw).to_string(),
    };
    Err(ValidationError {
        field: field.to_string(),
        expected: "a non-negative integer",
        found,
    })
}

fn parse_file(path: &Path) -> Result<Value, SettingsError> {
    let raw = fs::read_to_string(path).map_err(|source| SettingsError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let is_toml = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));

    let parse_err = |message: String| SettingsError::Parse {
        path: path.to_path_buf(),
        message,
    };
    if is_toml {
        let parsed: toml::Value = toml::from_str(&raw).map_err(|err| parse_err(err.to_string()))?;
        serde_json::to_value(parsed).map_err(|err| parse_err(err.to_string()))
    } else {
        json5::from_str::<Value>(&raw).map_err(|err| parse_err(err.to_string()))
    }
}

fn env_overrides() -> Result<Value, ValidationError> {
    let mut object = serde_json::Map::new();
    for (field, var) in PATH_ENV_VARS {
        if let Ok(v) = env::var(var) {
            if !v.trim().is_empty() {
                object.insert(field.to_string(), Value::String(v));
            }
        }
    }
    for (field, var) in SIZE_ENV_VARS {
        let Ok(v) = env::var(var) else {
            continue;
        };
        let trimmed = v.trim();
        if trimmed.is_empty() {
            continue;
        }
        let number = trimmed.parse::<i64>().map_err(|_| ValidationError {
            field: var.to_string(),
            expected: "a non-negative integer",
            found: format!("{trimmed:?}"),
        })?;
        object.insert(field.to_string(), Value::from(number));
    }
    Ok(Value::Object(object))
}

/// Resolve the effective settings: defaults, then the settings file, then
/// `MYRM_*` environment variables, then command-line overrides.
pub fn load_settings(
    paths: &MyrmPaths,
    overrides: &SettingsOverrides,
) -> Result<AppSettings, SettingsError> {
    let mut settings = AppSettings::with_defaults(paths);

    let file = overrides
        .settings_file
        .clone()
        .unwrap_or_else(|| paths.settings_file.clone());
    if file.exists() || overrides.settings_file.is_some() {
        let value = parse_file(&file)?;
        settings.merge_value(&value)?;
        tracing::debug!(path = %file.display(), "settings file loaded");
    } else {
        tracing::debug!(path = %file.display(), "no settings file, using defaults");
    }

    settings.merge_value(&env_overrides()?)?;

    if let Some(path) = &overrides.bucket_path {
        settings.bucket_path = path.clone();
    }
    if let Some(path) = &overrides.bucket_history_path {
        settings.bucket_history_path = path.clone();
    }
    if let Some(mb) = overrides.bucket_size_mb {
        settings.bucket_size = mb.saturating_mul(BYTES_IN_MEGABYTE);
    }
    if let Some(days) = overrides.bucket_timeout_days {
        settings.bucket_timeout_cleanup = days.saturating_mul(SECONDS_IN_DAY);
    }

    Ok(settings)
}

/// Write `settings` as pretty JSON to `path`, creating parent directories.
pub fn generate(path: &Path, settings: &AppSettings) -> Result<(), SettingsError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| SettingsError::Write {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    let write_err = |source: io::Error| SettingsError::Write {
        path: path.to_path_buf(),
        source,
    };
    let rendered = settings
        .to_pretty_json()
        .map_err(|err| write_err(io::Error::other(err)))?;
    fs::write(path, format!("{rendered}\n")).map_err(write_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn test_paths(root: &Path) -> MyrmPaths {
        MyrmPaths {
            bucket_dir: root.join("data/bucket"),
            history_file: root.join("data/history.json"),
            settings_file: root.join("config/settings.json"),
            audit_log: root.join("data/audit.log"),
        }
    }

    #[test]
    fn defaults_apply_without_settings_file() {
        let tmp = tempdir().expect("tempdir");
        let paths = test_paths(tmp.path());
        let mut settings = AppSettings::with_defaults(&paths);
        settings.merge_value(&serde_json::json!({})).expect("merge");

        assert_eq!(settings.bucket_path, paths.bucket_dir);
        assert_eq!(settings.bucket_size, 100 * 1024 * 1024);
        assert_eq!(settings.bucket_timeout_cleanup, 20 * 24 * 60 * 60);
    }

    #[test]
    fn merge_rejects_negative_sizes() {
        let tmp = tempdir().expect("tempdir");
        let mut settings = AppSettings::with_defaults(&test_paths(tmp.path()));

        let err = settings
            .merge_value(&serde_json::json!({"bucket_size": -1}))
            .expect_err("negative");
        assert_eq!(err.field, "bucket_size");
        assert!(err.found.contains("negative"));
    }

    #[test]
    fn merge_rejects_wrong_types_and_unknown_fields() {
        let tmp = tempdir().expect("tempdir");
        let mut settings = AppSettings::with_defaults(&test_paths(tmp.path()));

        let err = settings
            .merge_value(&serde_json::json!({"bucket_path": 12}))
            .expect_err("wrong type");
        assert_eq!(err.field, "bucket_path");
        assert_eq!(err.found, "an integer");

        let err = settings
            .merge_value(&serde_json::json!({"bucket_color": "red"}))
            .expect_err("unknown");
        assert_eq!(err.field, "bucket_color");
    }

    #[test]
    fn json5_settings_file_is_merged() {
        let tmp = tempdir().expect("tempdir");
        let file = tmp.path().join("settings.json");
        fs::write(
            &file,
            "{\n  // trimmed down bucket\n  bucket_size: 2048,\n  bucket_path: \"/srv/bucket\",\n}\n",
        )
        .expect("write settings");

        let mut settings = AppSettings::with_defaults(&test_paths(tmp.path()));
        settings.merge_value(&parse_file(&file).expect("parse")).expect("merge");
        assert_eq!(settings.bucket_size, 2048);
        assert_eq!(settings.bucket_path, PathBuf::from("/srv/bucket"));
    }

    #[test]
    fn toml_settings_file_is_merged() {
        let tmp = tempdir().expect("tempdir");
        let file = tmp.path().join("settings.toml");
        fs::write(&file, "bucket_timeout_cleanup = 60\n").expect("write settings");

        let mut settings = AppSettings::with_defaults(&test_paths(tmp.path()));
        settings.merge_value(&parse_file(&file).expect("parse")).expect("merge");
        assert_eq!(settings.bucket_timeout_cleanup, 60);
    }

    #[test]
    fn malformed_settings_file_is_a_parse_error() {
        let tmp = tempdir().expect("tempdir");
        let file = tmp.path().join("settings.json");
        fs::write(&file, "{ bucket_size: ").expect("write settings");

        assert!(matches!(parse_file(&file), Err(SettingsError::Parse { .. })));
    }

    #[test]
    fn pretty_json_lists_every_field() {
        let tmp = tempdir().expect("tempdir");
        let settings = AppSettings::with_defaults(&test_paths(tmp.path()));
        let rendered: Value =
            serde_json::from_str(&settings.to_pretty_json().expect("render")).expect("parse");

        assert_eq!(rendered["bucket_size"], DEFAULT_BUCKET_SIZE);
        assert_eq!(rendered["bucket_timeout_cleanup"], DEFAULT_STORETIME);
        assert_eq!(
            rendered["bucket_path"],
            settings.bucket_path.display().to_string()
        );
    }

    #[test]
    fn generate_writes_loadable_json() {
        let tmp = tempdir().expect("tempdir");
        let paths = test_paths(tmp.path());
        let file = tmp.path().join("nested/settings.json");
        let settings = AppSettings::with_defaults(&paths);

        generate(&file, &settings).expect("generate");
        let mut reloaded = AppSettings::with_defaults(&paths);
        reloaded.bucket_size = 1;
        reloaded.merge_value(&parse_file(&file).expect("parse")).expect("merge");
        assert_eq!(reloaded, settings);
    }
}
