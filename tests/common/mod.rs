#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use serde_json::Value;

pub struct Sandbox {
    pub root: tempfile::TempDir,
}

impl Sandbox {
    pub fn new() -> Self {
        Self {
            root: tempfile::tempdir().expect("tempdir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.root.path()
    }

    pub fn home(&self) -> PathBuf {
        self.path().join("data")
    }

    pub fn bucket_dir(&self) -> PathBuf {
        self.home().join("bucket")
    }

    pub fn history_file(&self) -> PathBuf {
        self.home().join("history.json")
    }

    pub fn cmd(&self) -> Command {
        let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("myrm");
        cmd.current_dir(self.path())
            .env("HOME", self.path())
            .env("MYRM_HOME", self.home())
            .env("MYRM_SETTINGS_PATH", self.path().join("config/settings.json"))
            .env_remove("RUST_LOG");
        cmd
    }

    pub fn write(&self, rel: &str, contents: &str) -> PathBuf {
        let path = self.path().join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("mkdir parent");
        }
        fs::write(&path, contents).expect("write file");
        path
    }

    pub fn history(&self) -> serde_json::Map<String, Value> {
        let raw = fs::read_to_string(self.history_file()).expect("read history");
        let value: Value = serde_json::from_str(&raw).expect("parse history");
        value.as_object().cloned().expect("history object")
    }

    pub fn bucket_names(&self) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(self.bucket_dir())
            .expect("read bucket")
            .map(|e| e.expect("entry").file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }
}
