#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use serde_json::Value;
use tempfile::TempDir;

/// Isolated store and config for one test
pub struct TestStore {
    dir: TempDir,
}

impl TestStore {
    /// Fresh directory with a UTC display config so dates are deterministic
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("failed to create tempdir");
        let store = Self { dir };
        store
            .write_config("[display]\ntimezone = \"utc\"\n")
            .expect("failed to write config");
        store
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn store_path(&self) -> PathBuf {
        self.dir.path().join("storage.json")
    }

    pub fn config_path(&self) -> PathBuf {
        self.dir.path().join("config.toml")
    }

    pub fn write_config(&self, contents: &str) -> std::io::Result<()> {
        fs::write(self.config_path(), contents)
    }

    /// Put `blob` under the `todos` slot
    pub fn seed(&self, blob: &str) -> std::io::Result<()> {
        let doc = serde_json::json!({ "todos": blob });
        fs::write(self.store_path(), doc.to_string())
    }

    /// Raw `todos` blob, if any
    pub fn blob(&self) -> Option<String> {
        let content = fs::read_to_string(self.store_path()).ok()?;
        let doc: Value = serde_json::from_str(&content).ok()?;
        doc.get("todos")?.as_str().map(str::to_string)
    }

    /// Decoded task array from the `todos` slot
    pub fn tasks(&self) -> Vec<Value> {
        self.blob()
            .and_then(|blob| serde_json::from_str::<Vec<Value>>(&blob).ok())
            .unwrap_or_default()
    }

    pub fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("tm").expect("tm binary");
        cmd.current_dir(self.path())
            .env("TM_STORE", self.store_path())
            .env("TM_CONFIG", self.config_path())
            .env_remove("RUST_LOG");
        cmd
    }
}

/// `stdout` of a successful `--json` invocation, parsed
pub fn json_output(output: &std::process::Output) -> Value {
    serde_json::from_slice(&output.stdout).expect("stdout should be JSON")
}
