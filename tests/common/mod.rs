#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use tempfile::{TempDir, tempdir};

/// Returns the absolute path to a fixture under `tests/data`.
pub fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("data")
        .join(name)
}

/// Binary under test with model-related environment cleared, so no test
/// depends on the caller's shell.
pub fn analyzer_cmd() -> Command {
    let mut cmd = Command::cargo_bin("bizdata-analyzer").expect("binary built");
    for key in [
        "LLM_ENDPOINT",
        "LLM_API_KEY",
        "BEDROCK_MODEL_ID",
        "DEFAULT_FORMAT",
        "FORCE_JA",
        "RUST_LOG",
    ] {
        cmd.env_remove(key);
    }
    cmd
}

/// Scratch directory for request files and outputs, removed on drop.
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl TestWorkspace {
    pub fn new() -> Self {
        Self {
            temp_dir: tempdir().expect("temp dir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        self.write_bytes(name, contents.as_bytes())
    }

    pub fn write_bytes(&self, name: &str, contents: &[u8]) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        fs::write(&path, contents).expect("write temp file contents");
        path
    }

    /// Parses a JSON file written by the binary.
    pub fn read_json(&self, name: &str) -> serde_json::Value {
        let raw = fs::read_to_string(self.temp_dir.path().join(name)).expect("read output");
        serde_json::from_str(&raw).expect("output is JSON")
    }
}
