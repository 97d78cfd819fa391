//! Shared helpers for the dcgen test targets.

#![allow(dead_code)]

use anyhow::Result;
use assert_cmd::Command;
use dcgen_cli::test_utils::{ConfigFixture, ManifestFixture};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A temporary project directory holding a manifest, a configuration and an
/// output directory.
pub struct TestProject {
    _temp_dir: TempDir,
    project_dir: PathBuf,
}

impl TestProject {
    pub fn new() -> Result<Self> {
        let temp_dir = TempDir::new()?;
        let project_dir = temp_dir.path().join("project");
        fs::create_dir_all(&project_dir)?;
        Ok(Self {
            _temp_dir: temp_dir,
            project_dir,
        })
    }

    /// A project with the cluster manifest and `config`.
    pub fn with_cluster(config: ConfigFixture) -> Result<Self> {
        let project = Self::new()?;
        ManifestFixture::cluster().write_to(&project.project_dir)?;
        config.write_to(&project.project_dir)?;
        Ok(project)
    }

    pub fn path(&self) -> &Path {
        &self.project_dir
    }

    pub fn output_dir(&self) -> PathBuf {
        self.project_dir.join("genconf").join("serve")
    }

    pub fn write_manifest(&self, content: &str) -> Result<()> {
        fs::write(self.project_dir.join("dcgen.toml"), content)?;
        Ok(())
    }

    pub fn write_config(&self, content: &str) -> Result<()> {
        fs::write(self.project_dir.join("config.yaml"), content)?;
        Ok(())
    }

    pub fn read_output(&self, name: &str) -> Result<String> {
        Ok(fs::read_to_string(self.output_dir().join(name))?)
    }

    /// A `dcgen` command running inside the project with a clean environment.
    pub fn command(&self) -> Command {
        let mut cmd = Command::cargo_bin("dcgen").unwrap_or_else(|e| panic!("dcgen binary not built: {e}"));
        cmd.current_dir(&self.project_dir)
            .env_remove("DCGEN_MANIFEST")
            .env_remove("DCGEN_CONFIG")
            .env_remove("RUST_LOG")
            .env("NO_COLOR", "1");
        cmd
    }

    pub fn run_dcgen(&self, args: &[&str]) -> CommandOutput {
        let output = self.command().args(args).output().unwrap_or_else(|e| panic!("failed to run dcgen: {e}"));
        CommandOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            success: output.status.success(),
            code: output.status.code(),
        }
    }
}

/// Captured result of one `dcgen` invocation.
#[derive(Debug)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub success: bool,
    pub code: Option<i32>,
}

impl CommandOutput {
    pub fn assert_success(&self) -> &Self {
        assert!(self.success, "Command failed with code {:?}\nStderr: {}", self.code, self.stderr);
        self
    }

    pub fn assert_failure(&self) -> &Self {
        assert!(!self.success, "Command unexpectedly succeeded\nStdout: {}", self.stdout);
        self
    }

    pub fn assert_stdout_contains(&self, text: &str) -> &Self {
        assert!(self.stdout.contains(text), "Expected stdout to contain '{text}'\nActual stdout: {}", self.stdout);
        self
    }

    pub fn assert_stderr_contains(&self, text: &str) -> &Self {
        assert!(self.stderr.contains(text), "Expected stderr to contain '{text}'\nActual stderr: {}", self.stderr);
        self
    }
}
