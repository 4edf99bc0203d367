//! Shared helpers for pga integration tests.
//!
//! Every run happens in a fresh temp directory that looks like a repo root
//! (it contains `.git`), with `HOME`/`XDG_CONFIG_HOME` redirected so user and
//! project configs on the host never leak into a test.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use tempfile::TempDir;

/// Fixture rule source shipped with the tests.
pub const FIXTURE_PATTERNS: &str = include_str!("../fixtures/patterns.rs");

/// Number of valid blocks in [`FIXTURE_PATTERNS`].
pub const FIXTURE_PATTERN_COUNT: u64 = 7;

/// Path to the pga binary built for this test run.
pub fn pga_binary() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_pga"))
}

/// Isolated working directory with the fixture rule file written into it.
pub struct Workspace {
    pub dir: TempDir,
}

impl Workspace {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        std::fs::create_dir_all(dir.path().join(".git")).expect("failed to create .git dir");
        std::fs::create_dir_all(dir.path().join("home")).expect("failed to create home dir");
        std::fs::create_dir_all(dir.path().join("xdg_config")).expect("failed to create xdg dir");
        let ws = Self { dir };
        ws.write("patterns.rs", FIXTURE_PATTERNS);
        ws
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn rules(&self) -> PathBuf {
        self.path().join("patterns.rs")
    }

    pub fn write(&self, name: &str, content: &str) -> PathBuf {
        let path = self.path().join(name);
        std::fs::write(&path, content).expect("failed to write file");
        path
    }

    /// A `std::process::Command` for pga with a scrubbed environment.
    pub fn command(&self) -> Command {
        let mut cmd = Command::new(pga_binary());
        self.isolate(&mut cmd);
        cmd
    }

    /// An `assert_cmd` command for pga with a scrubbed environment.
    pub fn assert_command(&self) -> assert_cmd::Command {
        let mut cmd = assert_cmd::Command::new(pga_binary());
        cmd.current_dir(self.path())
            .env("HOME", self.path().join("home"))
            .env("XDG_CONFIG_HOME", self.path().join("xdg_config"));
        for key in SCRUBBED_ENV {
            cmd.env_remove(key);
        }
        cmd
    }

    fn isolate(&self, cmd: &mut Command) {
        cmd.current_dir(self.path())
            .env("HOME", self.path().join("home"))
            .env("XDG_CONFIG_HOME", self.path().join("xdg_config"))
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        for key in SCRUBBED_ENV {
            cmd.env_remove(key);
        }
    }

    /// Run pga with `args` and capture output.
    pub fn run(&self, args: &[&str]) -> Output {
        self.command()
            .args(args)
            .output()
            .expect("failed to execute pga")
    }
}

const SCRUBBED_ENV: [&str; 6] = [
    "PGA_CONFIG",
    "PGA_FORMAT",
    "PGA_MIN_SEVERITY",
    "PGA_DETECTOR",
    "PGA_LOG",
    "RUST_LOG",
];

pub fn stdout_str(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

pub fn stderr_str(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).to_string()
}

/// Parse stdout as JSON, with the raw output in the panic message.
pub fn stdout_json(output: &Output) -> serde_json::Value {
    let stdout = stdout_str(output);
    serde_json::from_str(&stdout)
        .unwrap_or_else(|e| panic!("stdout is not JSON ({e}):\n{stdout}\nstderr:\n{}", stderr_str(output)))
}
