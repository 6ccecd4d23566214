use std::{
    fs,
    path::{Path, PathBuf},
    sync::Once,
    time::Duration,
};

use tempfile::TempDir;
use tracing_subscriber::{EnvFilter, fmt};

static INIT: Once = Once::new();

/// Initialise tracing for tests.
///
/// Logs go through the test writer, so they only show up for failing tests
/// unless `--nocapture` is passed. Levels come from `RUST_LOG`.
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .init();
    });
}

/// Polls `check` every 20ms until it returns true or `timeout` elapses.
pub async fn eventually<F>(timeout: Duration, mut check: F) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if check() {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}

/// A throwaway LinuxGSM-like directory: per-instance shell scripts at the
/// root, lock files under `lock/`, and an optional fake query helper.
pub struct FakeToolchain {
    dir: TempDir,
}

impl FakeToolchain {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("create temp toolchain dir");
        fs::create_dir_all(dir.path().join("lock")).expect("create lock dir");
        Self { dir }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn lock_dir(&self) -> PathBuf {
        self.dir.path().join("lock")
    }

    /// Path of a file that scripts can `touch` to prove they ran.
    pub fn marker(&self, name: &str) -> PathBuf {
        self.dir.path().join(format!("{name}.marker"))
    }

    /// Writes `<root>/<physical_id>` as an executable `sh` script.
    pub fn server_script(&self, physical_id: &str, body: &str) -> PathBuf {
        let path = self.dir.path().join(physical_id);
        write_script(&path, body);
        path
    }

    /// Writes `<root>/probe` as an executable `sh` script standing in for the
    /// query helper. It receives `-a <ip> -p <port> -e <protocol>`.
    pub fn probe_script(&self, body: &str) -> PathBuf {
        let path = self.dir.path().join("probe");
        write_script(&path, body);
        path
    }

    pub fn lock_file(&self, physical_id: &str, contents: &str) -> PathBuf {
        let path = self.lock_dir().join(format!("{physical_id}.lock"));
        fs::write(&path, contents).expect("write lock file");
        path
    }

    /// Lock file in the shape the toolchain writes: epoch, pid, port.
    pub fn lock_with_port(&self, physical_id: &str, port: u16) -> PathBuf {
        self.lock_file(physical_id, &format!("1700000000\n4242\n{port}\n"))
    }
}

impl Default for FakeToolchain {
    fn default() -> Self {
        Self::new()
    }
}

fn write_script(path: &Path, body: &str) {
    fs::write(path, format!("#!/bin/sh\n{body}\n")).expect("write script");
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o755)).expect("chmod script");
    }
}
