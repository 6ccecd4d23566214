use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};

#[derive(Debug, thiserror::Error)]
pub enum LockError {
    #[error("read lock file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("lock file {} has no port line", .path.display())]
    MissingPort { path: PathBuf },
    #[error("lock file {} has invalid port {value:?}", .path.display())]
    InvalidPort { path: PathBuf, value: String },
}

/// What the toolchain leaves in `lock/<physical_id>.lock` while an instance
/// runs. Only the game port (third line) is of interest here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockRecord {
    pub port: u16,
}

impl LockRecord {
    /// The query protocol listens one above the game port.
    pub fn query_port(&self) -> u16 {
        self.port + 1
    }
}

pub fn lock_path(lock_dir: &Path, physical_id: &str) -> PathBuf {
    lock_dir.join(format!("{physical_id}.lock"))
}

pub fn parse(path: &Path, contents: &str) -> Result<LockRecord, LockError> {
    let raw = contents
        .split('\n')
        .nth(2)
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| LockError::MissingPort {
            path: path.to_path_buf(),
        })?;

    let invalid = || LockError::InvalidPort {
        path: path.to_path_buf(),
        value: raw.to_string(),
    };
    let port = raw.parse::<u16>().map_err(|_| invalid())?;
    // Port 0 is never a real listener, and 65535 leaves no room for the query port.
    if port == 0 || port == u16::MAX {
        return Err(invalid());
    }
    Ok(LockRecord { port })
}

/// `Ok(None)` means the lock file does not exist, i.e. the instance is stopped.
pub async fn read(lock_dir: &Path, physical_id: &str) -> Result<Option<LockRecord>, LockError> {
    let path = lock_path(lock_dir, physical_id);
    match tokio::fs::read_to_string(&path).await {
        Ok(contents) => parse(&path, &contents).map(Some),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(source) => Err(LockError::Io { path, source }),
    }
}
