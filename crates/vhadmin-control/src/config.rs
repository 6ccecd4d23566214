use std::{
    collections::BTreeMap,
    net::{IpAddr, SocketAddr},
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::Context;
use vhadmin_lgsm::probe::DEFAULT_PROTOCOL;
use vhadmin_process::{PhysicalId, ServerName};

pub const CONFIG_ENV: &str = "VHADMIN_CONFIG";

const DEFAULT_LISTEN: &str = "0.0.0.0:8085";
const DEFAULT_PROBE_TIMEOUT_MS: u64 = 5000;
const DEFAULT_OUTCOME_HISTORY: usize = 64;
const DEFAULT_PUBLIC_IP_URL: &str = "https://icanhazip.com";
const MAX_ACTION_TIMEOUT_MS: u64 = 24 * 60 * 60 * 1000;

/// Paths the router serves besides the status endpoint.
pub const RESERVED_PATHS: [&str; 2] = ["/healthz", "/actions"];

/// On-disk shape of `$VHADMIN_CONFIG`. Every key is optional.
#[derive(Debug, Default, Clone, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub listen: Option<String>,
    pub api_path: Option<String>,
    pub toolchain_dir: Option<PathBuf>,
    pub lock_dir: Option<PathBuf>,
    pub probe_program: Option<PathBuf>,
    /// Empty string disables the script argument.
    pub probe_script: Option<String>,
    pub probe_protocol: Option<String>,
    pub probe_timeout_ms: Option<u64>,
    /// 0 means no timeout.
    pub action_timeout_ms: Option<u64>,
    pub public_ip: Option<String>,
    pub public_ip_url: Option<String>,
    pub outcome_history: Option<usize>,
    pub servers: Option<BTreeMap<String, String>>,
}

impl FileConfig {
    pub fn from_toml_str(raw: &str) -> anyhow::Result<Self> {
        toml::from_str(raw).context("parse config toml")
    }
}

/// Resolved configuration. Built once at startup, read-only afterwards.
#[derive(Debug, Clone)]
pub struct Config {
    pub listen: SocketAddr,
    pub api_path: String,
    pub toolchain_dir: PathBuf,
    pub lock_dir: PathBuf,
    pub probe_program: PathBuf,
    pub probe_script: Option<PathBuf>,
    pub probe_protocol: String,
    pub probe_timeout: Duration,
    pub action_timeout: Option<Duration>,
    pub public_ip: Option<IpAddr>,
    pub public_ip_url: String,
    pub outcome_history: usize,
    pub servers: BTreeMap<ServerName, PhysicalId>,
}

fn env_str(env: &dyn Fn(&str) -> Option<String>, name: &str) -> Option<String> {
    env(name)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_u64(env: &dyn Fn(&str) -> Option<String>, name: &str) -> Option<u64> {
    env_str(env, name).and_then(|v| v.parse::<u64>().ok())
}

fn default_probe_script(toolchain_dir: &Path) -> PathBuf {
    toolchain_dir
        .join("lgsm")
        .join("functions")
        .join("query_gsquery.py")
}

fn validate_physical_id(id: &str) -> anyhow::Result<()> {
    if id.trim().is_empty() {
        anyhow::bail!("physical id must be non-empty");
    }
    if id == "." || id == ".." || id.contains('/') || id.contains('\\') || id.contains('\0') {
        anyhow::bail!("physical id must be a plain file name: {id:?}");
    }
    Ok(())
}

fn resolve_servers(
    raw: Option<BTreeMap<String, String>>,
) -> anyhow::Result<BTreeMap<ServerName, PhysicalId>> {
    let raw = raw.unwrap_or_else(|| {
        BTreeMap::from([("Default".to_string(), "vhserver".to_string())])
    });
    if raw.is_empty() {
        anyhow::bail!("[servers] must list at least one server");
    }

    let mut servers = BTreeMap::new();
    for (name, physical) in raw {
        if name.trim().is_empty() {
            anyhow::bail!("server names must be non-empty");
        }
        validate_physical_id(&physical).with_context(|| format!("server {name:?}"))?;
        servers.insert(ServerName(name), PhysicalId(physical));
    }
    Ok(servers)
}

fn resolve_api_path(raw: Option<String>) -> anyhow::Result<String> {
    let path = raw
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| "/".to_string());
    if !path.starts_with('/') {
        anyhow::bail!("api_path must start with '/': {path:?}");
    }
    let path = if path.len() > 1 {
        path.trim_end_matches('/').to_string()
    } else {
        path
    };
    if RESERVED_PATHS.contains(&path.as_str()) {
        anyhow::bail!("api_path {path:?} collides with a built-in route");
    }
    Ok(path)
}

impl Config {
    /// Reads `$VHADMIN_CONFIG` (if set) and applies `VHADMIN_*` overrides.
    pub fn load() -> anyhow::Result<Self> {
        let file = match std::env::var(CONFIG_ENV) {
            Ok(path) if !path.trim().is_empty() => {
                let raw = std::fs::read_to_string(path.trim())
                    .with_context(|| format!("read config file {path}"))?;
                FileConfig::from_toml_str(&raw).with_context(|| format!("config file {path}"))?
            }
            _ => FileConfig::default(),
        };
        Self::resolve(file, &|name: &str| std::env::var(name).ok())
    }

    /// Environment beats file, file beats defaults.
    pub fn resolve(
        file: FileConfig,
        env: &dyn Fn(&str) -> Option<String>,
    ) -> anyhow::Result<Self> {
        let listen_raw = env_str(env, "VHADMIN_LISTEN")
            .or(file.listen)
            .unwrap_or_else(|| DEFAULT_LISTEN.to_string());
        let listen: SocketAddr = listen_raw
            .parse()
            .with_context(|| format!("invalid listen address: {listen_raw}"))?;

        let toolchain_dir = env_str(env, "VHADMIN_TOOLCHAIN_DIR")
            .map(PathBuf::from)
            .or(file.toolchain_dir)
            .unwrap_or_else(|| PathBuf::from("."));
        let lock_dir = env_str(env, "VHADMIN_LOCK_DIR")
            .map(PathBuf::from)
            .or(file.lock_dir)
            .unwrap_or_else(|| toolchain_dir.join("lock"));

        let probe_script = match file.probe_script {
            Some(s) if s.trim().is_empty() => None,
            Some(s) => Some(PathBuf::from(s)),
            None => Some(default_probe_script(&toolchain_dir)),
        };

        let probe_timeout_ms = env_u64(env, "VHADMIN_PROBE_TIMEOUT_MS")
            .or(file.probe_timeout_ms)
            .unwrap_or(DEFAULT_PROBE_TIMEOUT_MS)
            .clamp(250, 60_000);

        let action_timeout = match env_u64(env, "VHADMIN_ACTION_TIMEOUT_MS")
            .or(file.action_timeout_ms)
            .unwrap_or(0)
        {
            0 => None,
            ms => Some(Duration::from_millis(ms.clamp(1000, MAX_ACTION_TIMEOUT_MS))),
        };

        let public_ip = match env_str(env, "VHADMIN_PUBLIC_IP").or(file.public_ip) {
            Some(raw) => Some(
                raw.trim()
                    .parse::<IpAddr>()
                    .with_context(|| format!("invalid public_ip: {raw}"))?,
            ),
            None => None,
        };

        Ok(Config {
            listen,
            api_path: resolve_api_path(file.api_path)?,
            toolchain_dir,
            lock_dir,
            probe_program: file.probe_program.unwrap_or_else(|| PathBuf::from("python")),
            probe_script,
            probe_protocol: file
                .probe_protocol
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_PROTOCOL.to_string()),
            probe_timeout: Duration::from_millis(probe_timeout_ms),
            action_timeout,
            public_ip,
            public_ip_url: file
                .public_ip_url
                .unwrap_or_else(|| DEFAULT_PUBLIC_IP_URL.to_string()),
            outcome_history: file
                .outcome_history
                .unwrap_or(DEFAULT_OUTCOME_HISTORY)
                .clamp(1, 4096),
            servers: resolve_servers(file.servers)?,
        })
    }

    pub fn physical_id(&self, name: &ServerName) -> Option<&PhysicalId> {
        self.servers.get(name)
    }
}
