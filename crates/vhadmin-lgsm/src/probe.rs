use std::{ffi::OsString, net::IpAddr, path::PathBuf, time::Duration};

use crate::command::{self, CommandError};

/// Prefix the query helper prints when the server answered.
pub const OK_PREFIX: &str = "OK";

pub const DEFAULT_PROTOCOL: &str = "protocol-valve";

#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error(transparent)]
    Command(#[from] CommandError),
    #[error("query helper exited with {}", .code.map(|c| c.to_string()).unwrap_or_else(|| "signal".to_string()))]
    Failed { code: Option<i32> },
    #[error("query helper did not confirm the server: {output}")]
    Unconfirmed { output: String },
}

/// Runs the toolchain's live status query (`query_gsquery.py` in LinuxGSM)
/// against `host:port`.
#[derive(Debug, Clone)]
pub struct Prober {
    program: PathBuf,
    script: Option<PathBuf>,
    protocol: String,
    timeout: Duration,
}

impl Prober {
    /// `script`, when set, is passed as the first argument (the interpreter
    /// case: `python query_gsquery.py ...`).
    pub fn new(
        program: impl Into<PathBuf>,
        script: Option<PathBuf>,
        protocol: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            program: program.into(),
            script,
            protocol: protocol.into(),
            timeout,
        }
    }

    fn args(&self, host: IpAddr, port: u16) -> Vec<OsString> {
        let mut args = Vec::<OsString>::with_capacity(7);
        if let Some(script) = &self.script {
            args.push(script.clone().into_os_string());
        }
        args.push("-a".into());
        args.push(host.to_string().into());
        args.push("-p".into());
        args.push(port.to_string().into());
        args.push("-e".into());
        args.push(self.protocol.clone().into());
        args
    }

    /// One attempt, no retries. `Ok(())` only when the helper exits cleanly
    /// and its output starts with [`OK_PREFIX`].
    pub async fn probe(&self, host: IpAddr, port: u16) -> Result<(), ProbeError> {
        let out = command::run(&self.program, self.args(host, port), Some(self.timeout)).await?;
        if !out.status.success() {
            return Err(ProbeError::Failed {
                code: out.status.code(),
            });
        }
        if !out.stdout.starts_with(OK_PREFIX) {
            return Err(ProbeError::Unconfirmed {
                output: command::truncate_output(out.stdout.trim_end(), 512),
            });
        }
        Ok(())
    }
}
