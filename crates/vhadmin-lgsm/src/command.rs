use std::{
    ffi::OsStr,
    path::{Path, PathBuf},
    process::{ExitStatus, Stdio},
    time::Duration,
};

use tokio::process::Command;

/// Last thing the toolchain prints when a command went through.
pub const SUCCESS_SUFFIX: &str = "with code: 0";

const MAX_OUTPUT_BYTES: usize = 4 * 1024;

#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("spawn {exec}: {source}")]
    Spawn {
        exec: String,
        #[source]
        source: std::io::Error,
    },
    #[error("wait for {exec}: {source}")]
    Wait {
        exec: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{exec} timed out after {}ms", .timeout.as_millis())]
    Timeout { exec: String, timeout: Duration },
    #[error("{exec} exited with {}: {output}", .code.map(|c| c.to_string()).unwrap_or_else(|| "signal".to_string()))]
    Exit {
        exec: String,
        code: Option<i32>,
        output: String,
    },
    #[error("{exec} did not report success: {output}")]
    NotConfirmed { exec: String, output: String },
}

#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    /// stdout followed by stderr, cut down to the last few KiB.
    pub fn combined(&self) -> String {
        let mut out = self.stdout.clone();
        if !self.stderr.is_empty() {
            if !out.is_empty() && !out.ends_with('\n') {
                out.push('\n');
            }
            out.push_str(&self.stderr);
        }
        truncate_output(out.trim_end(), MAX_OUTPUT_BYTES)
    }
}

/// Keeps the tail of `s`: the end of toolchain output is where the verdict is.
pub fn truncate_output(s: &str, max_bytes: usize) -> String {
    if s.len() <= max_bytes {
        return s.to_string();
    }

    let prefix = "(truncated)…";
    let keep = max_bytes.saturating_sub(prefix.len()).max(1);
    let mut start = s.len().saturating_sub(keep);
    while start < s.len() && !s.is_char_boundary(start) {
        start += 1;
    }
    format!("{prefix}{}", &s[start..])
}

pub fn confirms_success(stdout: &str) -> bool {
    stdout.trim_end().ends_with(SUCCESS_SUFFIX)
}

/// Runs `program` to completion and captures its output.
///
/// The child is killed if `timeout` elapses first. A non-zero exit is not an
/// error at this level; callers classify the output themselves.
pub async fn run<I, S>(
    program: &Path,
    args: I,
    timeout: Option<Duration>,
) -> Result<CommandOutput, CommandError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let exec = program.display().to_string();
    let mut cmd = Command::new(program);
    cmd.args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let child = cmd.spawn().map_err(|source| CommandError::Spawn {
        exec: exec.clone(),
        source,
    })?;

    let waited = match timeout {
        Some(limit) => match tokio::time::timeout(limit, child.wait_with_output()).await {
            Ok(res) => res,
            Err(_) => {
                return Err(CommandError::Timeout {
                    exec,
                    timeout: limit,
                });
            }
        },
        None => child.wait_with_output().await,
    };
    let output = waited.map_err(|source| CommandError::Wait {
        exec: exec.clone(),
        source,
    })?;

    Ok(CommandOutput {
        status: output.status,
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
}

/// One instance's management script, `<toolchain_dir>/<physical_id>`.
///
/// This is the whole command contract with the toolchain: the script takes a
/// verb, and success means a zero exit plus [`SUCCESS_SUFFIX`] at the end of
/// stdout.
#[derive(Debug, Clone)]
pub struct ServerScript {
    path: PathBuf,
}

impl ServerScript {
    pub fn new(toolchain_dir: &Path, physical_id: &str) -> Self {
        Self {
            path: toolchain_dir.join(physical_id),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn invoke(
        &self,
        verb: &str,
        timeout: Option<Duration>,
    ) -> Result<CommandOutput, CommandError> {
        let out = run(&self.path, [verb], timeout).await?;
        let exec = format!("{} {verb}", self.path.display());

        if !out.status.success() {
            return Err(CommandError::Exit {
                exec,
                code: out.status.code(),
                output: out.combined(),
            });
        }
        if !confirms_success(&out.stdout) {
            return Err(CommandError::NotConfirmed {
                exec,
                output: out.combined(),
            });
        }

        tracing::debug!(%exec, "toolchain command succeeded");
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vhadmin_test_utils::FakeToolchain;

    #[test]
    fn success_suffix_ignores_trailing_newline() {
        assert!(confirms_success("[  OK  ] Starting vhserver: exited with code: 0"));
        assert!(confirms_success("Starting\n... with code: 0\n"));
        assert!(!confirms_success("Starting\n... with code: 1\n"));
        assert!(!confirms_success("with code: 0 but then more"));
        assert!(!confirms_success(""));
    }

    #[test]
    fn truncate_keeps_tail() {
        let long = format!("{}with code: 0", "x".repeat(10_000));
        let t = truncate_output(&long, 256);
        assert!(t.len() <= 256);
        assert!(t.starts_with("(truncated)"));
        assert!(t.ends_with("with code: 0"));

        assert_eq!(truncate_output("short", 256), "short");
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        let s = "é".repeat(500);
        let t = truncate_output(&s, 101);
        assert!(t.ends_with('é'));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn invoke_passes_verb_and_accepts_success_suffix() {
        let tc = FakeToolchain::new();
        tc.server_script("vhserver", r#"echo "running $1"; echo "exited with code: 0""#);

        let script = ServerScript::new(tc.root(), "vhserver");
        let out = script.invoke("start", None).await.unwrap();
        assert!(out.stdout.contains("running start"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn invoke_rejects_missing_suffix() {
        let tc = FakeToolchain::new();
        tc.server_script("vhserver", r#"echo "exited with code: 3""#);

        let err = ServerScript::new(tc.root(), "vhserver")
            .invoke("stop", None)
            .await
            .unwrap_err();
        match err {
            CommandError::NotConfirmed { exec, output } => {
                assert!(exec.ends_with("vhserver stop"));
                assert!(output.contains("with code: 3"));
            }
            other => panic!("expected NotConfirmed, got {other:?}"),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn invoke_rejects_non_zero_exit_even_with_suffix() {
        let tc = FakeToolchain::new();
        tc.server_script("vhserver", r#"echo "with code: 0"; echo "boom" >&2; exit 2"#);

        let err = ServerScript::new(tc.root(), "vhserver")
            .invoke("update", None)
            .await
            .unwrap_err();
        match err {
            CommandError::Exit { code, output, .. } => {
                assert_eq!(code, Some(2));
                assert!(output.contains("boom"));
            }
            other => panic!("expected Exit, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn invoke_reports_missing_script() {
        let tc = FakeToolchain::new();
        let err = ServerScript::new(tc.root(), "nope")
            .invoke("start", None)
            .await
            .unwrap_err();
        assert!(matches!(err, CommandError::Spawn { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn run_times_out() {
        let tc = FakeToolchain::new();
        let script = tc.server_script("slow", "sleep 5");

        let started = std::time::Instant::now();
        let err = run(&script, ["start"], Some(Duration::from_millis(200)))
            .await
            .unwrap_err();
        assert!(matches!(err, CommandError::Timeout { .. }));
        assert!(started.elapsed() < Duration::from_secs(3));
    }
}
