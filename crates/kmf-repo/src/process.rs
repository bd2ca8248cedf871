//! Running external command line tools

use std::path::Path;
use std::process::Stdio;

use tokio::process::Command;

use crate::error::{RepoError, Result};

/// Run `program args...`, returning stdout when it exits successfully
pub(crate) async fn run_tool(program: &Path, args: &[&str], cwd: Option<&Path>) -> Result<String> {
    let tool = program.display().to_string();
    let mut command = Command::new(program);
    command
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    if let Some(dir) = cwd {
        command.current_dir(dir);
    }

    tracing::debug!(tool = %tool, args = ?args, cwd = ?cwd, "running");

    let output = command.output().await.map_err(|e| RepoError::ToolSpawn {
        tool: tool.clone(),
        message: e.to_string(),
    })?;

    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    if output.status.success() {
        return Ok(stdout);
    }

    let stderr = String::from_utf8_lossy(&output.stderr);
    let detail = if stderr.trim().is_empty() {
        stdout.trim().to_string()
    } else {
        stderr.trim().to_string()
    };
    Err(RepoError::ToolFailed {
        tool,
        command: args.join(" "),
        code: output.status.code(),
        output: detail,
    })
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_success_returns_stdout() {
        let out = run_tool(Path::new("sh"), &["-c", "echo hello"], None)
            .await
            .unwrap();
        assert_eq!(out.trim(), "hello");
    }

    #[tokio::test]
    async fn test_working_directory() {
        let dir = tempfile::tempdir().unwrap();
        let out = run_tool(Path::new("sh"), &["-c", "pwd"], Some(dir.path()))
            .await
            .unwrap();
        let reported = std::fs::canonicalize(out.trim()).unwrap();
        assert_eq!(reported, std::fs::canonicalize(dir.path()).unwrap());
    }

    #[tokio::test]
    async fn test_failure_carries_stderr() {
        let err = run_tool(Path::new("sh"), &["-c", "echo boom >&2; exit 3"], None)
            .await
            .unwrap_err();
        match err {
            RepoError::ToolFailed { code, output, .. } => {
                assert_eq!(code, Some(3));
                assert_eq!(output, "boom");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_missing_binary() {
        let err = run_tool(Path::new("/nonexistent/kmf-tool"), &[], None)
            .await
            .unwrap_err();
        assert!(matches!(err, RepoError::ToolSpawn { .. }));
        assert!(err.is_external_tool());
    }
}
