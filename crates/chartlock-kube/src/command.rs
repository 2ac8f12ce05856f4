//! Running external tools

use std::path::Path;
use std::process::Stdio;

use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// Result of one tool invocation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub success: bool,
    pub stdout: String,
    /// stdout followed by stderr
    pub combined: String,
}

/// Run `program args...`, feeding `stdin` when given, and wait for it.
///
/// Only a failure to start or talk to the process is an `Err`; a non-zero
/// exit is reported through [`CommandOutput::success`].
pub async fn run(program: &Path, args: &[String], stdin: Option<&[u8]>) -> std::io::Result<CommandOutput> {
    tracing::debug!(program = %program.display(), ?args, "running command");

    let mut child = Command::new(program)
        .args(args)
        .stdin(if stdin.is_some() { Stdio::piped() } else { Stdio::null() })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()?;

    // feed stdin while stdout and stderr drain, so a chatty child cannot fill
    // its output pipe and stall on a write nobody reads
    let pipe = child.stdin.take();
    let feed = async move {
        match (pipe, stdin) {
            (Some(mut pipe), Some(input)) => match pipe.write_all(input).await {
                // the child exited without reading everything
                Err(err) if err.kind() == std::io::ErrorKind::BrokenPipe => Ok(()),
                // dropping the pipe closes stdin
                result => result,
            },
            _ => Ok(()),
        }
    };

    let (fed, output) = tokio::join!(feed, child.wait_with_output());
    let output = output?;
    fed?;
    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    let stderr = String::from_utf8_lossy(&output.stderr);
    let combined = format!("{}{}", stdout, stderr);

    tracing::debug!(
        program = %program.display(),
        status = %output.status,
        "command finished"
    );

    Ok(CommandOutput {
        success: output.status.success(),
        stdout,
        combined,
    })
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_run_captures_output_and_status() {
        let args = vec!["-c".to_string(), "cat; echo oops >&2; exit 3".to_string()];
        let output = run(Path::new("sh"), &args, Some(b"hello\n")).await.unwrap();

        assert!(!output.success);
        assert_eq!(output.stdout, "hello\n");
        assert_eq!(output.combined, "hello\noops\n");
    }

    #[tokio::test]
    async fn test_large_input_and_output_do_not_block() {
        let input = vec![b'x'; 1 << 20];
        let args = vec!["-c".to_string(), "cat".to_string()];

        let output = tokio::time::timeout(
            std::time::Duration::from_secs(30),
            run(Path::new("sh"), &args, Some(&input)),
        )
        .await
        .expect("command stalled")
        .unwrap();

        assert!(output.success);
        assert_eq!(output.stdout.len(), input.len());
    }

    #[tokio::test]
    async fn test_missing_program_is_an_error() {
        let result = run(Path::new("/nonexistent/chartlock-tool"), &[], None).await;
        assert!(result.is_err());
    }
}
