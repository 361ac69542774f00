use std::io::Write;
use std::process::{Command, Stdio};

use thiserror::Error;

/// Errors raised when a command cannot be executed at all.
///
/// A command that runs and exits non-zero is NOT an error at this layer: the
/// exit status is part of [`CmdOutput`] and callers decide what a failure
/// means (many probes treat non-zero as a normal "no" answer).
#[derive(Debug, Error)]
pub enum RunError {
    /// The program could not be spawned (missing binary, permissions).
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },
    /// Writing to the child's stdin failed.
    #[error("failed to feed input to {program}: {source}")]
    Stdin {
        program: String,
        source: std::io::Error,
    },
}

/// Captured result of one external command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CmdOutput {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

impl CmdOutput {
    pub fn ok(stdout: &str) -> Self {
        CmdOutput {
            success: true,
            stdout: stdout.to_string(),
            stderr: String::new(),
        }
    }

    pub fn failed(stderr: &str) -> Self {
        CmdOutput {
            success: false,
            stdout: String::new(),
            stderr: stderr.to_string(),
        }
    }
}

/// Seam between setup logic and the privileged commands it drives.
///
/// The system implementation shells out; tests substitute a scripted fake so
/// the convergence logic can be exercised without root or the real daemons.
pub trait CommandRunner {
    fn run(&self, program: &str, args: &[&str]) -> Result<CmdOutput, RunError>;

    /// Run a command with bytes fed to its stdin (e.g. `crontab -`).
    fn run_with_input(
        &self,
        program: &str,
        args: &[&str],
        input: &str,
    ) -> Result<CmdOutput, RunError>;
}

/// Runs commands on the live host, echoing each fully resolved command line
/// to stderr before execution so a failed run is diagnosable from output
/// alone.
#[derive(Debug, Default)]
pub struct SystemRunner;

impl SystemRunner {
    fn spawn(
        &self,
        program: &str,
        args: &[&str],
        input: Option<&str>,
    ) -> Result<CmdOutput, RunError> {
        eprintln!("+ {}", render_command(program, args));

        let mut command = Command::new(program);
        command.args(args);
        command.stdout(Stdio::piped());
        command.stderr(Stdio::piped());
        if input.is_some() {
            command.stdin(Stdio::piped());
        }

        let mut child = command.spawn().map_err(|source| RunError::Spawn {
            program: program.to_string(),
            source,
        })?;

        if let Some(text) = input {
            // stdin handle exists because we requested a pipe above.
            if let Some(mut stdin) = child.stdin.take() {
                stdin
                    .write_all(text.as_bytes())
                    .map_err(|source| RunError::Stdin {
                        program: program.to_string(),
                        source,
                    })?;
            }
        }

        let output = child
            .wait_with_output()
            .map_err(|source| RunError::Spawn {
                program: program.to_string(),
                source,
            })?;

        Ok(CmdOutput {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

impl CommandRunner for SystemRunner {
    fn run(&self, program: &str, args: &[&str]) -> Result<CmdOutput, RunError> {
        self.spawn(program, args, None)
    }

    fn run_with_input(
        &self,
        program: &str,
        args: &[&str],
        input: &str,
    ) -> Result<CmdOutput, RunError> {
        self.spawn(program, args, Some(input))
    }
}

/// Render a program and arguments as a single displayable command line.
pub fn render_command(program: &str, args: &[&str]) -> String {
    if args.is_empty() {
        return program.to_string();
    }
    format!("{} {}", program, args.join(" "))
}

#[cfg(test)]
mod tests {
    use super::{render_command, CommandRunner, SystemRunner};

    #[test]
    fn renders_command_line_with_args() {
        assert_eq!(
            render_command("ip", &["addr", "flush", "dev", "eth0"]),
            "ip addr flush dev eth0"
        );
        assert_eq!(render_command("crontab", &[]), "crontab");
    }

    #[test]
    fn spawn_failure_is_run_error_not_output() {
        let runner = SystemRunner;
        let err = runner
            .run("definitely-not-a-real-binary-xyz", &[])
            .expect_err("missing binary should fail to spawn");
        assert!(err.to_string().contains("definitely-not-a-real-binary"));
    }

    #[test]
    fn captures_exit_status_and_stdout() {
        let runner = SystemRunner;
        let out = runner.run("sh", &["-c", "echo hello"]).expect("run sh");
        assert!(out.success);
        assert_eq!(out.stdout.trim(), "hello");

        let out = runner.run("sh", &["-c", "exit 3"]).expect("run sh");
        assert!(!out.success);
    }

    #[test]
    fn feeds_stdin_to_child() {
        let runner = SystemRunner;
        let out = runner
            .run_with_input("sh", &["-c", "cat"], "piped line\n")
            .expect("run cat");
        assert!(out.success);
        assert_eq!(out.stdout, "piped line\n");
    }
}
