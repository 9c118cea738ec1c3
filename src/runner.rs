//! External process execution.
//!
//! Every collaborator this crate drives (`pdftoppm`, ImageMagick, the
//! container runtime) is a blocking child process. All of them go through
//! the [`ToolRunner`] trait so the pipeline can be exercised end to end in
//! tests with a scripted runner, and so the exact command lines are
//! observable.
//!
//! The default [`SystemRunner`] captures stdout and stderr. Nothing is
//! streamed to the terminal; the captured stderr is what ends up in the
//! error message when a tool fails.

use crate::error::Slide2RomError;
use std::ffi::{OsStr, OsString};
use std::fmt;
use std::io;
use std::path::Path;
use std::process::{Command, Stdio};
use tracing::debug;

/// A single external command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    program: OsString,
    args: Vec<OsString>,
}

impl Invocation {
    pub fn new(program: impl AsRef<OsStr>) -> Self {
        Self {
            program: program.as_ref().to_os_string(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args
            .extend(args.into_iter().map(|a| a.as_ref().to_os_string()));
        self
    }

    pub fn program(&self) -> &OsStr {
        &self.program
    }

    /// File name of the program, e.g. `magick` for `/usr/bin/magick`.
    pub fn program_name(&self) -> String {
        Path::new(&self.program)
            .file_name()
            .unwrap_or(&self.program)
            .to_string_lossy()
            .into_owned()
    }

    pub fn arg_list(&self) -> &[OsString] {
        &self.args
    }

    /// Arguments as (lossy) UTF-8 strings.
    pub fn arg_strings(&self) -> Vec<String> {
        self.args
            .iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }

    pub fn to_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        cmd
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.to_string_lossy())?;
        for arg in &self.args {
            let arg = arg.to_string_lossy();
            if arg.is_empty() || arg.contains(char::is_whitespace) {
                write!(f, " {arg:?}")?;
            } else {
                write!(f, " {arg}")?;
            }
        }
        Ok(())
    }
}

/// Captured result of a finished child process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOutput {
    pub success: bool,
    /// Exit code, `None` when the process was killed by a signal.
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ToolOutput {
    pub fn ok() -> Self {
        Self {
            success: true,
            code: Some(0),
            ..Self::default()
        }
    }

    pub fn failed(code: i32, stderr: impl Into<String>) -> Self {
        Self {
            success: false,
            code: Some(code),
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    /// One-paragraph description of a failed run: the command, the exit
    /// status, and the tool's own error text.
    pub fn describe_failure(&self, invocation: &Invocation) -> String {
        let status = match self.code {
            Some(code) => format!("exit status {code}"),
            None => "terminated by signal".to_string(),
        };
        let text = if self.stderr.trim().is_empty() {
            self.stdout.trim()
        } else {
            self.stderr.trim()
        };
        if text.is_empty() {
            format!("`{invocation}` failed with {status}")
        } else {
            format!("`{invocation}` failed with {status}:\n{text}")
        }
    }
}

/// Runs external commands to completion.
///
/// Implementations must block until the process exits. `Err` is reserved
/// for failing to start the process at all; a process that ran and exited
/// non-zero is `Ok` with `success == false`.
pub trait ToolRunner: Send + Sync {
    fn run(&self, invocation: &Invocation) -> io::Result<ToolOutput>;
}

/// Runs commands on the host with [`std::process::Command`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl ToolRunner for SystemRunner {
    fn run(&self, invocation: &Invocation) -> io::Result<ToolOutput> {
        debug!("exec: {}", invocation);
        let output = invocation
            .to_command()
            .stdin(Stdio::null())
            .output()?;
        Ok(ToolOutput {
            success: output.status.success(),
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// Map a spawn failure to [`Slide2RomError::ToolNotFound`] with an install
/// hint for the tools this crate knows about.
pub(crate) fn spawn_error(invocation: &Invocation, err: io::Error) -> Slide2RomError {
    let tool = invocation.program_name();
    let hint = match tool.as_str() {
        "pdftoppm" => "Install poppler (Ubuntu: apt install poppler-utils).",
        "magick" | "convert" => "Install ImageMagick (Ubuntu: apt install imagemagick).",
        "docker" | "podman" => "Install Docker or Podman (Ubuntu: apt install docker.io).",
        "powershell" => "PowerShell is required to fix scratch directory ACLs on Windows.",
        _ => "Check that it is installed and on PATH.",
    };
    Slide2RomError::ToolNotFound {
        tool,
        hint: format!("{hint} ({err})"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_quotes_arguments_with_spaces() {
        let inv = Invocation::new("magick")
            .arg("/tmp/my slides/page-1.png")
            .args(["-scale", "320x224"]);
        assert_eq!(
            inv.to_string(),
            "magick \"/tmp/my slides/page-1.png\" -scale 320x224"
        );
    }

    #[test]
    fn program_name_strips_directories() {
        let inv = Invocation::new("/usr/local/bin/pdftoppm");
        assert_eq!(inv.program_name(), "pdftoppm");
    }

    #[test]
    fn describe_failure_prefers_stderr() {
        let inv = Invocation::new("docker").arg("run");
        let out = ToolOutput {
            success: false,
            code: Some(125),
            stdout: "noise".into(),
            stderr: "Unable to find image\n".into(),
        };
        let msg = out.describe_failure(&inv);
        assert!(msg.contains("exit status 125"), "got: {msg}");
        assert!(msg.ends_with("Unable to find image"), "got: {msg}");
    }

    #[test]
    fn spawn_error_carries_install_hint() {
        let inv = Invocation::new("pdftoppm");
        let err = spawn_error(&inv, io::Error::from(io::ErrorKind::NotFound));
        match err {
            Slide2RomError::ToolNotFound { tool, hint } => {
                assert_eq!(tool, "pdftoppm");
                assert!(hint.contains("poppler"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn system_runner_reports_exit_status() {
        let out = SystemRunner
            .run(&Invocation::new("sh").args(["-c", "echo oops >&2; exit 3"]))
            .expect("sh should start");
        assert!(!out.success);
        assert_eq!(out.code, Some(3));
        assert_eq!(out.stderr.trim(), "oops");
    }
}
