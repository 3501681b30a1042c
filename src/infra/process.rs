use crate::domain::CommandOutput;
use std::ffi::OsStr;
use std::io::{self, Write};
use std::path::Path;
use std::process::{Command, Output, Stdio};
use tracing::info;

/// Runs `program args...`, capturing stdout and stderr
pub fn run_captured<I, S>(program: &str, args: I) -> io::Result<CommandOutput>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let mut cmd = command(program, args);
    let output = cmd.stdin(Stdio::null()).output()?;
    Ok(to_output(output))
}

/// Like [`run_captured`] but feeds `input` on stdin (used for secrets)
pub fn run_with_stdin<I, S>(program: &str, args: I, input: &str) -> io::Result<CommandOutput>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let mut child = command(program, args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()?;

    if let Some(mut stdin) = child.stdin.take() {
        stdin.write_all(input.as_bytes())?;
    }

    Ok(to_output(child.wait_with_output()?))
}

/// Runs in `cwd` with the terminal attached; only the exit status is reported
pub fn run_inherited<I, S>(program: &str, args: I, cwd: &Path) -> io::Result<CommandOutput>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let status = command(program, args).current_dir(cwd).status()?;
    Ok(CommandOutput {
        success: status.success(),
        exit_code: status.code(),
        ..Default::default()
    })
}

/// Display form of a command line, for logs and error messages
pub fn command_line<I, S>(program: &str, args: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let mut line = program.to_string();
    for arg in args {
        line.push(' ');
        line.push_str(&arg.as_ref().to_string_lossy());
    }
    line
}

fn command<I, S>(program: &str, args: I) -> Command
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let args: Vec<_> = args
        .into_iter()
        .map(|arg| arg.as_ref().to_os_string())
        .collect();
    info!("{}", command_line(program, &args));

    let mut cmd = Command::new(program);
    cmd.args(args);
    cmd
}

fn to_output(output: Output) -> CommandOutput {
    CommandOutput {
        success: output.status.success(),
        exit_code: output.status.code(),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    }
}
