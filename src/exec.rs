use std::ffi::OsStr;
use std::io::ErrorKind;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use anyhow::{anyhow, Context, Result};
use log::{debug, trace};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::time::timeout;

/// Run a command to completion and return its standard output.
///
/// Standard error is passed through. The child is killed once `expiry`
/// passes, and a non-zero exit status is an error.
pub async fn output<S: AsRef<OsStr>>(argv: &[S], dir: Option<&Path>, input: Option<&[u8]>, expiry: Duration) -> Result<String> {
    let (program, args) = argv.split_first().ok_or_else(|| anyhow!("empty command"))?;
    let display = describe(argv);

    let mut command = Command::new(program);
    command.args(args);
    command.stdout(Stdio::piped());
    command.stderr(Stdio::inherit());
    command.kill_on_drop(true);

    command.stdin(match input {
        Some(_) => Stdio::piped(),
        None    => Stdio::null(),
    });

    if let Some(dir) = dir {
        command.current_dir(dir);
    }

    debug!("executing {}", display);

    let mut child = command.spawn().with_context(|| {
        format!("failed to start {}", display)
    })?;

    let stdin = child.stdin.take();
    let write = async move {
        if let (Some(mut stdin), Some(input)) = (stdin, input) {
            match stdin.write_all(input).await {
                Ok(())                                      => trace!("wrote {} bytes", input.len()),
                Err(e) if e.kind() == ErrorKind::BrokenPipe => trace!("input closed early"),
                Err(e)                                      => return Err(e),
            }
        }
        Ok(())
    };

    let (written, output) = match timeout(expiry, async {
        tokio::join!(write, child.wait_with_output())
    }).await {
        Ok(result) => result,
        Err(_)     => return Err(anyhow!("{} timed out after {:?}", display, expiry)),
    };

    written.with_context(|| format!("failed to write input of {}", display))?;
    let output = output.with_context(|| format!("failed to wait for {}", display))?;

    if !output.status.success() {
        return Err(anyhow!("{} failed with {}", display, output.status));
    }

    debug!("{} produced {} bytes", display, output.stdout.len());

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

fn describe<S: AsRef<OsStr>>(argv: &[S]) -> String {
    argv.iter().map(|s| s.as_ref().to_string_lossy()).collect::<Vec<_>>().join(" ")
}
