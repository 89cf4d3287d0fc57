//! Share mount transport and the `net use` implementation.

use crate::channel::Credentials;
use std::io;
use std::path::PathBuf;
use std::process::{Command, ExitStatus, Stdio};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Poll interval while waiting for a mount command.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Mounts and releases administrative shares.
///
/// `mount` returns the local path through which the share's files are
/// reachable with `std::fs`. For UNC-capable platforms that is the UNC path
/// itself.
pub trait ShareTransport: Send + Sync {
    fn mount(&self, unc: &str, credentials: &Credentials) -> io::Result<PathBuf>;

    fn unmount(&self, unc: &str) -> io::Result<()>;
}

/// A mounted share, released on [`release`](Self::release) or drop.
pub struct MountGuard {
    transport: Arc<dyn ShareTransport>,
    unc: String,
    path: PathBuf,
    released: bool,
}

impl MountGuard {
    /// Mount `unc` and tie the mount's lifetime to the returned guard.
    pub fn mount(
        transport: Arc<dyn ShareTransport>,
        unc: &str,
        credentials: &Credentials,
    ) -> io::Result<Self> {
        let path = transport.mount(unc, credentials)?;
        debug!(share = %unc, "share mounted");
        Ok(Self {
            transport,
            unc: unc.to_string(),
            path,
            released: false,
        })
    }

    /// Local path to the mounted share.
    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    pub fn unc(&self) -> &str {
        &self.unc
    }

    /// Unmount now and report the outcome.
    pub fn release(mut self) -> io::Result<()> {
        self.released = true;
        let result = self.transport.unmount(&self.unc);
        if result.is_ok() {
            debug!(share = %self.unc, "share released");
        }
        result
    }
}

impl Drop for MountGuard {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        if let Err(e) = self.transport.unmount(&self.unc) {
            warn!(share = %self.unc, error = %e, "failed to release share");
        }
    }
}

impl std::fmt::Debug for MountGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MountGuard")
            .field("unc", &self.unc)
            .field("path", &self.path)
            .field("released", &self.released)
            .finish()
    }
}

/// Share transport driving the Windows `net use` command.
#[derive(Debug, Clone)]
pub struct NetUseTransport {
    program: PathBuf,
    timeout: Duration,
}

impl NetUseTransport {
    /// Locate `net` on the PATH.
    ///
    /// Returns `NotFound` on systems without it.
    pub fn locate(timeout: Duration) -> io::Result<Self> {
        let program = which::which("net").map_err(|e| {
            io::Error::new(io::ErrorKind::NotFound, format!("net command not found: {}", e))
        })?;
        Ok(Self { program, timeout })
    }

    /// Use an explicit `net` executable.
    pub fn with_program(program: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }

    /// Run `net` with `args`, writing `input` to its standard input.
    fn run(&self, args: &[&str], input: Option<&str>) -> io::Result<()> {
        let mut child = Command::new(&self.program)
            .args(args)
            .stdin(if input.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()?;

        if let (Some(input), Some(mut stdin)) = (input, child.stdin.take()) {
            use std::io::Write;
            match write!(stdin, "{}\r\n", input) {
                Err(e) if e.kind() != io::ErrorKind::BrokenPipe => {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(e);
                }
                _ => {}
            }
        }

        let status = wait_with_deadline(&mut child, self.timeout)?;
        if status.success() {
            return Ok(());
        }

        let mut stderr = String::new();
        if let Some(mut pipe) = child.stderr.take() {
            use std::io::Read;
            let _ = pipe.read_to_string(&mut stderr);
        }
        Err(classify_net_failure(status, stderr.trim()))
    }
}

impl ShareTransport for NetUseTransport {
    /// The password never appears on the command line: `net` is given `*`
    /// and reads it from standard input.
    fn mount(&self, unc: &str, credentials: &Credentials) -> io::Result<PathBuf> {
        let user_arg = format!("/user:{}", credentials.username());
        let mut args = vec!["use", unc];
        let mut input = None;
        if !credentials.is_empty() {
            args.push("*");
            args.push(&user_arg);
            input = Some(credentials.password());
        }
        args.push("/persistent:no");
        self.run(&args, input)?;
        Ok(PathBuf::from(unc))
    }

    fn unmount(&self, unc: &str) -> io::Result<()> {
        self.run(&["use", unc, "/delete", "/y"], None)
    }
}

fn wait_with_deadline(
    child: &mut std::process::Child,
    timeout: Duration,
) -> io::Result<ExitStatus> {
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(status);
        }
        if Instant::now() >= deadline {
            let _ = child.kill();
            let _ = child.wait();
            return Err(io::Error::new(
                io::ErrorKind::TimedOut,
                format!("net use timed out after {:?}", timeout),
            ));
        }
        std::thread::sleep(POLL_INTERVAL);
    }
}

/// Map `net use` failure output to an I/O error kind.
fn classify_net_failure(status: ExitStatus, stderr: &str) -> io::Error {
    let lower = stderr.to_lowercase();
    // System error 5: access denied; 1326: logon failure; 86: bad password.
    let kind = if lower.contains("error 5 ")
        || lower.contains("error 5.")
        || lower.contains("1326")
        || lower.contains("error 86")
        || lower.contains("access is denied")
    {
        io::ErrorKind::PermissionDenied
    } else if lower.contains("error 53")
        || lower.contains("error 67")
        || lower.contains("network path was not found")
    {
        io::ErrorKind::NotFound
    } else {
        io::ErrorKind::Other
    };
    let message = if stderr.is_empty() {
        format!("net use exited with {}", status)
    } else {
        stderr.to_string()
    };
    io::Error::new(kind, message)
}
