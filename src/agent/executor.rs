//! Command execution on the agent host.
//!
//! Executes a task's command and renders the reply that goes into the output
//! ledger. Failures are part of the reply, never an error for the caller:
//! whatever happened on this host is what the controller should see.

use super::shutdown::{DeferredShutdown, ShutdownHandle, StopFlag};
use std::io::{self, Read};
use std::process::{Child, Command, Stdio};
use std::sync::{Arc, Mutex, MutexGuard, mpsc};
use std::thread;
use std::time::{Duration, Instant};

/// Runs task commands and returns the reply body for the ledger.
pub trait CommandExecutor {
    fn execute(&mut self, command: &str) -> String;
}

/// Executor backed by the system shell, with a few built-in commands.
///
/// Shell commands reply with stdout and stderr interleaved as written.
///
/// Built-ins (matched after trimming whitespace):
/// - `whoami`: user, hostname and platform
/// - `pwd`: the agent's working directory
/// - `exit`: replies `Terminating...` and stops the agent after a grace delay
pub struct ShellExecutor {
    host_id: String,
    stop: StopFlag,
    shutdown_grace: Duration,
    timeout: Option<Duration>,
    pending_shutdown: Option<ShutdownHandle>,
}

impl ShellExecutor {
    pub fn new(host_id: impl Into<String>, stop: StopFlag, shutdown_grace: Duration) -> Self {
        Self {
            host_id: host_id.into(),
            stop,
            shutdown_grace,
            timeout: None,
            pending_shutdown: None,
        }
    }

    /// Kill shell commands that run longer than `timeout`.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Handle of a shutdown requested by `exit`, if any.
    pub fn take_pending_shutdown(&mut self) -> Option<ShutdownHandle> {
        self.pending_shutdown.take()
    }

    fn whoami(&self) -> String {
        let user = std::env::var("USER")
            .or_else(|_| std::env::var("USERNAME"))
            .unwrap_or_else(|_| "unknown".to_string());
        format!(
            "User: {}\nHostname: {}\nOS: {}/{}",
            user,
            self.host_id,
            std::env::consts::OS,
            std::env::consts::ARCH
        )
    }

    fn schedule_exit(&mut self) -> String {
        if self.pending_shutdown.is_none() {
            let stop = self.stop.clone();
            tracing::info!(grace_ms = self.shutdown_grace.as_millis() as u64, "exit requested");
            self.pending_shutdown = Some(DeferredShutdown::schedule(self.shutdown_grace, move || {
                stop.request()
            }));
        }
        "Terminating...".to_string()
    }
}

impl CommandExecutor for ShellExecutor {
    fn execute(&mut self, command: &str) -> String {
        let reply = match command.trim() {
            "whoami" => self.whoami(),
            "pwd" => match std::env::current_dir() {
                Ok(dir) => dir.display().to_string(),
                Err(e) => format!("Error: {}", e),
            },
            "exit" => self.schedule_exit(),
            _ => run_shell(command, self.timeout),
        };
        format!("{}{}", host_header(&self.host_id), reply)
    }
}

/// `[Host: <id>]` line that opens every reply.
pub fn host_header(host_id: &str) -> String {
    format!("[Host: {}]\n", host_id)
}

fn shell_command(command: &str) -> Command {
    if cfg!(windows) {
        let mut cmd = Command::new("cmd");
        cmd.args(["/C", command]);
        cmd
    } else {
        let mut cmd = Command::new("sh");
        cmd.args(["-c", command]);
        cmd
    }
}

/// Run `command` through the shell. Returns its combined output, or
/// `Error: <reason>\n<output>` when it could not run or exited non-zero.
fn run_shell(command: &str, timeout: Option<Duration>) -> String {
    // stdout and stderr share one pipe so the output keeps the order it was written in.
    let (reader, writer) = match io::pipe() {
        Ok(pipe) => pipe,
        Err(e) => return format!("Error: {}\n", e),
    };
    let stderr_writer = match writer.try_clone() {
        Ok(w) => w,
        Err(e) => return format!("Error: {}\n", e),
    };

    let mut cmd = shell_command(command);
    cmd.stdin(Stdio::null())
        .stdout(Stdio::from(writer))
        .stderr(Stdio::from(stderr_writer));
    let child = cmd.spawn();
    // The builder holds our copies of the write end; the reader sees EOF only
    // once they are gone.
    drop(cmd);

    let mut child = match child {
        Ok(child) => child,
        Err(e) => return format!("Error: {}\n", e),
    };

    let output = OutputBuffer::drain(reader);
    let status = wait_with_timeout(&mut child, timeout);
    let output = output.collect(DRAIN_GRACE);

    match status {
        Ok(Some(status)) if status.success() => output,
        Ok(Some(status)) => format!("Error: {}\n{}", status, output),
        Ok(None) => format!(
            "Error: timed out after {}s\n{}",
            timeout.map(|t| t.as_secs()).unwrap_or_default(),
            output
        ),
        Err(e) => format!("Error: {}\n{}", e, output),
    }
}

/// Background children can keep the pipe open after the shell is gone.
const DRAIN_GRACE: Duration = Duration::from_secs(1);

/// Output read so far from a child's pipe.
///
/// A reader thread appends each chunk as it arrives, so whatever was written
/// before a stalled pipe is still there when we stop waiting for EOF.
struct OutputBuffer {
    data: Arc<Mutex<Vec<u8>>>,
    eof: mpsc::Receiver<()>,
}

impl OutputBuffer {
    fn drain<R: Read + Send + 'static>(mut pipe: R) -> Self {
        let data = Arc::new(Mutex::new(Vec::new()));
        let (tx, eof) = mpsc::channel();
        let sink = Arc::clone(&data);

        thread::spawn(move || {
            let mut chunk = [0u8; 8192];
            loop {
                match pipe.read(&mut chunk) {
                    Ok(0) => break,
                    Ok(n) => lock_buffer(&sink).extend_from_slice(&chunk[..n]),
                    Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                    Err(_) => break,
                }
            }
            let _ = tx.send(());
        });

        Self { data, eof }
    }

    /// Wait up to `grace` for EOF, then take what has been read.
    fn collect(self, grace: Duration) -> String {
        if self.eof.recv_timeout(grace).is_err() {
            tracing::debug!("output pipe still open after command exit, keeping partial output");
        }
        let data = std::mem::take(&mut *lock_buffer(&self.data));
        String::from_utf8_lossy(&data).into_owned()
    }
}

fn lock_buffer(data: &Mutex<Vec<u8>>) -> MutexGuard<'_, Vec<u8>> {
    data.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Wait for a child process, killing it once `timeout` has elapsed.
///
/// Returns `Ok(None)` if it was killed.
fn wait_with_timeout(
    child: &mut Child,
    timeout: Option<Duration>,
) -> std::io::Result<Option<std::process::ExitStatus>> {
    let Some(timeout) = timeout else {
        return child.wait().map(Some);
    };

    let start = Instant::now();
    let poll_interval = Duration::from_millis(100);

    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        if start.elapsed() >= timeout {
            // SIGKILL on Unix, TerminateProcess on Windows.
            let _ = child.kill();
            let _ = child.wait();
            return Ok(None);
        }
        thread::sleep(poll_interval);
    }
}
