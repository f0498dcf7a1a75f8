//! Test driver for gitish integration tests.
//!
//! Spawns the binary with piped stdout and stderr, both drained by
//! background threads so a chatty child never blocks on a full pipe.

use std::io::Read;
use std::process::{Child, ChildStderr, ChildStdout, Command, Stdio};
use std::sync::{Arc, Mutex};
use std::thread;

/// A running gitish process.
pub struct TestSession {
    child: Child,
    stdout_capture: Arc<Mutex<Vec<u8>>>,
    stderr_capture: Arc<Mutex<Vec<u8>>>,
    stdout_thread: thread::JoinHandle<()>,
    stderr_thread: thread::JoinHandle<()>,
}

impl TestSession {
    /// Spawn `binary` with `args` and additional environment variables.
    pub fn spawn(binary: &str, args: &[&str], env: &[(&str, &str)]) -> std::io::Result<TestSession> {
        let mut cmd = Command::new(binary);
        cmd.args(args);
        // Keep the child's own logging out of captured stderr unless a test
        // asks for it.
        cmd.env_remove("RUST_LOG");
        for (k, v) in env {
            cmd.env(k, v);
        }
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        let mut child = cmd.spawn()?;

        let stdout_capture = Arc::new(Mutex::new(Vec::new()));
        let stdout_thread = match child.stdout.take() {
            Some(pipe) => drain(pipe, Arc::clone(&stdout_capture), "stdout"),
            None => thread::spawn(|| {}),
        };
        let stderr_capture = Arc::new(Mutex::new(Vec::new()));
        let stderr_thread = match child.stderr.take() {
            Some(pipe) => drain(pipe, Arc::clone(&stderr_capture), "stderr"),
            None => thread::spawn(|| {}),
        };

        Ok(TestSession {
            child,
            stdout_capture,
            stderr_capture,
            stdout_thread,
            stderr_thread,
        })
    }

    /// Wait for the child to exit and assert the exit code.
    pub fn wait_exit(mut self, expected_code: i32) -> SessionOutput {
        let status = self.child.wait().expect("failed to wait for child");
        let code = status.code().unwrap_or(-1);

        // Capture threads finish once the child's pipes close.
        let _ = self.stdout_thread.join();
        let _ = self.stderr_thread.join();

        let stdout = String::from_utf8_lossy(&self.stdout_capture.lock().unwrap()).to_string();
        let stderr = String::from_utf8_lossy(&self.stderr_capture.lock().unwrap()).to_string();

        assert_eq!(
            code, expected_code,
            "expected exit code {expected_code}, got {code}\nstdout:\n{stdout}\nstderr:\n{stderr}"
        );

        SessionOutput { stdout, stderr }
    }
}

trait Pipe: Read + Send + 'static {}
impl Pipe for ChildStdout {}
impl Pipe for ChildStderr {}

fn drain<P: Pipe>(mut pipe: P, capture: Arc<Mutex<Vec<u8>>>, label: &'static str) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let mut buf = [0u8; 4096];
        loop {
            match pipe.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => capture.lock().unwrap().extend_from_slice(&buf[..n]),
                Err(e) => {
                    eprintln!("{label} drain error: {e}");
                    break;
                }
            }
        }
    })
}

/// Output captured from a completed session.
pub struct SessionOutput {
    pub stdout: String,
    pub stderr: String,
}

impl SessionOutput {
    /// Non-empty stdout lines.
    pub fn lines(&self) -> Vec<&str> {
        self.stdout.lines().filter(|l| !l.is_empty()).collect()
    }
}
