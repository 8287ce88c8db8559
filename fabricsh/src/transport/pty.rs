//! Pseudo-terminal transport backed by `portable-pty`.
//!
//! PTY handles are blocking, so a reader thread forwards output into a tokio
//! channel and a writer thread drains an input channel into the master side.

use std::io::{Read, Write};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use log::{debug, trace, warn};
use portable_pty::{Child, CommandBuilder, MasterPty, PtySize, native_pty_system};
use tokio::sync::mpsc::{UnboundedReceiver, unbounded_channel};

use super::{CommandOutput, SpawnConfig, Spawner, Transport, process};
use crate::error::{Result, SessionError};

/// How long `close` waits for a killed child to be reaped.
const REAP_TIMEOUT: Duration = Duration::from_secs(2);
const REAP_POLL: Duration = Duration::from_millis(20);

/// Spawns local processes: interactive ones on a PTY, batch ones on pipes.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalSpawner;

impl LocalSpawner {
    pub fn new() -> Self {
        Self
    }
}

impl Spawner for LocalSpawner {
    type Transport = PtyTransport;

    async fn spawn(&self, config: &SpawnConfig) -> Result<PtyTransport> {
        PtyTransport::spawn(config)
    }

    async fn run(&self, config: &SpawnConfig) -> Result<CommandOutput> {
        process::run(config).await
    }
}

/// A child process attached to a pseudo-terminal.
pub struct PtyTransport {
    output: UnboundedReceiver<Vec<u8>>,
    input: Option<mpsc::Sender<Vec<u8>>>,
    child: Box<dyn Child + Send + Sync>,
    // Dropping the master hangs up the terminal.
    _master: Box<dyn MasterPty + Send>,
    program: String,
    closed: bool,
}

impl PtyTransport {
    /// Open a PTY and start `config` on its slave side.
    pub fn spawn(config: &SpawnConfig) -> Result<Self> {
        debug!("spawning {config}");

        let pair = native_pty_system()
            .openpty(PtySize {
                rows: config.terminal_height,
                cols: config.terminal_width,
                pixel_width: 0,
                pixel_height: 0,
            })
            .map_err(|e| SessionError::PtyOpenFailed {
                reason: e.to_string(),
            })?;

        let mut command = CommandBuilder::new(&config.program);
        command.args(&config.args);
        for (key, value) in &config.env {
            command.env(key, value);
        }
        if let Some(dir) = &config.working_dir {
            command.cwd(dir);
        }

        let spawn_failed = |e: &dyn std::fmt::Display| SessionError::SpawnFailed {
            program: config.program.clone(),
            reason: e.to_string(),
        };

        let child = pair
            .slave
            .spawn_command(command)
            .map_err(|e| spawn_failed(&e))?;
        // Only the child holds the slave now, so its exit reaches us as EOF.
        drop(pair.slave);

        let mut reader = pair
            .master
            .try_clone_reader()
            .map_err(|e| spawn_failed(&e))?;
        let mut writer = pair.master.take_writer().map_err(|e| spawn_failed(&e))?;

        let (output_tx, output) = unbounded_channel::<Vec<u8>>();
        let (input, input_rx) = mpsc::channel::<Vec<u8>>();

        thread::spawn(move || {
            let mut buf = [0u8; 4096];
            loop {
                match reader.read(&mut buf) {
                    Ok(0) => break,
                    Ok(n) => {
                        if output_tx.send(buf[..n].to_vec()).is_err() {
                            break;
                        }
                    }
                    Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                    // Linux reports a hung-up PTY as EIO.
                    Err(e) => {
                        trace!("PTY read ended: {e}");
                        break;
                    }
                }
            }
            debug!("PTY reader thread exiting");
        });

        thread::spawn(move || {
            while let Ok(data) = input_rx.recv() {
                if let Err(e) = writer.write_all(&data).and_then(|()| writer.flush()) {
                    warn!("PTY write failed: {e}");
                    break;
                }
            }
            debug!("PTY writer thread exiting");
        });

        Ok(Self {
            output,
            input: Some(input),
            child,
            _master: pair.master,
            program: config.program.clone(),
            closed: false,
        })
    }

    /// Process ID of the child, if still known.
    pub fn pid(&self) -> Option<u32> {
        self.child.process_id()
    }
}

impl Transport for PtyTransport {
    async fn write(&mut self, data: &[u8]) -> Result<()> {
        let input = self.input.as_ref().ok_or(SessionError::Closed)?;
        input
            .send(data.to_vec())
            .map_err(|_| SessionError::Closed)?;
        Ok(())
    }

    async fn read(&mut self) -> Result<Option<Vec<u8>>> {
        Ok(self.output.recv().await)
    }

    async fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.input = None;

        if self.child.try_wait().map_err(SessionError::Io)?.is_none() {
            debug!("killing {}", self.program);
            if let Err(e) = self.child.kill() {
                debug!("kill {} failed: {e}", self.program);
            }
        }

        let deadline = tokio::time::Instant::now() + REAP_TIMEOUT;
        loop {
            if let Some(status) = self.child.try_wait().map_err(SessionError::Io)? {
                debug!("{} exited: {status:?}", self.program);
                return Ok(());
            }
            if tokio::time::Instant::now() >= deadline {
                warn!("{} did not exit after kill", self.program);
                return Ok(());
            }
            tokio::time::sleep(REAP_POLL).await;
        }
    }
}

impl Drop for PtyTransport {
    fn drop(&mut self) {
        if !self.closed {
            let _ = self.child.kill();
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    async fn read_all(transport: &mut PtyTransport) -> String {
        let mut out = Vec::new();
        while let Some(chunk) = transport.read().await.unwrap() {
            out.extend(chunk);
        }
        String::from_utf8_lossy(&out).into_owned()
    }

    #[tokio::test]
    async fn test_pty_output_and_eof() {
        let config = SpawnConfig::new("/bin/sh", vec!["-c".into(), "echo pty-ok".into()]);
        let mut transport = PtyTransport::spawn(&config).unwrap();
        let out = tokio::time::timeout(Duration::from_secs(10), read_all(&mut transport))
            .await
            .unwrap();
        assert!(out.contains("pty-ok"));
        transport.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_pty_close_kills_child() {
        let config = SpawnConfig::new("/bin/sh", vec!["-c".into(), "sleep 30".into()]);
        let mut transport = PtyTransport::spawn(&config).unwrap();
        transport.close().await.unwrap();
        assert!(transport.write(b"x").await.is_err());
    }
}
