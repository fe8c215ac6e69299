//! Transport over a spawned process attached to a pseudo-terminal

use crate::buffer::OutputBuffer;
use crate::pattern::{self, MatchOrder, Pattern};
use crate::result::{ExpectError, MatchResult};
use crate::transport::Transport;
use async_trait::async_trait;
use log::{debug, trace, warn};
use portable_pty::{Child, ChildKiller, MasterPty};
use std::io::{Read, Write};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio::sync::Mutex;
use tokio::time::Instant;

/// A running process (normally the ssh client) and its terminal.
///
/// A background thread reads the terminal and forwards chunks over a
/// channel, so a timed-out wait never loses output that arrives later.
pub struct PtyTransport {
    _master: Box<dyn MasterPty + Send>,
    child: Option<Box<dyn Child + Send + Sync>>,
    writer: Arc<Mutex<Box<dyn Write + Send>>>,
    output: UnboundedReceiver<Vec<u8>>,
    buffer: OutputBuffer,
    eof_reached: bool,
}

impl PtyTransport {
    pub(crate) fn start(
        master: Box<dyn MasterPty + Send>,
        child: Box<dyn Child + Send + Sync>,
        max_buffer_size: usize,
        strip_ansi: bool,
    ) -> Result<Self, ExpectError> {
        let reader = master
            .try_clone_reader()
            .map_err(|e| ExpectError::PtyError(e.to_string()))?;
        let writer = master
            .take_writer()
            .map_err(|e| ExpectError::PtyError(e.to_string()))?;

        let (tx, rx) = unbounded_channel();
        thread::Builder::new()
            .name("pty-reader".to_string())
            .spawn(move || read_loop(reader, tx))
            .map_err(ExpectError::IoError)?;

        Ok(Self {
            _master: master,
            child: Some(child),
            writer: Arc::new(Mutex::new(writer)),
            output: rx,
            buffer: OutputBuffer::new(max_buffer_size, strip_ansi),
            eof_reached: false,
        })
    }

    /// Operating system id of the spawned process, until it is closed.
    pub fn process_id(&self) -> Option<u32> {
        self.child.as_ref().and_then(|child| child.process_id())
    }

    /// Check if the process is still alive.
    ///
    /// # Errors
    ///
    /// Returns [`ExpectError::Closed`] once the transport has been closed.
    pub fn is_alive(&mut self) -> Result<bool, ExpectError> {
        match &mut self.child {
            Some(child) => Ok(child.try_wait()?.is_none()),
            None => Err(ExpectError::Closed),
        }
    }
}

fn read_loop(mut reader: Box<dyn Read + Send>, tx: UnboundedSender<Vec<u8>>) {
    let mut buf = [0u8; 4096];
    loop {
        match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => {
                if tx.send(buf[..n].to_vec()).is_err() {
                    break;
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                thread::sleep(Duration::from_millis(10));
            }
            Err(e) => {
                // Linux reports EIO once the child side of the pty is gone.
                debug!("pty read ended: {e}");
                break;
            }
        }
    }
    debug!("pty reader thread exiting");
}

#[async_trait]
impl Transport for PtyTransport {
    async fn send(&mut self, data: &[u8]) -> Result<(), ExpectError> {
        if self.child.is_none() {
            return Err(ExpectError::Closed);
        }

        let writer = self.writer.clone();
        let data = data.to_vec();

        tokio::task::spawn_blocking(move || {
            let mut writer = writer.blocking_lock();
            writer.write_all(&data)?;
            writer.flush()
        })
        .await
        .map_err(|e| ExpectError::IoError(std::io::Error::other(e)))??;

        Ok(())
    }

    async fn expect_ordered(
        &mut self,
        patterns: &[Pattern],
        order: MatchOrder,
        timeout: Duration,
    ) -> Result<MatchResult, ExpectError> {
        let matchers = pattern::compile_all(patterns)?;
        let eof_index = patterns.iter().position(Pattern::is_eof);
        let deadline = Instant::now() + timeout;

        loop {
            if let Some((pattern_index, m)) = self.buffer.find(&matchers, order) {
                let (before, matched) = self.buffer.consume(m);
                trace!("matched {matched:?} after {} bytes", before.len());
                return Ok(MatchResult {
                    pattern_index,
                    matched,
                    before,
                });
            }

            if self.eof_reached {
                return match eof_index {
                    Some(pattern_index) => Ok(MatchResult {
                        pattern_index,
                        matched: String::new(),
                        before: self.buffer.drain(),
                    }),
                    None => Err(ExpectError::Eof),
                };
            }

            match tokio::time::timeout_at(deadline, self.output.recv()).await {
                Ok(Some(chunk)) => self.buffer.append(&chunk),
                Ok(None) => self.eof_reached = true,
                Err(_) => return Err(ExpectError::Timeout { duration: timeout }),
            }
        }
    }

    async fn close(&mut self) -> Result<(), ExpectError> {
        let Some(mut child) = self.child.take() else {
            return Ok(());
        };

        if child.try_wait()?.is_none() {
            child.kill()?;
        }

        tokio::task::spawn_blocking(move || child.wait())
            .await
            .map_err(|e| ExpectError::IoError(std::io::Error::other(e)))??;

        Ok(())
    }
}

impl Drop for PtyTransport {
    fn drop(&mut self) {
        let Some(mut child) = self.child.take() else {
            return;
        };
        if let Err(e) = child.kill() {
            warn!("failed to kill console process on drop: {e}");
        }

        // Drop can't await; reap on a thread so the process is not left a zombie.
        let reaper = thread::Builder::new()
            .name("pty-reaper".to_string())
            .spawn(move || {
                if let Err(e) = child.wait() {
                    debug!("reaping console process: {e}");
                }
            });
        if let Err(e) = reaper {
            warn!("failed to start reaper for console process: {e}");
        }
    }
}
