//! Replay of canned device output.
//!
//! A [`ScriptedTransport`] plays back output chunks one at a time: a
//! chunk is only released when the current wait cannot be satisfied by
//! what is already pending, the way a device only answers once it has been
//! asked. Everything sent is recorded in a shared [`ScriptLog`].
//!
//! ```
//! use forticonsole::{Pattern, ScriptedTransport, Transport};
//! use std::time::Duration;
//!
//! # tokio_test::block_on(async {
//! let mut transport = ScriptedTransport::new()
//!     .output("\r\nFGT60E login: ");
//! let log = transport.log();
//!
//! transport.send(b"admin\n").await.unwrap();
//! let m = transport
//!     .expect_any(&[Pattern::exact(" login: ")], Duration::from_secs(1))
//!     .await
//!     .unwrap();
//! assert_eq!(m.before, "\r\nFGT60E");
//! assert_eq!(log.sent(), vec!["admin\n".to_string()]);
//! # });
//! ```

use crate::buffer::OutputBuffer;
use crate::pattern::{self, MatchOrder, Pattern};
use crate::result::{ExpectError, MatchResult};
use crate::transport::{Connector, Transport};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

const SCRIPT_BUFFER_SIZE: usize = 1024 * 1024;

#[derive(Debug, Default)]
struct LogState {
    sent: Vec<String>,
    closes: usize,
}

/// Shared record of what was sent to one or more scripted transports.
#[derive(Debug, Clone, Default)]
pub struct ScriptLog {
    state: Arc<Mutex<LogState>>,
}

impl ScriptLog {
    fn lock(&self) -> MutexGuard<'_, LogState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Everything sent, one entry per `send` call, in order
    pub fn sent(&self) -> Vec<String> {
        self.lock().sent.clone()
    }

    /// Number of `close` calls across all transports sharing this log
    pub fn close_count(&self) -> usize {
        self.lock().closes
    }

    /// Whether `line` was sent as a complete line
    pub fn sent_line(&self, line: &str) -> bool {
        let wanted = format!("{line}\n");
        self.lock().sent.iter().any(|s| *s == wanted)
    }
}

/// Transport that replays canned output.
pub struct ScriptedTransport {
    chunks: VecDeque<Vec<u8>>,
    buffer: OutputBuffer,
    log: ScriptLog,
    ends_with_eof: bool,
    eof_reached: bool,
    closed: bool,
}

impl Default for ScriptedTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedTransport {
    /// Create a transport with an empty script.
    pub fn new() -> Self {
        Self {
            chunks: VecDeque::new(),
            buffer: OutputBuffer::new(SCRIPT_BUFFER_SIZE, true),
            log: ScriptLog::default(),
            ends_with_eof: false,
            eof_reached: false,
            closed: false,
        }
    }

    /// Append one chunk of device output to the script.
    pub fn output(mut self, chunk: impl AsRef<[u8]>) -> Self {
        self.chunks.push_back(chunk.as_ref().to_vec());
        self
    }

    /// Append several chunks.
    pub fn outputs<I, S>(mut self, chunks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<[u8]>,
    {
        self.chunks
            .extend(chunks.into_iter().map(|c| c.as_ref().to_vec()));
        self
    }

    /// End the stream after the last chunk instead of timing out.
    pub fn then_eof(mut self) -> Self {
        self.ends_with_eof = true;
        self
    }

    /// Record sends into `log` instead of a private one.
    pub fn with_log(mut self, log: ScriptLog) -> Self {
        self.log = log;
        self
    }

    /// Handle on the send log
    pub fn log(&self) -> ScriptLog {
        self.log.clone()
    }

    /// Chunks not played back yet
    pub fn remaining(&self) -> usize {
        self.chunks.len()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&mut self, data: &[u8]) -> Result<(), ExpectError> {
        if self.closed {
            return Err(ExpectError::Closed);
        }
        self.log
            .lock()
            .sent
            .push(String::from_utf8_lossy(data).into_owned());
        Ok(())
    }

    async fn expect_ordered(
        &mut self,
        patterns: &[Pattern],
        order: MatchOrder,
        timeout: Duration,
    ) -> Result<MatchResult, ExpectError> {
        if self.closed {
            return Err(ExpectError::Closed);
        }
        let matchers = pattern::compile_all(patterns)?;

        loop {
            if let Some((pattern_index, m)) = self.buffer.find(&matchers, order) {
                let (before, matched) = self.buffer.consume(m);
                return Ok(MatchResult {
                    pattern_index,
                    matched,
                    before,
                });
            }

            if self.eof_reached {
                return match patterns.iter().position(Pattern::is_eof) {
                    Some(pattern_index) => Ok(MatchResult {
                        pattern_index,
                        matched: String::new(),
                        before: self.buffer.drain(),
                    }),
                    None => Err(ExpectError::Eof),
                };
            }

            match self.chunks.pop_front() {
                Some(chunk) => self.buffer.append(&chunk),
                None if self.ends_with_eof => self.eof_reached = true,
                None => return Err(ExpectError::Timeout { duration: timeout }),
            }
        }
    }

    async fn close(&mut self) -> Result<(), ExpectError> {
        self.closed = true;
        self.log.lock().closes += 1;
        Ok(())
    }
}

/// Connector handing out prepared scripted transports in order.
///
/// All transports share the connector's [`ScriptLog`].
#[derive(Default)]
pub struct ScriptedConnector {
    transports: Mutex<VecDeque<ScriptedTransport>>,
    log: ScriptLog,
    connects: AtomicUsize,
}

impl ScriptedConnector {
    /// Create a connector with no transports.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the transport returned by the next connection attempt.
    pub fn push(self, transport: ScriptedTransport) -> Self {
        let transport = transport.with_log(self.log.clone());
        self.transports
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(transport);
        self
    }

    /// Shared send log
    pub fn log(&self) -> ScriptLog {
        self.log.clone()
    }

    /// Number of connection attempts so far
    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    /// Transports not handed out yet
    pub fn pending(&self) -> usize {
        self.transports
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

#[async_trait]
impl Connector for ScriptedConnector {
    type Transport = ScriptedTransport;

    async fn connect(&self) -> Result<ScriptedTransport, ExpectError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        self.transports
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
            .ok_or_else(|| ExpectError::SpawnError("no scripted connection left".to_string()))
    }
}
