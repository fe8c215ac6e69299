//! Byte channels to the device console.
//!
//! A [`Transport`] is one live connection: write bytes, then wait until
//! the output matches one of several patterns. A [`Connector`] creates
//! transports, once per connection attempt.

mod builder;
mod pty;
mod scripted;
mod ssh;

pub use builder::TransportBuilder;
pub use pty::PtyTransport;
pub use scripted::{ScriptLog, ScriptedConnector, ScriptedTransport};
pub use ssh::SshConnector;

use crate::pattern::{MatchOrder, Pattern};
use crate::result::{ExpectError, MatchResult};
use async_trait::async_trait;
use std::time::Duration;

/// One connection to the console, exclusively owned by a console session.
#[async_trait]
pub trait Transport: Send {
    /// Write raw bytes to the remote end.
    async fn send(&mut self, data: &[u8]) -> Result<(), ExpectError>;

    /// Block until pending output matches one of `patterns`, choosing
    /// between simultaneous matches as `order` says.
    ///
    /// Fails with [`ExpectError::Timeout`] when nothing matches within
    /// `timeout`, and with [`ExpectError::Eof`] when the stream ends and
    /// `patterns` has no [`Pattern::Eof`] alternative.
    async fn expect_ordered(
        &mut self,
        patterns: &[Pattern],
        order: MatchOrder,
        timeout: Duration,
    ) -> Result<MatchResult, ExpectError>;

    /// Block until pending output matches one of `patterns`.
    ///
    /// Alternatives are evaluated in list order: the first pattern that
    /// matches anywhere in the pending output wins.
    async fn expect_any(
        &mut self,
        patterns: &[Pattern],
        timeout: Duration,
    ) -> Result<MatchResult, ExpectError> {
        self.expect_ordered(patterns, MatchOrder::ListOrder, timeout).await
    }

    /// Tear the connection down. Calling it again is a no-op.
    async fn close(&mut self) -> Result<(), ExpectError>;
}

/// Factory for transports.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Transport produced by this connector
    type Transport: Transport;

    /// Open a fresh connection.
    async fn connect(&self) -> Result<Self::Transport, ExpectError>;
}
