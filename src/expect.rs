//! Send text and wait for one of several tagged alternatives.
//!
//! Callers describe what they are waiting for as an ordered list of
//! `(slot, pattern)` pairs, where the slot is usually a small enum. The
//! outcome names the slot that matched, so callers branch on meaning
//! instead of on list positions.

use crate::pattern::{self, MatchOrder, Pattern};
use crate::result::ConsoleError;
use crate::transport::Transport;
use log::{debug, trace};
use std::time::Duration;

/// Ordered alternatives; the first one that matches wins, unless the set
/// is switched to [`MatchOrder::StreamOrder`].
#[derive(Debug, Clone)]
pub struct Alternatives<S> {
    slots: Vec<S>,
    patterns: Vec<Pattern>,
    order: MatchOrder,
}

impl<S> Default for Alternatives<S> {
    fn default() -> Self {
        Self {
            slots: Vec::new(),
            patterns: Vec::new(),
            order: MatchOrder::ListOrder,
        }
    }
}

impl<S: Copy> Alternatives<S> {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an alternative after the existing ones.
    pub fn with(mut self, slot: S, pattern: Pattern) -> Self {
        self.slots.push(slot);
        self.patterns.push(pattern);
        self
    }

    /// Let the match that appears first in the output win instead of the
    /// first alternative in the list.
    pub fn in_stream_order(mut self) -> Self {
        self.order = MatchOrder::StreamOrder;
        self
    }

    /// Patterns in evaluation order
    pub fn patterns(&self) -> &[Pattern] {
        &self.patterns
    }

    /// How simultaneous matches are resolved
    pub fn order(&self) -> MatchOrder {
        self.order
    }

    /// Human-readable form for error messages
    pub fn describe(&self) -> String {
        pattern::describe(&self.patterns)
    }

    fn slot(&self, index: usize) -> Option<S> {
        self.slots.get(index).copied()
    }
}

/// Which alternative matched, and the text that preceded it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpectOutcome<S> {
    /// Slot of the matched alternative
    pub slot: S,
    /// Output received since the previous match
    pub before: String,
}

/// Expect engine over one transport.
pub struct Expect<T> {
    transport: T,
}

impl<T: Transport> Expect<T> {
    /// Wrap a connected transport.
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    /// Send raw text without a line terminator.
    pub async fn send(&mut self, text: &str) -> Result<(), ConsoleError> {
        trace!("send {text:?}");
        self.transport.send(text.as_bytes()).await?;
        Ok(())
    }

    /// Send text followed by a newline.
    pub async fn send_line(&mut self, line: &str) -> Result<(), ConsoleError> {
        debug!("send line {line:?}");
        self.transport.send(format!("{line}\n").as_bytes()).await?;
        Ok(())
    }

    /// Send a password followed by a newline, keeping it out of the log.
    pub async fn send_secret_line(&mut self, secret: &str) -> Result<(), ConsoleError> {
        debug!("send line <redacted>");
        self.transport.send(format!("{secret}\n").as_bytes()).await?;
        Ok(())
    }

    /// Wait until output matches one of `alternatives`.
    ///
    /// # Errors
    ///
    /// [`ConsoleError::Timeout`] naming the awaited patterns when nothing
    /// matches within `timeout`; [`ConsoleError::Transport`] when the stream
    /// ends without an EOF alternative or the transport fails.
    pub async fn await_one<S: Copy + std::fmt::Debug>(
        &mut self,
        alternatives: &Alternatives<S>,
        timeout: Duration,
    ) -> Result<ExpectOutcome<S>, ConsoleError> {
        let result = self
            .transport
            .expect_ordered(alternatives.patterns(), alternatives.order(), timeout)
            .await
            .map_err(|e| ConsoleError::from_expect(e, alternatives.describe()))?;

        let slot = alternatives.slot(result.pattern_index).ok_or_else(|| {
            ConsoleError::parse(
                "match result",
                format!("pattern index {} out of range", result.pattern_index),
            )
        })?;
        debug!("matched {slot:?} ({:?})", result.matched);

        Ok(ExpectOutcome {
            slot,
            before: result.before,
        })
    }

    /// Wait for a single pattern, returning the text before it.
    pub async fn await_pattern(
        &mut self,
        pattern: Pattern,
        timeout: Duration,
    ) -> Result<String, ConsoleError> {
        let alternatives = Alternatives::new().with((), pattern);
        Ok(self.await_one(&alternatives, timeout).await?.before)
    }

    /// Close the underlying transport.
    pub async fn close(&mut self) -> Result<(), ConsoleError> {
        self.transport.close().await?;
        Ok(())
    }

    /// Borrow the transport
    pub fn transport(&self) -> &T {
        &self.transport
    }
}
