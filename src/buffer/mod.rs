//! Buffering of console output between matches

mod ansi;

pub use ansi::{strip_ansi, AnsiStripper};

use crate::pattern::{Match, MatchOrder, Matcher};
use bytes::{Buf, BytesMut};

/// When the pending output outgrows its limit, the oldest
/// `1 / DISCARD_RATIO` of it is dropped.
const DISCARD_RATIO: usize = 3;

/// Output received from the device that no pattern has consumed yet.
///
/// Each successful match consumes everything up to the end of the match,
/// so the text returned as `before` is always what arrived since the
/// previous match.
pub struct OutputBuffer {
    pending: BytesMut,
    max_size: usize,
    stripper: Option<AnsiStripper>,
}

impl OutputBuffer {
    /// Create a new output buffer
    pub fn new(max_size: usize, strip_ansi: bool) -> Self {
        Self {
            pending: BytesMut::with_capacity(max_size.min(64 * 1024)),
            max_size: max_size.max(DISCARD_RATIO),
            stripper: strip_ansi.then(AnsiStripper::new),
        }
    }

    /// Append freshly read output
    pub fn append(&mut self, data: &[u8]) {
        match &mut self.stripper {
            Some(stripper) => self.pending.extend_from_slice(&stripper.strip(data)),
            None => self.pending.extend_from_slice(data),
        }

        if self.pending.len() > self.max_size {
            let excess = self.pending.len() - self.max_size;
            let discard = excess.max(self.max_size / DISCARD_RATIO);
            log::debug!("output buffer over {} bytes, discarding {discard}", self.max_size);
            self.pending.advance(discard);
        }
    }

    /// Pending output not consumed by any match
    pub fn pending(&self) -> &[u8] {
        &self.pending
    }

    /// Number of pending bytes
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Whether nothing is pending
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Search pending output with each matcher in order; the first matcher
    /// that finds anything wins.
    pub fn find_first(&self, matchers: &[(usize, Box<dyn Matcher>)]) -> Option<(usize, Match)> {
        matchers
            .iter()
            .find_map(|(index, matcher)| matcher.find(&self.pending).map(|m| (*index, m)))
    }

    /// Search pending output with every matcher and keep the match that
    /// starts earliest. On a tie the earlier matcher wins.
    pub fn find_earliest(
        &self,
        matchers: &[(usize, Box<dyn Matcher>)],
    ) -> Option<(usize, Match)> {
        matchers
            .iter()
            .filter_map(|(index, matcher)| matcher.find(&self.pending).map(|m| (*index, m)))
            .min_by_key(|(_, m)| m.start)
    }

    /// Search pending output the way `order` asks.
    pub fn find(
        &self,
        matchers: &[(usize, Box<dyn Matcher>)],
        order: MatchOrder,
    ) -> Option<(usize, Match)> {
        match order {
            MatchOrder::ListOrder => self.find_first(matchers),
            MatchOrder::StreamOrder => self.find_earliest(matchers),
        }
    }

    /// Consume output up to the end of `m`, returning the text before the
    /// match and the matched text.
    pub fn consume(&mut self, m: Match) -> (String, String) {
        let consumed = self.pending.split_to(m.end.min(self.pending.len()));
        let start = m.start.min(consumed.len());
        let before = String::from_utf8_lossy(&consumed[..start]).into_owned();
        let matched = String::from_utf8_lossy(&consumed[start..]).into_owned();
        (before, matched)
    }

    /// Consume everything still pending.
    pub fn drain(&mut self) -> String {
        let rest = self.pending.split();
        String::from_utf8_lossy(&rest).into_owned()
    }
}
