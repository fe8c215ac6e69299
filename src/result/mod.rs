//! Result types for expect operations

mod error;

pub use error::{ConsoleError, ExpectError, PatternError, UnknownAction};

/// Result of a successful pattern match on a transport.
///
/// `before` holds everything received since the previous match up to the
/// start of this one, embedded newlines included. This is what ends up in
/// action transcripts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchResult {
    /// Index of the pattern that matched in the slice given to
    /// [`Transport::expect_any`](crate::Transport::expect_any).
    pub pattern_index: usize,

    /// The matched text. Empty for [`Pattern::Eof`](crate::Pattern::Eof).
    pub matched: String,

    /// Text that appeared between the previous match and this one.
    pub before: String,
}
