//! Pattern matching for console output

mod matcher;

pub use matcher::{Match, Matcher};

use regex::bytes::Regex;
use std::fmt;

/// A shape of console output to wait for.
///
/// By default patterns are evaluated as an ordered list of alternatives:
/// the first pattern in the list that matches anywhere in the pending
/// output wins, regardless of where in the stream the other patterns would
/// match. See [`MatchOrder`] for the alternative.
///
/// # Examples
///
/// ```
/// use forticonsole::Pattern;
///
/// let login = Pattern::exact(" login: ");
/// let sub_context = Pattern::regex(r"FGT \(.+\) # ").unwrap();
/// let closed = Pattern::Eof;
/// ```
#[derive(Debug, Clone)]
pub enum Pattern {
    /// Literal text.
    Exact(String),

    /// Regular expression, matched on raw bytes so that partial UTF-8
    /// sequences in the terminal stream never hide a match.
    Regex(Regex),

    /// Matches once the output stream has ended.
    Eof,
}

/// How a set of alternatives picks its winner when several match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchOrder {
    /// The earliest alternative in the list wins.
    #[default]
    ListOrder,

    /// The match that starts earliest in the output wins. Ties go to the
    /// earlier alternative in the list. Use this when the alternatives are
    /// events that must be handled in the order the device printed them.
    StreamOrder,
}

impl Pattern {
    /// Create a literal pattern.
    pub fn exact(s: impl Into<String>) -> Self {
        Pattern::Exact(s.into())
    }

    /// Create a regex pattern.
    ///
    /// # Errors
    ///
    /// Returns a regex error if the pattern is invalid.
    pub fn regex(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Pattern::Regex(Regex::new(pattern)?))
    }

    /// Convert pattern to a matcher implementation.
    ///
    /// Returns `Ok(None)` for [`Pattern::Eof`], which is resolved by the
    /// transport rather than by searching output.
    pub(crate) fn to_matcher(&self) -> Result<Option<Box<dyn Matcher>>, crate::result::PatternError> {
        use matcher::{ExactMatcher, RegexMatcher};

        match self {
            Pattern::Exact(s) => Ok(Some(Box::new(ExactMatcher::new(s.as_bytes())?))),
            Pattern::Regex(r) => Ok(Some(Box::new(RegexMatcher::new(r.clone())))),
            Pattern::Eof => Ok(None),
        }
    }

    /// Whether this is the end-of-stream pattern.
    pub fn is_eof(&self) -> bool {
        matches!(self, Pattern::Eof)
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pattern::Exact(s) => write!(f, "{s:?}"),
            Pattern::Regex(r) => write!(f, "/{}/", r.as_str()),
            Pattern::Eof => f.write_str("<eof>"),
        }
    }
}

/// Compile every searchable alternative, keeping its index in `patterns`.
///
/// [`Pattern::Eof`] entries are skipped.
pub(crate) fn compile_all(
    patterns: &[Pattern],
) -> Result<Vec<(usize, Box<dyn Matcher>)>, crate::result::PatternError> {
    let mut matchers = Vec::with_capacity(patterns.len());
    for (index, pattern) in patterns.iter().enumerate() {
        if let Some(matcher) = pattern.to_matcher()? {
            matchers.push((index, matcher));
        }
    }
    Ok(matchers)
}

/// Render a list of alternatives for error messages.
pub(crate) fn describe(patterns: &[Pattern]) -> String {
    patterns
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" | ")
}
