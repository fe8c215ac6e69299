//! Pattern matcher implementations

use crate::result::PatternError;
use memchr::memmem::Finder;
use regex::bytes::Regex;

/// Byte range of a match inside the searched slice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Match {
    /// Start position of the match
    pub start: usize,
    /// End position of the match
    pub end: usize,
}

/// Trait for pattern matching
pub trait Matcher: Send + Sync {
    /// Find the first match in the buffer
    fn find(&self, buffer: &[u8]) -> Option<Match>;
}

/// Literal matcher backed by `memchr`'s substring finder.
pub struct ExactMatcher {
    finder: Finder<'static>,
}

impl ExactMatcher {
    /// Create a new exact matcher
    pub fn new(pattern: impl Into<Vec<u8>>) -> Result<Self, PatternError> {
        let pattern = pattern.into();
        if pattern.is_empty() {
            return Err(PatternError::EmptyPattern);
        }

        Ok(Self {
            finder: Finder::new(&pattern).into_owned(),
        })
    }
}

impl Matcher for ExactMatcher {
    fn find(&self, buffer: &[u8]) -> Option<Match> {
        self.finder.find(buffer).map(|start| Match {
            start,
            end: start + self.finder.needle().len(),
        })
    }
}

/// Regex matcher
pub struct RegexMatcher {
    regex: Regex,
}

impl RegexMatcher {
    /// Create a new regex matcher
    pub fn new(regex: Regex) -> Self {
        Self { regex }
    }
}

impl Matcher for RegexMatcher {
    fn find(&self, buffer: &[u8]) -> Option<Match> {
        self.regex.find(buffer).map(|m| Match {
            start: m.start(),
            end: m.end(),
        })
    }
}
