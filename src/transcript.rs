//! Captured console text, kept for operator visibility.

use serde::Serialize;

/// Ordered list of captured text blocks.
///
/// Each block is the output of one wait (split into lines), an error
/// message, or a short note written by an action. Blocks are never
/// machine-parsed downstream.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Transcript {
    blocks: Vec<Vec<String>>,
}

impl Transcript {
    /// Create an empty transcript
    pub fn new() -> Self {
        Self::default()
    }

    /// Record captured device output as one block.
    pub fn capture(&mut self, text: &str) {
        self.blocks
            .push(text.lines().map(str::to_owned).collect());
    }

    /// Record a one-line note.
    pub fn note(&mut self, line: impl Into<String>) {
        self.blocks.push(vec![line.into()]);
    }

    /// Record an error, one block holding its message lines.
    pub fn error(&mut self, error: &dyn std::error::Error) {
        self.capture(&error.to_string());
    }

    /// Append all blocks of another transcript.
    pub fn append(&mut self, other: Transcript) {
        self.blocks.extend(other.blocks);
    }

    /// All blocks in order
    pub fn blocks(&self) -> &[Vec<String>] {
        &self.blocks
    }

    /// Number of blocks
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Whether nothing was recorded
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Whether any line of any block contains `needle`
    pub fn contains(&self, needle: &str) -> bool {
        self.blocks
            .iter()
            .flatten()
            .any(|line| line.contains(needle))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_splits_lines() {
        let mut transcript = Transcript::new();
        transcript.capture("show\r\nconfig system dhcp server\r\nend\r\n");
        assert_eq!(
            transcript.blocks(),
            &[vec![
                "show".to_string(),
                "config system dhcp server".to_string(),
                "end".to_string()
            ]]
        );
    }

    #[test]
    fn test_notes_and_append() {
        let mut first = Transcript::new();
        first.note("erase-disk starts running on SYSTEM");
        let mut second = Transcript::new();
        second.capture("");
        first.append(second);

        assert_eq!(first.len(), 2);
        assert!(first.blocks()[1].is_empty());
        assert!(first.contains("SYSTEM"));
    }

    #[test]
    fn test_serializes_as_nested_lists() {
        let mut transcript = Transcript::new();
        transcript.note("a");
        let json = serde_json::to_string(&transcript).unwrap();
        assert_eq!(json, r#"[["a"]]"#);
    }
}
