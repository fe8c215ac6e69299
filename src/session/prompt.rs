//! Console prompt shapes of a FortiGate device.

use crate::expect::Alternatives;
use crate::pattern::Pattern;
use crate::result::ConsoleError;

/// Any administrator prompt ends like this
pub const HASH_PROMPT: &str = " # ";
/// Login prompt, preceded by the hostname
pub const LOGIN_PROMPT: &str = " login: ";
/// Pre-login disclaimer banner ("Press 'a' to accept")
pub const BANNER: &str = "to accept";
/// Password prompt of both the console server and the device
pub const PASSWORD_PROMPT: &str = "assword: ";
/// Device rejected the credentials
pub const LOGIN_INCORRECT: &str = "Login incorrect";
/// Console server dropped the ssh connection
pub const CONNECTION_RESET: &str = "Connection reset by peer";

/// Meaning of a matched prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PromptSlot {
    /// `<hostname> # `: root context, ready for commands
    Root,
    /// `<hostname> (<context>) # `: inside a configuration block
    SubContext,
    /// Any `... # ` prompt; the hostname is not the one expected
    AnyHash,
    /// Device login prompt; the session was logged out
    Login,
    /// Pre-login banner
    Banner,
}

/// Prompt alternatives for one known hostname.
///
/// Order matters: the specific prompts are listed before the generic hash
/// prompt, which would otherwise match every prompt.
///
/// ```
/// use forticonsole::{PromptPatterns, PromptSlot};
///
/// let prompts = PromptPatterns::derive("FGT60E");
/// assert_eq!(prompts.hostname(), "FGT60E");
/// assert_eq!(prompts.alternatives().patterns().len(), 5);
/// ```
#[derive(Debug, Clone)]
pub struct PromptPatterns {
    hostname: String,
    alternatives: Alternatives<PromptSlot>,
}

impl PromptPatterns {
    /// Build the prompt set for `hostname`.
    pub fn derive(hostname: &str) -> Self {
        let root = format!("{hostname}{HASH_PROMPT}");
        let sub_context = format!(r"{} \(.+\) # ", regex::escape(hostname));

        let alternatives = Alternatives::new()
            .with(PromptSlot::Root, Pattern::exact(root))
            .with(PromptSlot::SubContext, sub_context_pattern(&sub_context))
            .with(PromptSlot::AnyHash, Pattern::exact(HASH_PROMPT))
            .with(PromptSlot::Login, Pattern::exact(LOGIN_PROMPT))
            .with(PromptSlot::Banner, Pattern::exact(BANNER));

        Self {
            hostname: hostname.to_string(),
            alternatives,
        }
    }

    /// Hostname the set was derived from
    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    /// Alternatives in evaluation order
    pub fn alternatives(&self) -> &Alternatives<PromptSlot> {
        &self.alternatives
    }
}

fn sub_context_pattern(source: &str) -> Pattern {
    // The hostname is escaped, so the expression is always valid.
    match Pattern::regex(source) {
        Ok(pattern) => pattern,
        Err(_) => Pattern::exact(source),
    }
}

/// Extract the hostname from the text preceding a ` # ` prompt.
///
/// The hostname is the first whitespace-delimited token of the last line.
///
/// # Errors
///
/// [`ConsoleError::Parse`] when the last line has no token.
pub fn derive_hostname(captured: &str) -> Result<String, ConsoleError> {
    let last_line = captured
        .split(['\n', '\r'])
        .next_back()
        .unwrap_or_default();

    last_line
        .split_whitespace()
        .next()
        .map(str::to_owned)
        .ok_or_else(|| ConsoleError::parse("hostname", format!("no token in {captured:?}")))
}
