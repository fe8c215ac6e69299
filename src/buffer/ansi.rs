//! Terminal control sequence removal

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Text,
    Escape,
    Csi,
    Osc,
    OscEscape,
    Charset,
}

/// Escape sequence remover that keeps its position in a sequence across
/// calls, so a sequence split over two reads is still removed whole.
#[derive(Clone)]
pub struct AnsiStripper {
    state: State,
}

impl Default for AnsiStripper {
    fn default() -> Self {
        Self::new()
    }
}

impl AnsiStripper {
    /// Start outside any escape sequence
    pub fn new() -> Self {
        Self { state: State::Text }
    }

    /// Strip `data`, continuing any sequence left open by the previous call.
    pub fn strip(&mut self, data: &[u8]) -> Vec<u8> {
        let mut result = Vec::with_capacity(data.len());

        for &byte in data {
            self.state = match (self.state, byte) {
                (State::Text, 0x1b) => State::Escape,
                (State::Text, 0x00 | 0x07 | 0x08) => State::Text,
                (State::Text, _) => {
                    result.push(byte);
                    State::Text
                }
                (State::Escape, b'[') => State::Csi,
                (State::Escape, b']') => State::Osc,
                (State::Escape, b'(' | b')') => State::Charset,
                (State::Escape, _) => State::Text,
                (State::Csi, b) if b.is_ascii_alphabetic() || b == b'~' => State::Text,
                (State::Csi, _) => State::Csi,
                (State::Osc, 0x07) => State::Text,
                (State::Osc, 0x1b) => State::OscEscape,
                (State::Osc, _) => State::Osc,
                (State::OscEscape, b'\\') => State::Text,
                (State::OscEscape, _) => State::Osc,
                (State::Charset, _) => State::Text,
            };
        }

        result
    }
}

/// Remove escape sequences and stray control bytes from console output.
///
/// CSI, OSC and character-set selections are dropped, as are NUL, BEL and
/// backspace. Line breaks and tabs are preserved. This is not a terminal
/// emulator; cursor movement is discarded rather than interpreted.
pub fn strip_ansi(data: &[u8]) -> Vec<u8> {
    AnsiStripper::new().strip(data)
}
