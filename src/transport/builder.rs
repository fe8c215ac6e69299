//! Pseudo-terminal transport configuration

use crate::result::ExpectError;
use crate::transport::PtyTransport;
use portable_pty::{native_pty_system, CommandBuilder, PtySize};

/// Default maximum of unconsumed output kept between matches (in bytes).
///
/// Large enough for a full `show` of a DHCP server table.
const DEFAULT_MAX_BUFFER_SIZE: usize = 256 * 1024;

/// Default PTY rows
const DEFAULT_PTY_ROWS: u16 = 24;

/// Default PTY columns; wide so the device does not wrap long lines
const DEFAULT_PTY_COLS: u16 = 511;

/// Builder for configuring and spawning pseudo-terminal transports.
///
/// # Defaults
///
/// - Max buffer size: 256 KiB
/// - ANSI stripping: enabled
/// - PTY size: 24 rows x 511 columns
///
/// # Examples
///
/// ```no_run
/// use forticonsole::TransportBuilder;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let transport = TransportBuilder::new()
///     .max_buffer_size(16384)
///     .strip_ansi(false)
///     .spawn("cat")?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct TransportBuilder {
    max_buffer_size: usize,
    strip_ansi: bool,
    pty_size: PtySize,
}

impl Default for TransportBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TransportBuilder {
    /// Create a new builder with default configuration.
    pub fn new() -> Self {
        Self {
            max_buffer_size: DEFAULT_MAX_BUFFER_SIZE,
            strip_ansi: true,
            pty_size: PtySize {
                rows: DEFAULT_PTY_ROWS,
                cols: DEFAULT_PTY_COLS,
                pixel_width: 0,
                pixel_height: 0,
            },
        }
    }

    /// Set the maximum amount of unconsumed output, in bytes.
    ///
    /// Beyond it the oldest third is discarded.
    pub fn max_buffer_size(mut self, size: usize) -> Self {
        self.max_buffer_size = size;
        self
    }

    /// Enable or disable removal of terminal escape sequences before
    /// pattern matching.
    pub fn strip_ansi(mut self, strip: bool) -> Self {
        self.strip_ansi = strip;
        self
    }

    /// Set PTY (terminal) size.
    pub fn pty_size(mut self, rows: u16, cols: u16) -> Self {
        self.pty_size = PtySize {
            rows,
            cols,
            pixel_width: 0,
            pixel_height: 0,
        };
        self
    }

    /// Spawn a whitespace-separated command line.
    ///
    /// # Errors
    ///
    /// Returns an error if the command is empty, the PTY cannot be created
    /// or the process cannot be spawned.
    pub fn spawn(self, command: &str) -> Result<PtyTransport, ExpectError> {
        let mut parts = command.split_whitespace();
        let program = parts
            .next()
            .ok_or_else(|| ExpectError::SpawnError("Empty command".to_string()))?;

        let mut cmd = CommandBuilder::new(program);
        cmd.args(parts);
        self.spawn_command(cmd)
    }

    /// Spawn a prepared command on a fresh pseudo-terminal.
    pub fn spawn_command(self, command: CommandBuilder) -> Result<PtyTransport, ExpectError> {
        let pty_pair = native_pty_system()
            .openpty(self.pty_size)
            .map_err(|e| ExpectError::PtyError(e.to_string()))?;

        let child = pty_pair
            .slave
            .spawn_command(command)
            .map_err(|e| ExpectError::SpawnError(e.to_string()))?;

        // The child holds its own handle; keeping ours would hide EOF.
        drop(pty_pair.slave);

        PtyTransport::start(pty_pair.master, child, self.max_buffer_size, self.strip_ansi)
    }
}
