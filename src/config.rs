//! Connection parameters, credentials and step timeouts.

use secrecy::SecretString;
use std::time::Duration;

/// Remote console server port that is wired to the device's serial line.
///
/// Logging in to this port with ssh lands directly on the device console.
#[derive(Debug, Clone)]
pub struct ConsoleServer {
    /// Console server address
    pub host: String,
    /// Console server ssh port mapped to the device
    pub port: u16,
    /// Console server login
    pub username: String,
}

impl ConsoleServer {
    /// Describe the target for log lines.
    pub fn target(&self) -> String {
        format!("{}@{}:{}", self.username, self.host, self.port)
    }
}

/// Device (FortiGate) administrator login.
#[derive(Debug, Clone)]
pub struct DeviceCredentials {
    /// Administrator username
    pub username: String,
    /// Administrator password; a freshly reset device accepts a blank one
    pub password: SecretString,
}

impl Default for DeviceCredentials {
    fn default() -> Self {
        Self {
            username: "admin".to_string(),
            password: SecretString::from(String::new()),
        }
    }
}

/// Timeouts and pauses for each kind of console step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    /// Waiting for the console server password prompt
    pub connect: Duration,
    /// Ordinary prompts and confirmations
    pub prompt: Duration,
    /// Device coming back after reboot or factory reset
    pub reboot: Duration,
    /// A single erase-disk pass
    pub erase: Duration,
    /// Device coming back after a disk format
    pub format: Duration,
    /// Boot menu banner and TFTP transfer
    pub boot_menu: Duration,
    /// Pause between sending a line and reading its result
    pub settle: Duration,
    /// Pause after `exit` before the transport is closed
    pub logout_grace: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            connect: Duration::from_secs(60),
            prompt: Duration::from_secs(30),
            reboot: Duration::from_secs(1800),
            erase: Duration::from_secs(7200),
            format: Duration::from_secs(7200),
            boot_menu: Duration::from_secs(300),
            settle: Duration::from_secs(1),
            logout_grace: Duration::from_secs(2),
        }
    }
}

impl Timeouts {
    /// Default timeouts with every pause removed.
    ///
    /// Used for replayed sessions where output is already complete.
    pub fn immediate_settle() -> Self {
        Self {
            settle: Duration::ZERO,
            logout_grace: Duration::ZERO,
            ..Self::default()
        }
    }
}

/// Reconnect policy for a console server that resets the connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Connection attempts before giving up
    pub max_attempts: u32,
    /// Base delay; attempt `n` waits `n * backoff`
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            backoff: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    /// Delay before retrying after `attempt` failures
    pub fn delay(&self, attempt: u32) -> Duration {
        self.backoff.saturating_mul(attempt)
    }
}

/// Everything a console session needs besides its transport.
#[derive(Debug, Clone)]
pub struct ConsoleConfig {
    /// Device login
    pub device: DeviceCredentials,
    /// Console server password, sent once the ssh client asks for it
    pub server_password: SecretString,
    /// Step timeouts
    pub timeouts: Timeouts,
    /// Reconnect policy
    pub retry: RetryPolicy,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            device: DeviceCredentials::default(),
            server_password: SecretString::from(String::new()),
            timeouts: Timeouts::default(),
            retry: RetryPolicy::default(),
        }
    }
}

impl ConsoleConfig {
    /// Create a configuration for the given console server password.
    pub fn new(server_password: impl Into<String>) -> Self {
        Self {
            server_password: SecretString::from(server_password.into()),
            ..Self::default()
        }
    }

    /// Set the device login.
    pub fn device(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.device = DeviceCredentials {
            username: username.into(),
            password: SecretString::from(password.into()),
        };
        self
    }

    /// Replace the step timeouts.
    pub fn timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// Replace the reconnect policy.
    pub fn retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}
