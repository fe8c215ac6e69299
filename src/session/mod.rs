//! Console session: reach an administrator prompt on the device through
//! the console server, keep track of its prompt, and leave cleanly.

mod prompt;

pub use prompt::{
    derive_hostname, PromptPatterns, PromptSlot, BANNER, CONNECTION_RESET, HASH_PROMPT,
    LOGIN_INCORRECT, LOGIN_PROMPT, PASSWORD_PROMPT,
};

use crate::config::ConsoleConfig;
use crate::expect::{Alternatives, Expect, ExpectOutcome};
use crate::pattern::Pattern;
use crate::result::{ConsoleError, ExpectError};
use crate::transcript::Transcript;
use crate::transport::Connector;
use log::{debug, info, warn};
use secrecy::ExposeSecret;
use std::time::Duration;

/// Blank lines sent to find out what the device is showing before giving up
const CLASSIFY_ROUNDS: usize = 6;

/// Attempts to get back to the root prompt
const NORMALIZE_ROUNDS: usize = 10;

/// Commands that switch console paging off
const PAGING_OFF: [&str; 5] = [
    "config global",
    "config system console",
    "set output standard",
    "end",
    "end",
];

/// Where the login state machine currently is.
///
/// States are ordered by progress, so `state >= PromptDetected` means the
/// device shell was reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SessionState {
    /// No transport
    Disconnected,
    /// ssh client started, waiting for the console server password prompt
    ConsoleServerAuth,
    /// Waiting for the device to show a banner, login or prompt
    DeviceBannerOrLogin,
    /// Device credentials sent
    DeviceAuth,
    /// A hash prompt was seen and the hostname is known
    PromptDetected,
    /// Back at the root prompt
    Normalized,
    /// Paging is off, commands can be run
    Ready,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ServerReply {
    Password,
    Reset,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DeviceReply {
    Banner,
    Login,
    Prompt,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AuthReply {
    Prompt,
    Incorrect,
}

fn single(pattern: Pattern) -> Alternatives<()> {
    Alternatives::new().with((), pattern)
}

/// One logged-in console session on a device.
///
/// The session owns its transport. Teardown ([`logout`](Self::logout) or
/// [`disconnect`](Self::disconnect)) consumes the session, so the transport
/// is closed at most once.
///
/// # Examples
///
/// ```no_run
/// use forticonsole::{ConsoleConfig, ConsoleServer, ConsoleSession, SshConnector};
///
/// # async fn example() -> Result<(), forticonsole::ConsoleError> {
/// let connector = SshConnector::new(ConsoleServer {
///     host: "rcs.lab".to_string(),
///     port: 7012,
///     username: "labuser".to_string(),
/// });
/// let config = ConsoleConfig::new("rcs-password");
///
/// let mut session = ConsoleSession::new(&connector, &config);
/// session.open().await?;
/// let status = session.run("get system status").await?;
/// println!("{status}");
/// let _log = session.logout().await;
/// # Ok(())
/// # }
/// ```
pub struct ConsoleSession<'a, C: Connector> {
    connector: &'a C,
    config: &'a ConsoleConfig,
    expect: Option<Expect<C::Transport>>,
    prompts: Option<PromptPatterns>,
    state: SessionState,
    log: Transcript,
}

impl<'a, C: Connector> ConsoleSession<'a, C> {
    /// Create a disconnected session.
    pub fn new(connector: &'a C, config: &'a ConsoleConfig) -> Self {
        Self {
            connector,
            config,
            expect: None,
            prompts: None,
            state: SessionState::Disconnected,
            log: Transcript::new(),
        }
    }

    /// Current login state
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Hostname the prompt set was derived from, once known
    pub fn hostname(&self) -> Option<&str> {
        self.prompts.as_ref().map(PromptPatterns::hostname)
    }

    /// Prompt alternatives for the current hostname.
    pub fn prompts(&self) -> Result<&PromptPatterns, ConsoleError> {
        self.prompts.as_ref().ok_or(ConsoleError::NotConnected)
    }

    /// Login and logout captures so far
    pub fn log(&self) -> &Transcript {
        &self.log
    }

    /// Write a line into the session log.
    pub fn note(&mut self, line: impl Into<String>) {
        self.log.note(line);
    }

    /// Direct access to the expect engine, for device dialogs that are not
    /// prompt driven (confirmations, boot menu, reboot tracking).
    pub fn expect_mut(&mut self) -> Result<&mut Expect<C::Transport>, ConsoleError> {
        self.expect.as_mut().ok_or(ConsoleError::NotConnected)
    }

    /// Connect, log in and prepare the console for commands.
    ///
    /// # Errors
    ///
    /// Any failure of the login state machine. The transport, if one was
    /// opened, stays with the session and is released on teardown.
    pub async fn open(&mut self) -> Result<(), ConsoleError> {
        self.connect_console_server().await?;
        self.reach_prompt().await?;
        self.normalize().await?;
        self.paging_off().await?;
        self.state = SessionState::Ready;
        info!(
            "console ready on {}",
            self.hostname().unwrap_or("<unknown>")
        );
        Ok(())
    }

    async fn connect_console_server(&mut self) -> Result<(), ConsoleError> {
        let reply = Alternatives::new()
            .with(ServerReply::Password, Pattern::exact(PASSWORD_PROMPT))
            .with(ServerReply::Reset, Pattern::exact(CONNECTION_RESET))
            .with(ServerReply::Closed, Pattern::Eof);
        let retry = self.config.retry;
        let mut attempt = 0;

        loop {
            attempt += 1;
            let mut expect = Expect::new(self.connector.connect().await?);
            self.state = SessionState::ConsoleServerAuth;

            let outcome = expect.await_one(&reply, self.config.timeouts.connect).await;
            let outcome = match outcome {
                Ok(outcome) => outcome,
                Err(e) => {
                    self.expect = Some(expect);
                    return Err(e);
                }
            };
            self.log.capture(&outcome.before);

            if outcome.slot == ServerReply::Password {
                self.expect = Some(expect);
                break;
            }

            if let Err(e) = expect.close().await {
                debug!("closing reset connection: {e}");
            }
            if attempt >= retry.max_attempts {
                self.state = SessionState::Disconnected;
                return Err(ConsoleError::ConnectionReset { attempts: attempt });
            }
            let delay = retry.delay(attempt);
            warn!(
                "console server dropped the connection (attempt {attempt}/{}), retrying in {delay:?}",
                retry.max_attempts
            );
            tokio::time::sleep(delay).await;
        }

        let password = self.config.server_password.expose_secret().to_owned();
        self.expect_mut()?.send_secret_line(&password).await
    }

    async fn reach_prompt(&mut self) -> Result<(), ConsoleError> {
        let reply = Alternatives::new()
            .with(DeviceReply::Banner, Pattern::exact(BANNER))
            .with(DeviceReply::Login, Pattern::exact(LOGIN_PROMPT))
            .with(DeviceReply::Prompt, Pattern::exact(HASH_PROMPT))
            .with(DeviceReply::Closed, Pattern::Eof);
        let timeout = self.config.timeouts.prompt;

        for _ in 0..CLASSIFY_ROUNDS {
            self.state = SessionState::DeviceBannerOrLogin;
            let outcome = self.exchange("", &reply, timeout).await?;

            match outcome.slot {
                DeviceReply::Banner => {
                    debug!("accepting pre-login banner");
                    self.exchange("a", &single(Pattern::exact(LOGIN_PROMPT)), timeout)
                        .await?;
                }
                DeviceReply::Login => self.device_login().await?,
                DeviceReply::Prompt => {
                    self.refresh_hostname(&outcome.before)?;
                    self.state = SessionState::PromptDetected;
                    return Ok(());
                }
                DeviceReply::Closed => return Err(ConsoleError::Transport(ExpectError::Eof)),
            }
        }

        Err(ConsoleError::Stalled {
            state: "device login",
            rounds: CLASSIFY_ROUNDS,
        })
    }

    async fn device_login(&mut self) -> Result<(), ConsoleError> {
        let username = self.config.device.username.clone();
        let password = self.config.device.password.expose_secret().to_owned();
        self.state = SessionState::DeviceAuth;

        if self.try_login(&username, &password).await? == AuthReply::Prompt {
            return Ok(());
        }

        // Freshly reset devices accept the administrator with no password.
        info!("device login rejected, retrying with a blank password");
        match self.try_login(&username, "").await? {
            AuthReply::Prompt => Ok(()),
            AuthReply::Incorrect => Err(ConsoleError::Auth { user: username }),
        }
    }

    async fn try_login(&mut self, username: &str, password: &str) -> Result<AuthReply, ConsoleError> {
        let timeout = self.config.timeouts.prompt;
        let reply = Alternatives::new()
            .with(AuthReply::Prompt, Pattern::exact(HASH_PROMPT))
            .with(AuthReply::Incorrect, Pattern::exact(LOGIN_INCORRECT));

        self.exchange(username, &single(Pattern::exact(PASSWORD_PROMPT)), timeout)
            .await?;

        let expect = self.expect_mut()?;
        expect.send_secret_line(password).await?;
        let outcome = expect.await_one(&reply, timeout).await?;
        self.log.capture(&outcome.before);
        Ok(outcome.slot)
    }

    async fn normalize(&mut self) -> Result<(), ConsoleError> {
        for _ in 0..NORMALIZE_ROUNDS {
            let outcome = self.command("").await?;
            self.log.capture(&outcome.before);
            match outcome.slot {
                PromptSlot::Root => {
                    self.state = SessionState::Normalized;
                    return Ok(());
                }
                PromptSlot::SubContext => {
                    debug!("leaving configuration context left by a previous session");
                    for line in ["abort", "end"] {
                        let outcome = self.command(line).await?;
                        self.log.capture(&outcome.before);
                    }
                }
                PromptSlot::AnyHash => self.refresh_hostname(&outcome.before)?,
                PromptSlot::Login | PromptSlot::Banner => {
                    return Err(ConsoleError::SessionLost(
                        "device logged out while returning to the root prompt".to_string(),
                    ))
                }
            }
        }

        Err(ConsoleError::Stalled {
            state: "prompt normalization",
            rounds: NORMALIZE_ROUNDS,
        })
    }

    async fn paging_off(&mut self) -> Result<(), ConsoleError> {
        for line in PAGING_OFF {
            let output = self.run(line).await?;
            self.log.capture(&output);
        }
        Ok(())
    }

    /// Send `line` and capture the reply into the session log.
    async fn exchange<S: Copy + std::fmt::Debug>(
        &mut self,
        line: &str,
        alternatives: &Alternatives<S>,
        timeout: Duration,
    ) -> Result<ExpectOutcome<S>, ConsoleError> {
        let expect = self.expect_mut()?;
        expect.send_line(line).await?;
        let outcome = expect.await_one(alternatives, timeout).await?;
        self.log.capture(&outcome.before);
        Ok(outcome)
    }

    /// Wait for the next prompt of the current prompt set.
    pub async fn await_prompt(
        &mut self,
        timeout: Duration,
    ) -> Result<ExpectOutcome<PromptSlot>, ConsoleError> {
        let alternatives = self.prompts()?.alternatives().clone();
        self.expect_mut()?.await_one(&alternatives, timeout).await
    }

    /// Send a command line and wait for the next prompt.
    ///
    /// The outcome tells which prompt came back; nothing is recorded.
    pub async fn command(&mut self, line: &str) -> Result<ExpectOutcome<PromptSlot>, ConsoleError> {
        self.expect_mut()?.send_line(line).await?;
        self.await_prompt(self.config.timeouts.prompt).await
    }

    /// Run a command that must leave the device logged in, returning its
    /// output.
    ///
    /// # Errors
    ///
    /// [`ConsoleError::SessionLost`] when the login prompt or banner comes
    /// back instead of a hash prompt.
    pub async fn run(&mut self, line: &str) -> Result<String, ConsoleError> {
        let outcome = self.command(line).await?;
        match outcome.slot {
            PromptSlot::Login | PromptSlot::Banner => Err(ConsoleError::SessionLost(format!(
                "device logged out after {line:?}"
            ))),
            _ => Ok(outcome.before),
        }
    }

    /// Send text without a newline.
    pub async fn send(&mut self, text: &str) -> Result<(), ConsoleError> {
        self.expect_mut()?.send(text).await
    }

    /// Send a line without waiting for anything.
    pub async fn send_line(&mut self, line: &str) -> Result<(), ConsoleError> {
        self.expect_mut()?.send_line(line).await
    }

    /// Re-derive the prompt set from the text preceding a hash prompt.
    pub fn refresh_hostname(&mut self, captured: &str) -> Result<(), ConsoleError> {
        let hostname = derive_hostname(captured)?;
        if self.hostname() != Some(hostname.as_str()) {
            info!("device hostname is {hostname}");
            self.prompts = Some(PromptPatterns::derive(&hostname));
        }
        Ok(())
    }

    /// Return to the root prompt, log out of the device and close the
    /// connection.
    ///
    /// Never fails: problems are written into the returned session log.
    pub async fn logout(mut self) -> Transcript {
        if self.expect.is_some() {
            if let Err(e) = self.leave_device().await {
                warn!("logout failed: {e}");
                self.log.error(&e);
            }
        }
        self.disconnect().await
    }

    async fn leave_device(&mut self) -> Result<(), ConsoleError> {
        if self.state < SessionState::PromptDetected {
            debug!("never reached a device prompt in {:?}, nothing to log out of", self.state);
            return Ok(());
        }

        if self.prompts.is_some() {
            let mut rounds = 0;
            loop {
                let outcome = self.command("").await?;
                self.log.capture(&outcome.before);
                match outcome.slot {
                    PromptSlot::Root => break,
                    PromptSlot::SubContext => {
                        let outcome = self.command("abort").await?;
                        self.log.capture(&outcome.before);
                    }
                    PromptSlot::AnyHash => self.refresh_hostname(&outcome.before)?,
                    PromptSlot::Login | PromptSlot::Banner => return Ok(()),
                }
                rounds += 1;
                if rounds >= NORMALIZE_ROUNDS {
                    return Err(ConsoleError::Stalled {
                        state: "logout",
                        rounds,
                    });
                }
            }
        }

        self.send_line("exit").await?;
        tokio::time::sleep(self.config.timeouts.logout_grace).await;
        Ok(())
    }

    /// Close the connection without logging out.
    ///
    /// Used once the device has rebooted or dropped the login. Never fails.
    pub async fn disconnect(mut self) -> Transcript {
        if let Some(mut expect) = self.expect.take() {
            if let Err(e) = expect.close().await {
                warn!("closing console connection failed: {e}");
                self.log.error(&e);
            }
        }
        self.state = SessionState::Disconnected;
        self.log
    }
}
