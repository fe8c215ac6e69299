//! Waiting for a device to come back after one or more reboots.
//!
//! Some appliances reboot several times in a row after a reset or an
//! erase, and briefly show their login prompt in between. A login prompt
//! only counts as the end of the wait when no "please wait for reboot"
//! announcement is outstanding. Signals are handled in the order the device
//! printed them, even when several arrive in one read.

use crate::expect::{Alternatives, Expect};
use crate::pattern::Pattern;
use crate::result::ConsoleError;
use crate::session::{BANNER, LOGIN_PROMPT};
use crate::transcript::Transcript;
use crate::transport::Transport;
use log::{debug, info};
use std::time::{Duration, Instant};

/// Device announces another reboot is coming
pub const WAIT_FOR_REBOOT: &str = "please wait for reboot";
/// Device started booting
pub const SYSTEM_STARTING: &str = "System is starting";

/// Console output relevant to reboot tracking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RebootSignal {
    /// Pre-login banner
    Banner,
    /// Device login prompt
    Login,
    /// `System is starting`
    SystemStarting,
    /// `please wait for reboot`
    WaitForReboot,
}

/// Which prompts may end the wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginAcceptance {
    /// Login prompt or pre-login banner (reboot, erase, format)
    LoginOrBanner,
    /// Login prompt only (factory reset, image restore)
    LoginOnly,
}

/// Result of feeding one signal to [`RebootWait`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RebootStep {
    /// Keep waiting
    Continue,
    /// A login prompt appeared while another reboot was announced
    Skipped,
    /// The device is up
    Done,
}

/// The reboot-pending flag and its rules.
///
/// ```
/// use forticonsole::{RebootSignal, RebootStep, RebootWait};
///
/// let mut wait = RebootWait::new();
/// assert_eq!(wait.observe(RebootSignal::WaitForReboot), RebootStep::Continue);
/// assert_eq!(wait.observe(RebootSignal::Login), RebootStep::Skipped);
/// assert_eq!(wait.observe(RebootSignal::SystemStarting), RebootStep::Continue);
/// assert_eq!(wait.observe(RebootSignal::Login), RebootStep::Done);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RebootWait {
    reboot_pending: bool,
}

impl RebootWait {
    /// Start with no reboot announced
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a reboot was announced and the device has not started yet
    pub fn reboot_pending(&self) -> bool {
        self.reboot_pending
    }

    /// Apply one signal.
    pub fn observe(&mut self, signal: RebootSignal) -> RebootStep {
        match signal {
            RebootSignal::WaitForReboot => {
                self.reboot_pending = true;
                RebootStep::Continue
            }
            RebootSignal::SystemStarting => {
                self.reboot_pending = false;
                RebootStep::Continue
            }
            RebootSignal::Login | RebootSignal::Banner if self.reboot_pending => {
                RebootStep::Skipped
            }
            RebootSignal::Login | RebootSignal::Banner => RebootStep::Done,
        }
    }
}

/// Summary of a completed wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RebootReport {
    /// Time from start of the wait to the accepted prompt
    pub elapsed: Duration,
    /// Login prompts ignored because another reboot was announced
    pub skipped_logins: usize,
}

/// Drives the console until the device settles after rebooting.
#[derive(Debug, Clone)]
pub struct RebootTracker {
    alternatives: Alternatives<RebootSignal>,
    timeout: Duration,
}

impl RebootTracker {
    /// Tracker accepting `acceptance`, allowing `timeout` per wait.
    pub fn new(acceptance: LoginAcceptance, timeout: Duration) -> Self {
        let mut alternatives = Alternatives::new();
        if acceptance == LoginAcceptance::LoginOrBanner {
            alternatives = alternatives.with(RebootSignal::Banner, Pattern::exact(BANNER));
        }
        let alternatives = alternatives
            .with(RebootSignal::Login, Pattern::exact(LOGIN_PROMPT))
            .with(RebootSignal::SystemStarting, Pattern::exact(SYSTEM_STARTING))
            .with(RebootSignal::WaitForReboot, Pattern::exact(WAIT_FOR_REBOOT))
            .in_stream_order();

        Self {
            alternatives,
            timeout,
        }
    }

    /// Signals waited for; ties at one position go to the earlier entry
    pub fn alternatives(&self) -> &Alternatives<RebootSignal> {
        &self.alternatives
    }

    /// Wait until an accepted prompt appears, capturing every wait into
    /// `transcript`.
    ///
    /// # Errors
    ///
    /// [`ConsoleError::Timeout`] when a single wait exceeds the tracker's
    /// timeout, or any transport failure.
    pub async fn await_stable<T: Transport>(
        &self,
        expect: &mut Expect<T>,
        transcript: &mut Transcript,
    ) -> Result<RebootReport, ConsoleError> {
        let started = Instant::now();
        let mut wait = RebootWait::new();
        let mut skipped_logins = 0;

        loop {
            let outcome = expect.await_one(&self.alternatives, self.timeout).await?;
            transcript.capture(&outcome.before);

            match wait.observe(outcome.slot) {
                RebootStep::Continue => debug!("reboot signal {:?}", outcome.slot),
                RebootStep::Skipped => {
                    skipped_logins += 1;
                    info!("ignoring login prompt, device announced another reboot");
                }
                RebootStep::Done => {
                    let elapsed = started.elapsed();
                    info!("device is back after {elapsed:?}");
                    return Ok(RebootReport {
                        elapsed,
                        skipped_logins,
                    });
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::MatchOrder;
    use crate::transport::ScriptedTransport;

    #[test]
    fn test_login_done_without_announcement() {
        let mut wait = RebootWait::new();
        assert_eq!(wait.observe(RebootSignal::Login), RebootStep::Done);
    }

    #[test]
    fn test_banner_follows_flag() {
        let mut wait = RebootWait::new();
        wait.observe(RebootSignal::WaitForReboot);
        assert!(wait.reboot_pending());
        assert_eq!(wait.observe(RebootSignal::Banner), RebootStep::Skipped);
        assert!(wait.reboot_pending());
    }

    #[test]
    fn test_factory_reset_tracker_has_no_banner() {
        let tracker = RebootTracker::new(LoginAcceptance::LoginOnly, Duration::from_secs(1));
        assert_eq!(tracker.alternatives().patterns().len(), 3);
        assert!(!tracker.alternatives().describe().contains(BANNER));

        let tracker = RebootTracker::new(LoginAcceptance::LoginOrBanner, Duration::from_secs(1));
        assert_eq!(tracker.alternatives().patterns().len(), 4);
        assert_eq!(tracker.alternatives().order(), MatchOrder::StreamOrder);
    }

    #[tokio::test]
    async fn test_announcement_sharing_a_read_with_login() {
        let transport = ScriptedTransport::new()
            .output("please wait for reboot\r\n\r\nFGT60E login: ")
            .output("System is starting...\r\n")
            .output("\r\nFGT60E login: ");
        let mut expect = Expect::new(transport);
        let mut transcript = Transcript::new();
        let tracker = RebootTracker::new(LoginAcceptance::LoginOnly, Duration::from_secs(1));

        let report = tracker.await_stable(&mut expect, &mut transcript).await.unwrap();

        assert_eq!(report.skipped_logins, 1);
        assert_eq!(expect.transport().remaining(), 0);
    }

    #[tokio::test]
    async fn test_system_starting_sharing_a_read_with_login() {
        let transport = ScriptedTransport::new()
            .output("please wait for reboot\r\n")
            .output("\r\nFGT60E login: ")
            .output("System is starting...\r\nbooting...\r\nFGT60E login: ");
        let mut expect = Expect::new(transport);
        let mut transcript = Transcript::new();
        let tracker = RebootTracker::new(LoginAcceptance::LoginOrBanner, Duration::from_secs(1));

        let report = tracker.await_stable(&mut expect, &mut transcript).await.unwrap();

        assert_eq!(report.skipped_logins, 1);
        assert!(transcript.contains("booting..."));
    }
}
