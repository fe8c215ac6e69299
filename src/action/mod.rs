//! Device operations driven over the console.
//!
//! Every action opens its own [`ConsoleSession`](crate::ConsoleSession),
//! runs a fixed dialog with the device and always tears the session down.
//! Failures never escape [`run`]: they are written into the transcript and
//! reported as [`Status::Failed`].

mod cli;
mod dhcp;
mod disk;
mod reboot;
mod restore;

pub use disk::{parse_disk_list, parse_erase_targets};
pub use restore::TftpParams;

use crate::config::ConsoleConfig;
use crate::expect::Expect;
use crate::pattern::Pattern;
use crate::result::{ConsoleError, UnknownAction};
use crate::session::ConsoleSession;
use crate::transcript::Transcript;
use crate::transport::{Connector, Transport};
use log::{info, warn};
use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Commands run by `cli` when none are given
pub const DEFAULT_CLI_COMMAND: &str = "get system status";

/// Confirmation question of `exec reboot`, `exec factoryreset`,
/// `exec disk format` and `purge`
pub(crate) const CONTINUE_QUESTION: &str = "Do you want to continue? (y/n)";

/// Operation to perform on the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    /// Run CLI command lines
    Cli,
    /// Reset to factory defaults
    FactoryReset,
    /// Reboot
    Reboot,
    /// Low-level erase of every disk
    EraseDisk,
    /// Format disks that have no partition
    DiskFormat,
    /// Reinstall firmware from TFTP through the boot menu
    RestoreImage,
    /// Clear DHCP server leases
    PurgeDhcp,
}

impl Action {
    /// Every action, in documentation order
    pub const ALL: [Action; 7] = [
        Action::Cli,
        Action::FactoryReset,
        Action::Reboot,
        Action::EraseDisk,
        Action::DiskFormat,
        Action::RestoreImage,
        Action::PurgeDhcp,
    ];

    /// Name used on the command line and in results
    pub fn name(self) -> &'static str {
        match self {
            Action::Cli => "cli",
            Action::FactoryReset => "factoryreset",
            Action::Reboot => "reboot",
            Action::EraseDisk => "erasedisk",
            Action::DiskFormat => "diskformat",
            Action::RestoreImage => "restoreimage",
            Action::PurgeDhcp => "purgedhcp",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Action {
    type Err = UnknownAction;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Action::ALL
            .into_iter()
            .find(|action| action.name() == s)
            .ok_or_else(|| UnknownAction(s.to_string()))
    }
}

/// An action and its command-list input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionRequest {
    /// What to do
    pub action: Action,
    /// CLI lines for `cli`, TFTP parameters for `restoreimage`; elements
    /// may hold several lines each
    pub commands: Vec<String>,
}

impl ActionRequest {
    /// Request `action` with no command input.
    pub fn new(action: Action) -> Self {
        Self {
            action,
            commands: Vec::new(),
        }
    }

    /// Add command-list elements.
    pub fn commands<I, S>(mut self, commands: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.commands.extend(commands.into_iter().map(Into::into));
        self
    }

    /// Every non-blank line of the command list, in order.
    pub fn command_lines(&self) -> Vec<&str> {
        self.commands
            .iter()
            .flat_map(|element| element.lines())
            .filter(|line| !line.trim().is_empty())
            .collect()
    }
}

/// Overall outcome of an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Completed
    Ok,
    /// Failed; the transcript holds the error
    Failed,
}

impl Status {
    /// Numeric form: 0 for ok, 1 for failed
    pub fn code(self) -> u8 {
        match self {
            Status::Ok => 0,
            Status::Failed => 1,
        }
    }
}

impl Serialize for Status {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.code())
    }
}

/// A disk reported by `exec disk list`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Disk {
    /// Disk name
    pub name: String,
    /// Reference id used by `exec disk format`
    #[serde(rename = "ref")]
    pub reference: String,
    /// Reference ids of the disk's partitions
    #[serde(rename = "partition")]
    pub partitions: Vec<String>,
}

/// What an action did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionResult {
    /// Action that was run
    pub action: Action,
    /// Ok or failed
    pub status: Status,
    /// Whether the device was modified
    pub changed: bool,
    /// Captured output of the action's own steps, plus notes and errors
    pub transcript: Transcript,
    /// Login and logout captures of every session the action opened
    pub session_log: Transcript,
    /// Disk inventory (`diskformat` only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disks: Option<Vec<Disk>>,
}

impl ActionResult {
    fn new(action: Action) -> Self {
        Self {
            action,
            status: Status::Ok,
            changed: false,
            transcript: Transcript::new(),
            session_log: Transcript::new(),
            disks: None,
        }
    }

    /// Whether the action completed
    pub fn is_ok(&self) -> bool {
        self.status == Status::Ok
    }

    /// Process exit code for this result
    pub fn exit_code(&self) -> i32 {
        i32::from(self.status.code())
    }
}

/// Run `request` against the device behind `connector`.
///
/// Never fails: errors are recorded in the returned result.
///
/// # Examples
///
/// ```no_run
/// use forticonsole::{run, Action, ActionRequest, ConsoleConfig, ConsoleServer, SshConnector};
///
/// # async fn example() {
/// let connector = SshConnector::new(ConsoleServer {
///     host: "rcs.lab".to_string(),
///     port: 7012,
///     username: "labuser".to_string(),
/// });
/// let config = ConsoleConfig::new("rcs-password").device("admin", "secret");
/// let request = ActionRequest::new(Action::Cli).commands(["get system status"]);
///
/// let result = run(&request, &connector, &config).await;
/// assert!(result.is_ok());
/// # }
/// ```
pub async fn run<C: Connector>(
    request: &ActionRequest,
    connector: &C,
    config: &ConsoleConfig,
) -> ActionResult {
    let mut result = ActionResult::new(request.action);
    info!("running {}", request.action);

    let outcome = match request.action {
        Action::Cli => cli::run(request, connector, config, &mut result).await,
        Action::Reboot => reboot::run_reboot(connector, config, &mut result).await,
        Action::FactoryReset => reboot::run_factory_reset(connector, config, &mut result).await,
        Action::EraseDisk => disk::run_erase(connector, config, &mut result).await,
        Action::DiskFormat => disk::run_format(connector, config, &mut result).await,
        Action::RestoreImage => restore::run(request, connector, config, &mut result).await,
        Action::PurgeDhcp => dhcp::run(connector, config, &mut result).await,
    };

    if let Err(e) = outcome {
        warn!("{} failed: {e}", request.action);
        result.transcript.error(&e);
        result.status = Status::Failed;
    }
    info!(
        "{} finished: status={} changed={}",
        request.action,
        result.status.code(),
        result.changed
    );
    result
}

/// Log in and enter the global context.
///
/// `config global` only prints an error on devices without VDOMs.
async fn open_global<C: Connector>(session: &mut ConsoleSession<'_, C>) -> Result<(), ConsoleError> {
    session.open().await?;
    session.run("config global").await?;
    Ok(())
}

/// Send `line`, wait for the continue question, answer `y`.
async fn confirm<T: Transport>(
    expect: &mut Expect<T>,
    line: &str,
    timeout: Duration,
    transcript: &mut Transcript,
) -> Result<(), ConsoleError> {
    expect.send_line(line).await?;
    let before = expect
        .await_pattern(Pattern::exact(CONTINUE_QUESTION), timeout)
        .await?;
    transcript.capture(&before);
    expect.send("y").await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_names_round_trip() {
        for action in Action::ALL {
            assert_eq!(action.name().parse::<Action>().unwrap(), action);
        }
        assert_eq!(
            "factory-reset".parse::<Action>(),
            Err(UnknownAction("factory-reset".to_string()))
        );
    }

    #[test]
    fn test_command_lines_flatten_and_skip_blanks() {
        let request = ActionRequest::new(Action::Cli)
            .commands(["config system global\nset hostname lab\n\nend", "  ", "get system status"]);
        assert_eq!(
            request.command_lines(),
            vec![
                "config system global",
                "set hostname lab",
                "end",
                "get system status"
            ]
        );
    }

    #[test]
    fn test_result_serialization() {
        let mut result = ActionResult::new(Action::DiskFormat);
        result.status = Status::Failed;
        result.transcript.note("boom");
        result.disks = Some(vec![Disk {
            name: "SSD".to_string(),
            reference: "16".to_string(),
            partitions: vec!["17".to_string()],
        }]);

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["action"], "diskformat");
        assert_eq!(json["status"], 1);
        assert_eq!(json["transcript"], serde_json::json!([["boom"]]));
        assert_eq!(json["disks"][0]["ref"], "16");
        assert_eq!(json["disks"][0]["partition"][0], "17");
        assert_eq!(result.exit_code(), 1);
    }

    #[test]
    fn test_disks_omitted_when_absent() {
        let json = serde_json::to_value(ActionResult::new(Action::Reboot)).unwrap();
        assert!(json.get("disks").is_none());
        assert_eq!(json["action"], "reboot");
        assert_eq!(json["status"], 0);
    }
}
