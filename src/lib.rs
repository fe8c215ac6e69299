//! forticonsole: drive a FortiGate serial console through a remote console
//! server.
//!
//! Out-of-band console access is what is left when a device has no
//! working network configuration, or when an operation (factory reset,
//! disk erase, firmware restore) takes the network away. This crate logs
//! in over the console server's ssh port, brings the device CLI to a known
//! state and runs one of a fixed set of operations, waiting out reboots
//! on the way.
//!
//! # Layers
//!
//! - [`Transport`]: a byte channel with pattern waits ([`PtyTransport`]
//!   over the system ssh client, [`ScriptedTransport`] for replayed output)
//! - [`Expect`]: send text, wait for one of several tagged [`Alternatives`]
//! - [`ConsoleSession`]: login state machine, prompt tracking, logout
//! - [`RebootTracker`]: waits for the device to settle after reboots
//! - [`run`]: the seven [`Action`]s, each returning an [`ActionResult`]
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use forticonsole::{run, Action, ActionRequest, ConsoleConfig, ConsoleServer, SshConnector};
//!
//! #[tokio::main]
//! async fn main() {
//!     let connector = SshConnector::new(ConsoleServer {
//!         host: "10.0.0.5".to_string(),
//!         port: 7012,
//!         username: "labuser".to_string(),
//!     });
//!     let config = ConsoleConfig::new("console-server-password").device("admin", "");
//!
//!     let request = ActionRequest::new(Action::Cli)
//!         .commands(["config system global\nset hostname lab-fgt\nend"]);
//!     let result = run(&request, &connector, &config).await;
//!
//!     for block in result.transcript.blocks() {
//!         println!("{}", block.join("\n"));
//!     }
//!     std::process::exit(result.exit_code());
//! }
//! ```
//!
//! # Replaying a session
//!
//! Recorded device output can be replayed without hardware:
//!
//! ```rust
//! use forticonsole::{Pattern, ScriptedTransport, Transport};
//! use std::time::Duration;
//!
//! # tokio_test::block_on(async {
//! let mut transport = ScriptedTransport::new()
//!     .output("\r\nSystem is starting...\r\n")
//!     .output("\r\nFGT60E login: ");
//!
//! let result = transport
//!     .expect_any(&[Pattern::exact(" login: ")], Duration::from_secs(5))
//!     .await
//!     .unwrap();
//! assert!(result.before.ends_with("FGT60E"));
//! # });
//! ```

#![warn(missing_docs)]

mod action;
mod buffer;
mod config;
mod expect;
mod pattern;
mod reboot;
mod result;
mod session;
mod transcript;
mod transport;

pub use action::{
    parse_disk_list, parse_erase_targets, run, Action, ActionRequest, ActionResult, Disk, Status,
    TftpParams, DEFAULT_CLI_COMMAND,
};
pub use buffer::{strip_ansi, AnsiStripper};
pub use config::{ConsoleConfig, ConsoleServer, DeviceCredentials, RetryPolicy, Timeouts};
pub use expect::{Alternatives, Expect, ExpectOutcome};
pub use pattern::{MatchOrder, Pattern};
pub use reboot::{
    LoginAcceptance, RebootReport, RebootSignal, RebootStep, RebootTracker, RebootWait,
};
pub use result::{ConsoleError, ExpectError, MatchResult, PatternError, UnknownAction};
pub use session::{derive_hostname, ConsoleSession, PromptPatterns, PromptSlot, SessionState};
pub use transcript::Transcript;
pub use transport::{
    Connector, PtyTransport, ScriptLog, ScriptedConnector, ScriptedTransport, SshConnector,
    Transport, TransportBuilder,
};

// Re-exported so callers can build custom ssh command lines.
pub use portable_pty::CommandBuilder;
