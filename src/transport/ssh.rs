//! ssh client connector for remote console servers

use crate::config::ConsoleServer;
use crate::result::ExpectError;
use crate::transport::{Connector, PtyTransport, TransportBuilder};
use async_trait::async_trait;
use log::info;
use portable_pty::CommandBuilder;

/// Opens console connections by running the system ssh client on a
/// pseudo-terminal.
///
/// Host keys of console servers are not checked: they are short-lived lab
/// equipment that gets reinstalled often.
#[derive(Debug, Clone)]
pub struct SshConnector {
    server: ConsoleServer,
    builder: TransportBuilder,
    program: String,
}

impl SshConnector {
    /// Connector for `server` using `ssh` from `PATH`.
    pub fn new(server: ConsoleServer) -> Self {
        Self {
            server,
            builder: TransportBuilder::new(),
            program: "ssh".to_string(),
        }
    }

    /// Use a different ssh client executable.
    pub fn program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    /// Replace the pseudo-terminal settings.
    pub fn transport(mut self, builder: TransportBuilder) -> Self {
        self.builder = builder;
        self
    }

    /// Console server this connector targets
    pub fn server(&self) -> &ConsoleServer {
        &self.server
    }

    /// Arguments passed to the ssh client.
    pub fn args(&self) -> Vec<String> {
        vec![
            self.server.host.clone(),
            "-o".to_string(),
            "UserKnownHostsFile=/dev/null".to_string(),
            "-o".to_string(),
            "StrictHostKeyChecking=no".to_string(),
            "-o".to_string(),
            "ConnectTimeout=60".to_string(),
            "-l".to_string(),
            self.server.username.clone(),
            "-p".to_string(),
            self.server.port.to_string(),
        ]
    }
}

#[async_trait]
impl Connector for SshConnector {
    type Transport = PtyTransport;

    async fn connect(&self) -> Result<PtyTransport, ExpectError> {
        info!("connecting to console {}", self.server.target());

        let mut cmd = CommandBuilder::new(&self.program);
        cmd.args(self.args());
        self.builder.clone().spawn_command(cmd)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn server() -> ConsoleServer {
        ConsoleServer {
            host: "rcs.lab".to_string(),
            port: 7012,
            username: "labuser".to_string(),
        }
    }

    #[test]
    fn test_args() {
        let args = SshConnector::new(server()).args();
        assert_eq!(args[0], "rcs.lab");
        assert!(args.contains(&"StrictHostKeyChecking=no".to_string()));
        assert!(args.windows(2).any(|w| w[0] == "-l" && w[1] == "labuser"));
        assert!(args.windows(2).any(|w| w[0] == "-p" && w[1] == "7012"));
    }

    #[tokio::test]
    async fn test_missing_program_is_spawn_error() {
        let connector = SshConnector::new(server()).program("/nonexistent/ssh-client");
        let result = connector.connect().await;
        assert!(matches!(result, Err(ExpectError::SpawnError(_))));
    }
}
