//! CLI for running a console action against a FortiGate.
//!
//! Prints the action result as JSON and exits with its status code.

use anyhow::Context;
use clap::Parser;
use forticonsole::{
    run, Action, ActionRequest, ConsoleConfig, ConsoleServer, RetryPolicy, SshConnector, Timeouts,
};
use std::time::Duration;

#[derive(Parser)]
#[command(name = "forticonsole")]
#[command(author, version, about = "Run FortiGate console actions through a remote console server", long_about = None)]
struct Args {
    /// Remote console server address
    #[arg(long, env = "FORTICONSOLE_SERVER")]
    server: String,

    /// Console server ssh port wired to the device's console
    #[arg(long, env = "FORTICONSOLE_PORT")]
    port: u16,

    /// Console server login
    #[arg(long, env = "FORTICONSOLE_SERVER_USER")]
    server_user: String,

    /// Console server password
    #[arg(long, env = "FORTICONSOLE_SERVER_PASSWORD", hide_env_values = true)]
    server_password: String,

    /// Device administrator login
    #[arg(long, env = "FORTICONSOLE_DEVICE_USER", default_value = "admin")]
    device_user: String,

    /// Device administrator password (blank on a factory reset device)
    #[arg(
        long,
        env = "FORTICONSOLE_DEVICE_PASSWORD",
        hide_env_values = true,
        default_value = ""
    )]
    device_password: String,

    /// cli, factoryreset, reboot, erasedisk, diskformat, restoreimage or purgedhcp
    #[arg(short, long, default_value = "cli")]
    action: Action,

    /// Command lines (repeatable). For restoreimage: local ip, netmask,
    /// gateway, TFTP server ip and image file, in that order
    #[arg(short, long = "command")]
    commands: Vec<String>,

    /// ssh client executable
    #[arg(long, default_value = "ssh")]
    ssh: String,

    /// Seconds to wait for ordinary prompts
    #[arg(long, default_value_t = 30)]
    prompt_timeout: u64,

    /// Seconds to wait for the device to come back after a reboot
    #[arg(long, default_value_t = 1800)]
    reboot_timeout: u64,

    /// Seconds allowed for one disk erase or format
    #[arg(long, default_value_t = 7200)]
    disk_timeout: u64,

    /// Connection attempts when the console server resets the connection
    #[arg(long, default_value_t = 10)]
    max_attempts: u32,

    /// Pretty-print the JSON result
    #[arg(long)]
    pretty: bool,
}

impl Args {
    fn config(&self) -> ConsoleConfig {
        let timeouts = Timeouts {
            prompt: Duration::from_secs(self.prompt_timeout),
            reboot: Duration::from_secs(self.reboot_timeout),
            erase: Duration::from_secs(self.disk_timeout),
            format: Duration::from_secs(self.disk_timeout),
            ..Timeouts::default()
        };

        ConsoleConfig::new(self.server_password.clone())
            .device(self.device_user.clone(), self.device_password.clone())
            .timeouts(timeouts)
            .retry(RetryPolicy {
                max_attempts: self.max_attempts,
                ..RetryPolicy::default()
            })
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let connector = SshConnector::new(ConsoleServer {
        host: args.server.clone(),
        port: args.port,
        username: args.server_user.clone(),
    })
    .program(args.ssh.clone());

    let request = ActionRequest::new(args.action).commands(args.commands.iter().cloned());
    let result = run(&request, &connector, &args.config()).await;

    let json = if args.pretty {
        serde_json::to_string_pretty(&result)
    } else {
        serde_json::to_string(&result)
    }
    .context("serializing action result")?;
    println!("{json}");

    std::process::exit(result.exit_code());
}
