//! Canned FortiGate console output shared by the integration tests.

#![allow(dead_code)]

use forticonsole::{ConsoleConfig, RetryPolicy, ScriptedTransport, Timeouts};
use std::time::Duration;

pub const HOST: &str = "FGT60E";
pub const SERVER_PASSWORD: &str = "rcs-secret";
pub const DEVICE_PASSWORD: &str = "fgt-secret";

pub fn config() -> ConsoleConfig {
    ConsoleConfig::new(SERVER_PASSWORD)
        .device("admin", DEVICE_PASSWORD)
        .timeouts(Timeouts::immediate_settle())
        .retry(RetryPolicy {
            max_attempts: 3,
            backoff: Duration::ZERO,
        })
}

pub fn prompt(host: &str) -> String {
    format!("\r\n{host} # ")
}

/// Console server password prompt up to the device login prompt.
pub fn server_chunks() -> Vec<String> {
    vec![
        "Warning: Permanently added '[rcs.lab]:7012' (ECDSA) to the list of known hosts.\r\n\
         labuser@rcs.lab's password: "
            .to_string(),
        format!("\r\n{HOST} login: "),
    ]
}

/// Normalization and paging-off replies, once the hostname is known.
pub fn ready_chunks() -> Vec<String> {
    vec![
        prompt(HOST),
        format!("config global\r\nCommand fail. Return code -61\r\n\r\n{HOST} # "),
        format!("config system console\r\n\r\n{HOST} (console) # "),
        format!("set output standard\r\n\r\n{HOST} (console) # "),
        format!("end\r\n\r\n{HOST} # "),
        format!("end\r\n\r\n{HOST} # "),
    ]
}

/// A complete successful login with the configured password.
pub fn login_chunks() -> Vec<String> {
    let mut chunks = server_chunks();
    chunks.push("admin\r\nPassword: ".to_string());
    chunks.push(format!("\r\nWelcome !\r\n\r\n{HOST} # "));
    chunks.push(prompt(HOST));
    chunks.extend(ready_chunks());
    chunks
}

/// Reply to `config global` sent by device actions.
pub fn config_global_chunk() -> String {
    format!("config global\r\nCommand fail. Return code -61\r\n\r\n{HOST} # ")
}

/// Transport that logs in and then plays `rest`.
pub fn logged_in<I, S>(rest: I) -> ScriptedTransport
where
    I: IntoIterator<Item = S>,
    S: AsRef<[u8]>,
{
    ScriptedTransport::new().outputs(login_chunks()).outputs(rest)
}

/// Position of `needle` in `sent` at or after `from`.
pub fn position_after(sent: &[String], from: usize, needle: &str) -> Option<usize> {
    sent.iter()
        .skip(from)
        .position(|s| s == needle)
        .map(|p| p + from)
}
