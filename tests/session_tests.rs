//! Login state machine and prompt tracking.

mod common;

use common::{config, login_chunks, prompt, ready_chunks, server_chunks, HOST};
use forticonsole::{
    derive_hostname, ConsoleError, ConsoleSession, ExpectError, PromptSlot, ScriptedConnector,
    ScriptedTransport, SessionState,
};
use proptest::prelude::*;

proptest! {
    #[test]
    fn test_hostname_from_any_prompt_line(
        prefix in "[ -~]{0,40}",
        host in "[A-Za-z0-9_-]{1,35}",
        context in proptest::option::of("[a-z]{1,12}"),
    ) {
        let suffix = context.map(|c| format!(" ({c})")).unwrap_or_default();
        let captured = format!("{prefix}\r\n\r\n{host}{suffix}");
        prop_assert_eq!(derive_hostname(&captured).unwrap(), host);
    }
}

#[tokio::test]
async fn test_open_reaches_ready() {
    let connector = ScriptedConnector::new().push(ScriptedTransport::new().outputs(login_chunks()));
    let config = config();
    let mut session = ConsoleSession::new(&connector, &config);
    assert_eq!(session.state(), SessionState::Disconnected);

    session.open().await.unwrap();

    assert_eq!(session.state(), SessionState::Ready);
    assert_eq!(session.hostname(), Some(HOST));
    assert!(session.log().contains("Welcome !"));

    let log = connector.log();
    assert_eq!(log.sent()[0], format!("{}\n", common::SERVER_PASSWORD));
    for line in ["config global", "config system console", "set output standard"] {
        assert!(log.sent_line(line));
    }

    session.disconnect().await;
    assert_eq!(log.close_count(), 1);
}

#[tokio::test]
async fn test_open_accepts_pre_login_banner() {
    let transport = ScriptedTransport::new()
        .output(server_chunks()[0].clone())
        .output("\r\nThis system is for authorized use only.\r\n(Press 'a' to accept):")
        .output(format!("a\r\n{HOST} login: "))
        .output(format!("\r\n{HOST} login: "))
        .output("admin\r\nPassword: ")
        .output(prompt(HOST))
        .output(prompt(HOST))
        .outputs(ready_chunks());
    let connector = ScriptedConnector::new().push(transport);
    let config = config();
    let mut session = ConsoleSession::new(&connector, &config);

    session.open().await.unwrap();

    assert_eq!(session.state(), SessionState::Ready);
    assert!(connector.log().sent_line("a"));
}

#[tokio::test]
async fn test_open_leaves_stale_config_context() {
    let transport = ScriptedTransport::new()
        .output(server_chunks()[0].clone())
        .output(format!("\r\n{HOST} (interface) # "))
        .output(format!("\r\n{HOST} (interface) # "))
        .output(format!("abort\r\n\r\n{HOST} (interface) # "))
        .output(format!("end\r\n\r\n{HOST} # "))
        .outputs(ready_chunks());
    let connector = ScriptedConnector::new().push(transport);
    let config = config();
    let mut session = ConsoleSession::new(&connector, &config);

    session.open().await.unwrap();

    assert_eq!(session.state(), SessionState::Ready);
    assert_eq!(session.hostname(), Some(HOST));
    let sent = connector.log().sent();
    assert!(sent.contains(&"abort\n".to_string()));
    assert!(!sent.contains(&"admin\n".to_string()));
}

#[tokio::test]
async fn test_console_closed_before_prompt() {
    let transport = ScriptedTransport::new()
        .output(server_chunks()[0].clone())
        .output("\r\nConnection to rcs.lab closed.\r\n")
        .then_eof();
    let connector = ScriptedConnector::new().push(transport);
    let config = config();
    let mut session = ConsoleSession::new(&connector, &config);

    let err = session.open().await.unwrap_err();

    assert!(matches!(err, ConsoleError::Transport(ExpectError::Eof)));
    assert_eq!(session.state(), SessionState::DeviceBannerOrLogin);
    session.logout().await;
    assert!(!connector.log().sent_line("exit"));
    assert_eq!(connector.log().close_count(), 1);
}

#[tokio::test]
async fn test_logout_after_server_password_timeout_sends_nothing() {
    let transport =
        ScriptedTransport::new().output("Warning: Permanently added 'rcs.lab' to known hosts.\r\n");
    let connector = ScriptedConnector::new().push(transport);
    let config = config();
    let mut session = ConsoleSession::new(&connector, &config);

    let err = session.open().await.unwrap_err();

    assert!(matches!(err, ConsoleError::Timeout { .. }), "{err:?}");
    assert_eq!(session.state(), SessionState::ConsoleServerAuth);
    session.logout().await;

    let log = connector.log();
    assert!(log.sent().is_empty());
    assert_eq!(log.close_count(), 1);
}

#[tokio::test]
async fn test_run_reports_lost_session() {
    let connector = ScriptedConnector::new().push(
        ScriptedTransport::new()
            .outputs(login_chunks())
            .output(format!("execute reboot\r\n\r\n{HOST} login: ")),
    );
    let config = config();
    let mut session = ConsoleSession::new(&connector, &config);
    session.open().await.unwrap();

    let err = session.run("execute reboot").await.unwrap_err();
    assert!(matches!(err, ConsoleError::SessionLost(_)));

    session.disconnect().await;
}

#[tokio::test]
async fn test_command_names_prompt() {
    let connector = ScriptedConnector::new().push(
        ScriptedTransport::new()
            .outputs(login_chunks())
            .output(format!("config system admin\r\n\r\n{HOST} (admin) # ")),
    );
    let config = config();
    let mut session = ConsoleSession::new(&connector, &config);
    session.open().await.unwrap();

    let outcome = session.command("config system admin").await.unwrap();
    assert_eq!(outcome.slot, PromptSlot::SubContext);
    assert!(outcome.before.starts_with("config system admin"));

    session.disconnect().await;
}

#[tokio::test]
async fn test_commands_need_an_open_session() {
    let connector = ScriptedConnector::new();
    let config = config();
    let mut session = ConsoleSession::new(&connector, &config);

    assert!(matches!(
        session.run("get system status").await,
        Err(ConsoleError::NotConnected)
    ));
    assert!(session.logout().await.is_empty());
    assert_eq!(connector.connects(), 0);
}
