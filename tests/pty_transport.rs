//! Pseudo-terminal transport against local processes.

#![cfg(unix)]

use forticonsole::{ExpectError, Pattern, Transport, TransportBuilder};
use std::time::Duration;

const WAIT: Duration = Duration::from_secs(5);

#[tokio::test]
async fn test_echo_output_matches() {
    let mut transport = TransportBuilder::new()
        .spawn("echo FGT60E login:")
        .expect("Failed to spawn command");

    let result = transport
        .expect_any(&[Pattern::exact(" login:")], WAIT)
        .await
        .expect("Failed to find login prompt");

    assert_eq!(result.pattern_index, 0);
    assert_eq!(result.before, "FGT60E");
    transport.close().await.unwrap();
}

#[tokio::test]
async fn test_sent_line_comes_back() {
    let mut transport = TransportBuilder::new().spawn("cat").expect("Failed to spawn cat");

    transport.send(b"get system status\n").await.unwrap();
    let result = transport
        .expect_any(&[Pattern::exact("system status")], WAIT)
        .await
        .expect("cat did not echo");

    assert_eq!(result.matched, "system status");
    transport.close().await.unwrap();
}

#[tokio::test]
async fn test_list_order_decides() {
    let mut transport = TransportBuilder::new()
        .spawn("echo FGT60E login: FGT60E #")
        .expect("Failed to spawn");

    let patterns = [Pattern::exact(" #"), Pattern::exact(" login:")];
    let result = transport.expect_any(&patterns, WAIT).await.unwrap();

    assert_eq!(result.pattern_index, 0);
    assert_eq!(result.before, "FGT60E login: FGT60E");
}

#[tokio::test]
async fn test_eof_alternative() {
    let mut transport = TransportBuilder::new()
        .spawn("echo done")
        .expect("Failed to spawn");

    let patterns = [Pattern::exact("never printed"), Pattern::Eof];
    let result = transport.expect_any(&patterns, WAIT).await.unwrap();

    assert_eq!(result.pattern_index, 1);
    assert!(result.before.contains("done"));
}

#[tokio::test]
async fn test_eof_without_alternative() {
    let mut transport = TransportBuilder::new()
        .spawn("echo done")
        .expect("Failed to spawn");

    let result = transport
        .expect_any(&[Pattern::exact("never printed")], WAIT)
        .await;

    assert!(matches!(result, Err(ExpectError::Eof)));
}

#[tokio::test]
async fn test_timeout() {
    let mut transport = TransportBuilder::new()
        .spawn("sleep 10")
        .expect("Failed to spawn");

    let wait = Duration::from_millis(200);
    match transport.expect_any(&[Pattern::exact("NEVER")], wait).await {
        Err(ExpectError::Timeout { duration }) => assert_eq!(duration, wait),
        other => panic!("Expected timeout, got {other:?}"),
    }
    transport.close().await.unwrap();
}

#[tokio::test]
async fn test_close_twice_then_send() {
    let mut transport = TransportBuilder::new().spawn("cat").expect("Failed to spawn");
    assert!(transport.is_alive().unwrap());

    transport.close().await.unwrap();
    transport.close().await.unwrap();

    assert!(matches!(
        transport.send(b"exit\n").await,
        Err(ExpectError::Closed)
    ));
}

#[tokio::test]
async fn test_regex_pattern() {
    let mut transport = TransportBuilder::new()
        .spawn("echo Version: FortiGate-60E v6.2.3,build1066")
        .expect("Failed to spawn");

    let pattern = Pattern::regex(r"build\d+").expect("Invalid regex");
    let result = transport.expect_any(&[pattern], WAIT).await.unwrap();

    assert_eq!(result.matched, "build1066");
}

#[cfg(target_os = "linux")]
#[test]
fn test_drop_reaps_process() {
    let transport = TransportBuilder::new()
        .spawn("sleep 10")
        .expect("Failed to spawn");
    let pid = transport.process_id().expect("no process id");
    let proc_entry = std::path::PathBuf::from(format!("/proc/{pid}"));
    assert!(proc_entry.exists());

    drop(transport);

    // A zombie keeps its /proc entry until it is reaped.
    let deadline = std::time::Instant::now() + WAIT;
    while proc_entry.exists() && std::time::Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(20));
    }
    assert!(!proc_entry.exists(), "process {pid} was not reaped");
}
