//! Property tests for reboot tracking.

use forticonsole::{
    ConsoleError, Expect, LoginAcceptance, RebootSignal, RebootStep, RebootTracker, RebootWait,
    ScriptedTransport, Transcript,
};
use proptest::prelude::*;
use std::time::Duration;

fn signal() -> impl Strategy<Value = RebootSignal> {
    prop::sample::select(vec![
        RebootSignal::Banner,
        RebootSignal::Login,
        RebootSignal::SystemStarting,
        RebootSignal::WaitForReboot,
    ])
}

fn acceptance() -> impl Strategy<Value = LoginAcceptance> {
    prop::sample::select(vec![
        LoginAcceptance::LoginOrBanner,
        LoginAcceptance::LoginOnly,
    ])
}

fn console_text(signal: RebootSignal) -> &'static str {
    match signal {
        RebootSignal::Banner => "(Press 'a' to accept):",
        RebootSignal::Login => "\r\nFGT60E login: ",
        RebootSignal::SystemStarting => "System is starting...\r\n",
        RebootSignal::WaitForReboot => "please wait for reboot\r\n",
    }
}

/// Chunks consumed and logins skipped before the wait ends, if it does.
fn expected_end(signals: &[RebootSignal], acceptance: LoginAcceptance) -> Option<(usize, usize)> {
    let mut pending = false;
    let mut skipped = 0;
    for (i, signal) in signals.iter().enumerate() {
        match signal {
            RebootSignal::WaitForReboot => pending = true,
            RebootSignal::SystemStarting => pending = false,
            RebootSignal::Banner if acceptance == LoginAcceptance::LoginOnly => {}
            RebootSignal::Login | RebootSignal::Banner if pending => skipped += 1,
            RebootSignal::Login | RebootSignal::Banner => return Some((i + 1, skipped)),
        }
    }
    None
}

/// Pack signals into reads: a signal flagged `true` shares the previous
/// signal's read. Returns the reads and the read index of every signal.
fn pack(signals: &[(RebootSignal, bool)]) -> (Vec<String>, Vec<usize>) {
    let mut chunks: Vec<String> = Vec::new();
    let mut chunk_of = Vec::with_capacity(signals.len());
    for (signal, joined) in signals {
        match chunks.last_mut() {
            Some(last) if *joined => last.push_str(console_text(*signal)),
            _ => chunks.push(console_text(*signal).to_string()),
        }
        chunk_of.push(chunks.len() - 1);
    }
    (chunks, chunk_of)
}

proptest! {
    #[test]
    fn test_wait_matches_pending_flag_model(signals in prop::collection::vec(signal(), 0..40)) {
        let mut wait = RebootWait::new();
        let mut pending = false;

        for signal in signals {
            let step = wait.observe(signal);
            let expected = match signal {
                RebootSignal::WaitForReboot => {
                    pending = true;
                    RebootStep::Continue
                }
                RebootSignal::SystemStarting => {
                    pending = false;
                    RebootStep::Continue
                }
                _ if pending => RebootStep::Skipped,
                _ => RebootStep::Done,
            };
            prop_assert_eq!(step, expected);
            prop_assert_eq!(wait.reboot_pending(), pending);
        }
    }

    #[test]
    fn test_tracker_stops_at_first_accepted_prompt(
        signals in prop::collection::vec(signal(), 0..12),
        acceptance in acceptance(),
    ) {
        let transport = ScriptedTransport::new()
            .outputs(signals.iter().map(|s| console_text(*s)));
        let mut expect = Expect::new(transport);
        let mut transcript = Transcript::new();
        let tracker = RebootTracker::new(acceptance, Duration::from_millis(10));

        let outcome = tokio_test::block_on(tracker.await_stable(&mut expect, &mut transcript));

        match expected_end(&signals, acceptance) {
            Some((consumed, skipped)) => {
                let report = outcome.unwrap();
                prop_assert_eq!(report.skipped_logins, skipped);
                prop_assert_eq!(expect.transport().remaining(), signals.len() - consumed);
            }
            None => {
                let timed_out = matches!(outcome, Err(ConsoleError::Timeout { .. }));
                prop_assert!(timed_out);
            }
        }
    }

    #[test]
    fn test_tracker_follows_stream_order_within_a_read(
        packed in prop::collection::vec((signal(), any::<bool>()), 0..16),
        acceptance in acceptance(),
    ) {
        let (chunks, chunk_of) = pack(&packed);
        let signals: Vec<RebootSignal> = packed.iter().map(|(s, _)| *s).collect();

        let transport = ScriptedTransport::new().outputs(&chunks);
        let mut expect = Expect::new(transport);
        let mut transcript = Transcript::new();
        let tracker = RebootTracker::new(acceptance, Duration::from_millis(10));

        let outcome = tokio_test::block_on(tracker.await_stable(&mut expect, &mut transcript));

        match expected_end(&signals, acceptance) {
            Some((consumed, skipped)) => {
                let report = outcome.unwrap();
                prop_assert_eq!(report.skipped_logins, skipped);
                let last_read = chunk_of[consumed - 1];
                prop_assert_eq!(expect.transport().remaining(), chunks.len() - last_read - 1);
            }
            None => {
                let timed_out = matches!(outcome, Err(ConsoleError::Timeout { .. }));
                prop_assert!(timed_out);
            }
        }
    }
}

#[test]
fn test_login_only_ignores_banner() {
    let tracker = RebootTracker::new(LoginAcceptance::LoginOnly, Duration::from_millis(10));
    let slots: Vec<&str> = tracker
        .alternatives()
        .patterns()
        .iter()
        .map(|p| match p {
            forticonsole::Pattern::Exact(s) => s.as_str(),
            _ => "",
        })
        .collect();
    assert_eq!(slots, vec![" login: ", "System is starting", "please wait for reboot"]);
}

#[test]
fn test_every_signal_in_one_read() {
    let chunk = [
        RebootSignal::WaitForReboot,
        RebootSignal::Login,
        RebootSignal::SystemStarting,
        RebootSignal::WaitForReboot,
        RebootSignal::Banner,
        RebootSignal::SystemStarting,
        RebootSignal::Login,
    ]
    .map(console_text)
    .concat();
    let mut expect = Expect::new(ScriptedTransport::new().output(chunk));
    let mut transcript = Transcript::new();
    let tracker = RebootTracker::new(LoginAcceptance::LoginOrBanner, Duration::from_millis(10));

    let report = tokio_test::block_on(tracker.await_stable(&mut expect, &mut transcript)).unwrap();

    assert_eq!(report.skipped_logins, 2);
}
