use super::{confirm, open_global, ActionResult};
use crate::config::ConsoleConfig;
use crate::reboot::{LoginAcceptance, RebootTracker};
use crate::result::ConsoleError;
use crate::session::ConsoleSession;
use crate::transcript::Transcript;
use crate::transport::Connector;
use log::info;

pub(super) async fn run_reboot<C: Connector>(
    connector: &C,
    config: &ConsoleConfig,
    result: &mut ActionResult,
) -> Result<(), ConsoleError> {
    restart(
        "exec reboot",
        LoginAcceptance::LoginOrBanner,
        connector,
        config,
        result,
    )
    .await
}

pub(super) async fn run_factory_reset<C: Connector>(
    connector: &C,
    config: &ConsoleConfig,
    result: &mut ActionResult,
) -> Result<(), ConsoleError> {
    restart(
        "exec factoryreset",
        LoginAcceptance::LoginOnly,
        connector,
        config,
        result,
    )
    .await
}

async fn restart<C: Connector>(
    command: &str,
    acceptance: LoginAcceptance,
    connector: &C,
    config: &ConsoleConfig,
    result: &mut ActionResult,
) -> Result<(), ConsoleError> {
    let mut session = ConsoleSession::new(connector, config);
    let outcome = restart_and_wait(&mut session, command, acceptance, config, &mut result.transcript).await;
    // The device rebooted: there is nobody left to log out from.
    result.session_log.append(session.disconnect().await);

    outcome?;
    result.changed = true;
    Ok(())
}

async fn restart_and_wait<C: Connector>(
    session: &mut ConsoleSession<'_, C>,
    command: &str,
    acceptance: LoginAcceptance,
    config: &ConsoleConfig,
    transcript: &mut Transcript,
) -> Result<(), ConsoleError> {
    open_global(session).await?;

    let expect = session.expect_mut()?;
    confirm(expect, command, config.timeouts.prompt, transcript).await?;

    let report = RebootTracker::new(acceptance, config.timeouts.reboot)
        .await_stable(expect, transcript)
        .await?;
    info!(
        "{command} done in {:?}, {} early login prompts ignored",
        report.elapsed, report.skipped_logins
    );
    Ok(())
}
