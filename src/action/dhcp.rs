use super::{confirm, open_global, ActionResult};
use crate::config::ConsoleConfig;
use crate::result::ConsoleError;
use crate::session::ConsoleSession;
use crate::transcript::Transcript;
use crate::transport::Connector;
use log::debug;

pub(super) async fn run<C: Connector>(
    connector: &C,
    config: &ConsoleConfig,
    result: &mut ActionResult,
) -> Result<(), ConsoleError> {
    let mut session = ConsoleSession::new(connector, config);
    let outcome = purge(&mut session, config, &mut result.transcript).await;
    result.session_log.append(session.logout().await);

    result.changed = outcome?;
    Ok(())
}

/// Purge the DHCP lease table; reports whether `show` output changed.
async fn purge<C: Connector>(
    session: &mut ConsoleSession<'_, C>,
    config: &ConsoleConfig,
    transcript: &mut Transcript,
) -> Result<bool, ConsoleError> {
    open_global(session).await?;
    transcript.capture(&session.run("config system dhcp server").await?);

    let before = show(session, transcript).await?;

    let expect = session.expect_mut()?;
    confirm(expect, "purge", config.timeouts.prompt, transcript).await?;
    let outcome = session.await_prompt(config.timeouts.prompt).await?;
    transcript.capture(&outcome.before);

    let after = show(session, transcript).await?;
    let changed = before != after;
    debug!("dhcp server configuration changed: {changed}");

    transcript.capture(&session.run("end").await?);
    Ok(changed)
}

async fn show<C: Connector>(
    session: &mut ConsoleSession<'_, C>,
    transcript: &mut Transcript,
) -> Result<Vec<String>, ConsoleError> {
    let output = session.run("show").await?;
    transcript.capture(&output);
    Ok(output.lines().map(str::to_owned).collect())
}
