use super::{ActionRequest, ActionResult, DEFAULT_CLI_COMMAND};
use crate::config::ConsoleConfig;
use crate::result::ConsoleError;
use crate::session::{ConsoleSession, PromptSlot};
use crate::transcript::Transcript;
use crate::transport::Connector;
use log::{info, warn};

pub(crate) const PASSWORD_CHANGED_NOTE: &str =
    "It seems like password was changed in the middle of the console cli command execution";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Completion {
    AllLines,
    LoggedOut,
}

pub(super) async fn run<C: Connector>(
    request: &ActionRequest,
    connector: &C,
    config: &ConsoleConfig,
    result: &mut ActionResult,
) -> Result<(), ConsoleError> {
    let mut lines = request.command_lines();
    if lines.is_empty() {
        lines.push(DEFAULT_CLI_COMMAND);
    }

    let mut session = ConsoleSession::new(connector, config);
    let outcome = execute(&mut session, &lines, config, &mut result.transcript).await;

    let session_log = match outcome {
        Ok(Completion::LoggedOut) => session.disconnect().await,
        _ => session.logout().await,
    };
    result.session_log.append(session_log);

    result.changed = outcome? == Completion::AllLines;
    Ok(())
}

async fn execute<C: Connector>(
    session: &mut ConsoleSession<'_, C>,
    lines: &[&str],
    config: &ConsoleConfig,
    transcript: &mut Transcript,
) -> Result<Completion, ConsoleError> {
    session.open().await?;

    for line in lines {
        session.send_line(line).await?;
        tokio::time::sleep(config.timeouts.settle).await;
        let outcome = session.await_prompt(config.timeouts.prompt).await?;
        transcript.capture(&outcome.before);

        match outcome.slot {
            PromptSlot::Root | PromptSlot::SubContext => {}
            PromptSlot::AnyHash => session.refresh_hostname(&outcome.before)?,
            PromptSlot::Login | PromptSlot::Banner => {
                warn!("device logged the session out after {line:?}");
                transcript.note(PASSWORD_CHANGED_NOTE);
                return Ok(Completion::LoggedOut);
            }
        }
    }

    info!("ran {} command lines", lines.len());
    Ok(Completion::AllLines)
}
