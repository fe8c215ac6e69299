//! `erasedisk` and `diskformat`.
//!
//! Both reboot the device once per disk, so the disks are listed in one
//! session and each disk is then handled in a fresh one.

use super::{confirm, open_global, ActionResult, Disk};
use crate::config::ConsoleConfig;
use crate::pattern::Pattern;
use crate::reboot::{LoginAcceptance, RebootTracker};
use crate::result::ConsoleError;
use crate::session::{ConsoleSession, HASH_PROMPT};
use crate::transcript::Transcript;
use crate::transport::Connector;
use log::info;
use regex::Regex;
use std::sync::LazyLock;
use std::time::Instant;

const ERASE_LIST_COMMAND: &str = "exec erase-disk ?";
const ERASE_ECHO: &str = "exec erase-disk";
const PROCEED_QUESTION: &str = "Are you sure you want to proceed? (y/n)";
const OVERWRITE_QUESTION: &str = "How many times do you wish to overwrite the media?";
const RESTORE_QUESTION: &str = "Do you want to restore the image after erasing? (y/n)";
const BOOT_DEVICE_ERASED: &str = "You must format the boot device";
const OVERWRITE_PASSES: &str = "1";

/// The boot disk; erasing it leaves the device without a bootable image.
const BOOT_DISK: &str = "SYSTEM";

static DISK_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^Disk (\S+) +ref: +(\d+) .+").expect("disk line regex is valid")
});

static PARTITION_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^partition ref: +(\d+) .+").expect("partition line regex is valid")
});

/// Extract disk names from the `exec erase-disk ?` completion listing.
///
/// Each listed line starts with the disk name, optionally followed by an
/// annotation such as `(boot)`. Blank lines, the `?` echo and prompt lines
/// are ignored.
///
/// # Errors
///
/// [`ConsoleError::Parse`] when no disk name is found.
///
/// # Examples
///
/// ```
/// use forticonsole::parse_erase_targets;
///
/// let listing = " ?\r\nSYSTEM (boot)\r\nSSD\r\n\r\nFGT60E # ";
/// assert_eq!(parse_erase_targets(listing).unwrap(), vec!["SYSTEM", "SSD"]);
/// ```
pub fn parse_erase_targets(listing: &str) -> Result<Vec<String>, ConsoleError> {
    let disks: Vec<String> = listing
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && *line != "?")
        .filter(|line| !line.contains(HASH_PROMPT.trim_end()) && !line.starts_with(ERASE_ECHO))
        .filter_map(|line| line.split_whitespace().next())
        .map(str::to_owned)
        .collect();

    if disks.is_empty() {
        return Err(ConsoleError::parse(
            "erase-disk listing",
            "no disk names in device output",
        ));
    }
    Ok(disks)
}

/// Parse `exec disk list` output into disks and their partitions.
///
/// Partition lines belong to the closest preceding disk line; lines of
/// any other shape are ignored.
pub fn parse_disk_list(output: &str) -> Vec<Disk> {
    let mut disks: Vec<Disk> = Vec::new();

    for line in output.lines().map(str::trim).filter(|l| !l.is_empty()) {
        if let Some(caps) = DISK_LINE.captures(line) {
            disks.push(Disk {
                name: caps[1].to_string(),
                reference: caps[2].to_string(),
                partitions: Vec::new(),
            });
        } else if let Some(caps) = PARTITION_LINE.captures(line) {
            if let Some(disk) = disks.last_mut() {
                disk.partitions.push(caps[1].to_string());
            }
        }
    }

    disks
}

pub(super) async fn run_erase<C: Connector>(
    connector: &C,
    config: &ConsoleConfig,
    result: &mut ActionResult,
) -> Result<(), ConsoleError> {
    let mut session = ConsoleSession::new(connector, config);
    let listing = list_erase_targets(&mut session, config, &mut result.transcript).await;
    result.session_log.append(session.logout().await);

    let disks = parse_erase_targets(&listing?)?;
    info!("disks to erase: {}", disks.join(", "));

    for disk in &disks {
        let mut session = ConsoleSession::new(connector, config);
        let outcome = erase_disk(&mut session, disk, config, &mut result.transcript).await;
        result.session_log.append(session.disconnect().await);
        outcome?;
        result.changed = true;
    }
    Ok(())
}

async fn list_erase_targets<C: Connector>(
    session: &mut ConsoleSession<'_, C>,
    config: &ConsoleConfig,
    transcript: &mut Transcript,
) -> Result<String, ConsoleError> {
    open_global(session).await?;

    let prompt_timeout = config.timeouts.prompt;
    let expect = session.expect_mut()?;
    // No newline: the device completes the command and lists the choices.
    expect.send(ERASE_LIST_COMMAND).await?;
    expect
        .await_pattern(Pattern::exact(ERASE_ECHO), prompt_timeout)
        .await?;
    let listing = expect
        .await_pattern(Pattern::exact(ERASE_ECHO), prompt_timeout)
        .await?;
    transcript.capture(&listing);
    Ok(listing)
}

async fn erase_disk<C: Connector>(
    session: &mut ConsoleSession<'_, C>,
    disk: &str,
    config: &ConsoleConfig,
    transcript: &mut Transcript,
) -> Result<(), ConsoleError> {
    let prompt = config.timeouts.prompt;
    open_global(session).await?;

    let expect = session.expect_mut()?;
    expect.send_line(&format!("exec erase-disk {disk}")).await?;
    transcript.capture(&expect.await_pattern(Pattern::exact(PROCEED_QUESTION), prompt).await?);
    expect.send_line("y").await?;
    transcript.capture(&expect.await_pattern(Pattern::exact(OVERWRITE_QUESTION), prompt).await?);
    expect.send_line(OVERWRITE_PASSES).await?;

    if disk == BOOT_DISK {
        transcript.capture(&expect.await_pattern(Pattern::exact(RESTORE_QUESTION), prompt).await?);
        expect.send_line("n").await?;
    }

    transcript.note("WARNING:");
    transcript.note(format!("erase-disk starts running on {disk}"));
    transcript.note("This will permanently erase all data from the storage media.");
    transcript.note("Please do not unplug or turn off FortiGate and wait");
    let started = Instant::now();

    if disk == BOOT_DISK {
        let before = expect
            .await_pattern(Pattern::exact(BOOT_DEVICE_ERASED), config.timeouts.erase)
            .await?;
        transcript.capture(&before);
    } else {
        RebootTracker::new(LoginAcceptance::LoginOrBanner, config.timeouts.erase)
            .await_stable(expect, transcript)
            .await?;
    }

    let minutes = started.elapsed().as_secs() / 60;
    info!("erase-disk on {disk} finished in {minutes} minutes");
    transcript.note(format!("erase-disk finish running on {disk}"));
    transcript.note(format!("erase-disk finish in {minutes} minutes"));
    Ok(())
}

pub(super) async fn run_format<C: Connector>(
    connector: &C,
    config: &ConsoleConfig,
    result: &mut ActionResult,
) -> Result<(), ConsoleError> {
    let mut session = ConsoleSession::new(connector, config);
    let listing = list_disks(&mut session, &mut result.transcript).await;
    result.session_log.append(session.logout().await);

    let disks = parse_disk_list(&listing?);
    result.disks = Some(disks.clone());
    if disks.is_empty() {
        return Err(ConsoleError::parse("disk list", "no disks in device output"));
    }

    for disk in disks.iter().filter(|d| d.partitions.is_empty()) {
        info!("formatting disk {} (ref {})", disk.name, disk.reference);
        let mut session = ConsoleSession::new(connector, config);
        let outcome = format_disk(&mut session, disk, config, &mut result.transcript).await;
        result.session_log.append(session.disconnect().await);
        outcome?;
        result.changed = true;
    }
    Ok(())
}

async fn list_disks<C: Connector>(
    session: &mut ConsoleSession<'_, C>,
    transcript: &mut Transcript,
) -> Result<String, ConsoleError> {
    open_global(session).await?;
    let output = session.run("exec disk list").await?;
    transcript.capture(&output);
    Ok(output)
}

async fn format_disk<C: Connector>(
    session: &mut ConsoleSession<'_, C>,
    disk: &Disk,
    config: &ConsoleConfig,
    transcript: &mut Transcript,
) -> Result<(), ConsoleError> {
    open_global(session).await?;

    let expect = session.expect_mut()?;
    let command = format!("exec disk format {}", disk.reference);
    confirm(expect, &command, config.timeouts.prompt, transcript).await?;

    RebootTracker::new(LoginAcceptance::LoginOrBanner, config.timeouts.format)
        .await_stable(expect, transcript)
        .await?;
    Ok(())
}
