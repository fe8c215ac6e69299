//! `restoreimage`: reinstall firmware from a TFTP server through the boot
//! loader menu.

use super::{confirm, open_global, ActionRequest, ActionResult};
use crate::config::ConsoleConfig;
use crate::expect::Expect;
use crate::pattern::Pattern;
use crate::reboot::{LoginAcceptance, RebootTracker};
use crate::result::ConsoleError;
use crate::session::ConsoleSession;
use crate::transcript::Transcript;
use crate::transport::{Connector, Transport};
use log::info;
use std::net::Ipv4Addr;
use std::sync::LazyLock;

const BOOT_MENU_BANNER: &str = "Press any key to display configuration menu...";
const SAVE_QUESTION: &str = "Save as Default firmware/Backup firmware/Run image without saving:[D/B/R]?";

static MENU_PROMPT: LazyLock<Pattern> =
    LazyLock::new(|| Pattern::regex(r"Enter .+:").expect("menu prompt regex is valid"));

/// TFTP settings for the boot loader, taken from the first five command
/// lines: local address, netmask, gateway, server address, image file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TftpParams {
    /// Address of the device's management port
    pub local_ip: Ipv4Addr,
    /// Netmask of the management port
    pub netmask: Ipv4Addr,
    /// Default gateway
    pub gateway: Ipv4Addr,
    /// TFTP server address
    pub server_ip: Ipv4Addr,
    /// Firmware image path on the TFTP server
    pub image: String,
}

impl TftpParams {
    /// Parse from command lines. Double quotes are removed first.
    ///
    /// # Errors
    ///
    /// [`ConsoleError::Parse`] when fewer than five lines are given, an
    /// address is not IPv4 or the image name is empty.
    ///
    /// ```
    /// use forticonsole::TftpParams;
    ///
    /// let params = TftpParams::from_lines(&[
    ///     "\"192.168.1.99\"",
    ///     "255.255.255.0",
    ///     "192.168.1.1",
    ///     "192.168.1.10",
    ///     "\"FGT_60E-v6-build1828-FORTINET.out\"",
    /// ])
    /// .unwrap();
    /// assert_eq!(params.image, "FGT_60E-v6-build1828-FORTINET.out");
    /// ```
    pub fn from_lines(lines: &[&str]) -> Result<Self, ConsoleError> {
        let values: Vec<String> = lines
            .iter()
            .take(5)
            .map(|line| line.replace('"', "").trim().to_string())
            .collect();

        let [local_ip, netmask, gateway, server_ip, image] = values.as_slice() else {
            return Err(ConsoleError::parse(
                "TFTP parameters",
                format!(
                    "expected local ip, netmask, gateway, server ip and image, got {} lines",
                    lines.len()
                ),
            ));
        };

        if image.is_empty() {
            return Err(ConsoleError::parse("TFTP parameters", "image name is empty"));
        }

        Ok(Self {
            local_ip: parse_ipv4("local ip", local_ip)?,
            netmask: parse_ipv4("netmask", netmask)?,
            gateway: parse_ipv4("gateway", gateway)?,
            server_ip: parse_ipv4("server ip", server_ip)?,
            image: image.clone(),
        })
    }
}

fn parse_ipv4(field: &str, value: &str) -> Result<Ipv4Addr, ConsoleError> {
    value
        .parse()
        .map_err(|e| ConsoleError::parse("TFTP parameters", format!("{field} {value:?}: {e}")))
}

pub(super) async fn run<C: Connector>(
    request: &ActionRequest,
    connector: &C,
    config: &ConsoleConfig,
    result: &mut ActionResult,
) -> Result<(), ConsoleError> {
    let params = TftpParams::from_lines(&request.command_lines())?;

    let mut session = ConsoleSession::new(connector, config);
    let outcome = restore(&mut session, &params, config, &mut result.transcript).await;
    result.session_log.append(session.disconnect().await);

    outcome?;
    result.changed = true;
    Ok(())
}

async fn restore<C: Connector>(
    session: &mut ConsoleSession<'_, C>,
    params: &TftpParams,
    config: &ConsoleConfig,
    transcript: &mut Transcript,
) -> Result<(), ConsoleError> {
    let timeouts = config.timeouts;
    open_global(session).await?;

    let expect = session.expect_mut()?;
    confirm(expect, "exec reboot", timeouts.prompt, transcript).await?;

    let before = expect
        .await_pattern(Pattern::exact(BOOT_MENU_BANNER), timeouts.boot_menu)
        .await?;
    transcript.capture(&before);
    tokio::time::sleep(timeouts.settle).await;
    expect.send_line("").await?;

    let mut menu = Menu {
        expect,
        transcript,
        config,
    };
    menu.await_menu().await?;
    menu.select("C").await?;

    let addresses = [
        ("I", params.local_ip),
        ("S", params.netmask),
        ("G", params.gateway),
        ("T", params.server_ip),
    ];
    for (key, address) in addresses {
        menu.enter(key, &address.to_string(), 1).await?;
    }
    menu.enter("F", &params.image, 2).await?;
    menu.select("R").await?;
    menu.select("Q").await?;

    info!("starting TFTP transfer of {} from {}", params.image, params.server_ip);
    menu.expect.send("T").await?;
    tokio::time::sleep(timeouts.settle).await;
    let before = menu
        .expect
        .await_pattern(Pattern::exact(SAVE_QUESTION), timeouts.boot_menu)
        .await?;
    menu.transcript.capture(&before);
    menu.expect.send("D").await?;

    RebootTracker::new(LoginAcceptance::LoginOnly, timeouts.reboot)
        .await_stable(menu.expect, menu.transcript)
        .await?;
    Ok(())
}

/// The boot loader's single-key menu.
struct Menu<'e, T> {
    expect: &'e mut Expect<T>,
    transcript: &'e mut Transcript,
    config: &'e ConsoleConfig,
}

impl<T: Transport> Menu<'_, T> {
    async fn await_menu(&mut self) -> Result<(), ConsoleError> {
        let before = self
            .expect
            .await_pattern(MENU_PROMPT.clone(), self.config.timeouts.prompt)
            .await?;
        self.transcript.capture(&before);
        Ok(())
    }

    /// Press `key` and wait for the next menu prompt.
    async fn select(&mut self, key: &str) -> Result<(), ConsoleError> {
        self.expect.send(key).await?;
        tokio::time::sleep(self.config.timeouts.settle).await;
        self.await_menu().await
    }

    /// Press `key`, type `value`, and wait for the next menu prompt.
    async fn enter(&mut self, key: &str, value: &str, settle_rounds: u32) -> Result<(), ConsoleError> {
        self.expect.send(key).await?;
        self.expect.send_line(value).await?;
        tokio::time::sleep(self.config.timeouts.settle * settle_rounds).await;
        self.await_menu().await
    }
}
