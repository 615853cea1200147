//! Clock-in / clock-out

use super::CommandContext;
use crate::console::CliConsole;
use colored::*;
use ess_core::error::{EssError, EssResult};
use ess_sdk::{ClockStatus, Portal, TierView};

pub async fn status(context: &CommandContext) -> EssResult<()> {
    let console = CliConsole::new(context.verbose);
    let portal = signed_in(context)?;
    let view = portal.attendance().refresh_status().await?;
    report(&console, &view);
    Ok(())
}

pub async fn clock_in(context: &CommandContext) -> EssResult<()> {
    let console = CliConsole::new(context.verbose);
    let portal = signed_in(context)?;
    let view = portal.attendance().clock_in().await?;
    report(&console, &view);
    Ok(())
}

pub async fn clock_out(context: &CommandContext) -> EssResult<()> {
    let console = CliConsole::new(context.verbose);
    let portal = signed_in(context)?;
    let view = portal.attendance().clock_out().await?;
    report(&console, &view);
    Ok(())
}

fn signed_in(context: &CommandContext) -> EssResult<Portal> {
    let portal = context.portal()?;
    if !portal.is_authenticated() {
        return Err(EssError::NotAuthenticated);
    }
    Ok(portal)
}

fn report(console: &CliConsole, view: &TierView<ClockStatus>) {
    let Some(status) = view.value() else {
        console.warn("Attendance status unavailable");
        return;
    };
    console.print_header("Attendance");
    console.field("Status", &describe(status));
    if !view.is_authoritative() {
        console.info("Not yet confirmed by the server");
    }
}

fn describe(status: &ClockStatus) -> String {
    match (status.clocked_in, status.since) {
        (true, Some(since)) => format!(
            "{} since {}",
            "clocked in".green(),
            since.format("%Y-%m-%d %H:%M UTC")
        ),
        (true, None) => "clocked in".green().to_string(),
        (false, _) => "clocked out".yellow().to_string(),
    }
}
