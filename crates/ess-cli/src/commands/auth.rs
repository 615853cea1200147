//! Login, logout and whoami

use super::CommandContext;
use crate::console::CliConsole;
use colored::*;
use dialoguer::{Input, Password};
use ess_core::auth::validate_email;
use ess_core::error::{EssError, EssResult};
use ess_sdk::{AuthenticatedLogin, LoginOutcome, PendingVerification, Portal};

/// Wrong codes accepted before giving up
const MAX_CODE_ATTEMPTS: usize = 3;

/// Typed at the code prompt to request a new code
const RESEND_KEYWORD: &str = "resend";

pub async fn login(
    context: &CommandContext,
    email: Option<String>,
    password_env: Option<String>,
) -> EssResult<()> {
    let console = CliConsole::new(context.verbose);
    let portal = context.portal()?;

    let email = match email {
        Some(email) => email,
        None => prompt(Input::<String>::new().with_prompt("Email").interact_text())?,
    };
    let email = validate_email(&email)?;

    let password = match password_env {
        Some(var) => std::env::var(&var).map_err(|_| {
            EssError::invalid_input_field(format!("{} is not set", var), "password")
        })?,
        None => prompt(Password::new().with_prompt("Password").interact())?,
    };

    let login = match portal.login(&email, &password).await? {
        LoginOutcome::Authenticated(login) => login,
        LoginOutcome::RequiresSecondFactor(pending) => {
            console.info(&format!("A verification code was sent to {}", pending.email));
            second_factor(&portal, &console, &pending).await?
        }
    };

    report_login(&portal, &console, &login);
    Ok(())
}

async fn second_factor(
    portal: &Portal,
    console: &CliConsole,
    pending: &PendingVerification,
) -> EssResult<AuthenticatedLogin> {
    let mut attempts = 0;
    loop {
        let code = prompt(
            Input::<String>::new()
                .with_prompt(format!("Verification code (or '{}')", RESEND_KEYWORD))
                .interact_text(),
        )?;

        if code.trim().eq_ignore_ascii_case(RESEND_KEYWORD) {
            portal.resend_code(pending).await?;
            console.success("A new code is on its way");
            continue;
        }

        match portal.verify_code(pending, code.trim()).await {
            Ok(login) => return Ok(login),
            Err(e @ EssError::InvalidCode { .. }) => {
                attempts += 1;
                if attempts >= MAX_CODE_ATTEMPTS {
                    return Err(e);
                }
                console.error(&e.user_message());
            }
            Err(e) => return Err(e),
        }
    }
}

fn report_login(portal: &Portal, console: &CliConsole, login: &AuthenticatedLogin) {
    console.success(&format!(
        "Signed in as {}",
        login.session.user.display_name().bold()
    ));
    console.field(
        "Destination",
        portal.config().routes.path_for(login.destination),
    );
}

pub async fn logout(context: &CommandContext) -> EssResult<()> {
    let console = CliConsole::new(context.verbose);
    let portal = context.portal()?;

    if !portal.is_authenticated() {
        console.warn("Not signed in");
        return Ok(());
    }
    portal.logout();
    console.success("Signed out");
    Ok(())
}

pub async fn whoami(context: &CommandContext) -> EssResult<()> {
    let console = CliConsole::new(context.verbose);
    let portal = context.portal()?;

    if !portal.is_authenticated() {
        return Err(EssError::NotAuthenticated);
    }
    let session = portal.ensure_fresh().await?;
    let user = &session.user;

    console.print_header(user.display_name());
    console.field("Email", &user.email);
    console.field("Employee ID", &user.id);
    if let Some(role) = &user.role {
        console.field("Role", role);
    }
    if let Some(status) = &user.employment_status {
        console.field("Status", status);
    }
    if let Some(company) = &user.company_id {
        console.field("Company", company);
    }
    console.field(
        "Token expires",
        &format!(
            "{} (in {}s)",
            session.tokens.expires_at.to_rfc3339(),
            session.tokens.remaining_lifetime()
        ),
    );
    if context.verbose && !session.permissions.is_empty() {
        console.field("Permissions", &session.permissions.join(", "));
    }
    Ok(())
}

fn prompt<T>(result: dialoguer::Result<T>) -> EssResult<T> {
    result.map_err(|e| {
        let dialoguer::Error::IO(io) = e;
        if io.kind() == std::io::ErrorKind::Interrupted {
            EssError::Cancelled
        } else {
            EssError::from(io)
        }
    })
}
