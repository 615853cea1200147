//! Command routing

use crate::args::{Cli, Commands, ConfigAction};
use crate::commands::{self, CommandContext};
use crate::console::CliConsole;
use ess_core::error::{ErrorCategory, EssError, EssResult};

/// Run the parsed command, reporting failures the way the portal UI would
pub async fn route(cli: Cli) -> anyhow::Result<()> {
    let context = CommandContext {
        config_file: cli.config_file,
        base_url: cli.base_url,
        verbose: cli.verbose,
    };
    let console = CliConsole::new(context.verbose);

    match dispatch(&context, cli.command).await {
        Ok(()) => Ok(()),
        Err(EssError::Cancelled) => {
            console.warn("Cancelled");
            Ok(())
        }
        Err(e) => {
            report(&console, &e);
            Err(anyhow::Error::new(e).context("ess command failed"))
        }
    }
}

async fn dispatch(context: &CommandContext, command: Commands) -> EssResult<()> {
    match command {
        Commands::Login {
            email,
            password_env,
        } => commands::auth::login(context, email, password_env).await,
        Commands::Logout => commands::auth::logout(context).await,
        Commands::Whoami => commands::auth::whoami(context).await,
        Commands::Get {
            resource,
            params,
            compact,
        } => commands::views::get(context, &resource, &params, compact).await,
        Commands::Resources => commands::views::resources(context),
        Commands::Attendance => commands::attendance::status(context).await,
        Commands::ClockIn => commands::attendance::clock_in(context).await,
        Commands::ClockOut => commands::attendance::clock_out(context).await,
        Commands::Config { action } => match action {
            ConfigAction::Show => commands::config::show(context).await,
            ConfigAction::Validate => commands::config::validate(context).await,
            ConfigAction::Init { force } => commands::config::init(context, force).await,
        },
    }
}

fn report(console: &CliConsole, error: &EssError) {
    let category = error.category();
    console.error(&format!("{}: {}", category.display_name(), error.user_message()));
    if category == ErrorCategory::SessionExpired {
        console.warn("Run `ess login` to sign in again");
    }
    tracing::debug!(code = error.error_code(), "command failed: {}", error);
}
