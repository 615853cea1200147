//! CLI argument definitions using clap

use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub use ess_core::config::DEFAULT_CONFIG_FILE;

#[derive(Parser, Debug)]
#[command(name = "ess")]
#[command(about = "Employee self-service portal client")]
#[command(
    long_about = r#"Employee self-service portal client

USAGE:
  ess login --email <email>      # Sign in (prompts for password / code)
  ess whoami                     # Show the signed-in employee
  ess get <resource>             # Fetch a portal view as JSON
  ess clock-in | clock-out       # Record attendance
  ess logout                     # End the session

CONFIGURATION:
  ess config init                # Create ess_config.toml
  ess config show                # Show the effective configuration"#
)]
#[command(version)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    pub config_file: PathBuf,

    /// Backend origin, overrides the config file and ESS_BASE_URL
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Sign in with email and password
    Login {
        /// Account email; prompted for when omitted
        #[arg(long)]
        email: Option<String>,

        /// Read the password from this environment variable instead of prompting
        #[arg(long, value_name = "VAR")]
        password_env: Option<String>,
    },

    /// End the session and delete the stored session file
    Logout,

    /// Show the signed-in employee and token lifetime
    Whoami,

    /// Fetch a portal view
    Get {
        /// Resource name, e.g. `payslips` or `leave-balance`
        resource: String,

        /// Query parameter as name=value; may be repeated
        #[arg(short, long = "param", value_name = "NAME=VALUE")]
        params: Vec<String>,

        /// Print compact JSON
        #[arg(long)]
        compact: bool,
    },

    /// List the resources `get` understands
    Resources,

    /// Show whether you are clocked in
    Attendance,

    /// Clock in now
    ClockIn,

    /// Clock out now
    ClockOut,

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Display the effective configuration
    Show,

    /// Validate the configuration file
    Validate,

    /// Write a sample configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}
