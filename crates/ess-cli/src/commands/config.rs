//! Configuration management commands

use super::CommandContext;
use crate::console::CliConsole;
use colored::*;
use ess_core::config::PortalConfig;
use ess_core::error::{EssError, EssResult};

/// Show the effective configuration
pub async fn show(context: &CommandContext) -> EssResult<()> {
    let console = CliConsole::new(true);
    console.print_header("Configuration");

    if context.config_file.exists() {
        console.success(&format!(
            "Loaded configuration from: {}",
            context.config_file.display()
        ));
    } else {
        console.warn(&format!(
            "Configuration file not found: {}",
            context.config_file.display()
        ));
        console.info("Using defaults and ESS_* environment variables");
    }

    let config = context.config()?;
    print_config(&console, &config);
    Ok(())
}

/// Validate the configuration file
pub async fn validate(context: &CommandContext) -> EssResult<()> {
    let console = CliConsole::new(true);
    console.print_header("Configuration Validation");

    if !context.config_file.exists() {
        return Err(EssError::config(format!(
            "Configuration file not found: {}",
            context.config_file.display()
        )));
    }

    console.info(&format!(
        "Validating configuration file: {}",
        context.config_file.display()
    ));
    match context.config() {
        Ok(config) => {
            console.success("Configuration is valid");
            console.print_separator();
            console.info(&format!("Backend: {}", config.base_url));
            if config.session.file.is_some() && config.session.secret.is_none() {
                console.warn("session.file is set without session.secret");
            }
            Ok(())
        }
        Err(e) => {
            console.error(&format!("Configuration validation failed: {}", e));
            Err(e)
        }
    }
}

/// Write a sample configuration file
pub async fn init(context: &CommandContext, force: bool) -> EssResult<()> {
    let console = CliConsole::new(true);
    console.print_header("Configuration Initialization");

    let path = &context.config_file;
    if path.exists() && !force {
        console.info("Use --force to overwrite");
        return Err(EssError::config(format!(
            "Configuration file already exists: {}",
            path.display()
        )));
    }

    let contents = sample_config(context)?;
    tokio::fs::write(path, contents)
        .await
        .map_err(|e| EssError::io_with_path(e.to_string(), path.display().to_string()))?;

    console.success(&format!("Created configuration file: {}", path.display()));
    console.info("Edit base_url to point at your portal backend");
    Ok(())
}

fn sample_config(context: &CommandContext) -> EssResult<String> {
    let mut config = PortalConfig::default();
    if let Some(base_url) = &context.base_url {
        config.base_url = base_url.clone();
    }
    config.validate()?;
    toml::to_string_pretty(&config)
        .map_err(|e| EssError::config(format!("Failed to serialize configuration: {}", e)))
}

fn print_config(console: &CliConsole, config: &PortalConfig) {
    console.field("Backend", &config.base_url.green().to_string());
    console.field("Auth timeout", &format!("{:?}", config.auth_timeout));
    console.field("Req timeout", &format!("{:?}", config.request_timeout));
    console.field("Refresh skew", &format!("{:?}", config.refresh_skew));
    console.field("expiresIn", &format!("{:?}", config.expiry_semantics));
    console.field(
        "Session file",
        &config
            .session
            .file
            .as_ref()
            .map(|path| path.display().to_string())
            .unwrap_or_else(|| "~/.ess/session (cli default)".to_string()),
    );
    console.field(
        "Secret",
        &if config.session.secret.is_some() {
            "✓ Set".green().to_string()
        } else {
            "generated in ~/.ess/secret".dimmed().to_string()
        },
    );
    console.field("Max upload", &format!("{} bytes", config.max_attachment_bytes));
    console.print_separator();
    console.field("Login", &config.routes.login);
    console.field("Onboarding", &config.routes.onboarding);
    console.field("Dashboard", &config.routes.dashboard);
}

#[cfg(test)]
mod tests {
    use super::*;
    use ess_core::config::load_config;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn context(dir: &TempDir) -> CommandContext {
        CommandContext {
            config_file: dir.path().join("ess_config.toml"),
            base_url: Some("https://hr.example.com".to_string()),
            verbose: false,
        }
    }

    #[tokio::test]
    async fn test_init_writes_loadable_config() {
        let temp_dir = TempDir::new().unwrap();
        let context = context(&temp_dir);

        init(&context, false).await.unwrap();

        let config = load_config(Some(&context.config_file), HashMap::new()).unwrap();
        assert_eq!(config.base_url, "https://hr.example.com");
        assert_eq!(config.auth_timeout, PortalConfig::default().auth_timeout);
    }

    #[tokio::test]
    async fn test_init_refuses_to_overwrite() {
        let temp_dir = TempDir::new().unwrap();
        let context = context(&temp_dir);
        std::fs::write(&context.config_file, "base_url = \"https://keep.example.com\"\n").unwrap();

        assert!(init(&context, false).await.is_err());
        init(&context, true).await.unwrap();

        let written = std::fs::read_to_string(&context.config_file).unwrap();
        assert!(written.contains("https://hr.example.com"));
    }

    #[tokio::test]
    async fn test_validate_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        assert!(validate(&context(&temp_dir)).await.is_err());
    }
}
