//! Portal views

use super::CommandContext;
use crate::console::CliConsole;
use colored::*;
use ess_core::error::{EssError, EssResult};
use ess_sdk::{CacheKey, Resource};

pub async fn get(
    context: &CommandContext,
    resource: &str,
    params: &[String],
    compact: bool,
) -> EssResult<()> {
    let key = cache_key(resource, params)?;
    let portal = context.portal()?;
    if !portal.is_authenticated() {
        return Err(EssError::NotAuthenticated);
    }

    tracing::debug!(key = %key, "fetching view");
    let value = portal.view(key).await?;
    let rendered = if compact {
        serde_json::to_string(&value)?
    } else {
        serde_json::to_string_pretty(&value)?
    };
    println!("{}", rendered);
    Ok(())
}

pub fn resources(context: &CommandContext) -> EssResult<()> {
    let console = CliConsole::new(context.verbose);
    console.print_header("Resources");
    for resource in Resource::ALL {
        println!(
            "  {:<22} {}",
            resource.name().cyan(),
            resource.endpoint().dimmed()
        );
    }
    Ok(())
}

/// Parse `resource` and `name=value` parameters into a cache key
pub fn cache_key(resource: &str, params: &[String]) -> EssResult<CacheKey> {
    let resource: Resource = resource.parse()?;
    params.iter().try_fold(CacheKey::new(resource), |key, param| {
        let (name, value) = param
            .split_once('=')
            .filter(|(name, _)| !name.trim().is_empty())
            .ok_or_else(|| {
                EssError::invalid_input_field(
                    format!("Expected NAME=VALUE, got '{}'", param),
                    "param",
                )
            })?;
        Ok(key.with_param(name.trim(), value.trim()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_key_from_args() {
        let key = cache_key(
            "leave-balance",
            &["status=pending".to_string(), "page=2".to_string()],
        )
        .unwrap();

        assert_eq!(key.resource, Resource::LeaveBalance);
        assert_eq!(
            key.params,
            vec![
                ("page".to_string(), "2".to_string()),
                ("status".to_string(), "pending".to_string()),
            ]
        );
    }

    #[test]
    fn test_cache_key_rejects_bad_params() {
        assert!(cache_key("payslips", &["year".to_string()]).is_err());
        assert!(cache_key("payslips", &["=2025".to_string()]).is_err());
        assert!(cache_key("timesheets-of-doom", &[]).is_err());
    }
}
