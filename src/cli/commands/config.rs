//! The `config` command.

use colored::Colorize;

use crate::cli::args::{ConfigCommands, OutputFormat};
use crate::config::Config;
use crate::error::RepsyncError;
use crate::output::to_json;

use super::Context;

/// Shown instead of secrets.
const REDACTED: &str = "********";

/// Execute config subcommands.
///
/// # Errors
///
/// Returns an error if the config file cannot be written or serialized.
pub fn config(ctx: &Context, cmd: ConfigCommands, format: OutputFormat) -> Result<String, RepsyncError> {
    match cmd {
        ConfigCommands::Show => show(&ctx.config, format),
        ConfigCommands::Path => Ok(ctx.paths.config_file.display().to_string()),
        ConfigCommands::Init { force } => init(ctx, force),
    }
}

fn show(config: &Config, format: OutputFormat) -> Result<String, RepsyncError> {
    let mut shown = config.clone();
    if shown.auth.token.is_some() {
        shown.auth.token = Some(REDACTED.to_string());
    }
    if shown.auth.refresh_token.is_some() {
        shown.auth.refresh_token = Some(REDACTED.to_string());
    }

    match format {
        OutputFormat::Json => to_json(&shown),
        OutputFormat::Pretty => Ok(serde_yaml::to_string(&shown)?.trim_end().to_string()),
    }
}

fn init(ctx: &Context, force: bool) -> Result<String, RepsyncError> {
    let path = &ctx.paths.config_file;
    if path.exists() && !force {
        return Err(RepsyncError::Config(format!(
            "{} already exists (use --force to overwrite)",
            path.display()
        )));
    }

    ctx.paths.ensure_dirs()?;
    Config::default().save_to_path(path)?;
    Ok(format!(
        "{} {}",
        "Wrote default configuration to".green(),
        path.display()
    ))
}
