use anyhow::{Context as _, Result};
use clap::Parser;
use colored::Colorize;

use repsync::cli::args::{Cli, Commands};
use repsync::cli::commands::{self, Context};
use repsync::config::ColorSetting;
use repsync::logging;

fn main() {
    if let Err(e) = run() {
        eprintln!("{}: {:#}", "error".red().bold(), e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    // completions must work even with a broken config file
    if let Commands::Completions { shell, install } = cli.command {
        println!("{}", commands::completions(shell, install)?);
        return Ok(());
    }

    let ctx = Context::load(cli.server, cli.token)?;
    logging::init(cli.verbose, &ctx.config.log.level);
    match ctx.config.general.color {
        ColorSetting::Always => colored::control::set_override(true),
        ColorSetting::Never => colored::control::set_override(false),
        ColorSetting::Auto => {},
    }
    let format = cli.output.unwrap_or(ctx.config.general.default_output);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;

    let output = runtime.block_on(async {
        match cli.command {
            Commands::Log(args) => commands::log(&ctx, args, format).await,
            Commands::Status => commands::status(&ctx, format).await,
            Commands::List { limit } => commands::list(&ctx, limit, format).await,
            Commands::Sync => commands::sync(&ctx, format).await,
            Commands::Watch(args) => commands::watch(&ctx, args).await,
            Commands::Config(args) => commands::config(&ctx, args.command, format),
            Commands::Prompt { format: prompt } => commands::prompt(&ctx, prompt).await,
            Commands::Completions { shell, install } => commands::completions(shell, install),
        }
    })?;

    if !output.is_empty() {
        println!("{output}");
    }
    Ok(())
}
