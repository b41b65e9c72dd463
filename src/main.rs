mod cli;
mod commands;
mod config;
mod fields;
mod git;
mod logging;
mod resolver;
mod testutil;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Command};
use resolver::Resolver;

fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let (config_path, explicit) = match cli.config {
        Some(path) => (path, true),
        None => (config::default_config_path()?, false),
    };

    if let Command::Config { show_path: true } = cli.command {
        println!("{}", config_path.display());
        return Ok(());
    }

    let overrides = config::Overrides {
        program: cli.git,
        repo: cli.repo,
        timeout_ms: cli.timeout_ms,
    };
    let config = config::load(&config_path, explicit, &overrides)?;
    tracing::debug!(
        program = %config.program,
        repo = ?config.repo,
        timeout = ?config.timeout,
        "loaded config"
    );
    let resolver = Resolver::new(config.git_command());

    match cli.command {
        Command::Show => {
            let result = commands::cmd_show(&resolver, &config.fields);
            output(&result, cli.json, commands::format_show_human)?;
        }
        Command::Get { key } => {
            let result = commands::cmd_get(&resolver, &config.fields, &key)?;
            output(&result, cli.json, commands::format_get_human)?;
        }
        Command::Emit {
            format,
            output: path,
        } => {
            let result = commands::cmd_emit(&resolver, &config.fields, format, path.as_deref())?;
            output(&result, cli.json, commands::format_emit_human)?;
        }
        Command::Config { .. } => {
            let result = commands::cmd_config(&config_path, &config)?;
            output(&result, cli.json, commands::format_config_human)?;
        }
    }
    Ok(())
}

fn output<T: serde::Serialize>(result: &T, json: bool, human_fn: fn(&T) -> String) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(result)?);
    } else {
        let text = human_fn(result);
        if !text.is_empty() {
            println!("{}", text);
        }
    }
    Ok(())
}
