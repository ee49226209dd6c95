use std::io;

use anyhow::{anyhow, Result};
use clap::Parser;
use serde_json::{json, Value};
use sozin_core::{
    build_engine, dispatch_command, engine_config, is_root, resolve_root, Cli, Commands,
    HandlerResult, Menu, OutputFormat,
};
use tracing::level_filters::LevelFilter;
use tracing::info;

fn main() {
    let cli = Cli::parse();
    let format = cli.output_format;

    if !is_root() {
        emit_error(format, &anyhow!("sozin must be run as root"));
        std::process::exit(1);
    }

    match run(cli, format) {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(err) => {
            emit_error(format, &err);
            std::process::exit(1);
        }
    }
}

/// Returns false when an operation ran and failed.
fn run(cli: Cli, format: OutputFormat) -> Result<bool> {
    let root = resolve_root(cli.root.clone());
    let log_cfg = sozin_logging::read_config(&root);
    let _log_guards = sozin_logging::init("sozin", &root, &log_cfg, LevelFilter::WARN)?;

    let config = engine_config(&cli);
    info!(
        root = %root.display(),
        step_timeout_ms = config.step_timeout.as_millis() as u64,
        verify = config.verify_postconditions,
        recovery = ?config.recovery,
        "sozin starting"
    );
    let engine = build_engine(config);

    match cli.command.unwrap_or(Commands::Menu) {
        Commands::Menu => {
            let stdin = io::stdin();
            Menu::new(&engine, stdin.lock(), io::stdout()).run()?;
            Ok(true)
        }
        command => {
            let result = dispatch_command(&engine, command)?;
            emit_result(format, &result)?;
            Ok(result.ok)
        }
    }
}

fn emit_result(format: OutputFormat, result: &HandlerResult) -> Result<()> {
    let status = if result.ok { "ok" } else { "failed" };
    match format {
        OutputFormat::Json => {
            let payload = json!({
                "status": status,
                "message": result.message,
                "data": result.data,
            });
            println!("{}", payload);
        }
        OutputFormat::Text => println!("{}", result.message),
    }
    Ok(())
}

fn emit_error(format: OutputFormat, err: &anyhow::Error) {
    let details: Vec<String> = err.chain().map(|cause| cause.to_string()).collect();
    let payload = json!({
        "status": "error",
        "message": err.to_string(),
        "details": details,
        "data": Value::Null,
    });

    match format {
        OutputFormat::Json => println!("{}", payload),
        OutputFormat::Text => {
            eprintln!("Error: {}", err);
            for detail in details.iter().skip(1) {
                eprintln!("  -> {}", detail);
            }
        }
    }
}
