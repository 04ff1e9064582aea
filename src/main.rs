use clap::Parser;
use anyhow::{Context, Result};
use std::sync::Arc;

use diffsync::{
    cli::{Cli, OutputFormat},
    config::DiffSyncConfig,
    core::{DiffOrchestrator, EngineRegistry, SelectionMode},
    diff::{DiffFormatter, DiffResult, Layout, SideBySideResult},
};

fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Err(err) = cli.validate() {
        eprintln!("Error: {}", err);
        std::process::exit(1);
    }

    cli.setup_logging();

    let mut config = DiffSyncConfig::load_or_default(cli.config.as_ref())?;
    config.apply_env();
    if let Err(err) = config.validate() {
        eprintln!("Error: invalid configuration: {}", err);
        std::process::exit(1);
    }

    let left = std::fs::read_to_string(&cli.left)
        .with_context(|| format!("Failed to read {}", cli.left.display()))?;
    let right = std::fs::read_to_string(&cli.right)
        .with_context(|| format!("Failed to read {}", cli.right.display()))?;

    let registry = Arc::new(EngineRegistry::with_builtin_engines());
    config.apply_engine_defaults(&registry);

    let mut orchestrator = DiffOrchestrator::with_config(registry, config.orchestrator.clone());
    orchestrator.set_diff_mode(cli.mode);

    let (selection, engine_id) = cli.selection();
    tracing::debug!(
        "Comparing {} with {} ({:?} selection)",
        cli.left.display(),
        cli.right.display(),
        selection
    );

    let ok = match cli.layout {
        Layout::Inline => {
            let result = run_inline(&orchestrator, &cli, &left, &right, selection, &engine_id);
            print_inline(&result, &cli)?;
            result.ok
        }
        Layout::SideBySide => {
            let result = run_side_by_side(&orchestrator, &cli, &left, &right, selection, &engine_id);
            print_side_by_side(&result, &cli)?;
            result.ok()
        }
    };

    if !ok {
        if let Some(kind) = orchestrator.last_error() {
            eprintln!("Error: {}", kind);
        }
        std::process::exit(1);
    }

    Ok(())
}

fn run_inline(
    orchestrator: &DiffOrchestrator,
    cli: &Cli,
    left: &str,
    right: &str,
    selection: SelectionMode,
    engine_id: &str,
) -> DiffResult {
    if cli.use_async {
        orchestrator.compute_async(left, right, selection, engine_id).wait()
    } else {
        orchestrator.compute_sync(left, right, selection, engine_id)
    }
}

fn run_side_by_side(
    orchestrator: &DiffOrchestrator,
    cli: &Cli,
    left: &str,
    right: &str,
    selection: SelectionMode,
    engine_id: &str,
) -> SideBySideResult {
    if cli.use_async {
        orchestrator
            .compute_side_by_side_async(left, right, selection, engine_id)
            .wait()
    } else {
        orchestrator.compute_side_by_side_sync(left, right, selection, engine_id)
    }
}

fn print_inline(result: &DiffResult, cli: &Cli) -> Result<()> {
    match cli.output {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(result)?),
        OutputFormat::Text => {
            let formatted = DiffFormatter::format_inline(result, &cli.left, &cli.right);
            for line in formatted.lines() {
                print_colored(line, cli.no_color);
            }
            println!();
            println!("{}", DiffFormatter::format_stats(result));
        }
    }
    Ok(())
}

fn print_side_by_side(result: &SideBySideResult, cli: &Cli) -> Result<()> {
    match cli.output {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(result)?),
        OutputFormat::Text => {
            println!(
                "{}",
                DiffFormatter::format_side_by_side(result, &cli.left, &cli.right, cli.width)
            );
            if !result.engine_used.is_empty() {
                println!();
                println!("engine: {}", result.engine_used);
            }
        }
    }
    Ok(())
}

fn print_colored(line: &str, no_color: bool) {
    if no_color || line.starts_with("---") || line.starts_with("+++") {
        println!("{}", line);
    } else if line.starts_with('+') {
        println!("\x1b[32m{}\x1b[0m", line); // Green
    } else if line.starts_with('-') || line.starts_with('!') {
        println!("\x1b[31m{}\x1b[0m", line); // Red
    } else {
        println!("{}", line);
    }
}
