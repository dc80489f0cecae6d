// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! spacey-harness - resolve modules and run built bundles
//!
//! ## Commands
//!
//! - `run` executes a bundle (or an HTML entry) in a simulated runtime and
//!   prints the exported value as JSON
//! - `resolve` prints where a specifier resolves from a given file

mod config;

use anyhow::{Context, Result, anyhow};
use clap::{Args, Parser, Subcommand};
use config::HarnessConfig;
use owo_colors::OwoColorize;
use spacey_resolve::path::normalize_path;
use spacey_resolve::{OsFs, Resolved, Resolver};
use spacey_sandbox::{
    Bundle, BundleGraph, ConsoleLevel, ConsoleMessage, Environment, Globals, Outcome, RunOptions,
    Sandbox,
};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::debug;

#[derive(Parser)]
#[command(
    name = "spacey-harness",
    about = "Resolve modules and run built bundles in simulated runtimes",
    version,
    author = "Pegasus Heavy Industries"
)]
struct Cli {
    /// Enable verbose logging
    #[arg(long, global = true)]
    verbose: bool,

    /// Configuration file used instead of ./spacey-harness.toml
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a bundle and print what it exports
    Run(RunArgs),
    /// Resolve a module specifier
    Resolve(ResolveArgs),
}

#[derive(Args)]
struct RunArgs {
    /// Bundle (.js) or HTML entry to run
    file: PathBuf,

    /// Bundle graph manifest (JSON) the file belongs to
    #[arg(long, value_name = "MANIFEST")]
    graph: Option<PathBuf>,

    /// Target runtime when no graph is given
    #[arg(long, default_value = "browser")]
    context: String,

    /// Output format when no graph is given
    #[arg(long, default_value = "global")]
    format: String,

    /// The bundle was built with scope hoisting
    #[arg(long)]
    scope_hoist: bool,

    /// Public id of the entry asset
    #[arg(long = "entry-id", value_name = "ID")]
    entry_id: Option<String>,

    /// Global override, repeatable
    #[arg(long = "global", value_name = "KEY=JSON", value_parser = parse_global)]
    globals: Vec<(String, serde_json::Value)>,

    /// Print console output only, without extracting exports
    #[arg(long)]
    no_require: bool,
}

#[derive(Args)]
struct ResolveArgs {
    /// Specifier as written in source
    specifier: String,

    /// File the specifier appears in
    #[arg(long, value_name = "FILE")]
    from: PathBuf,

    /// Extension to probe, repeatable (replaces the configured list)
    #[arg(long = "ext", value_name = "EXT")]
    extensions: Vec<String>,

    /// Resolve as a production build
    #[arg(long)]
    production: bool,
}

fn parse_global(raw: &str) -> Result<(String, serde_json::Value), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=JSON, got '{raw}'"))?;
    if key.is_empty() {
        return Err("global name is empty".to_string());
    }
    let value = serde_json::from_str(value)
        .unwrap_or_else(|_| serde_json::Value::String(value.to_string()));
    Ok((key.to_string(), value))
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match HarnessConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}: {:#}", "Error".red().bold(), e);
            return ExitCode::FAILURE;
        }
    };

    // Initialize logging
    let filter = if cli.verbose {
        "spacey_resolve=debug,spacey_sandbox=debug,spacey_harness=debug".to_string()
    } else {
        config.sandbox.log_level.clone()
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let result = match &cli.command {
        Command::Run(args) => run(args, &config).await,
        Command::Resolve(args) => resolve(args, &config),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}: {:#}", "Error".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

fn absolute(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        return Ok(normalize_path(path));
    }
    let cwd = std::env::current_dir().context("failed to read the current directory")?;
    Ok(normalize_path(&cwd.join(path)))
}

async fn run(args: &RunArgs, config: &HarnessConfig) -> Result<()> {
    let file = absolute(&args.file)?;

    let graph = match &args.graph {
        Some(manifest) => {
            let bytes = tokio::fs::read(manifest)
                .await
                .with_context(|| format!("failed to read {}", manifest.display()))?;
            BundleGraph::from_json(&bytes)?
        }
        None => {
            let env = Environment::new(args.context.as_str(), args.format.as_str())
                .scope_hoisted(args.scope_hoist);
            let is_html = file
                .extension()
                .is_some_and(|ext| ext == "html" || ext == "htm");
            let mut bundle = if is_html {
                Bundle::html(&file, env)
            } else {
                Bundle::js(&file, env)
            };
            bundle.entry_public_id = args.entry_id.clone();
            BundleGraph::new(vec![bundle])
        }
    };
    let bundle = graph
        .find_by_path(&file)
        .ok_or_else(|| anyhow!("{} is not in the bundle graph", file.display()))?;

    debug!(
        path = %bundle.file_path.display(),
        context = %bundle.env.context,
        "running bundle"
    );

    let globals: Globals = args.globals.iter().cloned().collect();
    let options = RunOptions {
        require: !args.no_require,
    };
    let sandbox = Sandbox::with_config(Arc::new(OsFs), config.sandbox_config());
    let mut outcome = sandbox.run_bundle(&graph, bundle, &globals, options).await?;

    print_console(&outcome.context().console());
    if let Outcome::Exports(exports) = &mut outcome {
        if exports.value().is_undefined() {
            println!("{}", "undefined".dimmed());
        } else {
            let json = exports.to_json()?;
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
    }
    Ok(())
}

fn print_console(messages: &[ConsoleMessage]) {
    for message in messages {
        let level = format!("[{}]", message.level);
        match message.level {
            ConsoleLevel::Error => eprintln!("{} {}", level.red().bold(), message.text),
            ConsoleLevel::Warn => eprintln!("{} {}", level.yellow(), message.text),
            ConsoleLevel::Debug => eprintln!("{} {}", level.dimmed(), message.text),
            ConsoleLevel::Log | ConsoleLevel::Info => {
                eprintln!("{} {}", level.cyan(), message.text)
            }
        }
    }
}

fn resolve(args: &ResolveArgs, config: &HarnessConfig) -> Result<()> {
    let mut options = config.resolver_options();
    if !args.extensions.is_empty() {
        options = options.with_extensions(&args.extensions);
    }
    if args.production {
        options.source_policy.production = true;
    }

    let from = absolute(&args.from)?;
    debug!(specifier = %args.specifier, from = %from.display(), "resolving");
    let resolver = Resolver::with_options(Arc::new(OsFs), options);
    let result = resolver.resolve(&args.specifier, &from)?;

    match &result.resolved {
        Resolved::Builtin(name) => println!("{} {}", "builtin".magenta(), name.green()),
        Resolved::File(path) => println!("{}", path.display().green()),
    }
    if let Some(pkg) = &result.pkg {
        let name = pkg.name.as_deref().unwrap_or("<unnamed>");
        println!("{} {} ({})", "package".dimmed(), name.cyan(), pkg.file().display());
    }
    Ok(())
}
