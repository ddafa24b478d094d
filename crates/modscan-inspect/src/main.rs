#![warn(missing_docs)]

//! Entry point for the `modscan-inspect` binary.

mod cli;
mod error;
mod snapshot;

use std::{fs, process, sync::Arc};

use clap::Parser;
use modscan::{
    CodeFilter, Discovery, DiscoveryConfig, Filter, MemoryLoader, ModuleId, ReadinessGate, Value,
};
use regex::Regex;
use tokio::runtime::Builder;
use tracing::{error, info};

use crate::{
    cli::{ChunkArgs, Cli, Commands, SearchArgs},
    error::{Error, Result},
    snapshot::Snapshot,
};

fn main() {
    if let Err(err) = run() {
        error!("{err}");
        eprintln!("error: {err}");
        process::exit(1);
    }
}

/// Parse CLI arguments, install logging, load the snapshot and dispatch.
fn run() -> Result<()> {
    let Cli {
        log,
        snapshot,
        config,
        command,
    } = Cli::parse();
    logging::init_stderr(&log);

    let config = match config {
        Some(path) => {
            let text = fs::read_to_string(&path).map_err(|source| Error::Read { path, source })?;
            DiscoveryConfig::from_ron_str(&text)?
        }
        None => DiscoveryConfig::resilient(),
    };

    let loader = MemoryLoader::new();
    Snapshot::read(&snapshot)?.install(&loader);
    let discovery = ReadinessGate::global().initialize(Arc::new(loader.clone()), config)?;
    info!(snapshot = %snapshot.display(), "snapshot loaded");

    match command {
        Commands::Search(args) => search(&discovery, &args),
        Commands::FindId(args) => {
            match discovery.find_module_id(args.code.as_slice())? {
                Some(id) => println!("{id}"),
                None => println!("no factory matched"),
            }
            Ok(())
        }
        Commands::Extract { id } => {
            match discovery.extract(&ModuleId::from(id.as_str())) {
                Some(text) => print!("{text}"),
                None => println!("no factory with id {id}"),
            }
            Ok(())
        }
        Commands::Props { names } => {
            match discovery.find_with_id(&Filter::by_props(names))? {
                Some((id, value)) => println!("{id}: {}", describe(&value)),
                None => println!("no module matched"),
            }
            Ok(())
        }
        Commands::Chunks(args) => chunks(&discovery, &loader, &args),
    }
}

/// Run the `search` subcommand.
fn search(discovery: &Discovery, args: &SearchArgs) -> Result<()> {
    let filters = args
        .filters
        .iter()
        .map(|f| -> Result<CodeFilter> {
            if args.regex {
                Ok(CodeFilter::from(Regex::new(f)?))
            } else {
                Ok(CodeFilter::from(f.as_str()))
            }
        })
        .collect::<Result<Vec<_>>>()?;
    let found = discovery.search(&filters)?;
    for (id, factory) in &found {
        println!("{id}\t{} bytes", factory.source.len());
    }
    println!("{} factories matched", found.len());
    Ok(())
}

/// Run the `chunks` subcommand on a fresh current-thread runtime.
fn chunks(discovery: &Discovery, loader: &MemoryLoader, args: &ChunkArgs) -> Result<()> {
    let matcher = args.matcher.as_deref().map(Regex::new).transpose()?;
    let rt = Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(Error::Runtime)?;
    let exports = rt.block_on(
        discovery.extract_and_load_chunks(args.code.as_slice(), matcher.as_ref()),
    )?;
    for call in loader.calls() {
        println!("{call}");
    }
    match exports {
        Some(value) => println!("entry exports: {}", describe(&value)),
        None => println!("no entry point loaded"),
    }
    Ok(())
}

/// One-line summary of a value's own properties.
fn describe(value: &Value) -> String {
    let keys = value.keys();
    match value.class_name() {
        Some(class) => format!("{class} {{{}}}", keys.join(", ")),
        None => format!("{{{}}}", keys.join(", ")),
    }
}
