mod extractor;
mod loader;
mod report;

use std::env;
use std::path::Path;
use std::process;

use anyhow::{Context, Result};
use log::{error, info, LevelFilter};

/// DWARFEX - DWARF debug-information extractor for ELF and wasm modules
fn main() -> Result<()> {
    // Initialize logging
    env_logger::Builder::new()
        .filter_level(LevelFilter::Info)
        .filter_module("dwarfex", LevelFilter::Debug)
        .format_timestamp_secs()
        .init();

    // Parse command line arguments
    let args: Vec<String> = env::args().collect();

    let mut input = String::new();
    let mut output = String::new();
    for arg in &args[1..] {
        match arg.as_str() {
            // Version
            "-v" | "--version" => {
                println!("DWARFEX v{}", env!("CARGO_PKG_VERSION"));
                println!("DWARF debug-information extractor for ELF and WebAssembly modules");
                process::exit(0);
            }
            // Help
            "-h" | "--help" => {
                print_usage(&args[0]);
                process::exit(0);
            }
            // Positional: input path, then output path
            arg => {
                if input.is_empty() {
                    input = arg.to_string();
                } else if output.is_empty() {
                    output = arg.to_string();
                }
            }
        }
    }

    if input.is_empty() || output.is_empty() {
        print_usage(&args[0]);
        process::exit(1);
    }

    if !Path::new(&input).exists() {
        error!("Input file not found: {}", input);
        process::exit(1);
    }

    if let Err(e) = run(&input, &output) {
        error!("Extraction failed: {:#}", e);
        process::exit(1);
    }

    Ok(())
}

/// Run one extraction: load, walk, serialize, write the side log.
fn run(input: &str, output: &str) -> Result<()> {
    info!("Extracting debug information from {}", input);

    let forest = loader::load_file(input)
        .with_context(|| format!("failed to load {}", input))?;

    let (registry, stats) = extractor::extract(&forest);
    info!(
        "Walked {} entries: {} types, {} functions, {} variables",
        stats.entries_visited, stats.types, stats.functions, stats.variables
    );

    let json = registry.to_json().context("failed to serialize registry")?;
    std::fs::write(output, json)
        .with_context(|| format!("failed to write output {}", output))?;

    // Diagnostic side artifact next to the JSON output
    let log_path = format!("{}.log", output);
    report::write_report(&log_path, &registry, &stats)?;

    info!("JSON output written to: {}", output);
    info!("Debug information written to: {}", log_path);
    Ok(())
}

/// Print usage information
fn print_usage(program_name: &str) {
    println!("DWARFEX - DWARF debug-information extractor");
    println!("Usage: {} [options] <input> <output.json>", program_name);
    println!();
    println!("Arguments:");
    println!("  input          ELF or WebAssembly module with DWARF sections");
    println!("  output.json    Destination for the extracted registry");
    println!();
    println!("Options:");
    println!("  -h, --help     Display this help message");
    println!("  -v, --version  Display version information");
    println!();
    println!("A diagnostic log is written next to the output as <output.json>.log");
}
