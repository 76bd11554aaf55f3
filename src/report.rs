//! Secondary diagnostic log, written next to the JSON output.
//!
//! A side artifact of the CLI run: per-unit summaries plus the walk totals.
//! Nothing in the extraction core depends on it.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};

use crate::extractor::{Registry, WalkStats};

/// Write the diagnostic log for one finished run.
pub fn write_report<P: AsRef<Path>>(path: P, registry: &Registry, stats: &WalkStats) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path)
        .with_context(|| format!("failed to create log file {}", path.display()))?;
    let mut out = BufWriter::new(file);

    writeln!(out, "===== DWARF DEBUG LOG =====")?;
    writeln!(out, "Compilation units: {}", registry.debug_info.len())?;

    for trace in &registry.debug_info {
        writeln!(out)?;
        writeln!(out, "Compilation Unit #{}", trace.index)?;
        writeln!(out, "  Name: {}", trace.name)?;
        writeln!(out, "  Offset: 0x{:x}", trace.offset)?;
        writeln!(out, "  Version: {}", trace.version)?;
        writeln!(out, "  Address size: {}", trace.address_size)?;
        writeln!(out, "  Entries recorded: {}", trace.entries.len())?;
    }

    writeln!(out)?;
    writeln!(
        out,
        "Totals: {} entries visited, {} types, {} functions, {} variables, {} special pointers",
        stats.entries_visited, stats.types, stats.functions, stats.variables,
        stats.special_pointers
    )?;
    writeln!(out, "===== END OF DEBUG LOG =====")?;

    Ok(())
}
