//! DWARFEX - DWARF debug-information extractor for ELF and wasm modules
//!
//! This library walks the debug entries of a binary module and produces a
//! normalized JSON registry of its types, functions, and variables. It can be
//! used both as a standalone command-line tool and as a library.

pub mod extractor;
pub mod loader;
pub mod report;

/// Re-export key types for easier access in tests
pub use extractor::{extract, AttrValue, EntryForest, EntryId, Registry, WalkStats};
pub use loader::load_file;

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const PKG_NAME: &str = env!("CARGO_PKG_NAME");
pub const PKG_DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

/// Initialize the logging system
pub fn init_logging(level: log::LevelFilter) {
    env_logger::Builder::new()
        .filter_level(level)
        .filter_module("dwarfex", level)
        .format_timestamp_secs()
        .init();
}
