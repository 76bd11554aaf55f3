//! Debug-information extraction core.
//!
//! Operates on an already-decoded [`entries::EntryForest`]; produces a
//! [`registry::Registry`] ready for JSON serialization. Raw DWARF decoding
//! lives in the loader, not here.

pub mod entries;
pub mod location;
pub mod registry;
pub mod resolver;
pub mod walker;

pub use entries::{AttrValue, EntryForest, EntryId};
pub use registry::Registry;
pub use walker::{extract, WalkStats};
