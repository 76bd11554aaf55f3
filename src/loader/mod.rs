//! Loading boundary: file reading, object-format recognition, DWARF section
//! discovery, and flattening of the decoded entry tree into an
//! [`EntryForest`].
//!
//! All three fatal error classes of a run surface here, before any traversal
//! starts. The `object` crate dispatches between ELF and WebAssembly
//! containers (its `wasm` feature covers the DWARF custom sections of
//! wasm-bindgen output); `gimli` decodes the entries.

use std::borrow::Cow;
use std::path::Path;

use gimli::{EndianSlice, RunTimeEndian};
use log::{debug, info};
use object::{Object, ObjectSection};
use thiserror::Error;

use crate::extractor::{AttrValue, EntryForest, EntryId};

/// Fatal load failures; each aborts the run before traversal.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read input file: {0}")]
    Io(#[from] std::io::Error),
    #[error("unrecognized object format: {0}")]
    Object(#[from] object::Error),
    #[error("failed to build DWARF context: {0}")]
    Dwarf(#[from] gimli::Error),
}

type Reader<'data> = EndianSlice<'data, RunTimeEndian>;

/// Read a binary module and decode its debug entries into a forest.
pub fn load_file<P: AsRef<Path>>(path: P) -> Result<EntryForest, LoadError> {
    let data = std::fs::read(path)?;
    load_bytes(&data)
}

/// Decode an in-memory ELF or wasm module into a forest.
pub fn load_bytes(data: &[u8]) -> Result<EntryForest, LoadError> {
    let file = object::File::parse(data)?;
    let endian = if file.is_little_endian() {
        RunTimeEndian::Little
    } else {
        RunTimeEndian::Big
    };

    // Borrow each DWARF section out of the container; absent sections decode
    // as empty.
    let load_section = |id: gimli::SectionId| -> Result<Cow<[u8]>, gimli::Error> {
        Ok(file
            .section_by_name(id.name())
            .and_then(|section| section.uncompressed_data().ok())
            .unwrap_or(Cow::Borrowed(&[][..])))
    };
    let sections = gimli::DwarfSections::load(load_section)?;
    let dwarf = sections.borrow(|section| EndianSlice::new(section, endian));

    let mut forest = EntryForest::new(file.is_little_endian());
    let mut headers = dwarf.units();
    while let Some(header) = headers.next()? {
        let unit = dwarf.unit(header)?;
        flatten_unit(&dwarf, &unit, &mut forest)?;
    }

    info!(
        "loaded {} compilation units ({} entries)",
        forest.units().len(),
        forest.entry_count()
    );
    Ok(forest)
}

/// Copy one unit's entry tree into the forest, depth-first.
fn flatten_unit(
    dwarf: &gimli::Dwarf<Reader>,
    unit: &gimli::Unit<Reader>,
    forest: &mut EntryForest,
) -> Result<(), gimli::Error> {
    let unit_offset = unit
        .header
        .offset()
        .as_debug_info_offset()
        .map_or(0, |offset| offset.0 as u64);
    let index = forest.begin_unit(
        unit_offset,
        unit.header.version(),
        unit.header.address_size(),
    );
    debug!("decoding unit at 0x{unit_offset:x}");

    // Parent entry per depth level; next_dfs yields the depth delta.
    let mut parents: Vec<EntryId> = Vec::new();
    let mut depth: isize = 0;
    let mut cursor = unit.entries();
    while let Some((delta, entry)) = cursor.next_dfs()? {
        depth += delta;
        let level = depth.max(0) as usize;
        parents.truncate(level);

        let offset = entry
            .offset()
            .to_debug_info_offset(&unit.header)
            .map_or(0, |global| global.0 as u64);

        let mut attrs = Vec::new();
        let mut iter = entry.attrs();
        while let Some(attr) = iter.next()? {
            attrs.push((attr.name(), convert_attr(dwarf, unit, attr.value())));
        }

        let parent = parents.last().copied();
        let id = forest.push_entry(index, offset, entry.tag(), attrs, parent);
        parents.push(id);
    }

    Ok(())
}

/// Map a gimli attribute value onto the forest's representation.
///
/// String forms go through the DWARF string tables; constants, blocks,
/// references, and addresses keep their payloads. Anything else is recorded
/// as present-but-undecoded.
fn convert_attr(
    dwarf: &gimli::Dwarf<Reader>,
    unit: &gimli::Unit<Reader>,
    value: gimli::AttributeValue<Reader>,
) -> AttrValue {
    use gimli::AttributeValue;

    match value {
        AttributeValue::Addr(address) => AttrValue::Address(address),
        AttributeValue::Udata(v) => AttrValue::Unsigned(v),
        AttributeValue::Data1(v) => AttrValue::Unsigned(u64::from(v)),
        AttributeValue::Data2(v) => AttrValue::Unsigned(u64::from(v)),
        AttributeValue::Data4(v) => AttrValue::Unsigned(u64::from(v)),
        AttributeValue::Data8(v) => AttrValue::Unsigned(v),
        AttributeValue::Sdata(v) => AttrValue::Unsigned(v as u64),
        AttributeValue::Exprloc(expression) => AttrValue::Block(expression.0.slice().to_vec()),
        AttributeValue::Block(block) => AttrValue::Block(block.slice().to_vec()),
        AttributeValue::UnitRef(offset) => offset
            .to_debug_info_offset(&unit.header)
            .map_or(AttrValue::Absent, |global| {
                AttrValue::Reference(global.0 as u64)
            }),
        AttributeValue::DebugInfoRef(offset) => AttrValue::Reference(offset.0 as u64),
        other => match dwarf.attr_string(unit, other) {
            Ok(slice) => AttrValue::Text(String::from_utf8_lossy(slice.slice()).into_owned()),
            Err(_) => AttrValue::Absent,
        },
    }
}
