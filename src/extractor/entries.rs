//! Arena storage for decoded debug entries.
//!
//! The loader flattens every compilation unit into one `EntryForest`: a flat
//! vector of entry records linked by explicit child/sibling indices. The
//! walker and resolver only ever read this arena; nothing here points back
//! into gimli readers or section data.

use std::collections::HashMap;

use gimli::{DwAt, DwTag};

/// Index of an entry inside the forest's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntryId(u32);

impl EntryId {
    fn index(self) -> usize {
        self.0 as usize
    }
}

/// A decoded attribute value.
///
/// `Absent` covers attributes whose form the loader does not represent
/// (flags, file indices, ...); they still show up in the structural trace as
/// `"unresolved"`.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    /// String-form attribute (names, producer strings).
    Text(String),
    /// Unsigned constant (sizes, member offsets, const values).
    Unsigned(u64),
    /// Raw expression/block bytes (location expressions).
    Block(Vec<u8>),
    /// Reference to another entry, as a global `.debug_info` offset.
    Reference(u64),
    /// Machine address (low_pc and friends).
    Address(u64),
    /// Present but carried in a form we do not decode.
    Absent,
}

/// One debug entry: tag, offset, attributes, and tree links.
#[derive(Debug)]
pub struct EntryRecord {
    offset: u64,
    tag: DwTag,
    unit: usize,
    attrs: Vec<(DwAt, AttrValue)>,
    first_child: Option<EntryId>,
    // Tail of the child list, kept so appends stay O(1) on wide levels.
    last_child: Option<EntryId>,
    next_sibling: Option<EntryId>,
}

impl EntryRecord {
    /// Global `.debug_info` offset of this entry.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// DWARF tag of this entry.
    pub fn tag(&self) -> DwTag {
        self.tag
    }

    /// Index of the compilation unit owning this entry.
    pub fn unit(&self) -> usize {
        self.unit
    }

    /// Look up an attribute by name. `None` means the attribute is missing
    /// entirely; `Some(AttrValue::Absent)` means it exists in a form the
    /// loader does not decode.
    pub fn attr(&self, name: DwAt) -> Option<&AttrValue> {
        self.attrs
            .iter()
            .find(|(at, _)| *at == name)
            .map(|(_, value)| value)
    }

    /// All attributes in declaration order, for the structural trace.
    pub fn attrs(&self) -> &[(DwAt, AttrValue)] {
        &self.attrs
    }

    /// The entry's own DW_AT_name, when it carries one as a string.
    pub fn name(&self) -> Option<&str> {
        match self.attr(gimli::DW_AT_name) {
            Some(AttrValue::Text(name)) => Some(name),
            _ => None,
        }
    }

    /// An unsigned-constant attribute, or `None` for any other form.
    pub fn unsigned(&self, name: DwAt) -> Option<u64> {
        match self.attr(name) {
            Some(AttrValue::Unsigned(value)) => Some(*value),
            _ => None,
        }
    }

    /// An address-form attribute, or `None` for any other form.
    pub fn address(&self, name: DwAt) -> Option<u64> {
        match self.attr(name) {
            Some(AttrValue::Address(value)) => Some(*value),
            _ => None,
        }
    }

    /// A reference-form attribute, or `None` for any other form.
    pub fn reference(&self, name: DwAt) -> Option<u64> {
        match self.attr(name) {
            Some(AttrValue::Reference(offset)) => Some(*offset),
            _ => None,
        }
    }

    pub fn first_child(&self) -> Option<EntryId> {
        self.first_child
    }

    pub fn next_sibling(&self) -> Option<EntryId> {
        self.next_sibling
    }
}

/// One compilation unit's header data plus its entry lookup table.
#[derive(Debug)]
pub struct UnitRecord {
    offset: u64,
    version: u16,
    address_size: u8,
    root: Option<EntryId>,
    by_offset: HashMap<u64, EntryId>,
}

impl UnitRecord {
    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn version(&self) -> u16 {
        self.version
    }

    pub fn address_size(&self) -> u8 {
        self.address_size
    }

    /// Root entry of the unit (the compile-unit entry), if any was decoded.
    pub fn root(&self) -> Option<EntryId> {
        self.root
    }

    /// Resolve a global `.debug_info` offset to an entry of this unit.
    pub fn entry_at_offset(&self, offset: u64) -> Option<EntryId> {
        self.by_offset.get(&offset).copied()
    }
}

/// The whole decoded forest: every unit and every entry of the input module.
#[derive(Debug, Default)]
pub struct EntryForest {
    entries: Vec<EntryRecord>,
    units: Vec<UnitRecord>,
    little_endian: bool,
}

impl EntryForest {
    pub fn new(little_endian: bool) -> Self {
        Self {
            entries: Vec::new(),
            units: Vec::new(),
            little_endian,
        }
    }

    pub fn is_little_endian(&self) -> bool {
        self.little_endian
    }

    pub fn entry(&self, id: EntryId) -> &EntryRecord {
        &self.entries[id.index()]
    }

    pub fn unit(&self, index: usize) -> &UnitRecord {
        &self.units[index]
    }

    pub fn units(&self) -> &[UnitRecord] {
        &self.units
    }

    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    /// Start a new compilation unit and return its index.
    pub fn begin_unit(&mut self, offset: u64, version: u16, address_size: u8) -> usize {
        self.units.push(UnitRecord {
            offset,
            version,
            address_size,
            root: None,
            by_offset: HashMap::new(),
        });
        self.units.len() - 1
    }

    /// Append an entry to a unit, linking it into the tree.
    ///
    /// With `parent == None` the entry becomes the unit root (first one wins);
    /// otherwise it is appended as the parent's last child, preserving
    /// sibling order.
    pub fn push_entry(
        &mut self,
        unit: usize,
        offset: u64,
        tag: DwTag,
        attrs: Vec<(DwAt, AttrValue)>,
        parent: Option<EntryId>,
    ) -> EntryId {
        let id = EntryId(self.entries.len() as u32);
        self.entries.push(EntryRecord {
            offset,
            tag,
            unit,
            attrs,
            first_child: None,
            last_child: None,
            next_sibling: None,
        });
        self.units[unit].by_offset.insert(offset, id);

        match parent {
            None => {
                if self.units[unit].root.is_none() {
                    self.units[unit].root = Some(id);
                }
            }
            Some(parent_id) => {
                let tail = {
                    let parent = &mut self.entries[parent_id.index()];
                    let tail = parent.last_child;
                    parent.last_child = Some(id);
                    if tail.is_none() {
                        parent.first_child = Some(id);
                    }
                    tail
                };
                if let Some(tail) = tail {
                    self.entries[tail.index()].next_sibling = Some(id);
                }
            }
        }

        id
    }
}
