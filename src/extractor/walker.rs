//! Depth-first traversal of the entry forest with per-tag dispatch.
//!
//! One walker instance performs one extraction run: every compilation unit is
//! walked root-first, each visited entry is recorded into the unit's
//! structural trace and then dispatched by tag to a semantic handler. Type
//! references are resolved, never traversed, so the walk visits each entry
//! exactly once.

use log::debug;

use crate::extractor::entries::{AttrValue, EntryForest, EntryId};
use crate::extractor::location::evaluate_address;
use crate::extractor::registry::{
    AttrTrace, EntryTrace, EnumVariantDesc, FieldDesc, FunctionEntry, ParamDesc, Registry,
    SpecialPointer, TraceValue, TypeEntry, UnitTrace, VariableEntry,
};
use crate::extractor::resolver::{resolve_referenced_type, resolve_type_name};

/// Name marker identifying wasm-bindgen memory pointers.
const WBINDGEN_MARKER: &str = "__wbindgen_";

/// Counters accumulated over one extraction run.
///
/// Threaded through the walker and returned with the registry; never global
/// state.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct WalkStats {
    pub entries_visited: u64,
    pub types: u64,
    pub functions: u64,
    pub variables: u64,
    pub special_pointers: u64,
}

/// Run a full extraction over the forest.
pub fn extract(forest: &EntryForest) -> (Registry, WalkStats) {
    let mut walker = DieWalker::new(forest);
    walker.run();
    (walker.registry, walker.stats)
}

struct DieWalker<'a> {
    forest: &'a EntryForest,
    registry: Registry,
    stats: WalkStats,
    /// Trace of the unit currently being walked.
    trace: Vec<EntryTrace>,
}

impl<'a> DieWalker<'a> {
    fn new(forest: &'a EntryForest) -> Self {
        Self {
            forest,
            registry: Registry::new(),
            stats: WalkStats::default(),
            trace: Vec::new(),
        }
    }

    fn run(&mut self) {
        for (index, unit) in self.forest.units().iter().enumerate() {
            let name = unit
                .root()
                .and_then(|root| self.forest.entry(root).name())
                .unwrap_or("<noname>")
                .to_string();
            debug!(
                "walking unit #{index} ({name}) at 0x{:x}, version {}",
                unit.offset(),
                unit.version()
            );

            self.trace = Vec::new();
            if let Some(root) = unit.root() {
                self.visit(root, 0);
            }

            self.registry.add_unit_trace(UnitTrace {
                index,
                offset: unit.offset(),
                version: unit.version(),
                address_size: unit.address_size(),
                name,
                entries: std::mem::take(&mut self.trace),
            });
        }
    }

    /// Visit an entry and all of its siblings: trace, dispatch, recurse into
    /// children. Siblings are walked iteratively so recursion depth is
    /// bounded by tree nesting, not by how wide a level is.
    fn visit(&mut self, id: EntryId, depth: usize) {
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            let entry = self.forest.entry(current);
            cursor = entry.next_sibling();
            if entry.tag() == gimli::DW_TAG_null {
                continue;
            }

            self.stats.entries_visited += 1;
            self.record_trace(current, depth);
            self.dispatch(current);

            if let Some(child) = entry.first_child() {
                self.visit(child, depth + 1);
            }
        }
    }

    fn record_trace(&mut self, id: EntryId, depth: usize) {
        let entry = self.forest.entry(id);
        let attributes = entry
            .attrs()
            .iter()
            .map(|(at, value)| AttrTrace {
                name: at
                    .static_string()
                    .map_or_else(|| format!("{at}"), str::to_string),
                value: match value {
                    AttrValue::Text(text) => TraceValue::Text(text.clone()),
                    AttrValue::Unsigned(value) => TraceValue::Number(*value),
                    _ => TraceValue::unresolved(),
                },
            })
            .collect();

        self.trace.push(EntryTrace {
            offset: entry.offset(),
            tag: entry
                .tag()
                .static_string()
                .unwrap_or("UNKNOWN_TAG")
                .to_string(),
            depth,
            attributes,
        });
    }

    fn dispatch(&mut self, id: EntryId) {
        match self.forest.entry(id).tag() {
            gimli::DW_TAG_structure_type => self.handle_struct(id),
            gimli::DW_TAG_enumeration_type => self.handle_enum(id),
            gimli::DW_TAG_typedef => self.handle_typedef(id),
            gimli::DW_TAG_subprogram => self.handle_subprogram(id),
            gimli::DW_TAG_variable => self.handle_variable(id),
            gimli::DW_TAG_pointer_type => self.handle_pointer(id),
            // Everything else is structural trace only.
            _ => {}
        }
    }

    /// Display name of a type entry: its own name or `anon_<offset>`.
    fn type_display_name(&self, id: EntryId) -> String {
        let entry = self.forest.entry(id);
        entry
            .name()
            .map_or_else(|| format!("anon_{}", entry.offset()), str::to_string)
    }

    fn handle_struct(&mut self, id: EntryId) {
        let entry = self.forest.entry(id);
        let name = self.type_display_name(id);
        let size = entry.unsigned(gimli::DW_AT_byte_size).unwrap_or(0);

        let mut fields = Vec::new();
        let mut child = entry.first_child();
        while let Some(child_id) = child {
            let member = self.forest.entry(child_id);
            if member.tag() == gimli::DW_TAG_member {
                fields.push(FieldDesc {
                    name: member.name().unwrap_or("<field>").to_string(),
                    offset: member
                        .unsigned(gimli::DW_AT_data_member_location)
                        .unwrap_or(0),
                    type_name: resolve_referenced_type(self.forest, child_id),
                });
            }
            child = member.next_sibling();
        }

        self.stats.types += 1;
        self.registry.add_type(name, TypeEntry::Struct { size, fields });
    }

    fn handle_enum(&mut self, id: EntryId) {
        let entry = self.forest.entry(id);
        let name = self.type_display_name(id);

        let mut variants = Vec::new();
        let mut child = entry.first_child();
        while let Some(child_id) = child {
            let enumerator = self.forest.entry(child_id);
            if enumerator.tag() == gimli::DW_TAG_enumerator {
                variants.push(EnumVariantDesc {
                    name: enumerator.name().unwrap_or("<variant>").to_string(),
                    value: enumerator.unsigned(gimli::DW_AT_const_value).unwrap_or(0),
                });
            }
            child = enumerator.next_sibling();
        }

        self.stats.types += 1;
        self.registry.add_type(name, TypeEntry::Enum { variants });
    }

    fn handle_typedef(&mut self, id: EntryId) {
        // Anonymous typedefs carry no usable key; skip them.
        let Some(name) = self.forest.entry(id).name().map(str::to_string) else {
            return;
        };
        let base = resolve_referenced_type(self.forest, id);
        self.stats.types += 1;
        self.registry.add_type(name, TypeEntry::Typedef { base });
    }

    fn handle_subprogram(&mut self, id: EntryId) {
        let entry = self.forest.entry(id);
        let name = entry.name().unwrap_or("<unknown_function>").to_string();
        let low_pc = entry.address(gimli::DW_AT_low_pc).unwrap_or(0);
        let high_pc = entry.address(gimli::DW_AT_high_pc).unwrap_or(0);
        let return_type = match entry.reference(gimli::DW_AT_type) {
            Some(target) => resolve_type_name(
                self.forest,
                self.forest.unit(entry.unit()).entry_at_offset(target),
            ),
            None => "<unknown>".to_string(),
        };

        let mut parameters = Vec::new();
        let mut child = entry.first_child();
        while let Some(child_id) = child {
            let param = self.forest.entry(child_id);
            if param.tag() == gimli::DW_TAG_formal_parameter {
                parameters.push(ParamDesc {
                    name: param.name().unwrap_or("<param>").to_string(),
                    type_name: resolve_referenced_type(self.forest, child_id),
                });
            }
            child = param.next_sibling();
        }

        self.stats.functions += 1;
        self.registry.add_function(FunctionEntry {
            name,
            low_pc,
            high_pc,
            return_type,
            parameters,
        });
    }

    fn handle_variable(&mut self, id: EntryId) {
        let entry = self.forest.entry(id);
        let name = entry.name().unwrap_or("<var>").to_string();
        let unit = self.forest.unit(entry.unit());
        let address = match entry.attr(gimli::DW_AT_location) {
            Some(AttrValue::Block(block)) => evaluate_address(
                block,
                unit.address_size(),
                unit.version(),
                self.forest.is_little_endian(),
            ),
            _ => 0,
        };

        self.stats.variables += 1;
        self.registry.add_variable(VariableEntry { name, address });
    }

    fn handle_pointer(&mut self, id: EntryId) {
        // Only named pointers carrying the bindgen marker are surfaced;
        // ordinary pointer types stay trace-only.
        let Some(name) = self.forest.entry(id).name() else {
            return;
        };
        if name.contains(WBINDGEN_MARKER) {
            self.stats.special_pointers += 1;
            self.registry
                .add_special_pointer(SpecialPointer::memory_pointer(name.to_string()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(value: &str) -> AttrValue {
        AttrValue::Text(value.to_string())
    }

    /// A forest with one unit rooted at a compile-unit entry.
    fn forest_with_unit() -> (EntryForest, usize, EntryId) {
        let mut forest = EntryForest::new(true);
        let unit = forest.begin_unit(0, 4, 4);
        let root = forest.push_entry(
            unit,
            0x0b,
            gimli::DW_TAG_compile_unit,
            vec![(gimli::DW_AT_name, text("demo.c"))],
            None,
        );
        (forest, unit, root)
    }

    #[test]
    fn test_trace_mirrors_visited_tree() {
        let (mut forest, unit, root) = forest_with_unit();
        let ty = forest.push_entry(
            unit,
            0x20,
            gimli::DW_TAG_base_type,
            vec![
                (gimli::DW_AT_name, text("int32")),
                (gimli::DW_AT_byte_size, AttrValue::Unsigned(4)),
                (gimli::DW_AT_encoding, AttrValue::Absent),
            ],
            Some(root),
        );
        forest.push_entry(unit, 0x30, gimli::DW_TAG_lexical_block, vec![], Some(ty));

        let (registry, stats) = extract(&forest);
        assert_eq!(stats.entries_visited, 3);
        assert_eq!(registry.debug_info.len(), 1);

        let trace = &registry.debug_info[0];
        assert_eq!(trace.name, "demo.c");
        assert_eq!(trace.version, 4);
        assert_eq!(trace.address_size, 4);
        assert_eq!(trace.entries.len(), 3);
        assert_eq!(trace.entries[0].tag, "DW_TAG_compile_unit");
        assert_eq!(trace.entries[0].depth, 0);
        assert_eq!(trace.entries[1].tag, "DW_TAG_base_type");
        assert_eq!(trace.entries[1].depth, 1);
        assert_eq!(trace.entries[2].depth, 2);

        let attrs = &trace.entries[1].attributes;
        assert_eq!(attrs[0].value, TraceValue::Text("int32".to_string()));
        assert_eq!(attrs[1].value, TraceValue::Number(4));
        assert_eq!(attrs[2].value, TraceValue::unresolved());
    }

    #[test]
    fn test_unit_without_name_is_noname() {
        let mut forest = EntryForest::new(true);
        let unit = forest.begin_unit(0, 4, 4);
        forest.push_entry(unit, 0x0b, gimli::DW_TAG_compile_unit, vec![], None);

        let (registry, _) = extract(&forest);
        assert_eq!(registry.debug_info[0].name, "<noname>");
    }

    #[test]
    fn test_struct_fields_in_sibling_order() {
        let (mut forest, unit, root) = forest_with_unit();
        forest.push_entry(
            unit,
            0x100,
            gimli::DW_TAG_base_type,
            vec![(gimli::DW_AT_name, text("int32"))],
            Some(root),
        );
        let s = forest.push_entry(
            unit,
            0x40,
            gimli::DW_TAG_structure_type,
            vec![
                (gimli::DW_AT_name, text("S")),
                (gimli::DW_AT_byte_size, AttrValue::Unsigned(8)),
            ],
            Some(root),
        );
        forest.push_entry(
            unit,
            0x48,
            gimli::DW_TAG_member,
            vec![
                (gimli::DW_AT_name, text("A")),
                (gimli::DW_AT_data_member_location, AttrValue::Unsigned(0)),
                (gimli::DW_AT_type, AttrValue::Reference(0x100)),
            ],
            Some(s),
        );
        forest.push_entry(
            unit,
            0x50,
            gimli::DW_TAG_member,
            vec![
                (gimli::DW_AT_name, text("B")),
                (gimli::DW_AT_data_member_location, AttrValue::Unsigned(4)),
                (gimli::DW_AT_type, AttrValue::Reference(0x100)),
            ],
            Some(s),
        );

        let (registry, stats) = extract(&forest);
        assert_eq!(stats.types, 1);
        assert_eq!(
            registry.types["S"],
            TypeEntry::Struct {
                size: 8,
                fields: vec![
                    FieldDesc {
                        name: "A".to_string(),
                        offset: 0,
                        type_name: "int32".to_string(),
                    },
                    FieldDesc {
                        name: "B".to_string(),
                        offset: 4,
                        type_name: "int32".to_string(),
                    },
                ],
            }
        );
    }

    #[test]
    fn test_anonymous_structs_get_distinct_keys() {
        let (mut forest, unit, root) = forest_with_unit();
        forest.push_entry(unit, 0x40, gimli::DW_TAG_structure_type, vec![], Some(root));
        forest.push_entry(unit, 0x60, gimli::DW_TAG_structure_type, vec![], Some(root));

        let (registry, _) = extract(&forest);
        assert!(registry.types.contains_key("anon_64"));
        assert!(registry.types.contains_key("anon_96"));
        assert_eq!(registry.types.len(), 2);
    }

    #[test]
    fn test_enum_variants() {
        let (mut forest, unit, root) = forest_with_unit();
        let e = forest.push_entry(
            unit,
            0x40,
            gimli::DW_TAG_enumeration_type,
            vec![(gimli::DW_AT_name, text("E"))],
            Some(root),
        );
        forest.push_entry(
            unit,
            0x48,
            gimli::DW_TAG_enumerator,
            vec![
                (gimli::DW_AT_name, text("X")),
                (gimli::DW_AT_const_value, AttrValue::Unsigned(0)),
            ],
            Some(e),
        );
        forest.push_entry(
            unit,
            0x50,
            gimli::DW_TAG_enumerator,
            vec![
                (gimli::DW_AT_name, text("Y")),
                (gimli::DW_AT_const_value, AttrValue::Unsigned(1)),
            ],
            Some(e),
        );

        let (registry, _) = extract(&forest);
        assert_eq!(
            registry.types["E"],
            TypeEntry::Enum {
                variants: vec![
                    EnumVariantDesc {
                        name: "X".to_string(),
                        value: 0,
                    },
                    EnumVariantDesc {
                        name: "Y".to_string(),
                        value: 1,
                    },
                ],
            }
        );
    }

    #[test]
    fn test_typedef_base_resolution() {
        let (mut forest, unit, root) = forest_with_unit();
        forest.push_entry(
            unit,
            0x100,
            gimli::DW_TAG_base_type,
            vec![(gimli::DW_AT_name, text("unsigned int"))],
            Some(root),
        );
        forest.push_entry(
            unit,
            0x40,
            gimli::DW_TAG_typedef,
            vec![
                (gimli::DW_AT_name, text("uint32_t")),
                (gimli::DW_AT_type, AttrValue::Reference(0x100)),
            ],
            Some(root),
        );
        // Anonymous typedefs are skipped entirely.
        forest.push_entry(unit, 0x60, gimli::DW_TAG_typedef, vec![], Some(root));

        let (registry, _) = extract(&forest);
        assert_eq!(registry.types.len(), 1);
        assert_eq!(
            registry.types["uint32_t"],
            TypeEntry::Typedef {
                base: "unsigned int".to_string(),
            }
        );
    }

    #[test]
    fn test_subprogram_parameters_in_order() {
        let (mut forest, unit, root) = forest_with_unit();
        forest.push_entry(
            unit,
            0x100,
            gimli::DW_TAG_base_type,
            vec![(gimli::DW_AT_name, text("int"))],
            Some(root),
        );
        let f = forest.push_entry(
            unit,
            0x40,
            gimli::DW_TAG_subprogram,
            vec![
                (gimli::DW_AT_name, text("add")),
                (gimli::DW_AT_low_pc, AttrValue::Address(0x1000)),
                (gimli::DW_AT_high_pc, AttrValue::Address(0x1080)),
                (gimli::DW_AT_type, AttrValue::Reference(0x100)),
            ],
            Some(root),
        );
        forest.push_entry(
            unit,
            0x48,
            gimli::DW_TAG_formal_parameter,
            vec![
                (gimli::DW_AT_name, text("a")),
                (gimli::DW_AT_type, AttrValue::Reference(0x100)),
            ],
            Some(f),
        );
        forest.push_entry(
            unit,
            0x50,
            gimli::DW_TAG_formal_parameter,
            vec![
                (gimli::DW_AT_name, text("b")),
                (gimli::DW_AT_type, AttrValue::Reference(0x100)),
            ],
            Some(f),
        );

        let (registry, stats) = extract(&forest);
        assert_eq!(stats.functions, 1);
        let function = &registry.functions[0];
        assert_eq!(function.name, "add");
        assert_eq!(function.low_pc, 0x1000);
        assert_eq!(function.high_pc, 0x1080);
        assert_eq!(function.return_type, "int");
        assert_eq!(function.parameters.len(), 2);
        assert_eq!(function.parameters[0].name, "a");
        assert_eq!(function.parameters[1].name, "b");
    }

    #[test]
    fn test_subprogram_defaults() {
        let (mut forest, unit, root) = forest_with_unit();
        forest.push_entry(unit, 0x40, gimli::DW_TAG_subprogram, vec![], Some(root));

        let (registry, _) = extract(&forest);
        let function = &registry.functions[0];
        assert_eq!(function.name, "<unknown_function>");
        assert_eq!(function.low_pc, 0);
        assert_eq!(function.high_pc, 0);
        assert_eq!(function.return_type, "<unknown>");
        assert!(function.parameters.is_empty());
    }

    #[test]
    fn test_variable_address_from_location_block() {
        let (mut forest, unit, root) = forest_with_unit();
        forest.push_entry(
            unit,
            0x40,
            gimli::DW_TAG_variable,
            vec![
                (gimli::DW_AT_name, text("counter")),
                (
                    gimli::DW_AT_location,
                    AttrValue::Block(vec![0x03, 0x00, 0x10, 0x00, 0x00]),
                ),
            ],
            Some(root),
        );
        forest.push_entry(
            unit,
            0x50,
            gimli::DW_TAG_variable,
            vec![(gimli::DW_AT_name, text("local"))],
            Some(root),
        );

        let (registry, stats) = extract(&forest);
        assert_eq!(stats.variables, 2);
        assert_eq!(registry.variables[0].name, "counter");
        assert_eq!(registry.variables[0].address, 0x1000);
        assert_eq!(registry.variables[1].name, "local");
        assert_eq!(registry.variables[1].address, 0);
    }

    #[test]
    fn test_bindgen_pointer_detection() {
        let (mut forest, unit, root) = forest_with_unit();
        forest.push_entry(
            unit,
            0x40,
            gimli::DW_TAG_pointer_type,
            vec![(gimli::DW_AT_name, text("__wbindgen_malloc"))],
            Some(root),
        );
        forest.push_entry(
            unit,
            0x50,
            gimli::DW_TAG_pointer_type,
            vec![(gimli::DW_AT_name, text("foo"))],
            Some(root),
        );
        forest.push_entry(unit, 0x60, gimli::DW_TAG_pointer_type, vec![], Some(root));

        let (registry, stats) = extract(&forest);
        assert_eq!(stats.special_pointers, 1);
        assert_eq!(registry.wasm_special.pointers.len(), 1);
        assert_eq!(registry.wasm_special.pointers[0].name, "__wbindgen_malloc");
    }

    #[test]
    fn test_multiple_units_traced_in_order() {
        let mut forest = EntryForest::new(true);
        for i in 0..3u64 {
            let unit = forest.begin_unit(i * 0x100, 4, 4);
            forest.push_entry(
                unit,
                i * 0x100 + 0x0b,
                gimli::DW_TAG_compile_unit,
                vec![(gimli::DW_AT_name, text(&format!("cu{i}.c")))],
                None,
            );
        }

        let (registry, _) = extract(&forest);
        assert_eq!(registry.debug_info.len(), 3);
        for (i, trace) in registry.debug_info.iter().enumerate() {
            assert_eq!(trace.index, i);
            assert_eq!(trace.offset, i as u64 * 0x100);
            assert_eq!(trace.name, format!("cu{i}.c"));
        }
    }

    #[test]
    fn test_wide_unit_walks_without_deep_recursion() {
        // Sibling chains are walked iteratively; a level with a hundred
        // thousand entries must not exhaust the stack.
        let (mut forest, unit, root) = forest_with_unit();
        for i in 0..100_000u64 {
            forest.push_entry(
                unit,
                0x100 + i,
                gimli::DW_TAG_base_type,
                vec![(gimli::DW_AT_name, text("u8"))],
                Some(root),
            );
        }

        let (registry, stats) = extract(&forest);
        assert_eq!(stats.entries_visited, 100_001);
        assert_eq!(registry.debug_info[0].entries.len(), 100_001);
    }

    #[test]
    fn test_null_entry_skipped_but_siblings_continue() {
        let (mut forest, unit, root) = forest_with_unit();
        forest.push_entry(unit, 0x40, gimli::DW_TAG_null, vec![], Some(root));
        forest.push_entry(
            unit,
            0x50,
            gimli::DW_TAG_variable,
            vec![(gimli::DW_AT_name, text("after_null"))],
            Some(root),
        );

        let (registry, stats) = extract(&forest);
        // The null entry is neither traced nor counted; the walk goes on.
        assert_eq!(stats.entries_visited, 2);
        assert_eq!(registry.variables[0].name, "after_null");
    }

    #[test]
    fn test_extraction_is_idempotent() {
        let (mut forest, unit, root) = forest_with_unit();
        forest.push_entry(
            unit,
            0x40,
            gimli::DW_TAG_structure_type,
            vec![(gimli::DW_AT_name, text("S"))],
            Some(root),
        );
        forest.push_entry(
            unit,
            0x50,
            gimli::DW_TAG_variable,
            vec![(gimli::DW_AT_name, text("v"))],
            Some(root),
        );

        let (first, _) = extract(&forest);
        let (second, _) = extract(&forest);
        assert_eq!(first.to_json().unwrap(), second.to_json().unwrap());
    }
}
