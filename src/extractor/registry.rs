//! The extraction registry: normalized types, functions, and variables,
//! plus the structural per-unit traces, in their serialized JSON shape.

use std::collections::BTreeMap;

use serde::Serialize;

/// One extracted type, keyed in `Registry::types` by display name.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum TypeEntry {
    Struct { size: u64, fields: Vec<FieldDesc> },
    Enum { variants: Vec<EnumVariantDesc> },
    Typedef { base: String },
}

/// A struct field, in sibling order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldDesc {
    pub name: String,
    pub offset: u64,
    #[serde(rename = "type")]
    pub type_name: String,
}

/// An enumerator, in sibling order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnumVariantDesc {
    pub name: String,
    pub value: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FunctionEntry {
    pub name: String,
    pub low_pc: u64,
    pub high_pc: u64,
    pub return_type: String,
    pub parameters: Vec<ParamDesc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParamDesc {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
}

/// A variable and its resolved static address (0 when unresolved).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VariableEntry {
    pub name: String,
    pub address: u64,
}

/// A pointer entry whose name carries the wasm-bindgen memory-pointer marker.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpecialPointer {
    pub name: String,
    pub bindgen_type: &'static str,
}

impl SpecialPointer {
    pub fn memory_pointer(name: String) -> Self {
        Self {
            name,
            bindgen_type: "memory_pointer",
        }
    }
}

/// Attribute value as it appears in the structural trace: a string, an
/// unsigned constant, or the literal `"unresolved"` for any other form.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TraceValue {
    Text(String),
    Number(u64),
}

impl TraceValue {
    pub fn unresolved() -> Self {
        TraceValue::Text("unresolved".to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttrTrace {
    pub name: String,
    pub value: TraceValue,
}

/// Structural snapshot of one visited entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntryTrace {
    pub offset: u64,
    pub tag: String,
    pub depth: usize,
    pub attributes: Vec<AttrTrace>,
}

/// Structural mirror of one compilation unit's visited tree, kept separate
/// from the semantic registry for diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnitTrace {
    pub index: usize,
    pub offset: u64,
    pub version: u16,
    pub address_size: u8,
    pub name: String,
    #[serde(rename = "dies")]
    pub entries: Vec<EntryTrace>,
}

/// wasm-bindgen pointer markers, emitted only when any were found.
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct WasmSpecial {
    pub pointers: Vec<SpecialPointer>,
}

impl WasmSpecial {
    pub fn is_empty(&self) -> bool {
        self.pointers.is_empty()
    }
}

/// The normalized extraction result for one run.
///
/// `types` is keyed by display name with a last-write-wins policy: a later
/// entry with the same name overwrites an earlier one, deliberately, even
/// across compilation units. The per-entry offsets remain visible in
/// `debug_info` for disambiguation. The BTreeMap keeps key order stable so
/// serializing the same input twice is byte-identical.
#[derive(Debug, Default, Serialize)]
pub struct Registry {
    pub types: BTreeMap<String, TypeEntry>,
    pub variables: Vec<VariableEntry>,
    pub functions: Vec<FunctionEntry>,
    pub debug_info: Vec<UnitTrace>,
    #[serde(skip_serializing_if = "WasmSpecial::is_empty")]
    pub wasm_special: WasmSpecial,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a type under its display name, overwriting any earlier entry
    /// with the same name.
    pub fn add_type(&mut self, name: String, entry: TypeEntry) {
        self.types.insert(name, entry);
    }

    pub fn add_function(&mut self, function: FunctionEntry) {
        self.functions.push(function);
    }

    pub fn add_variable(&mut self, variable: VariableEntry) {
        self.variables.push(variable);
    }

    pub fn add_special_pointer(&mut self, pointer: SpecialPointer) {
        self.wasm_special.pointers.push(pointer);
    }

    pub fn add_unit_trace(&mut self, trace: UnitTrace) {
        self.debug_info.push(trace);
    }

    /// Render the registry as a pretty-printed JSON document.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
