//! Type-name resolution by following DW_AT_type reference chains.

use crate::extractor::entries::{EntryForest, EntryId};

/// Maximum number of entries inspected while chasing a type chain. The cap is
/// the only cycle protection: a self-referential chain simply exhausts it and
/// degrades to `"<unknown>"`.
const MAX_TYPE_CHAIN: usize = 32;

/// Resolve the display name of a type, starting at `start`.
///
/// Returns `"<invalid>"` when there is no starting entry at all. Otherwise
/// the first named entry on the DW_AT_type chain wins; a chain that ends
/// unnamed, leaves the unit, or runs past the hop budget yields
/// `"<unknown>"`.
pub fn resolve_type_name(forest: &EntryForest, start: Option<EntryId>) -> String {
    let Some(mut id) = start else {
        return "<invalid>".to_string();
    };

    for _ in 0..MAX_TYPE_CHAIN {
        let entry = forest.entry(id);
        if let Some(name) = entry.name() {
            return name.to_string();
        }

        let Some(target) = entry.reference(gimli::DW_AT_type) else {
            break;
        };
        match forest.unit(entry.unit()).entry_at_offset(target) {
            Some(next) => id = next,
            None => break,
        }
    }

    "<unknown>".to_string()
}

/// Resolve the name of the type an entry *refers to* via DW_AT_type.
///
/// Used for struct fields, formal parameters, subprogram return types, and
/// typedef bases, where starting at the entry itself would just echo the
/// entry's own name.
pub fn resolve_referenced_type(forest: &EntryForest, id: EntryId) -> String {
    let entry = forest.entry(id);
    let Some(target) = entry.reference(gimli::DW_AT_type) else {
        return "<unknown>".to_string();
    };
    resolve_type_name(forest, forest.unit(entry.unit()).entry_at_offset(target))
}
