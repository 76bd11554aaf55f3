//! Static-address extraction from DWARF location expressions.
//!
//! This is deliberately a partial interpreter: it keeps no operand stack and
//! evaluates no register-relative or composite expressions. It only scans the
//! operation stream for the first absolute-address push (DW_OP_addr) and
//! reports its operand. Everything else, including malformed blocks, yields 0.

use gimli::{EndianSlice, Expression, Operation, RunTimeEndian};

/// Scan a location block and return the first DW_OP_addr operand, or 0.
pub fn evaluate_address(block: &[u8], address_size: u8, version: u16, little_endian: bool) -> u64 {
    if block.is_empty() {
        return 0;
    }

    let endian = if little_endian {
        RunTimeEndian::Little
    } else {
        RunTimeEndian::Big
    };
    let encoding = gimli::Encoding {
        format: gimli::Format::Dwarf32,
        version,
        address_size,
    };

    let expression = Expression(EndianSlice::new(block, endian));
    let mut operations = expression.operations(encoding);
    loop {
        match operations.next() {
            Ok(Some(Operation::Address { address })) => return address,
            Ok(Some(_)) => continue,
            // End of block or undecodable operation: no static address.
            Ok(None) | Err(_) => return 0,
        }
    }
}
