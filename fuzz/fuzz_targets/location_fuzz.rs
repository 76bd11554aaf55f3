#![no_main]

use dwarfex::extractor::location::evaluate_address;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // The evaluator must degrade to 0 on malformed blocks, never panic.
    for address_size in [2u8, 4, 8] {
        let _ = evaluate_address(data, address_size, 4, true);
        let _ = evaluate_address(data, address_size, 5, false);
    }
});
