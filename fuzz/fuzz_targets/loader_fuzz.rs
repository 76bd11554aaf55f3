#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Arbitrary bytes must either load or fail with a classified error.
    if let Ok(forest) = dwarfex::loader::load_bytes(data) {
        let _ = dwarfex::extract(&forest);
    }
});
