#![no_main]
use libfuzzer_sys::fuzz_target;
use rotor_core::{Fixed, SetPointTable};

fuzz_target!(|data: &str| {
    // Operator input goes through this path; it must never panic.
    let table = SetPointTable::default();
    if let Ok(v) = data.parse::<Fixed>() {
        let _ = v.to_string();
        let _ = v.rescale(3);
        if let Some(register) = table.lookup(v) {
            assert_eq!(table.display_for(register), Some(v));
        }
    }
});
