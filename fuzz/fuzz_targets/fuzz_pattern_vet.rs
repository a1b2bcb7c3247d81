//! Fuzz target for structural pattern vetting.
//!
//! Tests that the safety scanner handles arbitrary pattern sources
//! without panicking; unsafe shapes must come back as violations, never
//! as crashes.

#![no_main]

use libfuzzer_sys::fuzz_target;
use pii_patterns::vet_pattern;

fuzz_target!(|data: &str| {
    let _ = vet_pattern(data);
});
