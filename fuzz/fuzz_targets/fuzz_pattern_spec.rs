//! Fuzz target for pattern spec parsing and compilation.
//!
//! Tests that JSON pattern specs parse and compile from arbitrary input
//! without panicking, only returning errors for bad shapes.

#![no_main]

use libfuzzer_sys::fuzz_target;
use pii_patterns::PatternSpec;

fuzz_target!(|data: &[u8]| {
    if let Ok(spec) = serde_json::from_slice::<PatternSpec>(data) {
        let _ = spec.compile();
    }
});
