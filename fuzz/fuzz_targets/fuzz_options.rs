//! Fuzz target for detect options parsing.
//!
//! Tests that JSON options parsing handles arbitrary input without
//! panicking.

#![no_main]

use libfuzzer_sys::fuzz_target;
use pii_engine::DetectOptions;

fuzz_target!(|data: &[u8]| {
    let _ = serde_json::from_slice::<DetectOptions>(data);
});
