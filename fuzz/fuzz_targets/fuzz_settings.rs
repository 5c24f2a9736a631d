//! Fuzz target for settings file parsing.
//!
//! Tests that JSON settings parsing and validation handle arbitrary input
//! without panicking.

#![no_main]

use gran_config::Settings;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(settings) = serde_json::from_slice::<Settings>(data) {
        let _ = settings.validate();
    }
});
