//! Fuzz target for mapped CSV parsing.

#![no_main]

use libfuzzer_sys::fuzz_target;
use skymatch::evaluation::io_mapped_csv::from_mapped_csv_str;

fuzz_target!(|data: &[u8]| {
    if data.len() > 10 * 1024 * 1024 {
        return;
    }

    if let Ok(text) = std::str::from_utf8(data) {
        let _ = from_mapped_csv_str(text);
    }
});
