//! Fuzz target for sky catalog CSV parsing.
//!
//! Parsed catalogs are also validated, since validation has to cope with
//! whatever the reader lets through (NaN, huge declinations).

#![no_main]

use libfuzzer_sys::fuzz_target;
use skymatch::catalog::io_sky_csv::from_sky_csv_slice;
use skymatch::validation::{validate_sky, ValidateOptions};

fuzz_target!(|data: &[u8]| {
    if data.len() > 10 * 1024 * 1024 {
        return;
    }

    if let Ok(sky) = from_sky_csv_slice(data) {
        let _ = validate_sky(&sky, &ValidateOptions::default());
    }
});
