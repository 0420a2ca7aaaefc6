//! Fuzz target checking that the grid candidate index gives the same
//! assignment as the exhaustive search.
//!
//! Bytes are read as little-endian u16 pairs scaled to 1/16 pixel, which
//! puts many points exactly on cell boundaries.

#![no_main]

use libfuzzer_sys::fuzz_target;
use skymatch::catalog::{Coord, Pixel};
use skymatch::matching::fuzz_grid_agrees;

fn points(bytes: &[u8]) -> Vec<Coord<Pixel>> {
    bytes
        .chunks_exact(4)
        .map(|c| {
            let x = u16::from_le_bytes([c[0], c[1]]) as f64 / 16.0;
            let y = u16::from_le_bytes([c[2], c[3]]) as f64 / 16.0;
            Coord::new(x, y)
        })
        .collect()
}

fuzz_target!(|data: &[u8]| {
    if data.len() < 2 || data.len() > 64 * 1024 {
        return;
    }

    let tolerance_px = data[0] as f64 / 8.0;
    let rest = &data[1..];
    let split = rest.len() / 2;
    fuzz_grid_agrees(&points(&rest[..split]), &points(&rest[split..]), tolerance_px);
});
