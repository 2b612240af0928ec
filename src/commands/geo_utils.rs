//! Geospatial primitives shared by the GEO commands.
//!
//! A member's sorted-set score is a Morton (Z-order) interleave: longitude
//! and latitude are each mapped linearly onto a 26-bit grid, and the grid
//! numbers are bit-interleaved (latitude on even bits, longitude on odd
//! bits). Decoding returns the center of the grid cell, so coordinates
//! round-trip with cell-level precision.

use crate::commands::command_error::CommandError;

pub const MIN_LONGITUDE: f64 = -180.0;
pub const MAX_LONGITUDE: f64 = 180.0;
pub const MIN_LATITUDE: f64 = -85.05112878;
pub const MAX_LATITUDE: f64 = 85.05112878;

const LONGITUDE_RANGE: f64 = MAX_LONGITUDE - MIN_LONGITUDE;
const LATITUDE_RANGE: f64 = MAX_LATITUDE - MIN_LATITUDE;

/// 2^26 grid cells per axis.
const GRID_CELLS: f64 = (1u64 << 26) as f64;

/// Earth radius used by the haversine distance, in meters.
pub const EARTH_RADIUS_M: f64 = 6372797.560856;

pub fn coordinates_in_range(longitude: f64, latitude: f64) -> bool {
    (MIN_LONGITUDE..=MAX_LONGITUDE).contains(&longitude)
        && (MIN_LATITUDE..=MAX_LATITUDE).contains(&latitude)
}

/// Spreads the low 32 bits of `v` onto the even bit positions of a 64-bit
/// word.
fn spread_to_even_bits(v: u64) -> u64 {
    let mut v = v & 0xFFFFFFFF;
    v = (v | (v << 16)) & 0x0000FFFF0000FFFF;
    v = (v | (v << 8)) & 0x00FF00FF00FF00FF;
    v = (v | (v << 4)) & 0x0F0F0F0F0F0F0F0F;
    v = (v | (v << 2)) & 0x3333333333333333;
    v = (v | (v << 1)) & 0x5555555555555555;
    v
}

/// Inverse of [`spread_to_even_bits`]: collects the even bit positions back
/// into the low 32 bits.
fn compact_even_bits(v: u64) -> u64 {
    let mut v = v & 0x5555555555555555;
    v = (v | (v >> 1)) & 0x3333333333333333;
    v = (v | (v >> 2)) & 0x0F0F0F0F0F0F0F0F;
    v = (v | (v >> 4)) & 0x00FF00FF00FF00FF;
    v = (v | (v >> 8)) & 0x0000FFFF0000FFFF;
    v = (v | (v >> 16)) & 0x00000000FFFFFFFF;
    v
}

/// Encodes a coordinate pair into the Morton score.
pub fn encode_score(longitude: f64, latitude: f64) -> u64 {
    let grid_latitude = (GRID_CELLS * (latitude - MIN_LATITUDE) / LATITUDE_RANGE) as u64;
    let grid_longitude = (GRID_CELLS * (longitude - MIN_LONGITUDE) / LONGITUDE_RANGE) as u64;

    spread_to_even_bits(grid_latitude) | (spread_to_even_bits(grid_longitude) << 1)
}

/// Decodes a Morton score back to `(longitude, latitude)` at the center of
/// its grid cell.
pub fn decode_score(score: u64) -> (f64, f64) {
    let grid_latitude = compact_even_bits(score);
    let grid_longitude = compact_even_bits(score >> 1);

    let latitude_min = MIN_LATITUDE + LATITUDE_RANGE * (grid_latitude as f64 / GRID_CELLS);
    let latitude_max = MIN_LATITUDE + LATITUDE_RANGE * ((grid_latitude + 1) as f64 / GRID_CELLS);
    let longitude_min = MIN_LONGITUDE + LONGITUDE_RANGE * (grid_longitude as f64 / GRID_CELLS);
    let longitude_max = MIN_LONGITUDE + LONGITUDE_RANGE * ((grid_longitude + 1) as f64 / GRID_CELLS);

    (
        (longitude_min + longitude_max) / 2.0,
        (latitude_min + latitude_max) / 2.0,
    )
}

/// Great-circle distance between two coordinate pairs, in meters.
pub fn haversine_distance(lon1: f64, lat1: f64, lon2: f64, lat2: f64) -> f64 {
    let lat1_rad = lat1.to_radians();
    let lat2_rad = lat2.to_radians();
    let delta_lat = (lat2 - lat1).to_radians();
    let delta_lon = (lon2 - lon1).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lon / 2.0).sin().powi(2);

    EARTH_RADIUS_M * 2.0 * a.sqrt().asin()
}

/// Meters per unit of the given distance unit.
pub fn unit_to_meters(unit: &str) -> Result<f64, CommandError> {
    match unit.to_lowercase().as_str() {
        "m" => Ok(1.0),
        "km" => Ok(1000.0),
        "mi" => Ok(1609.344),
        "ft" => Ok(0.3048),
        _ => Err(CommandError::InvalidGeoUnit),
    }
}
