pub mod classes;
pub mod data_file;
pub mod geometry;
pub mod ir;
pub mod styles;

/// z-level assigned to objects with no explicit layer.
pub const ZERO_Z_LEVEL: usize = 5;
/// Highest representable z-level (layers -5..+5 around [`ZERO_Z_LEVEL`]).
pub const MAX_Z_LEVEL: usize = 10;
