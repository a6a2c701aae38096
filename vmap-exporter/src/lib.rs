//! Chunking, clipping and serialization of the compiled zoom levels into the
//! binary map container.

pub mod chunk;
pub mod clip;
pub mod file;

pub use file::{dump_data_file, write_map_file, ExportError};
