pub mod osm;

pub use osm::{parse_osm, parse_osm_str, ParseError};
