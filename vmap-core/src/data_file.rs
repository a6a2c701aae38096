//! Byte-level description of the output map container.
//!
//! Everything is little-endian and packed: records are written field by field,
//! so the layout below is the contract, independent of in-memory struct
//! layout. Offsets stored in the header and zoom-level records are from the
//! start of the file; offsets inside a chunk are from the start of the chunk.

use byteorder::{ByteOrder, LittleEndian};

pub const MAGIC: &[u8; 16] = b"PanzerMaps-Data\0";
pub const VERSION: u32 = 1;

/// Packed chunk vertex. `x == BREAK_PRIMITIVE` marks a primitive break;
/// the `y` of a break vertex in an areal group carries the style index of the
/// polygon just closed.
pub const BREAK_PRIMITIVE: u16 = u16::MAX;

pub const HEADER_SIZE: usize = 16 + 4 + 1 + 8 * 4 + 4 * 4 + 4 + 4 + 4 + 4 + 4 + 2 + 2;
pub const ZOOM_LEVEL_RECORD_SIZE: usize = 4 * 12 + 4 + 4;
pub const CHUNK_DESCRIPTION_SIZE: usize = 8;
pub const CHUNK_HEADER_SIZE: usize = 8 + 16 + 4 + 16 + 6 + 2;

pub const POINT_OBJECT_GROUP_SIZE: usize = 1 + 2 + 2;
pub const LINEAR_OBJECT_GROUP_SIZE: usize = 1 + 2 + 2 + 2;
pub const AREAL_OBJECT_GROUP_SIZE: usize = 2 + 2 + 2;

pub const POINT_STYLE_SIZE: usize = 2 + 2 + 4;
pub const LINEAR_STYLE_SIZE: usize = 4 + 4 + 4 + 4 + 2 + 2 + 4;
pub const AREAL_STYLE_SIZE: usize = 4;

pub type ColorRGBA = [u8; 4];

/// Appends `value` and returns nothing; patch helpers write into an already
/// reserved position.
pub fn put_u16(out: &mut Vec<u8>, value: u16) {
    let mut buf = [0u8; 2];
    LittleEndian::write_u16(&mut buf, value);
    out.extend_from_slice(&buf);
}

pub fn put_u32(out: &mut Vec<u8>, value: u32) {
    let mut buf = [0u8; 4];
    LittleEndian::write_u32(&mut buf, value);
    out.extend_from_slice(&buf);
}

pub fn put_i32(out: &mut Vec<u8>, value: i32) {
    let mut buf = [0u8; 4];
    LittleEndian::write_i32(&mut buf, value);
    out.extend_from_slice(&buf);
}

pub fn put_f32(out: &mut Vec<u8>, value: f32) {
    let mut buf = [0u8; 4];
    LittleEndian::write_f32(&mut buf, value);
    out.extend_from_slice(&buf);
}

pub fn put_f64(out: &mut Vec<u8>, value: f64) {
    let mut buf = [0u8; 8];
    LittleEndian::write_f64(&mut buf, value);
    out.extend_from_slice(&buf);
}

pub fn patch_u16(out: &mut [u8], offset: usize, value: u16) {
    LittleEndian::write_u16(&mut out[offset..offset + 2], value);
}

pub fn patch_u32(out: &mut [u8], offset: usize, value: u32) {
    LittleEndian::write_u32(&mut out[offset..offset + 4], value);
}

pub fn patch_f32(out: &mut [u8], offset: usize, value: f32) {
    LittleEndian::write_f32(&mut out[offset..offset + 4], value);
}

/// Field offsets inside the file header.
pub mod header_offsets {
    pub const MAGIC: usize = 0;
    pub const VERSION: usize = 16;
    pub const PROJECTION: usize = 20;
    pub const PROJECTION_BBOX: usize = 21; // 4 x f64
    pub const SCENE_BBOX: usize = 53; // 4 x i32
    pub const UNIT_SIZE: usize = 69;
    pub const ZOOM_LEVELS_OFFSET: usize = 73;
    pub const ZOOM_LEVEL_COUNT: usize = 77;
    pub const BACKGROUND_COLOR: usize = 81;
    pub const COPYRIGHT_IMAGE_OFFSET: usize = 85;
    pub const COPYRIGHT_IMAGE_WIDTH: usize = 89;
    pub const COPYRIGHT_IMAGE_HEIGHT: usize = 91;
}

/// Field offsets inside one zoom-level record, relative to the record start.
pub mod zoom_level_offsets {
    pub const CHUNKS_DESCRIPTION_OFFSET: usize = 0;
    pub const CHUNK_COUNT: usize = 4;
    pub const POINT_STYLES_OFFSET: usize = 8;
    pub const POINT_STYLES_COUNT: usize = 12;
    pub const LINEAR_STYLES_OFFSET: usize = 16;
    pub const LINEAR_STYLES_COUNT: usize = 20;
    pub const AREAL_STYLES_OFFSET: usize = 24;
    pub const AREAL_STYLES_COUNT: usize = 28;
    pub const POINT_STYLES_ORDER_OFFSET: usize = 32;
    pub const POINT_STYLES_ORDER_COUNT: usize = 36;
    pub const LINEAR_STYLES_ORDER_OFFSET: usize = 40;
    pub const LINEAR_STYLES_ORDER_COUNT: usize = 44;
    pub const UNIT_SIZE_M: usize = 48;
    pub const ZOOM_LEVEL_LOG2: usize = 52;
}

/// Field offsets inside a chunk header, relative to the chunk start.
pub mod chunk_offsets {
    pub const COORD_START_X: usize = 0;
    pub const COORD_START_Y: usize = 4;
    pub const MIN_X: usize = 8;
    pub const MIN_Y: usize = 12;
    pub const MAX_X: usize = 16;
    pub const MAX_Y: usize = 20;
    pub const MIN_Z_LEVEL: usize = 24;
    pub const MAX_Z_LEVEL: usize = 26;
    pub const POINT_OBJECT_GROUPS_OFFSET: usize = 28;
    pub const LINEAR_OBJECT_GROUPS_OFFSET: usize = 32;
    pub const AREAL_OBJECT_GROUPS_OFFSET: usize = 36;
    pub const VERTICES_OFFSET: usize = 40;
    pub const POINT_OBJECT_GROUPS_COUNT: usize = 44;
    pub const LINEAR_OBJECT_GROUPS_COUNT: usize = 46;
    pub const AREAL_OBJECT_GROUPS_COUNT: usize = 48;
    pub const VERTEX_COUNT: usize = 50;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_layout_is_consistent() {
        assert_eq!(header_offsets::COPYRIGHT_IMAGE_HEIGHT + 2, HEADER_SIZE);
        assert_eq!(zoom_level_offsets::ZOOM_LEVEL_LOG2 + 4, ZOOM_LEVEL_RECORD_SIZE);
        assert_eq!(chunk_offsets::VERTEX_COUNT + 2, CHUNK_HEADER_SIZE);
    }

    #[test]
    fn put_helpers_append_little_endian() {
        let mut out = Vec::new();
        put_u32(&mut out, 0x0403_0201);
        put_u16(&mut out, 0x0605);
        assert_eq!(out, [1, 2, 3, 4, 5, 6]);

        patch_u32(&mut out, 0, 0xAABB_CCDD);
        assert_eq!(&out[..4], [0xDD, 0xCC, 0xBB, 0xAA]);
    }
}
