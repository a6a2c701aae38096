//! Serialization of one chunk: a square tile of the projected plane with all
//! geometry clipped to it and packed into 16-bit vertices.
//!
//! A chunk whose packed vertex budget overflows is discarded and re-emitted
//! as four half-size chunks, down to the minimum chunk size.

use projection_transform::ProjectionPoint;
use vmap_core::classes::{LinearObjectClass, PointObjectClass};
use vmap_core::data_file::{
    self, chunk_offsets, put_u16, AREAL_OBJECT_GROUP_SIZE, BREAK_PRIMITIVE,
    CHUNK_HEADER_SIZE, LINEAR_OBJECT_GROUP_SIZE, POINT_OBJECT_GROUP_SIZE,
};
use vmap_core::ir::{ArealGeometry, ObjectsData, Ring};

use crate::clip::{split_convex_polygon, split_polyline};

pub const MAX_CHUNK_SIZE: i32 = 64_000;
pub const MIN_CHUNK_SIZE: i32 = MAX_CHUNK_SIZE / 512;

/// Chunks above this size split at 32k vertices for better GPU batching;
/// smaller chunks run up to the hard 16-bit limit.
const SOFT_VERTEX_LIMIT: usize = 32_768;
const HARD_VERTEX_LIMIT: usize = 65_535;
/// Line vertices are limited separately: the renderer expands each one to a
/// quad, four vertices per line vertex.
const LINEAR_VERTEX_LIMIT: usize = 65_535 / 4;

struct ChunkVertex {
    x: u16,
    y: u16,
}

/// Serializes the chunk at the given offset, recursing into sub-chunks on
/// overflow. Empty chunks come back as empty byte vectors and are dropped by
/// the caller.
pub fn dump_data_chunk(
    prepared_data: &ObjectsData,
    chunk_offset_x: i32,
    chunk_offset_y: i32,
    chunk_size: i32,
) -> Vec<Vec<u8>> {
    // Local origin with a margin on each side, so clipped geometry touching
    // the boundary still packs without wraparound.
    let min_point = ProjectionPoint {
        x: chunk_offset_x - (65_535 - chunk_size) / 2,
        y: chunk_offset_y - (65_535 - chunk_size) / 2,
    };

    let mut vertices: Vec<ChunkVertex> = Vec::new();
    let mut linear_vertex_count: usize = 0;

    let mut min_z_level = u16::MAX;
    let mut max_z_level = 0u16;

    let push_vertex = |vertices: &mut Vec<ChunkVertex>, point: ProjectionPoint| {
        vertices.push(ChunkVertex {
            x: (point.x - min_point.x) as u16,
            y: (point.y - min_point.y) as u16,
        });
    };

    // Point object groups, one per run of equal classes.
    let mut point_groups = Vec::new();
    {
        let mut prev_class = PointObjectClass::None;
        let mut group_style_index = 0u8;
        let mut group_first_vertex = 0usize;
        for (object, projection_point) in prepared_data
            .point_objects
            .iter()
            .zip(&prepared_data.point_objects_vertices)
        {
            if object.class != prev_class {
                if prev_class != PointObjectClass::None {
                    point_groups.push((
                        group_style_index,
                        group_first_vertex,
                        vertices.len() - group_first_vertex,
                    ));
                }
                group_first_vertex = vertices.len();
                group_style_index = object.class.style_index();
                prev_class = object.class;
            }

            if projection_point.x >= chunk_offset_x
                && projection_point.y >= chunk_offset_y
                && projection_point.x < chunk_offset_x + chunk_size
                && projection_point.y < chunk_offset_y + chunk_size
            {
                push_vertex(&mut vertices, *projection_point);
            }
        }
        if prev_class != PointObjectClass::None {
            point_groups.push((
                group_style_index,
                group_first_vertex,
                vertices.len() - group_first_vertex,
            ));
        }
    }

    // Linear object groups, one per run of equal (class, z-level).
    let mut linear_groups = Vec::new();
    {
        let mut prev_class = LinearObjectClass::None;
        let mut prev_z_level = usize::MAX;
        let mut group_style_index = 0u8;
        let mut group_z_level = 0u16;
        let mut group_first_vertex = 0usize;
        for object in &prepared_data.linear_objects {
            if object.class != prev_class || object.z_level != prev_z_level {
                if prev_class != LinearObjectClass::None {
                    linear_groups.push((
                        group_style_index,
                        group_first_vertex,
                        vertices.len() - group_first_vertex,
                        group_z_level,
                    ));
                }
                group_first_vertex = vertices.len();
                group_style_index = object.class.style_index();
                group_z_level = object.z_level as u16;

                min_z_level = min_z_level.min(group_z_level);
                max_z_level = max_z_level.max(group_z_level);

                prev_class = object.class;
                prev_z_level = object.z_level;
            }

            let polyline_vertices = prepared_data.linear_object_vertices(object);
            for polyline_part in split_polyline(
                polyline_vertices,
                chunk_offset_x,
                chunk_offset_y,
                chunk_offset_x + chunk_size,
                chunk_offset_y + chunk_size,
            ) {
                for polyline_part_vertex in &polyline_part {
                    push_vertex(&mut vertices, *polyline_part_vertex);
                    linear_vertex_count += 1;
                }
                vertices.push(ChunkVertex { x: BREAK_PRIMITIVE, y: 0 });
                linear_vertex_count += 1;
            }
        }
        if prev_class != LinearObjectClass::None {
            linear_groups.push((
                group_style_index,
                group_first_vertex,
                vertices.len() - group_first_vertex,
                group_z_level,
            ));
        }
    }

    // Areal object groups, one per run of equal z-levels; the polygon class
    // travels in the break vertex.
    let mut areal_groups = Vec::new();
    {
        let mut prev_z_level: Option<usize> = None;
        let mut group_z_level = 0u16;
        let mut group_first_vertex = 0usize;
        for object in &prepared_data.areal_objects {
            if prev_z_level != Some(object.z_level) {
                if prev_z_level.is_some() {
                    areal_groups.push((
                        group_first_vertex,
                        vertices.len() - group_first_vertex,
                        group_z_level,
                    ));
                }
                group_first_vertex = vertices.len();
                group_z_level = object.z_level as u16;

                min_z_level = min_z_level.min(group_z_level);
                max_z_level = max_z_level.max(group_z_level);

                prev_z_level = Some(object.z_level);
            }

            let emit_ring = |ring: &Ring, vertices: &mut Vec<ChunkVertex>| {
                let polygon_part = split_convex_polygon(
                    prepared_data.ring_vertices(ring),
                    chunk_offset_x,
                    chunk_offset_y,
                    chunk_offset_x + chunk_size,
                    chunk_offset_y + chunk_size,
                );
                if polygon_part.len() < 3 {
                    return;
                }
                for polygon_part_vertex in &polygon_part {
                    push_vertex(vertices, *polygon_part_vertex);
                }
                vertices.push(ChunkVertex {
                    x: BREAK_PRIMITIVE,
                    y: u16::from(object.class.style_index()),
                });
            };

            match &object.geometry {
                ArealGeometry::Polygon(ring) => emit_ring(ring, &mut vertices),
                ArealGeometry::Multipolygon { outer_rings, .. } => {
                    // Holes cannot be expressed in the container; inner rings
                    // only participated in the draw-order sort.
                    for ring in outer_rings {
                        emit_ring(ring, &mut vertices);
                    }
                }
            }
        }
        if prev_z_level.is_some() {
            areal_groups.push((
                group_first_vertex,
                vertices.len() - group_first_vertex,
                group_z_level,
            ));
        }
    }

    let size_limit = if chunk_size >= MIN_CHUNK_SIZE * 4 {
        SOFT_VERTEX_LIMIT
    } else {
        HARD_VERTEX_LIMIT
    };
    if vertices.len() >= size_limit || linear_vertex_count >= LINEAR_VERTEX_LIMIT {
        if chunk_size > MIN_CHUNK_SIZE {
            log::info!(
                "Split chunk {} {} into 4 parts with size {}",
                chunk_offset_x,
                chunk_offset_y,
                chunk_size / 2
            );

            let half_chunk_size = chunk_size / 2;
            let mut result = Vec::with_capacity(4);
            for x in 0..2 {
                for y in 0..2 {
                    result.extend(dump_data_chunk(
                        prepared_data,
                        chunk_offset_x + x * half_chunk_size,
                        chunk_offset_y + y * half_chunk_size,
                        half_chunk_size,
                    ));
                }
            }
            return result;
        }
        log::warn!(
            "Chunk {} {} at minimum size still holds {} vertices",
            chunk_offset_x,
            chunk_offset_y,
            vertices.len()
        );
    }

    if vertices.is_empty() {
        return vec![Vec::new()];
    }

    if min_z_level > max_z_level {
        min_z_level = max_z_level;
    }

    // Assemble the chunk: header, group records, vertex pool.
    let mut result = vec![0u8; CHUNK_HEADER_SIZE];

    let point_object_groups_offset = result.len();
    for (style_index, first_vertex, vertex_count) in &point_groups {
        result.push(*style_index);
        put_u16(&mut result, *first_vertex as u16);
        put_u16(&mut result, *vertex_count as u16);
    }
    let linear_object_groups_offset = result.len();
    for (style_index, first_vertex, vertex_count, z_level) in &linear_groups {
        result.push(*style_index);
        put_u16(&mut result, *first_vertex as u16);
        put_u16(&mut result, *vertex_count as u16);
        put_u16(&mut result, *z_level);
    }
    let areal_object_groups_offset = result.len();
    for (first_vertex, vertex_count, z_level) in &areal_groups {
        put_u16(&mut result, *first_vertex as u16);
        put_u16(&mut result, *vertex_count as u16);
        put_u16(&mut result, *z_level);
    }
    let vertices_offset = result.len();
    for vertex in &vertices {
        put_u16(&mut result, vertex.x);
        put_u16(&mut result, vertex.y);
    }

    debug_assert_eq!(
        point_object_groups_offset,
        CHUNK_HEADER_SIZE
    );
    debug_assert_eq!(
        linear_object_groups_offset - point_object_groups_offset,
        point_groups.len() * POINT_OBJECT_GROUP_SIZE
    );
    debug_assert_eq!(
        areal_object_groups_offset - linear_object_groups_offset,
        linear_groups.len() * LINEAR_OBJECT_GROUP_SIZE
    );
    debug_assert_eq!(
        vertices_offset - areal_object_groups_offset,
        areal_groups.len() * AREAL_OBJECT_GROUP_SIZE
    );

    data_file::patch_u32(&mut result, chunk_offsets::COORD_START_X, min_point.x as u32);
    data_file::patch_u32(&mut result, chunk_offsets::COORD_START_Y, min_point.y as u32);
    data_file::patch_u32(&mut result, chunk_offsets::MIN_X, chunk_offset_x as u32);
    data_file::patch_u32(&mut result, chunk_offsets::MIN_Y, chunk_offset_y as u32);
    data_file::patch_u32(&mut result, chunk_offsets::MAX_X, (chunk_offset_x + chunk_size) as u32);
    data_file::patch_u32(&mut result, chunk_offsets::MAX_Y, (chunk_offset_y + chunk_size) as u32);
    data_file::patch_u16(&mut result, chunk_offsets::MIN_Z_LEVEL, min_z_level);
    data_file::patch_u16(&mut result, chunk_offsets::MAX_Z_LEVEL, max_z_level);
    data_file::patch_u32(
        &mut result,
        chunk_offsets::POINT_OBJECT_GROUPS_OFFSET,
        point_object_groups_offset as u32,
    );
    data_file::patch_u32(
        &mut result,
        chunk_offsets::LINEAR_OBJECT_GROUPS_OFFSET,
        linear_object_groups_offset as u32,
    );
    data_file::patch_u32(
        &mut result,
        chunk_offsets::AREAL_OBJECT_GROUPS_OFFSET,
        areal_object_groups_offset as u32,
    );
    data_file::patch_u32(&mut result, chunk_offsets::VERTICES_OFFSET, vertices_offset as u32);
    data_file::patch_u16(
        &mut result,
        chunk_offsets::POINT_OBJECT_GROUPS_COUNT,
        point_groups.len() as u16,
    );
    data_file::patch_u16(
        &mut result,
        chunk_offsets::LINEAR_OBJECT_GROUPS_COUNT,
        linear_groups.len() as u16,
    );
    data_file::patch_u16(
        &mut result,
        chunk_offsets::AREAL_OBJECT_GROUPS_COUNT,
        areal_groups.len() as u16,
    );
    data_file::patch_u16(&mut result, chunk_offsets::VERTEX_COUNT, vertices.len() as u16);

    log::info!(
        "Chunk {} {} done. Vertices: {}",
        chunk_offset_x,
        chunk_offset_y,
        vertices.len()
    );

    vec![result]
}

#[cfg(test)]
mod tests {
    use super::*;
    use byteorder::{ByteOrder, LittleEndian};
    use projection_transform::ProjectionKind;
    use vmap_core::classes::ArealObjectClass;
    use vmap_core::ir::{ArealObject, LinearObject, PointObject};
    use vmap_core::ZERO_Z_LEVEL;

    fn p(x: i32, y: i32) -> ProjectionPoint {
        ProjectionPoint { x, y }
    }

    fn read_u16(chunk: &[u8], offset: usize) -> u16 {
        LittleEndian::read_u16(&chunk[offset..offset + 2])
    }

    fn read_u32(chunk: &[u8], offset: usize) -> u32 {
        LittleEndian::read_u32(&chunk[offset..offset + 4])
    }

    fn chunk_vertices(chunk: &[u8]) -> Vec<(u16, u16)> {
        let vertices_offset = read_u32(chunk, chunk_offsets::VERTICES_OFFSET) as usize;
        let vertex_count = read_u16(chunk, chunk_offsets::VERTEX_COUNT) as usize;
        (0..vertex_count)
            .map(|i| {
                (
                    read_u16(chunk, vertices_offset + i * 4),
                    read_u16(chunk, vertices_offset + i * 4 + 2),
                )
            })
            .collect()
    }

    #[test]
    fn single_line_packs_with_break_vertex() {
        let mut data = ObjectsData::empty(ProjectionKind::Albers, 0);
        data.linear_objects_vertices.extend_from_slice(&[p(100, 100), p(500, 100)]);
        data.linear_objects.push(LinearObject {
            class: LinearObjectClass::Road,
            z_level: ZERO_Z_LEVEL,
            first_vertex_index: 0,
            vertex_count: 2,
        });

        let chunks = dump_data_chunk(&data, 0, 0, MAX_CHUNK_SIZE);
        assert_eq!(chunks.len(), 1);
        let chunk = &chunks[0];

        assert_eq!(read_u16(chunk, chunk_offsets::LINEAR_OBJECT_GROUPS_COUNT), 1);
        assert_eq!(read_u16(chunk, chunk_offsets::POINT_OBJECT_GROUPS_COUNT), 0);
        assert_eq!(read_u16(chunk, chunk_offsets::VERTEX_COUNT), 3);

        let margin = (65_535 - MAX_CHUNK_SIZE as u16) / 2;
        let vertices = chunk_vertices(chunk);
        assert_eq!(vertices[0], (100 + margin, 100 + margin));
        assert_eq!(vertices[1], (500 + margin, 100 + margin));
        assert_eq!(vertices[2], (BREAK_PRIMITIVE, 0));

        // Group record: style, first_vertex, vertex_count, z_level.
        let groups_offset = read_u32(chunk, chunk_offsets::LINEAR_OBJECT_GROUPS_OFFSET) as usize;
        assert_eq!(chunk[groups_offset], LinearObjectClass::Road.style_index());
        assert_eq!(read_u16(chunk, groups_offset + 1), 0);
        assert_eq!(read_u16(chunk, groups_offset + 3), 3);
        assert_eq!(read_u16(chunk, groups_offset + 5), ZERO_Z_LEVEL as u16);
    }

    #[test]
    fn square_building_packs_with_class_in_break_vertex() {
        let mut data = ObjectsData::empty(ProjectionKind::Albers, 0);
        data.areal_objects_vertices.extend_from_slice(&[
            p(10, 10),
            p(10, 20),
            p(20, 20),
            p(20, 10),
        ]);
        data.areal_objects.push(ArealObject::polygon(
            ArealObjectClass::Building,
            ZERO_Z_LEVEL,
            Ring { first_vertex_index: 0, vertex_count: 4 },
        ));

        let chunks = dump_data_chunk(&data, 0, 0, MAX_CHUNK_SIZE);
        let chunk = &chunks[0];

        assert_eq!(read_u16(chunk, chunk_offsets::AREAL_OBJECT_GROUPS_COUNT), 1);
        assert_eq!(read_u16(chunk, chunk_offsets::VERTEX_COUNT), 5);

        let vertices = chunk_vertices(chunk);
        assert_eq!(
            vertices[4],
            (
                BREAK_PRIMITIVE,
                u16::from(ArealObjectClass::Building.style_index())
            )
        );
    }

    #[test]
    fn outside_points_are_excluded() {
        let mut data = ObjectsData::empty(ProjectionKind::Albers, 0);
        for (i, vertex) in [p(10, 10), p(MAX_CHUNK_SIZE + 10, 10)].iter().enumerate() {
            data.point_objects.push(PointObject {
                class: PointObjectClass::StationPlatform,
                vertex_index: i,
            });
            data.point_objects_vertices.push(*vertex);
        }

        let chunks = dump_data_chunk(&data, 0, 0, MAX_CHUNK_SIZE);
        let chunk = &chunks[0];
        assert_eq!(read_u16(chunk, chunk_offsets::POINT_OBJECT_GROUPS_COUNT), 1);
        assert_eq!(read_u16(chunk, chunk_offsets::VERTEX_COUNT), 1);
    }

    #[test]
    fn empty_chunk_serializes_to_nothing() {
        let data = ObjectsData::empty(ProjectionKind::Albers, 0);
        let chunks = dump_data_chunk(&data, 0, 0, MAX_CHUNK_SIZE);
        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].is_empty());
    }

    #[test]
    fn group_breaks_on_z_level_change() {
        let mut data = ObjectsData::empty(ProjectionKind::Albers, 0);
        for (z_level, base) in [(ZERO_Z_LEVEL, 10), (ZERO_Z_LEVEL + 1, 100)] {
            let first_vertex_index = data.areal_objects_vertices.len();
            data.areal_objects_vertices.extend_from_slice(&[
                p(base, base),
                p(base, base + 10),
                p(base + 10, base + 10),
                p(base + 10, base),
            ]);
            data.areal_objects.push(ArealObject::polygon(
                ArealObjectClass::Water,
                z_level,
                Ring { first_vertex_index, vertex_count: 4 },
            ));
        }

        let chunks = dump_data_chunk(&data, 0, 0, MAX_CHUNK_SIZE);
        let chunk = &chunks[0];
        assert_eq!(read_u16(chunk, chunk_offsets::AREAL_OBJECT_GROUPS_COUNT), 2);
        assert_eq!(read_u16(chunk, chunk_offsets::MIN_Z_LEVEL), ZERO_Z_LEVEL as u16);
        assert_eq!(read_u16(chunk, chunk_offsets::MAX_Z_LEVEL), (ZERO_Z_LEVEL + 1) as u16);
    }

    #[test]
    fn oversized_chunk_subdivides_within_budget() {
        // A zigzag polyline with ~50 000 vertices inside one chunk-sized
        // square forces a recursive split.
        let mut data = ObjectsData::empty(ProjectionKind::Albers, 0);
        let mut vertices = Vec::new();
        let mut x = 0;
        let mut step_y = 0;
        while vertices.len() < 50_000 {
            vertices.push(p(x, 1000 + step_y));
            x += 1;
            step_y = if step_y == 0 { 500 } else { 0 };
            if x >= MAX_CHUNK_SIZE {
                x = 0;
                step_y = 0;
            }
        }
        data.linear_objects.push(LinearObject {
            class: LinearObjectClass::Road,
            z_level: ZERO_Z_LEVEL,
            first_vertex_index: 0,
            vertex_count: vertices.len(),
        });
        data.linear_objects_vertices = vertices;

        let chunks: Vec<Vec<u8>> = dump_data_chunk(&data, 0, 0, MAX_CHUNK_SIZE)
            .into_iter()
            .filter(|chunk| !chunk.is_empty())
            .collect();

        assert!(chunks.len() >= 4 && chunks.len() <= 16, "{} chunks", chunks.len());
        for chunk in &chunks {
            let vertex_count = read_u16(chunk, chunk_offsets::VERTEX_COUNT) as usize;
            assert!(vertex_count > 0 && vertex_count <= HARD_VERTEX_LIMIT);
            assert_eq!(chunk_vertices(chunk).len(), vertex_count);
        }
    }

    #[test]
    fn all_packed_vertices_fit_16_bits_with_margin() {
        let mut data = ObjectsData::empty(ProjectionKind::Albers, 0);
        // A line crossing the whole chunk, clipped exactly at the borders.
        data.linear_objects_vertices
            .extend_from_slice(&[p(-10_000, 5), p(MAX_CHUNK_SIZE + 10_000, 5)]);
        data.linear_objects.push(LinearObject {
            class: LinearObjectClass::Road,
            z_level: ZERO_Z_LEVEL,
            first_vertex_index: 0,
            vertex_count: 2,
        });

        let chunks = dump_data_chunk(&data, 0, 0, MAX_CHUNK_SIZE);
        let vertices = chunk_vertices(&chunks[0]);
        assert_eq!(vertices.len(), 3);
        for (x, _) in &vertices[..2] {
            assert!(*x < BREAK_PRIMITIVE);
        }
    }
}
