//! Polygon normalization: every areal ring is made clockwise and decomposed
//! into convex parts by ear clipping, then adjacent parts are re-merged
//! wherever their union stays convex.
//!
//! Simple polygons become one areal object per convex part. Multipolygons
//! keep their outer/inner grouping (the phase sort still needs the combined
//! area) with every ring replaced by its convex parts.

use projection_transform::ProjectionPoint;
use vmap_core::geometry::{
    polygon_double_signed_area, polygon_vertex_cross, vertex_is_inside_clockwise_convex_polygon,
};
use vmap_core::ir::{ArealGeometry, ArealObject, ObjectsData, Ring};

fn wrapped(index: isize, len: usize) -> usize {
    index.rem_euclid(len as isize) as usize
}

/// Splits one ring into clockwise convex parts. Returns nothing for rings
/// with zero area.
pub fn split_polygon_into_convex_parts(
    mut vertices: Vec<ProjectionPoint>,
) -> Vec<Vec<ProjectionPoint>> {
    assert!(vertices.len() >= 3);
    let mut result: Vec<Vec<ProjectionPoint>> = Vec::new();

    let polygon_double_signed_area = polygon_double_signed_area(&vertices);
    if polygon_double_signed_area == 0 {
        return result;
    }
    if polygon_double_signed_area < 0 {
        // Make the polygon clockwise.
        vertices.reverse();
    }

    let is_reflex_vertex = |vertices: &[ProjectionPoint], index: usize| -> bool {
        polygon_vertex_cross(
            vertices[wrapped(index as isize - 1, vertices.len())],
            vertices[index % vertices.len()],
            vertices[wrapped(index as isize + 1, vertices.len())],
        ) < 0
    };

    while vertices.len() > 3 {
        let have_reflex_vertices =
            (0..vertices.len()).any(|i| is_reflex_vertex(&vertices, i));
        if !have_reflex_vertices {
            // The remainder is convex, stop the triangulation.
            break;
        }

        let mut clipped_ear = false;
        'ear_scan: for i in 0..vertices.len() {
            if is_reflex_vertex(&vertices, i) {
                continue;
            }

            let triangle = [
                vertices[wrapped(i as isize - 1, vertices.len())],
                vertices[i],
                vertices[wrapped(i as isize + 1, vertices.len())],
            ];

            for j in 2..vertices.len() - 1 {
                if vertex_is_inside_clockwise_convex_polygon(
                    &triangle,
                    vertices[(i + j) % vertices.len()],
                ) {
                    continue 'ear_scan;
                }
            }

            result.push(triangle.to_vec());
            vertices.remove(i);
            clipped_ear = true;
            break;
        }

        if !clipped_ear {
            // Degenerate ring with reflex vertices but no clippable ear;
            // emit the remainder as-is rather than spin.
            break;
        }
    }
    result.push(vertices);

    merge_convex_parts(&mut result);
    result
}

/// Re-merges parts that share a run of edges when the union stays convex.
/// Quadratic in the number of parts, cubic worst case with the restarts;
/// polygons are small enough for this to not matter.
fn merge_convex_parts(result: &mut Vec<Vec<ProjectionPoint>>) {
    'merge_loop: loop {
        for p0 in 0..result.len() {
            for p1 in 0..result.len() {
                if p0 == p1 {
                    continue;
                }
                if try_merge_pair(result, p0, p1) {
                    continue 'merge_loop;
                }
            }
        }
        break;
    }
}

fn try_merge_pair(result: &mut Vec<Vec<ProjectionPoint>>, p0: usize, p1: usize) -> bool {
    let (poly0, poly1) = (&result[p0], &result[p1]);
    let (len0, len1) = (poly0.len(), poly1.len());

    // Any one shared vertex seeds the seam search.
    let mut seed = None;
    'seed_scan: for v0 in 0..len0 {
        for v1 in 0..len1 {
            if poly0[v0] == poly1[v1] {
                seed = Some((v0 as isize, v1 as isize));
                break 'seed_scan;
            }
        }
    }
    let (seed0, seed1) = match seed {
        Some(seed) => seed,
        None => return false,
    };

    // Extend the seam in both directions. The two polygons wind in opposite
    // directions along the shared run.
    let (mut start0, mut end0) = (seed0, seed0);
    let (mut start1, mut end1) = (seed1, seed1);
    while (end0 - start0) as usize + 1 < len0
        && (end1 - start1) as usize + 1 < len1
        && poly0[wrapped(start0 - 1, len0)] == poly1[wrapped(end1 + 1, len1)]
    {
        start0 -= 1;
        end1 += 1;
    }
    while (end0 - start0) as usize + 1 < len0
        && (end1 - start1) as usize + 1 < len1
        && poly0[wrapped(end0 + 1, len0)] == poly1[wrapped(start1 - 1, len1)]
    {
        end0 += 1;
        start1 -= 1;
    }

    if start0 == end0 {
        // Only one shared vertex; nothing to glue along.
        return false;
    }

    // The merge is legal only if both seam-end vertices stay convex.
    let cross0 = polygon_vertex_cross(
        poly0[wrapped(start0 - 1, len0)],
        poly0[wrapped(start0, len0)],
        poly1[wrapped(end1 + 1, len1)],
    );
    let cross1 = polygon_vertex_cross(
        poly1[wrapped(start1 - 1, len1)],
        poly1[wrapped(start1, len1)],
        poly0[wrapped(end0 + 1, len0)],
    );
    if !(cross0 >= 0 && cross1 >= 0) {
        return false;
    }

    let poly0_vertex_count = len0 - (end0 - start0) as usize;
    let poly1_vertex_count = len1 - (end1 - start1) as usize;
    let mut poly_combined = Vec::with_capacity(poly0_vertex_count + poly1_vertex_count);
    for i in 0..poly0_vertex_count {
        poly_combined.push(poly0[wrapped(end0 + i as isize, len0)]);
    }
    for i in 0..poly1_vertex_count {
        poly_combined.push(poly1[wrapped(end1 + i as isize, len1)]);
    }
    debug_assert!(poly_combined.len() >= 3);

    result[p0] = poly_combined;
    result.swap_remove(p1);
    true
}

pub fn normalize_polygons(data: &mut ObjectsData) {
    let mut result_areal_objects = Vec::with_capacity(data.areal_objects.len());
    let mut result_areal_vertices = Vec::with_capacity(data.areal_objects_vertices.len());

    let push_ring_parts = |ring: &Ring,
                           data: &ObjectsData,
                           out: &mut Vec<ProjectionPoint>|
     -> Vec<Ring> {
        let mut parts = Vec::new();
        for polygon_part in split_polygon_into_convex_parts(data.ring_vertices(ring).to_vec())
        {
            debug_assert!(polygon_part.len() >= 3);
            let first_vertex_index = out.len();
            let vertex_count = polygon_part.len();
            out.extend(polygon_part);
            parts.push(Ring { first_vertex_index, vertex_count });
        }
        parts
    };

    for in_object in &data.areal_objects {
        match &in_object.geometry {
            ArealGeometry::Polygon(ring) => {
                for part in push_ring_parts(ring, data, &mut result_areal_vertices) {
                    result_areal_objects.push(ArealObject::polygon(
                        in_object.class,
                        in_object.z_level,
                        part,
                    ));
                }
            }
            ArealGeometry::Multipolygon { outer_rings, inner_rings } => {
                let mut out_inner = Vec::new();
                for ring in inner_rings {
                    out_inner.extend(push_ring_parts(ring, data, &mut result_areal_vertices));
                }
                let mut out_outer = Vec::new();
                for ring in outer_rings {
                    out_outer.extend(push_ring_parts(ring, data, &mut result_areal_vertices));
                }
                if !out_outer.is_empty() {
                    result_areal_objects.push(ArealObject {
                        class: in_object.class,
                        z_level: in_object.z_level,
                        geometry: ArealGeometry::Multipolygon {
                            outer_rings: out_outer,
                            inner_rings: out_inner,
                        },
                    });
                }
            }
        }
    }

    data.areal_objects = result_areal_objects;
    data.areal_objects_vertices = result_areal_vertices;

    log::info!("Polygons normalization pass:");
    log::info!("{} areal objects", data.areal_objects.len());
    log::info!("{} areal objects vertices", data.areal_objects_vertices.len());
}
