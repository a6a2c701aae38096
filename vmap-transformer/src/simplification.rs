//! Topology-aware Douglas-Peucker-style simplification.
//!
//! Three situations forbid dropping a vertex: the chord is too long for the
//! 64-bit cross products (span guard), the corner is sharp (dot of incoming
//! and outgoing edges <= 0), or the vertex is shared with another polygon of
//! the same class and z-level (junction guard, polygons only).

use std::collections::HashMap;

use projection_transform::ProjectionPoint;
use vmap_core::classes::ArealObjectClass;
use vmap_core::ir::{ArealGeometry, ArealObject, LinearObject, ObjectsData, Ring};

const MAX_SQUARE_SPAN: i64 = 1 << 40;

type SharedVertexKey = (ArealObjectClass, usize, ProjectionPoint);
type SharedVertexMap = HashMap<SharedVertexKey, usize>;

fn simplify_line_r(
    vertices: &[ProjectionPoint],
    start: usize,
    end: usize,
    square_simplification_distance: i64,
    reject_vertex: impl Copy + Fn(ProjectionPoint) -> bool,
    out_vertices: &mut Vec<ProjectionPoint>,
) {
    debug_assert!(end > start);
    if end - start == 1 {
        out_vertices.push(vertices[start]);
        return;
    }

    let mut simplification_ok = true;

    let edge_dx = i64::from(vertices[end].x) - i64::from(vertices[start].x);
    let edge_dy = i64::from(vertices[end].y) - i64::from(vertices[start].y);
    let edge_square_length = edge_dx * edge_dx + edge_dy * edge_dy;
    if edge_square_length == 0 || edge_square_length >= MAX_SQUARE_SPAN {
        // Zero chord happens on loops; the span guard prevents overflow on
        // very long chords.
        simplification_ok = false;
    } else {
        for v in start + 1..end {
            let v_dx = i64::from(vertices[v].x) - i64::from(vertices[start].x);
            let v_dy = i64::from(vertices[v].y) - i64::from(vertices[start].y);
            let dot = edge_dx * v_dx + edge_dy * v_dy;

            let dist_vec_dx = v_dx - edge_dx * dot / edge_square_length;
            let dist_vec_dy = v_dy - edge_dy * dot / edge_square_length;
            let dist_vec_square_length =
                dist_vec_dx * dist_vec_dx + dist_vec_dy * dist_vec_dy;
            if dist_vec_square_length > square_simplification_distance {
                simplification_ok = false;
                break;
            }

            let angle_dot = (i64::from(vertices[v].x) - i64::from(vertices[v - 1].x))
                * (i64::from(vertices[v + 1].x) - i64::from(vertices[v].x))
                + (i64::from(vertices[v].y) - i64::from(vertices[v - 1].y))
                    * (i64::from(vertices[v + 1].y) - i64::from(vertices[v].y));
            if angle_dot <= 0 {
                // Do not simplify sharp corners.
                simplification_ok = false;
                break;
            }

            if reject_vertex(vertices[v]) {
                simplification_ok = false;
                break;
            }
        }
    }

    if simplification_ok {
        out_vertices.push(vertices[start]);
    } else {
        let middle = start + (end - start) / 2;
        simplify_line_r(
            vertices,
            start,
            middle,
            square_simplification_distance,
            reject_vertex,
            out_vertices,
        );
        simplify_line_r(
            vertices,
            middle,
            end,
            square_simplification_distance,
            reject_vertex,
            out_vertices,
        );
    }
}

fn simplify_line(
    vertices: &[ProjectionPoint],
    simplification_distance_units: i32,
    out_vertices: &mut Vec<ProjectionPoint>,
) {
    debug_assert!(!vertices.is_empty());

    let square_distance =
        i64::from(simplification_distance_units) * i64::from(simplification_distance_units);
    if vertices.len() > 1 {
        simplify_line_r(vertices, 0, vertices.len() - 1, square_distance, |_| false, out_vertices);
    }
    out_vertices.push(vertices[vertices.len() - 1]);
}

fn have_shared_vertices(
    shared_vertices: &SharedVertexMap,
    vertex: ProjectionPoint,
    object_class: ArealObjectClass,
    z_level: usize,
) -> bool {
    shared_vertices
        .get(&(object_class, z_level, vertex))
        .is_some_and(|&count| count > 1)
}

fn simplify_polygon(
    vertices: &[ProjectionPoint],
    simplification_distance_units: i32,
    shared_vertices: &SharedVertexMap,
    object_class: ArealObjectClass,
    z_level: usize,
    out_vertices: &mut Vec<ProjectionPoint>,
) {
    debug_assert!(vertices.len() >= 3);

    let first_vertex_index = out_vertices.len();
    let square_distance =
        i64::from(simplification_distance_units) * i64::from(simplification_distance_units);

    let reject = |vertex: ProjectionPoint| {
        have_shared_vertices(shared_vertices, vertex, object_class, z_level)
    };
    simplify_line_r(vertices, 0, vertices.len() - 1, square_distance, reject, out_vertices);
    out_vertices.push(vertices[vertices.len() - 1]);

    if out_vertices.len() - first_vertex_index <= 2 {
        out_vertices.truncate(first_vertex_index);
        return;
    }

    // Drop the closing vertex if it collapsed onto the opening one.
    let back = *out_vertices.last().expect("ring is not empty");
    if !have_shared_vertices(shared_vertices, back, object_class, z_level) {
        let front = out_vertices[first_vertex_index];
        let dx = i64::from(back.x) - i64::from(front.x);
        let dy = i64::from(back.y) - i64::from(front.y);
        if dx * dx + dy * dy <= square_distance {
            out_vertices.pop();
            if out_vertices.len() - first_vertex_index <= 2 {
                out_vertices.truncate(first_vertex_index);
                return;
            }
        }
    }

    // Discard polygons whose bounding box collapsed to the simplification
    // distance.
    let ring = &out_vertices[first_vertex_index..];
    let mut min_point = ring[0];
    let mut max_point = ring[0];
    for vertex in ring {
        min_point.x = min_point.x.min(vertex.x);
        min_point.y = min_point.y.min(vertex.y);
        max_point.x = max_point.x.max(vertex.x);
        max_point.y = max_point.y.max(vertex.y);
    }
    if max_point.x - min_point.x <= simplification_distance_units
        || max_point.y - min_point.y <= simplification_distance_units
    {
        out_vertices.truncate(first_vertex_index);
    }
}

fn count_ring_vertices(
    shared_vertices: &mut SharedVertexMap,
    vertices: &[ProjectionPoint],
    class: ArealObjectClass,
    z_level: usize,
) {
    for vertex in vertices {
        *shared_vertices.entry((class, z_level, *vertex)).or_insert(0) += 1;
    }
}

pub fn simplification_pass(data: &mut ObjectsData, simplification_distance_units: i32) {
    let simplification_distance_corrected = simplification_distance_units.max(1);

    let mut result_linear_objects = Vec::with_capacity(data.linear_objects.len());
    let mut result_linear_vertices = Vec::with_capacity(data.linear_objects_vertices.len());

    for in_object in &data.linear_objects {
        let first_vertex_index = result_linear_vertices.len();
        simplify_line(
            data.linear_object_vertices(in_object),
            simplification_distance_corrected,
            &mut result_linear_vertices,
        );
        let vertex_count = result_linear_vertices.len() - first_vertex_index;

        debug_assert!(vertex_count >= 1);
        debug_assert!(in_object.vertex_count < 2 || vertex_count >= 2);

        result_linear_objects.push(LinearObject {
            class: in_object.class,
            z_level: in_object.z_level,
            first_vertex_index,
            vertex_count,
        });
    }

    // Vertices shared between polygon rings of the same class and z-level are
    // topological junctions; they must survive simplification.
    let mut shared_vertices: SharedVertexMap = HashMap::new();
    for in_object in &data.areal_objects {
        match &in_object.geometry {
            ArealGeometry::Polygon(ring) => count_ring_vertices(
                &mut shared_vertices,
                data.ring_vertices(ring),
                in_object.class,
                in_object.z_level,
            ),
            ArealGeometry::Multipolygon { outer_rings, inner_rings } => {
                for ring in inner_rings.iter().chain(outer_rings) {
                    count_ring_vertices(
                        &mut shared_vertices,
                        data.ring_vertices(ring),
                        in_object.class,
                        in_object.z_level,
                    );
                }
            }
        }
    }

    let mut result_areal_objects = Vec::with_capacity(data.areal_objects.len());
    let mut result_areal_vertices = Vec::with_capacity(data.areal_objects_vertices.len());

    for in_object in &data.areal_objects {
        let transform_ring = |ring: &Ring, out: &mut Vec<ProjectionPoint>| -> Ring {
            let first_vertex_index = out.len();
            simplify_polygon(
                data.ring_vertices(ring),
                simplification_distance_corrected,
                &shared_vertices,
                in_object.class,
                in_object.z_level,
                out,
            );
            Ring { first_vertex_index, vertex_count: out.len() - first_vertex_index }
        };

        match &in_object.geometry {
            ArealGeometry::Polygon(ring) => {
                let out_ring = transform_ring(ring, &mut result_areal_vertices);
                if out_ring.vertex_count > 0 {
                    result_areal_objects.push(ArealObject::polygon(
                        in_object.class,
                        in_object.z_level,
                        out_ring,
                    ));
                }
            }
            ArealGeometry::Multipolygon { outer_rings, inner_rings } => {
                let mut out_inner = Vec::new();
                for ring in inner_rings {
                    let out_ring = transform_ring(ring, &mut result_areal_vertices);
                    if out_ring.vertex_count > 0 {
                        out_inner.push(out_ring);
                    }
                }
                let mut out_outer = Vec::new();
                for ring in outer_rings {
                    let out_ring = transform_ring(ring, &mut result_areal_vertices);
                    if out_ring.vertex_count > 0 {
                        out_outer.push(out_ring);
                    }
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

    data.linear_objects = result_linear_objects;
    data.linear_objects_vertices = result_linear_vertices;
    data.areal_objects = result_areal_objects;
    data.areal_objects_vertices = result_areal_vertices;

    log::info!("Simplification pass:");
    log::info!(
        "Simplification distance: {}",
        i64::from(data.coordinates_scale) * i64::from(simplification_distance_units)
    );
    log::info!("{} linear objects", data.linear_objects.len());
    log::info!("{} linear objects vertices", data.linear_objects_vertices.len());
    log::info!("{} areal objects", data.areal_objects.len());
    log::info!("{} areal objects vertices", data.areal_objects_vertices.len());
}
