//! Integer clipping of polylines and convex polygons against the four
//! half-planes of a chunk bounding box (Sutherland-Hodgman).
//!
//! Intersection points are the weighted mean of the segment endpoints, the
//! weights being the absolute plane distances of the opposite ends. All
//! products run in 64-bit.

use projection_transform::ProjectionPoint;

fn vertex_signed_plane_distance(
    vertex: ProjectionPoint,
    distance: i64,
    normal_x: i64,
    normal_y: i64,
) -> i64 {
    i64::from(vertex.x) * normal_x + i64::from(vertex.y) * normal_y - distance
}

fn split_segment(
    v0: ProjectionPoint,
    v1: ProjectionPoint,
    distance: i64,
    normal_x: i64,
    normal_y: i64,
) -> ProjectionPoint {
    let dist0 = vertex_signed_plane_distance(v0, distance, normal_x, normal_y).abs();
    let dist1 = vertex_signed_plane_distance(v1, distance, normal_x, normal_y).abs();
    let dist_sum = dist0 + dist1;
    if dist_sum > 0 {
        ProjectionPoint {
            x: ((i64::from(v0.x) * dist1 + i64::from(v1.x) * dist0) / dist_sum) as i32,
            y: ((i64::from(v0.y) * dist1 + i64::from(v1.y) * dist0) / dist_sum) as i32,
        }
    } else {
        v0
    }
}

/// Splits a polyline against one half-plane, keeping the non-negative side.
/// Crossing the plane ends the current output piece.
fn split_polyline_plane(
    polyline: &[ProjectionPoint],
    distance: i64,
    normal_x: i64,
    normal_y: i64,
) -> Vec<Vec<ProjectionPoint>> {
    debug_assert!(!polyline.is_empty());
    let mut polylines = Vec::new();

    let mut prev_vertex_pos =
        vertex_signed_plane_distance(polyline[0], distance, normal_x, normal_y);
    let mut result_polyline = Vec::new();
    if prev_vertex_pos >= 0 {
        result_polyline.push(polyline[0]);
    }

    for i in 1..polyline.len() {
        let cur_vertex_pos =
            vertex_signed_plane_distance(polyline[i], distance, normal_x, normal_y);
        if prev_vertex_pos >= 0 && cur_vertex_pos >= 0 {
            result_polyline.push(polyline[i]);
        } else if prev_vertex_pos >= 0 && cur_vertex_pos < 0 {
            result_polyline.push(split_segment(
                polyline[i - 1],
                polyline[i],
                distance,
                normal_x,
                normal_y,
            ));
            debug_assert!(result_polyline.len() >= 2);
            polylines.push(std::mem::take(&mut result_polyline));
        } else if prev_vertex_pos < 0 && cur_vertex_pos >= 0 {
            result_polyline.push(split_segment(
                polyline[i - 1],
                polyline[i],
                distance,
                normal_x,
                normal_y,
            ));
            result_polyline.push(polyline[i]);
        }
        prev_vertex_pos = cur_vertex_pos;
    }

    if !result_polyline.is_empty() {
        polylines.push(result_polyline);
    }

    polylines
}

/// Clips a polyline to a bounding box; the result is zero or more pieces
/// whose vertices all lie inside the box.
pub fn split_polyline(
    polyline: &[ProjectionPoint],
    bb_min_x: i32,
    bb_min_y: i32,
    bb_max_x: i32,
    bb_max_y: i32,
) -> Vec<Vec<ProjectionPoint>> {
    debug_assert!(!polyline.is_empty());

    let normals: [[i64; 2]; 4] = [[1, 0], [-1, 0], [0, 1], [0, -1]];
    let distances: [i64; 4] = [
        i64::from(bb_min_x),
        -i64::from(bb_max_x),
        i64::from(bb_min_y),
        -i64::from(bb_max_y),
    ];

    let mut polylines = vec![polyline.to_vec()];
    for i in 0..4 {
        let mut new_polylines = Vec::new();
        for polyline in &polylines {
            new_polylines.extend(split_polyline_plane(
                polyline,
                distances[i],
                normals[i][0],
                normals[i][1],
            ));
        }
        polylines = new_polylines;
    }

    polylines
}

/// Clips a convex polygon against one half-plane. The result is empty or a
/// convex polygon with at least 3 vertices.
fn split_convex_polygon_plane(
    polygon: &[ProjectionPoint],
    distance: i64,
    normal_x: i64,
    normal_y: i64,
) -> Vec<ProjectionPoint> {
    debug_assert!(polygon.len() >= 3);

    let split = |i: usize| -> ProjectionPoint {
        split_segment(
            polygon[i],
            polygon[(i + 1) % polygon.len()],
            distance,
            normal_x,
            normal_y,
        )
    };

    let first_vertex_pos =
        vertex_signed_plane_distance(polygon[0], distance, normal_x, normal_y);
    let mut prev_vertex_pos = first_vertex_pos;
    let mut result_polygon = Vec::new();
    if prev_vertex_pos >= 0 {
        result_polygon.push(polygon[0]);
    }

    for i in 1..polygon.len() {
        let cur_vertex_pos =
            vertex_signed_plane_distance(polygon[i], distance, normal_x, normal_y);
        if prev_vertex_pos >= 0 && cur_vertex_pos >= 0 {
            result_polygon.push(polygon[i]);
        } else if prev_vertex_pos >= 0 && cur_vertex_pos < 0 {
            result_polygon.push(split(i - 1));
        } else if prev_vertex_pos < 0 && cur_vertex_pos >= 0 {
            result_polygon.push(split(i - 1));
            result_polygon.push(polygon[i]);
        }
        prev_vertex_pos = cur_vertex_pos;
    }

    // Close over the wrap-around edge.
    if (first_vertex_pos >= 0) != (prev_vertex_pos >= 0) {
        result_polygon.push(split(polygon.len() - 1));
    }

    debug_assert!(result_polygon.is_empty() || result_polygon.len() >= 3);
    result_polygon
}

/// Clips a convex polygon to a bounding box. Returns an empty vector when the
/// polygon lies fully outside.
pub fn split_convex_polygon(
    polygon: &[ProjectionPoint],
    bb_min_x: i32,
    bb_min_y: i32,
    bb_max_x: i32,
    bb_max_y: i32,
) -> Vec<ProjectionPoint> {
    debug_assert!(polygon.len() >= 3);

    let normals: [[i64; 2]; 4] = [[1, 0], [-1, 0], [0, 1], [0, -1]];
    let distances: [i64; 4] = [
        i64::from(bb_min_x),
        -i64::from(bb_max_x),
        i64::from(bb_min_y),
        -i64::from(bb_max_y),
    ];

    let mut result = polygon.to_vec();
    for i in 0..4 {
        result = split_convex_polygon_plane(&result, distances[i], normals[i][0], normals[i][1]);
        if result.len() < 3 {
            return Vec::new();
        }
    }

    result
}
