//! Geodetic to projected-unit transformation of one zoom level.
//!
//! Chooses the base projection and unit size, re-bases every vertex and drops
//! the degenerate geometry that quantization creates: consecutive duplicate
//! vertices, duplicated ring closing vertices, rings that collapse below
//! three vertices.

use projection_transform::{
    select_unit_size, GeoPoint, LinearProjection, Projection, ProjectionError,
    ProjectionKind, ProjectionPoint,
};
use vmap_core::ir::{
    ArealGeometry, ArealObject, LinearObject, ObjectsData, OsmParseResult, PointObject, Ring,
};

pub fn transform_coordinates(
    prepared_data: &OsmParseResult,
    projection_kind: ProjectionKind,
    zoom_level_log2: u32,
) -> Result<ObjectsData, ProjectionError> {
    if prepared_data.vertices.is_empty() {
        return Ok(ObjectsData::empty(projection_kind, zoom_level_log2));
    }

    let mut geo_min = GeoPoint { x: 180.0, y: 90.0 };
    let mut geo_max = GeoPoint { x: -180.0, y: -90.0 };
    for geo_point in &prepared_data.vertices {
        geo_min.x = geo_min.x.min(geo_point.x);
        geo_min.y = geo_min.y.min(geo_point.y);
        geo_max.x = geo_max.x.max(geo_point.x);
        geo_max.y = geo_max.y.max(geo_point.y);
    }

    let base_projection = Projection::new(projection_kind, geo_min, geo_max);
    let unit = select_unit_size(&base_projection, geo_min, geo_max, zoom_level_log2)?;
    let projection =
        LinearProjection::new(base_projection, geo_min, geo_max, unit.coordinates_scale);

    let mut result = ObjectsData::empty(projection_kind, zoom_level_log2);
    result.geo_min = geo_min;
    result.geo_max = geo_max;
    result.min_point = projection.min_point();
    result.max_point = projection.max_point();
    result.coordinates_scale = unit.coordinates_scale;
    result.meters_in_unit = unit.meters_in_unit;

    for in_object in &prepared_data.point_objects {
        result.point_objects.push(PointObject {
            class: in_object.class,
            vertex_index: result.point_objects_vertices.len(),
        });
        result
            .point_objects_vertices
            .push(projection.project(&prepared_data.vertices[in_object.vertex_index]));
    }

    // Remove equal adjacent vertices of linear objects.
    for in_object in &prepared_data.linear_objects {
        let first_vertex_index = result.linear_objects_vertices.len();
        result
            .linear_objects_vertices
            .push(projection.project(&prepared_data.vertices[in_object.first_vertex_index]));

        for v in in_object.first_vertex_index + 1
            ..in_object.first_vertex_index + in_object.vertex_count
        {
            let vertex_transformed = projection.project(&prepared_data.vertices[v]);
            if Some(&vertex_transformed) != result.linear_objects_vertices.last() {
                result.linear_objects_vertices.push(vertex_transformed);
            }
        }

        result.linear_objects.push(LinearObject {
            class: in_object.class,
            z_level: in_object.z_level,
            first_vertex_index,
            vertex_count: result.linear_objects_vertices.len() - first_vertex_index,
        });
    }

    // Remove equal adjacent vertices of areal rings; collapse the duplicated
    // closing vertex; drop rings that end up with less than 3 vertices.
    let transform_ring = |ring: &Ring, pool: &mut Vec<ProjectionPoint>| -> Ring {
        let first_vertex_index = pool.len();
        pool.push(projection.project(&prepared_data.vertices[ring.first_vertex_index]));

        for v in ring.first_vertex_index + 1..ring.first_vertex_index + ring.vertex_count {
            let vertex_transformed = projection.project(&prepared_data.vertices[v]);
            if Some(&vertex_transformed) != pool.last() {
                pool.push(vertex_transformed);
            }
        }

        let mut vertex_count = pool.len() - first_vertex_index;
        if vertex_count >= 3 && pool[first_vertex_index] == pool[first_vertex_index + vertex_count - 1]
        {
            pool.pop();
            vertex_count -= 1;
        }
        if vertex_count < 3 {
            pool.truncate(first_vertex_index);
            vertex_count = 0;
        }
        Ring { first_vertex_index, vertex_count }
    };

    for in_object in &prepared_data.areal_objects {
        match &in_object.geometry {
            ArealGeometry::Polygon(ring) => {
                let out_ring = transform_ring(ring, &mut result.areal_objects_vertices);
                if out_ring.vertex_count > 0 {
                    result.areal_objects.push(ArealObject::polygon(
                        in_object.class,
                        in_object.z_level,
                        out_ring,
                    ));
                }
            }
            ArealGeometry::Multipolygon { outer_rings, inner_rings } => {
                let mut out_inner = Vec::new();
                for ring in inner_rings {
                    let out_ring = transform_ring(ring, &mut result.areal_objects_vertices);
                    if out_ring.vertex_count > 0 {
                        out_inner.push(out_ring);
                    }
                }
                let mut out_outer = Vec::new();
                for ring in outer_rings {
                    let out_ring = transform_ring(ring, &mut result.areal_objects_vertices);
                    if out_ring.vertex_count > 0 {
                        out_outer.push(out_ring);
                    }
                }
                if !out_outer.is_empty() {
                    result.areal_objects.push(ArealObject {
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

    debug_assert_eq!(result.point_objects.len(), result.point_objects_vertices.len());

    log::info!("Coordinates transformation pass:");
    log::info!("Unit size: {}", result.coordinates_scale);
    log::info!("{} point objects", result.point_objects.len());
    log::info!("{} linear objects", result.linear_objects.len());
    log::info!("{} linear objects vertices", result.linear_objects_vertices.len());
    log::info!("{} areal objects", result.areal_objects.len());
    log::info!("{} areal objects vertices", result.areal_objects_vertices.len());

    Ok(result)
}
