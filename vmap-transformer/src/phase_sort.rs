//! Draw-order sorting: points by the style's class order, lines by
//! (z-level, class order), areal objects by (z-level, phase, descending
//! area). The renderer walks the result front to back with no sorting of its
//! own, so ties must stay in input order (all sorts here are stable).

use std::collections::HashMap;

use vmap_core::geometry::polygon_double_signed_area;
use vmap_core::ir::{ArealGeometry, ArealObject, LinearObject, ObjectsData, PointObject, Ring};
use vmap_core::styles::ZoomLevelStyles;
use vmap_core::MAX_Z_LEVEL;

fn areal_object_double_area(data: &ObjectsData, object: &ArealObject) -> i64 {
    match &object.geometry {
        ArealGeometry::Polygon(ring) => {
            polygon_double_signed_area(data.ring_vertices(ring)).abs()
        }
        ArealGeometry::Multipolygon { outer_rings, inner_rings } => {
            // Total area of outer parts minus the area of the holes.
            let mut accumulated_area = 0;
            for ring in outer_rings {
                accumulated_area += polygon_double_signed_area(data.ring_vertices(ring)).abs();
            }
            for ring in inner_rings {
                accumulated_area -= polygon_double_signed_area(data.ring_vertices(ring)).abs();
            }
            accumulated_area
        }
    }
}

pub fn sort_by_phase(in_data: &ObjectsData, zoom_level: &ZoomLevelStyles) -> ObjectsData {
    let mut result = ObjectsData::empty(in_data.projection_kind, in_data.zoom_level_log2);
    result.geo_min = in_data.geo_min;
    result.geo_max = in_data.geo_max;
    result.min_point = in_data.min_point;
    result.max_point = in_data.max_point;
    result.coordinates_scale = in_data.coordinates_scale;
    result.meters_in_unit = in_data.meters_in_unit;

    // Points: style order first, input order within a class.
    for object_class in &zoom_level.point_classes_ordered {
        for in_object in &in_data.point_objects {
            if in_object.class != *object_class {
                continue;
            }
            result.point_objects.push(PointObject {
                class: in_object.class,
                vertex_index: result.point_objects_vertices.len(),
            });
            result
                .point_objects_vertices
                .push(in_data.point_objects_vertices[in_object.vertex_index]);
        }
    }

    // Lines: collect in style order, then stable-sort by (z-level, order).
    let mut linear_classes_order = HashMap::new();
    for (order, object_class) in zoom_level.linear_classes_ordered.iter().enumerate() {
        linear_classes_order.insert(*object_class, order);

        for in_object in &in_data.linear_objects {
            if in_object.class != *object_class {
                continue;
            }
            let first_vertex_index = result.linear_objects_vertices.len();
            result
                .linear_objects_vertices
                .extend_from_slice(in_data.linear_object_vertices(in_object));
            result.linear_objects.push(LinearObject {
                class: in_object.class,
                z_level: in_object.z_level,
                first_vertex_index,
                vertex_count: in_object.vertex_count,
            });
        }
    }
    result.linear_objects.sort_by_key(|object| {
        (object.z_level, linear_classes_order[&object.class])
    });

    // Areal objects: z-level outermost, then phase, then descending area so
    // the largest polygon of a phase is drawn first.
    for z_level in 0..=MAX_Z_LEVEL {
        for phase in &zoom_level.areal_object_phases {
            let mut phase_objects: Vec<(i64, &ArealObject)> = in_data
                .areal_objects
                .iter()
                .filter(|object| {
                    object.z_level == z_level && phase.classes.contains(&object.class)
                })
                .map(|object| (areal_object_double_area(in_data, object), object))
                .collect();

            phase_objects.sort_by_key(|(area, _)| std::cmp::Reverse(*area));

            for (_, in_object) in phase_objects {
                let copy_ring = |ring: &Ring, out: &mut ObjectsData| -> Ring {
                    let first_vertex_index = out.areal_objects_vertices.len();
                    out.areal_objects_vertices
                        .extend_from_slice(in_data.ring_vertices(ring));
                    Ring { first_vertex_index, vertex_count: ring.vertex_count }
                };

                let geometry = match &in_object.geometry {
                    ArealGeometry::Polygon(ring) => {
                        ArealGeometry::Polygon(copy_ring(ring, &mut result))
                    }
                    ArealGeometry::Multipolygon { outer_rings, inner_rings } => {
                        let inner_rings = inner_rings
                            .iter()
                            .map(|ring| copy_ring(ring, &mut result))
                            .collect();
                        let outer_rings = outer_rings
                            .iter()
                            .map(|ring| copy_ring(ring, &mut result))
                            .collect();
                        ArealGeometry::Multipolygon { outer_rings, inner_rings }
                    }
                };
                result.areal_objects.push(ArealObject {
                    class: in_object.class,
                    z_level: in_object.z_level,
                    geometry,
                });
            }
        }
    }

    log::info!("Phase sort pass:");
    log::info!("{} point classes", zoom_level.point_classes_ordered.len());
    log::info!("{} linear classes", zoom_level.linear_classes_ordered.len());
    log::info!("{} areal objects phases", zoom_level.areal_object_phases.len());

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use projection_transform::{ProjectionKind, ProjectionPoint};
    use std::collections::HashSet;
    use vmap_core::classes::{ArealObjectClass, LinearObjectClass, PointObjectClass};
    use vmap_core::styles::ArealPhase;
    use vmap_core::ZERO_Z_LEVEL;

    fn p(x: i32, y: i32) -> ProjectionPoint {
        ProjectionPoint { x, y }
    }

    fn test_zoom_level() -> ZoomLevelStyles {
        ZoomLevelStyles {
            zoom_level_log2: 0,
            simplification_distance_units: 1,
            point_classes_ordered: vec![
                PointObjectClass::SubwayEntrance,
                PointObjectClass::StationPlatform,
            ],
            linear_classes_ordered: vec![
                LinearObjectClass::Waterway,
                LinearObjectClass::Road,
            ],
            areal_object_phases: vec![
                ArealPhase {
                    classes: HashSet::from([ArealObjectClass::Water]),
                },
                ArealPhase {
                    classes: HashSet::from([ArealObjectClass::Building]),
                },
            ],
            point_object_styles: HashMap::new(),
            linear_object_styles: HashMap::new(),
            areal_object_styles: HashMap::new(),
        }
    }

    fn push_square(data: &mut ObjectsData, class: ArealObjectClass, z_level: usize, side: i32) {
        let first_vertex_index = data.areal_objects_vertices.len();
        data.areal_objects_vertices.extend_from_slice(&[
            p(0, 0),
            p(0, side),
            p(side, side),
            p(side, 0),
        ]);
        data.areal_objects.push(ArealObject::polygon(
            class,
            z_level,
            Ring { first_vertex_index, vertex_count: 4 },
        ));
    }

    #[test]
    fn points_follow_style_order() {
        let mut data = ObjectsData::empty(ProjectionKind::Albers, 0);
        for (class, vertex) in [
            (PointObjectClass::StationPlatform, p(1, 1)),
            (PointObjectClass::SubwayEntrance, p(2, 2)),
            (PointObjectClass::StationPlatform, p(3, 3)),
        ] {
            data.point_objects.push(PointObject {
                class,
                vertex_index: data.point_objects_vertices.len(),
            });
            data.point_objects_vertices.push(vertex);
        }

        let sorted = sort_by_phase(&data, &test_zoom_level());
        let classes: Vec<_> = sorted.point_objects.iter().map(|o| o.class).collect();
        assert_eq!(
            classes,
            vec![
                PointObjectClass::SubwayEntrance,
                PointObjectClass::StationPlatform,
                PointObjectClass::StationPlatform,
            ]
        );
        // Input order preserved within a class.
        assert_eq!(sorted.point_objects_vertices[1], p(1, 1));
        assert_eq!(sorted.point_objects_vertices[2], p(3, 3));
    }

    #[test]
    fn lines_sort_by_z_level_then_class_order() {
        let mut data = ObjectsData::empty(ProjectionKind::Albers, 0);
        for (class, z_level) in [
            (LinearObjectClass::Road, ZERO_Z_LEVEL + 1),
            (LinearObjectClass::Road, ZERO_Z_LEVEL),
            (LinearObjectClass::Waterway, ZERO_Z_LEVEL + 1),
        ] {
            let first_vertex_index = data.linear_objects_vertices.len();
            data.linear_objects_vertices.extend_from_slice(&[p(0, 0), p(1, 1)]);
            data.linear_objects.push(LinearObject {
                class,
                z_level,
                first_vertex_index,
                vertex_count: 2,
            });
        }

        let sorted = sort_by_phase(&data, &test_zoom_level());
        let order: Vec<_> = sorted
            .linear_objects
            .iter()
            .map(|o| (o.z_level, o.class))
            .collect();
        assert_eq!(
            order,
            vec![
                (ZERO_Z_LEVEL, LinearObjectClass::Road),
                (ZERO_Z_LEVEL + 1, LinearObjectClass::Waterway),
                (ZERO_Z_LEVEL + 1, LinearObjectClass::Road),
            ]
        );
    }

    #[test]
    fn classes_outside_the_style_order_are_dropped() {
        let mut data = ObjectsData::empty(ProjectionKind::Albers, 0);
        data.linear_objects_vertices.extend_from_slice(&[p(0, 0), p(1, 1)]);
        data.linear_objects.push(LinearObject {
            class: LinearObjectClass::Barrier,
            z_level: ZERO_Z_LEVEL,
            first_vertex_index: 0,
            vertex_count: 2,
        });

        let sorted = sort_by_phase(&data, &test_zoom_level());
        assert!(sorted.linear_objects.is_empty());
    }

    #[test]
    fn areals_sort_by_phase_then_descending_area() {
        let mut data = ObjectsData::empty(ProjectionKind::Albers, 0);
        push_square(&mut data, ArealObjectClass::Building, ZERO_Z_LEVEL, 10);
        push_square(&mut data, ArealObjectClass::Water, ZERO_Z_LEVEL, 5);
        push_square(&mut data, ArealObjectClass::Building, ZERO_Z_LEVEL, 30);

        let sorted = sort_by_phase(&data, &test_zoom_level());
        let order: Vec<_> = sorted
            .areal_objects
            .iter()
            .map(|o| (o.class, areal_object_double_area(&sorted, o)))
            .collect();
        // Water phase first, then buildings largest first.
        assert_eq!(
            order,
            vec![
                (ArealObjectClass::Water, 50),
                (ArealObjectClass::Building, 1800),
                (ArealObjectClass::Building, 200),
            ]
        );
    }

    #[test]
    fn z_levels_dominate_phases_for_areals() {
        let mut data = ObjectsData::empty(ProjectionKind::Albers, 0);
        push_square(&mut data, ArealObjectClass::Building, ZERO_Z_LEVEL + 1, 10);
        push_square(&mut data, ArealObjectClass::Water, ZERO_Z_LEVEL, 10);

        let sorted = sort_by_phase(&data, &test_zoom_level());
        assert_eq!(sorted.areal_objects[0].class, ArealObjectClass::Water);
        assert_eq!(sorted.areal_objects[1].class, ArealObjectClass::Building);
    }

    #[test]
    fn phase_sort_is_idempotent() {
        let mut data = ObjectsData::empty(ProjectionKind::Albers, 0);
        push_square(&mut data, ArealObjectClass::Water, ZERO_Z_LEVEL, 20);
        push_square(&mut data, ArealObjectClass::Building, ZERO_Z_LEVEL, 10);
        let first_vertex_index = data.linear_objects_vertices.len();
        data.linear_objects_vertices.extend_from_slice(&[p(0, 0), p(5, 5)]);
        data.linear_objects.push(LinearObject {
            class: LinearObjectClass::Road,
            z_level: ZERO_Z_LEVEL,
            first_vertex_index,
            vertex_count: 2,
        });

        let zoom_level = test_zoom_level();
        let once = sort_by_phase(&data, &zoom_level);
        let twice = sort_by_phase(&once, &zoom_level);

        assert_eq!(once.point_objects_vertices, twice.point_objects_vertices);
        assert_eq!(once.linear_objects_vertices, twice.linear_objects_vertices);
        assert_eq!(once.areal_objects_vertices, twice.areal_objects_vertices);
        assert_eq!(once.linear_objects.len(), twice.linear_objects.len());
        for (l, r) in once.linear_objects.iter().zip(&twice.linear_objects) {
            assert_eq!((l.class, l.z_level, l.first_vertex_index, l.vertex_count),
                (r.class, r.z_level, r.first_vertex_index, r.vertex_count));
        }
        for (l, r) in once.areal_objects.iter().zip(&twice.areal_objects) {
            assert_eq!((l.class, l.z_level), (r.class, r.z_level));
        }
    }
}
