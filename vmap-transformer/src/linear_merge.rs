//! Concatenates polylines of the same class and z-level that meet at an
//! endpoint. After this pass no two output lines of one (class, z-level) pair
//! share any endpoint.
//!
//! The merge map is hash-based; output order is made deterministic by a final
//! sort over (class, z-level, vertices).

use std::collections::HashMap;

use projection_transform::ProjectionPoint;
use vmap_core::classes::LinearObjectClass;
use vmap_core::ir::{LinearObject, ObjectsData};

struct MergeObject {
    class: LinearObjectClass,
    z_level: usize,
    vertices: Vec<ProjectionPoint>,
    alive: bool,
}

type EndpointKey = (LinearObjectClass, usize, ProjectionPoint);

struct MergeMap {
    objects: Vec<MergeObject>,
    by_endpoint: HashMap<EndpointKey, usize>,
}

impl MergeMap {
    fn front_key(&self, index: usize) -> EndpointKey {
        let object = &self.objects[index];
        (object.class, object.z_level, *object.vertices.first().expect("non-empty line"))
    }

    fn back_key(&self, index: usize) -> EndpointKey {
        let object = &self.objects[index];
        (object.class, object.z_level, *object.vertices.last().expect("non-empty line"))
    }

    fn remove(&mut self, index: usize) {
        let front = self.front_key(index);
        let back = self.back_key(index);
        self.by_endpoint.remove(&front);
        self.by_endpoint.remove(&back);
    }

    /// Inserts an object, splicing it onto any existing object that shares an
    /// endpoint. Splicing can cascade: the combined line may in turn close a
    /// gap to a third one.
    fn put(&mut self, mut index: usize) {
        loop {
            let front_key = self.front_key(index);
            let back_key = self.back_key(index);

            if let Some(&other) = self.by_endpoint.get(&front_key) {
                debug_assert_ne!(other, index);
                self.remove(other);

                let new_vertices = std::mem::take(&mut self.objects[index].vertices);
                self.objects[index].alive = false;

                let other_object = &mut self.objects[other];
                if front_key.2 == *other_object.vertices.first().expect("non-empty line") {
                    // Meet front-to-front: prepend the new line reversed,
                    // without the shared endpoint.
                    let mut prefix: Vec<ProjectionPoint> =
                        new_vertices.iter().rev().copied().collect();
                    prefix.pop();
                    let tail = std::mem::take(&mut other_object.vertices);
                    other_object.vertices = prefix;
                    other_object.vertices.extend(tail);
                } else {
                    other_object.vertices.extend(new_vertices.into_iter().skip(1));
                }

                index = other;
            } else if let Some(&other) = self.by_endpoint.get(&back_key) {
                debug_assert_ne!(other, index);
                self.remove(other);

                let new_vertices = std::mem::take(&mut self.objects[index].vertices);
                self.objects[index].alive = false;

                let other_object = &mut self.objects[other];
                if back_key.2 == *other_object.vertices.first().expect("non-empty line") {
                    // Meet back-to-front: prepend the new line as-is.
                    let mut prefix = new_vertices;
                    prefix.pop();
                    let tail = std::mem::take(&mut other_object.vertices);
                    other_object.vertices = prefix;
                    other_object.vertices.extend(tail);
                } else {
                    // Meet back-to-back: append the new line reversed.
                    other_object
                        .vertices
                        .extend(new_vertices.into_iter().rev().skip(1));
                }

                index = other;
            } else {
                self.by_endpoint.insert(front_key, index);
                self.by_endpoint.insert(back_key, index);
                return;
            }
        }
    }
}

pub fn merge_linear_objects(data: &mut ObjectsData) {
    let mut merge_map = MergeMap { objects: Vec::new(), by_endpoint: HashMap::new() };

    for in_object in &data.linear_objects {
        let vertices = data.linear_object_vertices(in_object).to_vec();
        merge_map.objects.push(MergeObject {
            class: in_object.class,
            z_level: in_object.z_level,
            vertices,
            alive: true,
        });
        merge_map.put(merge_map.objects.len() - 1);
    }

    let mut merged: Vec<MergeObject> =
        merge_map.objects.into_iter().filter(|object| object.alive).collect();

    // Hash iteration must not leak into the output: order by content.
    merged.sort_by(|l, r| {
        (l.class as u8, l.z_level)
            .cmp(&(r.class as u8, r.z_level))
            .then_with(|| {
                let l_key = l.vertices.iter().map(|v| (v.x, v.y));
                let r_key = r.vertices.iter().map(|v| (v.x, v.y));
                l_key.cmp(r_key)
            })
    });

    data.linear_objects.clear();
    data.linear_objects_vertices.clear();
    for object in merged {
        data.linear_objects.push(LinearObject {
            class: object.class,
            z_level: object.z_level,
            first_vertex_index: data.linear_objects_vertices.len(),
            vertex_count: object.vertices.len(),
        });
        data.linear_objects_vertices.extend(object.vertices);
    }

    log::info!("Linear objects merge pass:");
    log::info!("{} linear objects", data.linear_objects.len());
    log::info!("{} linear objects vertices", data.linear_objects_vertices.len());
}

#[cfg(test)]
mod tests {
    use super::*;
    use projection_transform::ProjectionKind;
    use vmap_core::ZERO_Z_LEVEL;

    fn p(x: i32, y: i32) -> ProjectionPoint {
        ProjectionPoint { x, y }
    }

    fn data_with_lines(lines: &[(LinearObjectClass, usize, &[ProjectionPoint])]) -> ObjectsData {
        let mut data = ObjectsData::empty(ProjectionKind::Albers, 0);
        for (class, z_level, vertices) in lines {
            data.linear_objects.push(LinearObject {
                class: *class,
                z_level: *z_level,
                first_vertex_index: data.linear_objects_vertices.len(),
                vertex_count: vertices.len(),
            });
            data.linear_objects_vertices.extend_from_slice(vertices);
        }
        data
    }

    fn endpoints(data: &ObjectsData) -> Vec<(ProjectionPoint, ProjectionPoint)> {
        data.linear_objects
            .iter()
            .map(|object| {
                let vertices = data.linear_object_vertices(object);
                (vertices[0], *vertices.last().unwrap())
            })
            .collect()
    }

    #[test]
    fn chains_sharing_an_endpoint_are_joined() {
        let mut data = data_with_lines(&[
            (LinearObjectClass::Road, ZERO_Z_LEVEL, &[p(0, 0), p(10, 0)]),
            (LinearObjectClass::Road, ZERO_Z_LEVEL, &[p(10, 0), p(20, 5)]),
        ]);
        merge_linear_objects(&mut data);

        assert_eq!(data.linear_objects.len(), 1);
        assert_eq!(data.linear_objects[0].vertex_count, 3);
        assert_eq!(
            data.linear_object_vertices(&data.linear_objects[0]),
            &[p(0, 0), p(10, 0), p(20, 5)]
        );
    }

    #[test]
    fn reversed_lines_are_spliced_with_correct_orientation() {
        // Second line runs backwards into the first one's end.
        let mut data = data_with_lines(&[
            (LinearObjectClass::Road, ZERO_Z_LEVEL, &[p(0, 0), p(10, 0)]),
            (LinearObjectClass::Road, ZERO_Z_LEVEL, &[p(20, 5), p(10, 0)]),
        ]);
        merge_linear_objects(&mut data);

        assert_eq!(data.linear_objects.len(), 1);
        let vertices = data.linear_object_vertices(&data.linear_objects[0]).to_vec();
        let forward = vertices == [p(0, 0), p(10, 0), p(20, 5)];
        let backward = vertices == [p(20, 5), p(10, 0), p(0, 0)];
        assert!(forward || backward, "unexpected splice: {vertices:?}");
    }

    #[test]
    fn different_classes_never_merge() {
        let mut data = data_with_lines(&[
            (LinearObjectClass::Road, ZERO_Z_LEVEL, &[p(0, 0), p(10, 0)]),
            (LinearObjectClass::Waterway, ZERO_Z_LEVEL, &[p(10, 0), p(20, 0)]),
        ]);
        merge_linear_objects(&mut data);
        assert_eq!(data.linear_objects.len(), 2);
    }

    #[test]
    fn different_z_levels_never_merge() {
        let mut data = data_with_lines(&[
            (LinearObjectClass::Road, ZERO_Z_LEVEL, &[p(0, 0), p(10, 0)]),
            (LinearObjectClass::Road, ZERO_Z_LEVEL + 1, &[p(10, 0), p(20, 0)]),
        ]);
        merge_linear_objects(&mut data);
        assert_eq!(data.linear_objects.len(), 2);
    }

    #[test]
    fn three_way_cascade_collapses_to_one_line() {
        let mut data = data_with_lines(&[
            (LinearObjectClass::Road, ZERO_Z_LEVEL, &[p(0, 0), p(10, 0)]),
            (LinearObjectClass::Road, ZERO_Z_LEVEL, &[p(20, 0), p(30, 0)]),
            (LinearObjectClass::Road, ZERO_Z_LEVEL, &[p(10, 0), p(20, 0)]),
        ]);
        merge_linear_objects(&mut data);

        assert_eq!(data.linear_objects.len(), 1);
        assert_eq!(data.linear_objects[0].vertex_count, 4);
    }

    #[test]
    fn no_two_output_lines_share_an_endpoint() {
        let mut data = data_with_lines(&[
            (LinearObjectClass::Road, ZERO_Z_LEVEL, &[p(0, 0), p(10, 0)]),
            (LinearObjectClass::Road, ZERO_Z_LEVEL, &[p(10, 0), p(20, 0)]),
            (LinearObjectClass::Road, ZERO_Z_LEVEL, &[p(5, 5), p(6, 6)]),
            (LinearObjectClass::Road, ZERO_Z_LEVEL, &[p(40, 0), p(6, 6)]),
        ]);
        merge_linear_objects(&mut data);

        let ends = endpoints(&data);
        for (i, (a_front, a_back)) in ends.iter().enumerate() {
            for (b_front, b_back) in ends.iter().skip(i + 1) {
                assert_ne!(a_front, b_front);
                assert_ne!(a_front, b_back);
                assert_ne!(a_back, b_front);
                assert_ne!(a_back, b_back);
            }
        }
    }

    #[test]
    fn closed_loop_terminates_the_chain() {
        let mut data = data_with_lines(&[(
            LinearObjectClass::Road,
            ZERO_Z_LEVEL,
            &[p(0, 0), p(10, 0), p(10, 10), p(0, 0)],
        )]);
        merge_linear_objects(&mut data);
        assert_eq!(data.linear_objects.len(), 1);
        assert_eq!(data.linear_objects[0].vertex_count, 4);
    }
}
