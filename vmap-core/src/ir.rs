//! Intermediate representations the pipeline passes hand to each other.
//!
//! `OsmParseResult` is the ingest output over geodetic points with a single
//! shared vertex pool. `ObjectsData` is the projected per-zoom-level IR with
//! one vertex pool per object family; vertex indices inside an object refer
//! only to the pool of the matching family.

use projection_transform::{GeoPoint, ProjectionKind, ProjectionPoint};

use crate::classes::{ArealObjectClass, LinearObjectClass, PointObjectClass};

#[derive(Debug, Clone, Copy)]
pub struct PointObject {
    pub class: PointObjectClass,
    pub vertex_index: usize,
}

#[derive(Debug, Clone, Copy)]
pub struct LinearObject {
    pub class: LinearObjectClass,
    pub z_level: usize,
    pub first_vertex_index: usize,
    pub vertex_count: usize,
}

/// One contiguous vertex range of a polygon ring.
#[derive(Debug, Clone, Copy)]
pub struct Ring {
    pub first_vertex_index: usize,
    pub vertex_count: usize,
}

/// Areal geometry is a flat sum type: either one polygon ring or a
/// multipolygon of outer and inner rings.
#[derive(Debug, Clone)]
pub enum ArealGeometry {
    Polygon(Ring),
    Multipolygon {
        outer_rings: Vec<Ring>,
        inner_rings: Vec<Ring>,
    },
}

#[derive(Debug, Clone)]
pub struct ArealObject {
    pub class: ArealObjectClass,
    pub z_level: usize,
    pub geometry: ArealGeometry,
}

impl ArealObject {
    pub fn polygon(class: ArealObjectClass, z_level: usize, ring: Ring) -> Self {
        ArealObject {
            class,
            z_level,
            geometry: ArealGeometry::Polygon(ring),
        }
    }
}

/// Ingest output: classified objects over one geodetic vertex pool.
#[derive(Debug, Default)]
pub struct OsmParseResult {
    pub point_objects: Vec<PointObject>,
    pub linear_objects: Vec<LinearObject>,
    pub areal_objects: Vec<ArealObject>,
    pub vertices: Vec<GeoPoint>,
}

impl OsmParseResult {
    pub fn is_empty(&self) -> bool {
        self.point_objects.is_empty()
            && self.linear_objects.is_empty()
            && self.areal_objects.is_empty()
    }
}

/// Projected IR of one zoom level, replaced by every pass from projection
/// through phase sort.
#[derive(Debug, Clone)]
pub struct ObjectsData {
    pub point_objects: Vec<PointObject>,
    pub linear_objects: Vec<LinearObject>,
    pub areal_objects: Vec<ArealObject>,

    pub point_objects_vertices: Vec<ProjectionPoint>,
    pub linear_objects_vertices: Vec<ProjectionPoint>,
    pub areal_objects_vertices: Vec<ProjectionPoint>,

    pub projection_kind: ProjectionKind,
    pub geo_min: GeoPoint,
    pub geo_max: GeoPoint,

    /// Base-projection bounds before re-basing, shared by all zoom levels.
    pub min_point: ProjectionPoint,
    pub max_point: ProjectionPoint,
    /// Base-projection units per output unit.
    pub coordinates_scale: i32,
    pub meters_in_unit: f32,
    pub zoom_level_log2: u32,
}

impl ObjectsData {
    pub fn empty(kind: ProjectionKind, zoom_level_log2: u32) -> Self {
        ObjectsData {
            point_objects: Vec::new(),
            linear_objects: Vec::new(),
            areal_objects: Vec::new(),
            point_objects_vertices: Vec::new(),
            linear_objects_vertices: Vec::new(),
            areal_objects_vertices: Vec::new(),
            projection_kind: kind,
            geo_min: GeoPoint { x: 0.0, y: 0.0 },
            geo_max: GeoPoint { x: 0.0, y: 0.0 },
            min_point: ProjectionPoint { x: 0, y: 0 },
            max_point: ProjectionPoint { x: 0, y: 0 },
            coordinates_scale: 1,
            meters_in_unit: 0.0,
            zoom_level_log2,
        }
    }

    pub fn linear_object_vertices(&self, object: &LinearObject) -> &[ProjectionPoint] {
        &self.linear_objects_vertices
            [object.first_vertex_index..object.first_vertex_index + object.vertex_count]
    }

    pub fn ring_vertices(&self, ring: &Ring) -> &[ProjectionPoint] {
        &self.areal_objects_vertices
            [ring.first_vertex_index..ring.first_vertex_index + ring.vertex_count]
    }
}
