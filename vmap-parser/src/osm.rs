//! OSM XML ingest: nodes, ways and multipolygon relations are classified and
//! turned into the geodetic IR.
//!
//! Only an unreadable or unparseable document is fatal. Entries with missing
//! ids, unparseable numerics or unresolved references are skipped and counted.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use projection_transform::GeoPoint;
use vmap_core::classes::{ArealObjectClass, LinearObjectClass, PointObjectClass};
use vmap_core::ir::{
    ArealGeometry, ArealObject, LinearObject, OsmParseResult, PointObject, Ring,
};
use vmap_core::{MAX_Z_LEVEL, ZERO_Z_LEVEL};

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("cannot read OSM file: {0}")]
    Io(#[from] std::io::Error),

    #[error("XML parse error: {0}")]
    Xml(#[from] quick_xml::DeError),
}

type OsmId = u64;

#[derive(Debug, Deserialize)]
struct XmlTag {
    #[serde(rename = "@k")]
    k: Option<String>,
    #[serde(rename = "@v")]
    v: Option<String>,
}

#[derive(Debug, Deserialize)]
struct XmlNode {
    #[serde(rename = "@id")]
    id: Option<String>,
    #[serde(rename = "@lon")]
    lon: Option<String>,
    #[serde(rename = "@lat")]
    lat: Option<String>,
    #[serde(default, rename = "tag")]
    tags: Vec<XmlTag>,
}

#[derive(Debug, Deserialize)]
struct XmlNd {
    #[serde(rename = "@ref")]
    node_ref: Option<String>,
}

#[derive(Debug, Deserialize)]
struct XmlWay {
    #[serde(rename = "@id")]
    id: Option<String>,
    #[serde(default, rename = "nd")]
    nds: Vec<XmlNd>,
    #[serde(default, rename = "tag")]
    tags: Vec<XmlTag>,
}

#[derive(Debug, Deserialize)]
struct XmlMember {
    #[serde(rename = "@type")]
    member_type: Option<String>,
    #[serde(rename = "@ref")]
    member_ref: Option<String>,
    #[serde(rename = "@role")]
    role: Option<String>,
}

#[derive(Debug, Deserialize)]
struct XmlOsm {
    #[serde(default, rename = "node")]
    nodes: Vec<XmlNode>,
    #[serde(default, rename = "way")]
    ways: Vec<XmlWay>,
    #[serde(default, rename = "relation")]
    relations: Vec<XmlRelation>,
}

#[derive(Debug, Deserialize)]
struct XmlRelation {
    #[serde(default, rename = "member")]
    members: Vec<XmlMember>,
    #[serde(default, rename = "tag")]
    tags: Vec<XmlTag>,
}

fn get_tag_value<'a>(tags: &'a [XmlTag], key: &str) -> Option<&'a str> {
    tags.iter()
        .find(|tag| tag.k.as_deref() == Some(key))
        .and_then(|tag| tag.v.as_deref())
}

fn z_level_from_tags(tags: &[XmlTag]) -> usize {
    let layer: i64 = match get_tag_value(tags, "layer").and_then(|v| v.parse().ok()) {
        Some(layer) => layer,
        None => return ZERO_Z_LEVEL,
    };
    (ZERO_Z_LEVEL as i64 + layer).clamp(0, MAX_Z_LEVEL as i64) as usize
}

fn highway_to_linear_class(value: &str) -> LinearObjectClass {
    match value {
        "motorway" | "trunk" | "primary" | "secondary" | "tertiary" | "unclassified"
        | "residential" | "motorway_link" | "trunk_link" | "primary_link"
        | "secondary_link" | "tertiary_link" | "living_street" | "service" | "track"
        | "bus_guideway" | "raceway" | "road" => LinearObjectClass::Road,
        "pedestrian" | "footway" | "path" => LinearObjectClass::Pedestrian,
        _ => LinearObjectClass::None,
    }
}

fn waterway_to_linear_class(value: &str) -> LinearObjectClass {
    match value {
        "stream" => LinearObjectClass::Waterway,
        _ => LinearObjectClass::None,
    }
}

fn railway_to_linear_class(value: &str) -> LinearObjectClass {
    match value {
        "rail" => LinearObjectClass::Railway,
        "monorail" => LinearObjectClass::Monorail,
        "tram" => LinearObjectClass::Tram,
        _ => LinearObjectClass::None,
    }
}

fn barrier_to_linear_class(value: &str) -> LinearObjectClass {
    match value {
        "cable_barrier" | "city_wall" | "fence" | "hedge" | "wall" | "hampshire_gate" => {
            LinearObjectClass::Barrier
        }
        _ => LinearObjectClass::None,
    }
}

fn natural_to_areal_class(value: &str) -> ArealObjectClass {
    match value {
        "water" => ArealObjectClass::Water,
        "wood" | "scrub" => ArealObjectClass::Wood,
        "grassland" | "heath" => ArealObjectClass::Grassland,
        _ => ArealObjectClass::None,
    }
}

fn landuse_to_areal_class(value: &str) -> ArealObjectClass {
    match value {
        "basin" => ArealObjectClass::Water,
        "cemetery" => ArealObjectClass::Cemetery,
        "forest" | "wood" => ArealObjectClass::Wood,
        "grass" => ArealObjectClass::Grassland,
        "residential" => ArealObjectClass::Residential,
        "industrial" | "garages" | "railway" => ArealObjectClass::Industrial,
        "commercial" | "retail" => ArealObjectClass::Administrative,
        _ => ArealObjectClass::None,
    }
}

fn amenity_to_areal_class(value: &str) -> ArealObjectClass {
    match value {
        "grave_yard" => ArealObjectClass::Cemetery,
        "school" | "college" | "kindergarten" | "library" | "university" | "clinic"
        | "dentist" | "doctors" | "hospital" | "nursing_home" => {
            ArealObjectClass::Administrative
        }
        _ => ArealObjectClass::None,
    }
}

enum WayClass {
    Linear(LinearObjectClass),
    Areal(ArealObjectClass),
    None,
}

/// Classifies a way by its tags. Keys are tested in a fixed priority order;
/// the first recognized key decides the family, and an unrecognized value
/// under a recognized key classifies the way as nothing.
fn classify_way(tags: &[XmlTag]) -> WayClass {
    let linear_class = if let Some(value) = get_tag_value(tags, "highway") {
        highway_to_linear_class(value)
    } else if let Some(value) = get_tag_value(tags, "waterway") {
        waterway_to_linear_class(value)
    } else if let Some(value) = get_tag_value(tags, "railway") {
        railway_to_linear_class(value)
    } else if let Some(value) = get_tag_value(tags, "barrier") {
        barrier_to_linear_class(value)
    } else {
        return match areal_class_from_tags(tags) {
            Some(class) => WayClass::Areal(class),
            None => WayClass::None,
        };
    };

    match linear_class {
        LinearObjectClass::None => WayClass::None,
        class => WayClass::Linear(class),
    }
}

/// Areal class of a tag set, used by areal ways and multipolygon relations.
/// Tag keys are tested in the fixed priority order; a recognized key with an
/// unrecognized value classifies the object as nothing.
fn areal_class_from_tags(tags: &[XmlTag]) -> Option<ArealObjectClass> {
    if get_tag_value(tags, "building").is_some() {
        return Some(ArealObjectClass::Building);
    }
    if let Some(value) = get_tag_value(tags, "natural") {
        return Some(natural_to_areal_class(value)).filter(|&c| c != ArealObjectClass::None);
    }
    if let Some(value) = get_tag_value(tags, "landuse") {
        return Some(landuse_to_areal_class(value)).filter(|&c| c != ArealObjectClass::None);
    }
    if let Some(value) = get_tag_value(tags, "amenity") {
        return Some(amenity_to_areal_class(value)).filter(|&c| c != ArealObjectClass::None);
    }
    None
}

struct Ingest {
    result: OsmParseResult,
    skipped_nodes: usize,
    skipped_refs: usize,
    skipped_rings: usize,
}

impl Ingest {
    /// Resolves the way's node references into the shared vertex pool and
    /// returns the appended range. Unresolved references are skipped.
    fn extract_vertices(&mut self, way: &XmlWay, nodes: &HashMap<OsmId, GeoPoint>) -> Ring {
        let first_vertex_index = self.result.vertices.len();
        for nd in &way.nds {
            let id: Option<OsmId> = nd.node_ref.as_deref().and_then(|v| v.parse().ok());
            match id.and_then(|id| nodes.get(&id)) {
                Some(point) => self.result.vertices.push(*point),
                None => self.skipped_refs += 1,
            }
        }
        Ring {
            first_vertex_index,
            vertex_count: self.result.vertices.len() - first_vertex_index,
        }
    }

    fn push_linear(&mut self, class: LinearObjectClass, z_level: usize, range: Ring) {
        if range.vertex_count > 0 {
            self.result.linear_objects.push(LinearObject {
                class,
                z_level,
                first_vertex_index: range.first_vertex_index,
                vertex_count: range.vertex_count,
            });
        }
    }

    fn push_areal(&mut self, class: ArealObjectClass, z_level: usize, range: Ring) {
        if range.vertex_count > 0 {
            self.result
                .areal_objects
                .push(ArealObject::polygon(class, z_level, range));
        }
    }
}

fn extract_nodes(doc: &XmlOsm, skipped: &mut usize) -> HashMap<OsmId, GeoPoint> {
    let mut result = HashMap::new();
    for node in &doc.nodes {
        let id: Option<OsmId> = node.id.as_deref().and_then(|v| v.parse().ok());
        let lon: Option<f64> = node.lon.as_deref().and_then(|v| v.parse().ok());
        let lat: Option<f64> = node.lat.as_deref().and_then(|v| v.parse().ok());
        match (id, lon, lat) {
            (Some(id), Some(lon), Some(lat)) => {
                result.insert(id, GeoPoint { x: lon, y: lat });
            }
            _ => *skipped += 1,
        }
    }
    result
}

/// Stitches member way fragments into closed rings. Fragments are joined at
/// exactly matching endpoints; a fragment chain that never closes is dropped.
fn assemble_rings(mut parts: Vec<Vec<GeoPoint>>, skipped_rings: &mut usize) -> Vec<Vec<GeoPoint>> {
    let mut rings = Vec::new();

    while let Some(mut current) = parts.pop() {
        if current.len() < 2 {
            *skipped_rings += 1;
            continue;
        }

        loop {
            if current.first() == current.last() && current.len() >= 4 {
                rings.push(current);
                break;
            }

            let tail = *current.last().expect("ring fragment is not empty");
            let next_index = parts.iter().position(|part| {
                part.first() == Some(&tail) || part.last() == Some(&tail)
            });

            match next_index {
                Some(index) => {
                    let mut part = parts.swap_remove(index);
                    if part.last() == Some(&tail) {
                        part.reverse();
                    }
                    current.extend(part.into_iter().skip(1));
                }
                None => {
                    *skipped_rings += 1;
                    break;
                }
            }
        }
    }

    rings
}

pub fn parse_osm(file_name: &Path) -> Result<OsmParseResult, ParseError> {
    let text = fs::read_to_string(file_name)?;
    parse_osm_str(&text)
}

pub fn parse_osm_str(text: &str) -> Result<OsmParseResult, ParseError> {
    let doc: XmlOsm = quick_xml::de::from_str(text)?;

    let mut ingest = Ingest {
        result: OsmParseResult::default(),
        skipped_nodes: 0,
        skipped_refs: 0,
        skipped_rings: 0,
    };

    let nodes = extract_nodes(&doc, &mut ingest.skipped_nodes);

    let mut ways_by_id: HashMap<OsmId, &XmlWay> = HashMap::new();
    for way in &doc.ways {
        if let Some(id) = way.id.as_deref().and_then(|v| v.parse().ok()) {
            ways_by_id.insert(id, way);
        }
    }

    for way in &doc.ways {
        let z_level = z_level_from_tags(&way.tags);

        // Vertices are resolved only for recognized ways; unclassified
        // geometry must not leak into the pool (it would skew the bounding
        // box of the whole data set).
        match classify_way(&way.tags) {
            WayClass::Linear(class) => {
                let range = ingest.extract_vertices(way, &nodes);
                ingest.push_linear(class, z_level, range);
            }
            WayClass::Areal(class) => {
                let range = ingest.extract_vertices(way, &nodes);
                ingest.push_areal(class, z_level, range);
            }
            WayClass::None => {}
        }
    }

    for relation in &doc.relations {
        if get_tag_value(&relation.tags, "type") != Some("multipolygon") {
            continue;
        }
        let class = match areal_class_from_tags(&relation.tags) {
            Some(class) => class,
            None => continue,
        };
        let z_level = z_level_from_tags(&relation.tags);

        let mut outer_parts = Vec::new();
        let mut inner_parts = Vec::new();
        for member in &relation.members {
            if member.member_type.as_deref() != Some("way") {
                continue;
            }
            let way = match member
                .member_ref
                .as_deref()
                .and_then(|v| v.parse::<OsmId>().ok())
                .and_then(|id| ways_by_id.get(&id))
            {
                Some(way) => way,
                None => {
                    ingest.skipped_refs += 1;
                    continue;
                }
            };

            let mut part = Vec::with_capacity(way.nds.len());
            for nd in &way.nds {
                let id: Option<OsmId> = nd.node_ref.as_deref().and_then(|v| v.parse().ok());
                match id.and_then(|id| nodes.get(&id)) {
                    Some(point) => part.push(*point),
                    None => ingest.skipped_refs += 1,
                }
            }
            if part.is_empty() {
                continue;
            }

            match member.role.as_deref() {
                Some("inner") => inner_parts.push(part),
                _ => outer_parts.push(part),
            }
        }

        let push_rings = |parts: Vec<Vec<GeoPoint>>, ingest: &mut Ingest| -> Vec<Ring> {
            assemble_rings(parts, &mut ingest.skipped_rings)
                .into_iter()
                .map(|ring| {
                    let first_vertex_index = ingest.result.vertices.len();
                    let vertex_count = ring.len();
                    ingest.result.vertices.extend(ring);
                    Ring { first_vertex_index, vertex_count }
                })
                .collect()
        };

        let inner_rings = push_rings(inner_parts, &mut ingest);
        let outer_rings = push_rings(outer_parts, &mut ingest);
        if !outer_rings.is_empty() {
            ingest.result.areal_objects.push(ArealObject {
                class,
                z_level,
                geometry: ArealGeometry::Multipolygon { outer_rings, inner_rings },
            });
        }
    }

    for node in &doc.nodes {
        let lon: Option<f64> = node.lon.as_deref().and_then(|v| v.parse().ok());
        let lat: Option<f64> = node.lat.as_deref().and_then(|v| v.parse().ok());
        let point = match (lon, lat) {
            (Some(lon), Some(lat)) => GeoPoint { x: lon, y: lat },
            _ => continue,
        };

        let push_point = |class: PointObjectClass, ingest: &mut Ingest| {
            if class != PointObjectClass::None {
                let vertex_index = ingest.result.vertices.len();
                ingest.result.vertices.push(point);
                ingest.result.point_objects.push(PointObject { class, vertex_index });
            }
        };

        if get_tag_value(&node.tags, "public_transport") == Some("platform")
            || get_tag_value(&node.tags, "highway") == Some("bus_stop")
        {
            push_point(PointObjectClass::StationPlatform, &mut ingest);
        }
        if get_tag_value(&node.tags, "railway") == Some("subway_entrance") {
            push_point(PointObjectClass::SubwayEntrance, &mut ingest);
        }
    }

    log::info!("Primary export:");
    log::info!("{} point objects", ingest.result.point_objects.len());
    log::info!("{} linear objects", ingest.result.linear_objects.len());
    log::info!("{} areal objects", ingest.result.areal_objects.len());
    log::info!("{} vertices", ingest.result.vertices.len());
    log::info!(
        "skipped: {} nodes, {} references, {} open rings",
        ingest.skipped_nodes,
        ingest.skipped_refs,
        ingest.skipped_rings
    );

    Ok(ingest.result)
}
