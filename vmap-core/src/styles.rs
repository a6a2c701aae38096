//! Style configuration: a JSON dictionary mapping object classes to draw
//! styles, plus the per-zoom-level compilation parameters.
//!
//! Individual malformed entries (unknown class names, bad colors) are
//! warnings; a missing or malformed root is fatal.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::classes::{ArealObjectClass, LinearObjectClass, PointObjectClass};
use crate::data_file::ColorRGBA;

#[derive(Debug, Error)]
pub enum StylesError {
    #[error("cannot read styles file: {0}")]
    Io(#[from] std::io::Error),

    #[error("styles root is missing or not a dictionary: {0}")]
    Root(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Default)]
pub struct PointObjectStyle {
    // Icon rasters are resolved by the renderer platform; the compiler only
    // reserves their slots in the container.
}

#[derive(Debug, Clone)]
pub struct LinearObjectStyle {
    pub color: ColorRGBA,
    pub color2: ColorRGBA,
    pub width_m: f32,
    pub dash_size_m: f32,
}

#[derive(Debug, Clone)]
pub struct ArealObjectStyle {
    pub color: ColorRGBA,
}

/// A paint pass: the set of areal classes drawn together.
#[derive(Debug, Clone)]
pub struct ArealPhase {
    pub classes: HashSet<ArealObjectClass>,
}

#[derive(Debug, Clone)]
pub struct ZoomLevelStyles {
    pub zoom_level_log2: u32,
    pub simplification_distance_units: i32,
    pub point_classes_ordered: Vec<PointObjectClass>,
    pub linear_classes_ordered: Vec<LinearObjectClass>,
    pub areal_object_phases: Vec<ArealPhase>,
    pub point_object_styles: HashMap<PointObjectClass, PointObjectStyle>,
    pub linear_object_styles: HashMap<LinearObjectClass, LinearObjectStyle>,
    pub areal_object_styles: HashMap<ArealObjectClass, ArealObjectStyle>,
}

#[derive(Debug, Clone)]
pub struct Styles {
    pub background_color: ColorRGBA,
    pub output_file: Option<PathBuf>,
    pub zoom_levels: Vec<ZoomLevelStyles>,
}

#[derive(Debug, Deserialize)]
struct RawLinearStyle {
    color: Option<String>,
    color2: Option<String>,
    #[serde(default)]
    width_m: f32,
    #[serde(default)]
    dash_size_m: f32,
}

#[derive(Debug, Deserialize)]
struct RawArealStyle {
    color: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawPhase {
    #[serde(default)]
    classes: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RawZoomLevel {
    #[serde(default)]
    scale_log2: u32,
    #[serde(default = "default_simplification_distance")]
    simplification_distance_units: i32,
    point_classes_ordered: Option<Vec<String>>,
    linear_classes_ordered: Option<Vec<String>>,
    areal_phases: Option<Vec<RawPhase>>,
}

fn default_simplification_distance() -> i32 {
    1
}

#[derive(Debug, Deserialize)]
struct RawStyles {
    background_color: Option<String>,
    output_file: Option<String>,
    #[serde(default)]
    point_styles: HashMap<String, serde_json::Value>,
    #[serde(default)]
    linear_styles: HashMap<String, RawLinearStyle>,
    #[serde(default)]
    areal_styles: HashMap<String, RawArealStyle>,
    #[serde(default)]
    areal_phases: Vec<RawPhase>,
    #[serde(default)]
    point_classes_ordered: Vec<String>,
    #[serde(default)]
    linear_classes_ordered: Vec<String>,
    #[serde(default)]
    zoom_levels: Vec<RawZoomLevel>,
}

/// Parses `#rrggbb` or `#rrggbbaa`. Alpha defaults to 255.
pub fn parse_color(color_str: &str) -> Option<ColorRGBA> {
    let hex = color_str.strip_prefix('#')?;
    if hex.len() != 6 && hex.len() != 8 {
        return None;
    }
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }

    let mut color: ColorRGBA = [0, 0, 0, 0xFF];
    for (i, chunk) in hex.as_bytes().chunks(2).enumerate() {
        let text = std::str::from_utf8(chunk).ok()?;
        color[i] = u8::from_str_radix(text, 16).ok()?;
    }
    Some(color)
}

fn color_or_warn(value: &Option<String>, context: &str) -> Option<ColorRGBA> {
    let text = value.as_ref()?;
    let parsed = parse_color(text);
    if parsed.is_none() {
        log::warn!("styles: bad color \"{}\" for {}", text, context);
    }
    parsed
}

fn resolve_point_order(names: &[String]) -> Vec<PointObjectClass> {
    let mut result = Vec::new();
    for name in names {
        match PointObjectClass::from_name(name) {
            Some(class) => result.push(class),
            None => log::warn!("styles: unknown point class \"{}\"", name),
        }
    }
    result
}

fn resolve_linear_order(names: &[String]) -> Vec<LinearObjectClass> {
    let mut result = Vec::new();
    for name in names {
        match LinearObjectClass::from_name(name) {
            Some(class) => result.push(class),
            None => log::warn!("styles: unknown linear class \"{}\"", name),
        }
    }
    result
}

fn resolve_phases(raw: &[RawPhase]) -> Vec<ArealPhase> {
    let mut result = Vec::new();
    for phase in raw {
        let mut classes = HashSet::new();
        for name in &phase.classes {
            match ArealObjectClass::from_name(name) {
                Some(class) => {
                    classes.insert(class);
                }
                None => log::warn!("styles: unknown areal class \"{}\"", name),
            }
        }
        result.push(ArealPhase { classes });
    }
    result
}

fn default_point_order() -> Vec<PointObjectClass> {
    PointObjectClass::ALL
        .iter()
        .copied()
        .filter(|&c| c != PointObjectClass::None)
        .collect()
}

fn default_linear_order() -> Vec<LinearObjectClass> {
    LinearObjectClass::ALL
        .iter()
        .copied()
        .filter(|&c| c != LinearObjectClass::None)
        .collect()
}

fn default_phases() -> Vec<ArealPhase> {
    let classes = ArealObjectClass::ALL
        .iter()
        .copied()
        .filter(|&c| c != ArealObjectClass::None)
        .collect();
    vec![ArealPhase { classes }]
}

pub fn load_styles(path: &Path) -> Result<Styles, StylesError> {
    let text = fs::read_to_string(path)?;
    parse_styles(&text)
}

pub fn parse_styles(text: &str) -> Result<Styles, StylesError> {
    let raw: RawStyles = serde_json::from_str(text)?;

    let background_color = color_or_warn(&raw.background_color, "background_color")
        .unwrap_or([0, 0, 0, 0xFF]);

    let mut point_object_styles = HashMap::new();
    for name in raw.point_styles.keys() {
        match PointObjectClass::from_name(name) {
            Some(class) => {
                point_object_styles.insert(class, PointObjectStyle::default());
            }
            None => log::warn!("styles: unknown point class \"{}\"", name),
        }
    }

    let mut linear_object_styles = HashMap::new();
    for (name, style) in &raw.linear_styles {
        let class = match LinearObjectClass::from_name(name) {
            Some(class) => class,
            None => {
                log::warn!("styles: unknown linear class \"{}\"", name);
                continue;
            }
        };
        let color = color_or_warn(&style.color, name).unwrap_or([128, 128, 128, 255]);
        let color2 = color_or_warn(&style.color2, name).unwrap_or(color);
        linear_object_styles.insert(
            class,
            LinearObjectStyle {
                color,
                color2,
                width_m: style.width_m,
                dash_size_m: style.dash_size_m,
            },
        );
    }

    let mut areal_object_styles = HashMap::new();
    for (name, style) in &raw.areal_styles {
        let class = match ArealObjectClass::from_name(name) {
            Some(class) => class,
            None => {
                log::warn!("styles: unknown areal class \"{}\"", name);
                continue;
            }
        };
        let color = color_or_warn(&style.color, name).unwrap_or([128, 128, 128, 255]);
        areal_object_styles.insert(class, ArealObjectStyle { color });
    }

    let root_point_order = if raw.point_classes_ordered.is_empty() {
        default_point_order()
    } else {
        resolve_point_order(&raw.point_classes_ordered)
    };
    let root_linear_order = if raw.linear_classes_ordered.is_empty() {
        default_linear_order()
    } else {
        resolve_linear_order(&raw.linear_classes_ordered)
    };
    let root_phases = if raw.areal_phases.is_empty() {
        default_phases()
    } else {
        resolve_phases(&raw.areal_phases)
    };

    let raw_zoom_levels = if raw.zoom_levels.is_empty() {
        vec![RawZoomLevel {
            scale_log2: 0,
            simplification_distance_units: 1,
            point_classes_ordered: None,
            linear_classes_ordered: None,
            areal_phases: None,
        }]
    } else {
        raw.zoom_levels
    };

    let zoom_levels = raw_zoom_levels
        .into_iter()
        .map(|level| ZoomLevelStyles {
            zoom_level_log2: level.scale_log2,
            simplification_distance_units: level.simplification_distance_units.max(1),
            point_classes_ordered: level
                .point_classes_ordered
                .as_deref()
                .map(resolve_point_order)
                .unwrap_or_else(|| root_point_order.clone()),
            linear_classes_ordered: level
                .linear_classes_ordered
                .as_deref()
                .map(resolve_linear_order)
                .unwrap_or_else(|| root_linear_order.clone()),
            areal_object_phases: level
                .areal_phases
                .as_deref()
                .map(resolve_phases)
                .unwrap_or_else(|| root_phases.clone()),
            point_object_styles: point_object_styles.clone(),
            linear_object_styles: linear_object_styles.clone(),
            areal_object_styles: areal_object_styles.clone(),
        })
        .collect();

    Ok(Styles {
        background_color,
        output_file: raw.output_file.map(PathBuf::from),
        zoom_levels,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_color_variants() {
        assert_eq!(parse_color("#10ff80"), Some([0x10, 0xFF, 0x80, 0xFF]));
        assert_eq!(parse_color("#10ff8040"), Some([0x10, 0xFF, 0x80, 0x40]));
        assert_eq!(parse_color("10ff80"), None);
        assert_eq!(parse_color("#10ff8"), None);
        assert_eq!(parse_color("#10ff8g"), None);
    }

    #[test]
    fn parse_minimal_styles() {
        let styles = parse_styles(
            r##"{
                "background_color": "#f0f0e0",
                "linear_styles": { "Road": { "color": "#ffffff", "width_m": 7.0 } },
                "areal_styles": { "Building": { "color": "#d0c0b0" } },
                "areal_phases": [ { "classes": ["Water"] }, { "classes": ["Building"] } ],
                "zoom_levels": [
                    { "scale_log2": 0, "simplification_distance_units": 1 },
                    { "scale_log2": 3, "simplification_distance_units": 2 }
                ]
            }"##,
        )
        .unwrap();

        assert_eq!(styles.background_color, [0xF0, 0xF0, 0xE0, 0xFF]);
        assert_eq!(styles.zoom_levels.len(), 2);
        assert_eq!(styles.zoom_levels[1].zoom_level_log2, 3);
        assert_eq!(styles.zoom_levels[0].areal_object_phases.len(), 2);

        let road = &styles.zoom_levels[0].linear_object_styles[&LinearObjectClass::Road];
        assert_eq!(road.color, [0xFF, 0xFF, 0xFF, 0xFF]);
        assert_eq!(road.width_m, 7.0);
    }

    #[test]
    fn unknown_classes_are_skipped() {
        let styles = parse_styles(
            r##"{
                "linear_styles": { "Spaceport": { "color": "#ffffff" } },
                "areal_phases": [ { "classes": ["Water", "Lava"] } ]
            }"##,
        )
        .unwrap();
        assert!(styles.zoom_levels[0].linear_object_styles.is_empty());
        assert_eq!(
            styles.zoom_levels[0].areal_object_phases[0]
                .classes
                .iter()
                .count(),
            1
        );
    }

    #[test]
    fn malformed_root_is_fatal() {
        assert!(parse_styles("[1, 2, 3]").is_err());
        assert!(parse_styles("not json").is_err());
    }

    #[test]
    fn missing_zoom_levels_default_to_base_level() {
        let styles = parse_styles("{}").unwrap();
        assert_eq!(styles.zoom_levels.len(), 1);
        assert_eq!(styles.zoom_levels[0].zoom_level_log2, 0);
        assert_eq!(styles.zoom_levels[0].simplification_distance_units, 1);
        assert!(!styles.zoom_levels[0].linear_classes_ordered.is_empty());
    }
}
