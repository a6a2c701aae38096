//! The per-zoom-level transformation passes, applied in pipeline order:
//! coordinate transformation, linear merge, simplification, polygon
//! normalization, phase sort. Every pass consumes the previous pass's IR.

pub mod coordinates_transformation;
pub mod linear_merge;
pub mod phase_sort;
pub mod polygons_normalization;
pub mod simplification;

pub use coordinates_transformation::transform_coordinates;
pub use linear_merge::merge_linear_objects;
pub use phase_sort::sort_by_phase;
pub use polygons_normalization::normalize_polygons;
pub use simplification::simplification_pass;
