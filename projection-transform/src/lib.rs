pub mod error;
pub mod projection;

pub use error::ProjectionError;
pub use projection::{
    select_unit_size, AlbersParams, LinearProjection, Projection, ProjectionKind,
    StereographicParams, UnitSize,
};

/// Shared geodetic/projection constants.
pub mod constants {
    pub const PI: f64 = std::f64::consts::PI;
    pub const EARTH_RADIUS_M: f64 = 6_371_000.0;
    pub const EARTH_EQUATOR_LENGTH_M: f64 = EARTH_RADIUS_M * 2.0 * PI;

    pub const DEG_TO_RAD: f64 = PI / 180.0;
    pub const RAD_TO_DEG: f64 = 180.0 / PI;

    pub const TWO_POW_31: f64 = 2_147_483_648.0;
}

/// Geodetic point. `x` is longitude in [-180; 180), `y` is latitude in (-90; 90).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    pub x: f64,
    pub y: f64,
}

/// Projected point in signed 32-bit units. Semantics depend on the projection
/// that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProjectionPoint {
    pub x: i32,
    pub y: i32,
}

/// Latitude bound of the Mercator projection, radians.
pub fn mercator_max_latitude() -> f64 {
    2.0 * (constants::PI).exp().atan() - constants::PI * 0.5
}

/// Maps longitude [-180; 180) onto the full signed 32-bit x range and latitude
/// [-max_latitude; max_latitude) onto the full signed 32-bit y range.
pub fn geo_to_mercator(point: &GeoPoint) -> ProjectionPoint {
    use constants::*;
    ProjectionPoint {
        x: ((TWO_POW_31 / 180.0) * point.x) as i32,
        y: ((TWO_POW_31 / PI) * (PI * 0.25 + point.y * (0.5 * DEG_TO_RAD)).tan().ln()) as i32,
    }
}

pub fn mercator_to_geo(point: &ProjectionPoint) -> GeoPoint {
    use constants::*;
    GeoPoint {
        x: f64::from(point.x) * (180.0 / TWO_POW_31),
        y: RAD_TO_DEG
            * (2.0 * (f64::from(point.y) * (PI / TWO_POW_31)).exp().atan() - PI * 0.5),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mercator_roundtrip_is_close() {
        for lon in [-179.0, -120.5, -1.0, 0.0, 37.61, 179.0] {
            for lat in [-85.0, -60.0, -0.5, 0.0, 55.75, 85.0] {
                let src = GeoPoint { x: lon, y: lat };
                let back = mercator_to_geo(&geo_to_mercator(&src));
                assert!((back.x - src.x).abs() < 1e-5, "lon {} -> {}", src.x, back.x);
                assert!((back.y - src.y).abs() < 1e-5, "lat {} -> {}", src.y, back.y);
            }
        }
    }

    #[test]
    fn mercator_equator_maps_to_zero_y() {
        let p = geo_to_mercator(&GeoPoint { x: 0.0, y: 0.0 });
        assert_eq!(p.x, 0);
        assert_eq!(p.y, 0);
    }

    #[test]
    fn mercator_x_is_proportional_to_longitude() {
        let p90 = geo_to_mercator(&GeoPoint { x: 90.0, y: 10.0 });
        let p45 = geo_to_mercator(&GeoPoint { x: 45.0, y: 10.0 });
        assert_eq!(p90.x, p45.x * 2);
    }
}
