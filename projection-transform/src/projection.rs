use crate::constants::*;
use crate::error::ProjectionError;
use crate::{geo_to_mercator, GeoPoint, ProjectionPoint};

/// Projection discriminant as stored in the data file header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ProjectionKind {
    Mercator = 0,
    Stereographic = 1,
    Albers = 2,
}

/// Closed set of supported base projections. All variants are pure
/// `GeoPoint -> ProjectionPoint` functions.
#[derive(Debug, Clone)]
pub enum Projection {
    Mercator,
    Stereographic(StereographicParams),
    Albers(AlbersParams),
}

impl Projection {
    pub fn new(kind: ProjectionKind, geo_min: GeoPoint, geo_max: GeoPoint) -> Self {
        match kind {
            ProjectionKind::Mercator => Projection::Mercator,
            ProjectionKind::Stereographic => {
                Projection::Stereographic(StereographicParams::new(geo_min, geo_max))
            }
            ProjectionKind::Albers => Projection::Albers(AlbersParams::new(geo_min, geo_max)),
        }
    }

    pub fn kind(&self) -> ProjectionKind {
        match self {
            Projection::Mercator => ProjectionKind::Mercator,
            Projection::Stereographic(_) => ProjectionKind::Stereographic,
            Projection::Albers(_) => ProjectionKind::Albers,
        }
    }

    pub fn project(&self, point: &GeoPoint) -> ProjectionPoint {
        match self {
            Projection::Mercator => geo_to_mercator(point),
            Projection::Stereographic(params) => params.project(point),
            Projection::Albers(params) => params.project(point),
        }
    }
}

/// Conformal azimuthal projection around the bounding box center.
/// Precondition: the data must not span a pole or the center's antipode.
#[derive(Debug, Clone)]
pub struct StereographicParams {
    center_lon_rad: f64,
    center_lat_sin: f64,
    center_lat_cos: f64,
}

const STEREOGRAPHIC_SCALE: f64 = TWO_POW_31 * 0.25;

impl StereographicParams {
    pub fn new(geo_min: GeoPoint, geo_max: GeoPoint) -> Self {
        let center_lat_rad = (geo_min.y + geo_max.y) * 0.5 * DEG_TO_RAD;
        StereographicParams {
            center_lon_rad: (geo_min.x + geo_max.x) * 0.5 * DEG_TO_RAD,
            center_lat_sin: center_lat_rad.sin(),
            center_lat_cos: center_lat_rad.cos(),
        }
    }

    pub fn project(&self, point: &GeoPoint) -> ProjectionPoint {
        let lon_rad = point.x * DEG_TO_RAD;
        let lat_rad = point.y * DEG_TO_RAD;
        let lon_diff = lon_rad - self.center_lon_rad;

        let k = 2.0
            / (1.0
                + self.center_lat_sin * lat_rad.sin()
                + self.center_lat_cos * lat_rad.cos() * lon_diff.cos());

        ProjectionPoint {
            x: (STEREOGRAPHIC_SCALE * k * lat_rad.cos() * lon_diff.sin()) as i32,
            y: (STEREOGRAPHIC_SCALE
                * k
                * (self.center_lat_cos * lat_rad.sin()
                    - self.center_lat_sin * lat_rad.cos() * lon_diff.cos())) as i32,
        }
    }
}

/// Albers equal-area conic projection, parameterized by the data bounding box.
/// Standard parallels sit at 1/6 and 5/6 of the latitude span.
#[derive(Debug, Clone)]
pub struct AlbersParams {
    zero_longitude_rad: f64,
    latitude_avg_sin: f64,
    c: f64,
    p0: f64,
    scale_factor: f64,
}

impl AlbersParams {
    pub fn new(geo_min: GeoPoint, geo_max: GeoPoint) -> Self {
        let latitude_diff_div_6 = (geo_max.y - geo_min.y) / 6.0;
        let zero_latitude = (geo_min.y + geo_max.y) * 0.5 * DEG_TO_RAD;
        let base_latitude1 = geo_min.y + latitude_diff_div_6;
        let base_latitude2 = geo_max.y - latitude_diff_div_6;

        let base_latitude1_sin = (base_latitude1 * DEG_TO_RAD).sin();
        let base_latitude1_cos = (base_latitude1 * DEG_TO_RAD).cos();
        let base_latitude2_sin = (base_latitude2 * DEG_TO_RAD).sin();

        let latitude_avg_sin = (base_latitude1_sin + base_latitude2_sin) * 0.5;
        let c = base_latitude1_cos * base_latitude1_cos
            + 2.0 * latitude_avg_sin * base_latitude1_sin;
        let p0 = (c - 2.0 * latitude_avg_sin * zero_latitude.sin()).sqrt() / latitude_avg_sin;

        let mut result = AlbersParams {
            zero_longitude_rad: (geo_min.x + geo_max.x) * 0.5 * DEG_TO_RAD,
            latitude_avg_sin,
            c,
            p0,
            scale_factor: f64::from(1u32 << 28),
        };

        // Probe extreme points to find the worst-case coordinate, then rescale
        // so that it still fits into the signed 32-bit range.
        let lon_extreme = 90.0 / latitude_avg_sin;
        let special_points = [
            result.project(&GeoPoint { x: -90.0, y: -90.0 }),
            result.project(&GeoPoint { x: 90.0, y: -90.0 }),
            result.project(&GeoPoint { x: -90.0, y: 90.0 }),
            result.project(&GeoPoint { x: 90.0, y: 90.0 }),
            result.project(&GeoPoint { x: 0.0, y: -90.0 }),
            result.project(&GeoPoint { x: 0.0, y: 90.0 }),
            result.project(&GeoPoint { x: -lon_extreme, y: -90.0 }),
            result.project(&GeoPoint { x: lon_extreme, y: -90.0 }),
            result.project(&GeoPoint { x: -lon_extreme, y: 90.0 }),
            result.project(&GeoPoint { x: lon_extreme, y: 90.0 }),
        ];

        let mut max_coordinate: i32 = 1;
        for point in &special_points {
            max_coordinate = max_coordinate.max(point.x.abs()).max(point.y.abs());
        }
        result.scale_factor *= TWO_POW_31 / f64::from(max_coordinate);

        result
    }

    pub fn project(&self, point: &GeoPoint) -> ProjectionPoint {
        let longitude_rad = point.x * DEG_TO_RAD;
        let latitude_rad = point.y * DEG_TO_RAD;

        let longitude_scaled_diff =
            self.latitude_avg_sin * (longitude_rad - self.zero_longitude_rad);
        let p = (self.c - 2.0 * self.latitude_avg_sin * latitude_rad.sin()).sqrt()
            / self.latitude_avg_sin;

        ProjectionPoint {
            x: (self.scale_factor * (p * longitude_scaled_diff.sin())) as i32,
            y: (self.scale_factor * (self.p0 - p * longitude_scaled_diff.cos())) as i32,
        }
    }

    /// Inverse projection. Only meaningful for points produced by `project`.
    pub fn unproject(&self, point: &ProjectionPoint) -> GeoPoint {
        let x = f64::from(point.x) / self.scale_factor;
        let y = f64::from(point.y) / self.scale_factor;

        let p = (x * x + (self.p0 - y) * (self.p0 - y)).sqrt();
        let theta = x.atan2(self.p0 - y);

        let latitude_sin =
            (self.c - p * p * self.latitude_avg_sin * self.latitude_avg_sin)
                / (2.0 * self.latitude_avg_sin);

        GeoPoint {
            x: (self.zero_longitude_rad + theta / self.latitude_avg_sin) * RAD_TO_DEG,
            y: latitude_sin.asin() * RAD_TO_DEG,
        }
    }
}

/// Wraps a base projection with linear re-basing to the data bounding box:
/// `project(g) = (base(g) - min_point) / unit_size`.
#[derive(Debug, Clone)]
pub struct LinearProjection {
    base: Projection,
    min_point: ProjectionPoint,
    max_point: ProjectionPoint,
    unit_size: i32,
}

impl LinearProjection {
    pub fn new(
        base: Projection,
        geo_min: GeoPoint,
        geo_max: GeoPoint,
        unit_size: i32,
    ) -> Self {
        debug_assert!(unit_size >= 1);
        let mid_lon = (geo_min.x + geo_max.x) * 0.5;
        let mid_lat = (geo_min.y + geo_max.y) * 0.5;
        let special_points = [
            base.project(&GeoPoint { x: geo_min.x, y: geo_min.y }),
            base.project(&GeoPoint { x: geo_max.x, y: geo_min.y }),
            base.project(&GeoPoint { x: geo_min.x, y: geo_max.y }),
            base.project(&GeoPoint { x: geo_max.x, y: geo_max.y }),
            base.project(&GeoPoint { x: mid_lon, y: geo_min.y }),
            base.project(&GeoPoint { x: mid_lon, y: geo_max.y }),
            base.project(&GeoPoint { x: geo_min.x, y: mid_lat }),
            base.project(&GeoPoint { x: geo_max.x, y: mid_lat }),
        ];

        let mut min_point = special_points[0];
        let mut max_point = special_points[0];
        for point in &special_points {
            min_point.x = min_point.x.min(point.x);
            min_point.y = min_point.y.min(point.y);
            max_point.x = max_point.x.max(point.x);
            max_point.y = max_point.y.max(point.y);
        }

        LinearProjection { base, min_point, max_point, unit_size }
    }

    pub fn project(&self, point: &GeoPoint) -> ProjectionPoint {
        let p = self.base.project(point);
        ProjectionPoint {
            x: (p.x - self.min_point.x) / self.unit_size,
            y: (p.y - self.min_point.y) / self.unit_size,
        }
    }

    pub fn min_point(&self) -> ProjectionPoint {
        self.min_point
    }

    pub fn max_point(&self) -> ProjectionPoint {
        self.max_point
    }
}

/// Selected unit size for one zoom level.
#[derive(Debug, Clone, Copy)]
pub struct UnitSize {
    /// Base-projection units per output unit.
    pub coordinates_scale: i32,
    /// Meters covered by one output unit at the map center.
    pub meters_in_unit: f32,
}

const TRY_METERS: f64 = 1000.0;
const REQUIRED_ACCURACY_M: f64 = 0.2;

/// Chooses the unit size so that one unit covers about 20 cm at the map
/// center, then doubles the unit for every zoom-level-log2 step.
pub fn select_unit_size(
    base: &Projection,
    geo_min: GeoPoint,
    geo_max: GeoPoint,
    zoom_level_log2: u32,
) -> Result<UnitSize, ProjectionError> {
    let middle = GeoPoint {
        x: (geo_min.x + geo_max.x) * 0.5,
        y: (geo_min.y + geo_max.y) * 0.5,
    };
    let lat_step = 0.5 * TRY_METERS * (360.0 / EARTH_EQUATOR_LENGTH_M);
    let y0 = base.project(&GeoPoint { x: middle.x, y: middle.y - lat_step }).y;
    let y1 = base.project(&GeoPoint { x: middle.x, y: middle.y + lat_step }).y;
    if y1 == y0 {
        return Err(ProjectionError::DegenerateUnitProbe);
    }

    let meters_in_unit_initial = TRY_METERS / f64::from(y1 - y0);
    let mut coordinates_scale =
        1i32.max((REQUIRED_ACCURACY_M / meters_in_unit_initial) as i32);
    coordinates_scale <<= zoom_level_log2;

    Ok(UnitSize {
        coordinates_scale,
        meters_in_unit: (meters_in_unit_initial * f64::from(coordinates_scale)) as f32,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn moscow_bbox() -> (GeoPoint, GeoPoint) {
        (GeoPoint { x: 37.3, y: 55.5 }, GeoPoint { x: 38.0, y: 56.0 })
    }

    #[test]
    fn albers_corner_roundtrip_within_one_meter() {
        let (geo_min, geo_max) = moscow_bbox();
        let params = AlbersParams::new(geo_min, geo_max);

        // Degrees of latitude per meter, for the error bound.
        let deg_per_m = 360.0 / EARTH_EQUATOR_LENGTH_M;

        for corner in [
            geo_min,
            geo_max,
            GeoPoint { x: geo_min.x, y: geo_max.y },
            GeoPoint { x: geo_max.x, y: geo_min.y },
        ] {
            let back = params.unproject(&params.project(&corner));
            assert!((back.y - corner.y).abs() < deg_per_m, "lat {} -> {}", corner.y, back.y);
            // Longitude degrees shrink with latitude; one meter is conservative.
            let lon_deg_per_m = deg_per_m / (corner.y * DEG_TO_RAD).cos();
            assert!(
                (back.x - corner.x).abs() < lon_deg_per_m,
                "lon {} -> {}",
                corner.x,
                back.x
            );
        }
    }

    #[test]
    fn albers_special_points_fit_in_i32() {
        let (geo_min, geo_max) = moscow_bbox();
        let params = AlbersParams::new(geo_min, geo_max);
        // The worst-case probes themselves must project without wraparound.
        let p = params.project(&GeoPoint { x: 90.0, y: 90.0 });
        assert!(p.x.checked_abs().is_some() && p.y.checked_abs().is_some());
    }

    #[test]
    fn unit_size_is_about_twenty_centimeters() {
        let (geo_min, geo_max) = moscow_bbox();
        let base = Projection::new(ProjectionKind::Albers, geo_min, geo_max);
        let unit = select_unit_size(&base, geo_min, geo_max, 0).unwrap();
        assert!(unit.coordinates_scale >= 1);
        assert!(unit.meters_in_unit > 0.05 && unit.meters_in_unit <= 0.2 + 1e-6);
    }

    #[test]
    fn unit_size_doubles_with_zoom_level() {
        let (geo_min, geo_max) = moscow_bbox();
        let base = Projection::new(ProjectionKind::Albers, geo_min, geo_max);
        let unit0 = select_unit_size(&base, geo_min, geo_max, 0).unwrap();
        let unit3 = select_unit_size(&base, geo_min, geo_max, 3).unwrap();
        assert_eq!(unit3.coordinates_scale, unit0.coordinates_scale << 3);
    }

    #[test]
    fn linear_projection_rebases_to_origin() {
        let (geo_min, geo_max) = moscow_bbox();
        let base = Projection::new(ProjectionKind::Albers, geo_min, geo_max);
        let unit = select_unit_size(&base, geo_min, geo_max, 0).unwrap();
        let projection =
            LinearProjection::new(base, geo_min, geo_max, unit.coordinates_scale);

        let p = projection.project(&GeoPoint { x: 37.3, y: 55.5 });
        assert!(p.x >= 0 && p.y >= 0);

        let extent_x = (projection.max_point().x - projection.min_point().x)
            / unit.coordinates_scale;
        let top = projection.project(&GeoPoint { x: 38.0, y: 56.0 });
        assert!(top.x <= extent_x + 1);
    }

    #[test]
    fn stereographic_center_maps_near_origin() {
        let (geo_min, geo_max) = moscow_bbox();
        let params = StereographicParams::new(geo_min, geo_max);
        let center = GeoPoint {
            x: (geo_min.x + geo_max.x) * 0.5,
            y: (geo_min.y + geo_max.y) * 0.5,
        };
        let p = params.project(&center);
        assert_eq!(p.x, 0);
        assert_eq!(p.y, 0);
    }
}
