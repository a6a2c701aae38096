//! Closed enumerations of object classes recognized by the compiler.
//!
//! The discriminant of each class doubles as its style index inside chunks,
//! so the order of variants is part of the data-file contract.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum PointObjectClass {
    None = 0,
    StationPlatform,
    SubwayEntrance,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum LinearObjectClass {
    None = 0,
    Road,
    Pedestrian,
    Waterway,
    Railway,
    Tram,
    Monorail,
    Barrier,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum ArealObjectClass {
    None = 0,
    Building,
    Water,
    Wood,
    Grassland,
    Cemetery,
    Residential,
    Industrial,
    Administrative,
}

impl PointObjectClass {
    pub const ALL: [PointObjectClass; 3] = [
        PointObjectClass::None,
        PointObjectClass::StationPlatform,
        PointObjectClass::SubwayEntrance,
    ];

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "StationPlatform" => Some(PointObjectClass::StationPlatform),
            "SubwayEntrance" => Some(PointObjectClass::SubwayEntrance),
            _ => None,
        }
    }

    pub fn style_index(self) -> u8 {
        self as u8
    }
}

impl LinearObjectClass {
    pub const ALL: [LinearObjectClass; 8] = [
        LinearObjectClass::None,
        LinearObjectClass::Road,
        LinearObjectClass::Pedestrian,
        LinearObjectClass::Waterway,
        LinearObjectClass::Railway,
        LinearObjectClass::Tram,
        LinearObjectClass::Monorail,
        LinearObjectClass::Barrier,
    ];

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "Road" => Some(LinearObjectClass::Road),
            "Pedestrian" => Some(LinearObjectClass::Pedestrian),
            "Waterway" => Some(LinearObjectClass::Waterway),
            "Railway" => Some(LinearObjectClass::Railway),
            "Tram" => Some(LinearObjectClass::Tram),
            "Monorail" => Some(LinearObjectClass::Monorail),
            "Barrier" => Some(LinearObjectClass::Barrier),
            _ => None,
        }
    }

    pub fn style_index(self) -> u8 {
        self as u8
    }
}

impl ArealObjectClass {
    pub const ALL: [ArealObjectClass; 9] = [
        ArealObjectClass::None,
        ArealObjectClass::Building,
        ArealObjectClass::Water,
        ArealObjectClass::Wood,
        ArealObjectClass::Grassland,
        ArealObjectClass::Cemetery,
        ArealObjectClass::Residential,
        ArealObjectClass::Industrial,
        ArealObjectClass::Administrative,
    ];

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "Building" => Some(ArealObjectClass::Building),
            "Water" => Some(ArealObjectClass::Water),
            "Wood" => Some(ArealObjectClass::Wood),
            "Grassland" => Some(ArealObjectClass::Grassland),
            "Cemetery" => Some(ArealObjectClass::Cemetery),
            "Residential" => Some(ArealObjectClass::Residential),
            "Industrial" => Some(ArealObjectClass::Industrial),
            "Administrative" => Some(ArealObjectClass::Administrative),
            _ => None,
        }
    }

    pub fn style_index(self) -> u8 {
        self as u8
    }
}
