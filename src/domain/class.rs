//! City object classes, display forms and levels of detail

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Closed set of exportable city object classes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CityObjectClass {
    Building,
    WaterBody,
    LandUse,
    SolitaryVegetationObject,
    PlantCover,
    TransportationComplex,
    ReliefFeature,
    CityFurniture,
    GenericCityObject,
    CityObjectGroup,
    Bridge,
    Tunnel,
}

impl CityObjectClass {
    /// All classes, in dispatch order
    pub const ALL: [CityObjectClass; 12] = [
        CityObjectClass::Building,
        CityObjectClass::WaterBody,
        CityObjectClass::LandUse,
        CityObjectClass::SolitaryVegetationObject,
        CityObjectClass::PlantCover,
        CityObjectClass::TransportationComplex,
        CityObjectClass::ReliefFeature,
        CityObjectClass::CityFurniture,
        CityObjectClass::GenericCityObject,
        CityObjectClass::CityObjectGroup,
        CityObjectClass::Bridge,
        CityObjectClass::Tunnel,
    ];

    /// Object class ids stored in `cityobject.objectclass_id`
    ///
    /// Transportation complexes are stored under their concrete subclasses.
    pub fn objectclass_ids(&self) -> &'static [i32] {
        match self {
            CityObjectClass::Building => &[26],
            CityObjectClass::WaterBody => &[9],
            CityObjectClass::LandUse => &[4],
            CityObjectClass::SolitaryVegetationObject => &[7],
            CityObjectClass::PlantCover => &[8],
            CityObjectClass::TransportationComplex => &[42, 43, 44, 45, 46],
            CityObjectClass::ReliefFeature => &[14],
            CityObjectClass::CityFurniture => &[21],
            CityObjectClass::GenericCityObject => &[5],
            CityObjectClass::CityObjectGroup => &[23],
            CityObjectClass::Bridge => &[64],
            CityObjectClass::Tunnel => &[83],
        }
    }

    /// Maps a database object class id back to its class
    pub fn from_objectclass_id(id: i32) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|class| class.objectclass_ids().contains(&id))
    }

    /// Whether objects of this class may be merged into one 3D-model batch
    pub fn is_groupable(&self) -> bool {
        !matches!(self, CityObjectClass::CityObjectGroup)
    }

    /// Snake-case name used in configuration and output paths
    pub fn as_str(&self) -> &'static str {
        match self {
            CityObjectClass::Building => "building",
            CityObjectClass::WaterBody => "water_body",
            CityObjectClass::LandUse => "land_use",
            CityObjectClass::SolitaryVegetationObject => "solitary_vegetation_object",
            CityObjectClass::PlantCover => "plant_cover",
            CityObjectClass::TransportationComplex => "transportation_complex",
            CityObjectClass::ReliefFeature => "relief_feature",
            CityObjectClass::CityFurniture => "city_furniture",
            CityObjectClass::GenericCityObject => "generic_city_object",
            CityObjectClass::CityObjectGroup => "city_object_group",
            CityObjectClass::Bridge => "bridge",
            CityObjectClass::Tunnel => "tunnel",
        }
    }
}

impl fmt::Display for CityObjectClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CityObjectClass {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace('-', "_");
        Self::ALL
            .iter()
            .copied()
            .find(|class| class.as_str() == normalized)
            .ok_or_else(|| format!("Unknown city object class '{s}'"))
    }
}

/// Rendering style of an exported object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayForm {
    /// Flat ground outline
    Footprint,
    /// Footprint extruded to the object's height
    Extruded,
    /// Full untextured geometry
    Geometry,
    /// Textured 3D model
    Collada,
}

impl DisplayForm {
    /// Lowercase name used in configuration and output paths
    pub fn as_str(&self) -> &'static str {
        match self {
            DisplayForm::Footprint => "footprint",
            DisplayForm::Extruded => "extruded",
            DisplayForm::Geometry => "geometry",
            DisplayForm::Collada => "collada",
        }
    }

    /// Whether this is the 3D-model form that supports batching
    pub fn is_model(&self) -> bool {
        matches!(self, DisplayForm::Collada)
    }
}

impl fmt::Display for DisplayForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DisplayForm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "footprint" => Ok(DisplayForm::Footprint),
            "extruded" => Ok(DisplayForm::Extruded),
            "geometry" => Ok(DisplayForm::Geometry),
            "collada" => Ok(DisplayForm::Collada),
            other => Err(format!("Unknown display form '{other}'")),
        }
    }
}

/// Level of detail, 0 through 4
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(try_from = "u8", into = "u8")]
pub struct Lod(u8);

impl Lod {
    pub const MAX: u8 = 4;

    /// Creates a new LOD
    pub fn new(level: u8) -> Result<Self, String> {
        if level > Self::MAX {
            return Err(format!("LOD must be between 0 and {}, got {level}", Self::MAX));
        }
        Ok(Self(level))
    }

    /// Returns the numeric level
    pub fn get(&self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for Lod {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Lod> for u8 {
    fn from(lod: Lod) -> Self {
        lod.0
    }
}

impl fmt::Display for Lod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LOD{}", self.0)
    }
}
