//! Minimal geometry and scene model
//!
//! The exporter does not interpret geometry beyond what the downstream
//! serializers need: flat ordinate arrays grouped into surfaces, optionally
//! carrying a texture reference.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Geometry primitive kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeometryKind {
    Point,
    LineString,
    Polygon,
    MultiPoint,
    MultiLineString,
    MultiPolygon,
    Collection,
}

/// A decoded database geometry
///
/// Ordinates are stored flat, `dimension` values per vertex. Ring and part
/// boundaries are kept in `parts` as vertex counts so polygons can be
/// reassembled downstream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Geometry {
    pub kind: GeometryKind,
    pub srid: Option<i32>,
    pub dimension: u8,
    pub ordinates: Vec<f64>,
    pub parts: Vec<usize>,
}

impl Geometry {
    /// Creates a geometry from a single part
    pub fn new(kind: GeometryKind, dimension: u8, ordinates: Vec<f64>) -> Self {
        let vertices = if dimension == 0 {
            0
        } else {
            ordinates.len() / dimension as usize
        };
        Self {
            kind,
            srid: None,
            dimension,
            ordinates,
            parts: vec![vertices],
        }
    }

    /// Sets the spatial reference id
    pub fn with_srid(mut self, srid: i32) -> Self {
        self.srid = Some(srid);
        self
    }

    /// Number of vertices
    pub fn vertex_count(&self) -> usize {
        if self.dimension == 0 {
            return 0;
        }
        self.ordinates.len() / self.dimension as usize
    }

    /// Flat parenthesized ordinate list, e.g. `(1,2,3,4,5,6)`
    pub fn to_ordinate_string(&self) -> String {
        let joined = self
            .ordinates
            .iter()
            .map(|o| o.to_string())
            .collect::<Vec<_>>()
            .join(",");
        format!("({joined})")
    }

    /// Highest z value, if the geometry is 3D
    ///
    /// A trailing partial vertex is ignored.
    pub fn max_z(&self) -> Option<f64> {
        if self.dimension < 3 {
            return None;
        }
        self.ordinates
            .chunks_exact(self.dimension as usize)
            .map(|v| v[2])
            .fold(None, |acc: Option<f64>, z| Some(acc.map_or(z, |m| m.max(z))))
    }
}

/// One renderable surface of an exported object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Surface {
    /// Row id in the surface geometry table
    pub surface_id: i64,
    pub geometry: Geometry,
    /// Image URI of the texture applied to this surface
    #[serde(skip_serializing_if = "Option::is_none")]
    pub texture: Option<String>,
    /// Texture coordinates as flat (s, t) pairs
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub texture_coordinates: Vec<f64>,
}

/// Ordered surfaces of one or more objects
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SceneGeometry {
    pub surfaces: Vec<Surface>,
    /// Extrusion height for the extruded display form
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extrusion_height: Option<f64>,
}

impl SceneGeometry {
    /// Whether there is nothing to render
    pub fn is_empty(&self) -> bool {
        self.surfaces.is_empty()
    }

    /// Moves all surfaces of `other` to the end of this scene
    pub fn append(&mut self, mut other: SceneGeometry) {
        self.surfaces.append(&mut other.surfaces);
    }
}

/// Unique texture images referenced by a scene
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TextureSet {
    pub images: BTreeSet<String>,
}

impl TextureSet {
    /// Collects the texture images used by a scene
    pub fn from_scene(scene: &SceneGeometry) -> Self {
        Self {
            images: scene
                .surfaces
                .iter()
                .filter_map(|s| s.texture.clone())
                .collect(),
        }
    }

    /// Number of distinct images
    pub fn len(&self) -> usize {
        self.images.len()
    }

    /// Whether no textures are referenced
    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    /// Merges another set into this one
    pub fn extend(&mut self, other: TextureSet) {
        self.images.extend(other.images);
    }
}
