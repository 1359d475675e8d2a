//! Export bundles
//!
//! A bundle is the unit handed to the downstream writer: the geometry and
//! textures of one object, or of a batch of same-class objects in 3D-model
//! form, together with the placemark metadata of every member.

use super::class::{CityObjectClass, DisplayForm, Lod};
use super::geometry::{SceneGeometry, TextureSet};
use super::ids::{CityObjectId, GmlId};
use serde::{Deserialize, Serialize};

/// Placemark metadata of one exported object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Placemark {
    pub object_id: CityObjectId,
    pub name: GmlId,
    /// Rendered balloon content, if descriptive content is enabled
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub group_member: bool,
}

/// A city object loaded by a reader, ready to be rendered or batched
#[derive(Debug, Clone, PartialEq)]
pub struct ExportedObject {
    pub class: CityObjectClass,
    pub display_form: DisplayForm,
    pub lod: Lod,
    pub geometry: SceneGeometry,
    pub textures: TextureSet,
    pub placemark: Placemark,
}

/// Finished export artifact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bundle {
    /// Id of the first object; names the output artifact
    pub representative_id: CityObjectId,
    pub class: CityObjectClass,
    pub display_form: DisplayForm,
    pub lod: Lod,
    pub geometry: SceneGeometry,
    pub textures: TextureSet,
    pub placemarks: Vec<Placemark>,
}

impl Bundle {
    /// Bundle holding a single object
    pub fn single(object: ExportedObject) -> Self {
        Self {
            representative_id: object.placemark.object_id,
            class: object.class,
            display_form: object.display_form,
            lod: object.lod,
            geometry: object.geometry,
            textures: object.textures,
            placemarks: vec![object.placemark],
        }
    }

    /// Number of objects in this bundle
    pub fn size(&self) -> usize {
        self.placemarks.len()
    }

    /// Ids of all member objects, in insertion order
    pub fn member_ids(&self) -> Vec<CityObjectId> {
        self.placemarks.iter().map(|p| p.object_id).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_bundle() {
        let id = CityObjectId::new(9).unwrap();
        let object = ExportedObject {
            class: CityObjectClass::Building,
            display_form: DisplayForm::Footprint,
            lod: Lod::new(1).unwrap(),
            geometry: SceneGeometry::default(),
            textures: TextureSet::default(),
            placemark: Placemark {
                object_id: id,
                name: GmlId::new("BLDG_9").unwrap(),
                description: Some("<b>9</b>".to_string()),
                group_member: false,
            },
        };

        let bundle = Bundle::single(object);
        assert_eq!(bundle.representative_id, id);
        assert_eq!(bundle.size(), 1);
        assert_eq!(bundle.member_ids(), vec![id]);
    }
}
