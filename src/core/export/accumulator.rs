//! Per-class batching of 3D-model objects
//!
//! An accumulator exists only while it holds objects: it is started with the
//! first object of a batch and consumed by [`ObjectGroupAccumulator::flush`],
//! so a batch can neither be empty nor be flushed twice.

use crate::domain::{
    Bundle, CityObjectClass, CityObjectId, DisplayForm, ExportedObject, Lod, Placemark,
    SceneGeometry, TextureSet,
};

#[derive(Debug)]
pub struct ObjectGroupAccumulator {
    class: CityObjectClass,
    display_form: DisplayForm,
    lod: Lod,
    limit: usize,
    representative_id: CityObjectId,
    geometry: SceneGeometry,
    textures: TextureSet,
    placemarks: Vec<Placemark>,
}

impl ObjectGroupAccumulator {
    /// Starts a batch with its first object
    ///
    /// A `limit` of zero is treated as one.
    pub fn start(object: ExportedObject, limit: usize) -> Self {
        Self {
            class: object.class,
            display_form: object.display_form,
            lod: object.lod,
            limit: limit.max(1),
            representative_id: object.placemark.object_id,
            geometry: object.geometry,
            textures: object.textures,
            placemarks: vec![object.placemark],
        }
    }

    /// Appends an object to the batch
    pub fn add(&mut self, object: ExportedObject) {
        debug_assert_eq!(object.class, self.class);
        self.geometry.append(object.geometry);
        self.textures.extend(object.textures);
        self.placemarks.push(object.placemark);
    }

    pub fn class(&self) -> CityObjectClass {
        self.class
    }

    pub fn count(&self) -> usize {
        self.placemarks.len()
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn representative_id(&self) -> CityObjectId {
        self.representative_id
    }

    pub fn is_full(&self) -> bool {
        self.count() >= self.limit
    }

    /// Consumes the batch into one bundle
    pub fn flush(self) -> Bundle {
        tracing::debug!(
            class = %self.class,
            objects = self.placemarks.len(),
            representative_id = %self.representative_id,
            "Flushing object group"
        );
        Bundle {
            representative_id: self.representative_id,
            class: self.class,
            display_form: self.display_form,
            lod: self.lod,
            geometry: self.geometry,
            textures: self.textures,
            placemarks: self.placemarks,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Geometry, GeometryKind, GmlId, Surface};

    fn object(id: i64, texture: Option<&str>) -> ExportedObject {
        let object_id = CityObjectId::new(id).unwrap();
        let geometry = SceneGeometry {
            surfaces: vec![Surface {
                surface_id: id * 10,
                geometry: Geometry::new(GeometryKind::Polygon, 3, vec![0.0; 12]),
                texture: texture.map(str::to_string),
                texture_coordinates: Vec::new(),
            }],
            extrusion_height: None,
        };
        ExportedObject {
            class: CityObjectClass::Building,
            display_form: DisplayForm::Collada,
            lod: Lod::new(2).unwrap(),
            textures: TextureSet::from_scene(&geometry),
            geometry,
            placemark: Placemark {
                object_id,
                name: GmlId::new(format!("BLDG_{id}")).unwrap(),
                description: None,
                group_member: false,
            },
        }
    }

    #[test]
    fn test_fills_to_limit() {
        let mut acc = ObjectGroupAccumulator::start(object(1, None), 3);
        assert_eq!(acc.count(), 1);
        assert!(!acc.is_full());

        acc.add(object(2, None));
        acc.add(object(3, None));
        assert!(acc.is_full());
    }

    #[test]
    fn test_flush_combines_members() {
        let mut acc = ObjectGroupAccumulator::start(object(5, Some("tex/a.png")), 10);
        acc.add(object(6, Some("tex/b.png")));
        acc.add(object(7, Some("tex/a.png")));

        let bundle = acc.flush();
        assert_eq!(bundle.representative_id, CityObjectId::new(5).unwrap());
        assert_eq!(bundle.size(), 3);
        assert_eq!(bundle.geometry.surfaces.len(), 3);
        assert_eq!(bundle.textures.len(), 2);
        assert_eq!(
            bundle.member_ids(),
            vec![
                CityObjectId::new(5).unwrap(),
                CityObjectId::new(6).unwrap(),
                CityObjectId::new(7).unwrap()
            ]
        );
    }

    #[test]
    fn test_zero_limit_flushes_every_object() {
        let acc = ObjectGroupAccumulator::start(object(1, None), 0);
        assert_eq!(acc.limit(), 1);
        assert!(acc.is_full());
    }
}
