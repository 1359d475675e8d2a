//! Where each class keeps its geometry
//!
//! Every class stores references to `surface_geometry` root rows, either in
//! LOD-specific columns of its own table or in dependent tables joined to
//! the object. The queries built here return one root id per row and bind
//! the object id as `$1`.

use crate::domain::{CityObjectClass, Lod};

struct GeometryColumns {
    table: &'static str,
    /// Column name patterns; `{lod}` is replaced by the level
    columns: &'static [&'static str],
    /// Levels at which the columns exist
    min_lod: u8,
    max_lod: u8,
}

fn own_columns(class: CityObjectClass) -> &'static [GeometryColumns] {
    use CityObjectClass::*;
    match class {
        Building => &[
            GeometryColumns {
                table: "building",
                columns: &["lod0_footprint_id", "lod0_roofprint_id"],
                min_lod: 0,
                max_lod: 0,
            },
            GeometryColumns {
                table: "building",
                columns: &["lod{lod}_solid_id", "lod{lod}_multi_surface_id"],
                min_lod: 1,
                max_lod: 4,
            },
        ],
        WaterBody => &[
            GeometryColumns {
                table: "waterbody",
                columns: &["lod{lod}_multi_surface_id"],
                min_lod: 0,
                max_lod: 1,
            },
            GeometryColumns {
                table: "waterbody",
                columns: &["lod{lod}_solid_id"],
                min_lod: 1,
                max_lod: 4,
            },
        ],
        LandUse => &[GeometryColumns {
            table: "land_use",
            columns: &["lod{lod}_multi_surface_id"],
            min_lod: 0,
            max_lod: 4,
        }],
        SolitaryVegetationObject => &[GeometryColumns {
            table: "solitary_vegetat_object",
            columns: &["lod{lod}_brep_id"],
            min_lod: 1,
            max_lod: 4,
        }],
        PlantCover => &[GeometryColumns {
            table: "plant_cover",
            columns: &["lod{lod}_multi_surface_id", "lod{lod}_multi_solid_id"],
            min_lod: 1,
            max_lod: 4,
        }],
        TransportationComplex => &[GeometryColumns {
            table: "transportation_complex",
            columns: &["lod{lod}_multi_surface_id"],
            min_lod: 1,
            max_lod: 4,
        }],
        ReliefFeature => &[],
        CityFurniture => &[GeometryColumns {
            table: "city_furniture",
            columns: &["lod{lod}_brep_id"],
            min_lod: 1,
            max_lod: 4,
        }],
        GenericCityObject => &[GeometryColumns {
            table: "generic_cityobject",
            columns: &["lod{lod}_brep_id"],
            min_lod: 0,
            max_lod: 4,
        }],
        CityObjectGroup => &[GeometryColumns {
            table: "cityobjectgroup",
            columns: &["brep_id"],
            min_lod: 0,
            max_lod: 4,
        }],
        Bridge => &[GeometryColumns {
            table: "bridge",
            columns: &["lod{lod}_solid_id", "lod{lod}_multi_surface_id"],
            min_lod: 1,
            max_lod: 4,
        }],
        Tunnel => &[GeometryColumns {
            table: "tunnel",
            columns: &["lod{lod}_solid_id", "lod{lod}_multi_surface_id"],
            min_lod: 1,
            max_lod: 4,
        }],
    }
}

/// Queries returning the `surface_geometry` root ids of one object
pub fn root_queries(class: CityObjectClass, lod: Lod) -> Vec<String> {
    let level = lod.get();
    let mut queries: Vec<String> = own_columns(class)
        .iter()
        .filter(|g| (g.min_lod..=g.max_lod).contains(&level))
        .map(|g| {
            let columns = g
                .columns
                .iter()
                .map(|c| c.replace("{lod}", &level.to_string()))
                .collect::<Vec<_>>()
                .join(", ");
            format!("SELECT unnest(ARRAY[{columns}]) FROM {} WHERE id = $1", g.table)
        })
        .collect();

    match class {
        CityObjectClass::Building if level >= 2 => queries.push(format!(
            "SELECT lod{level}_multi_surface_id FROM thematic_surface WHERE building_id = $1"
        )),
        CityObjectClass::Bridge if level >= 2 => queries.push(format!(
            "SELECT lod{level}_multi_surface_id FROM bridge_thematic_surface WHERE bridge_id = $1"
        )),
        CityObjectClass::Tunnel if level >= 2 => queries.push(format!(
            "SELECT lod{level}_multi_surface_id FROM tunnel_thematic_surface WHERE tunnel_id = $1"
        )),
        CityObjectClass::TransportationComplex if level >= 2 => queries.push(format!(
            "SELECT lod{level}_multi_surface_id FROM traffic_area \
             WHERE transportation_complex_id = $1"
        )),
        CityObjectClass::ReliefFeature => queries.push(format!(
            "SELECT tr.surface_geometry_id FROM relief_feat_to_rel_comp rf \
             JOIN relief_component rc ON rc.id = rf.relief_component_id \
             JOIN tin_relief tr ON tr.id = rc.id \
             WHERE rf.relief_feature_id = $1 AND rc.lod = {level}"
        )),
        _ => {}
    }

    queries
}

/// All surfaces below the given roots
pub const SURFACES_SQL: &str = "SELECT sg.id, sg.geometry FROM surface_geometry sg \
     WHERE sg.root_id = ANY($1) AND sg.geometry IS NOT NULL ORDER BY sg.id";

/// All surfaces below the given roots with their texture image and coordinates
pub const TEXTURED_SURFACES_SQL: &str = "SELECT sg.id, sg.geometry, ti.tex_image_uri, tp.texture_coordinates \
     FROM surface_geometry sg \
     LEFT JOIN textureparam tp ON tp.surface_geometry_id = sg.id \
     LEFT JOIN surface_data sd ON sd.id = tp.surface_data_id \
     LEFT JOIN tex_image ti ON ti.id = sd.tex_image_id \
     WHERE sg.root_id = ANY($1) AND sg.geometry IS NOT NULL ORDER BY sg.id";

/// 2D union of all surfaces below the given roots
pub const FOOTPRINT_SQL: &str = "SELECT ST_Union(ST_Force2D(sg.geometry)) FROM surface_geometry sg \
     WHERE sg.root_id = ANY($1) AND sg.geometry IS NOT NULL";

/// Extrusion height: measured height for buildings, envelope height otherwise
pub const EXTRUSION_HEIGHT_SQL: &str = "SELECT COALESCE(b.measured_height, ST_ZMax(co.envelope) - ST_ZMin(co.envelope)) \
     FROM cityobject co LEFT JOIN building b ON b.id = co.id WHERE co.id = $1";

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn lod(level: u8) -> Lod {
        Lod::new(level).unwrap()
    }

    #[test]
    fn test_building_lod2_includes_thematic_surfaces() {
        let queries = root_queries(CityObjectClass::Building, lod(2));
        assert_eq!(
            queries,
            vec![
                "SELECT unnest(ARRAY[lod2_solid_id, lod2_multi_surface_id]) FROM building WHERE id = $1"
                    .to_string(),
                "SELECT lod2_multi_surface_id FROM thematic_surface WHERE building_id = $1".to_string(),
            ]
        );
    }

    #[test]
    fn test_building_lod0_uses_footprint_columns() {
        let queries = root_queries(CityObjectClass::Building, lod(0));
        assert_eq!(queries.len(), 1);
        assert!(queries[0].contains("lod0_footprint_id, lod0_roofprint_id"));
    }

    #[test_case(CityObjectClass::CityFurniture, 0, 0 ; "furniture has no lod0")]
    #[test_case(CityObjectClass::CityFurniture, 3, 1 ; "furniture lod3")]
    #[test_case(CityObjectClass::WaterBody, 1, 2 ; "waterbody lod1 surfaces and solid")]
    #[test_case(CityObjectClass::ReliefFeature, 2, 1 ; "relief via components")]
    #[test_case(CityObjectClass::TransportationComplex, 3, 2 ; "transportation with traffic areas")]
    fn test_query_count(class: CityObjectClass, level: u8, expected: usize) {
        assert_eq!(root_queries(class, lod(level)).len(), expected);
    }

    #[test]
    fn test_every_query_binds_the_object() {
        for class in CityObjectClass::ALL {
            for level in 0..=Lod::MAX {
                for query in root_queries(class, lod(level)) {
                    assert!(query.contains("$1"), "{query}");
                }
            }
        }
    }
}
