//! Closed table and column vocabulary for balloon shorthand
//!
//! Every table keyword maps to a fixed join path from the exported object's
//! id (`$1`) to that table. Only names listed here can reach the generated
//! SQL; anything else is rejected at compile time.

/// One selectable column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnDef {
    pub name: &'static str,
    /// SQL expression, when the column is computed rather than stored
    pub expr: Option<&'static str>,
    pub geometry: bool,
}

const fn col(name: &'static str) -> ColumnDef {
    ColumnDef {
        name,
        expr: None,
        geometry: false,
    }
}

const fn geom(name: &'static str) -> ColumnDef {
    ColumnDef {
        name,
        expr: None,
        geometry: true,
    }
}

const fn computed(name: &'static str, expr: &'static str, geometry: bool) -> ColumnDef {
    ColumnDef {
        name,
        expr: Some(expr),
        geometry,
    }
}

/// One table keyword and its join path
#[derive(Debug, Clone, Copy)]
pub struct TableDef {
    pub keyword: &'static str,
    pub alias: &'static str,
    /// FROM clause including joins
    pub from: &'static str,
    /// Predicate binding the path to the object id
    pub filter: &'static str,
    /// Default row order, so row indexes are stable
    pub order_by: &'static str,
    pub columns: &'static [ColumnDef],
}

impl TableDef {
    /// Case-insensitive column lookup
    pub fn column(&self, name: &str) -> Option<&'static ColumnDef> {
        self.columns
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name))
    }

    /// SQL expression selecting a column of this table
    pub fn column_sql(&self, column: &ColumnDef) -> String {
        match column.expr {
            Some(expr) => expr.to_string(),
            None => format!("{}.{}", self.alias, column.name.to_ascii_lowercase()),
        }
    }
}

/// Pseudo table offering computed values over the object's envelope
pub const SPECIAL_KEYWORDS: &str = "SPECIAL_KEYWORDS";

const FEATURE_COLUMNS: &[ColumnDef] = &[
    col("ID"),
    col("CLASS"),
    col("CLASS_CODESPACE"),
    col("FUNCTION"),
    col("FUNCTION_CODESPACE"),
    col("USAGE"),
    col("USAGE_CODESPACE"),
];

const TABLES: &[TableDef] = &[
    TableDef {
        keyword: "CITYOBJECT",
        alias: "co",
        from: "cityobject co",
        filter: "co.id = $1",
        order_by: "co.id",
        columns: &[
            col("ID"),
            col("OBJECTCLASS_ID"),
            col("GMLID"),
            col("NAME"),
            col("NAME_CODESPACE"),
            col("DESCRIPTION"),
            geom("ENVELOPE"),
            col("CREATION_DATE"),
            col("TERMINATION_DATE"),
            col("RELATIVE_TO_TERRAIN"),
            col("RELATIVE_TO_WATER"),
            col("LAST_MODIFICATION_DATE"),
            col("UPDATING_PERSON"),
            col("REASON_FOR_UPDATE"),
            col("LINEAGE"),
        ],
    },
    TableDef {
        keyword: "BUILDING",
        alias: "b",
        from: "building b",
        filter: "b.id = $1",
        order_by: "b.id",
        columns: &[
            col("ID"),
            col("BUILDING_PARENT_ID"),
            col("BUILDING_ROOT_ID"),
            col("CLASS"),
            col("FUNCTION"),
            col("USAGE"),
            col("YEAR_OF_CONSTRUCTION"),
            col("YEAR_OF_DEMOLITION"),
            col("ROOF_TYPE"),
            col("MEASURED_HEIGHT"),
            col("MEASURED_HEIGHT_UNIT"),
            col("STOREYS_ABOVE_GROUND"),
            col("STOREYS_BELOW_GROUND"),
            col("STOREY_HEIGHTS_ABOVE_GROUND"),
            col("STOREY_HEIGHTS_BELOW_GROUND"),
            geom("LOD1_TERRAIN_INTERSECTION"),
            geom("LOD2_MULTI_CURVE"),
            col("LOD0_FOOTPRINT_ID"),
            col("LOD0_ROOFPRINT_ID"),
            col("LOD1_SOLID_ID"),
            col("LOD2_SOLID_ID"),
            col("LOD3_SOLID_ID"),
            col("LOD4_SOLID_ID"),
        ],
    },
    TableDef {
        keyword: "ADDRESS",
        alias: "a",
        from: "address a JOIN address_to_building atb ON atb.address_id = a.id",
        filter: "atb.building_id = $1",
        order_by: "a.id",
        columns: &[
            col("ID"),
            col("GMLID"),
            col("STREET"),
            col("HOUSE_NUMBER"),
            col("PO_BOX"),
            col("ZIP_CODE"),
            col("CITY"),
            col("STATE"),
            col("COUNTRY"),
            geom("MULTI_POINT"),
        ],
    },
    TableDef {
        keyword: "APPEARANCE",
        alias: "ap",
        from: "appearance ap",
        filter: "ap.cityobject_id = $1",
        order_by: "ap.id",
        columns: &[
            col("ID"),
            col("GMLID"),
            col("NAME"),
            col("DESCRIPTION"),
            col("THEME"),
        ],
    },
    TableDef {
        keyword: "CITYOBJECT_GENERICATTRIB",
        alias: "ga",
        from: "cityobject_genericattrib ga",
        filter: "ga.cityobject_id = $1",
        order_by: "ga.id",
        columns: &[
            col("ID"),
            col("ATTRNAME"),
            col("DATATYPE"),
            col("STRVAL"),
            col("INTVAL"),
            col("REALVAL"),
            col("URIVAL"),
            col("DATEVAL"),
            col("UNIT"),
            col("GENATTRIBSET_CODESPACE"),
            geom("GEOMVAL"),
        ],
    },
    TableDef {
        keyword: "EXTERNAL_REFERENCE",
        alias: "er",
        from: "external_reference er",
        filter: "er.cityobject_id = $1",
        order_by: "er.id",
        columns: &[col("ID"), col("INFOSYS"), col("NAME"), col("URI")],
    },
    TableDef {
        keyword: "THEMATIC_SURFACE",
        alias: "ts",
        from: "thematic_surface ts",
        filter: "ts.building_id = $1",
        order_by: "ts.id",
        columns: &[
            col("ID"),
            col("OBJECTCLASS_ID"),
            col("BUILDING_ID"),
            col("ROOM_ID"),
            col("BUILDING_INSTALLATION_ID"),
            col("LOD2_MULTI_SURFACE_ID"),
            col("LOD3_MULTI_SURFACE_ID"),
            col("LOD4_MULTI_SURFACE_ID"),
        ],
    },
    TableDef {
        keyword: "BUILDING_INSTALLATION",
        alias: "bi",
        from: "building_installation bi",
        filter: "bi.building_id = $1",
        order_by: "bi.id",
        columns: &[
            col("ID"),
            col("OBJECTCLASS_ID"),
            col("CLASS"),
            col("FUNCTION"),
            col("USAGE"),
            col("BUILDING_ID"),
            col("ROOM_ID"),
        ],
    },
    TableDef {
        keyword: "ROOM",
        alias: "r",
        from: "room r",
        filter: "r.building_id = $1",
        order_by: "r.id",
        columns: &[
            col("ID"),
            col("CLASS"),
            col("FUNCTION"),
            col("USAGE"),
            col("BUILDING_ID"),
        ],
    },
    TableDef {
        keyword: "OPENING",
        alias: "o",
        from: "opening o \
               JOIN opening_to_them_surface ots ON ots.opening_id = o.id \
               JOIN thematic_surface ts ON ts.id = ots.thematic_surface_id",
        filter: "ts.building_id = $1",
        order_by: "o.id",
        columns: &[col("ID"), col("OBJECTCLASS_ID"), col("ADDRESS_ID")],
    },
    TableDef {
        keyword: "CITYOBJECTGROUP",
        alias: "g",
        from: "cityobjectgroup g",
        filter: "g.id = $1",
        order_by: "g.id",
        columns: &[
            col("ID"),
            col("CLASS"),
            col("FUNCTION"),
            col("USAGE"),
            col("PARENT_CITYOBJECT_ID"),
        ],
    },
    TableDef {
        keyword: "WATERBODY",
        alias: "wb",
        from: "waterbody wb",
        filter: "wb.id = $1",
        order_by: "wb.id",
        columns: FEATURE_COLUMNS,
    },
    TableDef {
        keyword: "LAND_USE",
        alias: "lu",
        from: "land_use lu",
        filter: "lu.id = $1",
        order_by: "lu.id",
        columns: FEATURE_COLUMNS,
    },
    TableDef {
        keyword: "SOLITARY_VEGETAT_OBJECT",
        alias: "sv",
        from: "solitary_vegetat_object sv",
        filter: "sv.id = $1",
        order_by: "sv.id",
        columns: &[
            col("ID"),
            col("CLASS"),
            col("FUNCTION"),
            col("USAGE"),
            col("SPECIES"),
            col("HEIGHT"),
            col("HEIGHT_UNIT"),
            col("TRUNK_DIAMETER"),
            col("TRUNK_DIAMETER_UNIT"),
            col("CROWN_DIAMETER"),
            col("CROWN_DIAMETER_UNIT"),
        ],
    },
    TableDef {
        keyword: "PLANT_COVER",
        alias: "pc",
        from: "plant_cover pc",
        filter: "pc.id = $1",
        order_by: "pc.id",
        columns: &[
            col("ID"),
            col("CLASS"),
            col("FUNCTION"),
            col("USAGE"),
            col("AVERAGE_HEIGHT"),
            col("AVERAGE_HEIGHT_UNIT"),
        ],
    },
    TableDef {
        keyword: "TRANSPORTATION_COMPLEX",
        alias: "tc",
        from: "transportation_complex tc",
        filter: "tc.id = $1",
        order_by: "tc.id",
        columns: &[
            col("ID"),
            col("OBJECTCLASS_ID"),
            col("CLASS"),
            col("FUNCTION"),
            col("USAGE"),
        ],
    },
    TableDef {
        keyword: "TRAFFIC_AREA",
        alias: "ta",
        from: "traffic_area ta",
        filter: "ta.transportation_complex_id = $1",
        order_by: "ta.id",
        columns: &[
            col("ID"),
            col("OBJECTCLASS_ID"),
            col("CLASS"),
            col("FUNCTION"),
            col("USAGE"),
            col("SURFACE_MATERIAL"),
        ],
    },
    TableDef {
        keyword: "CITY_FURNITURE",
        alias: "cf",
        from: "city_furniture cf",
        filter: "cf.id = $1",
        order_by: "cf.id",
        columns: FEATURE_COLUMNS,
    },
    TableDef {
        keyword: "GENERIC_CITYOBJECT",
        alias: "gco",
        from: "generic_cityobject gco",
        filter: "gco.id = $1",
        order_by: "gco.id",
        columns: FEATURE_COLUMNS,
    },
    TableDef {
        keyword: "RELIEF_FEATURE",
        alias: "rf",
        from: "relief_feature rf",
        filter: "rf.id = $1",
        order_by: "rf.id",
        columns: &[col("ID"), col("LOD")],
    },
    TableDef {
        keyword: "BRIDGE",
        alias: "br",
        from: "bridge br",
        filter: "br.id = $1",
        order_by: "br.id",
        columns: &[
            col("ID"),
            col("CLASS"),
            col("FUNCTION"),
            col("USAGE"),
            col("YEAR_OF_CONSTRUCTION"),
            col("YEAR_OF_DEMOLITION"),
            col("IS_MOVABLE"),
        ],
    },
    TableDef {
        keyword: "TUNNEL",
        alias: "tu",
        from: "tunnel tu",
        filter: "tu.id = $1",
        order_by: "tu.id",
        columns: &[
            col("ID"),
            col("CLASS"),
            col("FUNCTION"),
            col("USAGE"),
            col("YEAR_OF_CONSTRUCTION"),
            col("YEAR_OF_DEMOLITION"),
        ],
    },
    TableDef {
        keyword: "SURFACE_GEOMETRY",
        alias: "sg",
        from: "surface_geometry sg",
        filter: "sg.cityobject_id = $1",
        order_by: "sg.id",
        columns: &[
            col("ID"),
            col("GMLID"),
            col("PARENT_ID"),
            col("ROOT_ID"),
            col("IS_SOLID"),
            col("IS_COMPOSITE"),
            col("IS_TRIANGULATED"),
            col("IS_XLINK"),
            col("IS_REVERSE"),
            geom("GEOMETRY"),
            geom("SOLID_GEOMETRY"),
        ],
    },
    TableDef {
        keyword: SPECIAL_KEYWORDS,
        alias: "co",
        from: "cityobject co",
        filter: "co.id = $1",
        order_by: "co.id",
        columns: &[
            computed(
                "CENTROID_WGS84",
                "ST_Centroid(ST_Transform(co.envelope, 4326))",
                true,
            ),
            computed(
                "CENTROID_WGS84_LAT",
                "ST_Y(ST_Centroid(ST_Transform(co.envelope, 4326)))",
                false,
            ),
            computed(
                "CENTROID_WGS84_LON",
                "ST_X(ST_Centroid(ST_Transform(co.envelope, 4326)))",
                false,
            ),
            computed(
                "BBOX_WGS84_LAT_MIN",
                "ST_YMin(ST_Transform(co.envelope, 4326))",
                false,
            ),
            computed(
                "BBOX_WGS84_LAT_MAX",
                "ST_YMax(ST_Transform(co.envelope, 4326))",
                false,
            ),
            computed(
                "BBOX_WGS84_LON_MIN",
                "ST_XMin(ST_Transform(co.envelope, 4326))",
                false,
            ),
            computed(
                "BBOX_WGS84_LON_MAX",
                "ST_XMax(ST_Transform(co.envelope, 4326))",
                false,
            ),
            computed("BBOX_WGS84_HEIGHT_MIN", "ST_ZMin(co.envelope)", false),
            computed("BBOX_WGS84_HEIGHT_MAX", "ST_ZMax(co.envelope)", false),
        ],
    },
];

/// Case-insensitive table lookup
pub fn table(keyword: &str) -> Option<&'static TableDef> {
    TABLES.iter().find(|t| t.keyword.eq_ignore_ascii_case(keyword))
}

/// Every known table keyword
pub fn table_keywords() -> impl Iterator<Item = &'static str> {
    TABLES.iter().map(|t| t.keyword)
}
