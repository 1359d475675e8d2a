//! Object readers
//!
//! Loads the geometry of one city object in one display form:
//!
//! - **Footprint**: 2D union of all surfaces
//! - **Extruded**: the footprint plus an extrusion height
//! - **Geometry**: every surface as stored
//! - **Collada**: every surface with its texture image and coordinates
//!
//! An object without geometry at the configured LOD yields `None`.

pub mod schema;

use crate::adapters::database::{ExportConnection, SqlParam, SqlRow, SqlValue};
use crate::domain::{
    DatabaseError, DisplayForm, ExportedObject, Placemark, Result, SceneGeometry, Surface,
    TextureSet, WorkItem,
};
use crate::domain::{CityObjectClass, Lod};

/// Reads objects at a fixed level of detail
#[derive(Debug, Clone, Copy)]
pub struct ObjectReader {
    lod: Lod,
}

impl ObjectReader {
    pub fn new(lod: Lod) -> Self {
        Self { lod }
    }

    pub fn lod(&self) -> Lod {
        self.lod
    }

    /// Loads the object named by a work item
    ///
    /// # Errors
    ///
    /// Returns a `DatabaseError` if a query fails.
    pub async fn read<C: ExportConnection + ?Sized>(
        &self,
        connection: &C,
        item: &WorkItem,
    ) -> Result<Option<ExportedObject>> {
        let roots = self.root_ids(connection, item).await?;
        if roots.is_empty() {
            tracing::debug!(
                object_id = %item.object_id(),
                class = %item.class(),
                lod = %self.lod,
                "No geometry at this level of detail"
            );
            return Ok(None);
        }

        let geometry = match item.display_form() {
            DisplayForm::Footprint => self.footprint(connection, item, &roots).await?,
            DisplayForm::Extruded => {
                let mut footprint = self.footprint(connection, item, &roots).await?;
                if !footprint.is_empty() {
                    footprint.extrusion_height = extrusion_height(connection, item).await?;
                }
                footprint
            }
            DisplayForm::Geometry => surfaces(connection, &roots, false).await?,
            DisplayForm::Collada => surfaces(connection, &roots, true).await?,
        };

        if geometry.is_empty() {
            tracing::debug!(object_id = %item.object_id(), "Geometry roots hold no surfaces");
            return Ok(None);
        }

        Ok(Some(ExportedObject {
            class: item.class(),
            display_form: item.display_form(),
            lod: self.lod,
            textures: TextureSet::from_scene(&geometry),
            geometry,
            placemark: Placemark {
                object_id: item.object_id(),
                name: item.gml_id().clone(),
                description: None,
                group_member: item.is_group_member(),
            },
        }))
    }

    async fn root_ids<C: ExportConnection + ?Sized>(
        &self,
        connection: &C,
        item: &WorkItem,
    ) -> Result<Vec<i32>> {
        let params = [SqlParam::Int(item.object_id().get())];
        let mut roots = Vec::new();
        for sql in schema::root_queries(item.class(), self.lod) {
            for row in connection.query(&sql, &params).await? {
                if let Some(id) = row.get(0).and_then(SqlValue::as_i64) {
                    let id = i32::try_from(id).map_err(|_| {
                        DatabaseError::Decode(format!("Geometry root id {id} out of range"))
                    })?;
                    roots.push(id);
                }
            }
        }
        Ok(roots)
    }

    async fn footprint<C: ExportConnection + ?Sized>(
        &self,
        connection: &C,
        item: &WorkItem,
        roots: &[i32],
    ) -> Result<SceneGeometry> {
        let rows = connection
            .query(schema::FOOTPRINT_SQL, &[SqlParam::IntArray(roots.to_vec())])
            .await?;

        let surfaces = rows
            .first()
            .and_then(|row| row.get(0))
            .and_then(SqlValue::as_geometry)
            .map(|geometry| Surface {
                surface_id: item.object_id().get(),
                geometry: geometry.clone(),
                texture: None,
                texture_coordinates: Vec::new(),
            })
            .into_iter()
            .collect();

        Ok(SceneGeometry {
            surfaces,
            extrusion_height: None,
        })
    }
}

async fn extrusion_height<C: ExportConnection + ?Sized>(
    connection: &C,
    item: &WorkItem,
) -> Result<Option<f64>> {
    let rows = connection
        .query(
            schema::EXTRUSION_HEIGHT_SQL,
            &[SqlParam::Int(item.object_id().get())],
        )
        .await?;
    Ok(rows.first().and_then(|row| row.get(0)).and_then(SqlValue::as_f64))
}

async fn surfaces<C: ExportConnection + ?Sized>(
    connection: &C,
    roots: &[i32],
    textured: bool,
) -> Result<SceneGeometry> {
    let sql = if textured {
        schema::TEXTURED_SURFACES_SQL
    } else {
        schema::SURFACES_SQL
    };
    let rows = connection
        .query(sql, &[SqlParam::IntArray(roots.to_vec())])
        .await?;

    let mut scene = SceneGeometry::default();
    for row in &rows {
        let Some(surface) = surface_from_row(row) else {
            continue;
        };
        // A surface textured in several themes appears once per theme
        if scene.surfaces.last().map(|s| s.surface_id) == Some(surface.surface_id) {
            continue;
        }
        scene.surfaces.push(surface);
    }
    Ok(scene)
}

fn surface_from_row(row: &SqlRow) -> Option<Surface> {
    let surface_id = row.get(0)?.as_i64()?;
    let geometry = row.get(1)?.as_geometry()?.clone();
    let texture = row.get(2).and_then(SqlValue::as_str).map(str::to_string);
    let texture_coordinates = row
        .get(3)
        .and_then(SqlValue::as_geometry)
        .map(|g| g.ordinates.clone())
        .unwrap_or_default();

    Some(Surface {
        surface_id,
        geometry,
        texture,
        texture_coordinates,
    })
}

/// Whether a class can be read at all at the given level of detail
pub fn has_geometry_at(class: CityObjectClass, lod: Lod) -> bool {
    !schema::root_queries(class, lod).is_empty()
}
