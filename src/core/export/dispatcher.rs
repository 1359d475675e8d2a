//! Work item dispatcher
//!
//! Selects the objects to export from `cityobject` and enqueues one work item
//! per object and display form. Members of exported city object groups are
//! enqueued as group members. Dropping the sender when dispatch ends closes
//! the queue, which tells the workers to drain.

use super::queue::QueueSender;
use super::shutdown_requested;
use crate::adapters::database::{ExportConnection, SqlParam, SqlRow, SqlValue};
use crate::config::{BoundingBox, ExportConfig};
use crate::domain::{
    CityKmlError, CityObjectClass, CityObjectId, DisplayForm, GmlId, Result, WorkItem,
};
use tokio::sync::watch;

const GROUP_MEMBERS_SQL: &str = "SELECT co.id, co.gmlid, co.objectclass_id \
     FROM group_to_cityobject g JOIN cityobject co ON co.id = g.cityobject_id \
     WHERE g.cityobjectgroup_id = $1 ORDER BY co.id";

/// Outcome of one dispatch run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Objects selected by the filter
    pub objects: usize,
    /// Group members found below selected groups
    pub group_members: usize,
    /// Work items handed to the queue
    pub enqueued: usize,
    pub interrupted: bool,
}

#[derive(Debug, Clone)]
pub struct Dispatcher {
    classes: Vec<CityObjectClass>,
    display_forms: Vec<DisplayForm>,
    object_ids: Vec<i64>,
    bbox: Option<BoundingBox>,
}

struct SelectedObject {
    id: CityObjectId,
    gml_id: GmlId,
    class: CityObjectClass,
}

impl Dispatcher {
    pub fn new(classes: Vec<CityObjectClass>, display_forms: Vec<DisplayForm>) -> Self {
        Self {
            classes,
            display_forms,
            object_ids: Vec::new(),
            bbox: None,
        }
    }

    pub fn from_config(config: &ExportConfig) -> Self {
        Self {
            classes: config.classes.clone(),
            display_forms: config.display_forms.clone(),
            object_ids: config.object_ids.clone(),
            bbox: config.bbox,
        }
    }

    pub fn with_object_ids(mut self, ids: Vec<i64>) -> Self {
        self.object_ids = ids;
        self
    }

    pub fn with_bbox(mut self, bbox: BoundingBox) -> Self {
        self.bbox = Some(bbox);
        self
    }

    /// Selection query and its parameters
    pub fn selection_query(&self) -> (String, Vec<SqlParam>) {
        let mut class_ids: Vec<i32> = self
            .classes
            .iter()
            .flat_map(|c| c.objectclass_ids().iter().copied())
            .collect();
        class_ids.sort_unstable();
        class_ids.dedup();

        let mut sql = "SELECT co.id, co.gmlid, co.objectclass_id FROM cityobject co \
                       WHERE co.objectclass_id = ANY($1)"
            .to_string();
        let mut params = vec![SqlParam::IntArray(class_ids)];

        if !self.object_ids.is_empty() {
            let ids = self
                .object_ids
                .iter()
                .filter_map(|id| match i32::try_from(*id) {
                    Ok(id) => Some(id),
                    Err(_) => {
                        tracing::warn!(object_id = id, "Object id out of range, ignored");
                        None
                    }
                })
                .collect();
            params.push(SqlParam::IntArray(ids));
            sql.push_str(&format!(" AND co.id = ANY(${})", params.len()));
        }

        if let Some(bbox) = &self.bbox {
            let first = params.len() + 1;
            params.extend(
                [bbox.min_x, bbox.min_y, bbox.max_x, bbox.max_y]
                    .into_iter()
                    .map(SqlParam::Float),
            );
            sql.push_str(&format!(
                " AND co.envelope && ST_MakeEnvelope(${}, ${}, ${}, ${}, \
                 (SELECT srid FROM database_srs LIMIT 1))",
                first,
                first + 1,
                first + 2,
                first + 3
            ));
        }

        sql.push_str(" ORDER BY co.id");
        (sql, params)
    }

    /// Selects objects and feeds the queue until done or shut down
    ///
    /// # Errors
    ///
    /// Returns an error if the selection query fails or the queue has no
    /// consumers left.
    pub async fn dispatch<C: ExportConnection + ?Sized>(
        &self,
        connection: &C,
        sender: QueueSender<WorkItem>,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<DispatchReport> {
        let (sql, params) = self.selection_query();
        let rows = connection.query(&sql, &params).await?;
        let objects: Vec<SelectedObject> = rows.iter().filter_map(selected_object).collect();

        let mut report = DispatchReport {
            objects: objects.len(),
            ..DispatchReport::default()
        };
        tracing::info!(
            objects = objects.len(),
            display_forms = self.display_forms.len(),
            "Dispatching city objects"
        );

        for object in &objects {
            if !self
                .enqueue_object(object, false, &sender, &mut shutdown, &mut report)
                .await?
            {
                return Ok(report);
            }

            if object.class == CityObjectClass::CityObjectGroup {
                let members = connection
                    .query(GROUP_MEMBERS_SQL, &[SqlParam::Int(object.id.get())])
                    .await?;
                for member in members.iter().filter_map(selected_object) {
                    // Nested groups are exported only when selected themselves
                    if member.class == CityObjectClass::CityObjectGroup {
                        continue;
                    }
                    report.group_members += 1;
                    if !self
                        .enqueue_object(&member, true, &sender, &mut shutdown, &mut report)
                        .await?
                    {
                        return Ok(report);
                    }
                }
            }
        }

        tracing::info!(
            enqueued = report.enqueued,
            group_members = report.group_members,
            "Dispatch complete"
        );
        Ok(report)
    }

    /// Returns `false` once shutdown has been requested
    async fn enqueue_object(
        &self,
        object: &SelectedObject,
        group_member: bool,
        sender: &QueueSender<WorkItem>,
        shutdown: &mut watch::Receiver<bool>,
        report: &mut DispatchReport,
    ) -> Result<bool> {
        for form in &self.display_forms {
            let mut item = WorkItem::new(object.id, object.gml_id.clone(), object.class, *form);
            if group_member {
                item = item.as_group_member();
            }

            let sent = tokio::select! {
                biased;
                _ = shutdown_requested(shutdown) => None,
                sent = sender.send(item) => Some(sent),
            };

            match sent {
                None => {
                    tracing::info!(enqueued = report.enqueued, "Dispatch interrupted");
                    report.interrupted = true;
                    return Ok(false);
                }
                Some(Err(item)) => {
                    return Err(CityKmlError::Export(format!(
                        "Work queue closed before object {} was enqueued",
                        item.object_id()
                    )))
                }
                Some(Ok(())) => report.enqueued += 1,
            }
        }
        Ok(true)
    }
}

fn selected_object(row: &SqlRow) -> Option<SelectedObject> {
    let raw_id = row.get(0).and_then(SqlValue::as_i64)?;
    let id = CityObjectId::new(raw_id).ok()?;

    let class_id = row.get(2).and_then(SqlValue::as_i64)?;
    let Some(class) = i32::try_from(class_id)
        .ok()
        .and_then(CityObjectClass::from_objectclass_id)
    else {
        tracing::debug!(object_id = %id, objectclass_id = class_id, "Unsupported object class");
        return None;
    };

    let gml_id = row
        .get(1)
        .and_then(SqlValue::as_str)
        .and_then(|s| GmlId::new(s).ok())
        .or_else(|| GmlId::new(format!("ID_{raw_id}")).ok())?;

    Some(SelectedObject { id, gml_id, class })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selection_query_by_class() {
        let dispatcher = Dispatcher::new(
            vec![CityObjectClass::Building, CityObjectClass::Bridge],
            vec![DisplayForm::Footprint],
        );
        let (sql, params) = dispatcher.selection_query();

        assert_eq!(
            sql,
            "SELECT co.id, co.gmlid, co.objectclass_id FROM cityobject co \
             WHERE co.objectclass_id = ANY($1) ORDER BY co.id"
        );
        assert_eq!(params.len(), 1);
    }

    #[test]
    fn test_selection_query_with_ids_and_bbox() {
        let dispatcher = Dispatcher::new(vec![CityObjectClass::Building], vec![DisplayForm::Geometry])
            .with_object_ids(vec![3, 5, i64::MAX])
            .with_bbox(BoundingBox {
                min_x: 0.0,
                min_y: 1.0,
                max_x: 2.0,
                max_y: 3.0,
            });
        let (sql, params) = dispatcher.selection_query();

        assert!(sql.contains("co.id = ANY($2)"));
        assert!(sql.contains("ST_MakeEnvelope($3, $4, $5, $6,"));
        assert_eq!(params[1], SqlParam::IntArray(vec![3, 5]));
        assert_eq!(params[5], SqlParam::Float(3.0));
    }

    #[test]
    fn test_selected_object_falls_back_to_id_name() {
        let building_class = CityObjectClass::Building.objectclass_ids()[0] as i64;
        let row = SqlRow::new(vec![SqlValue::Int(8), SqlValue::Null, SqlValue::Int(building_class)]);

        let object = selected_object(&row).unwrap();
        assert_eq!(object.gml_id.as_str(), "ID_8");
        assert_eq!(object.class, CityObjectClass::Building);

        let unknown = SqlRow::new(vec![SqlValue::Int(8), SqlValue::Null, SqlValue::Int(-1)]);
        assert!(selected_object(&unknown).is_none());
    }
}
