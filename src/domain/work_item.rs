//! Work items handed from the dispatcher to export workers

use super::class::{CityObjectClass, DisplayForm};
use super::ids::{CityObjectId, GmlId};
use serde::{Deserialize, Serialize};

/// One object to export in one display form
///
/// Work items are immutable once created and consumed exactly once.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorkItem {
    object_id: CityObjectId,
    gml_id: GmlId,
    class: CityObjectClass,
    display_form: DisplayForm,
    is_group_member: bool,
}

impl WorkItem {
    /// Creates a new work item
    pub fn new(
        object_id: CityObjectId,
        gml_id: GmlId,
        class: CityObjectClass,
        display_form: DisplayForm,
    ) -> Self {
        Self {
            object_id,
            gml_id,
            class,
            display_form,
            is_group_member: false,
        }
    }

    /// Marks the item as a member of an exported city object group
    pub fn as_group_member(mut self) -> Self {
        self.is_group_member = true;
        self
    }

    pub fn object_id(&self) -> CityObjectId {
        self.object_id
    }

    pub fn gml_id(&self) -> &GmlId {
        &self.gml_id
    }

    pub fn class(&self) -> CityObjectClass {
        self.class
    }

    pub fn display_form(&self) -> DisplayForm {
        self.display_form
    }

    pub fn is_group_member(&self) -> bool {
        self.is_group_member
    }

    /// Whether the item goes through a per-class accumulator
    pub fn is_batchable(&self) -> bool {
        self.display_form.is_model() && self.class.is_groupable()
    }
}
