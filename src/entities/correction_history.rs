//! Correction history entity - Audit rows for privileged override paths.
//!
//! Every force-edit, force-unfinalize, and frozen-balance override writes
//! one row here, in the same database transaction as the mutation itself.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Correction history database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "correction_history")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Table the corrected row lives in (e.g. `"meal_records"`)
    pub entity_kind: String,
    /// Id of the corrected row
    pub entity_id: i64,
    /// What was done (e.g. `"force_edit"`, `"force_unfinalize"`)
    pub action: String,
    /// Free-form detail, including the stated reason
    pub detail: String,
    /// User id of the privileged actor
    pub performed_by: i64,
    /// When the correction happened
    pub created_at: DateTimeUtc,
}

/// Correction history has no relationships with other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
