//! Breakfast entity - One manager-entered breakfast cost per date.
//!
//! The total cost is split across participants with the largest-remainder
//! method; the per-participant shares live in `breakfast_participants`.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Breakfast database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "breakfasts")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// The day this breakfast was served; one breakfast per date
    #[sea_orm(unique)]
    pub date: Date,
    /// Total cost in minor units
    pub total_cost: i64,
    /// Set once every participant's share has been deducted
    pub is_finalized: bool,
    /// User id of the manager who entered the cost
    pub created_by: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One breakfast has many participant shares
    #[sea_orm(has_many = "super::breakfast_participant::Entity")]
    Participants,
}

impl Related<super::breakfast_participant::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Participants.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
