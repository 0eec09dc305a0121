//! Breakfast participant entity - One user's share of a breakfast cost.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Breakfast participant database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "breakfast_participants")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Owning breakfast
    pub breakfast_id: i64,
    /// Participating user
    pub user_id: i64,
    /// This participant's share in minor units
    pub cost: i64,
    /// Set once the share has been posted to the ledger
    pub deducted: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each share belongs to one breakfast
    #[sea_orm(
        belongs_to = "super::breakfast::Entity",
        from = "Column::BreakfastId",
        to = "super::breakfast::Column::Id"
    )]
    Breakfast,
    /// Each share belongs to one user
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id"
    )]
    User,
}

impl Related<super::breakfast::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Breakfast.def()
    }
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
