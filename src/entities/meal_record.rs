//! Meal record entity - An explicit per-user, per-date meal toggle.
//!
//! Rows are created lazily on first explicit toggle; absence means "use the
//! default policy for that date". Overrides shadow these rows without ever
//! mutating them, so removing an override reveals the prior manual state.
//! `(user_id, date, meal_type)` is unique.

use super::kinds::MealType;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Meal record database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "meal_records")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Owning user
    pub user_id: i64,
    /// The day this record applies to
    pub date: Date,
    /// Lunch or dinner
    pub meal_type: MealType,
    /// Whether the meal is on for this user on this day
    pub is_on: bool,
    /// Number of portions (guests included); 0 when off
    pub count: i32,
    /// True once a user or manager has explicitly set this cell
    pub is_manually_set: bool,
    /// User id of whoever last wrote the record
    pub modified_by: i64,
    /// Last modification time
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each meal record belongs to one user
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id"
    )]
    User,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
