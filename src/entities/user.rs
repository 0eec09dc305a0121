//! User entity - A member of the shared living space.
//!
//! Each user carries a role tier and an optional overlay of extra permission
//! strings on top of the role's defaults. The three running balances live in
//! their own table (one row per balance type) so the ledger can update them
//! with atomic column increments.

use super::kinds::Role;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// User database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    /// Unique identifier for the user
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Display name
    pub name: String,
    /// Role tier (user < manager < admin < superadmin)
    pub role: Role,
    /// Inactive users cannot act and are skipped by charge runs
    pub is_active: bool,
    /// JSON list of extra permission strings granted beyond the role defaults
    pub extra_permissions: Json,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One user has one balance row per balance type
    #[sea_orm(has_many = "super::balance::Entity")]
    Balances,
    /// One user has many meal records
    #[sea_orm(has_many = "super::meal_record::Entity")]
    MealRecords,
    /// One user has many ledger transactions
    #[sea_orm(has_many = "super::transaction::Entity")]
    Transactions,
}

impl Related<super::balance::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Balances.def()
    }
}

impl Related<super::meal_record::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::MealRecords.def()
    }
}

impl Related<super::transaction::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Transactions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
