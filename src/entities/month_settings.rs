//! Month settings entity - Rates and finalization flag for a billing month.
//!
//! `(year, month)` is unique and the `[start_date, end_date]` span is capped
//! at 31 days. Once finalized, meal records and breakfasts in range are
//! read-only to normal roles.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Month settings database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "month_settings")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Calendar year this billing month belongs to
    pub year: i32,
    /// Calendar month (1-12)
    pub month: i32,
    /// First day of the billing range
    pub start_date: Date,
    /// Last day of the billing range (inclusive)
    pub end_date: Date,
    /// Per-meal lunch rate in minor units
    pub lunch_rate: i64,
    /// Per-meal dinner rate in minor units
    pub dinner_rate: i64,
    /// One-way lock; only the audited force-unfinalize path reverts it
    pub is_finalized: bool,
}

/// Month settings have no relationships with other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
